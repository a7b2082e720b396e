//! Demo mode with a pre-populated social dataset.
//!
//! Provides a sample schema and data so the workbench is usable out of the
//! box: users, topics, top-level posts, and per-group posts/members that
//! exercise templated reference paths.

use docbench_client::MemoryStore;
use docbench_core::{FieldKind, FieldMetadata, SchemaMetadata};

/// Create the built-in schema for the demo dataset.
pub fn demo_schema() -> SchemaMetadata {
    let mut schema = SchemaMetadata::new();

    schema.insert_field("users", "name", FieldMetadata::new(FieldKind::String));
    schema.insert_field("users", "age", FieldMetadata::new(FieldKind::Number));

    schema.insert_field("topics", "label", FieldMetadata::new(FieldKind::String));

    // Posts reference users by name, topics by id, users via like-map keys,
    // and their group's members via a templated path.
    schema.insert_field(
        "posts",
        "author",
        FieldMetadata::new(FieldKind::String)
            .with_collection_ref("users")
            .with_ref_field("name"),
    );
    schema.insert_field("posts", "title", FieldMetadata::new(FieldKind::String));
    schema.insert_field(
        "posts",
        "tags",
        FieldMetadata::new(FieldKind::Array).with_collection_ref("topics"),
    );
    schema.insert_field(
        "posts",
        "likes.%s",
        FieldMetadata::new(FieldKind::Boolean).with_collection_ref("users"),
    );
    schema.insert_field(
        "posts",
        "member",
        FieldMetadata::new(FieldKind::String).with_collection_ref("groups/%s/members"),
    );

    schema.insert_field(
        "members",
        "user",
        FieldMetadata::new(FieldKind::String).with_collection_ref("users"),
    );
    schema.insert_field("members", "role", FieldMetadata::new(FieldKind::String));

    schema
}

/// Insert the demo documents into the store.
pub fn seed_demo_store(store: &MemoryStore) {
    store.insert_json(
        "users",
        "u-ada",
        serde_json::json!({"name": "ada", "age": 36}),
    );
    store.insert_json(
        "users",
        "u-grace",
        serde_json::json!({"name": "grace", "age": 45}),
    );
    store.insert_json(
        "users",
        "u-linus",
        serde_json::json!({"name": "linus", "age": 25}),
    );

    store.insert_json("topics", "t-eng", serde_json::json!({"label": "engineering"}));
    store.insert_json("topics", "t-math", serde_json::json!({"label": "mathematics"}));

    store.insert_json(
        "posts",
        "p1",
        serde_json::json!({
            "author": "ada",
            "title": "notes on analytical engines",
            "tags": ["t-math", "t-eng"],
            "likes": {"u-grace": true, "u-linus": true}
        }),
    );
    store.insert_json(
        "posts",
        "p2",
        serde_json::json!({
            "author": "grace",
            "title": "compilers in practice",
            "tags": ["t-eng"],
            "likes": {"u-ada": true}
        }),
    );

    store.insert_json(
        "groups/g1/posts",
        "gp1",
        serde_json::json!({
            "author": "linus",
            "title": "release announcement",
            "member": "m1"
        }),
    );
    store.insert_json(
        "groups/g1/members",
        "m1",
        serde_json::json!({"user": "u-linus", "role": "owner"}),
    );
    store.insert_json(
        "groups/g1/members",
        "m2",
        serde_json::json!({"user": "u-ada", "role": "guest"}),
    );
}
