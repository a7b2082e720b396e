//! Schema-driven reference resolution.
//!
//! Given a value somewhere inside a result document, this module decides
//! whether that value is a cross-reference and, if so, into which collection.
//! The decision walks the value's path from the innermost segment outward,
//! accumulating a dotted template that alternates between literal segments
//! and `%s` wildcards, and checks the template against the entity's schema
//! entries after every step. The first (innermost) match wins.
//!
//! Two lookup positions exist and differ by one alternation phase:
//!
//! - **Key position** (the displayed value is itself a map key): the walk
//!   starts by inserting a wildcard.
//! - **Value position** (the displayed value is field content): the walk
//!   starts with the literal segment, and at every step the plain all-literal
//!   dotted key is tried before the templated one, so an exact schema entry
//!   always beats a wildcarded one.
//!
//! Array indices contribute a wildcard without flipping the alternation; an
//! index can never appear as a literal schema key. The phase difference
//! between the two positions is load-bearing: do not "simplify" it.

use std::fmt;

use docbench_proto::{ResultDocument, Value};

use crate::catalog::{EntityFields, FieldMetadata, SchemaMetadata};
use crate::error::Error;

/// One step of a value path: a map key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    /// Create a key segment.
    pub fn key(k: impl Into<String>) -> Self {
        PathSegment::Key(k.into())
    }

    /// Create an index segment.
    pub fn index(i: usize) -> Self {
        PathSegment::Index(i)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(k),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Rendering position of the value being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupPosition {
    /// The value is itself a map key being displayed.
    Key,
    /// The value is a field's scalar or array content being displayed.
    Value,
}

/// A resolved cross-reference, ready to drive navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDescriptor {
    /// Interpolated target collection path.
    pub target_path: String,
    /// Field to match on; a direct document-id lookup when absent.
    pub match_field: Option<String>,
    /// The value to match, as a plain string.
    pub match_value: String,
}

/// A value inside a result document that resolved to a reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Path of the annotated value within the document.
    pub path: Vec<PathSegment>,
    /// Where the reference points.
    pub descriptor: ReferenceDescriptor,
}

/// Resolve the value at `path` inside a document of `entity`.
///
/// `query_path` is the current query's collection path; its segments feed
/// the `%s` placeholders of the matched pattern. Returns `Ok(None)` when no
/// schema entry matches (the value renders plain), and
/// [`Error::Unresolvable`] when a pattern matches but has more placeholders
/// than the query path can feed.
pub fn resolve(
    schema: &SchemaMetadata,
    entity: &str,
    path: &[PathSegment],
    position: LookupPosition,
    match_value: &str,
    query_path: &str,
) -> Result<Option<ReferenceDescriptor>, Error> {
    let fields = match schema.entity(entity) {
        Some(fields) => fields,
        None => return Ok(None),
    };
    let meta = match lookup(fields, path, position) {
        Some(meta) => meta,
        None => return Ok(None),
    };
    descriptor_for(meta, match_value, query_path)
}

/// Build a descriptor from matched metadata, interpolating the target path.
fn descriptor_for(
    meta: &FieldMetadata,
    match_value: &str,
    query_path: &str,
) -> Result<Option<ReferenceDescriptor>, Error> {
    let pattern = match &meta.collection_ref {
        Some(pattern) => pattern,
        None => return Ok(None),
    };
    Ok(Some(ReferenceDescriptor {
        target_path: interpolate(pattern, query_path)?,
        match_field: meta.ref_field.clone(),
        match_value: match_value.to_string(),
    }))
}

/// Walk the path innermost-out, checking accumulated templates against the
/// entity's field table.
fn lookup<'a>(
    fields: &'a EntityFields,
    path: &[PathSegment],
    position: LookupPosition,
) -> Option<&'a FieldMetadata> {
    if path.is_empty() {
        return None;
    }

    // The alternation phase: whether the next string segment inserts its
    // literal form. Key position starts on the wildcard, value position on
    // the literal.
    let mut literal_phase = matches!(position, LookupPosition::Value);
    let mut templated = String::new();
    let mut plain = String::new();

    for segment in path.iter().rev() {
        let piece = match segment {
            PathSegment::Key(k) => {
                let piece = if literal_phase {
                    k.clone()
                } else {
                    "%s".to_string()
                };
                literal_phase = !literal_phase;
                piece
            }
            // Indices always contribute a wildcard and leave the
            // alternation untouched.
            PathSegment::Index(_) => "%s".to_string(),
        };
        prepend(&mut templated, &piece);
        prepend(&mut plain, &segment.to_string());

        if position == LookupPosition::Value {
            if let Some(meta) = fields.get(&plain) {
                if plain != templated && fields.contains_key(&templated) {
                    tracing::debug!(
                        literal = %plain,
                        templated = %templated,
                        "literal and templated schema keys both match; preferring literal"
                    );
                }
                return Some(meta);
            }
        }
        if let Some(meta) = fields.get(&templated) {
            return Some(meta);
        }
    }
    None
}

fn prepend(accumulated: &mut String, piece: &str) {
    if accumulated.is_empty() {
        *accumulated = piece.to_string();
    } else {
        *accumulated = format!("{}.{}", piece, accumulated);
    }
}

/// Replace each `%s` in `pattern` with the query-path segment at the same
/// position. An under-supplied placeholder is a reported error, never a
/// silent truncation.
fn interpolate(pattern: &str, query_path: &str) -> Result<String, Error> {
    let query_segments: Vec<&str> = query_path.split('/').filter(|s| !s.is_empty()).collect();
    let mut out: Vec<&str> = Vec::new();
    for (i, segment) in pattern.split('/').enumerate() {
        if segment == "%s" {
            match query_segments.get(i) {
                Some(s) => out.push(*s),
                None => {
                    return Err(Error::Unresolvable(format!(
                        "pattern '{}' needs a segment at position {} but query path '{}' is too short",
                        pattern, i, query_path
                    )))
                }
            }
        } else {
            out.push(segment);
        }
    }
    Ok(out.join("/"))
}

/// Annotate every resolvable value in a result document.
///
/// Explicit tree walk carrying the accumulated path: map keys go through the
/// key-position lookup, scalar and array content through the value-position
/// one. An array or map field whose own schema entry declares a reference
/// annotates its elements (or keys) with that entry. Resolution failures are
/// non-fatal; the value simply stays plain.
pub fn annotate(
    schema: &SchemaMetadata,
    entity: &str,
    doc: &ResultDocument,
    query_path: &str,
) -> Vec<Annotation> {
    let mut annotations = Vec::new();
    let fields = match schema.entity(entity) {
        Some(fields) => fields,
        None => return annotations,
    };
    let walker = Walker {
        fields,
        query_path,
        entity,
    };
    for (name, value) in &doc.fields {
        let path = vec![PathSegment::key(name.clone())];
        walker.walk(value, &path, &mut annotations);
    }
    annotations
}

struct Walker<'a> {
    fields: &'a EntityFields,
    query_path: &'a str,
    entity: &'a str,
}

impl Walker<'_> {
    fn walk(&self, value: &Value, path: &[PathSegment], out: &mut Vec<Annotation>) {
        match value {
            Value::Map(entries) => {
                // The field's own entry may declare the map's keys as a
                // collection of identifiers.
                let map_meta = lookup(self.fields, path, LookupPosition::Value)
                    .filter(|meta| meta.is_reference());
                for (key, child) in entries {
                    let mut key_path = path.to_vec();
                    key_path.push(PathSegment::key(key.clone()));

                    match self.try_resolve(&key_path, LookupPosition::Key, key) {
                        Some(descriptor) => out.push(Annotation {
                            path: key_path.clone(),
                            descriptor,
                        }),
                        None => {
                            if let Some(meta) = map_meta {
                                if let Some(descriptor) =
                                    self.descriptor_from(meta, key, &key_path)
                                {
                                    out.push(Annotation {
                                        path: key_path.clone(),
                                        descriptor,
                                    });
                                }
                            }
                        }
                    }
                    self.walk(child, &key_path, out);
                }
            }
            Value::Array(items) => {
                let array_meta = lookup(self.fields, path, LookupPosition::Value)
                    .filter(|meta| meta.is_reference());
                for (i, child) in items.iter().enumerate() {
                    let mut item_path = path.to_vec();
                    item_path.push(PathSegment::index(i));

                    if child.is_container() {
                        self.walk(child, &item_path, out);
                        continue;
                    }
                    let match_value = child.display_string();
                    if let Some(meta) = array_meta {
                        if let Some(descriptor) =
                            self.descriptor_from(meta, &match_value, &item_path)
                        {
                            out.push(Annotation {
                                path: item_path,
                                descriptor,
                            });
                            continue;
                        }
                    }
                    if let Some(descriptor) =
                        self.try_resolve(&item_path, LookupPosition::Value, &match_value)
                    {
                        out.push(Annotation {
                            path: item_path,
                            descriptor,
                        });
                    }
                }
            }
            scalar => {
                let match_value = scalar.display_string();
                if let Some(descriptor) =
                    self.try_resolve(path, LookupPosition::Value, &match_value)
                {
                    out.push(Annotation {
                        path: path.to_vec(),
                        descriptor,
                    });
                }
            }
        }
    }

    fn try_resolve(
        &self,
        path: &[PathSegment],
        position: LookupPosition,
        match_value: &str,
    ) -> Option<ReferenceDescriptor> {
        let meta = lookup(self.fields, path, position)?;
        self.descriptor_from(meta, match_value, path)
    }

    fn descriptor_from(
        &self,
        meta: &FieldMetadata,
        match_value: &str,
        path: &[PathSegment],
    ) -> Option<ReferenceDescriptor> {
        match descriptor_for(meta, match_value, self.query_path) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                let rendered: Vec<String> = path.iter().map(|s| s.to_string()).collect();
                tracing::debug!(
                    entity = self.entity,
                    path = %rendered.join("."),
                    error = %e,
                    "reference left unannotated"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldKind, FieldMetadata};
    use std::collections::BTreeMap;

    fn schema() -> SchemaMetadata {
        let mut schema = SchemaMetadata::new();
        schema.insert_field(
            "posts",
            "author",
            FieldMetadata::new(FieldKind::String)
                .with_collection_ref("users")
                .with_ref_field("name"),
        );
        schema.insert_field(
            "posts",
            "likes.%s",
            FieldMetadata::new(FieldKind::Boolean).with_collection_ref("users"),
        );
        schema.insert_field(
            "posts",
            "tags",
            FieldMetadata::new(FieldKind::Array).with_collection_ref("topics"),
        );
        schema.insert_field(
            "posts",
            "member",
            FieldMetadata::new(FieldKind::String).with_collection_ref("groups/%s/members"),
        );
        schema
    }

    #[test]
    fn test_value_position_direct_field() {
        let descriptor = resolve(
            &schema(),
            "posts",
            &[PathSegment::key("author")],
            LookupPosition::Value,
            "ada",
            "posts",
        )
        .unwrap()
        .unwrap();
        assert_eq!(descriptor.target_path, "users");
        assert_eq!(descriptor.match_field.as_deref(), Some("name"));
        assert_eq!(descriptor.match_value, "ada");
    }

    #[test]
    fn test_key_position_templated_map_key() {
        // likes: {"u1": true} — the displayed key "u1" resolves through
        // the templated entry "likes.%s".
        let descriptor = resolve(
            &schema(),
            "posts",
            &[PathSegment::key("likes"), PathSegment::key("u1")],
            LookupPosition::Key,
            "u1",
            "posts",
        )
        .unwrap()
        .unwrap();
        assert_eq!(descriptor.target_path, "users");
        assert!(descriptor.match_field.is_none());
        assert_eq!(descriptor.match_value, "u1");
    }

    #[test]
    fn test_key_position_phase_misses_direct_field() {
        // In key position the innermost segment inserts a wildcard, so the
        // literal entry "author" must not match a single-segment path.
        let resolved = resolve(
            &schema(),
            "posts",
            &[PathSegment::key("author")],
            LookupPosition::Key,
            "ada",
            "posts",
        )
        .unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn test_no_match_is_none() {
        let resolved = resolve(
            &schema(),
            "posts",
            &[PathSegment::key("title")],
            LookupPosition::Value,
            "hello",
            "posts",
        )
        .unwrap();
        assert!(resolved.is_none());

        let resolved = resolve(
            &schema(),
            "unknown",
            &[PathSegment::key("author")],
            LookupPosition::Value,
            "ada",
            "unknown",
        )
        .unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn test_template_interpolation() {
        let descriptor = resolve(
            &schema(),
            "posts",
            &[PathSegment::key("member")],
            LookupPosition::Value,
            "m1",
            "groups/g1/posts",
        )
        .unwrap()
        .unwrap();
        assert_eq!(descriptor.target_path, "groups/g1/members");
    }

    #[test]
    fn test_under_supplied_placeholder_is_error() {
        let result = resolve(
            &schema(),
            "posts",
            &[PathSegment::key("member")],
            LookupPosition::Value,
            "m1",
            "posts",
        );
        assert!(matches!(result, Err(Error::Unresolvable(_))));
    }

    #[test]
    fn test_literal_preferred_over_templated() {
        let mut schema = SchemaMetadata::new();
        schema.insert_field(
            "posts",
            "meta.owner",
            FieldMetadata::new(FieldKind::String).with_collection_ref("users"),
        );
        schema.insert_field(
            "posts",
            "meta.%s",
            FieldMetadata::new(FieldKind::String).with_collection_ref("groups"),
        );

        // Value position tries the plain dotted key first.
        let descriptor = resolve(
            &schema,
            "posts",
            &[PathSegment::key("meta"), PathSegment::key("owner")],
            LookupPosition::Value,
            "u1",
            "posts",
        )
        .unwrap()
        .unwrap();
        assert_eq!(descriptor.target_path, "users");
    }

    #[test]
    fn test_innermost_match_wins() {
        let mut schema = SchemaMetadata::new();
        schema.insert_field(
            "posts",
            "owner",
            FieldMetadata::new(FieldKind::String).with_collection_ref("users"),
        );
        schema.insert_field(
            "posts",
            "meta.owner",
            FieldMetadata::new(FieldKind::String).with_collection_ref("groups"),
        );

        // The walk checks "owner" before "meta.owner"; innermost wins.
        let descriptor = resolve(
            &schema,
            "posts",
            &[PathSegment::key("meta"), PathSegment::key("owner")],
            LookupPosition::Value,
            "x",
            "posts",
        )
        .unwrap()
        .unwrap();
        assert_eq!(descriptor.target_path, "users");
    }

    #[test]
    fn test_annotate_document() {
        let mut likes = BTreeMap::new();
        likes.insert("u1".to_string(), Value::Bool(true));
        likes.insert("u2".to_string(), Value::Bool(true));

        let doc = ResultDocument::new("p1", "posts/p1")
            .with_field("author", "ada")
            .with_field("title", "hello")
            .with_field(
                "tags",
                Value::Array(vec![Value::String("t1".into()), Value::String("t2".into())]),
            )
            .with_field("likes", Value::Map(likes));

        let annotations = annotate(&schema(), "posts", &doc, "posts");

        let author = annotations
            .iter()
            .find(|a| a.path == vec![PathSegment::key("author")])
            .unwrap();
        assert_eq!(author.descriptor.target_path, "users");
        assert_eq!(author.descriptor.match_value, "ada");

        // Array elements annotate through the field's own entry.
        let tag0 = annotations
            .iter()
            .find(|a| a.path == vec![PathSegment::key("tags"), PathSegment::index(0)])
            .unwrap();
        assert_eq!(tag0.descriptor.target_path, "topics");
        assert_eq!(tag0.descriptor.match_value, "t1");

        // Map keys annotate through the templated key-position entry.
        let like_keys: Vec<_> = annotations
            .iter()
            .filter(|a| a.path.len() == 2 && a.path[0] == PathSegment::key("likes"))
            .collect();
        assert_eq!(like_keys.len(), 2);
        assert!(like_keys.iter().all(|a| a.descriptor.target_path == "users"));

        // Plain fields stay plain.
        assert!(annotations
            .iter()
            .all(|a| a.path != vec![PathSegment::key("title")]));
    }
}
