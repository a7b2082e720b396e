//! Saved-query persistence.
//!
//! A keyed table of [`QueryState`] records in sled: primary key `id`, with
//! secondary index trees by title and by `updated_at` (for the "most recent"
//! lookup). Upserts are last-writer-wins by id; there is no merging.

use docbench_proto::QueryState;
use sled::{Db, Tree};

use crate::error::Error;

/// Tree name for query records.
const QUERY_TREE: &str = "saved:queries";

/// Tree name for the title index (title + NUL + id → id).
const TITLE_INDEX_TREE: &str = "saved:index:title";

/// Tree name for the updated-at index (sortable timestamp + id → id).
const UPDATED_INDEX_TREE: &str = "saved:index:updated_at";

/// The saved-query store.
pub struct SavedQueryStore {
    /// Query records by id.
    queries: Tree,
    /// Secondary index by title.
    title_index: Tree,
    /// Secondary index by updated-at, big-endian so iteration is
    /// chronological.
    updated_index: Tree,
}

impl SavedQueryStore {
    /// Open or create the store inside the given sled database.
    pub fn open(db: &Db) -> Result<Self, Error> {
        Ok(Self {
            queries: db.open_tree(QUERY_TREE)?,
            title_index: db.open_tree(TITLE_INDEX_TREE)?,
            updated_index: db.open_tree(UPDATED_INDEX_TREE)?,
        })
    }

    /// Upsert a query by id, overwriting any existing entry.
    pub fn put(&self, query: &QueryState) -> Result<(), Error> {
        // Drop the old index entries first so a title or timestamp change
        // leaves no stale pointers behind.
        if let Some(old) = self.get(&query.id)? {
            self.title_index.remove(title_key(&old))?;
            self.updated_index.remove(updated_key(&old))?;
        }

        let bytes = serde_json::to_vec(query)?;
        self.queries.insert(query.id.as_bytes(), bytes)?;
        self.title_index
            .insert(title_key(query), query.id.as_bytes())?;
        self.updated_index
            .insert(updated_key(query), query.id.as_bytes())?;

        tracing::debug!(id = %query.id, title = %query.title, "saved query");
        Ok(())
    }

    /// Get a query by id.
    pub fn get(&self, id: &str) -> Result<Option<QueryState>, Error> {
        match self.queries.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Delete a query by id. Returns whether an entry existed.
    pub fn delete(&self, id: &str) -> Result<bool, Error> {
        let old = match self.get(id)? {
            Some(old) => old,
            None => return Ok(false),
        };
        self.title_index.remove(title_key(&old))?;
        self.updated_index.remove(updated_key(&old))?;
        self.queries.remove(id.as_bytes())?;
        Ok(true)
    }

    /// All saved queries, in id order.
    pub fn list_all(&self) -> Result<Vec<QueryState>, Error> {
        let mut queries = Vec::new();
        for entry in self.queries.iter() {
            let (_, bytes) = entry?;
            queries.push(serde_json::from_slice(&bytes)?);
        }
        Ok(queries)
    }

    /// The entry with the greatest `updated_at`, if any.
    pub fn get_latest(&self) -> Result<Option<QueryState>, Error> {
        for entry in self.updated_index.iter().rev() {
            let (_, id_bytes) = entry?;
            let id = String::from_utf8_lossy(&id_bytes).to_string();
            if let Some(query) = self.get(&id)? {
                return Ok(Some(query));
            }
        }
        Ok(None)
    }

    /// All queries with the given title, most recently updated first.
    pub fn get_by_title(&self, title: &str) -> Result<Vec<QueryState>, Error> {
        let mut prefix = title.as_bytes().to_vec();
        prefix.push(0);
        let mut queries = Vec::new();
        for entry in self.title_index.scan_prefix(prefix) {
            let (_, id_bytes) = entry?;
            let id = String::from_utf8_lossy(&id_bytes).to_string();
            if let Some(query) = self.get(&id)? {
                queries.push(query);
            }
        }
        queries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(queries)
    }

    /// Number of saved queries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

fn title_key(query: &QueryState) -> Vec<u8> {
    let mut key = query.title.as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(query.id.as_bytes());
    key
}

fn updated_key(query: &QueryState) -> Vec<u8> {
    // Sign-flipped micros so big-endian bytes sort chronologically even for
    // pre-epoch timestamps.
    let micros = query.updated_at.timestamp_micros();
    let sortable = (micros as u64) ^ (1 << 63);
    let mut key = sortable.to_be_bytes().to_vec();
    key.extend_from_slice(query.id.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use docbench_proto::SourceScope;

    fn open_store() -> (tempfile::TempDir, SavedQueryStore) {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let store = SavedQueryStore::open(&db).unwrap();
        (dir, store)
    }

    fn query(title: &str) -> QueryState {
        QueryState::new()
            .with_title(title)
            .with_source(SourceScope::Collection, "users")
    }

    #[test]
    fn test_put_get_roundtrip() {
        let (_dir, store) = open_store();
        let q = query("first");
        store.put(&q).unwrap();

        let got = store.get(&q.id).unwrap().unwrap();
        assert_eq!(got, q);
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_upsert_overwrites() {
        let (_dir, store) = open_store();
        let q = query("first");
        store.put(&q).unwrap();

        let renamed = q.clone().with_title("renamed").touched();
        store.put(&renamed).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&q.id).unwrap().unwrap().title, "renamed");
        // The old title index entry must be gone.
        assert!(store.get_by_title("first").unwrap().is_empty());
        assert_eq!(store.get_by_title("renamed").unwrap().len(), 1);
    }

    #[test]
    fn test_get_latest() {
        let (_dir, store) = open_store();
        let mut a = query("a");
        let mut b = query("b");
        let now = Utc::now();
        a.updated_at = now - Duration::minutes(5);
        b.updated_at = now;
        store.put(&a).unwrap();
        store.put(&b).unwrap();

        assert_eq!(store.get_latest().unwrap().unwrap().id, b.id);

        // Touching `a` makes it the most recent.
        a.updated_at = now + Duration::minutes(1);
        store.put(&a).unwrap();
        assert_eq!(store.get_latest().unwrap().unwrap().id, a.id);
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = open_store();
        let q = query("doomed");
        store.put(&q).unwrap();

        assert!(store.delete(&q.id).unwrap());
        assert!(!store.delete(&q.id).unwrap());
        assert!(store.get(&q.id).unwrap().is_none());
        assert!(store.get_latest().unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_list_all() {
        let (_dir, store) = open_store();
        store.put(&query("a")).unwrap();
        store.put(&query("b")).unwrap();
        store.put(&query("c")).unwrap();
        assert_eq!(store.list_all().unwrap().len(), 3);
    }

    #[test]
    fn test_title_lookup_shares_titles() {
        let (_dir, store) = open_store();
        let mut first = query("shared");
        let second = query("shared");
        first.updated_at = Utc::now() - Duration::minutes(1);
        store.put(&first).unwrap();
        store.put(&second).unwrap();

        let found = store.get_by_title("shared").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, second.id);
    }
}
