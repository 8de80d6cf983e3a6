//! Durable storage for the session record.
//!
//! A store holds at most one [`PersistedSession`], JSON-encoded under a
//! fixed key. It is read once at startup, written on each successful
//! login and deleted on logout.

use std::path::Path;
use std::sync::{Arc, Mutex};

use redb::{Database, TableDefinition};

use crate::error::StoreError;
use crate::session::PersistedSession;

/// Key the session record is stored under.
pub const SESSION_KEY: &str = "odoo_session";

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("session");

/// Persistence backend for the session record.
pub trait SessionStore: Send + Sync {
    /// The stored record, or `None` if nothing is stored.
    fn load(&self) -> Result<Option<PersistedSession>, StoreError>;

    /// Replace the stored record.
    fn save(&self, record: &PersistedSession) -> Result<(), StoreError>;

    /// Delete the stored record. Deleting an absent record is not an error.
    fn clear(&self) -> Result<(), StoreError>;
}

fn encode(record: &PersistedSession) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(record).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<PersistedSession, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

// ── MemorySessionStore ──────────────────────────────────────────────

/// In-process store. Holds the encoded bytes so a corrupt record can be
/// planted in tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Vec<u8>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes as the record.
    pub fn with_raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            slot: Mutex::new(Some(bytes.into())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<Vec<u8>>>, StoreError> {
        self.slot
            .lock()
            .map_err(|_| StoreError::Storage("session slot poisoned".to_string()))
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<PersistedSession>, StoreError> {
        match self.lock()?.as_deref() {
            Some(bytes) => decode(bytes).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, record: &PersistedSession) -> Result<(), StoreError> {
        let bytes = encode(record)?;
        *self.lock()? = Some(bytes);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.lock()? = None;
        Ok(())
    }
}

// ── RedbSessionStore ────────────────────────────────────────────────

/// Store backed by an embedded redb file.
pub struct RedbSessionStore {
    db: Arc<Database>,
    key: String,
}

fn storage<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Storage(e.to_string())
}

impl RedbSessionStore {
    /// Open or create the database at `path`, using [`SESSION_KEY`].
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::open_with_key(path, SESSION_KEY)
    }

    /// Open or create the database at `path`, storing the record under `key`.
    pub fn open_with_key(path: &Path, key: &str) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(storage)?;

        // Create the table up front so reads never hit a missing table.
        let txn = db.begin_write().map_err(storage)?;
        {
            let _table = txn.open_table(TABLE).map_err(storage)?;
        }
        txn.commit().map_err(storage)?;

        Ok(Self {
            db: Arc::new(db),
            key: key.to_string(),
        })
    }
}

impl SessionStore for RedbSessionStore {
    fn load(&self) -> Result<Option<PersistedSession>, StoreError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(TABLE).map_err(storage)?;
        match table.get(self.key.as_str()).map_err(storage)? {
            Some(val) => decode(val.value()).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, record: &PersistedSession) -> Result<(), StoreError> {
        let bytes = encode(record)?;
        let txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = txn.open_table(TABLE).map_err(storage)?;
            table.insert(self.key.as_str(), bytes.as_slice()).map_err(storage)?;
        }
        txn.commit().map_err(storage)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = txn.open_table(TABLE).map_err(storage)?;
            table.remove(self.key.as_str()).map_err(storage)?;
        }
        txn.commit().map_err(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PersistedSession {
        PersistedSession {
            session_id: Some("abc".into()),
            uid: Some(7),
            db: Some("mycompany".into()),
        }
    }

    #[test]
    fn test_memory_roundtrip() {
        let store = MemorySessionStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&record()).unwrap();
        assert_eq!(store.load().unwrap(), Some(record()));
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_memory_corrupt_record() {
        let store = MemorySessionStore::with_raw("not json");
        assert!(matches!(store.load(), Err(StoreError::Serialization(_))));
    }

    #[test]
    fn test_redb_roundtrip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.redb");
        {
            let store = RedbSessionStore::open(&path).unwrap();
            assert!(store.load().unwrap().is_none());
            store.save(&record()).unwrap();
        }
        let store = RedbSessionStore::open(&path).unwrap();
        assert_eq!(store.load().unwrap(), Some(record()));
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn test_redb_keys_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.redb");
        let a = RedbSessionStore::open_with_key(&path, "odoo_session:a").unwrap();
        a.save(&record()).unwrap();
        drop(a);
        let b = RedbSessionStore::open_with_key(&path, "odoo_session:b").unwrap();
        assert!(b.load().unwrap().is_none());
    }
}
