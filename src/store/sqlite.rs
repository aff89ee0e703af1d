//! SQLite-backed limit store.

use std::path::Path;
use std::sync::{Arc, Mutex};
use rusqlite::{Connection, params};

use crate::store::{ClientLimit, LimitStore, StoreError};

/// Client limits kept in a `client_limits` table.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn)?;
        tracing::info!(path = %path.display(), "Limit store opened");
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS client_limits (
                client_id TEXT PRIMARY KEY,
                capacity INTEGER NOT NULL,
                refill_rate INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert or replace a client's limit.
    pub fn upsert(&self, limit: &ClientLimit) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("limit store mutex poisoned");
        conn.execute(
            "INSERT INTO client_limits (client_id, capacity, refill_rate)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(client_id) DO UPDATE SET
                capacity = excluded.capacity,
                refill_rate = excluded.refill_rate",
            params![limit.client_id, limit.capacity, limit.refill_rate],
        )?;
        Ok(())
    }
}

impl LimitStore for SqliteStore {
    fn load(&self) -> Result<Vec<ClientLimit>, StoreError> {
        let conn = self.conn.lock().expect("limit store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT client_id, capacity, refill_rate FROM client_limits ORDER BY client_id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut limits = Vec::new();
        for row in rows {
            let (client_id, capacity, refill_rate) = row?;
            let capacity = to_u32(&client_id, "capacity", capacity)?;
            let refill_rate = to_u32(&client_id, "refill_rate", refill_rate)?;
            limits.push(ClientLimit {
                client_id,
                capacity,
                refill_rate,
            });
        }
        Ok(limits)
    }
}

fn to_u32(client_id: &str, column: &str, value: i64) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::InvalidRow {
        client_id: client_id.to_string(),
        reason: format!("{column} out of range: {value}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_load() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(&ClientLimit::new("10.0.0.2", 5, 2)).unwrap();
        store.upsert(&ClientLimit::new("10.0.0.1", 3, 1)).unwrap();
        store.upsert(&ClientLimit::new("10.0.0.2", 7, 4)).unwrap();

        let limits = store.load().unwrap();
        assert_eq!(
            limits,
            vec![ClientLimit::new("10.0.0.1", 3, 1), ClientLimit::new("10.0.0.2", 7, 4)]
        );
    }

    #[test]
    fn test_negative_values_are_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO client_limits (client_id, capacity, refill_rate) VALUES ('bad', -1, 1)",
                [],
            )
            .unwrap();
        }

        assert!(matches!(store.load(), Err(StoreError::InvalidRow { ref client_id, .. }) if client_id == "bad"));
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("limits.db");

        SqliteStore::open(&path)
            .unwrap()
            .upsert(&ClientLimit::new("client", 9, 3))
            .unwrap();

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap(), vec![ClientLimit::new("client", 9, 3)]);
    }
}
