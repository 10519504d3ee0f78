//! SQLite-backed per-user decision store.
//!
//! Each read-modify-write of one user runs inside an `IMMEDIATE` transaction,
//! so concurrent writers (threads or processes) are serialized by SQLite and no
//! update is lost. Decisions are point inserts keyed by `(user_id, entry_index)`.

pub mod legacy;

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use gobble::{DecidedSet, UserState};

use crate::types::McpResult;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY,
    last_shown INTEGER,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS decisions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(user_id),
    entry_index INTEGER NOT NULL,
    UNIQUE (user_id, entry_index)
);
";

/// A user's state as loaded inside one store transaction.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub state: UserState,
    /// Index of the entry most recently presented to the user.
    pub last_shown: Option<usize>,
    /// Whether this transaction created the user.
    pub created: bool,
    pub created_at: String,
}

/// Persistent user store.
pub struct UserStore {
    db: Connection,
}

impl UserStore {
    /// Open or create a store at the given path.
    pub fn open(path: &Path) -> McpResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Connection::open(path)?;
        Self::init(db)
    }

    /// A throwaway store.
    pub fn open_in_memory() -> McpResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(db: Connection) -> McpResult<Self> {
        db.busy_timeout(std::time::Duration::from_secs(5))?;
        db.execute_batch(SCHEMA)?;
        Ok(Self { db })
    }

    /// Load a user, creating it on first contact, and let `f` modify it.
    ///
    /// New decided indices and a changed `last_shown` are written back when
    /// `f` succeeds. If `f` fails nothing is written, including the creation.
    pub fn update<T, F>(&mut self, user_id: i64, f: F) -> McpResult<T>
    where
        F: FnOnce(&mut UserRecord) -> McpResult<T>,
    {
        let tx = self
            .db
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let created = tx.execute(
            "INSERT OR IGNORE INTO users (user_id, last_shown, created_at) VALUES (?1, NULL, ?2)",
            params![user_id, Utc::now().to_rfc3339()],
        )? > 0;
        if created {
            tracing::info!("Created user {user_id}");
        }

        let (last_shown, created_at): (Option<i64>, String) = tx.query_row(
            "SELECT last_shown, created_at FROM users WHERE user_id = ?1",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let decided = {
            let mut stmt = tx.prepare(
                "SELECT entry_index FROM decisions WHERE user_id = ?1 ORDER BY id",
            )?;
            let rows = stmt
                .query_map(params![user_id], |row| row.get::<_, i64>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter()
                .filter_map(|i| usize::try_from(i).ok())
                .collect::<DecidedSet>()
        };

        let mut record = UserRecord {
            state: UserState { user_id, decided },
            last_shown: last_shown.and_then(|i| usize::try_from(i).ok()),
            created,
            created_at,
        };
        let known = record.state.decided.len();
        let shown_before = record.last_shown;

        let result = f(&mut record)?;

        for index in record.state.decided.iter().skip(known) {
            tx.execute(
                "INSERT OR IGNORE INTO decisions (user_id, entry_index) VALUES (?1, ?2)",
                params![user_id, index as i64],
            )?;
        }
        if record.last_shown != shown_before {
            tx.execute(
                "UPDATE users SET last_shown = ?2 WHERE user_id = ?1",
                params![user_id, record.last_shown.map(|i| i as i64)],
            )?;
        }

        tx.commit()?;
        Ok(result)
    }

    /// Load a user's record, creating the user if needed.
    pub fn load(&mut self, user_id: i64) -> McpResult<UserRecord> {
        self.update(user_id, |record| Ok(record.clone()))
    }

    /// Number of known users.
    pub fn user_count(&self) -> McpResult<usize> {
        let count: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Ids of all known users in ascending order.
    pub fn user_ids(&self) -> McpResult<Vec<i64>> {
        let mut stmt = self.db.prepare("SELECT user_id FROM users ORDER BY user_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Whether a user exists, without creating it.
    pub fn exists(&self, user_id: i64) -> McpResult<bool> {
        let found = self
            .db
            .query_row(
                "SELECT 1 FROM users WHERE user_id = ?1",
                params![user_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_load_creates_empty_user() {
        let mut store = UserStore::open_in_memory().unwrap();
        assert!(!store.exists(42).unwrap());

        let record = store.load(42).unwrap();
        assert!(record.created);
        assert!(record.state.decided.is_empty());
        assert_eq!(record.last_shown, None);
        assert!(store.exists(42).unwrap());

        let again = store.load(42).unwrap();
        assert!(!again.created);
        assert_eq!(store.user_count().unwrap(), 1);
    }

    #[test]
    fn test_update_persists_new_decisions_in_order() {
        let mut store = UserStore::open_in_memory().unwrap();
        store
            .update(1, |r| {
                r.state.decided.insert(4);
                r.state.decided.insert(1);
                r.last_shown = Some(1);
                Ok(())
            })
            .unwrap();
        store
            .update(1, |r| {
                r.state.decided.insert(1);
                r.state.decided.insert(3);
                Ok(())
            })
            .unwrap();

        let record = store.load(1).unwrap();
        assert_eq!(record.state.decided.iter().collect::<Vec<_>>(), vec![4, 1, 3]);
        assert_eq!(record.last_shown, Some(1));
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let mut store = UserStore::open_in_memory().unwrap();
        let result: McpResult<()> = store.update(7, |r| {
            r.state.decided.insert(0);
            Err(crate::types::McpError::InvalidParams("nope".to_string()))
        });
        assert!(result.is_err());
        assert!(!store.exists(7).unwrap());
    }

    #[test]
    fn test_users_are_isolated() {
        let mut store = UserStore::open_in_memory().unwrap();
        store
            .update(1, |r| {
                r.state.decided.insert(2);
                Ok(())
            })
            .unwrap();
        assert!(store.load(2).unwrap().state.decided.is_empty());
        assert_eq!(store.user_ids().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("users.db");
        {
            let mut store = UserStore::open(&path).unwrap();
            store
                .update(99, |r| {
                    r.state.decided.insert(5);
                    Ok(())
                })
                .unwrap();
        }
        let mut store = UserStore::open(&path).unwrap();
        let record = store.load(99).unwrap();
        assert!(!record.created);
        assert!(record.state.decided.contains(5));
    }

    #[test]
    fn test_two_connections_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        let mut a = UserStore::open(&path).unwrap();
        let mut b = UserStore::open(&path).unwrap();

        a.update(1, |r| {
            r.state.decided.insert(0);
            Ok(())
        })
        .unwrap();
        b.update(1, |r| {
            r.state.decided.insert(1);
            Ok(())
        })
        .unwrap();

        let record = a.load(1).unwrap();
        assert_eq!(record.state.decided.len(), 2);
    }
}
