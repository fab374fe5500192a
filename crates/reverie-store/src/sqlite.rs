//! SQLite-backed user and profile storage.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::{Result, StoreError};

/// A registered Telegram user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub tg_id: i64,
    pub api_key: Option<String>,
}

/// A saved character or persona. The two tables share this shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub id: i64,
    pub name: String,
    pub prompt: String,
}

/// Which profile table an operation targets. Characters describe the
/// roleplay identity; personas describe the user's voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Character,
    Persona,
}

impl ProfileKind {
    fn table(self) -> &'static str {
        match self {
            ProfileKind::Character => "characters",
            ProfileKind::Persona => "personas",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProfileKind::Character => "character",
            ProfileKind::Persona => "persona",
        }
    }
}

/// Shared SQLite connection.
///
/// Clone freely; all clones share one connection behind a mutex. Every
/// operation is a single cheap statement, so callers use the store directly
/// from async handlers.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        debug!(path = %path.as_ref().display(), "opening store");
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory database, used by tests.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tg_id INTEGER UNIQUE NOT NULL,
                api_key TEXT
            );

            CREATE TABLE IF NOT EXISTS characters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                prompt TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS personas (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                prompt TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Fetch the user row for a Telegram id, creating it on first contact.
    pub fn ensure_user(&self, tg_id: i64) -> Result<UserRecord> {
        let conn = self.conn.lock().unwrap();
        if let Some(user) = Self::find_user(&conn, tg_id)? {
            return Ok(user);
        }
        conn.execute("INSERT INTO users (tg_id) VALUES (?1)", params![tg_id])?;
        Ok(UserRecord {
            id: conn.last_insert_rowid(),
            tg_id,
            api_key: None,
        })
    }

    fn find_user(conn: &Connection, tg_id: i64) -> Result<Option<UserRecord>> {
        let user = conn
            .query_row(
                "SELECT id, tg_id, api_key FROM users WHERE tg_id = ?1",
                params![tg_id],
                |row| {
                    Ok(UserRecord {
                        id: row.get(0)?,
                        tg_id: row.get(1)?,
                        api_key: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Store (or replace) the user's API key, creating the user if needed.
    pub fn set_api_key(&self, tg_id: i64, api_key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (tg_id, api_key) VALUES (?1, ?2)
             ON CONFLICT(tg_id) DO UPDATE SET api_key = excluded.api_key",
            params![tg_id, api_key],
        )?;
        Ok(())
    }

    /// The user's stored API key, if any.
    pub fn api_key(&self, tg_id: i64) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        Ok(Self::find_user(&conn, tg_id)?.and_then(|user| user.api_key))
    }

    /// Save a new profile for the user. Fails if the user is not registered.
    pub fn add_profile(
        &self,
        kind: ProfileKind,
        tg_id: i64,
        name: &str,
        prompt: &str,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let owner =
            Self::find_user(&conn, tg_id)?.ok_or(StoreError::UnknownUser(tg_id))?;
        conn.execute(
            &format!(
                "INSERT INTO {} (owner_id, name, prompt) VALUES (?1, ?2, ?3)",
                kind.table()
            ),
            params![owner.id, name, prompt],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All of the user's saved profiles of the given kind, oldest first.
    pub fn profiles(&self, kind: ProfileKind, tg_id: i64) -> Result<Vec<ProfileRecord>> {
        let conn = self.conn.lock().unwrap();
        let Some(owner) = Self::find_user(&conn, tg_id)? else {
            return Ok(Vec::new());
        };
        let mut stmt = conn.prepare(&format!(
            "SELECT id, name, prompt FROM {} WHERE owner_id = ?1 ORDER BY id",
            kind.table()
        ))?;
        let rows = stmt.query_map(params![owner.id], |row| {
            Ok(ProfileRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                prompt: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Delete one of the user's profiles. Returns false when the profile
    /// does not exist or belongs to someone else.
    pub fn delete_profile(&self, kind: ProfileKind, tg_id: i64, profile_id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let Some(owner) = Self::find_user(&conn, tg_id)? else {
            return Ok(false);
        };
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE id = ?1 AND owner_id = ?2",
                kind.table()
            ),
            params![profile_id, owner.id],
        )?;
        Ok(deleted > 0)
    }
}
