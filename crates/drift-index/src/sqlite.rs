//! Durable index backed by a SQLite database file.
//!
//! Schema (one table per namespace):
//!
//! ```sql
//! CREATE TABLE queries  (id INTEGER PRIMARY KEY AUTOINCREMENT,
//!                        query_text   TEXT NOT NULL,
//!                        file_hash    TEXT NOT NULL);
//! CREATE TABLE sessions (id INTEGER PRIMARY KEY AUTOINCREMENT,
//!                        session_name TEXT NOT NULL UNIQUE,
//!                        file_hash    TEXT NOT NULL);
//! ```
//!
//! Hashes are stored as 64-character lowercase hex.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info, warn};

use drift_types::ContentHash;

use crate::error::{IndexError, IndexResult};
use crate::names::validate_name;
use crate::traits::NamedIndex;
use crate::types::{IndexRecord, Namespace};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS queries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        query_text TEXT NOT NULL,
        file_hash TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS queries_by_text ON queries (query_text);
    CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_name TEXT NOT NULL UNIQUE,
        file_hash TEXT NOT NULL
    );
";

/// A [`NamedIndex`] persisted in SQLite.
///
/// The connection sits behind a `Mutex`; every operation is a single
/// statement, so each insert or delete is atomic on its own.
#[derive(Debug)]
pub struct SqliteNamedIndex {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteNamedIndex {
    /// Open (or create) the index database at `path`.
    pub fn open(path: impl AsRef<Path>) -> IndexResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        let index = Self::init(conn, Some(path))?;
        info!(path = ?index.path, "opened index database");
        Ok(index)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> IndexResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> IndexResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file, or `None` for an in-memory index.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> IndexResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| IndexError::LockPoisoned(e.to_string()))
    }

    fn to_record(namespace: Namespace, id: i64, name: String, hex: String) -> IndexResult<IndexRecord> {
        let hash = ContentHash::from_hex(&hex).map_err(|e| IndexError::CorruptRecord {
            id,
            reason: e.to_string(),
        })?;
        Ok(IndexRecord {
            id,
            namespace,
            name,
            hash,
        })
    }

    fn lookup(
        conn: &Connection,
        namespace: Namespace,
        name: &str,
    ) -> IndexResult<Option<IndexRecord>> {
        let sql = format!(
            "SELECT id, {col}, file_hash FROM {table} WHERE {col} = ?1 ORDER BY id DESC LIMIT 1",
            col = namespace.name_column(),
            table = namespace.table(),
        );
        Self::query_one(conn, namespace, &sql, params![name])
    }

    fn query_one(
        conn: &Connection,
        namespace: Namespace,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> IndexResult<Option<IndexRecord>> {
        let row: Option<(i64, String, String)> = conn
            .query_row(sql, params, |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .optional()?;
        row.map(|(id, name, hex)| Self::to_record(namespace, id, name, hex))
            .transpose()
    }
}

impl NamedIndex for SqliteNamedIndex {
    fn register(
        &self,
        namespace: Namespace,
        name: &str,
        hash: ContentHash,
    ) -> IndexResult<IndexRecord> {
        validate_name(namespace, name)?;
        let conn = self.conn()?;

        if namespace == Namespace::Session && Self::lookup(&conn, namespace, name)?.is_some() {
            return Err(IndexError::Conflict {
                namespace,
                name: name.to_string(),
            });
        }

        let sql = format!(
            "INSERT INTO {table} ({col}, file_hash) VALUES (?1, ?2)",
            col = namespace.name_column(),
            table = namespace.table(),
        );
        match conn.execute(&sql, params![name, hash.to_hex()]) {
            Ok(_) => {}
            // Another process took the name between lookup and insert.
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(IndexError::Conflict {
                    namespace,
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let record = IndexRecord {
            id: conn.last_insert_rowid(),
            namespace,
            name: name.to_string(),
            hash,
        };
        debug!(%namespace, name, id = record.id, hash = %hash.short_hex(), "registered name");
        Ok(record)
    }

    fn record(&self, namespace: Namespace, name: &str) -> IndexResult<Option<IndexRecord>> {
        let conn = self.conn()?;
        Self::lookup(&conn, namespace, name)
    }

    fn record_for(
        &self,
        namespace: Namespace,
        name: &str,
        hash: ContentHash,
    ) -> IndexResult<Option<IndexRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT id, {col}, file_hash FROM {table} WHERE {col} = ?1 AND file_hash = ?2 \
             ORDER BY id LIMIT 1",
            col = namespace.name_column(),
            table = namespace.table(),
        );
        Self::query_one(&conn, namespace, &sql, params![name, hash.to_hex()])
    }

    fn unregister(&self, namespace: Namespace, name: &str) -> IndexResult<bool> {
        let conn = self.conn()?;
        let sql = format!(
            "DELETE FROM {table} WHERE {col} = ?1",
            col = namespace.name_column(),
            table = namespace.table(),
        );
        let removed = conn.execute(&sql, params![name])?;
        if removed == 0 {
            warn!(%namespace, name, "no such name in the index");
            return Ok(false);
        }
        debug!(%namespace, name, removed, "unregistered name");
        Ok(true)
    }

    fn list(&self, namespace: Namespace) -> IndexResult<Vec<IndexRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT id, {col}, file_hash FROM {table} ORDER BY id",
            col = namespace.name_column(),
            table = namespace.table(),
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, name, hex) = row?;
            records.push(Self::to_record(namespace, id, name, hex)?);
        }
        Ok(records)
    }
}
