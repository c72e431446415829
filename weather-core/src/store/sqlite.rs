use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    error::StoreError,
    model::{NewObservation, Observation},
};

use super::{RecordStore, StoreTransaction};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS weather (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        recorded_at TEXT NOT NULL UNIQUE,
        humidity    REAL NOT NULL,
        temperature REAL NOT NULL,
        created_at  TEXT,
        updated_at  TEXT,
        deleted_at  TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_weather_deleted_at ON weather (deleted_at);";

const SELECT: &str = "SELECT id, recorded_at, humidity, temperature, created_at, updated_at, deleted_at
     FROM weather";

/// SQLite-backed [`RecordStore`].
///
/// The connection sits behind an async mutex; an open transaction keeps the
/// guard, so creates are serialized.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Run raw SQL against the database. Used by tests to plant rows the
    /// service would never write.
    #[cfg(test)]
    pub(crate) async fn execute_raw(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.lock().await.execute_batch(sql)?;
        Ok(())
    }
}

/// Column values as read, before timestamp parsing.
type RawRow = (i64, String, f64, f64, Option<String>, Option<String>, Option<String>);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn parse_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(&v)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|_| StoreError::Timestamp { value: v })
        })
        .transpose()
}

fn into_observation(row: RawRow) -> Result<Observation, StoreError> {
    let (id, recorded_at, humidity, temperature, created_at, updated_at, deleted_at) = row;
    Ok(Observation {
        id,
        recorded_at,
        humidity,
        temperature,
        created_at: parse_timestamp(created_at)?,
        updated_at: parse_timestamp(updated_at)?,
        deleted_at: parse_timestamp(deleted_at)?,
    })
}

fn query(
    conn: &Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<Observation>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, read_row)?.collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(into_observation).collect()
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn find_on(&self, date: &str) -> Result<Vec<Observation>, StoreError> {
        let conn = self.conn.lock().await;
        query(
            &conn,
            &format!("{SELECT} WHERE recorded_at = ?1 AND deleted_at IS NULL ORDER BY id"),
            params![date],
        )
    }

    async fn find_between(&self, from: &str, to: &str) -> Result<Vec<Observation>, StoreError> {
        let conn = self.conn.lock().await;
        query(
            &conn,
            &format!(
                "{SELECT} WHERE recorded_at >= ?1 AND recorded_at <= ?2 AND deleted_at IS NULL
                 ORDER BY recorded_at, id"
            ),
            params![from, to],
        )
    }

    async fn begin<'a>(&'a self) -> Result<Box<dyn StoreTransaction + 'a>, StoreError> {
        let conn = self.conn.lock().await;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Box::new(SqliteTransaction { conn, finished: false }))
    }
}

/// A `BEGIN IMMEDIATE` transaction holding the connection lock.
pub struct SqliteTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

#[async_trait]
impl StoreTransaction for SqliteTransaction<'_> {
    async fn exists_on(&mut self, date: &str) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM weather WHERE recorded_at = ?1 AND deleted_at IS NULL LIMIT 1",
                params![date],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    async fn insert(&mut self, record: &NewObservation) -> Result<Observation, StoreError> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT INTO weather (recorded_at, humidity, temperature, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![record.recorded_at, record.humidity, record.temperature, now],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                return Err(StoreError::Duplicate(record.recorded_at.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        let id = self.conn.last_insert_rowid();
        let row = self
            .conn
            .query_row(&format!("{SELECT} WHERE id = ?1"), params![id], read_row)?;
        into_observation(row)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut tx = self;
        tx.conn.execute_batch("COMMIT")?;
        tx.finished = true;
        Ok(())
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            tracing::warn!("Failed to roll back weather transaction: {e}");
        }
    }
}
