use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use chrono::SecondsFormat;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::NotificationRequest;

pub type Db = Arc<Mutex<Connection>>;

pub const COUNTRIES_KEY: &str = "SavedCountries";
pub const PACKING_ITEMS_KEY: &str = "SavedPackingItems";
pub const REMINDER_KEY: &str = "SavedReminder";
pub const DATA_URL_KEY: &str = "CountriesDataURL";

pub fn open(path: impl AsRef<Path>) -> Result<Db> {
    let connection = Connection::open(path)?;
    let conn = Arc::new(Mutex::new(connection));
    init_db(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Db> {
    let conn = Arc::new(Mutex::new(Connection::open_in_memory()?));
    init_db(&conn)?;
    Ok(conn)
}

fn lock(conn: &Db) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| anyhow!("database lock poisoned"))
}

pub fn init_db(conn: &Db) -> Result<()> {
    let conn = lock(conn)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv_store (
            key         TEXT PRIMARY KEY,
            value       BLOB NOT NULL,
            updated_at  DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS pending_notifications (
            identifier  TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            body        TEXT NOT NULL,
            fire_at     TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

pub fn ping(conn: &Db) -> bool {
    lock(conn)
        .map(|c| c.execute_batch("SELECT 1").is_ok())
        .unwrap_or(false)
}

/// Serializes `value` and stores it under `key`, replacing any previous blob.
pub fn save<T: Serialize + ?Sized>(conn: &Db, key: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    let conn = lock(conn)?;
    conn.execute(
        "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        params![key, bytes],
    )?;
    debug!(key, bytes = bytes.len(), "saved blob");
    Ok(())
}

/// Reads the blob under `key`. Missing, unreadable and malformed data all come back as `None`.
pub fn load<T: DeserializeOwned>(conn: &Db, key: &str) -> Option<T> {
    let bytes = load_raw(conn, key)?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, "ignoring malformed stored value: {e}");
            None
        }
    }
}

pub fn load_raw(conn: &Db, key: &str) -> Option<Vec<u8>> {
    let conn = lock(conn).ok()?;
    conn.query_row(
        "SELECT value FROM kv_store WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .unwrap_or_else(|e| {
        warn!(key, "failed to read stored value: {e}");
        None
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Pending notifications
// ────────────────────────────────────────────────────────────────────────────

pub fn insert_notification(conn: &Db, request: &NotificationRequest) -> Result<()> {
    let conn = lock(conn)?;
    conn.execute(
        "INSERT OR REPLACE INTO pending_notifications (identifier, title, body, fire_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            request.identifier,
            request.title,
            request.body,
            request.fire_at.to_rfc3339_opts(SecondsFormat::Nanos, true)
        ],
    )?;
    Ok(())
}

pub fn delete_notifications(conn: &Db, identifiers: &[&str]) -> Result<usize> {
    let conn = lock(conn)?;
    let mut removed = 0;
    for identifier in identifiers {
        removed += conn.execute(
            "DELETE FROM pending_notifications WHERE identifier = ?1",
            params![identifier],
        )?;
    }
    Ok(removed)
}

pub fn list_notifications(conn: &Db) -> Result<Vec<NotificationRequest>> {
    let conn = lock(conn)?;
    let mut stmt = conn.prepare(
        "SELECT identifier, title, body, fire_at FROM pending_notifications ORDER BY fire_at",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(identifier, title, body, fire_at)| -> Result<NotificationRequest> {
            let fire_at = chrono::DateTime::parse_from_rfc3339(&fire_at)?.to_utc();
            Ok(NotificationRequest {
                identifier,
                title,
                body,
                fire_at,
            })
        })
        .collect()
}
