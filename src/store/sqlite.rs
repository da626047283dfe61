use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};

use super::{ArtifactStore, ACTION_HISTORY_SET, WORKFLOW_HISTORY_SET};
use crate::errors::{Result, UsesGraphError};
use crate::types::*;

/// The embedded SQL schema applied when initializing a new store.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// SQLite-backed artifact store.
///
/// The connection sits behind a mutex so one store can be shared by every
/// thread taking part in a traversal.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Returns the current UNIX timestamp in seconds.
fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn store_error(operation: &str, what: &str, e: impl std::fmt::Display) -> UsesGraphError {
    UsesGraphError::Store {
        message: format!("failed to {what}: {e}"),
        operation: operation.to_string(),
    }
}

/// Maps a row from the `objects` table to a `StoredObject`.
fn row_to_object(row: &rusqlite::Row) -> rusqlite::Result<StoredObject> {
    let kind_str: String = row.get("kind")?;
    let vis_str: String = row.get("visibility")?;

    Ok(StoredObject {
        key: row.get("key")?,
        contents: row.get("contents")?,
        metadata: ObjectMetadata {
            kind: ArtifactKind::from_str(&kind_str).unwrap_or(ArtifactKind::Action),
            url: row.get("url")?,
            visibility: Visibility::from_str(&vis_str).unwrap_or_default(),
            provenance: row.get("provenance")?,
            content_hash: row.get("content_hash")?,
        },
        stored_at: row.get("stored_at")?,
    })
}

impl SqliteStore {
    /// Creates a new store at `db_path`, creating parent directories if needed.
    ///
    /// Applies performance pragmas and the schema. Initializing an existing
    /// store keeps its contents.
    pub fn initialize(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| store_error("initialize", "create store directory", e))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| store_error("initialize", "open store", e))?;

        Self::apply_pragmas(&conn)?;

        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| store_error("initialize", "apply schema", e))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an existing store at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        if !db_path.exists() {
            return Err(UsesGraphError::Store {
                message: format!(
                    "no store found at '{}'; run 'usesgraph init' first",
                    db_path.display()
                ),
                operation: "open".to_string(),
            });
        }

        let conn = Connection::open(db_path).map_err(|e| store_error("open", "open store", e))?;

        Self::apply_pragmas(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self, operation: &str) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| store_error(operation, "lock connection", e))
    }

    /// Applies performance-oriented SQLite pragmas.
    fn apply_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 120000;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;",
        )
        .map_err(|e| store_error("apply_pragmas", "apply pragmas", e))
    }

    fn count(conn: &Connection, sql: &str, operation: &str) -> Result<u64> {
        let n: i64 = conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(|e| store_error(operation, "count rows", e))?;
        Ok(n as u64)
    }
}

impl ArtifactStore for SqliteStore {
    fn put_object(&self, key: &str, contents: &str, metadata: &ObjectMetadata) -> Result<()> {
        self.conn("put_object")?
            .execute(
                "INSERT OR REPLACE INTO objects
                    (key, kind, contents, url, visibility, provenance, content_hash, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    key,
                    metadata.kind.as_str(),
                    contents,
                    metadata.url,
                    metadata.visibility.as_str(),
                    metadata.provenance,
                    metadata.content_hash,
                    current_timestamp(),
                ],
            )
            .map_err(|e| store_error("put_object", "insert object", e))?;
        Ok(())
    }

    fn put_ref_pointer(&self, path: &str, target: &str) -> Result<()> {
        self.conn("put_ref_pointer")?
            .execute(
                "INSERT OR REPLACE INTO ref_pointers (path, target) VALUES (?1, ?2)",
                params![path, target],
            )
            .map_err(|e| store_error("put_ref_pointer", "insert ref pointer", e))?;
        Ok(())
    }

    fn set_contains(&self, set: &str, member: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn("set_contains")?
            .query_row(
                "SELECT 1 FROM set_members WHERE set_name = ?1 AND member = ?2",
                params![set, member],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| store_error("set_contains", "query set membership", e))?;
        Ok(found.is_some())
    }

    fn set_add(&self, set: &str, member: &str) -> Result<()> {
        self.conn("set_add")?
            .execute(
                "INSERT OR IGNORE INTO set_members (set_name, member, added_at)
                 VALUES (?1, ?2, ?3)",
                params![set, member, current_timestamp()],
            )
            .map_err(|e| store_error("set_add", "insert set member", e))?;
        Ok(())
    }

    fn get_object(&self, key: &str) -> Result<Option<StoredObject>> {
        self.conn("get_object")?
            .query_row(
                "SELECT key, kind, contents, url, visibility, provenance, content_hash, stored_at
                 FROM objects WHERE key = ?1",
                params![key],
                row_to_object,
            )
            .optional()
            .map_err(|e| store_error("get_object", "get object", e))
    }

    fn get_ref_pointer(&self, path: &str) -> Result<Option<RefPointer>> {
        self.conn("get_ref_pointer")?
            .query_row(
                "SELECT path, target FROM ref_pointers WHERE path = ?1",
                params![path],
                |row| {
                    Ok(RefPointer {
                        path: row.get("path")?,
                        target: row.get("target")?,
                    })
                },
            )
            .optional()
            .map_err(|e| store_error("get_ref_pointer", "get ref pointer", e))
    }

    fn set_members(&self, set: &str) -> Result<Vec<String>> {
        let conn = self.conn("set_members")?;
        let mut stmt = conn
            .prepare("SELECT member FROM set_members WHERE set_name = ?1 ORDER BY member")
            .map_err(|e| store_error("set_members", "prepare query", e))?;

        let rows = stmt
            .query_map(params![set], |row| row.get::<_, String>(0))
            .map_err(|e| store_error("set_members", "query set members", e))?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row.map_err(|e| store_error("set_members", "read set member", e))?);
        }
        Ok(members)
    }

    fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn("stats")?;
        Ok(StoreStats {
            object_count: Self::count(&conn, "SELECT COUNT(*) FROM objects", "stats")?,
            workflow_count: Self::count(
                &conn,
                "SELECT COUNT(*) FROM objects WHERE kind = 'workflow'",
                "stats",
            )?,
            action_count: Self::count(
                &conn,
                "SELECT COUNT(*) FROM objects WHERE kind = 'action'",
                "stats",
            )?,
            public_count: Self::count(
                &conn,
                "SELECT COUNT(*) FROM objects WHERE visibility = 'public'",
                "stats",
            )?,
            ref_pointer_count: Self::count(&conn, "SELECT COUNT(*) FROM ref_pointers", "stats")?,
            scanned_sources: Self::count(
                &conn,
                &format!(
                    "SELECT COUNT(*) FROM set_members WHERE set_name = '{WORKFLOW_HISTORY_SET}'"
                ),
                "stats",
            )?,
            resolved_references: Self::count(
                &conn,
                &format!(
                    "SELECT COUNT(*) FROM set_members WHERE set_name = '{ACTION_HISTORY_SET}'"
                ),
                "stats",
            )?,
        })
    }
}
