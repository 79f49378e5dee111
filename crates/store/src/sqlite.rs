//! SQLite storage for target records

use chrono::{DateTime, Utc};
use onbehalf_core::{TargetRef, TargetType};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::record::VersionedRecord;
use crate::repository::{ensure_object, TargetRepository};

/// SQLite-backed [`TargetRepository`].
///
/// The version check lives in the `UPDATE ... WHERE version = ?` clause, so
/// it holds even with several processes sharing the database file.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open (or create) a store at the given database path
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS target_records (
                target_type TEXT NOT NULL,
                target_id TEXT NOT NULL,
                version INTEGER NOT NULL,
                data_json TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (target_type, target_id)
            )",
            [],
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored records of a type
    pub fn count(&self, target_type: TargetType) -> StoreResult<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM target_records WHERE target_type = ?1",
            params![target_type.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

type Row = (String, String, i64, String, String);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn into_record(row: Row) -> StoreResult<VersionedRecord> {
    let (target_type, target_id, version, data_json, updated_at) = row;
    let corrupt = |detail: String| StoreError::Corrupt {
        target: format!("{}:{}", target_type, target_id),
        detail,
    };

    let parsed_type =
        TargetType::from_str(&target_type).map_err(|e| corrupt(format!("target type: {e}")))?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| corrupt(format!("updated_at: {e}")))?
        .with_timezone(&Utc);

    Ok(VersionedRecord {
        target: TargetRef::new(parsed_type, target_id),
        version: version as u64,
        data: serde_json::from_str(&data_json)?,
        updated_at,
    })
}

impl TargetRepository for SqliteRepository {
    fn get(&self, target: &TargetRef) -> StoreResult<Option<VersionedRecord>> {
        let row = self
            .conn()
            .query_row(
                "SELECT target_type, target_id, version, data_json, updated_at
                 FROM target_records WHERE target_type = ?1 AND target_id = ?2",
                params![target.target_type.to_string(), target.target_id],
                read_row,
            )
            .optional()?;

        row.map(into_record).transpose()
    }

    fn put_if_version(
        &self,
        target: &TargetRef,
        expected: Option<u64>,
        data: Value,
    ) -> StoreResult<VersionedRecord> {
        ensure_object(target, &data)?;

        let data_json = serde_json::to_string(&data)?;
        let updated_at = Utc::now();
        let type_key = target.target_type.to_string();
        let conn = self.conn();

        let (rows, version) = match expected {
            None => {
                let rows = conn.execute(
                    "INSERT OR IGNORE INTO target_records
                     (target_type, target_id, version, data_json, updated_at)
                     VALUES (?1, ?2, 1, ?3, ?4)",
                    params![type_key, target.target_id, data_json, updated_at.to_rfc3339()],
                )?;
                (rows, 1)
            }
            Some(current) => {
                let rows = conn.execute(
                    "UPDATE target_records
                     SET version = ?1, data_json = ?2, updated_at = ?3
                     WHERE target_type = ?4 AND target_id = ?5 AND version = ?6",
                    params![
                        (current + 1) as i64,
                        data_json,
                        updated_at.to_rfc3339(),
                        type_key,
                        target.target_id,
                        current as i64,
                    ],
                )?;
                (rows, current + 1)
            }
        };

        if rows == 0 {
            let actual: Option<i64> = conn
                .query_row(
                    "SELECT version FROM target_records WHERE target_type = ?1 AND target_id = ?2",
                    params![type_key, target.target_id],
                    |row| row.get(0),
                )
                .optional()?;
            return Err(StoreError::VersionConflict {
                target: target.clone(),
                expected,
                actual: actual.map(|v| v as u64),
            });
        }

        debug!(target = %target, version, "record written");

        Ok(VersionedRecord {
            target: target.clone(),
            version,
            data,
            updated_at,
        })
    }

    fn list(&self, target_type: TargetType) -> StoreResult<Vec<VersionedRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT target_type, target_id, version, data_json, updated_at
             FROM target_records WHERE target_type = ?1 ORDER BY target_id",
        )?;

        let rows = stmt
            .query_map(params![target_type.to_string()], read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(into_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_insert_and_get() {
        let repo = SqliteRepository::in_memory().unwrap();
        let target = TargetRef::proposal("P-1");

        assert!(repo.get(&target).unwrap().is_none());

        repo.put_if_version(&target, None, json!({"paymentStatus": "UNPAID"}))
            .unwrap();
        let record = repo.require(&target).unwrap();

        assert_eq!(record.version, 1);
        assert_eq!(record.target, target);
        assert_eq!(record.str_field("paymentStatus"), Some("UNPAID"));
    }

    #[test]
    fn test_version_check_in_update() {
        let repo = SqliteRepository::in_memory().unwrap();
        let target = TargetRef::policy("6500001");
        repo.put_if_version(&target, None, json!({"status": "ACTIVE"})).unwrap();

        let updated = repo
            .put_if_version(&target, Some(1), json!({"status": "SURRENDERED"}))
            .unwrap();
        assert_eq!(updated.version, 2);

        let stale = repo.put_if_version(&target, Some(1), json!({"status": "ACTIVE"}));
        assert!(matches!(
            stale,
            Err(StoreError::VersionConflict {
                expected: Some(1),
                actual: Some(2),
                ..
            })
        ));

        let duplicate = repo.put_if_version(&target, None, json!({}));
        assert!(matches!(
            duplicate,
            Err(StoreError::VersionConflict { expected: None, .. })
        ));

        let missing = repo.put_if_version(&TargetRef::policy("6599999"), Some(1), json!({}));
        assert!(matches!(
            missing,
            Err(StoreError::VersionConflict { actual: None, .. })
        ));

        assert_eq!(repo.require(&target).unwrap().str_field("status"), Some("SURRENDERED"));
    }

    #[test]
    fn test_list_and_count() {
        let repo = SqliteRepository::in_memory().unwrap();
        repo.put_if_version(&TargetRef::claim("C-2"), None, json!({})).unwrap();
        repo.put_if_version(&TargetRef::claim("C-1"), None, json!({})).unwrap();
        repo.put_if_version(&TargetRef::claim_process("CP-1"), None, json!({})).unwrap();

        let claims = repo.list(TargetType::Claim).unwrap();
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].target.target_id, "C-1");
        assert_eq!(repo.count(TargetType::ClaimProcess).unwrap(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        let target = TargetRef::proposal("P-9");

        {
            let repo = SqliteRepository::new(&path).unwrap();
            repo.put_if_version(&target, None, json!({"authStatus": "PENDING"}))
                .unwrap();
        }

        let repo = SqliteRepository::new(&path).unwrap();
        let record = repo.require(&target).unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.str_field("authStatus"), Some("PENDING"));
    }
}
