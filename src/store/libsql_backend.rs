//! libsql backend — async `CodeStore` implementation.
//!
//! Supports local file and in-memory databases. The conditional status
//! transition is expressed as an `UPDATE ... WHERE status = 'ACTIVE'` whose
//! affected-row count tells the caller whether the precondition held.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::migrations;
use crate::store::traits::{CodeRecord, CodeStore, RecordStatus};

/// libsql record store.
///
/// Holds a single connection reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        info!(path = %path.display(), "Record store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        Ok(store)
    }
}

/// Map a libsql row to a `CodeRecord`.
///
/// Column order:
/// 0:pk, 1:sk, 2:code, 3:recipient, 4:sender, 5:tenant, 6:status,
/// 7:expires_at, 8:processed_at, 9:source_key
fn row_to_record(row: &libsql::Row) -> Result<CodeRecord, libsql::Error> {
    let status_str: String = row.get(6)?;
    Ok(CodeRecord {
        partition_key: row.get(0)?,
        sort_key: row.get(1)?,
        code: row.get(2)?,
        recipient: row.get(3)?,
        sender: row.get(4)?,
        tenant: row.get(5)?,
        status: RecordStatus::parse(&status_str),
        expires_at: row.get(7)?,
        processed_at: row.get(8)?,
        source_key: row.get(9)?,
    })
}

const RECORD_COLUMNS: &str =
    "pk, sk, code, recipient, sender, tenant, status, expires_at, processed_at, source_key";

#[async_trait]
impl CodeStore for LibSqlStore {
    async fn run_migrations(&self) -> Result<(), StoreError> {
        migrations::run_migrations(&self.conn).await
    }

    async fn insert_record(&self, record: &CodeRecord) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO codes (pk, sk, code, recipient, sender, tenant, status, expires_at, processed_at, source_key)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.partition_key.as_str(),
                    record.sort_key.as_str(),
                    record.code.as_str(),
                    record.recipient.as_str(),
                    record.sender.as_str(),
                    record.tenant.as_str(),
                    record.status.as_str(),
                    record.expires_at,
                    record.processed_at.as_str(),
                    record.source_key.as_str(),
                ],
            )
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("UNIQUE") {
                    StoreError::Constraint(format!("duplicate record key: {msg}"))
                } else {
                    StoreError::Query(format!("insert failed: {msg}"))
                }
            })?;

        debug!(
            recipient = %record.recipient,
            tenant = %record.tenant,
            "Code record stored"
        );
        Ok(())
    }

    async fn active_records(&self, recipient: &str) -> Result<Vec<CodeRecord>, StoreError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM codes WHERE recipient = ?1 AND status = 'ACTIVE'"
                ),
                params![recipient],
            )
            .await
            .map_err(|e| StoreError::Query(format!("active-record query failed: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("row read failed: {e}")))?
        {
            let record = row_to_record(&row)
                .map_err(|e| StoreError::Query(format!("row mapping failed: {e}")))?;
            records.push(record);
        }
        Ok(records)
    }

    async fn mark_used(&self, partition_key: &str, sort_key: &str) -> Result<bool, StoreError> {
        let affected = self
            .conn
            .execute(
                "UPDATE codes SET status = 'USED'
                 WHERE pk = ?1 AND sk = ?2 AND status = 'ACTIVE'",
                params![partition_key, sort_key],
            )
            .await
            .map_err(|e| StoreError::Query(format!("conditional update failed: {e}")))?;

        Ok(affected == 1)
    }
}
