//! `CodeStore` trait — the async persistence interface for code records.
//!
//! Coordination between the extraction pipeline and the claim service
//! happens entirely through this store: the pipeline is the sole writer of
//! new records, the claim service is the sole mutator of `status`.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::StoreError;

/// Seconds a code stays nominally valid after ingestion.
pub const CODE_TTL_SECS: i64 = 900;

/// Partition key prefix grouping all records from one message.
const PARTITION_PREFIX: &str = "email#";

/// Lifecycle state of a code record. `Used` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Written at extraction time; claimable.
    Active,
    /// Consumed by a successful claim.
    Used,
}

impl RecordStatus {
    /// Store string form (`ACTIVE`/`USED`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Used => "USED",
        }
    }

    /// Parse the store string form, defaulting unknown values to `Active`.
    pub fn parse(s: &str) -> Self {
        match s {
            "USED" => Self::Used,
            _ => Self::Active,
        }
    }
}

/// One extracted code, as persisted.
#[derive(Debug, Clone)]
pub struct CodeRecord {
    /// `email#<source_key>` — groups records from one message.
    pub partition_key: String,
    /// Ingestion timestamp, fixed-width ISO-8601. Lexicographic order on
    /// this column is the recency order the claim service relies on.
    pub sort_key: String,
    /// Extracted digit string, 4–8 characters.
    pub code: String,
    pub recipient: String,
    pub sender: String,
    pub tenant: String,
    pub status: RecordStatus,
    /// Epoch-seconds deadline (ingestion time + TTL). Advisory: the claim
    /// path does not enforce it.
    pub expires_at: i64,
    /// Ingestion timestamp, string form.
    pub processed_at: String,
    /// Raw object key the message was ingested from.
    pub source_key: String,
}

impl CodeRecord {
    /// Build a fresh `ACTIVE` record at ingestion time.
    pub fn new(source_key: &str, code: &str, recipient: &str, sender: &str, tenant: &str) -> Self {
        let now = Utc::now();
        let timestamp = ingestion_timestamp(now);
        Self {
            partition_key: format!("{PARTITION_PREFIX}{source_key}"),
            sort_key: timestamp.clone(),
            code: code.to_string(),
            recipient: recipient.to_string(),
            sender: sender.to_string(),
            tenant: tenant.to_string(),
            status: RecordStatus::Active,
            expires_at: now.timestamp() + CODE_TTL_SECS,
            processed_at: timestamp,
            source_key: source_key.to_string(),
        }
    }

    /// Expiry deadline rendered as ISO-8601, for caller-facing responses.
    pub fn expires_at_iso(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.expires_at, 0)
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Fixed-width ingestion timestamp so lexicographic order equals
/// chronological order.
pub fn ingestion_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Backend-agnostic record store.
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), StoreError>;

    /// Insert a new record. `(partition_key, sort_key)` is unique per
    /// ingestion event; a collision is a constraint error.
    async fn insert_record(&self, record: &CodeRecord) -> Result<(), StoreError>;

    /// All `ACTIVE` records for a recipient, in no guaranteed order.
    async fn active_records(&self, recipient: &str) -> Result<Vec<CodeRecord>, StoreError>;

    /// Conditionally transition a record `ACTIVE → USED`.
    ///
    /// Returns `false` when the precondition failed (the record was no
    /// longer `ACTIVE` at commit time) — the caller must fall back to the
    /// next candidate. This is the only status transition that exists.
    async fn mark_used(&self, partition_key: &str, sort_key: &str) -> Result<bool, StoreError>;
}
