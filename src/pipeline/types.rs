//! Shared types for the extraction pipeline.

use serde::{Deserialize, Serialize};

// ── Inbound message ─────────────────────────────────────────────────

/// One ingested email, after the object body has been fetched.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Unique identifier of the raw artifact (object key). Immutable;
    /// becomes the partition key of any resulting record.
    pub source_key: String,
    /// Raw body bytes as fetched from object storage.
    pub raw_body: Vec<u8>,
}

// ── Per-message outcome ─────────────────────────────────────────────

/// Outcome of processing one message.
///
/// Every message in a batch gets exactly one of these; none of them fails
/// the batch. Serializes as the wire form the ingestion response carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MessageOutcome {
    /// A code was extracted and an `ACTIVE` record written.
    Success {
        recipient: String,
        sender: String,
        code: String,
    },
    /// The allowlist gate rejected the sender. Normal, not an error.
    SenderNotAllowed {
        recipient: String,
        sender: String,
        message: String,
    },
    /// The cascade found no code. Normal, not an error; no record written.
    NoCodeFound { key: String },
    /// Unexpected failure (fetch/storage). Isolated to this message.
    Error { key: String, error: String },
}

impl MessageOutcome {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::SenderNotAllowed { .. } => "sender_not_allowed",
            Self::NoCodeFound { .. } => "no_code_found",
            Self::Error { .. } => "error",
        }
    }
}

// ── Batch result ────────────────────────────────────────────────────

/// Aggregated outcomes for one ingestion batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Number of messages that produced an outcome.
    pub processed: usize,
    /// Per-message outcomes, in input order.
    pub results: Vec<MessageOutcome>,
}

impl BatchResult {
    pub fn new(results: Vec<MessageOutcome>) -> Self {
        Self {
            processed: results.len(),
            results,
        }
    }
}
