//! Extraction pipeline — one invocation per ingested message.
//!
//! Each message flows through normalize → identity → allowlist gate →
//! pattern cascade → record write, producing exactly one outcome. The
//! batch as a whole never fails because one message did.

pub mod processor;
pub mod types;

pub use processor::ExtractionPipeline;
pub use types::{BatchResult, InboundMessage, MessageOutcome};
