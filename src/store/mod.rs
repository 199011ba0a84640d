//! Persistence layer — the append-only code record store.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use traits::{CODE_TTL_SECS, CodeRecord, CodeStore, RecordStatus};
