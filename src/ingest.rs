//! Ingestion trigger — object-storage event payloads and body fetching.
//!
//! The transport that deposits raw messages into object storage notifies
//! the relay with a batch of event records, each naming a bucket and an
//! object key. The relay fetches each body itself through the
//! `ObjectFetcher` seam and hands it to the extraction pipeline.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::PipelineError;

/// Event source value this relay handles; records from any other source
/// are skipped silently.
pub const OBJECT_STORE_EVENT_SOURCE: &str = "object-store";

// ── Event payload ───────────────────────────────────────────────────

/// Notification payload: a sequence of object-created records.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<ObjectEventRecord>,
}

/// One object-created record.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectEventRecord {
    #[serde(rename = "eventSource")]
    pub event_source: String,
    pub bucket: String,
    /// Object key, transport-encoded (`+` for space, percent escapes).
    pub key: String,
}

impl ObjectEvent {
    /// Records this relay should process, with decoded keys.
    pub fn relevant_records(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.records
            .iter()
            .filter(|r| r.event_source == OBJECT_STORE_EVENT_SOURCE)
            .map(|r| (r.bucket.clone(), decode_object_key(&r.key)))
    }
}

/// Undo the transport encoding on an object key: `+` becomes a space and
/// `%XX` escapes are decoded. Malformed escapes pass through verbatim.
pub fn decode_object_key(key: &str) -> String {
    let spaced = key.replace('+', " ");
    let bytes = spaced.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let (Some(hi), Some(lo)) = (hex_val(bytes.get(i + 1)), hex_val(bytes.get(i + 2)))
        {
            out.push(hi << 4 | lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: Option<&u8>) -> Option<u8> {
    match b? {
        b @ b'0'..=b'9' => Some(b - b'0'),
        b @ b'a'..=b'f' => Some(b - b'a' + 10),
        b @ b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

// ── Object fetcher seam ─────────────────────────────────────────────

/// Fetches raw message bodies from object storage — pure I/O, no parsing.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    /// Fetch the body of one object.
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, PipelineError>;
}

/// Filesystem-backed fetcher: buckets are directories under a root.
///
/// Stands in for a real object store in local deployments and tests.
pub struct FsObjectFetcher {
    root: PathBuf,
}

impl FsObjectFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectFetcher for FsObjectFetcher {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, PipelineError> {
        let path = self.root.join(bucket).join(key);
        debug!(path = %path.display(), "Fetching object");
        tokio::fs::read(&path).await.map_err(|e| PipelineError::Fetch {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}
