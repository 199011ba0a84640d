//! Claim service — deliver a code exactly once per record.
//!
//! A claim scans the recipient's ACTIVE records, picks the most recently
//! ingested one, and conditionally transitions it to USED. The scan and the
//! transition are not one atomic operation: two concurrent claims may select
//! the same record, and only the conditional update decides the winner. The
//! loser falls back to the next-newest candidate instead of double-delivering.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::store::{CodeRecord, CodeStore};

/// A successfully claimed code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedCode {
    pub code: String,
    pub recipient: String,
    /// Expiry deadline, ISO-8601.
    pub expires_at: String,
}

/// Outcome of a claim request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The code, delivered at most once; the record is now USED.
    Claimed(ClaimedCode),
    /// No ACTIVE record for this recipient (or every candidate was lost
    /// to a concurrent claim).
    NotFound,
}

/// Claim service over a shared record store.
pub struct ClaimService {
    store: Arc<dyn CodeStore>,
    /// Opt-in: skip candidates whose `expires_at` has passed. Off by
    /// default — an expired-but-ACTIVE record is still claimable, matching
    /// the historical behavior of this system.
    reject_expired: bool,
}

impl ClaimService {
    pub fn new(store: Arc<dyn CodeStore>) -> Self {
        Self {
            store,
            reject_expired: false,
        }
    }

    /// Enable expiry checking on the claim path.
    pub fn with_expiry_check(mut self) -> Self {
        self.reject_expired = true;
        self
    }

    /// Claim the newest active code for a recipient.
    ///
    /// Candidates are tried newest-first; losing the conditional update to
    /// a concurrent claim moves on to the next candidate. Exhausting the
    /// list is `NotFound`.
    pub async fn claim(&self, recipient: &str) -> Result<ClaimOutcome, StoreError> {
        let mut candidates = self.store.active_records(recipient).await?;
        debug!(
            recipient = %recipient,
            count = candidates.len(),
            "Active codes found"
        );

        // Greatest sort key first: the fixed-width timestamp makes
        // lexicographic order the recency order.
        candidates.sort_by(|a, b| b.sort_key.cmp(&a.sort_key));

        let now = Utc::now().timestamp();
        for candidate in candidates {
            if self.reject_expired && candidate.expires_at < now {
                debug!(recipient = %recipient, sk = %candidate.sort_key, "Skipping expired candidate");
                continue;
            }

            if self
                .store
                .mark_used(&candidate.partition_key, &candidate.sort_key)
                .await?
            {
                info!(recipient = %recipient, "Code claimed and marked as used");
                return Ok(ClaimOutcome::Claimed(claimed(candidate)));
            }

            // Lost the race on this record; fall back to the next newest.
            warn!(
                recipient = %recipient,
                sk = %candidate.sort_key,
                "Concurrent claim consumed candidate, retrying next"
            );
        }

        Ok(ClaimOutcome::NotFound)
    }
}

fn claimed(record: CodeRecord) -> ClaimedCode {
    ClaimedCode {
        expires_at: record.expires_at_iso(),
        code: record.code,
        recipient: record.recipient,
    }
}
