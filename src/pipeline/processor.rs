//! Extraction pipeline — orchestrates one message from raw bytes to record.
//!
//! Flow per message: normalize → identity → allowlist gate → pattern
//! cascade → record write. Messages are processed independently with no
//! shared mutable state between them; a single message's failure is
//! recorded as its own `error` outcome and never aborts the batch.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::TenantRegistry;
use crate::error::PipelineError;
use crate::extract::{PatternCascade, extract_identity, normalize, sender_allowed};
use crate::ingest::{ObjectEvent, ObjectFetcher};
use crate::metrics::MetricsSink;
use crate::pipeline::types::{BatchResult, InboundMessage, MessageOutcome};
use crate::store::{CodeRecord, CodeStore};

/// Extraction pipeline.
///
/// Tenant cascades are compiled once at construction and cached; the
/// registry itself is immutable for the process lifetime.
pub struct ExtractionPipeline {
    store: Arc<dyn CodeStore>,
    tenants: TenantRegistry,
    metrics: Arc<dyn MetricsSink>,
    environment: String,
    default_cascade: PatternCascade,
    tenant_cascades: HashMap<String, PatternCascade>,
}

impl ExtractionPipeline {
    /// Build a pipeline, pre-compiling every configured tenant cascade.
    pub fn new(
        store: Arc<dyn CodeStore>,
        tenants: TenantRegistry,
        metrics: Arc<dyn MetricsSink>,
        environment: impl Into<String>,
    ) -> Self {
        let tenant_cascades: HashMap<String, PatternCascade> = tenants
            .configured_tenants()
            .filter(|(_, config)| !config.regex_patterns.is_empty())
            .map(|(tenant, config)| {
                (tenant.to_string(), PatternCascade::from_raw(&config.regex_patterns))
            })
            .collect();

        Self {
            store,
            tenants,
            metrics,
            environment: environment.into(),
            default_cascade: PatternCascade::default_cascade(),
            tenant_cascades,
        }
    }

    /// Cascade for a tenant: its own compiled patterns, or the default.
    ///
    /// A tenant whose configured patterns all failed to compile falls back
    /// to the default cascade rather than matching nothing.
    fn cascade_for(&self, tenant: &str) -> &PatternCascade {
        self.tenant_cascades
            .get(tenant)
            .filter(|cascade| !cascade.is_empty())
            .unwrap_or(&self.default_cascade)
    }

    /// Process an object-storage event: fetch each named object and run it
    /// through the pipeline.
    ///
    /// Fetch failures are per-message `error` outcomes like any other;
    /// non-matching event sources were already filtered out.
    pub async fn process_event(
        &self,
        event: &ObjectEvent,
        fetcher: &dyn ObjectFetcher,
    ) -> BatchResult {
        let batch_id = Uuid::new_v4();
        let mut results = Vec::new();

        for (bucket, key) in event.relevant_records() {
            debug!(batch = %batch_id, bucket = %bucket, key = %key, "Fetching event object");
            let outcome = match fetcher.fetch(&bucket, &key).await {
                Ok(raw_body) => {
                    let message = InboundMessage {
                        source_key: key.clone(),
                        raw_body,
                    };
                    match self.process(message).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            warn!(batch = %batch_id, key = %key, error = %e, "Message processing failed");
                            MessageOutcome::Error {
                                key,
                                error: e.to_string(),
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(batch = %batch_id, key = %key, error = %e, "Object fetch failed");
                    MessageOutcome::Error {
                        key,
                        error: e.to_string(),
                    }
                }
            };
            results.push(outcome);
        }

        info!(batch = %batch_id, processed = results.len(), "Event batch complete");
        BatchResult::new(results)
    }

    /// Process a batch of messages, each independently.
    ///
    /// Never fails as a whole: every message produces exactly one outcome.
    pub async fn process_batch(&self, messages: Vec<InboundMessage>) -> BatchResult {
        let count = messages.len();
        info!(count, "Processing message batch");

        let mut results = Vec::with_capacity(count);
        for message in messages {
            let key = message.source_key.clone();
            let outcome = match self.process(message).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(key = %key, error = %e, "Message processing failed");
                    MessageOutcome::Error {
                        key,
                        error: e.to_string(),
                    }
                }
            };
            results.push(outcome);
        }

        info!(processed = results.len(), "Batch processing complete");
        BatchResult::new(results)
    }

    /// Process a single inbound message.
    ///
    /// Only storage failures surface as `Err`; everything else is a normal
    /// outcome. `process_batch` converts the `Err` into an `error` outcome.
    pub async fn process(&self, message: InboundMessage) -> Result<MessageOutcome, PipelineError> {
        let body = normalize(&message.raw_body);
        let identity = extract_identity(&body);

        debug!(
            key = %message.source_key,
            recipient = %identity.recipient,
            sender = %identity.sender,
            tenant = %identity.tenant,
            "Processing inbound message"
        );

        let tenant_config = self.tenants.resolve(&identity.tenant);
        if !sender_allowed(&tenant_config.sender_allowlist, &identity.sender) {
            warn!(
                sender = %identity.sender,
                tenant = %identity.tenant,
                "Sender not in allowlist, skipping"
            );
            return Ok(MessageOutcome::SenderNotAllowed {
                message: format!("Sender {} not in whitelist", identity.sender),
                recipient: identity.recipient,
                sender: identity.sender,
            });
        }

        let Some(code) = self.cascade_for(&identity.tenant).extract(&body) else {
            warn!(key = %message.source_key, "No code found");
            return Ok(MessageOutcome::NoCodeFound {
                key: message.source_key,
            });
        };

        let record = CodeRecord::new(
            &message.source_key,
            &code,
            &identity.recipient,
            &identity.sender,
            &identity.tenant,
        );
        self.store.insert_record(&record).await?;

        info!(
            recipient = %identity.recipient,
            sender = %identity.sender,
            tenant = %identity.tenant,
            "Code stored"
        );

        // Fire-and-forget: a failing sink never changes the outcome.
        self.metrics
            .codes_processed(&self.environment, &identity.tenant)
            .await;

        Ok(MessageOutcome::Success {
            recipient: identity.recipient,
            sender: identity.sender,
            code,
        })
    }
}
