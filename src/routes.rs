//! HTTP surface — ingestion trigger and claim endpoint.
//!
//! `POST /ingest` receives object-storage event notifications and always
//! answers 200 with per-message outcomes. `POST /claim` delivers a code at
//! most once. Error bodies never leak internal detail; the full error is
//! logged for operators.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::claim::{ClaimOutcome, ClaimService};
use crate::ingest::{ObjectEvent, ObjectFetcher};
use crate::pipeline::ExtractionPipeline;

/// Shared state for the relay routes.
#[derive(Clone)]
pub struct RelayState {
    pub pipeline: Arc<ExtractionPipeline>,
    pub fetcher: Arc<dyn ObjectFetcher>,
    pub claims: Arc<ClaimService>,
}

/// Claim request body. `recipient` is validated by hand so a missing field
/// yields the documented 400 body rather than a deserialization rejection.
#[derive(Debug, Deserialize)]
struct ClaimRequest {
    #[serde(default)]
    recipient: Option<String>,
}

/// POST /ingest
///
/// Processes an object-storage event batch. Per-message failures are part
/// of the 200 response, never an error status.
async fn ingest(State(state): State<RelayState>, Json(event): Json<ObjectEvent>) -> impl IntoResponse {
    let batch = state.pipeline.process_event(&event, state.fetcher.as_ref()).await;
    Json(batch)
}

/// POST /claim
///
/// Atomically claims the newest active code for a recipient.
async fn claim(State(state): State<RelayState>, Json(request): Json<ClaimRequest>) -> impl IntoResponse {
    let recipient = match request.recipient.as_deref() {
        Some(r) if !r.is_empty() => r,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Missing required parameter: recipient"})),
            );
        }
    };

    match state.claims.claim(recipient).await {
        Ok(ClaimOutcome::Claimed(claimed)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "code": claimed.code,
                "recipient": claimed.recipient,
                "expiresAt": claimed.expires_at,
            })),
        ),
        Ok(ClaimOutcome::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No active code found for this recipient"})),
        ),
        Err(e) => {
            // Operators get the detail; callers get a generic body.
            error!(recipient = %recipient, error = %e, "Claim failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Internal server error"})),
            )
        }
    }
}

/// Build the relay router.
pub fn relay_routes(state: RelayState) -> Router {
    Router::new()
        .route("/ingest", post(ingest))
        .route("/claim", post(claim))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
