//! Integration tests for the ingest → claim flow.
//!
//! Each test spins up an Axum server on a random port with an in-memory
//! store and a tempdir-backed object fetcher, then exercises the real HTTP
//! contract with reqwest.

use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

use otp_relay::claim::ClaimService;
use otp_relay::config::TenantRegistry;
use otp_relay::ingest::FsObjectFetcher;
use otp_relay::metrics::LogMetricsSink;
use otp_relay::pipeline::ExtractionPipeline;
use otp_relay::routes::{RelayState, relay_routes};
use otp_relay::store::{CodeStore, LibSqlStore};

/// A running relay test server.
struct TestRelay {
    base_url: String,
    mail_dir: std::path::PathBuf,
    _objects: TempDir,
    client: reqwest::Client,
}

impl TestRelay {
    /// Start a relay on a random port with the given tenant policy.
    async fn start(tenants: TenantRegistry) -> Self {
        let objects = TempDir::new().unwrap();
        let mail_dir = objects.path().join("mail");
        std::fs::create_dir_all(&mail_dir).unwrap();

        let store: Arc<dyn CodeStore> = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let pipeline = Arc::new(ExtractionPipeline::new(
            Arc::clone(&store),
            tenants,
            Arc::new(LogMetricsSink),
            "test",
        ));
        let claims = Arc::new(ClaimService::new(Arc::clone(&store)));
        let fetcher = Arc::new(FsObjectFetcher::new(objects.path()));

        let app = relay_routes(RelayState {
            pipeline,
            fetcher,
            claims,
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://127.0.0.1:{port}"),
            mail_dir,
            _objects: objects,
            client: reqwest::Client::new(),
        }
    }

    /// Drop a raw message into the "mail" bucket.
    fn write_object(&self, key: &str, body: &str) {
        std::fs::write(self.mail_dir.join(key), body).unwrap();
    }

    /// POST /ingest with a single-record event for `key`.
    async fn ingest(&self, key: &str) -> Value {
        let event = json!({
            "Records": [{"eventSource": "object-store", "bucket": "mail", "key": key}]
        });
        self.client
            .post(format!("{}/ingest", self.base_url))
            .json(&event)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    /// POST /claim for a recipient; returns (status, body).
    async fn claim(&self, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}/claim", self.base_url))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

#[tokio::test]
async fn round_trip_ingest_then_claim_exactly_once() {
    let relay = TestRelay::start(TenantRegistry::default()).await;
    relay.write_object(
        "msg-1.eml",
        "From: otp@bank.com\nTo: alice@auth.example.io\n\nYour OTP: 482913\n",
    );

    let batch = relay.ingest("msg-1.eml").await;
    assert_eq!(batch["processed"], 1);
    assert_eq!(batch["results"][0]["status"], "success");
    assert_eq!(batch["results"][0]["code"], "482913");

    // First claim delivers the code with an ISO-8601 expiry
    let (status, body) = relay.claim(json!({"recipient": "alice@auth.example.io"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["code"], "482913");
    assert_eq!(body["recipient"], "alice@auth.example.io");
    assert!(body["expiresAt"].as_str().unwrap().ends_with('Z'));

    // Second claim: the record is consumed
    let (status, body) = relay.claim(json!({"recipient": "alice@auth.example.io"})).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "No active code found for this recipient");
}

#[tokio::test]
async fn claim_without_recipient_is_a_400() {
    let relay = TestRelay::start(TenantRegistry::default()).await;

    let (status, body) = relay.claim(json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Missing required parameter: recipient");

    let (status, _) = relay.claim(json!({"recipient": ""})).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn claim_for_unknown_recipient_is_a_404() {
    let relay = TestRelay::start(TenantRegistry::default()).await;
    let (status, body) = relay.claim(json!({"recipient": "nobody@x.io"})).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "No active code found for this recipient");
}

#[tokio::test]
async fn newest_code_is_served_first() {
    let relay = TestRelay::start(TenantRegistry::default()).await;
    relay.write_object(
        "older.eml",
        "From: otp@bank.com\nTo: bob@x.io\n\ncode: 111111\n",
    );
    relay.write_object(
        "newer.eml",
        "From: otp@bank.com\nTo: bob@x.io\n\ncode: 222222\n",
    );

    relay.ingest("older.eml").await;
    relay.ingest("newer.eml").await;

    let (_, first) = relay.claim(json!({"recipient": "bob@x.io"})).await;
    assert_eq!(first["code"], "222222");

    let (_, second) = relay.claim(json!({"recipient": "bob@x.io"})).await;
    assert_eq!(second["code"], "111111");
}

#[tokio::test]
async fn concurrent_claims_deliver_each_code_at_most_once() {
    let relay = Arc::new(TestRelay::start(TenantRegistry::default()).await);
    relay.write_object(
        "one.eml",
        "From: otp@bank.com\nTo: carol@x.io\n\nOTP: 123456\n",
    );
    relay.ingest("one.eml").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let relay = Arc::clone(&relay);
        handles.push(tokio::spawn(async move {
            relay.claim(json!({"recipient": "carol@x.io"})).await
        }));
    }

    let mut delivered = Vec::new();
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        if status == 200 {
            delivered.push(body["code"].as_str().unwrap().to_string());
        } else {
            assert_eq!(status, 404);
        }
    }
    assert_eq!(delivered, vec!["123456".to_string()]);
}

#[tokio::test]
async fn sender_rejection_and_missing_objects_are_isolated_outcomes() {
    let tenants = TenantRegistry::from_json(
        r#"{"alice": {"sender_allowlist": ["*@bank.com"]}}"#,
    )
    .unwrap();
    let relay = TestRelay::start(tenants).await;

    relay.write_object(
        "rejected.eml",
        "From: eve@evil.com\nTo: alice@auth.example.io\n\nOTP: 999999\n",
    );

    let event = json!({
        "Records": [
            {"eventSource": "object-store", "bucket": "mail", "key": "rejected.eml"},
            {"eventSource": "object-store", "bucket": "mail", "key": "missing.eml"}
        ]
    });
    let batch: Value = relay
        .client
        .post(format!("{}/ingest", relay.base_url))
        .json(&event)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(batch["processed"], 2);
    assert_eq!(batch["results"][0]["status"], "sender_not_allowed");
    assert_eq!(batch["results"][0]["sender"], "eve@evil.com");
    assert_eq!(batch["results"][1]["status"], "error");
    assert_eq!(batch["results"][1]["key"], "missing.eml");

    // Nothing claimable was written
    let (status, _) = relay.claim(json!({"recipient": "alice@auth.example.io"})).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn tenant_specific_cascade_applies_per_recipient_local_part() {
    let tenants = TenantRegistry::from_json(
        r#"{"dave": {"regex_patterns": ["(?i)launch key[:\\s]+(\\d{4})"]}}"#,
    )
    .unwrap();
    let relay = TestRelay::start(tenants).await;

    relay.write_object(
        "dave.eml",
        "From: ops@x.io\nTo: dave@svc.example\n\nLaunch key: 7781\n",
    );
    let batch = relay.ingest("dave.eml").await;
    assert_eq!(batch["results"][0]["status"], "success");
    assert_eq!(batch["results"][0]["code"], "7781");

    // Other tenants still use the default cascade
    relay.write_object(
        "erin.eml",
        "From: ops@x.io\nTo: erin@svc.example\n\nLaunch key: 7781\n",
    );
    let batch = relay.ingest("erin.eml").await;
    // "key: 7781" has no default-cascade cue word and is not 6 digits
    assert_eq!(batch["results"][0]["status"], "no_code_found");
}
