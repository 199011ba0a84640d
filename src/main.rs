use std::sync::Arc;

use otp_relay::claim::ClaimService;
use otp_relay::config::{AppConfig, TenantRegistry};
use otp_relay::ingest::FsObjectFetcher;
use otp_relay::metrics::LogMetricsSink;
use otp_relay::pipeline::ExtractionPipeline;
use otp_relay::routes::{RelayState, relay_routes};
use otp_relay::store::{CodeStore, LibSqlStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env();
    let tenants = TenantRegistry::from_env()?;

    eprintln!("otp-relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Bind:        {}", config.bind_addr);
    eprintln!("   Database:    {}", config.db_path);
    eprintln!("   Object root: {}", config.object_root);
    eprintln!("   Environment: {}", config.environment);

    let store: Arc<dyn CodeStore> = Arc::new(
        LibSqlStore::new_local(std::path::Path::new(&config.db_path)).await?,
    );

    let pipeline = Arc::new(ExtractionPipeline::new(
        Arc::clone(&store),
        tenants,
        Arc::new(LogMetricsSink),
        config.environment.clone(),
    ));
    let claims = Arc::new(ClaimService::new(Arc::clone(&store)));
    let fetcher = Arc::new(FsObjectFetcher::new(&config.object_root));

    let app = relay_routes(RelayState {
        pipeline,
        fetcher,
        claims,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "otp-relay listening");
    axum::serve(listener, app).await?;

    Ok(())
}
