use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use greenleaf_core::{DiseaseRelay, HistoryConfig, HistoryService, RelayConfig, ServerConfig};

/// Main entry point for the Greenleaf service
///
/// Resolves configuration once, then serves the REST API until interrupted.
///
/// # Environment Variables
/// - `LOVABLE_API_KEY`: AI gateway credential (required)
/// - `GREENLEAF_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `GREENLEAF_GATEWAY_URL`: chat-completion endpoint of the AI gateway
/// - `GREENLEAF_MODEL`: multimodal model identifier
/// - `GREENLEAF_UPSTREAM_TIMEOUT_SECS`: bound on one upstream call (default: 60)
/// - `GREENLEAF_DATA_DIR`: scan history directory (default: "scan_data")
/// - `GREENLEAF_MAX_BODY_BYTES`: largest accepted request body (default: 32 MiB)
///
/// # Errors
/// Returns an error if:
/// - the AI gateway credential is missing or any setting is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("greenleaf=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let relay_cfg = RelayConfig::from_env_values(
        std::env::var("LOVABLE_API_KEY").ok(),
        std::env::var("GREENLEAF_GATEWAY_URL").ok(),
        std::env::var("GREENLEAF_MODEL").ok(),
        std::env::var("GREENLEAF_UPSTREAM_TIMEOUT_SECS").ok(),
    )
    .inspect_err(|e| tracing::error!("LOVABLE_API_KEY / relay configuration: {}", e))?;
    let history_cfg = HistoryConfig::from_env_value(std::env::var("GREENLEAF_DATA_DIR").ok());
    let server_cfg =
        ServerConfig::from_env_value(std::env::var("GREENLEAF_MAX_BODY_BYTES").ok())?;

    tracing::info!("relay configured: {:?}", relay_cfg);
    tracing::info!("scan history in {}", history_cfg.data_dir().display());
    tracing::info!("request bodies limited to {} bytes", server_cfg.max_body_bytes());

    let state = AppState {
        relay: DiseaseRelay::new(Arc::new(relay_cfg))?,
        history: HistoryService::new(&history_cfg),
    };

    let addr = std::env::var("GREENLEAF_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    tracing::info!("++ Starting Greenleaf REST on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state, server_cfg.max_body_bytes()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- Greenleaf REST stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
