//! Shield Gateway API Server
//!
//! Usage:
//!   cargo run --bin shield_api
//!
//! Environment:
//!   BAGS_SHIELD_API_BASE - Scan backend base URL (unset: on-chain fallback)
//!   SOLANA_RPC_URL       - RPC endpoint for the fallback
//!   PORT / SHIELD_PORT   - Server port (default: 8080)
//!   SHIELD_HOST          - Server host (default: 0.0.0.0)
//!   RUST_LOG             - Log filter (default: info)

use shield_gateway::api::{create_router, AppState};
use shield_gateway::GatewayConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = GatewayConfig::from_env();
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    if config.backend_base.is_none() {
        warn!("⚠️ No backend configured, scans will use the on-chain fallback");
    }

    let state = Arc::new(AppState::new(config));
    let app = create_router(state);

    info!("🛡️ Shield Gateway starting on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /api/scan              - Scan a mint (backend or on-chain fallback)");
    info!("  GET  /api/scan?mint=        - Forward a scan lookup");
    info!("  *    /api/apply             - Forward the apply form");
    info!("  GET  /api/health            - Health check");
    info!("  GET  /api/launchpad/ping    - Launchpad ping (feature flagged)");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("👋 Shield Gateway shutdown complete");

    Ok(())
}
