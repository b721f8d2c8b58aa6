//! Prospector server: HTTP surface for the company-research engine.

mod routes;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(filter);
    tracing_subscriber::registry().with(fmt_layer).init();

    let config = prospector_core::load_config(None)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    tracing::info!(model = %config.llm.model, search = %config.search.base_url, "Prospector starting");

    let state = routes::build_state(config)?;
    let llm_ok = state.llm.health_check().await;
    tracing::info!(llm_connected = llm_ok, "Generation backend probed");

    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}
