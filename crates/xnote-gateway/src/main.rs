mod config;
mod error;
mod routes;
mod upstream;

use std::sync::Arc;

use config::GatewayConfig;
use routes::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; deployments inject the environment.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("xnote_gateway=info".parse()?),
        )
        .init();

    let config = Arc::new(GatewayConfig::from_env()?);
    tracing::info!("Starting xnote-gateway with config: {:?}", config);

    let state = AppState::from_config(config)?;
    let bind_addr = state.config.bind_addr.clone();
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("xnote-gateway listening on {}", bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
