//! Storefront Core - style inventory and cart pricing service

use std::sync::Arc;

use anyhow::Result;
use storefront_core::{api, config::Config, publisher::EventPublisher};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let nats = match config.nats_url.as_deref() {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable, events will only be logged"); None }
        },
        None => None,
    };
    let state = api::AppState::in_memory(config.limits(), Arc::new(config.fee_schedule())).with_events(EventPublisher::new(nats));
    let app = api::router(state);

    tracing::info!("storefront-core listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, app).await?;
    Ok(())
}
