use std::sync::Arc;

use provisioner_core::{Config, Provisioner};
use provisioner_server::{
    build_router, errors::ServerError, kafka::KafkaConnector, AppState, DEFAULT_LOG_FILTER,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing; librdkafka logs come through the same subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(%e, "Kafka provisioner stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let config = Arc::new(Config::from_env()?);

    let provisioner = Provisioner::new(config.clone(), Arc::new(KafkaConnector::new()));
    let app = build_router(AppState { provisioner });

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!(
        gateway = %config.gateway,
        broker = %config.broker,
        "Starting kafka provisioner on {}",
        config.bind_address
    );

    axum::serve(listener, app).await?;
    Ok(())
}
