use clap::Parser;
use tracing_subscriber::EnvFilter;
use dent_detect::server::{create_router, AppState, SERVICE_NAME};
use dent_detect::{Predictor, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();

    // RUST_LOG wins over DEBUG
    let default_level = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .init();

    log::info!("Starting {} v{}", SERVICE_NAME, env!("CARGO_PKG_VERSION"));

    let model_config = settings.model_config();
    log::info!("Model configuration:\n{}", model_config);
    let predictor = tokio::task::spawn_blocking(move || Predictor::load(&model_config)).await?;
    log::info!("Predictor: {}", predictor.kind());

    tokio::fs::create_dir_all(&settings.upload_dir).await?;

    let addr = settings.bind_address();
    let app = create_router(AppState::new(settings, predictor));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Server running on http://{}", addr);
    log::info!("Health check: http://{}/api/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}
