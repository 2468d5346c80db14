use anyhow::Context;
use tracing_subscriber::EnvFilter;

use movie_recommender::{
    api::{create_router, AppState},
    Config, Recommender,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("movie_recommender=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    // Without both artifacts there is nothing to serve
    let recommender = Recommender::load(&config).with_context(|| {
        format!(
            "failed to load {} and {}",
            config.movies_path, config.similarity_path
        )
    })?;

    let addr = config.bind_address();
    let app = create_router(AppState::new(recommender, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(addr = %addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
