mod analytics;
mod config;
mod db;
mod errors;
mod journal;
mod server;
mod state;

use crate::state::AppState;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("trade_journal starting");

    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    let db_pool = match db::init_db(&cfg.data_dir) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("database init error: {e}");
            std::process::exit(1);
        }
    };

    let port = cfg.server_port;
    let app = server::router(AppState::new(cfg, db_pool));

    let addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("server listening on {addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("server error: {e}");
    }

    tracing::info!("trade_journal stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
