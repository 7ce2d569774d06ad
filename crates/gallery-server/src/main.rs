mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use gallery_api::auth::{AppState, AppStateInner};
use gallery_storage::Cloudinary;

use crate::config::Config;

/// 10 MB upload limit for photos
const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "gallery_server=debug,gallery_api=debug,gallery_db=debug,gallery_storage=debug,tower_http=debug".into()
                }),
        )
        .init();

    // Config — refuse to serve traffic with an incomplete secret surface
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    // Init database. A failed open does not kill the server: data
    // routes answer a uniform 500 until the store comes back.
    let db = match gallery_db::Database::open(&config.db_path) {
        Ok(db) => Some(db),
        Err(e) => {
            error!("Database unavailable, data routes will return 500: {:#}", e);
            None
        }
    };

    let storage = Cloudinary::new(config.cloudinary.clone())?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        storage: Arc::new(storage),
        session_secret: config.session_secret.clone(),
    });

    // Routes: the /api surface plus the static frontend for everything else
    let app = gallery_api::router(state)
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Gallery server listening on {}", addr);
    info!("Serving static assets from {}", config.static_dir.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
