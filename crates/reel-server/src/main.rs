mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, http::HeaderValue, routing::get};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use reel_api::{AppStateInner, AuthConfig};
use reel_catalog::{TmdbCatalog, TmdbConfig};
use reel_db::Database;
use reel_gateway::Dispatcher;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reel=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    let catalog = TmdbCatalog::new(TmdbConfig {
        api_key: config.tmdb_api_key.clone(),
        base_url: config.tmdb_base_url.clone(),
        language: config.tmdb_language.clone(),
        genre_cache_ttl: config.genre_cache_ttl,
    });

    // Shared state
    let dispatcher = Dispatcher::new();
    let state = AppStateInner::new(
        db,
        Arc::new(catalog),
        dispatcher,
        AuthConfig {
            jwt_secret: config.jwt_secret.clone(),
            token_ttl: chrono::Duration::hours(config.token_ttl_hours),
        },
    );

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(reel_api::router(state))
        .layer(cors(&config.cors_origins))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Reel server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Reel server stopped");
    Ok(())
}

fn cors(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::permissive().allow_origin(AllowOrigin::list(origins))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
