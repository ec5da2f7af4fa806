//! Ballot server entry point.

use std::sync::Arc;

use axum::{
    http::{header, Method},
    middleware,
    routing::get,
    Json, Router,
};
use ballot_api::{middleware::auth_middleware, router as api_router, AppState};
use ballot_common::{config::StoreBackend, Config};
use ballot_core::{
    DatabasePollStore, DatabaseProfileStore, MemoryPollStore, MemoryProfileStore, PollStore,
    ProfileStore,
};
use serde_json::{json, Value};
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Largest request body accepted by the API.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Liveness probe.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Poll and profile stores sharing one backend.
type Stores = (Arc<dyn PollStore>, Arc<dyn ProfileStore>);

/// Build the stores selected by configuration.
async fn open_stores(config: &Config) -> Result<Stores, Box<dyn std::error::Error>> {
    match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory stores");
            Ok((
                Arc::new(MemoryPollStore::new()),
                Arc::new(MemoryProfileStore::new()),
            ))
        }
        StoreBackend::Database => {
            info!("Using database stores");
            let db = Arc::new(ballot_db::connect(config.database()?).await?);
            Ok((
                Arc::new(DatabasePollStore::new(Arc::clone(&db))),
                Arc::new(DatabaseProfileStore::new(db)),
            ))
        }
    }
}

/// CORS policy for browser clients.
///
/// The identity header is left out so a page on another origin cannot
/// claim a user ID.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ballot=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting ballot server...");

    // Load configuration
    let config = Config::load()?;

    let (polls, profiles) = open_stores(&config).await?;
    let state = AppState::new(polls, profiles, &config.voting);

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .nest("/api", api_router())
        .layer(middleware::from_fn(auth_middleware))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state);

    // Start server with graceful shutdown
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
