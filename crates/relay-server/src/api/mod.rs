//! HTTP surface: application state, router and server loop

pub mod response;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::{json, Map, Value};
use tokio::signal;
use tracing::{info, warn};

use crate::clients::{
    resilience::CircuitState, HttpBackend, HttpBlobStore, HttpIndexer, HttpObjectStore,
    HttpRulesEngine,
};
use crate::config::Config;
use crate::features::{self, FeatureState};
use crate::import::CustomerImporter;
use crate::middleware;

/// Everything the router needs
#[derive(Clone)]
pub struct AppState {
    pub features: FeatureState,
    /// Backends whose circuit state `/health` reports
    pub backends: Vec<HttpBackend>,
}

impl AppState {
    /// Wire the HTTP facades, each with its own circuit breaker
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let resilience = &config.resilience;
        let object_backend =
            HttpBackend::new("object-store", &config.backends.object_store, resilience)?;
        let blob_backend = HttpBackend::new("blob-store", &config.backends.blob_store, resilience)?;
        let rules_backend =
            HttpBackend::new("rules-engine", &config.backends.rules_engine, resilience)?;
        let indexer_backend = HttpBackend::new("indexer", &config.backends.indexer, resilience)?;

        let backends = vec![
            object_backend.clone(),
            blob_backend.clone(),
            rules_backend.clone(),
            indexer_backend.clone(),
        ];

        let object_store = Arc::new(HttpObjectStore::new(object_backend));
        let blob_store = Arc::new(HttpBlobStore::new(blob_backend));

        let features = FeatureState {
            importer: CustomerImporter::new(
                object_store.clone(),
                blob_store.clone(),
                config.import.clone(),
            ),
            object_store,
            blob_store,
            rules: Arc::new(HttpRulesEngine::new(rules_backend)),
            indexer: Arc::new(HttpIndexer::new(indexer_backend)),
        };

        Ok(Self { features, backends })
    }
}

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState, config: &Config) -> Router {
    let feature_routes = features::router(state.features.clone());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state)
        .nest("/api/v1", feature_routes)
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Bind, serve and drain on Ctrl+C/SIGTERM
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        })
        .into_future();

    let drain_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    tokio::select! {
        result = server => result?,
        _ = async {
            if signalled_rx.await.is_ok() {
                tokio::time::sleep(drain_timeout).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => {
            warn!(
                timeout_secs = drain_timeout.as_secs(),
                "Connections still open after shutdown timeout, closing anyway"
            );
        },
    }

    info!("Server shut down gracefully");
    Ok(())
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Relay",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Liveness plus the circuit state of each backend; open circuits degrade
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut circuits = Map::new();
    let mut degraded = false;
    for backend in &state.backends {
        let circuit = backend.circuit_state();
        degraded |= circuit != CircuitState::Closed;
        circuits.insert(
            backend.service().to_string(),
            serde_json::to_value(circuit).unwrap_or(Value::Null),
        );
    }

    Json(json!({
        "status": if degraded { "degraded" } else { "healthy" },
        "circuits": circuits,
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
