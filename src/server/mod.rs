use crate::config::Config;
use crate::streaming::{start_sweep_task, StreamRegistry};
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

mod error;
pub mod routes_stream;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub registry: StreamRegistry,
}

impl AppContext {
    pub fn new(config: Config, registry: StreamRegistry) -> Self {
        Self {
            config: Arc::new(config),
            registry,
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", routes_stream::stream_routes());

    // Playlists and segments straight from the stream directory
    let public_path = ctx.config.streams.public_path.trim_end_matches('/');
    let files = ServeDir::new(&ctx.config.streams.dir);
    app = if public_path.is_empty() {
        app.fallback_service(files)
    } else {
        app.nest_service(public_path, files)
    };

    let mut app = app.layer(TraceLayer::new_for_http());

    if ctx.config.server.cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN]);
        app = app.layer(cors);
    }

    app.with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server and the sweep task.
///
/// Runs until Ctrl+C or SIGTERM, then stops every stream before returning.
pub async fn start_server(config: Config, registry: StreamRegistry) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let sweeper = start_sweep_task(registry.clone(), config.streams.sweep_interval());

    let ctx = AppContext::new(config, registry.clone());
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.abort();
    registry.stop_all();

    served?;
    tracing::info!("Server shutdown complete");
    Ok(())
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
            Ok(mut sig) => {
                sig.recv().await;
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

    tracing::info!("Shutdown signal received");
}
