use crate::catalog::Catalog;
use crate::config::Config;
use crate::pool::CredentialPool;
use crate::streaming::StreamServer;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    middleware,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
mod error;
pub mod routes_admin;
pub mod routes_stats;
pub mod routes_stream;
pub mod routes_watch;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub streamer: StreamServer,
    /// Title lookup for the watch route (optional)
    pub catalog: Option<Arc<dyn Catalog>>,
    /// Cancelled to stop the server; open streams abort with it
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(config: Config, pool: CredentialPool, catalog: Option<Arc<dyn Catalog>>) -> Self {
        let shutdown = CancellationToken::new();
        let streamer = StreamServer::new(
            pool,
            config.stream.settings(),
            config.telegram.bin_chat(),
        )
        .with_shutdown(shutdown.clone());

        Self {
            config: Arc::new(config),
            streamer,
            catalog,
            shutdown,
        }
    }

    pub fn pool(&self) -> &CredentialPool {
        self.streamer.pool()
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::RANGE])
        .expose_headers([
            header::CONTENT_RANGE,
            header::CONTENT_LENGTH,
            header::ACCEPT_RANGES,
        ]);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .merge(routes_stream::stream_routes())
        .nest("/api", api_routes(&ctx))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn api_routes(ctx: &AppContext) -> Router<AppContext> {
    let protected_routes = routes_stats::stats_routes()
        .merge(routes_admin::admin_routes())
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            auth::api_auth_middleware,
        ));

    routes_watch::watch_routes().merge(protected_routes)
}

async fn health_check() -> &'static str {
    "ok"
}

/// Start the HTTP server and run until a shutdown signal or restart request
pub async fn start_server(ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .context("Invalid server address")?;

    let shutdown = ctx.shutdown.clone();
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
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
        _ = shutdown.cancelled() => {},
    }

    tracing::info!("Shutdown signal received");
    // Open streams never finish on their own; end them so the drain completes.
    shutdown.cancel();
}
