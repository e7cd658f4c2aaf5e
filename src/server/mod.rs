//! HTTP transport for the conversion pipeline.
//!
//! ```text
//! POST /api/convert   multipart upload → zip download or JSON image array
//! GET  /health        liveness + version + output mode
//! GET  /              plain-text banner (archive mode only)
//! OPTIONS *           200 with an empty body (preflights via the CORS layer)
//! ```
//!
//! Every response carries `Access-Control-Allow-Origin: *`. Errors are JSON
//! bodies of the form `{ "success": false, "error": <kind>, "message": … }`.

pub mod handlers;
pub mod response;
pub mod upload;

use crate::config::{OutputMode, ServerConfig};
use crate::error::ConvertError;
use crate::pipeline::render::RenderBackend;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub backend: Arc<dyn RenderBackend>,
}

impl AppState {
    pub fn new(config: ServerConfig, backend: Arc<dyn RenderBackend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
        }
    }
}

/// Build the router with CORS, request tracing and the upload size limit.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router: Router<AppState> = Router::new()
        .route(
            "/api/convert",
            post(handlers::convert).fallback(handlers::method_not_allowed),
        )
        .route("/health", get(handlers::health));

    // The banner only exists for zip deployments.
    if state.config.conversion.output_mode == OutputMode::Archive {
        router = router.route("/", get(handlers::root));
    }

    router
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(middleware::from_fn(answer_options))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `OPTIONS` without preflight headers never reaches a route.
async fn answer_options(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}

/// Bind `config.host:config.port` and serve until Ctrl+C or SIGTERM.
pub async fn serve(config: ServerConfig, backend: Arc<dyn RenderBackend>) -> Result<(), ConvertError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        "pdf2img listening on {} ({} output, {} engine, field '{}')",
        addr,
        config.conversion.output_mode,
        backend.name(),
        config.file_field
    );

    let app = create_router(AppState::new(config, backend));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received, draining connections");
}
