//! HTTP surface for the coderelay execution gateway
//!
//! Exposes `POST /execute-remote`, which always answers `200 OK` with the
//! canonical `{success, output, exitCode}` body, plus `GET /health` and
//! `GET /languages` for operators and front ends.

pub mod error;

pub use error::{Result, ServerError};

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, Uri};
use axum::response::Json;
use axum::routing::{get, post};
use axum::{middleware, Router};
use coderelay_core::core_types::MISSING_PARAMETERS;
use coderelay_core::{Deadline, ExecutionGateway, ExecutionRequest, ExecutionResult};
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Header a caller can use to ask for a shorter deadline than the server default.
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout-ms";

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    /// Whether provider credentials are present.
    pub configured: bool,
}

#[derive(Serialize)]
pub struct LanguageEntry {
    pub label: String,
    pub runtime: String,
}

#[derive(Serialize)]
pub struct LanguagesResponse {
    pub languages: Vec<LanguageEntry>,
}

/// Configuration for the coderelay server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Enable CORS
    pub enable_cors: bool,
    /// CORS allowed origins (if None, allows any origin)
    pub cors_origins: Option<Vec<String>>,
    /// Default deadline for one execution request, retries included
    pub request_timeout: Duration,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Enable request logging
    pub enable_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            enable_cors: true,
            cors_origins: None,
            request_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024, // 1MB
            enable_logging: true,
        }
    }
}

impl ServerConfig {
    /// Parse and set the bind address from a string.
    pub fn with_bind_addr_str(mut self, addr: &str) -> Result<Self> {
        self.bind_addr = addr
            .parse()
            .map_err(|e| ServerError::config_error(format!("Invalid bind address: {}", e)))?;
        Ok(self)
    }

    /// Enable or disable CORS.
    pub fn with_cors(mut self, enable: bool) -> Self {
        self.enable_cors = enable;
        self
    }

    /// Set allowed CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set the default request deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set maximum request body size.
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Enable or disable request logging.
    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }
}

/// Shared application state containing the gateway and configuration.
#[derive(Clone)]
pub struct AppState {
    pub gateway: ExecutionGateway,
    pub config: ServerConfig,
    /// Cancelled when the server begins shutting down.
    pub shutdown: CancellationToken,
}

/// Deadline for one request: the server default, shortened (never extended)
/// by a valid `x-request-timeout-ms` header.
fn request_deadline(headers: &HeaderMap, config: &ServerConfig) -> Deadline {
    let requested = headers
        .get(REQUEST_TIMEOUT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_millis);

    let timeout = match requested {
        Some(requested) if requested < config.request_timeout => requested,
        _ => config.request_timeout,
    };
    Deadline::after(timeout)
}

/// Handler for the /execute-remote POST endpoint.
async fn execute_remote_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<ExecutionRequest>, JsonRejection>,
) -> Json<ExecutionResult> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let err = ServerError::from(rejection);
            log::warn!("Rejected execution request ({}): {}", err.error_type(), err);
            return Json(ExecutionResult::failure(MISSING_PARAMETERS, None));
        }
    };

    let deadline = request_deadline(&headers, &app_state.config)
        .with_cancellation(app_state.shutdown.child_token());

    let result = app_state.gateway.execute(&request, &deadline).await;
    log::debug!(
        "Execution finished: success={} exitCode={:?}",
        result.success,
        result.exit_code
    );

    Json(result)
}

/// Handler for the /languages GET endpoint.
async fn languages_handler(State(app_state): State<AppState>) -> Json<LanguagesResponse> {
    let languages = app_state
        .gateway
        .resolver()
        .entries()
        .map(|(label, runtime)| LanguageEntry {
            label: label.to_string(),
            runtime: runtime.to_string(),
        })
        .collect();

    Json(LanguagesResponse { languages })
}

async fn health_handler(State(app_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        configured: app_state.gateway.is_configured(),
    })
}

async fn not_found_handler(uri: Uri) -> ServerError {
    ServerError::not_found(uri.path().to_string())
}

/// The coderelay HTTP server.
pub struct GatewayServer {
    gateway: ExecutionGateway,
    config: ServerConfig,
    shutdown: CancellationToken,
}

impl GatewayServer {
    /// Create a new server with the given gateway and default configuration.
    pub fn new(gateway: ExecutionGateway) -> Self {
        Self::with_config(gateway, ServerConfig::default())
    }

    /// Create a new server with custom configuration.
    pub fn with_config(gateway: ExecutionGateway, config: ServerConfig) -> Self {
        Self {
            gateway,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token cancelled when graceful shutdown begins; every request deadline
    /// is a child of it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Build the Axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            gateway: self.gateway.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.clone(),
        };

        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/languages", get(languages_handler))
            .route("/execute-remote", post(execute_remote_handler))
            .fallback(not_found_handler)
            .layer(DefaultBodyLimit::max(self.config.max_body_size))
            .with_state(state);

        if self.config.enable_logging {
            router = router.layer(middleware::from_fn(
                |request: axum::http::Request<axum::body::Body>,
                 next: axum::middleware::Next| async {
                    let request_id = uuid::Uuid::new_v4().to_string();
                    let method = request.method().clone();
                    let uri = request.uri().clone();

                    // Health probes are frequent; keep them out of the info log
                    let quiet = uri.path() == "/health";
                    if quiet {
                        log::debug!("Request {} {} {}", request_id, method, uri);
                    } else {
                        log::info!("Request {} {} {}", request_id, method, uri);
                    }

                    let start = std::time::Instant::now();
                    let response = next.run(request).await;
                    let duration = start.elapsed();

                    if quiet {
                        log::debug!("Response {} completed in {:?}", request_id, duration);
                    } else {
                        log::info!(
                            "Response {} {} completed in {:?}",
                            request_id,
                            response.status(),
                            duration
                        );
                    }

                    response
                },
            ));
        }

        router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors_layer = match self.config.cors_origins {
                Some(ref origins) => {
                    let parsed: std::result::Result<Vec<_>, _> =
                        origins.iter().map(|s| s.parse()).collect();
                    match parsed {
                        Ok(origins) => CorsLayer::new()
                            .allow_origin(origins)
                            .allow_methods(Any)
                            .allow_headers(Any),
                        Err(e) => {
                            log::warn!("Ignoring invalid CORS origins ({}); allowing any origin", e);
                            CorsLayer::permissive()
                        }
                    }
                }
                None => CorsLayer::permissive(),
            };
            router = router.layer(cors_layer);
        }

        router
    }

    async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.config.bind_addr).await.map_err(|e| {
            ServerError::config_error(format!(
                "Failed to bind to {}: {}",
                self.config.bind_addr, e
            ))
        })
    }

    fn log_endpoints(&self) {
        let addr = self.config.bind_addr;
        log::info!("coderelay server starting on {}", addr);
        log::info!("Health check: http://{}/health", addr);
        log::info!("Languages: http://{}/languages", addr);
        log::info!("Execute endpoint: http://{}/execute-remote", addr);
        if !self.gateway.is_configured() {
            log::warn!(
                "Provider credentials are not set; every execution request will be answered with a not-configured result"
            );
        }
    }

    /// Start the server and listen for connections.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        let listener = self.bind().await?;
        self.log_endpoints();

        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))
    }

    /// Start the server with graceful shutdown support.
    ///
    /// In-flight executions are cancelled once `shutdown_signal` resolves, so
    /// they complete promptly with a failure result instead of running to
    /// their deadline.
    pub async fn serve_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind().await?;
        self.log_endpoints();

        let token = self.shutdown_token();
        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(async move {
                shutdown_signal.await;
                token.cancel();
            })
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))?;

        log::info!("coderelay server shut down gracefully");
        Ok(())
    }
}

/// Utility function to create a shutdown signal from Ctrl+C.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
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
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            log::info!("Received SIGTERM, shutting down...");
        },
    }
}
