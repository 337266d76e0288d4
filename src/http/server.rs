//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the upload, remove and health handlers
//! - Wire up middleware (CORS, request ID, tracing, timeout, body limit)
//! - Render timed-out requests as JSON
//! - Gate the upload route behind the rate limiter
//! - Swap the runtime when a reloaded configuration arrives
//! - Run the rate-limit sweeper alongside the server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, Method, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::http::remove::remove_handler;
use crate::http::request::{request_span, UuidRequestId};
use crate::http::response::{method_not_allowed, preflight, render_timeout};
use crate::http::upload::upload_handler;
use crate::pipeline::{PipelineSettings, UploadPipeline};
use crate::removal::{BulkRemover, RemovalSettings};
use crate::security::rate_limit::{rate_limit_middleware, run_sweeper, RateLimiter};
use crate::shopify::ShopifyClient;

/// Everything derived from one loaded configuration. Replaced wholesale on
/// reload; requests in flight keep the one they started with.
pub struct Runtime {
    pub config: RelayConfig,
    /// `Err` holds the reason uploads are unavailable.
    pub pipeline: Result<UploadPipeline, String>,
    /// `Err` holds the reason removal is unavailable.
    pub remover: Result<BulkRemover, String>,
}

impl Runtime {
    pub fn from_config(config: RelayConfig) -> Self {
        let client = ShopifyClient::new(&config.shop).map_err(|e| e.to_string());
        if let Err(reason) = &client {
            tracing::warn!(reason = %reason, "Storefront client unavailable; upload and remove will fail");
        }
        if config.removal.admin_password.is_none() {
            tracing::warn!("No admin password configured; removal is disabled");
        }

        let pipeline = client
            .clone()
            .map(|c| UploadPipeline::new(c, PipelineSettings::from(&config.upload)));
        let remover = client.map(|c| {
            BulkRemover::new(
                c,
                config.removal.admin_password.clone(),
                RemovalSettings::from(&config.removal),
            )
        });

        Self {
            config,
            pipeline,
            remover,
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ArcSwap<Runtime>>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        Self {
            runtime: Arc::new(ArcSwap::from_pointee(Runtime::from_config(config))),
            limiter,
        }
    }

    /// Install a freshly loaded configuration. The rate-limit table is kept.
    pub fn reload(&self, config: RelayConfig) {
        let previous = self.runtime.load();
        if previous.config.rate_limit.max_requests != config.rate_limit.max_requests
            || previous.config.rate_limit.window_secs != config.rate_limit.window_secs
            || previous.config.rate_limit.enabled != config.rate_limit.enabled
        {
            tracing::warn!("Rate limit settings changed; they take effect after restart");
        }
        self.runtime.store(Arc::new(Runtime::from_config(config)));
        tracing::info!("Runtime reloaded");
    }
}

/// HTTP server for the relay.
pub struct RelayServer {
    router: Router,
    config: RelayConfig,
    state: AppState,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        let state = AppState::new(config.clone());
        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

        let upload = Router::new()
            .route(
                "/api/upload",
                post(upload_handler)
                    .options(preflight)
                    .fallback(method_not_allowed),
            )
            .route_layer(middleware::from_fn_with_state(
                state.limiter.clone(),
                rate_limit_middleware,
            ));

        Router::new()
            .merge(upload)
            .route(
                "/api/remove",
                post(remove_handler)
                    .options(preflight)
                    .fallback(method_not_allowed),
            )
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(cors)
                    .layer(middleware::map_response(render_timeout))
                    .layer(TimeoutLayer::with_status_code(
                        StatusCode::REQUEST_TIMEOUT,
                        Duration::from_secs(config.server.request_timeout_secs),
                    )),
            )
    }

    /// Serve until `shutdown` fires, applying configuration updates as they
    /// arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if self.config.rate_limit.enabled {
            tokio::spawn(run_sweeper(
                self.state.limiter.clone(),
                Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
                shutdown.resubscribe(),
            ));
        }

        let reload_state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                reload_state.reload(config);
            }
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let runtime = state.runtime.load();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uploadsAvailable": runtime.pipeline.is_ok(),
        "removalAvailable": runtime.remover.is_ok()
            && runtime.config.removal.admin_password.is_some(),
        "trackedClients": state.limiter.tracked(),
    }))
}
