//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the API handlers
//! - Wire up middleware (CORS, origin guard, rate limits, body limit,
//!   timeout, error envelope, request ID, tracing, metrics)
//! - Serve the built front-end when present
//! - Run until shutdown, alongside the rate limit sweeper

use axum::{
    http::HeaderName,
    middleware,
    routing::{any, get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::forward::RequestForwarder;
use crate::http::handlers;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::security::{
    origin_guard, rate_limit_middleware, EndpointCategory, OriginAllowList, RateLimitGate, RateLimiter,
};

const X_REQUEST_ID: &str = "x-request-id";
const BACKGROUND_GRACE: Duration = Duration::from_secs(5);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<RequestForwarder>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let forwarder = Arc::new(RequestForwarder::new(reqwest::Client::new(), &config));
        forwarder.report_credentials();

        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        let state = AppState { forwarder };

        let router = Self::build_router(&config, state, limiter.clone());
        Self {
            router,
            config,
            limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState, limiter: Arc<RateLimiter>) -> Router {
        let allow_list = OriginAllowList::from_config(&config.cors);
        let chat_gate = RateLimitGate::new(limiter.clone(), EndpointCategory::Chat, &config.rate_limit);
        let contact_gate = RateLimitGate::new(limiter, EndpointCategory::Contact, &config.rate_limit);

        let mutating = Router::new()
            .route(
                "/api/chat",
                post(handlers::chat).layer(middleware::from_fn_with_state(chat_gate, rate_limit_middleware)),
            )
            .route(
                "/api/contact",
                post(handlers::contact).layer(middleware::from_fn_with_state(contact_gate, rate_limit_middleware)),
            )
            .layer(middleware::from_fn_with_state(allow_list.clone(), origin_guard));

        let mut router = Router::new()
            .merge(mutating)
            .route("/api/health", get(handlers::health))
            .route("/api/{*rest}", any(handlers::api_not_found))
            .layer(allow_list.cors_layer())
            .with_state(state);

        let static_dir = Path::new(&config.site.static_dir);
        if static_dir.is_dir() {
            let serve_dir = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));
            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "Serving static front-end");
        }

        let request_id = HeaderName::from_static(X_REQUEST_ID);

        router
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn(handlers::error_envelope))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires, then wait for the background tasks it started.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut signal = shutdown.subscribe();

        if self.config.rate_limit.enabled {
            let interval = Duration::from_secs(self.config.rate_limit.sweep_interval_secs);
            let limiter = self.limiter.clone();
            shutdown.spawn_background("rate-limit-sweeper", move |rx| limiter.run_sweeper(interval, rx));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = signal.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        shutdown.drain(BACKGROUND_GRACE).await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The shared rate limit table.
    pub fn limiter(&self) -> Arc<RateLimiter> {
        self.limiter.clone()
    }
}
