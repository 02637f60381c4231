//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};
use tower_http::trace::TraceLayer;
use utoipa_swagger_ui::SwaggerUi;

use fedpay_types::FederationRepository;

use super::auth::auth_middleware;
use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::FederationService;
use crate::openapi::ApiDoc;

/// HTTP Server for the Federation Payments API.
pub struct HttpServer<R: FederationRepository> {
    state: Arc<AppState<R>>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<R: FederationRepository> HttpServer<R> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: FederationService<R>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::default()), // 100 req/min default
        }
    }

    /// Creates a new HTTP server with custom rate limiting.
    pub fn with_rate_limit(service: FederationService<R>, requests_per_minute: u32) -> Self {
        use std::time::Duration;
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::new(
                requests_per_minute,
                Duration::from_secs(60),
            )),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        use utoipa::OpenApi;

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/bootstrap", post(handlers::bootstrap::<R>))
            .route("/api/keys", post(handlers::create_api_key::<R>))
            .route("/api/keys", get(handlers::list_api_keys::<R>))
            .route("/api/keys/{id}", delete(handlers::delete_api_key::<R>))
            .route(
                "/api/payments/checkout",
                post(handlers::payments::checkout::<R>),
            )
            .route(
                "/api/payments/installments",
                get(handlers::payments::installment_options::<R>),
            )
            .route("/api/payments/{id}", get(handlers::payments::get_payment::<R>))
            .route(
                "/api/payments/{id}/card",
                post(handlers::payments::card_payment::<R>),
            )
            .route(
                "/api/webhooks/payment",
                post(handlers::webhooks::payment_webhook::<R>),
            )
            .route(
                "/api/protocols/entity/{entity_id}",
                get(handlers::protocols::list_for_entity::<R>),
            )
            .route(
                "/api/protocols/{number}",
                get(handlers::protocols::get_protocol::<R>),
            )
            .route(
                "/api/protocols/{number}/status",
                patch(handlers::protocols::update_status::<R>),
            )
            .route("/api/ledger", get(handlers::ledger::list::<R>))
            .route("/api/ledger/stats", get(handlers::ledger::stats::<R>))
            .route(
                "/api/ledger/entity/{entity_id}",
                get(handlers::ledger::list_for_entity::<R>),
            )
            .route("/api/gateways", post(handlers::gateways::create::<R>))
            .route("/api/gateways", get(handlers::gateways::list::<R>))
            .route(
                "/api/notifications",
                post(handlers::notifications::enqueue::<R>),
            )
            .route(
                "/api/notifications/{id}",
                get(handlers::notifications::get::<R>),
            )
            .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware::<R>,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
