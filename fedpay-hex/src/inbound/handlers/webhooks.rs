//! Provider webhook handler.
//!
//! Not API-key-authenticated: callers prove themselves with the provider
//! signature, validated by the gateway adapter before any state changes.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde::Deserialize;

use fedpay_types::FederationRepository;

use super::{ApiError, AppState};

/// Query parameters of the webhook endpoint.
#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    pub provider: String,
}

/// Receive a payment-provider callback.
#[tracing::instrument(skip(state, headers, body), fields(provider = %query.provider))]
pub async fn payment_webhook<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers.get("x-signature").and_then(|v| v.to_str().ok());
    let timestamp = headers.get("x-timestamp").and_then(|v| v.to_str().ok());

    let outcome = state
        .service
        .process_webhook(&query.provider, signature, timestamp, &body)
        .await?;

    Ok(Json(serde_json::json!({
        "payment_id": outcome.payment.id,
        "status": outcome.payment.status,
        "replay": outcome.replay,
    })))
}
