//! Gateway configuration handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use fedpay_types::{
    AppError, CreateGatewayConfigRequest, EntityType, FederationRepository,
    GatewayConfigResponse,
};

use super::{ApiError, AppState};

/// Register a gateway configuration.
#[tracing::instrument(skip(state, req), fields(provider = %req.provider, label = %req.label))]
pub async fn create<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<CreateGatewayConfigRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.label.trim().is_empty() {
        return Err(AppError::BadRequest("Label cannot be empty".into()).into());
    }
    if req.entity_types.is_empty() {
        return Err(AppError::BadRequest("At least one entity type is required".into()).into());
    }
    if req.methods.is_empty() {
        return Err(AppError::BadRequest("At least one payment method is required".into()).into());
    }
    // Reject credentials the provider adapter cannot use before they are stored.
    fedpay_gateways::create_gateway(req.provider, &req.credentials, req.sandbox)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let config = state
        .service
        .repo()
        .create_gateway_config(req)
        .await
        .map_err(AppError::from)?;

    Ok((StatusCode::CREATED, Json(GatewayConfigResponse::from(config))))
}

/// Query parameters for the gateway listing.
#[derive(Debug, Deserialize)]
pub struct GatewayListQuery {
    pub entity_type: Option<EntityType>,
}

/// List gateway configurations, optionally for one entity type.
#[tracing::instrument(skip(state))]
pub async fn list<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<GatewayListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let configs = state
        .service
        .repo()
        .list_gateway_configs(query.entity_type)
        .await
        .map_err(AppError::from)?;

    let response: Vec<GatewayConfigResponse> = configs
        .into_iter()
        .map(GatewayConfigResponse::from)
        .collect();
    Ok(Json(response))
}
