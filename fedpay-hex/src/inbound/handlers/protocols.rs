//! Protocol lookup handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use fedpay_types::{
    AppError, FederationRepository, ProtocolNumber, ProtocolResponse, UpdateProtocolStatusRequest,
};

use super::{ApiError, AppState};

/// Get a protocol by its formatted number.
#[tracing::instrument(skip(state), fields(protocol = %number))]
pub async fn get_protocol<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let number = ProtocolNumber::parse(&number)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let protocol = state.service.get_protocol(&number).await?;
    Ok(Json(ProtocolResponse::from(protocol)))
}

/// List protocols minted for an entity.
#[tracing::instrument(skip(state), fields(entity_id = %entity_id))]
pub async fn list_for_entity<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(entity_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let protocols = state.service.list_protocols_for_entity(entity_id).await?;
    let response: Vec<ProtocolResponse> =
        protocols.into_iter().map(ProtocolResponse::from).collect();
    Ok(Json(response))
}

/// Move a protocol to a new status.
#[tracing::instrument(skip(state, req), fields(protocol = %number))]
pub async fn update_status<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(number): Path<String>,
    Json(req): Json<UpdateProtocolStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let number = ProtocolNumber::parse(&number)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let protocol = state
        .service
        .update_protocol_status(&number, req.status)
        .await?;
    Ok(Json(ProtocolResponse::from(protocol)))
}
