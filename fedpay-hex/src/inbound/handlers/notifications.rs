//! Notification queue handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use fedpay_types::{EnqueueNotificationRequest, FederationRepository, NotificationResponse};

use super::{ApiError, AppState};

/// Enqueue an outbound notification.
#[tracing::instrument(skip(state, req), fields(channel = %req.channel))]
pub async fn enqueue<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<EnqueueNotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = state.service.enqueue_notification(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(NotificationResponse::from(notification)),
    ))
}

/// Get a notification with its delivery attempts.
#[tracing::instrument(skip(state), fields(notification_id = %id))]
pub async fn get<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = state.service.get_notification(id).await?;
    let attempts = state.service.list_notification_attempts(id).await?;

    Ok(Json(serde_json::json!({
        "notification": NotificationResponse::from(notification),
        "attempts": attempts,
    })))
}
