//! Checkout and payment handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use fedpay_types::{
    AppError, CardPaymentRequest, CheckoutRequest, Currency, EntityType, FederationRepository,
    Money, PaymentId, PaymentMethod, PaymentResponse,
};

use super::{ApiError, AppState};

/// Open a checkout for a federation entity.
#[tracing::instrument(skip(state, req), fields(entity_type = %req.entity_type, amount = req.amount))]
pub async fn checkout<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.service.checkout(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get payment by ID.
#[tracing::instrument(skip(state), fields(payment_id = %id))]
pub async fn get_payment<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let payment_id: PaymentId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid payment ID".into()))?;

    let payment = state.service.get_payment(payment_id).await?;
    Ok(Json(PaymentResponse::from(payment)))
}

/// Settle a pending payment with a tokenized card.
#[tracing::instrument(skip(state, req), fields(payment_id = %id))]
pub async fn card_payment<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Json(req): Json<CardPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payment_id: PaymentId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid payment ID".into()))?;

    let response = state.service.process_card_payment(payment_id, req).await?;
    Ok(Json(response))
}

/// Query parameters for installment options.
#[derive(Debug, Deserialize)]
pub struct InstallmentsQuery {
    pub entity_type: EntityType,
    /// Amount in smallest currency unit
    pub amount: i64,
    #[serde(default)]
    pub currency: Currency,
    pub method: Option<PaymentMethod>,
    /// First card digits, when the provider prices by issuer
    pub bin: Option<String>,
}

/// Installment plans for a prospective charge.
#[tracing::instrument(skip(state), fields(entity_type = %query.entity_type, amount = query.amount))]
pub async fn installment_options<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<InstallmentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if query.amount <= 0 {
        return Err(AppError::BadRequest("Amount must be positive".into()).into());
    }
    let amount = Money::new(query.amount, query.currency).map_err(AppError::from)?;

    let options = state
        .service
        .installment_options(query.entity_type, amount, query.method, query.bin.as_deref())
        .await?;
    Ok(Json(options))
}
