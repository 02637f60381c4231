//! Ledger query handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use fedpay_types::{
    FederationRepository, LedgerEntryResponse, LedgerFilter, PaymentStatus, ProtocolType,
};

use super::{ApiError, AppState};

/// Query parameters for the typed ledger listing.
#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    #[serde(rename = "type")]
    pub entry_type: ProtocolType,
    pub status: Option<PaymentStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    50
}

/// List ledger entries of one type with filter and pagination.
#[tracing::instrument(skip(state), fields(entry_type = %query.entry_type))]
pub async fn list<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<LedgerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = LedgerFilter {
        status: query.status,
        from: query.from,
        to: query.to,
        page: query.page,
        per_page: query.per_page,
    };

    let entries = state
        .service
        .list_ledger_by_type(query.entry_type, filter)
        .await?;
    let response: Vec<LedgerEntryResponse> =
        entries.into_iter().map(LedgerEntryResponse::from).collect();
    Ok(Json(response))
}

/// List ledger entries recorded against an entity.
#[tracing::instrument(skip(state), fields(entity_id = %entity_id))]
pub async fn list_for_entity<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(entity_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state.service.list_ledger_for_entity(entity_id).await?;
    let response: Vec<LedgerEntryResponse> =
        entries.into_iter().map(LedgerEntryResponse::from).collect();
    Ok(Json(response))
}

/// Date-range query for the stats endpoint.
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Aggregate ledger statistics over a date range.
#[tracing::instrument(skip(state))]
pub async fn stats<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.service.ledger_stats(query.from, query.to).await?;
    Ok(Json(stats))
}
