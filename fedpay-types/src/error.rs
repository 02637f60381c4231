//! Error types for the federation payment service.

use crate::domain::{Currency, PaymentStatus};

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    #[error("Unsupported payment provider: {0}")]
    UnsupportedProvider(String),

    #[error("Invalid protocol number: {0}")]
    InvalidProtocolNumber(String),

    #[error("Illegal payment status transition: {from} -> {to}")]
    IllegalStatusTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Gateway-adapter errors (provider integration failures).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Bad or missing gateway configuration (unknown provider, malformed
    /// credentials). Caller misconfiguration, not a provider outage.
    #[error("Gateway configuration error: {0}")]
    Config(String),

    #[error("Provider request failed: {0}")]
    Http(String),

    /// The provider answered with an error payload.
    #[error("Provider rejected the request: {0}")]
    Provider(String),

    #[error("Unparseable provider payload: {0}")]
    Payload(String),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Upstream provider error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(DomainError::ValidationError(msg)) => AppError::BadRequest(msg),
            RepoError::Domain(e) => AppError::BadRequest(e.to_string()),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Conflict(msg) => AppError::Conflict(msg),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Config(msg) => AppError::Internal(format!("gateway config: {msg}")),
            GatewayError::Http(msg) | GatewayError::Provider(msg) => AppError::Upstream(msg),
            GatewayError::Payload(msg) => AppError::Upstream(format!("bad provider payload: {msg}")),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
