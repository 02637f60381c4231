//! # Fedpay Types
//!
//! Domain types and port traits for the federation payment service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Payment, Protocol, LedgerEntry)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    ApiKey, ApiKeyId, Currency, EntityLink, EntityType, GatewayConfig, GatewayConfigId,
    LedgerEntry, LedgerEntryId, LedgerEvent, LedgerFilter, LedgerStats, Money, Notification,
    NotificationAttempt, NotificationChannel, NotificationStatus, Payment, PaymentId,
    PaymentMethod, PaymentProvider, PaymentStatus, Protocol, ProtocolNumber, ProtocolStatus,
    ProtocolType,
};
pub use dto::*;
pub use error::{AppError, DomainError, GatewayError, RepoError};
pub use ports::{
    CardPaymentInput, CreatePaymentInput, CreatedPayment, FederationRepository,
    GatewayPaymentResult, InstallmentOption, PaymentGateway, WebhookNotification,
};
