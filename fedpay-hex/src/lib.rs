//! # Fedpay Hex
//!
//! Application service layer and HTTP adapter for the federation payment
//! service.
//!
//! ## Architecture
//!
//! - `service/` - Application services (checkout, protocols, ledger,
//!   webhooks, notifications)
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `R: FederationRepository`, allowing
//! different repository implementations to be injected.

pub mod inbound;
pub mod openapi;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use service::{FederationService, GenerateProtocolInput, WebhookOutcome};
