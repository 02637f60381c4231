//! Payment gateway port.
//!
//! One implementation per provider (Mercado Pago, PagSeguro, a mock for
//! tests). Adapters translate this uniform contract to each provider's
//! REST semantics and normalize the answers back.

use serde::{Deserialize, Serialize};

use crate::domain::{EntityLink, Money, PaymentMethod, PaymentProvider, PaymentStatus};
use crate::error::GatewayError;

/// Input for creating a remote payment/checkout at the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentInput {
    pub amount: Money,
    pub method: PaymentMethod,
    pub description: String,
    pub payer_email: String,
    pub entity: EntityLink,
    /// Where the provider should call back with status changes.
    pub callback_url: Option<String>,
}

/// Normalized result of a remote payment creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedPayment {
    /// Provider-side payment/order identifier.
    pub external_id: String,
    pub status: PaymentStatus,
    /// Hosted checkout URL, when the provider issues one.
    pub payment_url: Option<String>,
    /// Pix QR code payload, when the provider issues one.
    pub qr_code: Option<String>,
    /// Raw provider response, persisted for audit.
    pub raw: serde_json::Value,
}

/// Input for a direct card charge (tokenized card data only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardPaymentInput {
    /// Provider card token; raw card data never reaches this service.
    pub card_token: String,
    pub amount: Money,
    pub installments: u32,
    pub holder_name: String,
    pub payer_email: String,
}

/// Normalized outcome of a card charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPaymentResult {
    pub external_id: String,
    pub status: PaymentStatus,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub raw: serde_json::Value,
}

/// One installment plan option for a card payment.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct InstallmentOption {
    pub installments: u32,
    /// Per-installment amount in minor units.
    pub installment_amount: i64,
    /// Total across all installments in minor units.
    pub total_amount: i64,
    /// Monthly interest rate in percent; 0 for interest-free plans.
    pub interest_rate: f64,
}

/// Normalized webhook payload, provider-independent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookNotification {
    /// Provider-side payment identifier the callback refers to.
    pub external_id: String,
    pub status: PaymentStatus,
    /// Raw provider payload, persisted onto the payment for audit.
    pub raw: serde_json::Value,
}

/// Uniform contract over third-party payment providers.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    /// The provider this client talks to.
    fn provider(&self) -> PaymentProvider;

    /// Creates a payment/checkout at the provider.
    async fn create_payment(
        &self,
        input: CreatePaymentInput,
    ) -> Result<CreatedPayment, GatewayError>;

    /// Charges a tokenized card directly.
    async fn process_card_payment(
        &self,
        input: CardPaymentInput,
    ) -> Result<GatewayPaymentResult, GatewayError>;

    /// Installment plans available for the given amount.
    async fn installment_options(
        &self,
        amount: Money,
        method: Option<PaymentMethod>,
        card_bin: Option<&str>,
    ) -> Result<Vec<InstallmentOption>, GatewayError>;

    /// Validates the provider's webhook signature. Must not mutate state and
    /// must compare signatures in constant time.
    fn validate_webhook(&self, payload: &[u8], signature: &str, timestamp: Option<&str>) -> bool;

    /// Normalizes a raw webhook body. Async because some providers (Mercado
    /// Pago) deliver only an id and the status has to be fetched back.
    async fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookNotification, GatewayError>;
}
