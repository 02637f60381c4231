//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    Currency, EntityType, GatewayConfig, GatewayConfigId, LedgerEntry, LedgerEntryId,
    Notification, NotificationChannel, NotificationStatus, Payment, PaymentId, PaymentMethod,
    PaymentProvider, PaymentStatus, Protocol, ProtocolNumber, ProtocolStatus, ProtocolType,
};

// ─────────────────────────────────────────────────────────────────────────────
// Gateway configuration DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to register a gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateGatewayConfigRequest {
    pub provider: PaymentProvider,
    /// Operator-facing label
    #[schema(example = "mp-producao")]
    pub label: String,
    /// Higher wins when several configs match an entity type
    #[serde(default)]
    pub priority: i32,
    pub methods: Vec<PaymentMethod>,
    pub entity_types: Vec<EntityType>,
    #[serde(default)]
    pub sandbox: bool,
    /// Provider-specific credentials, opaque to the server
    pub credentials: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// Gateway configuration as exposed over the API. Credentials never leave
/// the server.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GatewayConfigResponse {
    pub id: GatewayConfigId,
    pub provider: PaymentProvider,
    pub label: String,
    pub active: bool,
    pub priority: i32,
    pub methods: Vec<PaymentMethod>,
    pub entity_types: Vec<EntityType>,
    pub sandbox: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<GatewayConfig> for GatewayConfigResponse {
    fn from(cfg: GatewayConfig) -> Self {
        Self {
            id: cfg.id,
            provider: cfg.provider,
            label: cfg.label,
            active: cfg.active,
            priority: cfg.priority,
            methods: cfg.methods,
            entity_types: cfg.entity_types,
            sandbox: cfg.sandbox,
            callback_url: cfg.callback_url,
            created_at: cfg.created_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Checkout / payment DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to open a checkout for a federation entity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    /// Amount in smallest currency unit
    #[schema(example = 15000)]
    pub amount: i64,
    #[serde(default)]
    pub currency: Currency,
    pub method: PaymentMethod,
    #[schema(example = "Inscricao - Campeonato Estadual 2025")]
    pub description: String,
    pub payer_email: String,
    /// Phone for WhatsApp confirmation, when the payer opted in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Response after opening a checkout.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    pub payment_id: PaymentId,
    pub provider: PaymentProvider,
    pub status: PaymentStatus,
    /// User-facing tracking reference
    #[schema(example = "EVT2025000123")]
    pub protocol: ProtocolNumber,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
}

/// Payment as exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: PaymentId,
    pub provider: PaymentProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Amount in smallest currency unit
    pub amount: i64,
    pub currency: Currency,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub payer_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            provider: p.provider,
            external_id: p.external_id,
            amount: p.amount.amount(),
            currency: p.amount.currency(),
            method: p.method,
            status: p.status,
            entity_type: p.entity.entity_type(),
            entity_id: p.entity.entity_id(),
            payer_email: p.payer_email,
            payment_url: p.payment_url,
            qr_code: p.qr_code,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Request to settle an existing payment with a tokenized card.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CardPaymentRequest {
    /// Provider card token; raw card data never reaches this service
    pub card_token: String,
    #[schema(example = 3)]
    pub installments: u32,
    pub holder_name: String,
    pub payer_email: String,
}

/// Outcome of a card charge.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CardPaymentResponse {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Protocol DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Protocol as exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProtocolResponse {
    #[schema(example = "EVT2025000123")]
    pub number: ProtocolNumber,
    pub protocol_type: ProtocolType,
    pub year: i32,
    pub sequence: i64,
    pub status: ProtocolStatus,
    pub entity_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
    pub created_at: DateTime<Utc>,
}

impl From<Protocol> for ProtocolResponse {
    fn from(p: Protocol) -> Self {
        Self {
            number: p.number,
            protocol_type: p.protocol_type,
            year: p.year,
            sequence: p.sequence,
            status: p.status,
            entity_id: p.entity_id,
            payment_id: p.payment_id,
            created_at: p.created_at,
        }
    }
}

/// Request to move a protocol to a new status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateProtocolStatusRequest {
    pub status: ProtocolStatus,
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Ledger entry as exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerEntryResponse {
    pub id: LedgerEntryId,
    pub entry_type: ProtocolType,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    /// Amount in smallest currency unit
    pub amount: i64,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub payment_id: PaymentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<ProtocolNumber>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(e: LedgerEntry) -> Self {
        Self {
            id: e.id,
            entry_type: e.entry_type,
            entity_type: e.entity_type,
            entity_id: e.entity_id,
            amount: e.amount.amount(),
            currency: e.amount.currency(),
            status: e.status,
            payment_id: e.payment_id,
            protocol: e.protocol,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Notification DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to enqueue an outbound notification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnqueueNotificationRequest {
    pub channel: NotificationChannel,
    /// Phone number for WhatsApp, address for email
    #[schema(example = "+5511999990000")]
    pub recipient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
}

/// Notification as exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub channel: NotificationChannel,
    pub recipient: String,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            channel: n.channel,
            recipient: n.recipient,
            status: n.status,
            created_at: n.created_at,
        }
    }
}
