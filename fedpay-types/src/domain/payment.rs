//! Payment domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::Money;

/// Unique identifier for a Payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Creates a new random PaymentId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a PaymentId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PaymentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Third-party payment provider behind a gateway configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    MercadoPago,
    PagSeguro,
    Mock,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::MercadoPago => "mercadopago",
            PaymentProvider::PagSeguro => "pagseguro",
            PaymentProvider::Mock => "mock",
        }
    }
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentProvider {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mercadopago" => Ok(PaymentProvider::MercadoPago),
            "pagseguro" => Ok(PaymentProvider::PagSeguro),
            "mock" => Ok(PaymentProvider::Mock),
            other => Err(crate::error::DomainError::UnsupportedProvider(
                other.to_string(),
            )),
        }
    }
}

/// How the payer settles the charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    CreditCard,
    Boleto,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "pix",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Boleto => "boleto",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pix" => Ok(PaymentMethod::Pix),
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "boleto" => Ok(PaymentMethod::Boleto),
            other => Err(crate::error::DomainError::ValidationError(format!(
                "Unknown payment method: {other}"
            ))),
        }
    }
}

/// Lifecycle status of a payment.
///
/// Pending is the only non-terminal state; Confirmed, Failed and Expired
/// are sticky so replayed provider webhooks cannot move a settled payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Failed,
    Expired,
}

impl PaymentStatus {
    /// Returns true once the payment can no longer change state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    /// Whether a transition to `next` is allowed.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        match self {
            PaymentStatus::Pending => next != PaymentStatus::Pending,
            _ => false,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Confirmed => "CONFIRMED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Expired => "EXPIRED",
        };
        write!(f, "{s}")
    }
}

/// The kind of business object a payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    EventRegistration,
    AthleteMembership,
    ClubAffiliation,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::EventRegistration => "EVENT_REGISTRATION",
            EntityType::AthleteMembership => "ATHLETE_MEMBERSHIP",
            EntityType::ClubAffiliation => "CLUB_AFFILIATION",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EVENT_REGISTRATION" => Ok(EntityType::EventRegistration),
            "ATHLETE_MEMBERSHIP" => Ok(EntityType::AthleteMembership),
            "CLUB_AFFILIATION" => Ok(EntityType::ClubAffiliation),
            other => Err(crate::error::DomainError::ValidationError(format!(
                "Unknown entity type: {other}"
            ))),
        }
    }
}

/// Link from a payment to its owning business entity.
///
/// A payment always resolves to exactly one of registration, athlete or
/// club. The database stores three nullable columns; this enum keeps the
/// exactly-one invariant out of reach of application bugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "entity_type", content = "entity_id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityLink {
    EventRegistration(Uuid),
    AthleteMembership(Uuid),
    ClubAffiliation(Uuid),
}

impl EntityLink {
    /// The entity kind this link points at.
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityLink::EventRegistration(_) => EntityType::EventRegistration,
            EntityLink::AthleteMembership(_) => EntityType::AthleteMembership,
            EntityLink::ClubAffiliation(_) => EntityType::ClubAffiliation,
        }
    }

    /// The linked entity id.
    pub fn entity_id(&self) -> Uuid {
        match self {
            EntityLink::EventRegistration(id)
            | EntityLink::AthleteMembership(id)
            | EntityLink::ClubAffiliation(id) => *id,
        }
    }

    /// Builds a link from its stored (type, id) pair.
    pub fn from_parts(entity_type: EntityType, entity_id: Uuid) -> Self {
        match entity_type {
            EntityType::EventRegistration => EntityLink::EventRegistration(entity_id),
            EntityType::AthleteMembership => EntityLink::AthleteMembership(entity_id),
            EntityType::ClubAffiliation => EntityLink::ClubAffiliation(entity_id),
        }
    }
}

/// A payment tracked against a third-party provider.
///
/// Rows are never hard-deleted; the status walks the lifecycle and the raw
/// provider payload is kept for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub provider: PaymentProvider,
    /// Provider-side payment/order identifier.
    pub external_id: Option<String>,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub entity: EntityLink,
    pub payer_email: String,
    /// Phone for WhatsApp confirmation, when the payer opted in.
    pub payer_phone: Option<String>,
    /// Hosted checkout URL, when the provider issues one.
    pub payment_url: Option<String>,
    /// Pix QR code payload, when the provider issues one.
    pub qr_code: Option<String>,
    /// Last raw provider payload seen for this payment.
    pub raw_payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a fresh pending payment for the given entity.
    pub fn pending(
        provider: PaymentProvider,
        amount: Money,
        method: PaymentMethod,
        entity: EntityLink,
        payer_email: impl Into<String>,
        payer_phone: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::new(),
            provider,
            external_id: None,
            amount,
            method,
            status: PaymentStatus::Pending,
            entity,
            payer_email: payer_email.into(),
            payer_phone,
            payment_url: None,
            qr_code: None,
            raw_payload: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Currency;

    #[test]
    fn test_entity_link_roundtrip() {
        let id = Uuid::new_v4();
        let link = EntityLink::from_parts(EntityType::AthleteMembership, id);
        assert_eq!(link.entity_type(), EntityType::AthleteMembership);
        assert_eq!(link.entity_id(), id);
    }

    #[test]
    fn test_status_transitions() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Confirmed));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Expired));
        assert!(!PaymentStatus::Confirmed.can_transition_to(PaymentStatus::Failed));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Confirmed));
    }

    #[test]
    fn test_pending_payment() {
        let amount = Money::new(5000, Currency::BRL).unwrap();
        let link = EntityLink::EventRegistration(Uuid::new_v4());
        let payment = Payment::pending(
            PaymentProvider::MercadoPago,
            amount,
            PaymentMethod::Pix,
            link,
            "atleta@clube.com.br",
            None,
        );

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.external_id.is_none());
        assert_eq!(payment.entity.entity_type(), EntityType::EventRegistration);
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!(
            "mercadopago".parse::<PaymentProvider>().unwrap(),
            PaymentProvider::MercadoPago
        );
        assert!("stripe".parse::<PaymentProvider>().is_err());
    }
}
