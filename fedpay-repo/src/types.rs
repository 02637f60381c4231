//! Database row structs and domain conversion.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use fedpay_types::{
    ApiKey, ApiKeyId, Currency, EntityLink, EntityType, GatewayConfig, GatewayConfigId,
    LedgerEntry, LedgerEntryId, LedgerEvent, Money, Notification, NotificationAttempt,
    NotificationChannel, NotificationStatus, Payment, PaymentId, PaymentMethod, PaymentProvider,
    PaymentStatus, Protocol, ProtocolNumber, ProtocolStatus, ProtocolType, RepoError,
};

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

fn parse<T>(s: &str, what: &str) -> Result<T, RepoError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    s.parse()
        .map_err(|e| RepoError::Database(format!("Bad {what} in row: {e}")))
}

pub fn parse_payment_status(s: &str) -> Result<PaymentStatus, RepoError> {
    match s {
        "PENDING" => Ok(PaymentStatus::Pending),
        "CONFIRMED" => Ok(PaymentStatus::Confirmed),
        "FAILED" => Ok(PaymentStatus::Failed),
        "EXPIRED" => Ok(PaymentStatus::Expired),
        other => Err(RepoError::Database(format!(
            "Unknown payment status: {other}"
        ))),
    }
}

pub fn parse_notification_status(s: &str) -> Result<NotificationStatus, RepoError> {
    match s {
        "PENDING" => Ok(NotificationStatus::Pending),
        "SENT" => Ok(NotificationStatus::Sent),
        "FAILED" => Ok(NotificationStatus::Failed),
        other => Err(RepoError::Database(format!(
            "Unknown notification status: {other}"
        ))),
    }
}

fn parse_string_array<T>(value: &serde_json::Value, what: &str) -> Result<Vec<T>, RepoError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .as_array()
        .ok_or_else(|| RepoError::Database(format!("{what} is not an array")))?
        .iter()
        .map(|v| {
            let s = v
                .as_str()
                .ok_or_else(|| RepoError::Database(format!("{what} element is not a string")))?;
            parse(s, what)
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Row structs
// ─────────────────────────────────────────────────────────────────────────────

/// Gateway configuration row.
#[derive(FromRow)]
pub struct DbGatewayConfig {
    pub id: Uuid,
    pub provider: String,
    pub label: String,
    pub active: bool,
    pub priority: i32,
    pub methods: serde_json::Value,
    pub entity_types: serde_json::Value,
    pub sandbox: bool,
    pub credentials: serde_json::Value,
    pub callback_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DbGatewayConfig {
    pub fn into_domain(self) -> Result<GatewayConfig, RepoError> {
        Ok(GatewayConfig {
            id: GatewayConfigId::from_uuid(self.id),
            provider: parse::<PaymentProvider>(&self.provider, "provider")?,
            label: self.label,
            active: self.active,
            priority: self.priority,
            methods: parse_string_array::<PaymentMethod>(&self.methods, "method")?,
            entity_types: parse_string_array::<EntityType>(&self.entity_types, "entity type")?,
            sandbox: self.sandbox,
            credentials: self.credentials,
            callback_url: self.callback_url,
            created_at: self.created_at,
        })
    }
}

/// Payment row. Exactly one of the three entity columns is populated,
/// enforced by a CHECK constraint.
#[derive(FromRow)]
pub struct DbPayment {
    pub id: Uuid,
    pub provider: String,
    pub external_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub method: String,
    pub status: String,
    pub entity_type: String,
    pub registration_id: Option<Uuid>,
    pub athlete_id: Option<Uuid>,
    pub club_id: Option<Uuid>,
    pub payer_email: String,
    pub payer_phone: Option<String>,
    pub payment_url: Option<String>,
    pub qr_code: Option<String>,
    pub raw_payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbPayment {
    pub fn into_domain(self) -> Result<Payment, RepoError> {
        let entity_type = parse::<EntityType>(&self.entity_type, "entity type")?;
        let entity_id = match entity_type {
            EntityType::EventRegistration => self.registration_id,
            EntityType::AthleteMembership => self.athlete_id,
            EntityType::ClubAffiliation => self.club_id,
        }
        .ok_or_else(|| RepoError::Database("payment without entity link".into()))?;

        let currency = parse::<Currency>(&self.currency, "currency")?;
        let amount = Money::new(self.amount, currency).map_err(RepoError::Domain)?;

        Ok(Payment {
            id: PaymentId::from_uuid(self.id),
            provider: parse::<PaymentProvider>(&self.provider, "provider")?,
            external_id: self.external_id,
            amount,
            method: parse::<PaymentMethod>(&self.method, "method")?,
            status: parse_payment_status(&self.status)?,
            entity: EntityLink::from_parts(entity_type, entity_id),
            payer_email: self.payer_email,
            payer_phone: self.payer_phone,
            payment_url: self.payment_url,
            qr_code: self.qr_code,
            raw_payload: self.raw_payload,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Columns for the three nullable entity FK slots of a payment row.
pub fn entity_columns(link: &EntityLink) -> (Option<Uuid>, Option<Uuid>, Option<Uuid>) {
    match link {
        EntityLink::EventRegistration(id) => (Some(*id), None, None),
        EntityLink::AthleteMembership(id) => (None, Some(*id), None),
        EntityLink::ClubAffiliation(id) => (None, None, Some(*id)),
    }
}

/// Protocol row.
#[derive(FromRow)]
pub struct DbProtocol {
    pub number: String,
    pub protocol_type: String,
    pub year: i32,
    pub sequence: i64,
    pub status: String,
    pub entity_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl DbProtocol {
    pub fn into_domain(self) -> Result<Protocol, RepoError> {
        Ok(Protocol {
            number: ProtocolNumber::parse(&self.number).map_err(RepoError::Domain)?,
            protocol_type: parse::<ProtocolType>(&self.protocol_type, "protocol type")?,
            year: self.year,
            sequence: self.sequence,
            status: parse::<ProtocolStatus>(&self.status, "protocol status")?,
            entity_id: self.entity_id,
            payment_id: self.payment_id.map(PaymentId::from_uuid),
            metadata: self.metadata,
            created_at: self.created_at,
        })
    }
}

/// Ledger entry row.
#[derive(FromRow)]
pub struct DbLedgerEntry {
    pub id: Uuid,
    pub entry_type: String,
    pub entity_id: Uuid,
    pub entity_type: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub payment_id: Uuid,
    pub protocol: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbLedgerEntry {
    pub fn into_domain(self) -> Result<LedgerEntry, RepoError> {
        let currency = parse::<Currency>(&self.currency, "currency")?;
        let amount = Money::new(self.amount, currency).map_err(RepoError::Domain)?;
        let protocol = self
            .protocol
            .as_deref()
            .map(ProtocolNumber::parse)
            .transpose()
            .map_err(RepoError::Domain)?;

        Ok(LedgerEntry {
            id: LedgerEntryId::from_uuid(self.id),
            entry_type: parse::<ProtocolType>(&self.entry_type, "entry type")?,
            entity_id: self.entity_id,
            entity_type: parse::<EntityType>(&self.entity_type, "entity type")?,
            amount,
            status: parse_payment_status(&self.status)?,
            payment_id: PaymentId::from_uuid(self.payment_id),
            protocol,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Ledger status-change event row.
#[derive(FromRow)]
pub struct DbLedgerEvent {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub occurred_at: DateTime<Utc>,
}

impl DbLedgerEvent {
    pub fn into_domain(self) -> Result<LedgerEvent, RepoError> {
        Ok(LedgerEvent {
            id: self.id,
            entry_id: LedgerEntryId::from_uuid(self.entry_id),
            from_status: parse_payment_status(&self.from_status)?,
            to_status: parse_payment_status(&self.to_status)?,
            occurred_at: self.occurred_at,
        })
    }
}

/// Notification row.
#[derive(FromRow)]
pub struct DbNotification {
    pub id: Uuid,
    pub channel: String,
    pub recipient: String,
    pub subject: Option<String>,
    pub body: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl DbNotification {
    pub fn into_domain(self) -> Result<Notification, RepoError> {
        Ok(Notification {
            id: self.id,
            channel: parse::<NotificationChannel>(&self.channel, "channel")?,
            recipient: self.recipient,
            subject: self.subject,
            body: self.body,
            status: parse_notification_status(&self.status)?,
            created_at: self.created_at,
        })
    }
}

/// Notification attempt row.
#[derive(FromRow)]
pub struct DbNotificationAttempt {
    pub id: Uuid,
    pub notification_id: Uuid,
    pub channel: String,
    pub succeeded: bool,
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl DbNotificationAttempt {
    pub fn into_domain(self) -> Result<NotificationAttempt, RepoError> {
        Ok(NotificationAttempt {
            id: self.id,
            notification_id: self.notification_id,
            channel: parse::<NotificationChannel>(&self.channel, "channel")?,
            succeeded: self.succeeded,
            error: self.error,
            attempted_at: self.attempted_at,
        })
    }
}

/// API key row.
#[derive(FromRow)]
pub struct DbApiKey {
    pub id: Uuid,
    pub name: String,
    pub key_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl DbApiKey {
    pub fn into_domain(self) -> ApiKey {
        ApiKey {
            id: ApiKeyId::from_uuid(self.id),
            name: self.name,
            key_hash: self.key_hash,
            is_active: self.is_active,
            created_at: self.created_at,
            last_used_at: self.last_used_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_columns_exactly_one() {
        let id = Uuid::new_v4();
        assert_eq!(
            entity_columns(&EntityLink::EventRegistration(id)),
            (Some(id), None, None)
        );
        assert_eq!(
            entity_columns(&EntityLink::AthleteMembership(id)),
            (None, Some(id), None)
        );
        assert_eq!(
            entity_columns(&EntityLink::ClubAffiliation(id)),
            (None, None, Some(id))
        );
    }

    #[test]
    fn test_parse_string_array() {
        let value = serde_json::json!(["pix", "credit_card"]);
        let methods: Vec<PaymentMethod> = parse_string_array(&value, "method").unwrap();
        assert_eq!(methods, vec![PaymentMethod::Pix, PaymentMethod::CreditCard]);

        let bad = serde_json::json!("pix");
        assert!(parse_string_array::<PaymentMethod>(&bad, "method").is_err());
    }
}
