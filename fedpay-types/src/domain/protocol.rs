//! Protocol numbers: human-readable unique references for transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::payment::{EntityType, PaymentId};
use crate::error::DomainError;

/// Transaction domain a protocol number is minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolType {
    Membership,
    Event,
    Club,
    Other,
}

impl ProtocolType {
    /// Three-letter prefix used in the formatted number.
    pub fn prefix(&self) -> &'static str {
        match self {
            ProtocolType::Membership => "FIL",
            ProtocolType::Event => "EVT",
            ProtocolType::Club => "CLB",
            ProtocolType::Other => "OTH",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "FIL" => Some(ProtocolType::Membership),
            "EVT" => Some(ProtocolType::Event),
            "CLB" => Some(ProtocolType::Club),
            "OTH" => Some(ProtocolType::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolType::Membership => "MEMBERSHIP",
            ProtocolType::Event => "EVENT",
            ProtocolType::Club => "CLUB",
            ProtocolType::Other => "OTHER",
        }
    }
}

impl From<EntityType> for ProtocolType {
    fn from(entity: EntityType) -> Self {
        match entity {
            EntityType::EventRegistration => ProtocolType::Event,
            EntityType::AthleteMembership => ProtocolType::Membership,
            EntityType::ClubAffiliation => ProtocolType::Club,
        }
    }
}

impl std::fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProtocolType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MEMBERSHIP" => Ok(ProtocolType::Membership),
            "EVENT" => Ok(ProtocolType::Event),
            "CLUB" => Ok(ProtocolType::Club),
            "OTHER" => Ok(ProtocolType::Other),
            other => Err(DomainError::ValidationError(format!(
                "Unknown protocol type: {other}"
            ))),
        }
    }
}

/// Formatted protocol number: `{PREFIX}{YYYY}{NNNNNN}`, e.g. `EVT2025000123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ProtocolNumber(String);

impl ProtocolNumber {
    /// Formats a number from its parts. The sequence is zero-padded to six
    /// digits; sequences above 999999 widen rather than wrap, keeping
    /// numbers unique at the cost of the fixed width.
    pub fn format(protocol_type: ProtocolType, year: i32, sequence: i64) -> Self {
        Self(format!("{}{}{:06}", protocol_type.prefix(), year, sequence))
    }

    /// Parses and validates a formatted number.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let (prefix, rest) = s
            .split_at_checked(3)
            .ok_or_else(|| DomainError::InvalidProtocolNumber(s.to_string()))?;
        let protocol_type = ProtocolType::from_prefix(prefix)
            .ok_or_else(|| DomainError::InvalidProtocolNumber(s.to_string()))?;
        if rest.len() < 10 || !rest.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::InvalidProtocolNumber(s.to_string()));
        }
        let year: i32 = rest[..4]
            .parse()
            .map_err(|_| DomainError::InvalidProtocolNumber(s.to_string()))?;
        let sequence: i64 = rest[4..]
            .parse()
            .map_err(|_| DomainError::InvalidProtocolNumber(s.to_string()))?;
        Ok(Self::format(protocol_type, year, sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The protocol type encoded in the prefix.
    pub fn protocol_type(&self) -> ProtocolType {
        ProtocolType::from_prefix(&self.0[..3]).expect("validated at construction")
    }

    /// The four-digit year segment.
    pub fn year(&self) -> i32 {
        self.0[3..7].parse().expect("validated at construction")
    }

    /// The sequence segment.
    pub fn sequence(&self) -> i64 {
        self.0[7..].parse().expect("validated at construction")
    }
}

impl std::fmt::Display for ProtocolNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProtocolNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Lifecycle status of a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolStatus {
    Active,
    Settled,
    Cancelled,
}

impl std::fmt::Display for ProtocolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProtocolStatus::Active => "ACTIVE",
            ProtocolStatus::Settled => "SETTLED",
            ProtocolStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ProtocolStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(ProtocolStatus::Active),
            "SETTLED" => Ok(ProtocolStatus::Settled),
            "CANCELLED" => Ok(ProtocolStatus::Cancelled),
            other => Err(DomainError::ValidationError(format!(
                "Unknown protocol status: {other}"
            ))),
        }
    }
}

/// A minted protocol: the user-facing tracking reference for a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    pub number: ProtocolNumber,
    pub protocol_type: ProtocolType,
    pub year: i32,
    pub sequence: i64,
    pub status: ProtocolStatus,
    pub entity_id: Uuid,
    pub payment_id: Option<PaymentId>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Protocol {
    /// Mints a protocol value from an already-allocated sequence number.
    pub fn minted(
        protocol_type: ProtocolType,
        year: i32,
        sequence: i64,
        entity_id: Uuid,
        payment_id: Option<PaymentId>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            number: ProtocolNumber::format(protocol_type, year, sequence),
            protocol_type,
            year,
            sequence,
            status: ProtocolStatus::Active,
            entity_id,
            payment_id,
            metadata,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        let number = ProtocolNumber::format(ProtocolType::Event, 2025, 123);
        assert_eq!(number.as_str(), "EVT2025000123");
    }

    #[test]
    fn test_format_all_prefixes() {
        assert_eq!(
            ProtocolNumber::format(ProtocolType::Membership, 2025, 1).as_str(),
            "FIL2025000001"
        );
        assert_eq!(
            ProtocolNumber::format(ProtocolType::Club, 2025, 1).as_str(),
            "CLB2025000001"
        );
        assert_eq!(
            ProtocolNumber::format(ProtocolType::Other, 2025, 1).as_str(),
            "OTH2025000001"
        );
    }

    #[test]
    fn test_parse_roundtrip() {
        let number = ProtocolNumber::parse("EVT2025000123").unwrap();
        assert_eq!(number.protocol_type(), ProtocolType::Event);
        assert_eq!(number.year(), 2025);
        assert_eq!(number.sequence(), 123);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(ProtocolNumber::parse("XXX2025000123").is_err());
        assert!(ProtocolNumber::parse("EVT20250001").is_err());
        assert!(ProtocolNumber::parse("EVT2025abc123").is_err());
        assert!(ProtocolNumber::parse("EV").is_err());
        assert!(ProtocolNumber::parse("").is_err());
    }

    #[test]
    fn test_entity_type_mapping() {
        assert_eq!(
            ProtocolType::from(EntityType::EventRegistration),
            ProtocolType::Event
        );
        assert_eq!(
            ProtocolType::from(EntityType::AthleteMembership),
            ProtocolType::Membership
        );
        assert_eq!(
            ProtocolType::from(EntityType::ClubAffiliation),
            ProtocolType::Club
        );
    }

    #[test]
    fn test_minted_protocol() {
        let entity = Uuid::new_v4();
        let protocol = Protocol::minted(ProtocolType::Event, 2025, 7, entity, None, None);
        assert_eq!(protocol.number.as_str(), "EVT2025000007");
        assert_eq!(protocol.status, ProtocolStatus::Active);
    }
}
