//! Ledger domain model: the gateway-independent transaction record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::Money;
use super::payment::{EntityType, PaymentId, PaymentStatus};
use super::protocol::{ProtocolNumber, ProtocolType};

/// Unique identifier for a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct LedgerEntryId(Uuid);

impl LedgerEntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for LedgerEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LedgerEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for LedgerEntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A transaction-lifecycle record, independent of the gateway that served it.
///
/// `payment_id` uniquely identifies the entry; inserting a second entry for
/// the same payment is a conflict, never a silent overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub entry_type: ProtocolType,
    pub entity_id: Uuid,
    pub entity_type: EntityType,
    pub amount: Money,
    pub status: PaymentStatus,
    pub payment_id: PaymentId,
    pub protocol: Option<ProtocolNumber>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Opens a pending ledger entry for a freshly created payment.
    pub fn open(
        entry_type: ProtocolType,
        entity_id: Uuid,
        entity_type: EntityType,
        amount: Money,
        payment_id: PaymentId,
        protocol: Option<ProtocolNumber>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: LedgerEntryId::new(),
            entry_type,
            entity_id,
            entity_type,
            amount,
            status: PaymentStatus::Pending,
            payment_id,
            protocol,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One status change in a ledger entry's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub id: Uuid,
    pub entry_id: LedgerEntryId,
    pub from_status: PaymentStatus,
    pub to_status: PaymentStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Query filter for ledger listings.
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    pub status: Option<PaymentStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: u32,
    pub per_page: u32,
}

impl LedgerFilter {
    /// Clamps paging to sane bounds: page >= 1, 1 <= per_page <= 100.
    pub fn normalized(mut self) -> Self {
        if self.page == 0 {
            self.page = 1;
        }
        self.per_page = self.per_page.clamp(1, 100);
        self
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }
}

/// Aggregate statistics over a date range.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerStats {
    pub count: i64,
    /// Sum of amounts in minor units.
    pub total_amount: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub failed: i64,
    pub expired: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Currency;

    #[test]
    fn test_open_entry_is_pending() {
        let amount = Money::new(2500, Currency::BRL).unwrap();
        let entry = LedgerEntry::open(
            ProtocolType::Event,
            Uuid::new_v4(),
            EntityType::EventRegistration,
            amount,
            PaymentId::new(),
            None,
            None,
        );
        assert_eq!(entry.status, PaymentStatus::Pending);
        assert!(entry.protocol.is_none());
    }

    #[test]
    fn test_filter_normalization() {
        let filter = LedgerFilter {
            page: 0,
            per_page: 5000,
            ..Default::default()
        }
        .normalized();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.per_page, 100);
        assert_eq!(filter.offset(), 0);

        let filter = LedgerFilter {
            page: 3,
            per_page: 20,
            ..Default::default()
        }
        .normalized();
        assert_eq!(filter.offset(), 40);
    }
}
