//! Ledger service: queries over the gateway-independent transaction record.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use fedpay_types::{
    AppError, FederationRepository, LedgerEntry, LedgerEntryId, LedgerEvent, LedgerFilter,
    LedgerStats, PaymentId, PaymentStatus, ProtocolType,
};

use super::FederationService;

impl<R: FederationRepository> FederationService<R> {
    /// Records a new ledger entry. A second entry for the same payment is a
    /// conflict.
    pub async fn open_ledger_entry(&self, entry: LedgerEntry) -> Result<LedgerEntry, AppError> {
        self.repo.create_ledger_entry(entry).await.map_err(Into::into)
    }

    /// Moves the entry identified by its unique payment id to a new status,
    /// appending a history event.
    pub async fn update_ledger_status(
        &self,
        payment_id: PaymentId,
        status: PaymentStatus,
    ) -> Result<LedgerEntry, AppError> {
        self.repo
            .update_ledger_status_by_payment(payment_id, status)
            .await
            .map_err(Into::into)
    }

    /// Ledger entry for a payment.
    pub async fn get_ledger_entry_by_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<LedgerEntry, AppError> {
        self.repo
            .get_ledger_entry_by_payment(payment_id)
            .await
            .map_err(Into::into)
            .and_then(|opt| {
                opt.ok_or_else(|| AppError::NotFound(format!("Ledger entry for {payment_id}")))
            })
    }

    /// All ledger entries recorded against an entity.
    pub async fn list_ledger_for_entity(
        &self,
        entity_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        self.repo
            .list_ledger_for_entity(entity_id)
            .await
            .map_err(Into::into)
    }

    /// Entries of one type, filtered and paginated.
    pub async fn list_ledger_by_type(
        &self,
        entry_type: ProtocolType,
        filter: LedgerFilter,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        self.repo
            .list_ledger_by_type(entry_type, filter)
            .await
            .map_err(Into::into)
    }

    /// Status-change history of an entry.
    pub async fn list_ledger_events(
        &self,
        entry_id: LedgerEntryId,
    ) -> Result<Vec<LedgerEvent>, AppError> {
        self.repo
            .list_ledger_events(entry_id)
            .await
            .map_err(Into::into)
    }

    /// Count, sum and status histogram over a date range.
    pub async fn ledger_stats(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<LedgerStats, AppError> {
        self.repo.ledger_stats(from, to).await.map_err(Into::into)
    }
}
