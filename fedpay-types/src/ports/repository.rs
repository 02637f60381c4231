//! Repository port trait.
//!
//! The primary port of the hexagonal architecture. The Postgres adapter
//! implements this trait; services stay generic over it so tests can run
//! against an in-memory implementation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    ApiKey, ApiKeyId, EntityType, GatewayConfig, LedgerEntry, LedgerEvent, LedgerFilter,
    LedgerStats, Notification, NotificationAttempt, NotificationChannel, NotificationStatus,
    Payment, PaymentId, PaymentProvider, PaymentStatus, Protocol, ProtocolNumber, ProtocolStatus,
    ProtocolType,
};
use crate::dto::CreateGatewayConfigRequest;
use crate::error::RepoError;

/// The main repository port for the federation payment store.
///
/// Mutations that must be atomic (protocol sequence allocation, ledger
/// status changes with history) lean on database transactions; nothing here
/// assumes in-process locking.
#[async_trait::async_trait]
pub trait FederationRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────
    // Gateway configurations
    // ─────────────────────────────────────────────────────────────────────────

    /// Persists a new gateway configuration.
    async fn create_gateway_config(
        &self,
        req: CreateGatewayConfigRequest,
    ) -> Result<GatewayConfig, RepoError>;

    /// Lists configs, optionally restricted to those applicable to an entity type.
    async fn list_gateway_configs(
        &self,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<GatewayConfig>, RepoError>;

    /// The active config serving an entity type: highest priority wins,
    /// creation order breaks ties.
    async fn find_active_gateway(
        &self,
        entity_type: EntityType,
    ) -> Result<Option<GatewayConfig>, RepoError>;

    /// The active config for a provider, for webhook resolution.
    async fn find_active_gateway_by_provider(
        &self,
        provider: PaymentProvider,
    ) -> Result<Option<GatewayConfig>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Payments
    // ─────────────────────────────────────────────────────────────────────────

    async fn create_payment(&self, payment: Payment) -> Result<Payment, RepoError>;

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, RepoError>;

    async fn find_payment_by_external_id(
        &self,
        provider: PaymentProvider,
        external_id: &str,
    ) -> Result<Option<Payment>, RepoError>;

    /// Status-only mutation; also records the raw provider payload when given.
    async fn update_payment_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        raw_payload: Option<serde_json::Value>,
    ) -> Result<Payment, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Protocols (MUST allocate atomically)
    // ─────────────────────────────────────────────────────────────────────────

    /// Atomically allocates the next sequence for (type, year) via
    /// upsert-increment. Never returns the same value twice for a pair.
    async fn next_protocol_sequence(
        &self,
        protocol_type: ProtocolType,
        year: i32,
    ) -> Result<i64, RepoError>;

    async fn create_protocol(&self, protocol: Protocol) -> Result<Protocol, RepoError>;

    async fn get_protocol(&self, number: &ProtocolNumber) -> Result<Option<Protocol>, RepoError>;

    async fn list_protocols_for_entity(
        &self,
        entity_id: Uuid,
    ) -> Result<Vec<Protocol>, RepoError>;

    async fn update_protocol_status(
        &self,
        number: &ProtocolNumber,
        status: ProtocolStatus,
    ) -> Result<Protocol, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger
    // ─────────────────────────────────────────────────────────────────────────

    /// Inserts a ledger entry. A duplicate payment_id is a Conflict.
    async fn create_ledger_entry(&self, entry: LedgerEntry) -> Result<LedgerEntry, RepoError>;

    /// Updates status by unique payment id and appends a history event.
    async fn update_ledger_status_by_payment(
        &self,
        payment_id: PaymentId,
        status: PaymentStatus,
    ) -> Result<LedgerEntry, RepoError>;

    async fn get_ledger_entry_by_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<Option<LedgerEntry>, RepoError>;

    async fn list_ledger_for_entity(
        &self,
        entity_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, RepoError>;

    async fn list_ledger_by_type(
        &self,
        entry_type: ProtocolType,
        filter: LedgerFilter,
    ) -> Result<Vec<LedgerEntry>, RepoError>;

    async fn list_ledger_events(
        &self,
        entry_id: crate::domain::LedgerEntryId,
    ) -> Result<Vec<LedgerEvent>, RepoError>;

    /// Count + sum + per-status histogram over a date range.
    async fn ledger_stats(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<LedgerStats, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Owning entities (confirmed by the webhook flow)
    // ─────────────────────────────────────────────────────────────────────────

    /// Flips an event registration to CONFIRMED. False when the row is missing.
    async fn confirm_registration(&self, registration_id: Uuid) -> Result<bool, RepoError>;

    /// Activates an athlete membership. False when the row is missing.
    async fn activate_membership(&self, membership_id: Uuid) -> Result<bool, RepoError>;

    /// Activates a club affiliation. False when the row is missing.
    async fn activate_affiliation(&self, affiliation_id: Uuid) -> Result<bool, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Notification queue
    // ─────────────────────────────────────────────────────────────────────────

    async fn enqueue_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, RepoError>;

    async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>, RepoError>;

    /// Pending jobs for a worker; locked so concurrent workers never
    /// double-deliver.
    async fn pending_notifications(&self, limit: i64) -> Result<Vec<Notification>, RepoError>;

    async fn record_notification_attempt(
        &self,
        notification_id: Uuid,
        channel: NotificationChannel,
        succeeded: bool,
        error: Option<String>,
    ) -> Result<NotificationAttempt, RepoError>;

    async fn mark_notification(
        &self,
        id: Uuid,
        status: NotificationStatus,
    ) -> Result<(), RepoError>;

    async fn list_notification_attempts(
        &self,
        notification_id: Uuid,
    ) -> Result<Vec<NotificationAttempt>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // API keys
    // ─────────────────────────────────────────────────────────────────────────

    async fn verify_api_key_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, RepoError>;

    async fn create_api_key(&self, name: &str) -> Result<(ApiKey, String), RepoError>;

    async fn count_api_keys(&self) -> Result<i64, RepoError>;

    async fn list_api_keys(&self) -> Result<Vec<ApiKey>, RepoError>;

    async fn delete_api_key(&self, id: ApiKeyId) -> Result<bool, RepoError>;
}
