//! PostgreSQL repository adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use fedpay_types::{
    ApiKey, ApiKeyId, CreateGatewayConfigRequest, EntityType, FederationRepository, GatewayConfig,
    LedgerEntry, LedgerEntryId, LedgerEvent, LedgerFilter, LedgerStats, Notification,
    NotificationAttempt, NotificationChannel, NotificationStatus, Payment, PaymentId,
    PaymentProvider, PaymentStatus, Protocol, ProtocolNumber, ProtocolStatus, ProtocolType,
    RepoError,
};

use crate::types::{
    DbApiKey, DbGatewayConfig, DbLedgerEntry, DbLedgerEvent, DbNotification,
    DbNotificationAttempt, DbPayment, DbProtocol, entity_columns,
};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository backing the federation payment store.
///
/// Cheap to clone: clones share the underlying connection pool.
#[derive(Clone)]
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_gateway_configs_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_payments_pg.sql"),
        "0002",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0003_create_protocols_pg.sql"),
        "0003",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0004_create_ledger_pg.sql"),
        "0004",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0005_create_notifications_pg.sql"),
        "0005",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0006_create_api_keys_pg.sql"),
        "0006",
    )
    .await?;

    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }
}

const PAYMENT_COLUMNS: &str = "id, provider, external_id, amount, currency, method, status, \
     entity_type, registration_id, athlete_id, club_id, payer_email, payer_phone, payment_url, \
     qr_code, raw_payload, created_at, updated_at";

const LEDGER_COLUMNS: &str = "id, entry_type, entity_id, entity_type, amount, currency, status, \
     payment_id, protocol, metadata, created_at, updated_at";

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl FederationRepository for PostgresRepo {
    async fn create_gateway_config(
        &self,
        req: CreateGatewayConfigRequest,
    ) -> Result<GatewayConfig, RepoError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let methods = serde_json::to_value(
            req.methods.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
        )
        .map_err(|e| RepoError::Database(e.to_string()))?;
        let entity_types = serde_json::to_value(
            req.entity_types
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>(),
        )
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let row: DbGatewayConfig = sqlx::query_as(
            r#"INSERT INTO gateway_configs
               (id, provider, label, active, priority, methods, entity_types, sandbox, credentials, callback_url, created_at)
               VALUES ($1, $2, $3, TRUE, $4, $5, $6, $7, $8, $9, $10)
               RETURNING id, provider, label, active, priority, methods, entity_types, sandbox, credentials, callback_url, created_at"#,
        )
        .bind(id)
        .bind(req.provider.as_str())
        .bind(&req.label)
        .bind(req.priority)
        .bind(&methods)
        .bind(&entity_types)
        .bind(req.sandbox)
        .bind(&req.credentials)
        .bind(&req.callback_url)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.into_domain()
    }

    async fn list_gateway_configs(
        &self,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<GatewayConfig>, RepoError> {
        let rows: Vec<DbGatewayConfig> = match entity_type {
            Some(entity_type) => sqlx::query_as(
                r#"SELECT id, provider, label, active, priority, methods, entity_types, sandbox, credentials, callback_url, created_at
                   FROM gateway_configs
                   WHERE entity_types @> jsonb_build_array($1::text)
                   ORDER BY priority DESC, created_at ASC"#,
            )
            .bind(entity_type.as_str())
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query_as(
                r#"SELECT id, provider, label, active, priority, methods, entity_types, sandbox, credentials, callback_url, created_at
                   FROM gateway_configs
                   ORDER BY priority DESC, created_at ASC"#,
            )
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbGatewayConfig::into_domain).collect()
    }

    async fn find_active_gateway(
        &self,
        entity_type: EntityType,
    ) -> Result<Option<GatewayConfig>, RepoError> {
        let row: Option<DbGatewayConfig> = sqlx::query_as(
            r#"SELECT id, provider, label, active, priority, methods, entity_types, sandbox, credentials, callback_url, created_at
               FROM gateway_configs
               WHERE active AND entity_types @> jsonb_build_array($1::text)
               ORDER BY priority DESC, created_at ASC
               LIMIT 1"#,
        )
        .bind(entity_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbGatewayConfig::into_domain).transpose()
    }

    async fn find_active_gateway_by_provider(
        &self,
        provider: PaymentProvider,
    ) -> Result<Option<GatewayConfig>, RepoError> {
        let row: Option<DbGatewayConfig> = sqlx::query_as(
            r#"SELECT id, provider, label, active, priority, methods, entity_types, sandbox, credentials, callback_url, created_at
               FROM gateway_configs
               WHERE active AND provider = $1
               ORDER BY priority DESC, created_at ASC
               LIMIT 1"#,
        )
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbGatewayConfig::into_domain).transpose()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payments
    // ─────────────────────────────────────────────────────────────────────────

    async fn create_payment(&self, payment: Payment) -> Result<Payment, RepoError> {
        let (registration_id, athlete_id, club_id) = entity_columns(&payment.entity);

        sqlx::query(
            r#"INSERT INTO payments
               (id, provider, external_id, amount, currency, method, status, entity_type,
                registration_id, athlete_id, club_id, payer_email, payer_phone, payment_url,
                qr_code, raw_payload, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"#,
        )
        .bind(payment.id.into_uuid())
        .bind(payment.provider.as_str())
        .bind(&payment.external_id)
        .bind(payment.amount.amount())
        .bind(payment.amount.currency().to_string())
        .bind(payment.method.as_str())
        .bind(payment.status.to_string())
        .bind(payment.entity.entity_type().as_str())
        .bind(registration_id)
        .bind(athlete_id)
        .bind(club_id)
        .bind(&payment.payer_email)
        .bind(&payment.payer_phone)
        .bind(&payment.payment_url)
        .bind(&payment.qr_code)
        .bind(&payment.raw_payload)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                RepoError::Conflict("payment already recorded for this provider id".into())
            }
            _ => RepoError::Database(e.to_string()),
        })?;

        Ok(payment)
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, RepoError> {
        let row: Option<DbPayment> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbPayment::into_domain).transpose()
    }

    async fn find_payment_by_external_id(
        &self,
        provider: PaymentProvider,
        external_id: &str,
    ) -> Result<Option<Payment>, RepoError> {
        let row: Option<DbPayment> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE provider = $1 AND external_id = $2"
        ))
        .bind(provider.as_str())
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbPayment::into_domain).transpose()
    }

    async fn update_payment_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        raw_payload: Option<serde_json::Value>,
    ) -> Result<Payment, RepoError> {
        let row: Option<DbPayment> = sqlx::query_as(&format!(
            "UPDATE payments
             SET status = $1, raw_payload = COALESCE($2, raw_payload), updated_at = $3
             WHERE id = $4
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(status.to_string())
        .bind(&raw_payload)
        .bind(Utc::now())
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.ok_or(RepoError::NotFound)?.into_domain()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Protocols
    // ─────────────────────────────────────────────────────────────────────────

    async fn next_protocol_sequence(
        &self,
        protocol_type: ProtocolType,
        year: i32,
    ) -> Result<i64, RepoError> {
        // Atomic upsert-increment; concurrent callers serialize on the row
        // and each sees a distinct value.
        let row: (i64,) = sqlx::query_as(
            r#"INSERT INTO protocol_sequences (protocol_type, year, last_value)
               VALUES ($1, $2, 1)
               ON CONFLICT (protocol_type, year)
               DO UPDATE SET last_value = protocol_sequences.last_value + 1
               RETURNING last_value"#,
        )
        .bind(protocol_type.as_str())
        .bind(year)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.0)
    }

    async fn create_protocol(&self, protocol: Protocol) -> Result<Protocol, RepoError> {
        sqlx::query(
            r#"INSERT INTO protocols
               (number, protocol_type, year, sequence, status, entity_id, payment_id, metadata, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(protocol.number.as_str())
        .bind(protocol.protocol_type.as_str())
        .bind(protocol.year)
        .bind(protocol.sequence)
        .bind(protocol.status.to_string())
        .bind(protocol.entity_id)
        .bind(protocol.payment_id.map(PaymentId::into_uuid))
        .bind(&protocol.metadata)
        .bind(protocol.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                RepoError::Conflict(format!("protocol {} already exists", protocol.number))
            }
            _ => RepoError::Database(e.to_string()),
        })?;

        Ok(protocol)
    }

    async fn get_protocol(&self, number: &ProtocolNumber) -> Result<Option<Protocol>, RepoError> {
        let row: Option<DbProtocol> = sqlx::query_as(
            r#"SELECT number, protocol_type, year, sequence, status, entity_id, payment_id, metadata, created_at
               FROM protocols WHERE number = $1"#,
        )
        .bind(number.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbProtocol::into_domain).transpose()
    }

    async fn list_protocols_for_entity(
        &self,
        entity_id: Uuid,
    ) -> Result<Vec<Protocol>, RepoError> {
        let rows: Vec<DbProtocol> = sqlx::query_as(
            r#"SELECT number, protocol_type, year, sequence, status, entity_id, payment_id, metadata, created_at
               FROM protocols WHERE entity_id = $1
               ORDER BY created_at DESC"#,
        )
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbProtocol::into_domain).collect()
    }

    async fn update_protocol_status(
        &self,
        number: &ProtocolNumber,
        status: ProtocolStatus,
    ) -> Result<Protocol, RepoError> {
        let row: Option<DbProtocol> = sqlx::query_as(
            r#"UPDATE protocols SET status = $1 WHERE number = $2
               RETURNING number, protocol_type, year, sequence, status, entity_id, payment_id, metadata, created_at"#,
        )
        .bind(status.to_string())
        .bind(number.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.ok_or(RepoError::NotFound)?.into_domain()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger
    // ─────────────────────────────────────────────────────────────────────────

    async fn create_ledger_entry(&self, entry: LedgerEntry) -> Result<LedgerEntry, RepoError> {
        sqlx::query(
            r#"INSERT INTO ledger_entries
               (id, entry_type, entity_id, entity_type, amount, currency, status, payment_id,
                protocol, metadata, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
        )
        .bind(entry.id.into_uuid())
        .bind(entry.entry_type.as_str())
        .bind(entry.entity_id)
        .bind(entry.entity_type.as_str())
        .bind(entry.amount.amount())
        .bind(entry.amount.currency().to_string())
        .bind(entry.status.to_string())
        .bind(entry.payment_id.into_uuid())
        .bind(entry.protocol.as_ref().map(|p| p.as_str().to_string()))
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => RepoError::Conflict(format!(
                "ledger entry already exists for payment {}",
                entry.payment_id
            )),
            _ => RepoError::Database(e.to_string()),
        })?;

        Ok(entry)
    }

    async fn update_ledger_status_by_payment(
        &self,
        payment_id: PaymentId,
        status: PaymentStatus,
    ) -> Result<LedgerEntry, RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        // Lock the entry so the history event matches the state we read.
        let row: Option<DbLedgerEntry> = sqlx::query_as(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries WHERE payment_id = $1 FOR UPDATE"
        ))
        .bind(payment_id.into_uuid())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let previous = row.ok_or(RepoError::NotFound)?.into_domain()?;
        let now = Utc::now();

        sqlx::query(
            r#"UPDATE ledger_entries SET status = $1, updated_at = $2 WHERE payment_id = $3"#,
        )
        .bind(status.to_string())
        .bind(now)
        .bind(payment_id.into_uuid())
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO ledger_events (id, entry_id, from_status, to_status, occurred_at)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(Uuid::new_v4())
        .bind(previous.id.into_uuid())
        .bind(previous.status.to_string())
        .bind(status.to_string())
        .bind(now)
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(LedgerEntry {
            status,
            updated_at: now,
            ..previous
        })
    }

    async fn get_ledger_entry_by_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<Option<LedgerEntry>, RepoError> {
        let row: Option<DbLedgerEntry> = sqlx::query_as(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries WHERE payment_id = $1"
        ))
        .bind(payment_id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbLedgerEntry::into_domain).transpose()
    }

    async fn list_ledger_for_entity(
        &self,
        entity_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, RepoError> {
        let rows: Vec<DbLedgerEntry> = sqlx::query_as(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries WHERE entity_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbLedgerEntry::into_domain).collect()
    }

    async fn list_ledger_by_type(
        &self,
        entry_type: ProtocolType,
        filter: LedgerFilter,
    ) -> Result<Vec<LedgerEntry>, RepoError> {
        let filter = filter.normalized();
        let rows: Vec<DbLedgerEntry> = sqlx::query_as(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries
             WHERE entry_type = $1
               AND ($2::text IS NULL OR status = $2)
               AND ($3::timestamptz IS NULL OR created_at >= $3)
               AND ($4::timestamptz IS NULL OR created_at <= $4)
             ORDER BY created_at DESC
             LIMIT $5 OFFSET $6"
        ))
        .bind(entry_type.as_str())
        .bind(filter.status.map(|s| s.to_string()))
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.per_page as i64)
        .bind(filter.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbLedgerEntry::into_domain).collect()
    }

    async fn list_ledger_events(
        &self,
        entry_id: LedgerEntryId,
    ) -> Result<Vec<LedgerEvent>, RepoError> {
        let rows: Vec<DbLedgerEvent> = sqlx::query_as(
            r#"SELECT id, entry_id, from_status, to_status, occurred_at
               FROM ledger_events WHERE entry_id = $1
               ORDER BY occurred_at ASC"#,
        )
        .bind(entry_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbLedgerEvent::into_domain).collect()
    }

    async fn ledger_stats(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<LedgerStats, RepoError> {
        let row: (i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"SELECT COUNT(*),
                      COALESCE(SUM(amount), 0),
                      COUNT(*) FILTER (WHERE status = 'PENDING'),
                      COUNT(*) FILTER (WHERE status = 'CONFIRMED'),
                      COUNT(*) FILTER (WHERE status = 'FAILED'),
                      COUNT(*) FILTER (WHERE status = 'EXPIRED')
               FROM ledger_entries
               WHERE ($1::timestamptz IS NULL OR created_at >= $1)
                 AND ($2::timestamptz IS NULL OR created_at <= $2)"#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(LedgerStats {
            count: row.0,
            total_amount: row.1,
            pending: row.2,
            confirmed: row.3,
            failed: row.4,
            expired: row.5,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Owning entities
    // ─────────────────────────────────────────────────────────────────────────

    async fn confirm_registration(&self, registration_id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"UPDATE event_registrations SET status = 'CONFIRMED', updated_at = $1 WHERE id = $2"#,
        )
        .bind(Utc::now())
        .bind(registration_id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn activate_membership(&self, membership_id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"UPDATE athlete_memberships SET status = 'ACTIVE', updated_at = $1 WHERE id = $2"#,
        )
        .bind(Utc::now())
        .bind(membership_id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn activate_affiliation(&self, affiliation_id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"UPDATE club_affiliations SET status = 'ACTIVE', updated_at = $1 WHERE id = $2"#,
        )
        .bind(Utc::now())
        .bind(affiliation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notification queue
    // ─────────────────────────────────────────────────────────────────────────

    async fn enqueue_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, RepoError> {
        sqlx::query(
            r#"INSERT INTO notifications (id, channel, recipient, subject, body, status, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(notification.id)
        .bind(notification.channel.as_str())
        .bind(&notification.recipient)
        .bind(&notification.subject)
        .bind(&notification.body)
        .bind(notification.status.to_string())
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(notification)
    }

    async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>, RepoError> {
        let row: Option<DbNotification> = sqlx::query_as(
            r#"SELECT id, channel, recipient, subject, body, status, created_at
               FROM notifications WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbNotification::into_domain).transpose()
    }

    async fn pending_notifications(&self, limit: i64) -> Result<Vec<Notification>, RepoError> {
        // SKIP LOCKED so several workers can drain the queue concurrently.
        let rows: Vec<DbNotification> = sqlx::query_as(
            r#"SELECT id, channel, recipient, subject, body, status, created_at
               FROM notifications
               WHERE status = 'PENDING'
               ORDER BY created_at ASC
               LIMIT $1
               FOR UPDATE SKIP LOCKED"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbNotification::into_domain).collect()
    }

    async fn record_notification_attempt(
        &self,
        notification_id: Uuid,
        channel: NotificationChannel,
        succeeded: bool,
        error: Option<String>,
    ) -> Result<NotificationAttempt, RepoError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"INSERT INTO notification_attempts (id, notification_id, channel, succeeded, error, attempted_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(id)
        .bind(notification_id)
        .bind(channel.as_str())
        .bind(succeeded)
        .bind(&error)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(NotificationAttempt {
            id,
            notification_id,
            channel,
            succeeded,
            error,
            attempted_at: now,
        })
    }

    async fn mark_notification(
        &self,
        id: Uuid,
        status: NotificationStatus,
    ) -> Result<(), RepoError> {
        sqlx::query(r#"UPDATE notifications SET status = $1 WHERE id = $2"#)
            .bind(status.to_string())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn list_notification_attempts(
        &self,
        notification_id: Uuid,
    ) -> Result<Vec<NotificationAttempt>, RepoError> {
        let rows: Vec<DbNotificationAttempt> = sqlx::query_as(
            r#"SELECT id, notification_id, channel, succeeded, error, attempted_at
               FROM notification_attempts WHERE notification_id = $1
               ORDER BY attempted_at ASC"#,
        )
        .bind(notification_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter()
            .map(DbNotificationAttempt::into_domain)
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API keys
    // ─────────────────────────────────────────────────────────────────────────

    async fn verify_api_key_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, RepoError> {
        let row: Option<DbApiKey> = sqlx::query_as(
            r#"SELECT id, name, key_hash, is_active, created_at, last_used_at
               FROM api_keys
               WHERE key_hash = $1 AND is_active = TRUE"#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.map(DbApiKey::into_domain))
    }

    async fn create_api_key(&self, name: &str) -> Result<(ApiKey, String), RepoError> {
        use rand::Rng;
        use rand::distr::Alphanumeric;

        // Generate a secure random API key
        let raw_key: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let prefixed_key = format!("sk_{}", raw_key);

        let key_hash = crate::security::hash_api_key(&prefixed_key);
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"INSERT INTO api_keys (id, name, key_hash, is_active, created_at)
               VALUES ($1, $2, $3, TRUE, $4)"#,
        )
        .bind(id)
        .bind(name)
        .bind(&key_hash)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let api_key = ApiKey {
            id: ApiKeyId::from_uuid(id),
            name: name.to_string(),
            key_hash,
            is_active: true,
            created_at: now,
            last_used_at: None,
        };

        Ok((api_key, prefixed_key))
    }

    async fn count_api_keys(&self) -> Result<i64, RepoError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM api_keys WHERE is_active = TRUE")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.0)
    }

    async fn list_api_keys(&self) -> Result<Vec<ApiKey>, RepoError> {
        let rows: Vec<DbApiKey> = sqlx::query_as(
            r#"SELECT id, name, key_hash, is_active, created_at, last_used_at
               FROM api_keys WHERE is_active = TRUE
               ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(DbApiKey::into_domain).collect())
    }

    async fn delete_api_key(&self, id: ApiKeyId) -> Result<bool, RepoError> {
        let result = sqlx::query(r#"UPDATE api_keys SET is_active = FALSE WHERE id = $1"#)
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
