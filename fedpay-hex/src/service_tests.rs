//! FederationService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, Datelike, Utc};
    use serde_json::json;
    use uuid::Uuid;

    use fedpay_types::{
        ApiKey, ApiKeyId, AppError, CardPaymentRequest, CheckoutRequest,
        CreateGatewayConfigRequest, Currency, EntityType, FederationRepository, GatewayConfig,
        GatewayConfigId, LedgerEntry, LedgerEntryId, LedgerEvent, LedgerFilter, LedgerStats,
        Notification, NotificationAttempt, NotificationChannel, NotificationStatus, Payment,
        PaymentId, PaymentMethod, PaymentProvider, PaymentStatus, Protocol, ProtocolNumber,
        ProtocolStatus, ProtocolType, RepoError,
    };

    use crate::{FederationService, GenerateProtocolInput};

    /// In-memory repository for testing the service layer.
    #[derive(Default)]
    pub struct MockRepo {
        configs: Mutex<Vec<GatewayConfig>>,
        payments: Mutex<HashMap<PaymentId, Payment>>,
        sequences: Mutex<HashMap<(ProtocolType, i32), i64>>,
        protocols: Mutex<HashMap<String, Protocol>>,
        ledger: Mutex<HashMap<PaymentId, LedgerEntry>>,
        events: Mutex<Vec<LedgerEvent>>,
        registrations: Mutex<HashSet<Uuid>>,
        memberships: Mutex<HashSet<Uuid>>,
        affiliations: Mutex<HashSet<Uuid>>,
        /// Times each entity was confirmed/activated, for idempotency checks.
        pub confirmations: Mutex<HashMap<Uuid, u32>>,
        notifications: Mutex<Vec<Notification>>,
        attempts: Mutex<Vec<NotificationAttempt>>,
    }

    impl MockRepo {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed_registration(&self, id: Uuid) {
            self.registrations.lock().unwrap().insert(id);
        }

        pub fn seed_membership(&self, id: Uuid) {
            self.memberships.lock().unwrap().insert(id);
        }

        pub fn notification_count(&self) -> usize {
            self.notifications.lock().unwrap().len()
        }

        pub fn confirmation_count(&self, entity_id: Uuid) -> u32 {
            self.confirmations
                .lock()
                .unwrap()
                .get(&entity_id)
                .copied()
                .unwrap_or(0)
        }
    }

    #[async_trait]
    impl FederationRepository for MockRepo {
        async fn create_gateway_config(
            &self,
            req: CreateGatewayConfigRequest,
        ) -> Result<GatewayConfig, RepoError> {
            let config = GatewayConfig {
                id: GatewayConfigId::new(),
                provider: req.provider,
                label: req.label,
                active: true,
                priority: req.priority,
                methods: req.methods,
                entity_types: req.entity_types,
                sandbox: req.sandbox,
                credentials: req.credentials,
                callback_url: req.callback_url,
                created_at: Utc::now(),
            };
            self.configs.lock().unwrap().push(config.clone());
            Ok(config)
        }

        async fn list_gateway_configs(
            &self,
            entity_type: Option<EntityType>,
        ) -> Result<Vec<GatewayConfig>, RepoError> {
            let mut configs: Vec<_> = self
                .configs
                .lock()
                .unwrap()
                .iter()
                .filter(|c| entity_type.is_none_or(|t| c.entity_types.contains(&t)))
                .cloned()
                .collect();
            configs.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then(a.created_at.cmp(&b.created_at))
            });
            Ok(configs)
        }

        async fn find_active_gateway(
            &self,
            entity_type: EntityType,
        ) -> Result<Option<GatewayConfig>, RepoError> {
            let mut candidates: Vec<_> = self
                .configs
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.applies_to(entity_type))
                .cloned()
                .collect();
            candidates.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then(a.created_at.cmp(&b.created_at))
            });
            Ok(candidates.into_iter().next())
        }

        async fn find_active_gateway_by_provider(
            &self,
            provider: PaymentProvider,
        ) -> Result<Option<GatewayConfig>, RepoError> {
            Ok(self
                .configs
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.active && c.provider == provider)
                .cloned())
        }

        async fn create_payment(&self, payment: Payment) -> Result<Payment, RepoError> {
            self.payments
                .lock()
                .unwrap()
                .insert(payment.id, payment.clone());
            Ok(payment)
        }

        async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, RepoError> {
            Ok(self.payments.lock().unwrap().get(&id).cloned())
        }

        async fn find_payment_by_external_id(
            &self,
            provider: PaymentProvider,
            external_id: &str,
        ) -> Result<Option<Payment>, RepoError> {
            Ok(self
                .payments
                .lock()
                .unwrap()
                .values()
                .find(|p| p.provider == provider && p.external_id.as_deref() == Some(external_id))
                .cloned())
        }

        async fn update_payment_status(
            &self,
            id: PaymentId,
            status: PaymentStatus,
            raw_payload: Option<serde_json::Value>,
        ) -> Result<Payment, RepoError> {
            let mut payments = self.payments.lock().unwrap();
            let payment = payments.get_mut(&id).ok_or(RepoError::NotFound)?;
            payment.status = status;
            if raw_payload.is_some() {
                payment.raw_payload = raw_payload;
            }
            payment.updated_at = Utc::now();
            Ok(payment.clone())
        }

        async fn next_protocol_sequence(
            &self,
            protocol_type: ProtocolType,
            year: i32,
        ) -> Result<i64, RepoError> {
            let mut sequences = self.sequences.lock().unwrap();
            let counter = sequences.entry((protocol_type, year)).or_insert(0);
            *counter += 1;
            Ok(*counter)
        }

        async fn create_protocol(&self, protocol: Protocol) -> Result<Protocol, RepoError> {
            let mut protocols = self.protocols.lock().unwrap();
            if protocols.contains_key(protocol.number.as_str()) {
                return Err(RepoError::Conflict(format!(
                    "protocol {} already exists",
                    protocol.number
                )));
            }
            protocols.insert(protocol.number.as_str().to_string(), protocol.clone());
            Ok(protocol)
        }

        async fn get_protocol(
            &self,
            number: &ProtocolNumber,
        ) -> Result<Option<Protocol>, RepoError> {
            Ok(self.protocols.lock().unwrap().get(number.as_str()).cloned())
        }

        async fn list_protocols_for_entity(
            &self,
            entity_id: Uuid,
        ) -> Result<Vec<Protocol>, RepoError> {
            Ok(self
                .protocols
                .lock()
                .unwrap()
                .values()
                .filter(|p| p.entity_id == entity_id)
                .cloned()
                .collect())
        }

        async fn update_protocol_status(
            &self,
            number: &ProtocolNumber,
            status: ProtocolStatus,
        ) -> Result<Protocol, RepoError> {
            let mut protocols = self.protocols.lock().unwrap();
            let protocol = protocols
                .get_mut(number.as_str())
                .ok_or(RepoError::NotFound)?;
            protocol.status = status;
            Ok(protocol.clone())
        }

        async fn create_ledger_entry(
            &self,
            entry: LedgerEntry,
        ) -> Result<LedgerEntry, RepoError> {
            let mut ledger = self.ledger.lock().unwrap();
            if ledger.contains_key(&entry.payment_id) {
                return Err(RepoError::Conflict(format!(
                    "ledger entry already exists for payment {}",
                    entry.payment_id
                )));
            }
            ledger.insert(entry.payment_id, entry.clone());
            Ok(entry)
        }

        async fn update_ledger_status_by_payment(
            &self,
            payment_id: PaymentId,
            status: PaymentStatus,
        ) -> Result<LedgerEntry, RepoError> {
            let mut ledger = self.ledger.lock().unwrap();
            let entry = ledger.get_mut(&payment_id).ok_or(RepoError::NotFound)?;
            self.events.lock().unwrap().push(LedgerEvent {
                id: Uuid::new_v4(),
                entry_id: entry.id,
                from_status: entry.status,
                to_status: status,
                occurred_at: Utc::now(),
            });
            entry.status = status;
            entry.updated_at = Utc::now();
            Ok(entry.clone())
        }

        async fn get_ledger_entry_by_payment(
            &self,
            payment_id: PaymentId,
        ) -> Result<Option<LedgerEntry>, RepoError> {
            Ok(self.ledger.lock().unwrap().get(&payment_id).cloned())
        }

        async fn list_ledger_for_entity(
            &self,
            entity_id: Uuid,
        ) -> Result<Vec<LedgerEntry>, RepoError> {
            Ok(self
                .ledger
                .lock()
                .unwrap()
                .values()
                .filter(|e| e.entity_id == entity_id)
                .cloned()
                .collect())
        }

        async fn list_ledger_by_type(
            &self,
            entry_type: ProtocolType,
            filter: LedgerFilter,
        ) -> Result<Vec<LedgerEntry>, RepoError> {
            let filter = filter.normalized();
            let mut entries: Vec<_> = self
                .ledger
                .lock()
                .unwrap()
                .values()
                .filter(|e| e.entry_type == entry_type)
                .filter(|e| filter.status.is_none_or(|s| e.status == s))
                .filter(|e| filter.from.is_none_or(|f| e.created_at >= f))
                .filter(|e| filter.to.is_none_or(|t| e.created_at <= t))
                .cloned()
                .collect();
            entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(entries
                .into_iter()
                .skip(filter.offset() as usize)
                .take(filter.per_page as usize)
                .collect())
        }

        async fn list_ledger_events(
            &self,
            entry_id: LedgerEntryId,
        ) -> Result<Vec<LedgerEvent>, RepoError> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.entry_id == entry_id)
                .cloned()
                .collect())
        }

        async fn ledger_stats(
            &self,
            from: Option<DateTime<Utc>>,
            to: Option<DateTime<Utc>>,
        ) -> Result<LedgerStats, RepoError> {
            let ledger = self.ledger.lock().unwrap();
            let entries: Vec<_> = ledger
                .values()
                .filter(|e| from.is_none_or(|f| e.created_at >= f))
                .filter(|e| to.is_none_or(|t| e.created_at <= t))
                .collect();

            let by_status = |status: PaymentStatus| {
                entries.iter().filter(|e| e.status == status).count() as i64
            };
            Ok(LedgerStats {
                count: entries.len() as i64,
                total_amount: entries.iter().map(|e| e.amount.amount()).sum(),
                pending: by_status(PaymentStatus::Pending),
                confirmed: by_status(PaymentStatus::Confirmed),
                failed: by_status(PaymentStatus::Failed),
                expired: by_status(PaymentStatus::Expired),
            })
        }

        async fn confirm_registration(&self, registration_id: Uuid) -> Result<bool, RepoError> {
            if !self.registrations.lock().unwrap().contains(&registration_id) {
                return Ok(false);
            }
            *self
                .confirmations
                .lock()
                .unwrap()
                .entry(registration_id)
                .or_insert(0) += 1;
            Ok(true)
        }

        async fn activate_membership(&self, membership_id: Uuid) -> Result<bool, RepoError> {
            if !self.memberships.lock().unwrap().contains(&membership_id) {
                return Ok(false);
            }
            *self
                .confirmations
                .lock()
                .unwrap()
                .entry(membership_id)
                .or_insert(0) += 1;
            Ok(true)
        }

        async fn activate_affiliation(&self, affiliation_id: Uuid) -> Result<bool, RepoError> {
            if !self.affiliations.lock().unwrap().contains(&affiliation_id) {
                return Ok(false);
            }
            *self
                .confirmations
                .lock()
                .unwrap()
                .entry(affiliation_id)
                .or_insert(0) += 1;
            Ok(true)
        }

        async fn enqueue_notification(
            &self,
            notification: Notification,
        ) -> Result<Notification, RepoError> {
            self.notifications.lock().unwrap().push(notification.clone());
            Ok(notification)
        }

        async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>, RepoError> {
            Ok(self
                .notifications
                .lock()
                .unwrap()
                .iter()
                .find(|n| n.id == id)
                .cloned())
        }

        async fn pending_notifications(
            &self,
            limit: i64,
        ) -> Result<Vec<Notification>, RepoError> {
            Ok(self
                .notifications
                .lock()
                .unwrap()
                .iter()
                .filter(|n| n.status == NotificationStatus::Pending)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn record_notification_attempt(
            &self,
            notification_id: Uuid,
            channel: NotificationChannel,
            succeeded: bool,
            error: Option<String>,
        ) -> Result<NotificationAttempt, RepoError> {
            let attempt = NotificationAttempt {
                id: Uuid::new_v4(),
                notification_id,
                channel,
                succeeded,
                error,
                attempted_at: Utc::now(),
            };
            self.attempts.lock().unwrap().push(attempt.clone());
            Ok(attempt)
        }

        async fn mark_notification(
            &self,
            id: Uuid,
            status: NotificationStatus,
        ) -> Result<(), RepoError> {
            let mut notifications = self.notifications.lock().unwrap();
            if let Some(n) = notifications.iter_mut().find(|n| n.id == id) {
                n.status = status;
            }
            Ok(())
        }

        async fn list_notification_attempts(
            &self,
            notification_id: Uuid,
        ) -> Result<Vec<NotificationAttempt>, RepoError> {
            Ok(self
                .attempts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.notification_id == notification_id)
                .cloned()
                .collect())
        }

        async fn verify_api_key_hash(
            &self,
            _key_hash: &str,
        ) -> Result<Option<ApiKey>, RepoError> {
            Ok(None)
        }

        async fn create_api_key(&self, name: &str) -> Result<(ApiKey, String), RepoError> {
            let key = ApiKey::new(name.to_string(), "hash".into());
            Ok((key, "sk_test".into()))
        }

        async fn count_api_keys(&self) -> Result<i64, RepoError> {
            Ok(0)
        }

        async fn list_api_keys(&self) -> Result<Vec<ApiKey>, RepoError> {
            Ok(Vec::new())
        }

        async fn delete_api_key(&self, _id: ApiKeyId) -> Result<bool, RepoError> {
            Ok(false)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    const MOCK_SECRET: &str = "test-webhook-secret";

    async fn service_with_mock_gateway(
        entity_types: Vec<EntityType>,
    ) -> FederationService<MockRepo> {
        let service = FederationService::new(MockRepo::new());
        service
            .repo()
            .create_gateway_config(CreateGatewayConfigRequest {
                provider: PaymentProvider::Mock,
                label: "mock-sandbox".into(),
                priority: 0,
                methods: vec![PaymentMethod::Pix, PaymentMethod::CreditCard],
                entity_types,
                sandbox: true,
                credentials: json!({ "webhook_secret": MOCK_SECRET }),
                callback_url: Some("https://fed.test/api/webhooks/payment?provider=mock".into()),
            })
            .await
            .unwrap();
        service
    }

    fn checkout_request(entity_type: EntityType, entity_id: Uuid) -> CheckoutRequest {
        CheckoutRequest {
            entity_type,
            entity_id,
            amount: 15000,
            currency: Currency::BRL,
            method: PaymentMethod::Pix,
            description: "Inscricao - Campeonato Estadual".into(),
            payer_email: "atleta@clube.com.br".into(),
            payer_phone: Some("+5511999990000".into()),
            metadata: None,
        }
    }

    fn signed_webhook(external_id: &str, status: &str) -> (Vec<u8>, String) {
        let payload = json!({ "id": external_id, "status": status })
            .to_string()
            .into_bytes();
        let signature = fedpay_gateways::signature::sign(&payload, MOCK_SECRET);
        (payload, signature)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Checkout
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_checkout_creates_payment_protocol_and_ledger() {
        let service = service_with_mock_gateway(vec![EntityType::EventRegistration]).await;
        let entity_id = Uuid::new_v4();

        let response = service
            .checkout(checkout_request(EntityType::EventRegistration, entity_id))
            .await
            .unwrap();

        assert_eq!(response.provider, PaymentProvider::Mock);
        assert_eq!(response.status, PaymentStatus::Pending);
        assert!(response.qr_code.is_some());

        let year = Utc::now().year();
        assert_eq!(
            response.protocol.as_str(),
            format!("EVT{year}000001").as_str()
        );

        let payment = service.get_payment(response.payment_id).await.unwrap();
        assert!(payment.external_id.is_some());

        let entry = service
            .get_ledger_entry_by_payment(response.payment_id)
            .await
            .unwrap();
        assert_eq!(entry.status, PaymentStatus::Pending);
        assert_eq!(entry.protocol, Some(response.protocol));
    }

    #[tokio::test]
    async fn test_checkout_rejects_nonpositive_amount() {
        let service = service_with_mock_gateway(vec![EntityType::EventRegistration]).await;
        let mut req = checkout_request(EntityType::EventRegistration, Uuid::new_v4());
        req.amount = 0;

        let result = service.checkout(req).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_checkout_without_gateway_is_not_found() {
        let service = FederationService::new(MockRepo::new());

        let result = service
            .checkout(checkout_request(EntityType::EventRegistration, Uuid::new_v4()))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_checkout_rejects_method_not_allowed() {
        let service = service_with_mock_gateway(vec![EntityType::EventRegistration]).await;
        let mut req = checkout_request(EntityType::EventRegistration, Uuid::new_v4());
        req.method = PaymentMethod::Boleto;

        let result = service.checkout(req).await;
        assert!(matches!(result, Err(AppError::Unprocessable(_))));
    }

    #[tokio::test]
    async fn test_gateway_selection_respects_entity_type() {
        let service = service_with_mock_gateway(vec![EntityType::EventRegistration]).await;
        // Second config serves only club affiliations.
        service
            .repo()
            .create_gateway_config(CreateGatewayConfigRequest {
                provider: PaymentProvider::Mock,
                label: "clubs-only".into(),
                priority: 10,
                methods: vec![PaymentMethod::Pix],
                entity_types: vec![EntityType::ClubAffiliation],
                sandbox: true,
                credentials: json!({}),
                callback_url: None,
            })
            .await
            .unwrap();

        let for_events = service
            .repo()
            .find_active_gateway(EntityType::EventRegistration)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(for_events.label, "mock-sandbox");

        let for_clubs = service
            .repo()
            .find_active_gateway(EntityType::ClubAffiliation)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(for_clubs.label, "clubs-only");

        assert!(
            service
                .repo()
                .find_active_gateway(EntityType::AthleteMembership)
                .await
                .unwrap()
                .is_none()
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Protocols
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_protocols_are_sequential_per_type() {
        let service = FederationService::new(MockRepo::new());
        let year = Utc::now().year();

        for expected in 1..=3i64 {
            let protocol = service
                .generate_protocol(GenerateProtocolInput {
                    protocol_type: ProtocolType::Event,
                    entity_id: Uuid::new_v4(),
                    payment_id: None,
                    metadata: None,
                })
                .await
                .unwrap();
            assert_eq!(protocol.sequence, expected);
            assert_eq!(
                protocol.number.as_str(),
                format!("EVT{year}{expected:06}").as_str()
            );
        }

        // A different type starts its own sequence.
        let membership = service
            .generate_protocol(GenerateProtocolInput {
                protocol_type: ProtocolType::Membership,
                entity_id: Uuid::new_v4(),
                payment_id: None,
                metadata: None,
            })
            .await
            .unwrap();
        assert_eq!(membership.sequence, 1);
        assert!(membership.number.as_str().starts_with("FIL"));
    }

    #[tokio::test]
    async fn test_concurrent_protocols_are_unique() {
        let service = Arc::new(FederationService::new(MockRepo::new()));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .generate_protocol(GenerateProtocolInput {
                        protocol_type: ProtocolType::Event,
                        entity_id: Uuid::new_v4(),
                        payment_id: None,
                        metadata: None,
                    })
                    .await
                    .unwrap()
                    .number
            }));
        }

        let mut numbers = HashSet::new();
        for handle in handles {
            numbers.insert(handle.await.unwrap().as_str().to_string());
        }
        assert_eq!(numbers.len(), 20);
    }

    #[tokio::test]
    async fn test_get_unknown_protocol_is_not_found() {
        let service = FederationService::new(MockRepo::new());
        let number = ProtocolNumber::parse("EVT2025000001").unwrap();

        let result = service.get_protocol(&number).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_duplicate_ledger_payment_id_conflicts() {
        let service = FederationService::new(MockRepo::new());
        let payment_id = PaymentId::new();
        let amount = fedpay_types::Money::new(1000, Currency::BRL).unwrap();

        let entry = LedgerEntry::open(
            ProtocolType::Event,
            Uuid::new_v4(),
            EntityType::EventRegistration,
            amount,
            payment_id,
            None,
            None,
        );
        service.repo().create_ledger_entry(entry).await.unwrap();

        let duplicate = LedgerEntry::open(
            ProtocolType::Event,
            Uuid::new_v4(),
            EntityType::EventRegistration,
            amount,
            payment_id,
            None,
            None,
        );
        let result = service.repo().create_ledger_entry(duplicate).await;
        assert!(matches!(result, Err(RepoError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_ledger_stats_histogram() {
        let service = service_with_mock_gateway(vec![EntityType::EventRegistration]).await;
        let entity_a = Uuid::new_v4();
        let entity_b = Uuid::new_v4();
        service.repo().seed_registration(entity_a);
        service.repo().seed_registration(entity_b);

        let first = service
            .checkout(checkout_request(EntityType::EventRegistration, entity_a))
            .await
            .unwrap();
        service
            .checkout(checkout_request(EntityType::EventRegistration, entity_b))
            .await
            .unwrap();

        // Confirm one of the two.
        let payment = service.get_payment(first.payment_id).await.unwrap();
        let (payload, signature) =
            signed_webhook(payment.external_id.as_deref().unwrap(), "confirmed");
        service
            .process_webhook("mock", Some(&signature), None, &payload)
            .await
            .unwrap();

        let stats = service.ledger_stats(None, None).await.unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_amount, 30000);
        assert_eq!(stats.confirmed, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.failed, 0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Webhooks
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_webhook_confirms_payment_and_entity() {
        let service = service_with_mock_gateway(vec![EntityType::EventRegistration]).await;
        let entity_id = Uuid::new_v4();
        service.repo().seed_registration(entity_id);

        let response = service
            .checkout(checkout_request(EntityType::EventRegistration, entity_id))
            .await
            .unwrap();
        let payment = service.get_payment(response.payment_id).await.unwrap();
        let external_id = payment.external_id.clone().unwrap();

        let (payload, signature) = signed_webhook(&external_id, "confirmed");
        let outcome = service
            .process_webhook("mock", Some(&signature), None, &payload)
            .await
            .unwrap();

        assert!(!outcome.replay);
        assert_eq!(outcome.payment.status, PaymentStatus::Confirmed);
        assert_eq!(service.repo().confirmation_count(entity_id), 1);

        let entry = service
            .get_ledger_entry_by_payment(response.payment_id)
            .await
            .unwrap();
        assert_eq!(entry.status, PaymentStatus::Confirmed);

        let protocol = service.get_protocol(&response.protocol).await.unwrap();
        assert_eq!(protocol.status, ProtocolStatus::Settled);

        // Confirmation notification queued for the payer's WhatsApp.
        assert_eq!(service.repo().notification_count(), 1);
    }

    #[tokio::test]
    async fn test_webhook_invalid_signature_mutates_nothing() {
        let service = service_with_mock_gateway(vec![EntityType::EventRegistration]).await;
        let entity_id = Uuid::new_v4();
        service.repo().seed_registration(entity_id);

        let response = service
            .checkout(checkout_request(EntityType::EventRegistration, entity_id))
            .await
            .unwrap();
        let payment = service.get_payment(response.payment_id).await.unwrap();
        let external_id = payment.external_id.clone().unwrap();

        let (payload, _) = signed_webhook(&external_id, "confirmed");
        let result = service
            .process_webhook("mock", Some("deadbeef"), None, &payload)
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));

        // Nothing moved.
        let payment = service.get_payment(response.payment_id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(service.repo().confirmation_count(entity_id), 0);
    }

    #[tokio::test]
    async fn test_webhook_missing_signature_is_unauthorized() {
        let service = service_with_mock_gateway(vec![EntityType::EventRegistration]).await;
        let result = service.process_webhook("mock", None, None, b"{}").await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_webhook_unknown_provider_is_bad_request() {
        let service = service_with_mock_gateway(vec![EntityType::EventRegistration]).await;
        let result = service.process_webhook("stripe", Some("sig"), None, b"{}").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_webhook_replay_is_idempotent() {
        let service = service_with_mock_gateway(vec![EntityType::AthleteMembership]).await;
        let entity_id = Uuid::new_v4();
        service.repo().seed_membership(entity_id);

        let mut req = checkout_request(EntityType::AthleteMembership, entity_id);
        req.payer_phone = None;
        let response = service.checkout(req).await.unwrap();
        let payment = service.get_payment(response.payment_id).await.unwrap();
        let external_id = payment.external_id.clone().unwrap();

        let (payload, signature) = signed_webhook(&external_id, "confirmed");
        let first = service
            .process_webhook("mock", Some(&signature), None, &payload)
            .await
            .unwrap();
        assert!(!first.replay);

        let second = service
            .process_webhook("mock", Some(&signature), None, &payload)
            .await
            .unwrap();
        assert!(second.replay);
        assert_eq!(second.payment.status, PaymentStatus::Confirmed);

        // Membership activated exactly once, one notification queued.
        assert_eq!(service.repo().confirmation_count(entity_id), 1);
        assert_eq!(service.repo().notification_count(), 1);
    }

    #[tokio::test]
    async fn test_webhook_for_unknown_payment_is_not_found() {
        let service = service_with_mock_gateway(vec![EntityType::EventRegistration]).await;

        let (payload, signature) = signed_webhook("mock-never-seen", "confirmed");
        let result = service
            .process_webhook("mock", Some(&signature), None, &payload)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_webhook_failure_status_skips_side_effects() {
        let service = service_with_mock_gateway(vec![EntityType::EventRegistration]).await;
        let entity_id = Uuid::new_v4();
        service.repo().seed_registration(entity_id);

        let response = service
            .checkout(checkout_request(EntityType::EventRegistration, entity_id))
            .await
            .unwrap();
        let payment = service.get_payment(response.payment_id).await.unwrap();
        let external_id = payment.external_id.clone().unwrap();

        let (payload, signature) = signed_webhook(&external_id, "failed");
        let outcome = service
            .process_webhook("mock", Some(&signature), None, &payload)
            .await
            .unwrap();

        assert_eq!(outcome.payment.status, PaymentStatus::Failed);
        assert_eq!(service.repo().confirmation_count(entity_id), 0);
        assert_eq!(service.repo().notification_count(), 0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Card payments & installments
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_card_payment_confirms() {
        let service = service_with_mock_gateway(vec![EntityType::EventRegistration]).await;
        let entity_id = Uuid::new_v4();
        service.repo().seed_registration(entity_id);

        let mut req = checkout_request(EntityType::EventRegistration, entity_id);
        req.method = PaymentMethod::CreditCard;
        let response = service.checkout(req).await.unwrap();

        let result = service
            .process_card_payment(
                response.payment_id,
                CardPaymentRequest {
                    card_token: "tok_ok".into(),
                    installments: 3,
                    holder_name: "Maria Silva".into(),
                    payer_email: "atleta@clube.com.br".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(result.status, PaymentStatus::Confirmed);
        assert_eq!(service.repo().confirmation_count(entity_id), 1);

        // A settled payment refuses another charge.
        let again = service
            .process_card_payment(
                response.payment_id,
                CardPaymentRequest {
                    card_token: "tok_ok".into(),
                    installments: 1,
                    holder_name: "Maria Silva".into(),
                    payer_email: "atleta@clube.com.br".into(),
                },
            )
            .await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_card_payment_decline() {
        let service = service_with_mock_gateway(vec![EntityType::EventRegistration]).await;
        let entity_id = Uuid::new_v4();
        service.repo().seed_registration(entity_id);

        let mut req = checkout_request(EntityType::EventRegistration, entity_id);
        req.method = PaymentMethod::CreditCard;
        let response = service.checkout(req).await.unwrap();

        let result = service
            .process_card_payment(
                response.payment_id,
                CardPaymentRequest {
                    card_token: "tok_fail_insufficient".into(),
                    installments: 1,
                    holder_name: "Maria Silva".into(),
                    payer_email: "atleta@clube.com.br".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(result.status, PaymentStatus::Failed);
        assert_eq!(result.error_code.as_deref(), Some("card_declined"));
        assert_eq!(service.repo().confirmation_count(entity_id), 0);
    }

    #[tokio::test]
    async fn test_installment_options() {
        let service = service_with_mock_gateway(vec![EntityType::EventRegistration]).await;
        let amount = fedpay_types::Money::new(12000, Currency::BRL).unwrap();

        let options = service
            .installment_options(EntityType::EventRegistration, amount, None, None)
            .await
            .unwrap();

        assert_eq!(options.len(), 12);
        assert_eq!(options[0].installments, 1);
        assert_eq!(options[0].installment_amount, 12000);
        assert_eq!(options[11].installments, 12);
        assert_eq!(options[11].installment_amount, 1000);
    }
}
