//! Checkout orchestration: gateway selection, remote payment creation and
//! local bookkeeping (payment + protocol + ledger).

use fedpay_types::{
    AppError, CardPaymentRequest, CardPaymentResponse, CheckoutRequest, CheckoutResponse,
    CreatePaymentInput, EntityLink, EntityType, FederationRepository, GatewayConfig, LedgerEntry,
    Money, Payment, PaymentId, PaymentMethod, ProtocolType,
    ports::gateway::CardPaymentInput,
};

use super::{FederationService, GenerateProtocolInput};

impl<R: FederationRepository> FederationService<R> {
    /// Opens a checkout: selects the active gateway for the entity type,
    /// creates the remote payment and records payment, protocol and ledger
    /// entry locally.
    pub async fn checkout(&self, req: CheckoutRequest) -> Result<CheckoutResponse, AppError> {
        if req.amount <= 0 {
            return Err(AppError::BadRequest("Amount must be positive".into()));
        }
        if req.description.trim().is_empty() {
            return Err(AppError::BadRequest("Description cannot be empty".into()));
        }
        if !req.payer_email.contains('@') {
            return Err(AppError::BadRequest("Invalid payer email".into()));
        }

        let amount = Money::new(req.amount, req.currency)?;
        let config = self.active_gateway_for(req.entity_type).await?;
        if !config.allows_method(req.method) {
            return Err(AppError::Unprocessable(format!(
                "Gateway {} does not accept {}",
                config.label, req.method
            )));
        }

        let gateway = fedpay_gateways::gateway_for_config(&config)?;
        let entity = EntityLink::from_parts(req.entity_type, req.entity_id);

        let created = gateway
            .create_payment(CreatePaymentInput {
                amount,
                method: req.method,
                description: req.description.clone(),
                payer_email: req.payer_email.clone(),
                entity,
                callback_url: config.callback_url.clone(),
            })
            .await?;

        let mut payment = Payment::pending(
            config.provider,
            amount,
            req.method,
            entity,
            req.payer_email,
            req.payer_phone,
        );
        payment.external_id = Some(created.external_id);
        payment.status = created.status;
        payment.payment_url = created.payment_url;
        payment.qr_code = created.qr_code;
        payment.raw_payload = Some(created.raw);

        let payment = self.repo.create_payment(payment).await?;
        tracing::info!(payment_id = %payment.id, provider = %payment.provider, "Payment created");

        let protocol = self
            .generate_protocol(GenerateProtocolInput {
                protocol_type: ProtocolType::from(req.entity_type),
                entity_id: req.entity_id,
                payment_id: Some(payment.id),
                metadata: req.metadata.clone(),
            })
            .await?;

        let entry = LedgerEntry::open(
            ProtocolType::from(req.entity_type),
            req.entity_id,
            req.entity_type,
            amount,
            payment.id,
            Some(protocol.number.clone()),
            req.metadata,
        );
        self.open_ledger_entry(entry).await?;

        Ok(CheckoutResponse {
            payment_id: payment.id,
            provider: payment.provider,
            status: payment.status,
            protocol: protocol.number,
            payment_url: payment.payment_url,
            qr_code: payment.qr_code,
        })
    }

    /// Gets a payment by id.
    pub async fn get_payment(&self, id: PaymentId) -> Result<Payment, AppError> {
        self.repo
            .get_payment(id)
            .await
            .map_err(Into::into)
            .and_then(|opt| opt.ok_or_else(|| AppError::NotFound(format!("Payment {id}"))))
    }

    /// Settles an existing pending payment with a tokenized card.
    pub async fn process_card_payment(
        &self,
        payment_id: PaymentId,
        req: CardPaymentRequest,
    ) -> Result<CardPaymentResponse, AppError> {
        if req.installments == 0 {
            return Err(AppError::BadRequest("Installments must be at least 1".into()));
        }

        let payment = self.get_payment(payment_id).await?;
        if payment.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Payment {payment_id} already settled as {}",
                payment.status
            )));
        }

        let config = self
            .repo
            .find_active_gateway_by_provider(payment.provider)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No active gateway for {}", payment.provider))
            })?;
        let gateway = fedpay_gateways::gateway_for_config(&config)?;

        let result = gateway
            .process_card_payment(CardPaymentInput {
                card_token: req.card_token,
                amount: payment.amount,
                installments: req.installments,
                holder_name: req.holder_name,
                payer_email: req.payer_email,
            })
            .await?;

        let updated = self
            .apply_payment_status(&payment, result.status, Some(result.raw.clone()))
            .await?;

        Ok(CardPaymentResponse {
            payment_id: updated.id,
            status: updated.status,
            error_code: result.error_code,
            error_message: result.error_message,
        })
    }

    /// Installment plans for a prospective charge against an entity type.
    pub async fn installment_options(
        &self,
        entity_type: EntityType,
        amount: Money,
        method: Option<PaymentMethod>,
        card_bin: Option<&str>,
    ) -> Result<Vec<fedpay_types::InstallmentOption>, AppError> {
        let config = self.active_gateway_for(entity_type).await?;
        let gateway = fedpay_gateways::gateway_for_config(&config)?;

        gateway
            .installment_options(amount, method, card_bin)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn active_gateway_for(
        &self,
        entity_type: EntityType,
    ) -> Result<GatewayConfig, AppError> {
        self.repo
            .find_active_gateway(entity_type)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No active gateway configured for {entity_type}"))
            })
    }
}
