//! Webhook processing: signature validation, payload normalization and the
//! payment status state machine with its downstream side effects.
//!
//! Replays are idempotent: terminal payment states are sticky and a repeated
//! delivery of the same status is acknowledged without touching anything.

use fedpay_types::{
    AppError, EntityLink, FederationRepository, Payment, PaymentStatus, ProtocolStatus,
};

use super::FederationService;

/// What a webhook delivery did.
#[derive(Debug, Clone)]
pub struct WebhookOutcome {
    pub payment: Payment,
    /// True when the delivery changed nothing (redelivery or stale status).
    pub replay: bool,
}

impl<R: FederationRepository> FederationService<R> {
    /// Processes a provider callback.
    ///
    /// Order matters: nothing is written before the signature checks out,
    /// and the payment status is committed before side effects run, so a
    /// downstream failure surfaces as 500 while the provider's redelivery
    /// remains safe.
    pub async fn process_webhook(
        &self,
        provider: &str,
        signature: Option<&str>,
        timestamp: Option<&str>,
        payload: &[u8],
    ) -> Result<WebhookOutcome, AppError> {
        let provider = provider
            .parse::<fedpay_types::PaymentProvider>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let config = self
            .repo
            .find_active_gateway_by_provider(provider)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No active gateway for {provider}")))?;
        let gateway = fedpay_gateways::gateway_for_config(&config)?;

        let signature =
            signature.ok_or_else(|| AppError::Unauthorized("Missing webhook signature".into()))?;
        if !gateway.validate_webhook(payload, signature, timestamp) {
            return Err(AppError::Unauthorized("Invalid webhook signature".into()));
        }

        let notification = gateway.parse_webhook(payload).await?;

        let payment = self
            .repo
            .find_payment_by_external_id(provider, &notification.external_id)
            .await?
            .ok_or_else(|| {
                // The provider redelivers, so a webhook racing ahead of the
                // checkout record resolves itself on the next attempt.
                AppError::NotFound(format!(
                    "No payment recorded for provider id {}",
                    notification.external_id
                ))
            })?;

        if !payment.status.can_transition_to(notification.status) {
            tracing::info!(
                payment_id = %payment.id,
                current = %payment.status,
                incoming = %notification.status,
                "Webhook replay ignored"
            );
            return Ok(WebhookOutcome {
                payment,
                replay: true,
            });
        }

        let updated = self
            .apply_payment_status(&payment, notification.status, Some(notification.raw))
            .await?;

        Ok(WebhookOutcome {
            payment: updated,
            replay: false,
        })
    }

    /// Commits a status transition and runs the downstream effects.
    ///
    /// The payment row is written first; ledger, entity confirmation and the
    /// outbound notification follow. Effect failures bubble up after the
    /// payment state is already durable.
    pub(super) async fn apply_payment_status(
        &self,
        payment: &Payment,
        status: PaymentStatus,
        raw_payload: Option<serde_json::Value>,
    ) -> Result<Payment, AppError> {
        if !payment.status.can_transition_to(status) {
            return Ok(payment.clone());
        }

        let updated = self
            .repo
            .update_payment_status(payment.id, status, raw_payload)
            .await?;
        self.update_ledger_status(payment.id, status).await?;

        if status == PaymentStatus::Confirmed {
            self.confirm_entity(&updated).await?;
            self.settle_protocols(&updated).await?;
            self.enqueue_confirmation(&updated).await;
        }

        Ok(updated)
    }

    async fn confirm_entity(&self, payment: &Payment) -> Result<(), AppError> {
        let flipped = match payment.entity {
            EntityLink::EventRegistration(id) => self.repo.confirm_registration(id).await?,
            EntityLink::AthleteMembership(id) => self.repo.activate_membership(id).await?,
            EntityLink::ClubAffiliation(id) => self.repo.activate_affiliation(id).await?,
        };

        if !flipped {
            return Err(AppError::Internal(format!(
                "Owning entity {} missing for payment {}",
                payment.entity.entity_id(),
                payment.id
            )));
        }

        tracing::info!(
            payment_id = %payment.id,
            entity_id = %payment.entity.entity_id(),
            entity_type = %payment.entity.entity_type(),
            "Entity confirmed"
        );
        Ok(())
    }

    async fn settle_protocols(&self, payment: &Payment) -> Result<(), AppError> {
        let entry = self.repo.get_ledger_entry_by_payment(payment.id).await?;
        if let Some(number) = entry.and_then(|e| e.protocol) {
            self.repo
                .update_protocol_status(&number, ProtocolStatus::Settled)
                .await?;
        }
        Ok(())
    }
}
