//! Notification queue service.

use uuid::Uuid;

use fedpay_types::{
    AppError, EnqueueNotificationRequest, FederationRepository, Notification,
    NotificationAttempt, NotificationChannel, Payment,
};

use super::FederationService;

impl<R: FederationRepository> FederationService<R> {
    /// Enqueues an outbound notification job.
    pub async fn enqueue_notification(
        &self,
        req: EnqueueNotificationRequest,
    ) -> Result<Notification, AppError> {
        if req.recipient.trim().is_empty() {
            return Err(AppError::BadRequest("Recipient cannot be empty".into()));
        }
        if req.body.trim().is_empty() {
            return Err(AppError::BadRequest("Body cannot be empty".into()));
        }

        let notification = Notification::new(req.channel, req.recipient, req.subject, req.body);
        self.repo
            .enqueue_notification(notification)
            .await
            .map_err(Into::into)
    }

    /// Gets a notification by id.
    pub async fn get_notification(&self, id: Uuid) -> Result<Notification, AppError> {
        self.repo
            .get_notification(id)
            .await
            .map_err(Into::into)
            .and_then(|opt| opt.ok_or_else(|| AppError::NotFound(format!("Notification {id}"))))
    }

    /// Delivery attempts recorded for a notification.
    pub async fn list_notification_attempts(
        &self,
        id: Uuid,
    ) -> Result<Vec<NotificationAttempt>, AppError> {
        self.repo
            .list_notification_attempts(id)
            .await
            .map_err(Into::into)
    }

    /// Queues the payment-confirmed message. Best effort: a queue failure is
    /// logged, never bubbled into the webhook response.
    pub(super) async fn enqueue_confirmation(&self, payment: &Payment) {
        let protocol_hint = match self.repo.get_ledger_entry_by_payment(payment.id).await {
            Ok(Some(entry)) => entry
                .protocol
                .map(|p| format!(" Protocolo: {p}."))
                .unwrap_or_default(),
            _ => String::new(),
        };
        let body = format!(
            "Pagamento de {} confirmado.{protocol_hint}",
            payment.amount
        );

        let notification = match &payment.payer_phone {
            Some(phone) => {
                Notification::new(NotificationChannel::WhatsApp, phone.clone(), None, body)
            }
            None => Notification::new(
                NotificationChannel::Email,
                payment.payer_email.clone(),
                Some("Pagamento confirmado".into()),
                body,
            ),
        };

        if let Err(e) = self.repo.enqueue_notification(notification).await {
            tracing::error!(payment_id = %payment.id, "Failed to enqueue confirmation: {e}");
        }
    }
}
