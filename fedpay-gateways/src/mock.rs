//! Deterministic in-process gateway for tests and sandbox configs.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use fedpay_types::error::GatewayError;
use fedpay_types::ports::gateway::{
    CardPaymentInput, CreatePaymentInput, CreatedPayment, GatewayPaymentResult, InstallmentOption,
    PaymentGateway, WebhookNotification,
};
use fedpay_types::{Money, PaymentMethod, PaymentProvider, PaymentStatus};

use crate::signature;

#[derive(Debug, Deserialize)]
struct Credentials {
    #[serde(default = "default_secret")]
    webhook_secret: String,
}

fn default_secret() -> String {
    "mock-secret".to_string()
}

pub struct MockGateway {
    webhook_secret: String,
}

impl MockGateway {
    pub fn from_credentials(credentials: &Value) -> Result<Self, GatewayError> {
        let creds: Credentials = serde_json::from_value(credentials.clone())
            .map_err(|e| GatewayError::Config(format!("mock credentials: {e}")))?;
        Ok(Self {
            webhook_secret: creds.webhook_secret,
        })
    }

    /// Signs a payload the way the mock provider would, for tests.
    pub fn sign_payload(&self, payload: &[u8]) -> String {
        signature::sign(payload, &self.webhook_secret)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Mock
    }

    async fn create_payment(
        &self,
        input: CreatePaymentInput,
    ) -> Result<CreatedPayment, GatewayError> {
        let external_id = format!("mock-{}", Uuid::new_v4());
        let qr_code = (input.method == PaymentMethod::Pix)
            .then(|| format!("00020126mock{external_id}"));
        let raw = json!({
            "id": external_id,
            "status": "pending",
            "description": input.description,
        });

        Ok(CreatedPayment {
            payment_url: Some(format!("https://pay.mock.test/{external_id}")),
            external_id,
            status: PaymentStatus::Pending,
            qr_code,
            raw,
        })
    }

    async fn process_card_payment(
        &self,
        input: CardPaymentInput,
    ) -> Result<GatewayPaymentResult, GatewayError> {
        // Tokens prefixed "tok_fail" decline, everything else approves.
        let declined = input.card_token.starts_with("tok_fail");
        let external_id = format!("mock-card-{}", Uuid::new_v4());

        Ok(GatewayPaymentResult {
            raw: json!({ "id": external_id, "declined": declined }),
            external_id,
            status: if declined {
                PaymentStatus::Failed
            } else {
                PaymentStatus::Confirmed
            },
            error_code: declined.then(|| "card_declined".to_string()),
            error_message: declined.then(|| "Card declined by issuer".to_string()),
        })
    }

    async fn installment_options(
        &self,
        amount: Money,
        _method: Option<PaymentMethod>,
        _card_bin: Option<&str>,
    ) -> Result<Vec<InstallmentOption>, GatewayError> {
        Ok((1..=12)
            .map(|n| {
                let per = amount.amount().div_ceil(n as i64);
                InstallmentOption {
                    installments: n,
                    installment_amount: per,
                    total_amount: per * n as i64,
                    interest_rate: 0.0,
                }
            })
            .collect())
    }

    fn validate_webhook(&self, payload: &[u8], signature_header: &str, _timestamp: Option<&str>) -> bool {
        signature::verify(payload, signature_header, &self.webhook_secret)
    }

    async fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookNotification, GatewayError> {
        let body: Value =
            serde_json::from_slice(payload).map_err(|e| GatewayError::Payload(e.to_string()))?;
        let external_id = body
            .get("id")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| GatewayError::Payload("webhook without id".into()))?;
        let status = match body.get("status").and_then(Value::as_str) {
            Some("confirmed") => PaymentStatus::Confirmed,
            Some("failed") => PaymentStatus::Failed,
            Some("expired") => PaymentStatus::Expired,
            _ => PaymentStatus::Pending,
        };

        Ok(WebhookNotification {
            external_id,
            status,
            raw: body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedpay_types::{Currency, EntityLink};

    fn gateway() -> MockGateway {
        MockGateway::from_credentials(&json!({})).unwrap()
    }

    #[tokio::test]
    async fn test_create_payment_pix_has_qr() {
        let gw = gateway();
        let input = CreatePaymentInput {
            amount: Money::new(1000, Currency::BRL).unwrap(),
            method: PaymentMethod::Pix,
            description: "test".into(),
            payer_email: "a@b.c".into(),
            entity: EntityLink::EventRegistration(Uuid::new_v4()),
            callback_url: None,
        };
        let created = gw.create_payment(input).await.unwrap();
        assert_eq!(created.status, PaymentStatus::Pending);
        assert!(created.qr_code.is_some());
    }

    #[tokio::test]
    async fn test_card_decline_token() {
        let gw = gateway();
        let input = CardPaymentInput {
            card_token: "tok_fail_123".into(),
            amount: Money::new(1000, Currency::BRL).unwrap(),
            installments: 1,
            holder_name: "A".into(),
            payer_email: "a@b.c".into(),
        };
        let result = gw.process_card_payment(input).await.unwrap();
        assert_eq!(result.status, PaymentStatus::Failed);
        assert_eq!(result.error_code.as_deref(), Some("card_declined"));
    }

    #[tokio::test]
    async fn test_webhook_roundtrip() {
        let gw = gateway();
        let payload = br#"{"id":"mock-1","status":"confirmed"}"#;
        let sig = gw.sign_payload(payload);

        assert!(gw.validate_webhook(payload, &sig, None));
        let parsed = gw.parse_webhook(payload).await.unwrap();
        assert_eq!(parsed.status, PaymentStatus::Confirmed);
    }
}
