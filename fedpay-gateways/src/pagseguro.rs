//! PagSeguro gateway adapter.
//!
//! Uses the orders API for checkout creation and the charges API for direct
//! card captures. Webhook bodies are signed with HMAC-SHA256 over the raw
//! payload using the account token.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use fedpay_types::error::GatewayError;
use fedpay_types::ports::gateway::{
    CardPaymentInput, CreatePaymentInput, CreatedPayment, GatewayPaymentResult, InstallmentOption,
    PaymentGateway, WebhookNotification,
};
use fedpay_types::{Money, PaymentMethod, PaymentProvider, PaymentStatus};

use crate::signature;

const PROD_BASE_URL: &str = "https://api.pagseguro.com";
const SANDBOX_BASE_URL: &str = "https://sandbox.api.pagseguro.com";

/// Card installment plans are computed locally, interest-free, up to this
/// count; PagSeguro itself caps interest-free plans per merchant contract.
const MAX_INSTALLMENTS: u32 = 12;

#[derive(Debug, Deserialize)]
struct Credentials {
    token: String,
    #[serde(default)]
    base_url: Option<String>,
}

pub struct PagSeguroGateway {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl PagSeguroGateway {
    pub fn from_credentials(credentials: &Value, sandbox: bool) -> Result<Self, GatewayError> {
        let creds: Credentials = serde_json::from_value(credentials.clone())
            .map_err(|e| GatewayError::Config(format!("pagseguro credentials: {e}")))?;

        let default_base = if sandbox { SANDBOX_BASE_URL } else { PROD_BASE_URL };
        Ok(Self {
            token: creds.token,
            base_url: creds.base_url.unwrap_or_else(|| default_base.to_string()),
            client: reqwest::Client::new(),
        })
    }

    fn map_status(status: &str) -> PaymentStatus {
        match status {
            "PAID" | "AVAILABLE" => PaymentStatus::Confirmed,
            "DECLINED" | "CANCELED" | "REFUNDED" => PaymentStatus::Failed,
            "EXPIRED" => PaymentStatus::Expired,
            _ => PaymentStatus::Pending,
        }
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), path, "PagSeguro request rejected");
            return Err(GatewayError::Provider(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        resp.json().await.map_err(|e| GatewayError::Payload(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for PagSeguroGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::PagSeguro
    }

    async fn create_payment(
        &self,
        input: CreatePaymentInput,
    ) -> Result<CreatedPayment, GatewayError> {
        let mut body = json!({
            "reference_id": input.entity.entity_id().to_string(),
            "customer": { "email": input.payer_email },
            "items": [{
                "name": input.description,
                "quantity": 1,
                "unit_amount": input.amount.amount(),
            }],
        });
        if let Some(callback) = &input.callback_url {
            body["notification_urls"] = json!([callback]);
        }
        if input.method == PaymentMethod::Pix {
            body["qr_codes"] = json!([{ "amount": { "value": input.amount.amount() } }]);
        }

        let raw = self.post_json("/orders", body).await?;

        let external_id = raw
            .get("id")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| GatewayError::Payload("order without id".into()))?;
        let qr_code = raw
            .pointer("/qr_codes/0/text")
            .and_then(Value::as_str)
            .map(ToString::to_string);
        let payment_url = raw
            .get("links")
            .and_then(Value::as_array)
            .and_then(|links| {
                links.iter().find(|l| {
                    l.get("rel").and_then(Value::as_str) == Some("PAY")
                })
            })
            .and_then(|l| l.get("href"))
            .and_then(Value::as_str)
            .map(ToString::to_string);

        Ok(CreatedPayment {
            external_id,
            status: PaymentStatus::Pending,
            payment_url,
            qr_code,
            raw,
        })
    }

    async fn process_card_payment(
        &self,
        input: CardPaymentInput,
    ) -> Result<GatewayPaymentResult, GatewayError> {
        let body = json!({
            "amount": {
                "value": input.amount.amount(),
                "currency": input.amount.currency().to_string(),
            },
            "payment_method": {
                "type": "CREDIT_CARD",
                "installments": input.installments,
                "capture": true,
                "card": {
                    "encrypted": input.card_token,
                    "holder": { "name": input.holder_name },
                },
            },
        });
        let raw = self.post_json("/charges", body).await?;

        let external_id = raw
            .get("id")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| GatewayError::Payload("charge without id".into()))?;
        let status = raw
            .get("status")
            .and_then(Value::as_str)
            .map(Self::map_status)
            .unwrap_or(PaymentStatus::Pending);
        let (error_code, error_message) = if status == PaymentStatus::Failed {
            (
                raw.pointer("/payment_response/code")
                    .and_then(Value::as_str)
                    .map(ToString::to_string),
                raw.pointer("/payment_response/message")
                    .and_then(Value::as_str)
                    .map(ToString::to_string),
            )
        } else {
            (None, None)
        };

        Ok(GatewayPaymentResult {
            external_id,
            status,
            error_code,
            error_message,
            raw,
        })
    }

    async fn installment_options(
        &self,
        amount: Money,
        method: Option<PaymentMethod>,
        _card_bin: Option<&str>,
    ) -> Result<Vec<InstallmentOption>, GatewayError> {
        if matches!(method, Some(m) if m != PaymentMethod::CreditCard) {
            return Ok(Vec::new());
        }

        Ok(installment_plans(amount.amount(), MAX_INSTALLMENTS))
    }

    fn validate_webhook(&self, payload: &[u8], signature: &str, _timestamp: Option<&str>) -> bool {
        signature::verify(payload, signature, &self.token)
    }

    async fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookNotification, GatewayError> {
        let body: Value =
            serde_json::from_slice(payload).map_err(|e| GatewayError::Payload(e.to_string()))?;

        // Charge-level id and status when present, order id otherwise.
        let charge = body.pointer("/charges/0");
        let external_id = charge
            .and_then(|c| c.get("id"))
            .or_else(|| body.get("id"))
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| GatewayError::Payload("webhook without id".into()))?;
        let status = charge
            .and_then(|c| c.get("status"))
            .or_else(|| body.get("status"))
            .and_then(Value::as_str)
            .map(Self::map_status)
            .unwrap_or(PaymentStatus::Pending);

        Ok(WebhookNotification {
            external_id,
            status,
            raw: body,
        })
    }
}

/// Equal, interest-free parts; the per-installment amount rounds up so the
/// plan never undershoots the charge.
fn installment_plans(amount: i64, max: u32) -> Vec<InstallmentOption> {
    (1..=max)
        .map(|n| {
            let per = amount.div_ceil(n as i64);
            InstallmentOption {
                installments: n,
                installment_amount: per,
                total_amount: per * n as i64,
                interest_rate: 0.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> PagSeguroGateway {
        PagSeguroGateway::from_credentials(&json!({"token": "ps_token"}), true).unwrap()
    }

    #[test]
    fn test_sandbox_base_url() {
        let gw = gateway();
        assert_eq!(gw.base_url, SANDBOX_BASE_URL);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(PagSeguroGateway::map_status("PAID"), PaymentStatus::Confirmed);
        assert_eq!(PagSeguroGateway::map_status("DECLINED"), PaymentStatus::Failed);
        assert_eq!(PagSeguroGateway::map_status("EXPIRED"), PaymentStatus::Expired);
        assert_eq!(
            PagSeguroGateway::map_status("WAITING"),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn test_validate_webhook() {
        let gw = gateway();
        let payload = br#"{"id":"ORDE_1","charges":[{"id":"CHAR_1","status":"PAID"}]}"#;
        let sig = signature::sign(payload, "ps_token");

        assert!(gw.validate_webhook(payload, &sig, None));
        assert!(!gw.validate_webhook(payload, "deadbeef", None));
    }

    #[tokio::test]
    async fn test_parse_webhook_prefers_charge() {
        let gw = gateway();
        let payload = br#"{"id":"ORDE_1","charges":[{"id":"CHAR_1","status":"PAID"}]}"#;
        let parsed = gw.parse_webhook(payload).await.unwrap();
        assert_eq!(parsed.external_id, "CHAR_1");
        assert_eq!(parsed.status, PaymentStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_parse_webhook_falls_back_to_order() {
        let gw = gateway();
        let payload = br#"{"id":"ORDE_2"}"#;
        let parsed = gw.parse_webhook(payload).await.unwrap();
        assert_eq!(parsed.external_id, "ORDE_2");
        assert_eq!(parsed.status, PaymentStatus::Pending);
    }

    #[test]
    fn test_installment_plans_cover_amount() {
        let plans = installment_plans(10000, 12);
        assert_eq!(plans.len(), 12);
        assert_eq!(plans[0].installment_amount, 10000);
        for plan in &plans {
            assert!(plan.total_amount >= 10000);
            assert_eq!(plan.interest_rate, 0.0);
        }
        // 10000 / 3 rounds up to 3334 per part
        assert_eq!(plans[2].installment_amount, 3334);
    }
}
