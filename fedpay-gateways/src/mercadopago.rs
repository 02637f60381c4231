//! Mercado Pago gateway adapter.
//!
//! Pix charges go through the payments API; everything else opens a hosted
//! checkout preference. Webhooks carry only the payment id, so normalization
//! fetches the payment back before mapping the status.

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

const PROD_BASE_URL: &str = "https://api.mercadopago.com";

/// Credentials shape expected inside the gateway config's opaque JSON.
#[derive(Debug, Deserialize)]
struct Credentials {
    access_token: String,
    #[serde(default)]
    webhook_secret: Option<String>,
    /// Host override, used by tests and self-hosted stubs.
    #[serde(default)]
    base_url: Option<String>,
}

pub struct MercadoPagoGateway {
    access_token: String,
    webhook_secret: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl MercadoPagoGateway {
    /// Builds the adapter from opaque config credentials.
    pub fn from_credentials(credentials: &Value, _sandbox: bool) -> Result<Self, GatewayError> {
        let creds: Credentials = serde_json::from_value(credentials.clone())
            .map_err(|e| GatewayError::Config(format!("mercadopago credentials: {e}")))?;

        Ok(Self {
            access_token: creds.access_token,
            webhook_secret: creds.webhook_secret,
            base_url: creds
                .base_url
                .unwrap_or_else(|| PROD_BASE_URL.to_string()),
            client: reqwest::Client::new(),
        })
    }

    /// Amounts travel as decimal units on the Mercado Pago wire.
    fn decimal_amount(amount: Money) -> f64 {
        amount.amount() as f64 / 100.0
    }

    fn map_status(status: &str) -> PaymentStatus {
        match status {
            "approved" | "accredited" => PaymentStatus::Confirmed,
            "rejected" | "cancelled" | "refunded" | "charged_back" => PaymentStatus::Failed,
            "expired" => PaymentStatus::Expired,
            _ => PaymentStatus::Pending,
        }
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<Value, GatewayError> {
        let url = format!("{}/v1/payments/{}", self.base_url, payment_id);
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Mercado Pago payment fetch failed");
            return Err(GatewayError::Provider(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        resp.json().await.map_err(|e| GatewayError::Payload(e.to_string()))
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), path, "Mercado Pago request rejected");
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
impl PaymentGateway for MercadoPagoGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::MercadoPago
    }

    async fn create_payment(
        &self,
        input: CreatePaymentInput,
    ) -> Result<CreatedPayment, GatewayError> {
        match input.method {
            PaymentMethod::Pix => {
                let body = json!({
                    "transaction_amount": Self::decimal_amount(input.amount),
                    "description": input.description,
                    "payment_method_id": "pix",
                    "payer": { "email": input.payer_email },
                    "notification_url": input.callback_url,
                    "external_reference": input.entity.entity_id().to_string(),
                });
                let raw = self.post_json("/v1/payments", body).await?;

                let external_id = raw
                    .get("id")
                    .and_then(id_to_string)
                    .ok_or_else(|| GatewayError::Payload("payment without id".into()))?;
                let status = raw
                    .get("status")
                    .and_then(Value::as_str)
                    .map(Self::map_status)
                    .unwrap_or(PaymentStatus::Pending);
                let qr_code = raw
                    .pointer("/point_of_interaction/transaction_data/qr_code")
                    .and_then(Value::as_str)
                    .map(ToString::to_string);
                let payment_url = raw
                    .pointer("/point_of_interaction/transaction_data/ticket_url")
                    .and_then(Value::as_str)
                    .map(ToString::to_string);

                Ok(CreatedPayment {
                    external_id,
                    status,
                    payment_url,
                    qr_code,
                    raw,
                })
            }
            PaymentMethod::CreditCard | PaymentMethod::Boleto => {
                // Hosted checkout preference; the payer finishes on Mercado
                // Pago's side and the webhook reports the resulting payment.
                let body = json!({
                    "items": [{
                        "title": input.description,
                        "quantity": 1,
                        "unit_price": Self::decimal_amount(input.amount),
                        "currency_id": input.amount.currency().to_string(),
                    }],
                    "payer": { "email": input.payer_email },
                    "notification_url": input.callback_url,
                    "external_reference": input.entity.entity_id().to_string(),
                });
                let raw = self.post_json("/checkout/preferences", body).await?;

                let external_id = raw
                    .get("id")
                    .and_then(id_to_string)
                    .ok_or_else(|| GatewayError::Payload("preference without id".into()))?;
                let payment_url = raw
                    .get("init_point")
                    .and_then(Value::as_str)
                    .map(ToString::to_string);

                Ok(CreatedPayment {
                    external_id,
                    status: PaymentStatus::Pending,
                    payment_url,
                    qr_code: None,
                    raw,
                })
            }
        }
    }

    async fn process_card_payment(
        &self,
        input: CardPaymentInput,
    ) -> Result<GatewayPaymentResult, GatewayError> {
        let body = json!({
            "transaction_amount": Self::decimal_amount(input.amount),
            "token": input.card_token,
            "installments": input.installments,
            "payer": { "email": input.payer_email },
        });
        let raw = self.post_json("/v1/payments", body).await?;

        let external_id = raw
            .get("id")
            .and_then(id_to_string)
            .ok_or_else(|| GatewayError::Payload("payment without id".into()))?;
        let status = raw
            .get("status")
            .and_then(Value::as_str)
            .map(Self::map_status)
            .unwrap_or(PaymentStatus::Pending);
        let error_code = raw
            .get("status_detail")
            .and_then(Value::as_str)
            .filter(|_| status == PaymentStatus::Failed)
            .map(ToString::to_string);

        Ok(GatewayPaymentResult {
            external_id,
            status,
            error_code,
            error_message: None,
            raw,
        })
    }

    async fn installment_options(
        &self,
        amount: Money,
        _method: Option<PaymentMethod>,
        card_bin: Option<&str>,
    ) -> Result<Vec<InstallmentOption>, GatewayError> {
        let mut url = format!(
            "{}/v1/payment_methods/installments?amount={}",
            self.base_url,
            Self::decimal_amount(amount)
        );
        if let Some(bin) = card_bin {
            url.push_str(&format!("&bin={bin}"));
        }

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(GatewayError::Provider(format!("HTTP {}", status.as_u16())));
        }

        let raw: Value = resp.json().await.map_err(|e| GatewayError::Payload(e.to_string()))?;
        let costs = raw
            .as_array()
            .and_then(|methods| methods.first())
            .and_then(|m| m.get("payer_costs"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(costs
            .iter()
            .filter_map(|cost| {
                Some(InstallmentOption {
                    installments: cost.get("installments")?.as_u64()? as u32,
                    installment_amount: (cost.get("installment_amount")?.as_f64()? * 100.0).round()
                        as i64,
                    total_amount: (cost.get("total_amount")?.as_f64()? * 100.0).round() as i64,
                    interest_rate: cost
                        .get("installment_rate")
                        .and_then(Value::as_f64)
                        .unwrap_or(0.0),
                })
            })
            .collect())
    }

    /// Mercado Pago signs `id:{data.id};ts:{ts};` with the webhook secret and
    /// ships it as `x-signature: ts=...,v1=...`.
    fn validate_webhook(&self, payload: &[u8], signature: &str, timestamp: Option<&str>) -> bool {
        let Some(secret) = &self.webhook_secret else {
            return false;
        };

        let mut ts = timestamp.map(ToString::to_string);
        let mut v1 = None;
        for part in signature.split(',') {
            match part.trim().split_once('=') {
                Some(("ts", value)) => ts = Some(value.to_string()),
                Some(("v1", value)) => v1 = Some(value.to_string()),
                _ => {}
            }
        }
        let (Some(ts), Some(v1)) = (ts, v1) else {
            return false;
        };

        let data_id = serde_json::from_slice::<Value>(payload)
            .ok()
            .and_then(|v| v.pointer("/data/id").and_then(id_to_string));
        let Some(data_id) = data_id else {
            return false;
        };

        let manifest = format!("id:{data_id};ts:{ts};");
        signature::verify(manifest.as_bytes(), &v1, secret)
    }

    async fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookNotification, GatewayError> {
        let body: Value =
            serde_json::from_slice(payload).map_err(|e| GatewayError::Payload(e.to_string()))?;

        let external_id = body
            .pointer("/data/id")
            .and_then(id_to_string)
            .ok_or_else(|| GatewayError::Payload("webhook without data.id".into()))?;

        // The callback body may embed the payment status; otherwise the
        // status lives behind the payments API.
        let status = match body.pointer("/data/status").and_then(Value::as_str) {
            Some(status) => Self::map_status(status),
            None => {
                let payment = self.fetch_payment(&external_id).await?;
                payment
                    .get("status")
                    .and_then(Value::as_str)
                    .map(Self::map_status)
                    .unwrap_or(PaymentStatus::Pending)
            }
        };

        Ok(WebhookNotification {
            external_id,
            status,
            raw: body,
        })
    }
}

/// Mercado Pago ids arrive as numbers or strings depending on the endpoint.
fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedpay_types::Currency;

    fn gateway(secret: Option<&str>) -> MercadoPagoGateway {
        let creds = json!({
            "access_token": "TEST-token",
            "webhook_secret": secret,
        });
        MercadoPagoGateway::from_credentials(&creds, true).unwrap()
    }

    #[test]
    fn test_credentials_rejects_garbage() {
        let result = MercadoPagoGateway::from_credentials(&json!({"token": "x"}), false);
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            MercadoPagoGateway::map_status("approved"),
            PaymentStatus::Confirmed
        );
        assert_eq!(
            MercadoPagoGateway::map_status("rejected"),
            PaymentStatus::Failed
        );
        assert_eq!(
            MercadoPagoGateway::map_status("expired"),
            PaymentStatus::Expired
        );
        assert_eq!(
            MercadoPagoGateway::map_status("in_process"),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn test_validate_webhook_roundtrip() {
        let gw = gateway(Some("secret"));
        let payload = br#"{"action":"payment.updated","data":{"id":"123"}}"#;
        let v1 = signature::sign(b"id:123;ts:1700000000;", "secret");
        let header = format!("ts=1700000000,v1={v1}");

        assert!(gw.validate_webhook(payload, &header, None));
        assert!(!gw.validate_webhook(payload, &format!("ts=1700000001,v1={v1}"), None));
        assert!(!gw.validate_webhook(br#"{"data":{"id":"999"}}"#, &header, None));
    }

    #[test]
    fn test_validate_webhook_without_secret_fails_closed() {
        let gw = gateway(None);
        assert!(!gw.validate_webhook(b"{}", "ts=1,v1=abc", None));
    }

    #[tokio::test]
    async fn test_parse_webhook_with_embedded_status() {
        let gw = gateway(Some("secret"));
        let payload = br#"{"action":"payment.updated","data":{"id":456,"status":"approved"}}"#;
        let parsed = gw.parse_webhook(payload).await.unwrap();
        assert_eq!(parsed.external_id, "456");
        assert_eq!(parsed.status, PaymentStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_parse_webhook_rejects_missing_id() {
        let gw = gateway(Some("secret"));
        let result = gw.parse_webhook(br#"{"action":"payment.updated"}"#).await;
        assert!(matches!(result, Err(GatewayError::Payload(_))));
    }

    #[test]
    fn test_decimal_amount() {
        let amount = Money::new(15050, Currency::BRL).unwrap();
        assert!((MercadoPagoGateway::decimal_amount(amount) - 150.50).abs() < f64::EPSILON);
    }
}
