//! # Fedpay Client SDK
//!
//! A typed Rust client for the Federation Payments API.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use fedpay_types::{
    CardPaymentRequest, CardPaymentResponse, CheckoutRequest, CheckoutResponse,
    CreateGatewayConfigRequest, EnqueueNotificationRequest, EntityType, GatewayConfigResponse,
    InstallmentOption, LedgerEntryResponse, LedgerStats, NotificationResponse, PaymentId,
    PaymentResponse, PaymentStatus, ProtocolResponse, ProtocolStatus, ProtocolType,
    UpdateProtocolStatusRequest,
};

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Federation Payments API client.
pub struct FedpayClient {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl FedpayClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            http: Client::new(),
        }
    }

    /// Sets the API key for authentication.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Creates the first API key (only works while none exist).
    pub async fn bootstrap(&self, name: &str) -> Result<String, ClientError> {
        let body: serde_json::Value = self
            .post("/api/bootstrap", &serde_json::json!({ "name": name }))
            .await?;
        Ok(body
            .get("api_key")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payments
    // ─────────────────────────────────────────────────────────────────────────

    /// Opens a checkout for a federation entity.
    pub async fn checkout(&self, req: CheckoutRequest) -> Result<CheckoutResponse, ClientError> {
        self.post("/api/payments/checkout", &req).await
    }

    /// Gets a payment by ID.
    pub async fn get_payment(&self, id: PaymentId) -> Result<PaymentResponse, ClientError> {
        self.get(&format!("/api/payments/{id}")).await
    }

    /// Settles a pending payment with a tokenized card.
    pub async fn card_payment(
        &self,
        id: PaymentId,
        req: CardPaymentRequest,
    ) -> Result<CardPaymentResponse, ClientError> {
        self.post(&format!("/api/payments/{id}/card"), &req).await
    }

    /// Installment plans for a prospective charge.
    pub async fn installment_options(
        &self,
        entity_type: EntityType,
        amount: i64,
        bin: Option<&str>,
    ) -> Result<Vec<InstallmentOption>, ClientError> {
        let mut path = format!(
            "/api/payments/installments?entity_type={}&amount={}",
            serde_path_value(&entity_type)?,
            amount
        );
        if let Some(bin) = bin {
            path.push_str(&format!("&bin={bin}"));
        }
        self.get(&path).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Protocols
    // ─────────────────────────────────────────────────────────────────────────

    /// Gets a protocol by its formatted number.
    pub async fn get_protocol(&self, number: &str) -> Result<ProtocolResponse, ClientError> {
        self.get(&format!("/api/protocols/{number}")).await
    }

    /// Lists protocols minted for an entity.
    pub async fn list_protocols_for_entity(
        &self,
        entity_id: Uuid,
    ) -> Result<Vec<ProtocolResponse>, ClientError> {
        self.get(&format!("/api/protocols/entity/{entity_id}")).await
    }

    /// Moves a protocol to a new status.
    pub async fn update_protocol_status(
        &self,
        number: &str,
        status: ProtocolStatus,
    ) -> Result<ProtocolResponse, ClientError> {
        self.patch(
            &format!("/api/protocols/{number}/status"),
            &UpdateProtocolStatusRequest { status },
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger
    // ─────────────────────────────────────────────────────────────────────────

    /// Lists ledger entries of one type.
    pub async fn list_ledger(
        &self,
        entry_type: ProtocolType,
        status: Option<PaymentStatus>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<LedgerEntryResponse>, ClientError> {
        let mut path = format!(
            "/api/ledger?type={}&page={}&per_page={}",
            serde_path_value(&entry_type)?,
            page,
            per_page
        );
        if let Some(status) = status {
            path.push_str(&format!("&status={}", serde_path_value(&status)?));
        }
        self.get(&path).await
    }

    /// Ledger entries recorded against an entity.
    pub async fn list_ledger_for_entity(
        &self,
        entity_id: Uuid,
    ) -> Result<Vec<LedgerEntryResponse>, ClientError> {
        self.get(&format!("/api/ledger/entity/{entity_id}")).await
    }

    /// Aggregate ledger statistics.
    pub async fn ledger_stats(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<LedgerStats, ClientError> {
        let mut path = "/api/ledger/stats".to_string();
        let mut sep = '?';
        if let Some(from) = from {
            path.push_str(&format!("{sep}from={}", from.to_rfc3339()));
            sep = '&';
        }
        if let Some(to) = to {
            path.push_str(&format!("{sep}to={}", to.to_rfc3339()));
        }
        self.get(&path).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Gateways & notifications
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers a gateway configuration.
    pub async fn create_gateway_config(
        &self,
        req: CreateGatewayConfigRequest,
    ) -> Result<GatewayConfigResponse, ClientError> {
        self.post("/api/gateways", &req).await
    }

    /// Lists gateway configurations.
    pub async fn list_gateway_configs(
        &self,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<GatewayConfigResponse>, ClientError> {
        let path = match entity_type {
            Some(entity_type) => format!(
                "/api/gateways?entity_type={}",
                serde_path_value(&entity_type)?
            ),
            None => "/api/gateways".to_string(),
        };
        self.get(&path).await
    }

    /// Enqueues an outbound notification.
    pub async fn enqueue_notification(
        &self,
        req: EnqueueNotificationRequest,
    ) -> Result<NotificationResponse, ClientError> {
        self.post("/api/notifications", &req).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plumbing
    // ─────────────────────────────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let mut req = self.http.get(format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let mut req = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn patch<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let mut req = self
            .http
            .patch(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Serializes an enum the way serde would place it in a query string.
fn serde_path_value<T: serde::Serialize>(value: &T) -> Result<String, ClientError> {
    let raw = serde_json::to_string(value)?;
    Ok(raw.trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = FedpayClient::new("http://localhost:3000");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = FedpayClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_api_key() {
        let client = FedpayClient::new("http://localhost:3000").with_api_key("test-key");
        assert_eq!(client.api_key, Some("test-key".to_string()));
    }

    #[test]
    fn test_serde_path_value_matches_wire_format() {
        assert_eq!(
            serde_path_value(&EntityType::EventRegistration).unwrap(),
            "EVENT_REGISTRATION"
        );
        assert_eq!(serde_path_value(&ProtocolType::Event).unwrap(), "EVENT");
        assert_eq!(
            serde_path_value(&PaymentStatus::Confirmed).unwrap(),
            "CONFIRMED"
        );
    }
}
