//! Gateway configuration domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::payment::{EntityType, PaymentMethod, PaymentProvider};

/// Unique identifier for a gateway configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct GatewayConfigId(Uuid);

impl GatewayConfigId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for GatewayConfigId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GatewayConfigId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for GatewayConfigId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A configured payment-provider integration.
///
/// Several configs may exist for one provider (e.g. sandbox and production,
/// or per-federation credentials); selection picks the highest-priority
/// active config applicable to the entity type being charged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub id: GatewayConfigId,
    pub provider: PaymentProvider,
    /// Operator-facing label, e.g. "mp-producao".
    pub label: String,
    pub active: bool,
    /// Higher wins when several configs match.
    pub priority: i32,
    pub methods: Vec<PaymentMethod>,
    pub entity_types: Vec<EntityType>,
    pub sandbox: bool,
    /// Provider-specific credentials, opaque to everything but the adapter.
    pub credentials: serde_json::Value,
    pub callback_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GatewayConfig {
    /// Whether this config can serve a charge for the given entity type.
    pub fn applies_to(&self, entity_type: EntityType) -> bool {
        self.active && self.entity_types.contains(&entity_type)
    }

    /// Whether the config allows the given payment method.
    pub fn allows_method(&self, method: PaymentMethod) -> bool {
        self.methods.contains(&method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(entity_types: Vec<EntityType>, active: bool) -> GatewayConfig {
        GatewayConfig {
            id: GatewayConfigId::new(),
            provider: PaymentProvider::Mock,
            label: "test".into(),
            active,
            priority: 0,
            methods: vec![PaymentMethod::Pix],
            entity_types,
            sandbox: true,
            credentials: serde_json::json!({}),
            callback_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_applies_to_entity_type() {
        let cfg = config(vec![EntityType::EventRegistration], true);
        assert!(cfg.applies_to(EntityType::EventRegistration));
        assert!(!cfg.applies_to(EntityType::ClubAffiliation));
    }

    #[test]
    fn test_inactive_config_never_applies() {
        let cfg = config(vec![EntityType::EventRegistration], false);
        assert!(!cfg.applies_to(EntityType::EventRegistration));
    }

    #[test]
    fn test_allows_method() {
        let cfg = config(vec![EntityType::EventRegistration], true);
        assert!(cfg.allows_method(PaymentMethod::Pix));
        assert!(!cfg.allows_method(PaymentMethod::Boleto));
    }
}
