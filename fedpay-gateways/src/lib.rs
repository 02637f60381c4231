//! # Fedpay Gateways
//!
//! Outbound payment-provider adapters. Each provider implements the
//! `PaymentGateway` port from `fedpay-types`; `create_gateway` is the
//! factory that turns a stored gateway configuration into a live client.
#![feature(int_roundings)]

pub mod mercadopago;
pub mod mock;
pub mod pagseguro;
pub mod signature;

pub use mercadopago::MercadoPagoGateway;
pub use mock::MockGateway;
pub use pagseguro::PagSeguroGateway;

use fedpay_types::error::GatewayError;
use fedpay_types::{GatewayConfig, PaymentGateway, PaymentProvider};

/// Builds a provider client from an identifier, opaque credentials and the
/// sandbox flag. Malformed credentials surface as a configuration error.
pub fn create_gateway(
    provider: PaymentProvider,
    credentials: &serde_json::Value,
    sandbox: bool,
) -> Result<Box<dyn PaymentGateway>, GatewayError> {
    match provider {
        PaymentProvider::MercadoPago => Ok(Box::new(MercadoPagoGateway::from_credentials(
            credentials,
            sandbox,
        )?)),
        PaymentProvider::PagSeguro => Ok(Box::new(PagSeguroGateway::from_credentials(
            credentials,
            sandbox,
        )?)),
        PaymentProvider::Mock => Ok(Box::new(MockGateway::from_credentials(credentials)?)),
    }
}

/// Convenience over a stored config row.
pub fn gateway_for_config(config: &GatewayConfig) -> Result<Box<dyn PaymentGateway>, GatewayError> {
    create_gateway(config.provider, &config.credentials, config.sandbox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_factory_builds_each_provider() {
        let mp = create_gateway(
            PaymentProvider::MercadoPago,
            &json!({"access_token": "t"}),
            false,
        )
        .unwrap();
        assert_eq!(mp.provider(), PaymentProvider::MercadoPago);

        let ps = create_gateway(PaymentProvider::PagSeguro, &json!({"token": "t"}), true).unwrap();
        assert_eq!(ps.provider(), PaymentProvider::PagSeguro);

        let mock = create_gateway(PaymentProvider::Mock, &json!({}), true).unwrap();
        assert_eq!(mock.provider(), PaymentProvider::Mock);
    }

    #[test]
    fn test_factory_rejects_bad_credentials() {
        let result = create_gateway(PaymentProvider::MercadoPago, &json!([1, 2, 3]), false);
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }
}
