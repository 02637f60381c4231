//! Configuration loading from environment.

use std::env;

/// Application configuration.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// WhatsApp gateway endpoint; WhatsApp delivery stays disabled when unset.
    pub whatsapp_gateway_url: Option<String>,
    /// Email relay endpoint; email delivery stays disabled when unset.
    pub email_relay_url: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        Ok(Self {
            port,
            database_url,
            whatsapp_gateway_url: env::var("WHATSAPP_GATEWAY_URL").ok(),
            email_relay_url: env::var("EMAIL_RELAY_URL").ok(),
        })
    }
}
