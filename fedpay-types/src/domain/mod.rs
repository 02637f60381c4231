//! Domain models for the federation payment service.

pub mod api_key;
pub mod gateway;
pub mod ledger;
pub mod money;
pub mod notification;
pub mod payment;
pub mod protocol;

pub use api_key::{ApiKey, ApiKeyId};
pub use gateway::{GatewayConfig, GatewayConfigId};
pub use ledger::{LedgerEntry, LedgerEntryId, LedgerEvent, LedgerFilter, LedgerStats};
pub use money::{Currency, Money};
pub use notification::{Notification, NotificationAttempt, NotificationChannel, NotificationStatus};
pub use payment::{
    EntityLink, EntityType, Payment, PaymentId, PaymentMethod, PaymentProvider, PaymentStatus,
};
pub use protocol::{Protocol, ProtocolNumber, ProtocolStatus, ProtocolType};
