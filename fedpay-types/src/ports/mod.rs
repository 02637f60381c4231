//! Port traits implemented by adapters.

pub mod gateway;
pub mod repository;

pub use gateway::{
    CardPaymentInput, CreatePaymentInput, CreatedPayment, GatewayPaymentResult, InstallmentOption,
    PaymentGateway, WebhookNotification,
};
pub use repository::FederationRepository;
