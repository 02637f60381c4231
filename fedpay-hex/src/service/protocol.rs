//! Protocol service: minting and tracking user-facing reference numbers.

use chrono::{Datelike, Utc};
use uuid::Uuid;

use fedpay_types::{
    AppError, FederationRepository, PaymentId, Protocol, ProtocolNumber, ProtocolStatus,
    ProtocolType,
};

use super::FederationService;

/// Input for minting a protocol.
#[derive(Debug, Clone)]
pub struct GenerateProtocolInput {
    pub protocol_type: ProtocolType,
    pub entity_id: Uuid,
    pub payment_id: Option<PaymentId>,
    pub metadata: Option<serde_json::Value>,
}

impl<R: FederationRepository> FederationService<R> {
    /// Mints a protocol for the current year.
    ///
    /// The sequence comes from the repository's atomic upsert-increment, so
    /// concurrent callers always end up with distinct numbers.
    pub async fn generate_protocol(
        &self,
        input: GenerateProtocolInput,
    ) -> Result<Protocol, AppError> {
        let year = Utc::now().year();
        let sequence = self
            .repo
            .next_protocol_sequence(input.protocol_type, year)
            .await?;

        let protocol = Protocol::minted(
            input.protocol_type,
            year,
            sequence,
            input.entity_id,
            input.payment_id,
            input.metadata,
        );
        tracing::info!(number = %protocol.number, "Protocol minted");

        self.repo.create_protocol(protocol).await.map_err(Into::into)
    }

    /// Looks up a protocol by its formatted number.
    pub async fn get_protocol(&self, number: &ProtocolNumber) -> Result<Protocol, AppError> {
        self.repo
            .get_protocol(number)
            .await
            .map_err(Into::into)
            .and_then(|opt| opt.ok_or_else(|| AppError::NotFound(format!("Protocol {number}"))))
    }

    /// Lists protocols minted for an entity.
    pub async fn list_protocols_for_entity(
        &self,
        entity_id: Uuid,
    ) -> Result<Vec<Protocol>, AppError> {
        self.repo
            .list_protocols_for_entity(entity_id)
            .await
            .map_err(Into::into)
    }

    /// Moves a protocol to a new status.
    pub async fn update_protocol_status(
        &self,
        number: &ProtocolNumber,
        status: ProtocolStatus,
    ) -> Result<Protocol, AppError> {
        self.repo
            .update_protocol_status(number, status)
            .await
            .map_err(Into::into)
    }
}
