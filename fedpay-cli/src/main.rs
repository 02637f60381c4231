//! Fedpay CLI
//!
//! Command-line interface for the Federation Payments API.

use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use fedpay_client::FedpayClient;
use fedpay_types::{
    CardPaymentRequest, CheckoutRequest, Currency, EnqueueNotificationRequest, EntityType,
    NotificationChannel, PaymentMethod, ProtocolStatus, ProtocolType,
};

#[derive(Parser)]
#[command(name = "fedpay")]
#[command(author, version, about = "Federation Payments API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the Federation Payments API
    #[arg(long, env = "FEDPAY_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// API key for authentication
    #[arg(long, env = "FEDPAY_API_KEY")]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Payment operations
    Payment {
        #[command(subcommand)]
        action: PaymentCommands,
    },
    /// Protocol lookups
    Protocol {
        #[command(subcommand)]
        action: ProtocolCommands,
    },
    /// Ledger queries
    Ledger {
        #[command(subcommand)]
        action: LedgerCommands,
    },
    /// Gateway configuration
    Gateway {
        #[command(subcommand)]
        action: GatewayCommands,
    },
    /// Notification queue
    Notification {
        #[command(subcommand)]
        action: NotificationCommands,
    },
    /// Bootstrap the first API key
    Bootstrap {
        /// Name for the new API key
        #[arg(long, default_value = "bootstrap-key")]
        name: String,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum PaymentCommands {
    /// Open a checkout for a federation entity
    Checkout {
        /// Entity type (EVENT_REGISTRATION, ATHLETE_MEMBERSHIP, CLUB_AFFILIATION)
        #[arg(long)]
        entity_type: String,
        /// Entity ID (UUID)
        #[arg(long)]
        entity: String,
        /// Amount in smallest currency unit
        #[arg(long)]
        amount: i64,
        /// Payment method (pix, credit_card, boleto)
        #[arg(long, default_value = "pix")]
        method: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        email: String,
        /// Phone for WhatsApp confirmation
        #[arg(long)]
        phone: Option<String>,
    },
    /// Get payment details
    Get {
        /// Payment ID (UUID)
        id: String,
    },
    /// Settle a pending payment with a tokenized card
    Card {
        /// Payment ID (UUID)
        id: String,
        #[arg(long)]
        token: String,
        #[arg(long, default_value = "1")]
        installments: u32,
        #[arg(long)]
        holder: String,
        #[arg(long)]
        email: String,
    },
    /// List installment options
    Installments {
        #[arg(long)]
        entity_type: String,
        #[arg(long)]
        amount: i64,
        #[arg(long)]
        bin: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProtocolCommands {
    /// Get a protocol by number (e.g. EVT2025000123)
    Get { number: String },
    /// List protocols for an entity
    Entity { entity_id: String },
    /// Update protocol status (ACTIVE, SETTLED, CANCELLED)
    SetStatus {
        number: String,
        #[arg(long)]
        status: String,
    },
}

#[derive(Subcommand)]
enum LedgerCommands {
    /// List ledger entries by type
    List {
        /// Entry type (MEMBERSHIP, EVENT, CLUB, OTHER)
        #[arg(long = "type")]
        entry_type: String,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "50")]
        per_page: u32,
    },
    /// Ledger entries for an entity
    Entity { entity_id: String },
    /// Aggregate statistics
    Stats,
}

#[derive(Subcommand)]
enum GatewayCommands {
    /// List gateway configurations
    List {
        #[arg(long)]
        entity_type: Option<String>,
    },
}

#[derive(Subcommand)]
enum NotificationCommands {
    /// Enqueue a notification
    Send {
        /// Channel (whatsapp, email)
        #[arg(long, default_value = "whatsapp")]
        channel: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        body: String,
    },
}

fn parse_entity_type(s: &str) -> Result<EntityType> {
    s.parse::<EntityType>().map_err(|e| anyhow::anyhow!("{e}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut client = FedpayClient::new(&cli.api_url);
    if let Some(key) = &cli.api_key {
        client = client.with_api_key(key);
    }

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            println!("{}", if healthy { "healthy" } else { "unhealthy" });
        }
        Commands::Bootstrap { name } => {
            let key = client.bootstrap(&name).await?;
            println!("API key (save it, shown once): {key}");
        }
        Commands::Payment { action } => match action {
            PaymentCommands::Checkout {
                entity_type,
                entity,
                amount,
                method,
                description,
                email,
                phone,
            } => {
                let response = client
                    .checkout(CheckoutRequest {
                        entity_type: parse_entity_type(&entity_type)?,
                        entity_id: entity.parse::<Uuid>()?,
                        amount,
                        currency: Currency::BRL,
                        method: method
                            .parse::<PaymentMethod>()
                            .map_err(|e| anyhow::anyhow!("{e}"))?,
                        description,
                        payer_email: email,
                        payer_phone: phone,
                        metadata: None,
                    })
                    .await?;
                print_json(&response)?;
            }
            PaymentCommands::Get { id } => {
                let payment = client.get_payment(id.parse()?).await?;
                print_json(&payment)?;
            }
            PaymentCommands::Card {
                id,
                token,
                installments,
                holder,
                email,
            } => {
                let result = client
                    .card_payment(
                        id.parse()?,
                        CardPaymentRequest {
                            card_token: token,
                            installments,
                            holder_name: holder,
                            payer_email: email,
                        },
                    )
                    .await?;
                print_json(&result)?;
            }
            PaymentCommands::Installments {
                entity_type,
                amount,
                bin,
            } => {
                let options = client
                    .installment_options(parse_entity_type(&entity_type)?, amount, bin.as_deref())
                    .await?;
                print_json(&options)?;
            }
        },
        Commands::Protocol { action } => match action {
            ProtocolCommands::Get { number } => {
                let protocol = client.get_protocol(&number).await?;
                print_json(&protocol)?;
            }
            ProtocolCommands::Entity { entity_id } => {
                let protocols = client
                    .list_protocols_for_entity(entity_id.parse::<Uuid>()?)
                    .await?;
                print_json(&protocols)?;
            }
            ProtocolCommands::SetStatus { number, status } => {
                let status = status
                    .parse::<ProtocolStatus>()
                    .map_err(|e| anyhow::anyhow!("{e}"))?;
                let protocol = client.update_protocol_status(&number, status).await?;
                print_json(&protocol)?;
            }
        },
        Commands::Ledger { action } => match action {
            LedgerCommands::List {
                entry_type,
                status,
                page,
                per_page,
            } => {
                let entry_type = entry_type
                    .parse::<ProtocolType>()
                    .map_err(|e| anyhow::anyhow!("{e}"))?;
                let status = status
                    .map(|s| {
                        serde_json::from_value(serde_json::Value::String(s))
                            .map_err(|e| anyhow::anyhow!("bad status: {e}"))
                    })
                    .transpose()?;
                let entries = client
                    .list_ledger(entry_type, status, page, per_page)
                    .await?;
                print_json(&entries)?;
            }
            LedgerCommands::Entity { entity_id } => {
                let entries = client
                    .list_ledger_for_entity(entity_id.parse::<Uuid>()?)
                    .await?;
                print_json(&entries)?;
            }
            LedgerCommands::Stats => {
                let stats = client.ledger_stats(None, None).await?;
                print_json(&stats)?;
            }
        },
        Commands::Gateway { action } => match action {
            GatewayCommands::List { entity_type } => {
                let entity_type = entity_type.as_deref().map(parse_entity_type).transpose()?;
                let configs = client.list_gateway_configs(entity_type).await?;
                print_json(&configs)?;
            }
        },
        Commands::Notification { action } => match action {
            NotificationCommands::Send {
                channel,
                to,
                subject,
                body,
            } => {
                let channel = channel
                    .parse::<NotificationChannel>()
                    .map_err(|e| anyhow::anyhow!("{e}"))?;
                let notification = client
                    .enqueue_notification(EnqueueNotificationRequest {
                        channel,
                        recipient: to,
                        subject,
                        body,
                    })
                    .await?;
                print_json(&notification)?;
            }
        },
    }

    Ok(())
}
