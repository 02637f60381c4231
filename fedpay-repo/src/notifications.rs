//! Notification delivery worker.
//!
//! Polls the queue and pushes each job to its channel gateway. Delivery is
//! best-effort: every try is recorded as an attempt and the notification is
//! marked sent or failed from the outcome.

use std::time::Duration;

use serde_json::json;
use tokio::time::sleep;
use tracing::{error, info, instrument};

use fedpay_types::{FederationRepository, Notification, NotificationChannel, NotificationStatus};

use crate::PostgresRepo;

/// Channel gateway endpoints the worker delivers through.
#[derive(Debug, Clone, Default)]
pub struct DeliveryTargets {
    /// WhatsApp gateway URL; jobs for the channel fail when unset.
    pub whatsapp_url: Option<String>,
    /// Email relay URL; jobs for the channel fail when unset.
    pub email_relay_url: Option<String>,
}

pub struct NotificationWorker {
    repo: PostgresRepo,
    client: reqwest::Client,
    targets: DeliveryTargets,
}

impl NotificationWorker {
    pub fn new(repo: PostgresRepo, targets: DeliveryTargets) -> Self {
        Self {
            repo,
            client: reqwest::Client::new(),
            targets,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(self) {
        info!("Starting notification worker");
        loop {
            match self.repo.pending_notifications(10).await {
                Ok(jobs) => {
                    if !jobs.is_empty() {
                        info!("Processing {} pending notifications", jobs.len());
                        for job in jobs {
                            self.process_job(job).await;
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to fetch notifications: {}", e);
                }
            }
            sleep(Duration::from_secs(1)).await;
        }
    }

    #[instrument(skip(self, job), fields(notification_id = %job.id, channel = %job.channel))]
    async fn process_job(&self, job: Notification) {
        let outcome = self.deliver(&job).await;

        let (succeeded, error) = match outcome {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e)),
        };

        if let Err(e) = self
            .repo
            .record_notification_attempt(job.id, job.channel, succeeded, error.clone())
            .await
        {
            error!("Failed to record notification attempt: {}", e);
        }

        let status = if succeeded {
            NotificationStatus::Sent
        } else {
            NotificationStatus::Failed
        };
        if let Err(e) = self.repo.mark_notification(job.id, status).await {
            error!("Failed to update notification status: {}", e);
        }
    }

    async fn deliver(&self, job: &Notification) -> Result<(), String> {
        let (url, body) = match job.channel {
            NotificationChannel::WhatsApp => {
                let url = self
                    .targets
                    .whatsapp_url
                    .as_ref()
                    .ok_or("WhatsApp gateway URL not configured")?;
                (
                    url,
                    json!({
                        "phone": job.recipient,
                        "message": job.body,
                    }),
                )
            }
            NotificationChannel::Email => {
                let url = self
                    .targets
                    .email_relay_url
                    .as_ref()
                    .ok_or("Email relay URL not configured")?;
                (
                    url,
                    json!({
                        "to": job.recipient,
                        "subject": job.subject,
                        "body": job.body,
                    }),
                )
            }
        };

        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(format!("HTTP {}", resp.status()))
        }
    }
}
