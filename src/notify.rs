use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info};

use crate::models::CycleOutcome;

/// Delivers the single per-cycle result. Formatting and transport beyond one
/// line of text are the notifier's business, not the engine's.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, outcome: &CycleOutcome) -> Result<()>;
}

/// Fallback notifier that just logs the outcome.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, outcome: &CycleOutcome) -> Result<()> {
        match outcome {
            CycleOutcome::Success => info!("cycle result: success"),
            CycleOutcome::Failure { reason } => error!("cycle result: failure: {reason}"),
        }
        Ok(())
    }
}

/// Posts the outcome to a Slack incoming webhook.
pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            webhook_url: webhook_url.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, outcome: &CycleOutcome) -> Result<()> {
        let text = match outcome {
            CycleOutcome::Success => "Apartment mirror cycle: success ✅".to_string(),
            CycleOutcome::Failure { reason } => {
                format!("Apartment mirror cycle: FAILED ❌\n{reason}")
            }
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&json!({ "text": text }))
            .send()
            .await
            .context("Failed to reach Slack webhook")?;

        if !response.status().is_success() {
            anyhow::bail!("Slack webhook returned status: {}", response.status());
        }

        Ok(())
    }
}
