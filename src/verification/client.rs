use async_trait::async_trait;
use poise::serenity_prelude::UserId;
use std::sync::Arc;
use tracing::{debug, info};

use super::types::{VerificationOutcome, VerificationRequest};
use crate::error::{BotError, Result};

/// Asks an external service whether a user passes verification
#[async_trait]
pub trait VerificationClient: Send + Sync {
    async fn verify(&self, user_id: UserId, username: &str) -> Result<VerificationOutcome>;
}

/// Shared verification client type
pub type SharedVerificationClient = Arc<dyn VerificationClient>;

/// Posts `{discordId, username}` to the configured endpoint
pub struct HttpVerificationClient {
    client: reqwest::Client,
    url: String,
}

impl HttpVerificationClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl VerificationClient for HttpVerificationClient {
    async fn verify(&self, user_id: UserId, username: &str) -> Result<VerificationOutcome> {
        let request = VerificationRequest {
            discord_id: user_id.to_string(),
            username: username.to_string(),
        };
        debug!("Sending verification request for {} to {}", user_id, self.url);

        let response = self.client.post(&self.url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(BotError::Verification {
                message: format!("endpoint answered {}: {}", status, text),
            });
        }

        let outcome: VerificationOutcome = response.json().await?;
        info!(
            "Verification endpoint answered success={} for {} ({})",
            outcome.success, username, user_id
        );
        Ok(outcome)
    }
}
