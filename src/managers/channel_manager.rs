use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::ChannelTarget;
use crate::error::Result;
use crate::guild::SharedGuildGateway;
use crate::messages;

/// How many recent messages the cleanup pass looks at
pub const CLEANUP_WINDOW: u8 = 100;

/// Posts to and tidies up the verification channel.
///
/// Everything here is best effort: failures are logged and never reach the
/// interaction that triggered them.
pub struct ChannelManager {
    gateway: SharedGuildGateway,
    target: ChannelTarget,
}

impl ChannelManager {
    pub fn new(gateway: SharedGuildGateway, target: ChannelTarget) -> Self {
        Self { gateway, target }
    }

    /// Resolve the configured channel for a guild
    pub async fn resolve_channel(&self, guild_id: GuildId) -> Result<Option<ChannelId>> {
        match self.target {
            ChannelTarget::Fixed(channel_id) => Ok(Some(channel_id)),
            ChannelTarget::SystemChannel => self.gateway.system_channel(guild_id).await,
        }
    }

    async fn channel_or_log(&self, guild_id: GuildId, purpose: &str) -> Option<ChannelId> {
        match self.resolve_channel(guild_id).await {
            Ok(Some(channel_id)) => Some(channel_id),
            Ok(None) => {
                error!("Channel for {} not found in guild {}", purpose, guild_id);
                None
            }
            Err(e) => {
                error!(
                    "Failed to resolve channel for {} in guild {}: {}",
                    purpose, guild_id, e
                );
                None
            }
        }
    }

    /// Delete the bot's own recent messages that mention `user_id`.
    ///
    /// Returns how many were deleted. A failed deletion does not stop the rest.
    pub async fn delete_mentions_of(&self, guild_id: GuildId, user_id: UserId) -> usize {
        let Some(channel_id) = self.channel_or_log(guild_id, "deleting messages").await else {
            return 0;
        };

        let bot_id = match self.gateway.bot_user_id().await {
            Ok(id) => id,
            Err(e) => {
                error!("Error deleting bot messages: could not identify bot user: {}", e);
                return 0;
            }
        };

        let messages = match self.gateway.recent_messages(channel_id, CLEANUP_WINDOW).await {
            Ok(messages) => messages,
            Err(e) => {
                error!("Error deleting bot messages: {}", e);
                return 0;
            }
        };

        let mut deleted = 0;
        for message in messages
            .iter()
            .filter(|m| m.author_id == bot_id && m.mentions(user_id))
        {
            match self.gateway.delete_message(channel_id, message.id).await {
                Ok(()) => {
                    deleted += 1;
                    debug!("Deleted message {} tagged with user ID: {}", message.id, user_id);
                }
                Err(e) => {
                    warn!("Failed to delete message {}: {}", message.id, e);
                }
            }
        }

        info!(
            "Removed {} stale prompts mentioning {} in channel {}",
            deleted, user_id, channel_id
        );
        deleted
    }

    /// Post the reward message mentioning `user_id`
    pub async fn send_reward_post(&self, guild_id: GuildId, user_id: UserId, reward_url: &str) {
        let Some(channel_id) = self.channel_or_log(guild_id, "claim post").await else {
            return;
        };

        let message = messages::reward_post(user_id, reward_url);
        match self.gateway.send_message(channel_id, message).await {
            Ok(()) => info!("Claim post sent to user {}", user_id),
            Err(e) => error!("Error sending claim post to {}: {}", user_id, e),
        }
    }

    /// Post the verification prompt for a new member. Returns whether it was sent.
    pub async fn send_verification_prompt(&self, guild_id: GuildId, user_id: UserId) -> bool {
        let Some(channel_id) = self.channel_or_log(guild_id, "verification prompt").await else {
            return false;
        };

        let message = messages::verification_prompt(user_id);
        match self.gateway.send_message(channel_id, message).await {
            Ok(()) => {
                info!("Verification prompt sent to {} in {}", user_id, channel_id);
                true
            }
            Err(e) => {
                error!("Error sending verification message to {}: {}", user_id, e);
                false
            }
        }
    }
}

/// Shared channel manager type
pub type SharedChannelManager = Arc<ChannelManager>;

pub fn create_shared_channel_manager(
    gateway: SharedGuildGateway,
    target: ChannelTarget,
) -> SharedChannelManager {
    Arc::new(ChannelManager::new(gateway, target))
}
