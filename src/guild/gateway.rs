//! Seam between the verification flow and the Discord REST API.
//!
//! Everything the flow needs from the chat platform goes through
//! [`GuildGateway`], so the managers can be exercised against an in-memory
//! guild in tests.

use async_trait::async_trait;
use poise::serenity_prelude::{
    self as serenity, ApplicationId, Cache, ChannelId, CreateMessage, EditInteractionResponse,
    GetMessages, GuildId, Http, MessageId, RoleId, UserId,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::{BotError, Result};

// Discord JSON error codes
const UNKNOWN_GUILD: isize = 10004;
const UNKNOWN_MEMBER: isize = 10007;
const UNKNOWN_USER: isize = 10013;
const MISSING_ACCESS: isize = 50001;

/// The roles a guild member holds at the start of a flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub role_ids: Vec<RoleId>,
}

impl MemberSnapshot {
    pub fn has_role(&self, role_id: RoleId) -> bool {
        self.role_ids.contains(&role_id)
    }
}

/// The parts of a channel message the cleanup pass looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub id: MessageId,
    pub author_id: UserId,
    pub mention_ids: Vec<UserId>,
}

impl ChannelMessage {
    pub fn mentions(&self, user_id: UserId) -> bool {
        self.mention_ids.contains(&user_id)
    }
}

#[async_trait]
pub trait GuildGateway: Send + Sync {
    /// Id of the bot's own user
    async fn bot_user_id(&self) -> Result<UserId>;

    async fn fetch_member(&self, guild_id: GuildId, user_id: UserId) -> Result<MemberSnapshot>;

    async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<()>;

    async fn system_channel(&self, guild_id: GuildId) -> Result<Option<ChannelId>>;

    /// Most recent messages in a channel, newest first
    async fn recent_messages(&self, channel_id: ChannelId, limit: u8) -> Result<Vec<ChannelMessage>>;

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()>;

    async fn send_message(&self, channel_id: ChannelId, message: CreateMessage) -> Result<()>;

    /// Replace the original response of a deferred interaction
    async fn edit_original_response(&self, token: &str, edit: EditInteractionResponse) -> Result<()>;
}

/// Shared gateway type
pub type SharedGuildGateway = Arc<dyn GuildGateway>;

/// Gateway backed by serenity's HTTP client and gateway cache
pub struct SerenityGateway {
    http: Arc<Http>,
    cache: Arc<Cache>,
    bot_user: OnceCell<UserId>,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, application_id: ApplicationId) -> Self {
        // Interaction webhooks are addressed by application id
        http.set_application_id(application_id);
        Self {
            http,
            cache,
            bot_user: OnceCell::new(),
        }
    }

    /// Guilds the bot is in arrive through the gateway and are cached
    fn is_member_of(&self, guild_id: GuildId) -> bool {
        self.cache.guild(guild_id).is_some()
    }
}

#[async_trait]
impl GuildGateway for SerenityGateway {
    async fn bot_user_id(&self) -> Result<UserId> {
        let id = self
            .bot_user
            .get_or_try_init(|| async {
                let user = self.http.get_current_user().await?;
                Ok::<_, BotError>(user.id)
            })
            .await?;
        Ok(*id)
    }

    async fn fetch_member(&self, guild_id: GuildId, user_id: UserId) -> Result<MemberSnapshot> {
        if !self.is_member_of(guild_id) {
            return Err(BotError::GuildNotFound {
                id: guild_id.to_string(),
            });
        }

        let member = guild_id
            .member(self.http.as_ref(), user_id)
            .await
            .map_err(|e| lookup_error(e, guild_id, Some(user_id)))?;

        Ok(MemberSnapshot {
            role_ids: member.roles,
        })
    }

    async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<()> {
        self.http
            .add_member_role(guild_id, user_id, role_id, Some("Verified"))
            .await?;
        Ok(())
    }

    async fn system_channel(&self, guild_id: GuildId) -> Result<Option<ChannelId>> {
        let cached = self.cache.guild(guild_id).map(|guild| guild.system_channel_id);
        if let Some(channel_id) = cached {
            return Ok(channel_id);
        }

        let guild = guild_id
            .to_partial_guild(self.http.as_ref())
            .await
            .map_err(|e| lookup_error(e, guild_id, None))?;
        Ok(guild.system_channel_id)
    }

    async fn recent_messages(&self, channel_id: ChannelId, limit: u8) -> Result<Vec<ChannelMessage>> {
        let messages = channel_id
            .messages(self.http.as_ref(), GetMessages::new().limit(limit))
            .await?;

        Ok(messages
            .into_iter()
            .map(|m| ChannelMessage {
                id: m.id,
                author_id: m.author.id,
                mention_ids: m.mentions.iter().map(|u| u.id).collect(),
            })
            .collect())
    }

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()> {
        channel_id
            .delete_message(self.http.as_ref(), message_id)
            .await?;
        Ok(())
    }

    async fn send_message(&self, channel_id: ChannelId, message: CreateMessage) -> Result<()> {
        channel_id.send_message(self.http.as_ref(), message).await?;
        Ok(())
    }

    async fn edit_original_response(&self, token: &str, edit: EditInteractionResponse) -> Result<()> {
        self.http
            .edit_original_interaction_response(token, &edit, vec![])
            .await?;
        debug!("Edited original interaction response");
        Ok(())
    }
}

/// Lookup error for a Discord JSON error code, if it means "not there"
fn not_found_error(code: isize, guild_id: GuildId, user_id: Option<UserId>) -> Option<BotError> {
    match code {
        UNKNOWN_GUILD | MISSING_ACCESS => Some(BotError::GuildNotFound {
            id: guild_id.to_string(),
        }),
        UNKNOWN_MEMBER | UNKNOWN_USER => Some(BotError::MemberNotFound {
            guild_id: guild_id.to_string(),
            user_id: user_id.map(|u| u.to_string()).unwrap_or_default(),
        }),
        _ => None,
    }
}

/// Turn Discord's "unknown guild/member" answers into lookup errors
fn lookup_error(err: serenity::Error, guild_id: GuildId, user_id: Option<UserId>) -> BotError {
    if let serenity::Error::Http(::serenity::http::HttpError::UnsuccessfulRequest(response)) = &err
    {
        if let Some(lookup) = not_found_error(response.error.code, guild_id, user_id) {
            return lookup;
        }
    }
    err.into()
}
