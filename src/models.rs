// src/models.rs
use poise::serenity_prelude::{GuildId, InteractionType, UserId};
use serde::Deserialize;

use crate::error::{BotError, Result};

/// Slash command that starts verification
pub const VERIFY_COMMAND: &str = "verify";
/// Custom id of the button attached to the greeting prompt
pub const VERIFY_BUTTON: &str = "verify_button";

/// Inbound interaction body as Discord posts it to `/interactions`.
///
/// Only the fields the verification flow reads are modelled; everything but
/// the type is optional so that a bare `{"type": 1}` ping parses.
#[derive(Debug, Clone, Deserialize)]
pub struct RawInteraction {
    #[serde(rename = "type")]
    pub kind: InteractionType,
    #[serde(default)]
    pub data: Option<RawInteractionData>,
    #[serde(default)]
    pub member: Option<RawMember>,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInteractionData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub custom_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMember {
    pub user: RawUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Ping,
    Command,
    ComponentClick,
}

/// A user-triggered interaction, validated and ready for the verification flow
#[derive(Debug, Clone)]
pub enum InteractionEvent {
    Ping,
    Invocation(Invocation),
}

/// Slash command or component click issued by a guild member
#[derive(Debug, Clone)]
pub struct Invocation {
    pub kind: InteractionKind,
    /// Command name or component custom id
    pub name: String,
    pub user_id: UserId,
    pub username: String,
    pub guild_id: GuildId,
    pub token: String,
}

impl InteractionEvent {
    pub fn kind(&self) -> InteractionKind {
        match self {
            InteractionEvent::Ping => InteractionKind::Ping,
            InteractionEvent::Invocation(invocation) => invocation.kind,
        }
    }
}

impl Invocation {
    /// Whether this invocation asks for verification
    pub fn is_verify(&self) -> bool {
        self.name == VERIFY_COMMAND || self.name == VERIFY_BUTTON
    }
}

impl TryFrom<RawInteraction> for InteractionEvent {
    type Error = BotError;

    fn try_from(raw: RawInteraction) -> Result<Self> {
        let kind = match raw.kind {
            InteractionType::Ping => return Ok(InteractionEvent::Ping),
            InteractionType::Command => InteractionKind::Command,
            InteractionType::Component => InteractionKind::ComponentClick,
            other => {
                return Err(BotError::UnknownInteractionType {
                    kind: u8::from(other),
                })
            }
        };

        let data = raw.data.unwrap_or_default();
        let name = match kind {
            InteractionKind::Command => data.name,
            _ => data.custom_id,
        }
        .unwrap_or_default();

        let member = raw.member.ok_or_else(|| malformed("missing member"))?;
        let guild_id = raw.guild_id.ok_or_else(|| malformed("missing guild_id"))?;
        let token = raw.token.ok_or_else(|| malformed("missing token"))?;

        Ok(InteractionEvent::Invocation(Invocation {
            kind,
            name,
            user_id: member.user.id,
            username: member.user.username,
            guild_id,
            token,
        }))
    }
}

fn malformed(message: &str) -> BotError {
    BotError::MalformedInteraction {
        message: message.to_string(),
    }
}
