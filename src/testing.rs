//! In-memory stand-ins for Discord and the verification endpoint.

use async_trait::async_trait;
use poise::serenity_prelude::{
    ChannelId, CreateMessage, EditInteractionResponse, GuildId, MessageId, RoleId, UserId,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{BotError, Result};
use crate::guild::gateway::{ChannelMessage, GuildGateway, MemberSnapshot};
use crate::verification::client::VerificationClient;
use crate::verification::VerificationOutcome;

pub const GUILD: GuildId = GuildId::new(7);
pub const BOT: UserId = UserId::new(900);
pub const ALICE: UserId = UserId::new(42);
pub const BOB: UserId = UserId::new(43);
pub const MEMBER_ROLE: RoleId = RoleId::new(500);
pub const GREETING_CHANNEL: ChannelId = ChannelId::new(300);

/// Wire JSON of a serenity builder
pub fn to_json<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap()
}

#[derive(Default)]
pub struct FakeGuild {
    pub members: HashMap<UserId, Vec<RoleId>>,
    pub system_channel: Option<ChannelId>,
    pub messages: HashMap<ChannelId, Vec<ChannelMessage>>,
    pub failing_deletes: HashSet<MessageId>,
    /// Member lookups fail as if Discord were unavailable
    pub fail_fetch: bool,
    pub fail_add_role: bool,
    pub fail_send: bool,
    pub fail_edit: bool,
    pub sent: Vec<(ChannelId, serde_json::Value)>,
    pub edits: Vec<(String, serde_json::Value)>,
}

/// Single guild `GUILD` containing ALICE and BOB, neither verified
pub struct FakeGateway {
    pub guild: Mutex<FakeGuild>,
    pub fetch_calls: AtomicUsize,
    pub add_role_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        let mut guild = FakeGuild::default();
        guild.members.insert(ALICE, vec![]);
        guild.members.insert(BOB, vec![]);
        guild.system_channel = Some(GREETING_CHANNEL);
        Arc::new(Self {
            guild: Mutex::new(guild),
            fetch_calls: AtomicUsize::new(0),
            add_role_calls: AtomicUsize::new(0),
        })
    }

    pub fn with_guild<R>(&self, f: impl FnOnce(&mut FakeGuild) -> R) -> R {
        let mut guild = self.guild.lock().unwrap();
        f(&mut guild)
    }

    pub fn roles_of(&self, user_id: UserId) -> Vec<RoleId> {
        self.with_guild(|g| g.members.get(&user_id).cloned().unwrap_or_default())
    }

    pub fn sent(&self) -> Vec<(ChannelId, serde_json::Value)> {
        self.with_guild(|g| g.sent.clone())
    }

    pub fn edits(&self) -> Vec<(String, serde_json::Value)> {
        self.with_guild(|g| g.edits.clone())
    }

    pub fn add_role_calls(&self) -> usize {
        self.add_role_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Bot-authored message in `channel` mentioning `mentions`
    pub fn post(&self, channel: ChannelId, id: u64, author: UserId, mentions: &[UserId]) {
        self.with_guild(|g| {
            g.messages.entry(channel).or_default().push(ChannelMessage {
                id: MessageId::new(id),
                author_id: author,
                mention_ids: mentions.to_vec(),
            })
        });
    }

    pub fn message_ids(&self, channel: ChannelId) -> Vec<u64> {
        self.with_guild(|g| {
            g.messages
                .get(&channel)
                .map(|m| m.iter().map(|m| m.id.get()).collect())
                .unwrap_or_default()
        })
    }
}

#[async_trait]
impl GuildGateway for FakeGateway {
    async fn bot_user_id(&self) -> Result<UserId> {
        Ok(BOT)
    }

    async fn fetch_member(&self, guild_id: GuildId, user_id: UserId) -> Result<MemberSnapshot> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if guild_id != GUILD {
            return Err(BotError::GuildNotFound {
                id: guild_id.to_string(),
            });
        }
        self.with_guild(|g| {
            if g.fail_fetch {
                return Err(BotError::Discord {
                    message: "503 Service Unavailable".to_string(),
                });
            }
            match g.members.get(&user_id) {
                Some(roles) => Ok(MemberSnapshot {
                    role_ids: roles.clone(),
                }),
                None => Err(BotError::MemberNotFound {
                    guild_id: guild_id.to_string(),
                    user_id: user_id.to_string(),
                }),
            }
        })
    }

    async fn add_role(&self, _guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<()> {
        self.add_role_calls.fetch_add(1, Ordering::SeqCst);
        self.with_guild(|g| {
            if g.fail_add_role {
                return Err(BotError::Discord {
                    message: "Missing Permissions".to_string(),
                });
            }
            let roles = g.members.entry(user_id).or_default();
            if !roles.contains(&role_id) {
                roles.push(role_id);
            }
            Ok(())
        })
    }

    async fn system_channel(&self, guild_id: GuildId) -> Result<Option<ChannelId>> {
        if guild_id != GUILD {
            return Err(BotError::GuildNotFound {
                id: guild_id.to_string(),
            });
        }
        Ok(self.with_guild(|g| g.system_channel))
    }

    async fn recent_messages(&self, channel_id: ChannelId, limit: u8) -> Result<Vec<ChannelMessage>> {
        Ok(self.with_guild(|g| {
            g.messages
                .get(&channel_id)
                .map(|m| m.iter().rev().take(limit as usize).cloned().collect())
                .unwrap_or_default()
        }))
    }

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()> {
        self.with_guild(|g| {
            if g.failing_deletes.contains(&message_id) {
                return Err(BotError::Discord {
                    message: "Unknown Message".to_string(),
                });
            }
            if let Some(messages) = g.messages.get_mut(&channel_id) {
                messages.retain(|m| m.id != message_id);
            }
            Ok(())
        })
    }

    async fn send_message(&self, channel_id: ChannelId, message: CreateMessage) -> Result<()> {
        self.with_guild(|g| {
            if g.fail_send {
                return Err(BotError::Discord {
                    message: "Missing Access".to_string(),
                });
            }
            g.sent.push((channel_id, to_json(&message)));
            Ok(())
        })
    }

    async fn edit_original_response(&self, token: &str, edit: EditInteractionResponse) -> Result<()> {
        self.with_guild(|g| {
            if g.fail_edit {
                return Err(BotError::Discord {
                    message: "Unknown Webhook".to_string(),
                });
            }
            g.edits.push((token.to_string(), to_json(&edit)));
            Ok(())
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierMode {
    Approve,
    Reject,
    Fail,
}

/// Verification endpoint answering according to its mode
pub struct FakeVerifier {
    pub mode: VerifierMode,
    pub calls: AtomicUsize,
}

impl FakeVerifier {
    pub fn new(mode: VerifierMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationClient for FakeVerifier {
    async fn verify(&self, _user_id: UserId, _username: &str) -> Result<VerificationOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            VerifierMode::Approve => Ok(VerificationOutcome { success: true }),
            VerifierMode::Reject => Ok(VerificationOutcome { success: false }),
            VerifierMode::Fail => Err(BotError::Verification {
                message: "connection refused".to_string(),
            }),
        }
    }
}
