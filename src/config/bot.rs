use base64::Engine;
use poise::serenity_prelude::{ApplicationId, ChannelId, RoleId};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{BotError, Result};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_REWARD_DELAY_SECS: u64 = 2;
const DEFAULT_ACQUIRE_URL: &str = "https://www.kucoin.com/how-to-buy/airdao";
const DEFAULT_ACQUIRE_LABEL: &str = "Buy AirDao Tokens";

/// How the verifying step is delivered back to Discord
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ResponseMode {
    /// Run the verification inside the request and answer with the result
    Immediate,
    /// Acknowledge at once, then edit the original response when done
    Deferred,
}

/// Channel used for greetings, reward posts and cleanup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelTarget {
    Fixed(ChannelId),
    /// The guild's system channel, resolved on every use
    SystemChannel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Process-wide configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Ed25519 application public key used to check request signatures
    pub public_key: [u8; 32],
    pub bot_token: String,
    pub application_id: ApplicationId,
    pub required_role: RoleId,
    pub port: u16,
    /// Explicit verification endpoint; falls back to the local stub
    pub verify_url: Option<String>,
    pub acquire_url: String,
    pub acquire_label: String,
    /// Reward posts are only sent when this is set
    pub reward_url: Option<String>,
    pub reward_delay: Duration,
    pub channel: ChannelTarget,
    pub response_mode: ResponseMode,
    pub cleanup_messages: bool,
    pub verify_stub: bool,
    pub tls: Option<TlsPaths>,
}

impl BotConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source. Missing required keys are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| BotError::MissingConfig {
                key: key.to_string(),
            })
        };

        let public_key_hex = require("PUBLIC_KEY")?;
        let public_key = parse_public_key(&public_key_hex).ok_or_else(|| BotError::InvalidConfig {
            key: "PUBLIC_KEY".to_string(),
            message: "expected 64 hex characters".to_string(),
        })?;

        let bot_token = get("BOT_TOKEN")
            .or_else(|| get("DISCORD_TOKEN"))
            .ok_or_else(|| BotError::MissingConfig {
                key: "BOT_TOKEN".to_string(),
            })?;

        let application_id = match get("APP_ID") {
            Some(id) => parse_id("APP_ID", &id)?,
            None => application_id_from_token(&bot_token).ok_or_else(|| BotError::MissingConfig {
                key: "APP_ID".to_string(),
            })?,
        };

        let required_role = parse_id("REQUIRED_ROLE_ID", &require("REQUIRED_ROLE_ID")?)?;

        let port = match get("PORT") {
            Some(port) => port.trim().parse().map_err(|_| BotError::InvalidConfig {
                key: "PORT".to_string(),
                message: format!("'{}' is not a port number", port),
            })?,
            None => DEFAULT_PORT,
        };

        let reward_delay = match get("REWARD_DELAY_SECS") {
            Some(secs) => Duration::from_secs(secs.trim().parse().map_err(|_| {
                BotError::InvalidConfig {
                    key: "REWARD_DELAY_SECS".to_string(),
                    message: format!("'{}' is not a number of seconds", secs),
                }
            })?),
            None => Duration::from_secs(DEFAULT_REWARD_DELAY_SECS),
        };

        let channel = match get("CHANNEL_ID") {
            Some(id) => ChannelTarget::Fixed(ChannelId::new(parse_id("CHANNEL_ID", &id)?)),
            None => ChannelTarget::SystemChannel,
        };

        let response_mode = match get("RESPONSE_MODE") {
            Some(mode) => {
                <ResponseMode as clap::ValueEnum>::from_str(mode.trim(), true).map_err(|_| {
                    BotError::InvalidConfig {
                        key: "RESPONSE_MODE".to_string(),
                        message: format!("'{}' is not 'immediate' or 'deferred'", mode),
                    }
                })?
            }
            None => ResponseMode::Immediate,
        };

        let tls = match (get("TLS_CERT_PATH"), get("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            _ => None,
        };

        Ok(Self {
            public_key,
            bot_token,
            application_id: ApplicationId::new(application_id),
            required_role: RoleId::new(required_role),
            port,
            verify_url: get("VERIFY_URL"),
            acquire_url: get("ACQUIRE_URL").unwrap_or_else(|| DEFAULT_ACQUIRE_URL.to_string()),
            acquire_label: get("ACQUIRE_LABEL")
                .unwrap_or_else(|| DEFAULT_ACQUIRE_LABEL.to_string()),
            reward_url: get("REWARD_URL"),
            reward_delay,
            channel,
            response_mode,
            cleanup_messages: parse_flag("CLEANUP_MESSAGES", get("CLEANUP_MESSAGES"), false)?,
            verify_stub: parse_flag("VERIFY_STUB", get("VERIFY_STUB"), true)?,
            tls,
        })
    }

    /// Where the verification request is sent
    pub fn verify_url(&self) -> String {
        self.verify_url
            .clone()
            .unwrap_or_else(|| format!("http://127.0.0.1:{}/verify", self.port))
    }
}

/// Shared config type
pub type SharedBotConfig = Arc<BotConfig>;

/// Parse a non-zero Discord snowflake
fn parse_id(key: &str, value: &str) -> Result<u64> {
    match value.trim().parse::<u64>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(BotError::InvalidConfig {
            key: key.to_string(),
            message: format!("'{}' is not a Discord id", value),
        }),
    }
}

fn parse_flag(key: &str, value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref().map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(BotError::InvalidConfig {
            key: key.to_string(),
            message: format!("'{}' is not a boolean", v),
        }),
    }
}

/// Decode a 64 character hex string into key bytes
fn parse_public_key(hex: &str) -> Option<[u8; 32]> {
    let hex = hex.trim();
    if hex.len() != 64 || !hex.is_ascii() {
        return None;
    }
    let mut key = [0u8; 32];
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(key)
}

/// The first segment of a bot token is the base64 encoded application id
pub fn application_id_from_token(token: &str) -> Option<u64> {
    let segment = token.split('.').next()?;
    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(segment)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(segment))
        .ok()?;
    String::from_utf8(decoded).ok()?.parse().ok().filter(|id| *id != 0)
}
