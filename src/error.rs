use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use poise::serenity_prelude as serenity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Missing required configuration value: {key}")]
    MissingConfig { key: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig { key: String, message: String },

    // Lookup errors
    #[error("Guild not found: {id}")]
    GuildNotFound { id: String },

    #[error("Member {user_id} not found in guild {guild_id}")]
    MemberNotFound { guild_id: String, user_id: String },

    // Interaction errors
    #[error("Unknown command or interaction: {name}")]
    UnknownInteraction { name: String },

    #[error("Unknown interaction type: {kind}")]
    UnknownInteractionType { kind: u8 },

    #[error("Malformed interaction: {message}")]
    MalformedInteraction { message: String },

    #[error("Invalid request signature")]
    InvalidSignature,

    // Outbound errors
    #[error("Verification request failed: {message}")]
    Verification { message: String },

    #[error("Discord API error: {message}")]
    Discord { message: String },
}

impl BotError {
    /// HTTP status reported to the caller of the web endpoints
    pub fn status_code(&self) -> StatusCode {
        match self {
            BotError::GuildNotFound { .. }
            | BotError::MemberNotFound { .. }
            | BotError::UnknownInteraction { .. }
            | BotError::UnknownInteractionType { .. }
            | BotError::MalformedInteraction { .. } => StatusCode::BAD_REQUEST,
            BotError::InvalidSignature => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body text for the `{"error": ...}` envelope
    fn public_message(&self) -> String {
        match self {
            BotError::GuildNotFound { .. } => "Guild not found.".to_string(),
            BotError::MemberNotFound { .. } => "Member not found.".to_string(),
            BotError::UnknownInteraction { .. } => "Unknown command or interaction".to_string(),
            BotError::UnknownInteractionType { .. } => "Unknown interaction type".to_string(),
            BotError::MalformedInteraction { message } => message.clone(),
            BotError::InvalidSignature => "Bad request signature".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for BotError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.public_message() });
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::Verification {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
