use axum::{body::Bytes, extract::State, Json};
use poise::serenity_prelude::CreateInteractionResponse;
use tracing::{debug, error};

use super::server::AppState;
use crate::error::BotError;
use crate::models::{InteractionEvent, RawInteraction};

/// POST /interactions - Discord interaction webhook
pub async fn handle_interaction(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CreateInteractionResponse>, BotError> {
    let raw: RawInteraction = serde_json::from_slice(&body).map_err(|e| {
        error!("Failed to parse interaction body: {}", e);
        BotError::MalformedInteraction {
            message: format!("invalid interaction body: {}", e),
        }
    })?;

    let event = InteractionEvent::try_from(raw).map_err(|e| {
        error!("Rejected interaction: {}", e);
        e
    })?;
    debug!("Received {:?} interaction", event.kind());

    let disposition = state.verification_manager.handle(event).await?;
    let (response, followup) = disposition.into_parts();
    if let Some(followup) = followup {
        tokio::spawn(async move {
            if let Err(e) = followup.await {
                error!("Deferred verification task failed: {}", e);
            }
        });
    }
    Ok(Json(response))
}
