// src/messages.rs
use poise::serenity_prelude::{
    ButtonStyle, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter,
    CreateInteractionResponseMessage, CreateMessage, EditInteractionResponse, UserId,
};

use crate::models::VERIFY_BUTTON;

pub const ALREADY_VERIFIED: &str = "You already have access to the restricted channel.";
pub const VERIFIED: &str = "✅ You have been verified! You now have access to the restricted channel.";
pub const VERIFICATION_FAILED: &str =
    "Verification failed. Please check the instructions and try again.";
pub const VERIFICATION_ERROR: &str =
    "An error occurred during the verification process. Please try again later.";

const PROMPT_IMAGE: &str =
    "https://pbs.twimg.com/profile_images/1086793002104827904/UXjpiDIl_400x400.jpg";
const REWARD_IMAGE: &str =
    "https://shop.ogs.gg/cdn/shop/files/frontcap.png?v=1706630562&width=1400";

fn failed_text() -> String {
    format!("{}\nGo get your tokens and verify again.", VERIFICATION_FAILED)
}

fn link_row(url: &str, label: &str) -> CreateActionRow {
    CreateActionRow::Buttons(vec![CreateButton::new_link(url).label(label)])
}

pub fn already_verified() -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new()
        .content(ALREADY_VERIFIED)
        .ephemeral(true)
}

/// Success clears the prompt's image and button
pub fn verified() -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new()
        .content(VERIFIED)
        .embeds(vec![])
        .components(vec![])
        .ephemeral(true)
}

pub fn verification_failed(acquire_url: &str, acquire_label: &str) -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new()
        .content(failed_text())
        .components(vec![link_row(acquire_url, acquire_label)])
        .ephemeral(true)
}

pub fn verification_error() -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new()
        .content(VERIFICATION_ERROR)
        .components(vec![])
        .ephemeral(true)
}

// Edits of a deferred original response carry the same content

pub fn verified_edit() -> EditInteractionResponse {
    EditInteractionResponse::new()
        .content(VERIFIED)
        .embeds(vec![])
        .components(vec![])
}

pub fn verification_failed_edit(acquire_url: &str, acquire_label: &str) -> EditInteractionResponse {
    EditInteractionResponse::new()
        .content(failed_text())
        .components(vec![link_row(acquire_url, acquire_label)])
}

pub fn verification_error_edit() -> EditInteractionResponse {
    EditInteractionResponse::new()
        .content(VERIFICATION_ERROR)
        .components(vec![])
}

/// Greeting posted when a member joins
pub fn verification_prompt(user_id: UserId) -> CreateMessage {
    let embed = CreateEmbed::new()
        .title("Restricted Access Verification")
        .description(
            "Click the button below to verify yourself and gain access to the restricted channel.",
        )
        .color(0x0099ff)
        .image(PROMPT_IMAGE)
        .footer(CreateEmbedFooter::new("Verification Required"));

    CreateMessage::new()
        .content(format!("<@{}>", user_id))
        .embed(embed)
        .components(vec![CreateActionRow::Buttons(vec![CreateButton::new(
            VERIFY_BUTTON,
        )
        .label("Verify Yourself")
        .style(ButtonStyle::Primary)])])
}

/// Follow-up posted after a successful verification
pub fn reward_post(user_id: UserId, reward_url: &str) -> CreateMessage {
    let embed = CreateEmbed::new()
        .title("Claim Your Reward")
        .description("Click the button below to claim your reward.")
        .color(0x00ff00)
        .image(REWARD_IMAGE)
        .footer(CreateEmbedFooter::new("Rewards Await!"));

    CreateMessage::new()
        .content(format!("<@{}>", user_id))
        .embed(embed)
        .components(vec![link_row(reward_url, "Claim Now")])
}
