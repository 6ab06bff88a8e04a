use poise::serenity_prelude::{self as serenity, GuildId, UserId};
use tracing::{info, warn};

use crate::managers::channel_manager::ChannelManager;
use crate::{Data, Error};

/// Handle when a new member joins the guild
pub async fn handle_member_add(
    _ctx: &serenity::Context,
    new_member: &serenity::Member,
    data: &Data,
) -> Result<(), Error> {
    greet_new_member(
        &data.channel_manager,
        new_member.guild_id,
        new_member.user.id,
        &new_member.user.tag(),
    )
    .await;
    Ok(())
}

/// Post the verification prompt for a member who just joined.
///
/// A guild without a usable channel is logged and skipped.
pub async fn greet_new_member(
    channel_manager: &ChannelManager,
    guild_id: GuildId,
    user_id: UserId,
    tag: &str,
) -> bool {
    info!("New member joined: {} in guild {}", tag, guild_id);

    let sent = channel_manager
        .send_verification_prompt(guild_id, user_id)
        .await;
    if !sent {
        warn!("No verification prompt posted for {} in guild {}", tag, guild_id);
    }
    sent
}
