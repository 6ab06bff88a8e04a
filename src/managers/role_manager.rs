use poise::serenity_prelude::{GuildId, RoleId, UserId};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::guild::SharedGuildGateway;

/// What `ensure_role` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleGrant {
    Granted,
    AlreadyPresent,
}

/// Grants the gate role to members
pub struct RoleManager {
    gateway: SharedGuildGateway,
}

impl RoleManager {
    pub fn new(gateway: SharedGuildGateway) -> Self {
        Self { gateway }
    }

    /// Check whether a member currently holds a role
    pub async fn has_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<bool> {
        let member = self.gateway.fetch_member(guild_id, user_id).await?;
        Ok(member.has_role(role_id))
    }

    /// Make sure the member holds `role_id`, adding it only when missing.
    ///
    /// Errors from Discord are returned to the caller untouched; there is no
    /// retry.
    pub async fn ensure_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<RoleGrant> {
        if self.has_role(guild_id, user_id, role_id).await? {
            debug!("User {} already has role {}", user_id, role_id);
            return Ok(RoleGrant::AlreadyPresent);
        }

        self.gateway.add_role(guild_id, user_id, role_id).await?;
        info!("Assigned role {} to user {} in guild {}", role_id, user_id, guild_id);
        Ok(RoleGrant::Granted)
    }
}

/// Shared role manager type
pub type SharedRoleManager = Arc<RoleManager>;

pub fn create_shared_role_manager(gateway: SharedGuildGateway) -> SharedRoleManager {
    Arc::new(RoleManager::new(gateway))
}
