use poise::serenity_prelude::{
    CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse, RoleId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{BotConfig, ResponseMode};
use crate::error::{BotError, Result};
use crate::guild::SharedGuildGateway;
use crate::managers::{SharedChannelManager, SharedRoleManager};
use crate::messages;
use crate::models::{InteractionEvent, InteractionKind, Invocation};
use crate::scheduler::Scheduler;
use crate::verification::SharedVerificationClient;

/// The parts of the configuration the verification flow depends on
#[derive(Debug, Clone)]
pub struct VerificationSettings {
    pub required_role: RoleId,
    pub response_mode: ResponseMode,
    pub cleanup_messages: bool,
    pub reward_url: Option<String>,
    pub reward_delay: Duration,
    pub acquire_url: String,
    pub acquire_label: String,
}

impl From<&BotConfig> for VerificationSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            required_role: config.required_role,
            response_mode: config.response_mode,
            cleanup_messages: config.cleanup_messages,
            reward_url: config.reward_url.clone(),
            reward_delay: config.reward_delay,
            acquire_url: config.acquire_url.clone(),
            acquire_label: config.acquire_label.clone(),
        }
    }
}

/// How an interaction was answered
#[derive(Debug)]
pub enum Disposition {
    /// The final response, returned directly
    Reply(CreateInteractionResponse),
    /// An acknowledgment now; `followup` edits the original response later
    Deferred {
        ack: CreateInteractionResponse,
        followup: JoinHandle<()>,
    },
}

impl Disposition {
    /// The body to send back on the interaction request, and the follow-up still running
    pub fn into_parts(self) -> (CreateInteractionResponse, Option<JoinHandle<()>>) {
        match self {
            Disposition::Reply(response) => (response, None),
            Disposition::Deferred { ack, followup } => (ack, Some(followup)),
        }
    }
}

/// Result of the verifying step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStep {
    Granted,
    Rejected,
    Errored,
}

/// Drives one interaction from arrival to its single response.
///
/// Ping is answered with a pong. Anything other than the verify command or
/// button is refused before Discord is contacted. A member who already holds
/// the required role is told so without calling the verification endpoint.
/// Everyone else is checked against the endpoint and, on success, granted the
/// role, optionally cleaned up after and scheduled a reward post.
pub struct VerificationManager {
    settings: VerificationSettings,
    verifier: SharedVerificationClient,
    gateway: SharedGuildGateway,
    role_manager: SharedRoleManager,
    channel_manager: SharedChannelManager,
    scheduler: Scheduler,
}

impl VerificationManager {
    pub fn new(
        settings: VerificationSettings,
        verifier: SharedVerificationClient,
        gateway: SharedGuildGateway,
        role_manager: SharedRoleManager,
        channel_manager: SharedChannelManager,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            settings,
            verifier,
            gateway,
            role_manager,
            channel_manager,
            scheduler,
        }
    }

    /// Handle one inbound interaction.
    ///
    /// Errors are the client-side refusals (unknown interaction, unknown
    /// guild or member) and are reported as HTTP 400 by the web layer. Any
    /// other failure is answered with the generic verification error message.
    pub async fn handle(self: &Arc<Self>, event: InteractionEvent) -> Result<Disposition> {
        let invocation = match event {
            InteractionEvent::Ping => {
                return Ok(Disposition::Reply(CreateInteractionResponse::Pong))
            }
            InteractionEvent::Invocation(invocation) => invocation,
        };

        if !invocation.is_verify() {
            error!("Unknown command or button interaction: {}", invocation.name);
            return Err(BotError::UnknownInteraction {
                name: invocation.name,
            });
        }

        let member = match self
            .gateway
            .fetch_member(invocation.guild_id, invocation.user_id)
            .await
        {
            Ok(member) => member,
            Err(e @ (BotError::GuildNotFound { .. } | BotError::MemberNotFound { .. })) => {
                warn!("Lookup for {} refused: {}", invocation.user_id, e);
                return Err(e);
            }
            Err(e) => {
                error!("Failed to fetch member {}: {}", invocation.user_id, e);
                return Ok(Disposition::Reply(result_response(
                    invocation.kind,
                    messages::verification_error(),
                )));
            }
        };

        if member.has_role(self.settings.required_role) {
            info!("{} ({}) already verified.", invocation.username, invocation.user_id);
            return Ok(Disposition::Reply(CreateInteractionResponse::Message(
                messages::already_verified(),
            )));
        }

        info!(
            "User ID: {}, Username: {} requested verification",
            invocation.user_id, invocation.username
        );

        match self.settings.response_mode {
            ResponseMode::Immediate => {
                let step = self.run_verification(&invocation).await;
                Ok(Disposition::Reply(result_response(
                    invocation.kind,
                    self.step_message(step),
                )))
            }
            ResponseMode::Deferred => {
                let ack = deferred_ack(invocation.kind);
                let manager = Arc::clone(self);
                let followup = tokio::spawn(async move {
                    let step = manager.run_verification(&invocation).await;
                    if let Err(e) = manager
                        .gateway
                        .edit_original_response(&invocation.token, manager.step_edit(step))
                        .await
                    {
                        error!(
                            "Failed to edit deferred response for {}: {}",
                            invocation.user_id, e
                        );
                    }
                });
                Ok(Disposition::Deferred { ack, followup })
            }
        }
    }

    /// Run the verifying step, folding every failure into `Errored`
    pub async fn run_verification(&self, invocation: &Invocation) -> VerificationStep {
        match self.verify_and_grant(invocation).await {
            Ok(step) => step,
            Err(e) => {
                error!(
                    "Error during verification process for {}: {}",
                    invocation.user_id, e
                );
                VerificationStep::Errored
            }
        }
    }

    fn step_message(&self, step: VerificationStep) -> CreateInteractionResponseMessage {
        match step {
            VerificationStep::Granted => messages::verified(),
            VerificationStep::Rejected => messages::verification_failed(
                &self.settings.acquire_url,
                &self.settings.acquire_label,
            ),
            VerificationStep::Errored => messages::verification_error(),
        }
    }

    fn step_edit(&self, step: VerificationStep) -> EditInteractionResponse {
        match step {
            VerificationStep::Granted => messages::verified_edit(),
            VerificationStep::Rejected => messages::verification_failed_edit(
                &self.settings.acquire_url,
                &self.settings.acquire_label,
            ),
            VerificationStep::Errored => messages::verification_error_edit(),
        }
    }

    async fn verify_and_grant(&self, invocation: &Invocation) -> Result<VerificationStep> {
        let outcome = self
            .verifier
            .verify(invocation.user_id, &invocation.username)
            .await?;

        if !outcome.success {
            warn!(
                "Verification rejected for {} ({})",
                invocation.username, invocation.user_id
            );
            return Ok(VerificationStep::Rejected);
        }

        self.role_manager
            .ensure_role(
                invocation.guild_id,
                invocation.user_id,
                self.settings.required_role,
            )
            .await?;

        if self.settings.cleanup_messages {
            self.channel_manager
                .delete_mentions_of(invocation.guild_id, invocation.user_id)
                .await;
        }

        self.schedule_reward(invocation);

        info!(
            "User {} ({}) verified in guild {}",
            invocation.username, invocation.user_id, invocation.guild_id
        );
        Ok(VerificationStep::Granted)
    }

    /// Queue the reward post, if one is configured
    fn schedule_reward(&self, invocation: &Invocation) {
        let Some(reward_url) = self.settings.reward_url.clone() else {
            return;
        };
        let channel_manager = self.channel_manager.clone();
        let guild_id = invocation.guild_id;
        let user_id = invocation.user_id;

        let task_id = self.scheduler.schedule_after(
            self.settings.reward_delay,
            "reward post",
            async move {
                channel_manager
                    .send_reward_post(guild_id, user_id, &reward_url)
                    .await;
            },
        );
        debug!("Reward post for {} queued as {}", user_id, task_id);
    }
}

/// Shared verification manager type
pub type SharedVerificationManager = Arc<VerificationManager>;

pub fn create_shared_verification_manager(
    settings: VerificationSettings,
    verifier: SharedVerificationClient,
    gateway: SharedGuildGateway,
    role_manager: SharedRoleManager,
    channel_manager: SharedChannelManager,
    scheduler: Scheduler,
) -> SharedVerificationManager {
    Arc::new(VerificationManager::new(
        settings,
        verifier,
        gateway,
        role_manager,
        channel_manager,
        scheduler,
    ))
}

/// Buttons update the prompt they sit on, commands answer in the channel
fn result_response(
    kind: InteractionKind,
    message: CreateInteractionResponseMessage,
) -> CreateInteractionResponse {
    match kind {
        InteractionKind::ComponentClick => CreateInteractionResponse::UpdateMessage(message),
        _ => CreateInteractionResponse::Message(message),
    }
}

fn deferred_ack(kind: InteractionKind) -> CreateInteractionResponse {
    match kind {
        InteractionKind::ComponentClick => CreateInteractionResponse::Acknowledge,
        _ => CreateInteractionResponse::Defer(
            CreateInteractionResponseMessage::new().ephemeral(true),
        ),
    }
}
