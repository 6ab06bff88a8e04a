use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Discord bot that verifies members against an external service and grants them a role
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// HTTP port for the interactions endpoint (overrides PORT)
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// Answer interactions directly or acknowledge first and edit later
    #[arg(long, value_enum)]
    response_mode: Option<ResponseMode>,

    /// Delete channel messages mentioning a member once they are verified
    #[arg(long)]
    cleanup: bool,

    /// Do not serve the built-in /verify endpoint
    #[arg(long)]
    no_verify_stub: bool,

    /// Seconds between a successful verification and the reward post
    #[arg(long)]
    reward_delay_secs: Option<u64>,
}

impl Args {
    fn apply(&self, config: &mut BotConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(mode) = self.response_mode {
            config.response_mode = mode;
        }
        if self.cleanup {
            config.cleanup_messages = true;
        }
        if self.no_verify_stub {
            config.verify_stub = false;
        }
        if let Some(secs) = self.reward_delay_secs {
            config.reward_delay = Duration::from_secs(secs);
        }
    }
}

mod config;
mod error;
mod events;
mod guild;
mod logging;
mod managers;
mod messages;
mod models;
mod scheduler;
#[cfg(test)]
mod testing;
mod verification;
mod web;

use config::{BotConfig, ResponseMode, SharedBotConfig};
use error::BotError;
use events::handle_member_add;
use guild::{SerenityGateway, SharedGuildGateway};
use managers::{
    create_shared_channel_manager, create_shared_role_manager,
    create_shared_verification_manager, SharedChannelManager, VerificationSettings,
};
use scheduler::Scheduler;
use verification::HttpVerificationClient;

type Error = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
pub struct Data {
    pub channel_manager: SharedChannelManager,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::GuildMemberAddition { new_member } = event {
        if let Err(e) = handle_member_add(ctx, new_member, data).await {
            error!("Failed to handle new member: {}", e);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();
    logging::init();

    let mut config = BotConfig::from_env()?;
    args.apply(&mut config);
    let config: SharedBotConfig = Arc::new(config);

    let signature_verifier = Arc::new(
        serenity::interactions_endpoint::Verifier::try_new(config.public_key).map_err(|e| {
            BotError::InvalidConfig {
                key: "PUBLIC_KEY".to_string(),
                message: format!("{:?}", e),
            }
        })?,
    );

    info!(
        "Application ID: {} (response mode {:?}, cleanup {})",
        config.application_id, config.response_mode, config.cleanup_messages
    );
    if config.reward_url.is_none() {
        info!("REWARD_URL not set, reward posts are disabled");
    }

    let scheduler = Scheduler::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let setup_config = config.clone();
    let setup_scheduler = scheduler.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| {
                Box::pin(async move {
                    error!("Framework error: {}", error);
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, _framework| {
            let config = setup_config.clone();
            let scheduler = setup_scheduler.clone();
            let signature_verifier = signature_verifier.clone();
            let shutdown_rx = shutdown_rx.clone();

            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let gateway: SharedGuildGateway = Arc::new(SerenityGateway::new(
                    ctx.http.clone(),
                    ctx.cache.clone(),
                    config.application_id,
                ));
                let verifier = Arc::new(HttpVerificationClient::new(config.verify_url()));
                info!("Verification requests go to {}", verifier.url());

                let role_manager = create_shared_role_manager(gateway.clone());
                let channel_manager =
                    create_shared_channel_manager(gateway.clone(), config.channel);
                let verification_manager = create_shared_verification_manager(
                    VerificationSettings::from(config.as_ref()),
                    verifier,
                    gateway,
                    role_manager,
                    channel_manager.clone(),
                    scheduler,
                );

                let web_config = web::WebServerConfig::from_config(&config);
                let router = web::build_router(
                    web::AppState {
                        verification_manager,
                    },
                    signature_verifier,
                    web_config.verify_stub,
                );

                tokio::spawn(async move {
                    if let Err(e) = web::start_web_server(web_config, router, shutdown_rx).await {
                        error!("Web server error: {}", e);
                    }
                });

                Ok(Data { channel_manager })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS | serenity::GatewayIntents::GUILD_MEMBERS;

    let mut client = serenity::ClientBuilder::new(&config.bot_token, intents)
        .framework(framework)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        info!("Shutting down...");
        let _ = shutdown_tx.send(true);
        let pending = scheduler.pending_count();
        if pending > 0 {
            info!("Dropping {} pending reward posts", pending);
        }
        scheduler.cancel_all();
        shard_manager.shutdown_all().await;
    });

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        let err_str = e.to_string();
        if err_str.contains("Disallowed") || err_str.contains("intents") {
            error!("Failed to start bot: {}", e);
            error!("Enable the GUILD_MEMBERS privileged intent at https://discord.com/developers/applications -> Your App -> Bot");
            return Err(anyhow::anyhow!("Disallowed gateway intents: GUILD_MEMBERS"));
        }
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}
