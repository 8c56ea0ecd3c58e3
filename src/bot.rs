//! Bot module wiring Discord interactions to the command handlers.
//!
//! This module provides the main [`Bot`] implementation. It registers the slash
//! commands, serves the interactions endpoint and routes every incoming event.
//!
//! # Event Flow
//!
//! ```text
//! HTTP request → verify signature → decode Event → EventCorrelator::dispatch
//!                                                        │
//!                                        not consumed and a command?
//!                                                        │
//!                                                        ▼
//!                                    spawned task → CommandRegistry::dispatch
//! ```
//!
//! Every event is first offered to the correlator, so a form submission reaches the
//! command invocation waiting for it. Command handlers then run on their own task and
//! never block the endpoint.
//!
//! # Example
//!
//! ```no_run
//! let config = Config::load("config.yaml")?;
//!
//! let bot = Bot::new(config)?;
//! bot.start().await?; // Runs until Ctrl-C
//! ```

use std::sync::Arc;

use anyhow::Context;
use ed25519_dalek::VerifyingKey;
use log::{debug, error, info, warn};

use crate::{
    commands::{CommandContext, CommandRegistry},
    config::Config,
    correlator::EventCorrelator,
    discord::{self, DiscordRest, Event, FormSubmission, MessageCreate, SharedPlatform},
};

/// Reply to a form submitted after its invocation stopped waiting for it.
const FORM_EXPIRED_MESSAGE: &str = "This form has expired, please run the command again";

/// Context for processing one incoming event.
struct EventContext {
    /// The decoded interaction
    event: Event,
    /// Discord operations
    platform: SharedPlatform,
    /// Correlator the event is offered to first
    correlator: Arc<EventCorrelator<Event>>,
    /// Command handlers
    registry: Arc<CommandRegistry>,
}

/// Main bot structure.
///
/// # Thread Safety
///
/// The platform, correlator and registry are shared with every event task through
/// `Arc`. The correlator is the only mutable state and synchronizes itself.
pub struct Bot {
    /// Discord REST client
    platform: SharedPlatform,

    /// Pending waits for follow-up events, such as form submissions
    correlator: Arc<EventCorrelator<Event>>,

    /// Command handlers, built once
    registry: Arc<CommandRegistry>,

    /// Guild the commands are registered in
    guild_id: String,

    /// Key the interaction request signatures are checked against
    public_key: VerifyingKey,

    /// Address the interactions endpoint binds to
    address: String,
}

impl Bot {
    /// Creates a new Bot instance from configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration containing:
    ///   - `discord.application_id`, `discord.token`: REST API credentials
    ///   - `discord.public_key`: Interaction signature key
    ///   - `discord.guild_id`: Guild the commands are registered in
    ///   - `server.address`: Interactions endpoint address
    ///
    /// # Errors
    ///
    /// Returns an error if the public key is not a hex encoded Ed25519 key.
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let public_key = discord::parse_public_key(&config.discord.public_key)
            .context("invalid discord public key")?;

        let platform: SharedPlatform = Arc::new(DiscordRest::new(
            &config.discord.api_url,
            &config.discord.application_id,
            &config.discord.token,
        ));

        Ok(Bot {
            platform,
            correlator: Arc::new(EventCorrelator::new()),
            registry: Arc::new(CommandRegistry::with_defaults()),
            guild_id: config.discord.guild_id,
            public_key,
            address: config.server.address,
        })
    }

    /// Registers the commands and serves interactions until Ctrl-C.
    ///
    /// Pending correlations are cancelled on shutdown, so no timeout notice is sent
    /// for forms left open.
    ///
    /// # Errors
    ///
    /// Returns an error if the commands cannot be registered or the server cannot bind
    /// its address.
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let definitions = self.registry.definitions();
        self.platform
            .register_commands(&self.guild_id, &definitions)
            .await
            .context("failed to register commands")?;

        let platform = Arc::clone(&self.platform);
        let correlator = Arc::clone(&self.correlator);
        let registry = Arc::clone(&self.registry);

        // Create event handler closure
        let on_event = move |event: Event| {
            let ctx = EventContext {
                event,
                platform: Arc::clone(&platform),
                correlator: Arc::clone(&correlator),
                registry: Arc::clone(&registry),
            };
            Self::handle_event(ctx)
        };

        let router = discord::router(self.public_key, on_event);
        discord::serve(&self.address, router, shutdown_signal())
            .await
            .with_context(|| format!("failed to serve interactions on {}", &self.address))?;

        self.correlator.cancel_all();
        info!("bot stopped");

        Ok(())
    }

    /// Handles an incoming event.
    ///
    /// The event is offered to the correlator synchronously. Commands are then routed
    /// to their handler on a new task, and form submissions nobody waits for anymore
    /// get an ephemeral notice.
    fn handle_event(ctx: EventContext) {
        let EventContext {
            event,
            platform,
            correlator,
            registry,
        } = ctx;

        let resolved = correlator.dispatch(&event);
        if resolved > 0 {
            debug!("{} resolved {} correlations", event.kind(), resolved);
            return;
        }

        match event {
            Event::Command(command) => {
                tokio::spawn(async move {
                    let name = command.name.clone();
                    let context = CommandContext {
                        command,
                        platform,
                        correlator,
                    };

                    match registry.dispatch(context).await {
                        Some(Ok(())) => debug!("command {} handled", name),
                        Some(Err(e)) => error!("command {} failed: {}", name, e),
                        None => warn!("received unknown command {}", name),
                    }
                });
            }
            Event::FormSubmit(submission) => {
                tokio::spawn(Self::reply_form_expired(platform, submission));
            }
            Event::Other(kind, interaction) => {
                debug!("ignore interaction {} of type {}", &interaction.id, kind);
            }
            Event::Ping => {}
        }
    }

    async fn reply_form_expired(platform: SharedPlatform, submission: FormSubmission) {
        info!(
            "form {} from user {} has no pending invocation",
            &submission.custom_id, &submission.interaction.user_id
        );

        let notice = MessageCreate::ephemeral(FORM_EXPIRED_MESSAGE);
        if let Err(e) = platform.send_reply(&submission.interaction, &notice).await {
            error!("failed to send form expired notice: {}", e);
        }
    }
}

/// Completes on Ctrl-C.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down..."),
        Err(e) => {
            // Without a signal handler the server runs until the process is killed
            error!("failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
