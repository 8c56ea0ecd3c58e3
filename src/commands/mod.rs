//! Slash command handling.
//!
//! Every command is a [`CommandHandler`] registered in the [`CommandRegistry`] when the
//! bot starts. The registry provides the definitions pushed to Discord and routes each
//! incoming [`CommandInteraction`] to its handler.
//!
//! # Architecture
//!
//! ```text
//! Command interaction
//!      │
//!      ▼
//! ┌─────────────────┐
//! │ CommandRegistry │  ← dispatch() by command name
//! └─────────────────┘
//!      │
//!      ├── version ──→ VersionCommand  (replies with the bot version)
//!      │
//!      └── event ────→ SignupCommand   (form → wait → announcement → scheduled event)
//! ```
//!
//! # Available Commands
//!
//! | Command | Options | Description |
//! |---------|---------|-------------|
//! | `/version` | None | Display the bot version |
//! | `/event` | `type` (Dota, CS, RL, Other), `ping` | Create a sign-up announcement |
//!
//! # Module Organization
//!
//! - `registry` - [`CommandRegistry`], name to handler routing
//! - `signup` - The `/event` command
//! - `version` - The `/version` command

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

mod registry;
mod signup;
mod version;

pub use crate::commands::registry::CommandRegistry;
use crate::{
    commands::signup::SignupError,
    correlator::EventCorrelator,
    discord::{CommandDefinition, CommandInteraction, Event, PlatformError, SharedPlatform},
};

/// Runtime context for command execution.
///
/// # Fields
///
/// * `command` - The invocation being handled
/// * `platform` - Discord operations
/// * `correlator` - Correlator fed with every incoming event, to wait for follow-ups
///   such as form submissions
pub struct CommandContext {
    /// Command invocation
    pub command: CommandInteraction,
    /// Discord operations
    pub platform: SharedPlatform,
    /// Shared event correlator
    pub correlator: Arc<EventCorrelator<Event>>,
}

/// Errors returned by command handlers.
///
/// The registry only reports them; answering the user is the handler's job.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Signup(#[from] SignupError),
}

/// A slash command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Definition registered with Discord. Its name routes invocations to this handler.
    fn definition(&self) -> CommandDefinition;

    /// Handles one invocation.
    ///
    /// Long waits must not block the caller: a handler that expects a follow-up event
    /// registers a correlation and returns.
    async fn handle(&self, context: CommandContext) -> Result<(), CommandError>;
}
