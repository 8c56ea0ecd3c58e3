//! Discord integration.
//!
//! This module is the bot's only contact with Discord:
//!
//! - `models` - Interaction events and the REST payloads the bot sends
//! - `responder` - Answering an interaction through its pending HTTP request
//! - `rest` - [`DiscordRest`], the [`Platform`] implementation over the REST API v10
//! - `server` - HTTP interactions endpoint with request signature verification
//!
//! Everything above this module talks to Discord through the [`Platform`] trait, so
//! command handlers can be tested against [`MockPlatform`].

mod models;
mod responder;
mod rest;
mod server;

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

pub use crate::discord::models::{
    AllowedMentions, CommandDefinition, CommandInteraction, CommandOptionDefinition, EntityKind,
    Event, Form, FormSubmission, Interaction, MentionType, Message, MessageCreate, OptionChoice,
    OptionKind, ScheduledEventCreate, TextInput,
};
#[cfg(test)]
pub use crate::discord::responder::InteractionResponder;
pub use crate::discord::rest::DiscordRest;
pub use crate::discord::server::{parse_public_key, router, serve};

/// Errors returned by [`Platform`] calls.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Transport failure or non-success status from Discord
    #[error("discord request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// A payload could not be encoded
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    /// The interaction lacks data the call needs, for example a guild id outside a guild
    #[error("interaction has no {0}")]
    MissingContext(&'static str),
}

/// Operations the bot performs on Discord.
///
/// Interaction-bound calls (`display_form`, `send_reply`, `fetch_reply`) use the
/// interaction token and must happen within its validity window. The first answer to
/// an interaction is either `display_form` or `send_reply`, never both.
#[automock]
#[async_trait]
pub trait Platform {
    /// Displays a form (modal) to the user who triggered the interaction.
    async fn display_form(&self, interaction: &Interaction, form: &Form) -> Result<(), PlatformError>;

    /// Answers the interaction with a message.
    async fn send_reply(
        &self,
        interaction: &Interaction,
        message: &MessageCreate,
    ) -> Result<(), PlatformError>;

    /// Fetches the message sent by [`Platform::send_reply`].
    async fn fetch_reply(&self, interaction: &Interaction) -> Result<Message, PlatformError>;

    /// Reacts to a message as the bot.
    ///
    /// `emoji` is either a unicode emoji or `name:id` for a custom one.
    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), PlatformError>;

    /// Creates a guild scheduled event.
    async fn create_scheduled_event(
        &self,
        guild_id: &str,
        event: &ScheduledEventCreate,
    ) -> Result<(), PlatformError>;

    /// Posts a message in a channel, outside of any interaction.
    async fn send_message(
        &self,
        channel_id: &str,
        message: &MessageCreate,
    ) -> Result<Message, PlatformError>;

    /// Replaces the guild's slash commands with `commands`.
    async fn register_commands(
        &self,
        guild_id: &str,
        commands: &[CommandDefinition],
    ) -> Result<(), PlatformError>;
}

/// Platform handle shared between the bot and its command tasks.
pub type SharedPlatform = Arc<dyn Platform + Send + Sync>;
