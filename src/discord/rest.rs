//! HTTP client for the Discord REST API.
//!
//! This module provides [`DiscordRest`], the production [`Platform`] implementation.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, StatusCode};

use crate::discord::{
    Platform, PlatformError,
    models::{
        CommandDefinition, Form, Interaction, InteractionResponse, Message, MessageCreate,
        ScheduledEventCreate,
    },
};

/// Attempts at fetching an interaction's original response before giving up.
const FETCH_REPLY_ATTEMPTS: u32 = 5;

/// Delay before the first fetch retry, doubled after each attempt.
const FETCH_REPLY_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Discord REST API client authenticated as the bot.
///
/// # Examples
///
/// ```no_run
/// let rest = DiscordRest::new("https://discord.com/api/v10", "application_id", "bot_token");
/// let message = rest.send_message("channel_id", &MessageCreate::text("hello")).await.unwrap();
/// println!("Sent: {:?}", message);
/// ```
pub struct DiscordRest {
    /// API base url, including the version
    api_url: String,
    /// Application the bot belongs to
    application_id: String,
    /// Bot token
    token: String,
    /// HTTP client
    client: Client,
    /// First backoff delay of [`Platform::fetch_reply`]
    retry_delay: Duration,
}

impl DiscordRest {
    /// Create a new [DiscordRest].
    ///
    /// # Arguments
    ///
    /// * `api_url` - Base URL of the API, e.g. `https://discord.com/api/v10`.
    /// * `application_id` - Id of the bot application.
    /// * `token` - Bot token used in the `Authorization` header.
    pub fn new(api_url: &str, application_id: &str, token: &str) -> Self {
        DiscordRest {
            api_url: api_url.trim_end_matches('/').to_string(),
            application_id: application_id.to_string(),
            token: token.to_string(),
            client: Client::new(),
            retry_delay: FETCH_REPLY_RETRY_DELAY,
        }
    }

    #[cfg(test)]
    fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("Bot {}", self.token))
    }

    /// Sends the first answer to an interaction.
    ///
    /// The answer goes back through the interaction's HTTP request while it is still
    /// waiting, and through `/interactions/{id}/{token}/callback` otherwise.
    async fn respond(
        &self,
        interaction: &Interaction,
        response: InteractionResponse,
    ) -> Result<(), PlatformError> {
        let response = match interaction.responder.respond(response) {
            Ok(()) => {
                debug!("answered interaction {} over its request", &interaction.id);
                return Ok(());
            }
            Err(response) => response,
        };

        let url = format!(
            "{}/interactions/{}/{}/callback",
            &self.api_url, &interaction.id, &interaction.token
        );
        debug!("request POST {}/interactions/{}/<token>/callback", &self.api_url, &interaction.id);

        self.client
            .post(&url)
            .json(&response)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

#[async_trait]
impl Platform for DiscordRest {
    async fn display_form(&self, interaction: &Interaction, form: &Form) -> Result<(), PlatformError> {
        info!("display form {} to user {}", &form.custom_id, &interaction.user_id);
        self.respond(interaction, InteractionResponse::modal(form)?).await
    }

    async fn send_reply(
        &self,
        interaction: &Interaction,
        message: &MessageCreate,
    ) -> Result<(), PlatformError> {
        info!("reply to interaction {}", &interaction.id);
        self.respond(interaction, InteractionResponse::message(message)?).await
    }

    /// Request `GET /webhooks/{application_id}/{token}/messages/@original`.
    ///
    /// The interaction token authenticates this call, so it works for as long as the
    /// token is valid (15 minutes).
    ///
    /// A reply answered over the interaction's HTTP request only exists once Discord
    /// has read the response body, so a 404 is retried with exponential backoff.
    async fn fetch_reply(&self, interaction: &Interaction) -> Result<Message, PlatformError> {
        let url = format!(
            "{}/webhooks/{}/{}/messages/@original",
            &self.api_url, &interaction.application_id, &interaction.token
        );

        let mut delay = self.retry_delay;
        let mut attempt = 1;
        let response = loop {
            debug!(
                "request original response of interaction {} (attempt {})",
                &interaction.id, attempt
            );
            let response = self.client.get(&url).send().await?;

            if response.status() != StatusCode::NOT_FOUND || attempt == FETCH_REPLY_ATTEMPTS {
                break response;
            }

            warn!(
                "original response of interaction {} not found yet, retry in {:?}",
                &interaction.id, delay
            );
            tokio::time::sleep(delay).await;
            delay *= 2;
            attempt += 1;
        };

        let message: Message = response.error_for_status()?.json().await?;

        debug!("response for interaction {} -> {:?}", &interaction.id, &message);

        Ok(message)
    }

    /// Request `PUT /channels/{channel_id}/messages/{message_id}/reactions/{emoji}/@me`.
    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        // Custom emojis are sent as `name:id` with the colon percent-encoded
        let url = format!(
            "{}/channels/{}/messages/{}/reactions/{}/@me",
            &self.api_url,
            channel_id,
            message_id,
            emoji.replace(':', "%3A")
        );
        info!("react to message {} in channel {}", message_id, channel_id);
        debug!("request PUT {}", &url);

        self.authorized(self.client.put(&url))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    /// Request `POST /guilds/{guild_id}/scheduled-events`.
    async fn create_scheduled_event(
        &self,
        guild_id: &str,
        event: &ScheduledEventCreate,
    ) -> Result<(), PlatformError> {
        let url = format!("{}/guilds/{}/scheduled-events", &self.api_url, guild_id);
        info!("create scheduled event '{}' in guild {}", &event.name, guild_id);
        debug!("request POST {} with {:?}", &url, event);

        self.authorized(self.client.post(&url))
            .json(event)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    /// Request `POST /channels/{channel_id}/messages`.
    async fn send_message(
        &self,
        channel_id: &str,
        message: &MessageCreate,
    ) -> Result<Message, PlatformError> {
        let url = format!("{}/channels/{}/messages", &self.api_url, channel_id);
        info!("send message to channel {}", channel_id);

        let message: Message = self
            .authorized(self.client.post(&url))
            .json(message)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("response from {} -> {:?}", &url, &message);

        Ok(message)
    }

    /// Request `PUT /applications/{application_id}/guilds/{guild_id}/commands`.
    ///
    /// This is a bulk overwrite: commands missing from `commands` are deleted.
    async fn register_commands(
        &self,
        guild_id: &str,
        commands: &[CommandDefinition],
    ) -> Result<(), PlatformError> {
        let url = format!(
            "{}/applications/{}/guilds/{}/commands",
            &self.api_url, &self.application_id, guild_id
        );
        info!("register {} commands in guild {}", commands.len(), guild_id);

        self.authorized(self.client.put(&url))
            .json(commands)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
