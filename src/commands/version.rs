//! Handler for the `/version` command.

use async_trait::async_trait;

use crate::{
    commands::{CommandContext, CommandError, CommandHandler},
    discord::{CommandDefinition, MessageCreate},
};

/// Replies with the bot name and version.
pub struct VersionCommand;

#[async_trait]
impl CommandHandler for VersionCommand {
    fn definition(&self) -> CommandDefinition {
        CommandDefinition {
            name: "version".to_string(),
            description: "Display the bot version".to_string(),
            options: vec![],
        }
    }

    async fn handle(&self, context: CommandContext) -> Result<(), CommandError> {
        let content = format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        context
            .platform
            .send_reply(&context.command.interaction, &MessageCreate::ephemeral(&content))
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        correlator::EventCorrelator,
        discord::{CommandInteraction, Interaction, InteractionResponder, MockPlatform, PlatformError},
    };
    use std::sync::Arc;

    fn create_test_context(platform: MockPlatform) -> CommandContext {
        CommandContext {
            command: CommandInteraction {
                interaction: Interaction {
                    id: "1".to_string(),
                    application_id: "app".to_string(),
                    token: "token".to_string(),
                    guild_id: None,
                    channel_id: Some("channel".to_string()),
                    user_id: "user".to_string(),
                    responder: InteractionResponder::default(),
                },
                name: "version".to_string(),
                options: vec![],
            },
            platform: Arc::new(platform),
            correlator: Arc::new(EventCorrelator::new()),
        }
    }

    #[tokio::test]
    async fn test_version_reply() {
        let mut platform = MockPlatform::new();
        platform
            .expect_send_reply()
            .withf(|_, message| {
                message.is_ephemeral()
                    && message.content == format!("clockey v{}", env!("CARGO_PKG_VERSION"))
            })
            .times(1)
            .returning(|_, _| Ok(()));

        VersionCommand
            .handle(create_test_context(platform))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_version_reply_failure() {
        let mut platform = MockPlatform::new();
        platform
            .expect_send_reply()
            .times(1)
            .returning(|_, _| Err(PlatformError::MissingContext("interaction token")));

        let result = VersionCommand.handle(create_test_context(platform)).await;
        assert!(matches!(result, Err(CommandError::Platform(_))));
    }
}
