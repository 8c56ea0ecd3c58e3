//! Command name to handler routing.

use std::{collections::HashMap, sync::Arc};

use log::{debug, warn};

use crate::{
    commands::{
        CommandContext, CommandError, CommandHandler, signup::SignupCommand, version::VersionCommand,
    },
    discord::CommandDefinition,
};

/// Registry of the bot's slash commands, built once at startup.
///
/// # Examples
///
/// ```no_run
/// let registry = CommandRegistry::with_defaults();
/// platform.register_commands("guild_id", &registry.definitions()).await?;
///
/// if let Some(result) = registry.dispatch(context).await {
///     result?;
/// }
/// ```
#[derive(Default)]
pub struct CommandRegistry {
    /// Handlers indexed by command name
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every command of the bot.
    pub fn with_defaults() -> Self {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(VersionCommand));
        registry.register(Arc::new(SignupCommand));
        registry
    }

    /// Adds a handler under the name of its definition, replacing any handler
    /// previously registered under that name.
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        let name = handler.definition().name;
        if self.handlers.insert(name.clone(), handler).is_some() {
            warn!("command {} registered twice, keeping the last handler", name);
        }
    }

    /// Definitions of every registered command, sorted by name.
    pub fn definitions(&self) -> Vec<CommandDefinition> {
        let mut definitions: Vec<CommandDefinition> = self
            .handlers
            .values()
            .map(|handler| handler.definition())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Routes an invocation to its handler.
    ///
    /// # Returns
    ///
    /// * `Some(result)` - Result of the handler
    /// * `None` - No handler is registered for the command name
    pub async fn dispatch(&self, context: CommandContext) -> Option<Result<(), CommandError>> {
        let handler = Arc::clone(self.handlers.get(&context.command.name)?);
        debug!(
            "dispatch command {} from user {}",
            &context.command.name, &context.command.interaction.user_id
        );

        Some(handler.handle(context).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        correlator::EventCorrelator,
        discord::{CommandInteraction, Interaction, InteractionResponder, MockPlatform},
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCommand {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CommandHandler for CountingCommand {
        fn definition(&self) -> CommandDefinition {
            CommandDefinition {
                name: self.name.to_string(),
                description: "counts".to_string(),
                options: vec![],
            }
        }

        async fn handle(&self, _context: CommandContext) -> Result<(), CommandError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn create_test_context(name: &str) -> CommandContext {
        CommandContext {
            command: CommandInteraction {
                interaction: Interaction {
                    id: "1".to_string(),
                    application_id: "app".to_string(),
                    token: "token".to_string(),
                    guild_id: Some("guild".to_string()),
                    channel_id: Some("channel".to_string()),
                    user_id: "user".to_string(),
                    responder: InteractionResponder::default(),
                },
                name: name.to_string(),
                options: vec![],
            },
            platform: Arc::new(MockPlatform::new()),
            correlator: Arc::new(EventCorrelator::new()),
        }
    }

    #[test]
    fn test_default_definitions() {
        let names: Vec<String> = CommandRegistry::with_defaults()
            .definitions()
            .into_iter()
            .map(|definition| definition.name)
            .collect();
        assert_eq!(names, vec!["event", "version"]);
    }

    #[tokio::test]
    async fn test_dispatch_by_name() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(CountingCommand {
            name: "count",
            calls: Arc::clone(&calls),
        }));

        let result = registry.dispatch(create_test_context("count")).await;
        assert!(matches!(result, Some(Ok(()))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_command() {
        let registry = CommandRegistry::new();
        assert!(registry.dispatch(create_test_context("missing")).await.is_none());
    }

    #[tokio::test]
    async fn test_register_replaces_handler() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(CountingCommand {
            name: "count",
            calls: Arc::clone(&first),
        }));
        registry.register(Arc::new(CountingCommand {
            name: "count",
            calls: Arc::clone(&second),
        }));

        registry.dispatch(create_test_context("count")).await;
        assert_eq!(registry.definitions().len(), 1);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
