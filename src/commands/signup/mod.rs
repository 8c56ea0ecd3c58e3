//! The `/event` command: sign-up announcements for watch parties and events.
//!
//! Running the command shows the user a form, waits up to two minutes for its
//! submission, then posts an announcement asking gardeners to sign up by reacting to
//! it and creates the matching guild scheduled event.
//!
//! - `category` - Activity categories and their static settings
//! - `forms` - Game and event forms
//! - `announcement` - `SignupRequest` built from a submission
//! - `workflow` - `SignupWorkflow`, one run of the command

mod announcement;
mod category;
mod forms;
mod workflow;

use async_trait::async_trait;
use log::{debug, info};
use thiserror::Error;

use crate::{
    commands::{
        CommandContext, CommandError, CommandHandler,
        signup::{category::Category, workflow::SignupWorkflow},
    },
    discord::{CommandDefinition, CommandOptionDefinition, OptionChoice, OptionKind, PlatformError},
};

/// Ways a sign-up can fail.
#[derive(Debug, Error)]
pub enum SignupError {
    #[error("failed to display form: {0}")]
    Display(#[source] PlatformError),
    #[error("invalid unix timestamp '{0}'")]
    TimestampParse(String),
    #[error("failed to publish announcement: {0}")]
    Publish(#[source] PlatformError),
    #[error("failed to create scheduled event: {0}")]
    EntityCreation(#[source] PlatformError),
}

/// Handler of the `/event` command.
pub struct SignupCommand;

#[async_trait]
impl CommandHandler for SignupCommand {
    fn definition(&self) -> CommandDefinition {
        CommandDefinition {
            name: "event".to_string(),
            description: "Create a new event for Gardeners to sign up".to_string(),
            options: vec![
                CommandOptionDefinition {
                    kind: OptionKind::String,
                    name: "type".to_string(),
                    description: "Type of the event".to_string(),
                    required: true,
                    choices: Category::ALL
                        .iter()
                        .map(|category| OptionChoice {
                            name: category.option_value().to_string(),
                            value: category.option_value().to_string(),
                        })
                        .collect(),
                },
                CommandOptionDefinition {
                    kind: OptionKind::Boolean,
                    name: "ping".to_string(),
                    description: "Should this message ping Gardeners or not".to_string(),
                    required: false,
                    choices: vec![],
                },
            ],
        }
    }

    async fn handle(&self, context: CommandContext) -> Result<(), CommandError> {
        let workflow = SignupWorkflow::new(context.platform, context.command);
        info!("start {} signup", workflow.category());

        let handle = workflow.start(&context.correlator).await?;
        debug!(
            "signup {} waits on correlation {}",
            &workflow.invocation_id(),
            handle.id()
        );

        Ok(())
    }
}
