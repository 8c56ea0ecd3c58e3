//! One run of the sign-up command, from form display to scheduled event.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use log::{debug, error, info, warn};

use crate::{
    commands::signup::{
        SignupError,
        announcement::{ACK_EMOJI, SignupRequest},
        category::Category,
    },
    correlator::{CorrelationHandle, EventCorrelator},
    discord::{
        CommandInteraction, Event, FormSubmission, Interaction, MessageCreate, PlatformError,
        SharedPlatform,
    },
};

/// How long the user has to submit the form.
pub const FORM_TIMEOUT: Duration = Duration::from_secs(120);

/// Ephemeral reply to a submission whose time is not a Unix timestamp.
pub const INVALID_TIMESTAMP_MESSAGE: &str = "Please insert a valid Unix timestamp";

/// Message posted in the command channel when the form is never submitted.
pub const TIMEOUT_MESSAGE: &str = "Modal timed out";

/// Progress of a [`SignupWorkflow`].
///
/// ```text
/// Idle → FormRequested → Submitted → Published → EntityCreated
///   │          │             │
///   └──────────┼─────────────┴──→ Invalid
///              └──→ TimedOut
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupState {
    Idle,
    FormRequested,
    Submitted,
    TimedOut,
    Invalid,
    Published,
    EntityCreated,
}

impl SignupState {
    /// Returns `true` once the workflow cannot progress anymore.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SignupState::TimedOut | SignupState::Invalid | SignupState::EntityCreated
        )
    }
}

/// Sign-up workflow bound to one command invocation.
///
/// Clones share the same state, so the correlation callbacks and the command handler
/// observe the same progress.
#[derive(Clone)]
pub struct SignupWorkflow {
    platform: SharedPlatform,
    command: CommandInteraction,
    category: Category,
    ping: bool,
    state: Arc<Mutex<SignupState>>,
}

impl SignupWorkflow {
    /// Creates the workflow for a `/event` invocation.
    ///
    /// The `type` option selects the category, the `ping` option defaults to `true`.
    pub fn new(platform: SharedPlatform, command: CommandInteraction) -> Self {
        let category = Category::from_option(command.option_str("type").unwrap_or_default());
        let ping = command.option_bool("ping").unwrap_or(true);

        SignupWorkflow {
            platform,
            command,
            category,
            ping,
            state: Arc::new(Mutex::new(SignupState::Idle)),
        }
    }

    /// Id of the command interaction this workflow runs for.
    pub fn invocation_id(&self) -> &str {
        &self.command.interaction.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn state(&self) -> SignupState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, next: SignupState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(
            "signup {} state {:?} -> {:?}",
            &self.command.interaction.id, *state, next
        );
        *state = next;

        if next.is_terminal() {
            info!("signup {} ended {:?}", &self.command.interaction.id, next);
        }
    }

    /// Displays the form and starts waiting for its submission.
    ///
    /// Returns once the wait is registered; the rest of the workflow runs when the
    /// submission arrives or [`FORM_TIMEOUT`] elapses.
    ///
    /// # Errors
    ///
    /// Returns [`SignupError::Display`] if the form could not be displayed. No wait
    /// is registered in that case.
    pub async fn start(
        &self,
        correlator: &EventCorrelator<Event>,
    ) -> Result<CorrelationHandle<Event>, SignupError> {
        let interaction = &self.command.interaction;
        let form = self.category.profile().form.build(&interaction.id);

        if let Err(e) = self.platform.display_form(interaction, &form).await {
            self.transition(SignupState::Invalid);
            return Err(SignupError::Display(e));
        }
        self.transition(SignupState::FormRequested);
        info!(
            "waiting for {} form {} from user {}",
            self.category, &form.custom_id, &interaction.user_id
        );

        let custom_id = form.custom_id;
        let user_id = interaction.user_id.clone();
        let on_match = self.clone();
        let on_timeout = self.clone();

        let handle = correlator.wait(
            move |event| {
                matches!(
                    event,
                    Event::FormSubmit(submission)
                        if submission.custom_id == custom_id
                            && submission.interaction.user_id == user_id
                )
            },
            FORM_TIMEOUT,
            move |event| async move {
                if let Event::FormSubmit(submission) = event {
                    on_match.on_submission(submission).await;
                }
            },
            move || async move { on_timeout.on_timeout().await },
        );

        Ok(handle)
    }

    /// Publishes the sign-up described by the submitted form.
    async fn on_submission(&self, submission: FormSubmission) {
        self.transition(SignupState::Submitted);
        let interaction = &submission.interaction;

        let request = match SignupRequest::from_submission(self.category, self.ping, &submission) {
            Ok(request) => request,
            Err(e) => {
                warn!("rejected submission {}: {}", &submission.custom_id, e);
                let notice = MessageCreate::ephemeral(INVALID_TIMESTAMP_MESSAGE);
                if let Err(e) = self.platform.send_reply(interaction, &notice).await {
                    error!("failed to send invalid timestamp notice: {}", e);
                }
                self.transition(SignupState::Invalid);
                return;
            }
        };

        if let Err(e) = self.publish(interaction, &request).await {
            error!("{}", e);
        }
        self.transition(SignupState::Published);

        match self.create_entity(interaction, &request).await {
            Ok(()) => {
                info!("{} signup '{}' created", request.category, &request.display_name);
                self.transition(SignupState::EntityCreated);
            }
            Err(e) => error!("{}", e),
        }
    }

    /// Replies with the announcement and adds the sign-up reaction to it.
    async fn publish(
        &self,
        interaction: &Interaction,
        request: &SignupRequest,
    ) -> Result<(), SignupError> {
        self.platform
            .send_reply(interaction, &request.announcement())
            .await
            .map_err(SignupError::Publish)?;

        let reply = self
            .platform
            .fetch_reply(interaction)
            .await
            .map_err(SignupError::Publish)?;

        self.platform
            .add_reaction(&reply.channel_id, &reply.id, ACK_EMOJI)
            .await
            .map_err(SignupError::Publish)
    }

    async fn create_entity(
        &self,
        interaction: &Interaction,
        request: &SignupRequest,
    ) -> Result<(), SignupError> {
        let guild_id = interaction
            .guild_id
            .as_deref()
            .ok_or(SignupError::EntityCreation(PlatformError::MissingContext("guild id")))?;

        self.platform
            .create_scheduled_event(guild_id, &request.scheduled_event())
            .await
            .map_err(SignupError::EntityCreation)
    }

    async fn on_timeout(&self) {
        self.transition(SignupState::TimedOut);

        let Some(channel_id) = self.command.interaction.channel_id.as_deref() else {
            error!(
                "signup {} timed out outside of a channel",
                &self.command.interaction.id
            );
            return;
        };

        if let Err(e) = self
            .platform
            .send_message(channel_id, &MessageCreate::text(TIMEOUT_MESSAGE))
            .await
        {
            error!("failed to send timeout notice: {}", e);
        }
    }
}

impl fmt::Debug for SignupWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupWorkflow")
            .field("invocation", &self.command.interaction.id)
            .field("category", &self.category)
            .field("ping", &self.ping)
            .field("state", &self.state())
            .finish()
    }
}
