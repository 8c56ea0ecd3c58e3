//! Discord payloads exchanged by the bot.
//!
//! Incoming interactions are decoded into [`Event`] values. Outgoing structures
//! ([`Form`], [`MessageCreate`], [`ScheduledEventCreate`], [`CommandDefinition`])
//! serialize to the JSON shapes of the Discord REST API v10.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::discord::responder::InteractionResponder;

/// Message flag hiding a reply from everyone but the invoking user.
const EPHEMERAL_FLAG: u64 = 1 << 6;

/// Interaction types, see <https://discord.com/developers/docs/interactions/receiving-and-responding#interaction-object-interaction-type>
const INTERACTION_PING: u8 = 1;
const INTERACTION_APPLICATION_COMMAND: u8 = 2;
const INTERACTION_MODAL_SUBMIT: u8 = 5;

/// Interaction response types
const RESPONSE_PONG: u8 = 1;
const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
const RESPONSE_MODAL: u8 = 9;

/// Component types
const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_TEXT_INPUT: u8 = 4;

/// Text input style for single-line inputs
const TEXT_INPUT_SHORT: u8 = 1;

/// Guild scheduled event privacy level, the only one Discord accepts.
const PRIVACY_GUILD_ONLY: u8 = 2;

/// An event delivered to the bot.
#[derive(Debug, Clone)]
pub enum Event {
    /// Endpoint health check sent by Discord
    Ping,
    /// Slash command invocation
    Command(CommandInteraction),
    /// Submitted form (modal)
    FormSubmit(FormSubmission),
    /// Any other interaction kind (components, autocomplete...), with its raw type
    Other(u8, Interaction),
}

impl Event {
    /// Decodes an interaction payload.
    ///
    /// # Arguments
    ///
    /// * `body` - Raw JSON body of the interaction
    /// * `responder` - Channel answering the HTTP request the interaction came with
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a valid interaction.
    pub fn decode(body: &[u8], responder: InteractionResponder) -> Result<Self, serde_json::Error> {
        let raw: RawInteraction = serde_json::from_slice(body)?;
        let kind = raw.kind;
        if kind == INTERACTION_PING {
            return Ok(Event::Ping);
        }

        let data = raw.data.clone();
        let interaction = raw.into_interaction(responder);

        let event = match kind {
            INTERACTION_APPLICATION_COMMAND => {
                let data: CommandData = serde_json::from_value(data)?;
                Event::Command(CommandInteraction {
                    interaction,
                    name: data.name,
                    options: data.options,
                })
            }
            INTERACTION_MODAL_SUBMIT => {
                let data: ModalSubmitData = serde_json::from_value(data)?;
                let values = data
                    .components
                    .into_iter()
                    .flat_map(|row| row.components)
                    .map(|input| (input.custom_id, input.value.unwrap_or_default()))
                    .collect();
                Event::FormSubmit(FormSubmission {
                    interaction,
                    custom_id: data.custom_id,
                    values,
                })
            }
            other => Event::Other(other, interaction),
        };

        Ok(event)
    }

    /// Short name of the event kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Ping => "ping",
            Event::Command(_) => "command",
            Event::FormSubmit(_) => "form submission",
            Event::Other(_, _) => "other",
        }
    }
}

/// Context shared by every interaction kind.
#[derive(Debug, Clone)]
pub struct Interaction {
    /// Interaction id
    pub id: String,
    /// Id of the application the interaction is for
    pub application_id: String,
    /// Continuation token, valid for 15 minutes
    pub token: String,
    /// Guild the interaction was sent from
    pub guild_id: Option<String>,
    /// Channel the interaction was sent from
    pub channel_id: Option<String>,
    /// User who triggered the interaction
    pub user_id: String,
    /// Answers the pending HTTP request, if it is still open
    pub responder: InteractionResponder,
}

/// A slash command invocation.
#[derive(Debug, Clone)]
pub struct CommandInteraction {
    /// Interaction context
    pub interaction: Interaction,
    /// Command name
    pub name: String,
    /// Options supplied by the user
    pub options: Vec<CommandOption>,
}

impl CommandInteraction {
    /// Returns the string value of an option, if present.
    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(Value::as_str)
    }

    /// Returns the boolean value of an option, if present.
    pub fn option_bool(&self, name: &str) -> Option<bool> {
        self.option(name).and_then(Value::as_bool)
    }

    fn option(&self, name: &str) -> Option<&Value> {
        self.options
            .iter()
            .find(|option| option.name == name)
            .map(|option| &option.value)
    }
}

/// A single option value of a slash command invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    /// Option name
    pub name: String,
    /// Option value, typed according to the option definition
    #[serde(default)]
    pub value: Value,
}

/// A submitted form.
#[derive(Debug, Clone)]
pub struct FormSubmission {
    /// Interaction context
    pub interaction: Interaction,
    /// Custom id of the submitted form
    pub custom_id: String,
    /// Field values indexed by field custom id
    pub values: HashMap<String, String>,
}

impl FormSubmission {
    /// Returns the text of a field, or an empty string if the field is missing.
    pub fn text(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct RawInteraction {
    id: String,
    application_id: String,
    #[serde(rename = "type")]
    kind: u8,
    token: String,
    guild_id: Option<String>,
    channel_id: Option<String>,
    member: Option<RawMember>,
    user: Option<RawUser>,
    #[serde(default)]
    data: Value,
}

impl RawInteraction {
    fn into_interaction(self, responder: InteractionResponder) -> Interaction {
        // Guild interactions carry the user in `member`, DMs in `user`
        let user_id = self
            .member
            .map(|member| member.user)
            .or(self.user)
            .map(|user| user.id)
            .unwrap_or_default();

        Interaction {
            id: self.id,
            application_id: self.application_id,
            token: self.token,
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            user_id,
            responder,
        }
    }
}

#[derive(Deserialize)]
struct RawMember {
    user: RawUser,
}

#[derive(Deserialize)]
struct RawUser {
    id: String,
}

#[derive(Deserialize)]
struct CommandData {
    name: String,
    #[serde(default)]
    options: Vec<CommandOption>,
}

#[derive(Deserialize)]
struct ModalSubmitData {
    custom_id: String,
    #[serde(default)]
    components: Vec<ModalSubmitRow>,
}

#[derive(Deserialize)]
struct ModalSubmitRow {
    #[serde(default)]
    components: Vec<ModalSubmitInput>,
}

#[derive(Deserialize)]
struct ModalSubmitInput {
    custom_id: String,
    value: Option<String>,
}

/// A form displayed to a user as a modal.
///
/// Each input is rendered on its own row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Form {
    /// Identifier echoed back in the submission
    pub custom_id: String,
    /// Modal title
    pub title: String,
    /// Inputs, in display order
    #[serde(rename = "components", serialize_with = "serialize_rows")]
    pub inputs: Vec<TextInput>,
}

/// A single-line text input of a [`Form`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextInput {
    #[serde(rename = "type")]
    kind: u8,
    /// Field identifier
    pub custom_id: String,
    style: u8,
    /// Label shown above the input
    pub label: String,
    /// Greyed-out hint shown in the empty input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Whether the form can be submitted without this field
    pub required: bool,
}

impl TextInput {
    /// Creates a required single-line input.
    pub fn short(custom_id: &str, label: &str, placeholder: Option<&str>) -> Self {
        TextInput {
            kind: COMPONENT_TEXT_INPUT,
            custom_id: custom_id.to_owned(),
            style: TEXT_INPUT_SHORT,
            label: label.to_owned(),
            placeholder: placeholder.map(str::to_owned),
            required: true,
        }
    }
}

#[derive(Serialize)]
struct ActionRow<'a> {
    #[serde(rename = "type")]
    kind: u8,
    components: [&'a TextInput; 1],
}

#[allow(clippy::ptr_arg)]
fn serialize_rows<S: Serializer>(inputs: &Vec<TextInput>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(inputs.iter().map(|input| ActionRow {
        kind: COMPONENT_ACTION_ROW,
        components: [input],
    }))
}

/// Mention kinds Discord may turn into notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionType {
    Roles,
    Users,
}

/// Restricts which mentions in a message actually notify.
///
/// An empty `parse` list renders every mention as plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedMentions {
    /// Mention kinds parsed from the content
    pub parse: Vec<MentionType>,
}

/// Message to post, either as an interaction reply or in a channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageCreate {
    /// Text content
    pub content: String,
    /// Mention restriction, Discord's default (parse everything) when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_mentions: Option<AllowedMentions>,
    /// Message flags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl MessageCreate {
    /// Plain message.
    pub fn text(content: &str) -> Self {
        MessageCreate {
            content: content.to_owned(),
            allowed_mentions: None,
            flags: None,
        }
    }

    /// Reply only visible to the invoking user.
    pub fn ephemeral(content: &str) -> Self {
        MessageCreate {
            flags: Some(EPHEMERAL_FLAG),
            ..Self::text(content)
        }
    }

    /// Returns `true` if the message is only visible to the invoking user.
    pub fn is_ephemeral(&self) -> bool {
        self.flags.is_some_and(|flags| flags & EPHEMERAL_FLAG != 0)
    }
}

/// A message as returned by Discord.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Message id
    pub id: String,
    /// Channel the message was posted in
    pub channel_id: String,
    /// Text content
    #[serde(default)]
    pub content: String,
}

/// Where a guild scheduled event takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Hosted in a stage channel
    StageInstance,
    /// Hosted in a voice channel
    Voice,
}

impl EntityKind {
    /// Discord `entity_type` value.
    pub fn api_value(self) -> u8 {
        match self {
            EntityKind::StageInstance => 1,
            EntityKind::Voice => 2,
        }
    }
}

impl Serialize for EntityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.api_value())
    }
}

/// Guild scheduled event creation payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledEventCreate {
    /// Event name
    pub name: String,
    /// Start time, serialized as ISO 8601
    pub scheduled_start_time: DateTime<Utc>,
    /// Stage or voice channel hosting the event
    pub channel_id: String,
    privacy_level: u8,
    /// Hosting kind
    #[serde(rename = "entity_type")]
    pub entity_kind: EntityKind,
}

impl ScheduledEventCreate {
    /// Creates a guild-only scheduled event hosted in `channel_id`.
    pub fn new(
        name: &str,
        scheduled_start_time: DateTime<Utc>,
        channel_id: &str,
        entity_kind: EntityKind,
    ) -> Self {
        ScheduledEventCreate {
            name: name.to_owned(),
            scheduled_start_time,
            channel_id: channel_id.to_owned(),
            privacy_level: PRIVACY_GUILD_ONLY,
            entity_kind,
        }
    }
}

/// Option types used by the bot's commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
    Boolean,
}

impl Serialize for OptionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(match self {
            OptionKind::String => 3,
            OptionKind::Boolean => 5,
        })
    }
}

/// A predefined value of a string option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionChoice {
    /// Name shown to the user
    pub name: String,
    /// Value sent back in the interaction
    pub value: String,
}

/// Definition of one slash command option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOptionDefinition {
    #[serde(rename = "type")]
    pub kind: OptionKind,
    pub name: String,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
}

/// Definition of a slash command, as registered with Discord.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOptionDefinition>,
}

/// Answer to an interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl InteractionResponse {
    /// Answer to a [`Event::Ping`].
    pub fn pong() -> Self {
        InteractionResponse {
            kind: RESPONSE_PONG,
            data: None,
        }
    }

    /// Displays a form to the user.
    pub fn modal(form: &Form) -> Result<Self, serde_json::Error> {
        Ok(InteractionResponse {
            kind: RESPONSE_MODAL,
            data: Some(serde_json::to_value(form)?),
        })
    }

    /// Replies with a message.
    pub fn message(message: &MessageCreate) -> Result<Self, serde_json::Error> {
        Ok(InteractionResponse {
            kind: RESPONSE_CHANNEL_MESSAGE,
            data: Some(serde_json::to_value(message)?),
        })
    }
}
