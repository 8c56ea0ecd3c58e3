//! Forms the user fills in after invoking the command.

use crate::discord::{Form, TextInput};

/// Field holding the game or event name.
pub const NAME_FIELD: &str = "name";
/// Field holding the start time as a Unix timestamp.
pub const TIME_FIELD: &str = "time";
/// Field holding the series format of a game.
pub const SERIES_FIELD: &str = "series_length";
/// Field holding the duration of an event.
pub const HOURS_FIELD: &str = "hours";

const TIME_PLACEHOLDER: &str = "Insert Unix time here";

/// The two form layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormTemplate {
    /// Match of a team: name, time and series format
    Game,
    /// Free-form event: name, time and duration
    Event,
}

impl FormTemplate {
    fn base_id(self) -> &'static str {
        match self {
            FormTemplate::Game => "game_modal",
            FormTemplate::Event => "event_modal",
        }
    }

    /// Builds the form for one command invocation.
    ///
    /// The custom id is suffixed with `invocation_id` so that a submission can only
    /// be correlated with the invocation that displayed the form.
    pub fn build(self, invocation_id: &str) -> Form {
        let custom_id = format!("{}:{}", self.base_id(), invocation_id);

        match self {
            FormTemplate::Game => Form {
                custom_id,
                title: "Game information".to_string(),
                inputs: vec![
                    TextInput::short(
                        NAME_FIELD,
                        "What's the name of the game?",
                        Some("OG vs <opp team name>"),
                    ),
                    TextInput::short(
                        TIME_FIELD,
                        "What's the scheduled start time for the game?",
                        Some(TIME_PLACEHOLDER),
                    ),
                    TextInput::short(
                        SERIES_FIELD,
                        "What's the series format of the game?",
                        Some("Bo1 / Bo2 / Bo3 / Bo5 / Bo7"),
                    ),
                ],
            },
            FormTemplate::Event => Form {
                custom_id,
                title: "Event information".to_string(),
                inputs: vec![
                    TextInput::short(NAME_FIELD, "What's the name of the event?", None),
                    TextInput::short(
                        TIME_FIELD,
                        "What's the scheduled start time for the event?",
                        Some(TIME_PLACEHOLDER),
                    ),
                    TextInput::short(HOURS_FIELD, "How many hours is this event?", None),
                ],
            },
        }
    }
}
