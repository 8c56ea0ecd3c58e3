//! Sign-up request built from a submitted form, and what gets published for it.

use chrono::{DateTime, Utc};
use log::warn;

use crate::{
    commands::signup::{
        SignupError,
        category::{Category, HoursSource, hours_for_series},
        forms::{HOURS_FIELD, NAME_FIELD, SERIES_FIELD, TIME_FIELD},
    },
    discord::{AllowedMentions, EntityKind, FormSubmission, MentionType, MessageCreate, ScheduledEventCreate},
};

/// Role notified by the announcement.
pub const GARDENER_ROLE_ID: &str = "720253636797530203";
/// Custom emoji users react with to sign up, as `name:id`.
pub const ACK_EMOJI: &str = "OGpeepoYes:730890894814740541";

/// Everything needed to publish a sign-up and schedule its event.
#[derive(Debug, Clone, PartialEq)]
pub struct SignupRequest {
    /// Category the command was run with
    pub category: Category,
    /// Category label and submitted name, e.g. `Rocket League - OG vs Tundra`
    pub display_name: String,
    /// Start time in seconds since the Unix epoch
    pub scheduled_time: i64,
    /// Hours of work, empty when the series format is not recognised
    pub duration_hours: String,
    pub announce_channel: &'static str,
    pub entity_kind: EntityKind,
    /// Whether mentions in the announcement notify
    pub ping: bool,
}

impl SignupRequest {
    /// Builds the request from a submitted form.
    ///
    /// # Errors
    ///
    /// Returns [`SignupError::TimestampParse`] if the time field is not an integer
    /// number of seconds in chrono's supported range.
    pub fn from_submission(
        category: Category,
        ping: bool,
        submission: &FormSubmission,
    ) -> Result<Self, SignupError> {
        let profile = category.profile();

        let time = submission.text(TIME_FIELD);
        let scheduled_time = time
            .parse::<i64>()
            .ok()
            .filter(|seconds| DateTime::from_timestamp(*seconds, 0).is_some())
            .ok_or_else(|| SignupError::TimestampParse(time.to_string()))?;

        let duration_hours = match profile.hours {
            HoursSource::SeriesFormat => {
                let series_length = submission.text(SERIES_FIELD);
                let hours = hours_for_series(series_length);
                if hours.is_empty() {
                    warn!(
                        "unrecognised series format '{}', announcing without hours",
                        series_length
                    );
                }
                hours.to_string()
            }
            HoursSource::Fixed(hours) => hours.to_string(),
            HoursSource::FormInput => submission.text(HOURS_FIELD).to_string(),
        };

        Ok(SignupRequest {
            category,
            display_name: format!("{} - {}", profile.label, submission.text(NAME_FIELD)),
            scheduled_time,
            duration_hours,
            announce_channel: profile.channel_id,
            entity_kind: profile.entity_kind,
            ping,
        })
    }

    /// Start time of the event.
    pub fn start_time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.scheduled_time, 0).unwrap_or_default()
    }

    /// Announcement message asking for a volunteer.
    ///
    /// The role and user mentions only notify when [`SignupRequest::ping`] is set.
    pub fn announcement(&self) -> MessageCreate {
        let content = format!(
            "Hey <@&{role}>\n\n\
             I need 1 gardener to work the {name} at <t:{time}:F>\n\n\
             Please react below with a <:{emoji}> to sign up!\n\n\
             You will be able to add {hours} hours of work to your invoice for the month",
            role = GARDENER_ROLE_ID,
            name = self.display_name,
            time = self.scheduled_time,
            emoji = ACK_EMOJI,
            hours = self.duration_hours,
        );

        let parse = if self.ping {
            vec![MentionType::Roles, MentionType::Users]
        } else {
            vec![]
        };

        MessageCreate {
            allowed_mentions: Some(AllowedMentions { parse }),
            ..MessageCreate::text(&content)
        }
    }

    /// Guild scheduled event matching the announcement.
    pub fn scheduled_event(&self) -> ScheduledEventCreate {
        ScheduledEventCreate::new(
            &self.display_name,
            self.start_time(),
            self.announce_channel,
            self.entity_kind,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::{Interaction, InteractionResponder};
    use std::collections::HashMap;

    fn create_test_submission(fields: &[(&str, &str)]) -> FormSubmission {
        FormSubmission {
            interaction: Interaction {
                id: "2".to_string(),
                application_id: "app".to_string(),
                token: "token".to_string(),
                guild_id: Some("guild".to_string()),
                channel_id: Some("channel".to_string()),
                user_id: "user".to_string(),
                responder: InteractionResponder::default(),
            },
            custom_id: "game_modal:1".to_string(),
            values: fields
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_rocket_league_request() {
        let submission = create_test_submission(&[
            ("name", "OG vs Tundra"),
            ("time", "1700000000"),
            ("series_length", "Bo5"),
        ]);

        let request = SignupRequest::from_submission(Category::Rl, true, &submission).unwrap();
        assert_eq!(request.display_name, "Rocket League - OG vs Tundra");
        assert_eq!(request.duration_hours, "1");
        assert_eq!(request.scheduled_time, 1_700_000_000);
        assert_eq!(request.announce_channel, "1194677990290894989");
        assert_eq!(request.entity_kind, EntityKind::Voice);

        let message = request.announcement();
        assert_eq!(
            message.content,
            "Hey <@&720253636797530203>\n\n\
             I need 1 gardener to work the Rocket League - OG vs Tundra at <t:1700000000:F>\n\n\
             Please react below with a <:OGpeepoYes:730890894814740541> to sign up!\n\n\
             You will be able to add 1 hours of work to your invoice for the month"
        );
        assert_eq!(
            message.allowed_mentions,
            Some(AllowedMentions {
                parse: vec![MentionType::Roles, MentionType::Users]
            })
        );
        assert!(!message.is_ephemeral());
    }

    #[test]
    fn test_series_hours() {
        let submission = create_test_submission(&[
            ("name", "OG vs Liquid"),
            ("time", "1700000000"),
            ("series_length", "bo3"),
        ]);

        let request = SignupRequest::from_submission(Category::Dota, true, &submission).unwrap();
        assert_eq!(request.display_name, "Dota - OG vs Liquid");
        assert_eq!(request.duration_hours, "4");
        assert_eq!(request.announce_channel, "738009797932351519");
    }

    #[test]
    fn test_unknown_series_leaves_hours_empty() {
        let submission = create_test_submission(&[
            ("name", "OG vs NaVi"),
            ("time", "1700000000"),
            ("series_length", "Bo7"),
        ]);

        let request = SignupRequest::from_submission(Category::Cs, true, &submission).unwrap();
        assert_eq!(request.duration_hours, "");
        assert!(
            request
                .announcement()
                .content
                .ends_with("add  hours of work to your invoice for the month")
        );
    }

    #[test]
    fn test_other_uses_hours_field() {
        let submission = create_test_submission(&[
            ("name", "Community night"),
            ("time", "1700000000"),
            ("hours", "5"),
        ]);

        let request = SignupRequest::from_submission(Category::Other, false, &submission).unwrap();
        assert_eq!(request.display_name, "Other - Community night");
        assert_eq!(request.duration_hours, "5");
        assert_eq!(request.entity_kind, EntityKind::StageInstance);
        assert!(request.announcement().content.contains("add 5 hours of work"));
    }

    #[test]
    fn test_no_ping_disables_mentions() {
        let submission = create_test_submission(&[("name", "x"), ("time", "1700000000")]);

        let request = SignupRequest::from_submission(Category::Other, false, &submission).unwrap();
        assert_eq!(
            request.announcement().allowed_mentions,
            Some(AllowedMentions { parse: vec![] })
        );
    }

    #[test]
    fn test_invalid_timestamps() {
        for time in ["not-a-number", "", "17000000.5", " 1700000000", "9223372036854775807"] {
            let submission = create_test_submission(&[("name", "x"), ("time", time), ("hours", "5")]);
            let result = SignupRequest::from_submission(Category::Other, true, &submission);
            assert!(
                matches!(result, Err(SignupError::TimestampParse(ref raw)) if raw == time),
                "{time:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_timestamps_are_decimal() {
        let cases = [
            ("+1700000000", Some(1_700_000_000)),
            ("01700000000", Some(1_700_000_000)),
            ("0x6553F100", None),
            ("1_700_000_000", None),
        ];
        for (time, expected) in cases {
            let submission = create_test_submission(&[("name", "x"), ("time", time), ("hours", "5")]);
            let result = SignupRequest::from_submission(Category::Other, true, &submission);
            assert_eq!(result.ok().map(|request| request.scheduled_time), expected, "{time:?}");
        }
    }

    #[test]
    fn test_scheduled_event() {
        let submission = create_test_submission(&[
            ("name", "OG vs Tundra"),
            ("time", "1700000000"),
            ("series_length", "Bo1"),
        ]);

        let request = SignupRequest::from_submission(Category::Rl, true, &submission).unwrap();
        let event = request.scheduled_event();
        assert_eq!(event.name, "Rocket League - OG vs Tundra");
        assert_eq!(event.channel_id, "1194677990290894989");
        assert_eq!(event.entity_kind, EntityKind::Voice);
        assert_eq!(event.scheduled_start_time.timestamp(), 1_700_000_000);
    }
}
