//! Activity categories and the per-category settings of a sign-up.

use std::fmt;

use log::warn;

use crate::{commands::signup::forms::FormTemplate, discord::EntityKind};

/// Kind of activity a sign-up is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Dota,
    Cs,
    Rl,
    /// Anything else, including values the command does not offer
    Other,
}

/// Where the number of worked hours comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoursSource {
    /// Derived from the series format field (`Bo1`, `Bo3`...)
    SeriesFormat,
    /// Same for every sign-up of the category
    Fixed(&'static str),
    /// Typed by the user in the hours field
    FormInput,
}

/// Static settings of a [`Category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryProfile {
    /// Prefix of the event name, e.g. `Rocket League`
    pub label: &'static str,
    pub hours: HoursSource,
    /// Channel hosting the scheduled event
    pub channel_id: &'static str,
    pub entity_kind: EntityKind,
    /// Form the user fills in
    pub form: FormTemplate,
}

const DOTA: CategoryProfile = CategoryProfile {
    label: "Dota",
    hours: HoursSource::SeriesFormat,
    channel_id: "738009797932351519",
    entity_kind: EntityKind::Voice,
    form: FormTemplate::Game,
};

const CS: CategoryProfile = CategoryProfile {
    label: "CS",
    hours: HoursSource::SeriesFormat,
    channel_id: "746618267434614804",
    entity_kind: EntityKind::Voice,
    form: FormTemplate::Game,
};

const RL: CategoryProfile = CategoryProfile {
    label: "Rocket League",
    hours: HoursSource::Fixed("1"),
    channel_id: "1194677990290894989",
    entity_kind: EntityKind::Voice,
    form: FormTemplate::Game,
};

const OTHER: CategoryProfile = CategoryProfile {
    label: "Other",
    hours: HoursSource::FormInput,
    channel_id: "1186593338300842025",
    entity_kind: EntityKind::StageInstance,
    form: FormTemplate::Event,
};

impl Category {
    /// Every category, in the order the command offers them.
    pub const ALL: [Category; 4] = [Category::Dota, Category::Cs, Category::Rl, Category::Other];

    /// Maps the `type` option value to a category. Unknown values fall back to
    /// [`Category::Other`].
    pub fn from_option(value: &str) -> Self {
        match value {
            "Dota" => Category::Dota,
            "CS" => Category::Cs,
            "RL" => Category::Rl,
            "Other" => Category::Other,
            unknown => {
                warn!("unknown event type '{}', treated as Other", unknown);
                Category::Other
            }
        }
    }

    /// Value of the `type` option selecting this category.
    pub fn option_value(self) -> &'static str {
        match self {
            Category::Dota => "Dota",
            Category::Cs => "CS",
            Category::Rl => "RL",
            Category::Other => "Other",
        }
    }

    pub fn profile(self) -> &'static CategoryProfile {
        match self {
            Category::Dota => &DOTA,
            Category::Cs => &CS,
            Category::Rl => &RL,
            Category::Other => &OTHER,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.profile().label)
    }
}

/// Hours of work for a series format, matched case-insensitively.
///
/// Returns an empty string for formats without a known duration (`Bo7` included).
pub fn hours_for_series(series_length: &str) -> &'static str {
    match series_length.to_lowercase().as_str() {
        "bo1" => "2",
        "bo2" => "3",
        "bo3" => "4",
        "bo5" => "6",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours_for_series() {
        assert_eq!(hours_for_series("bo1"), "2");
        assert_eq!(hours_for_series("Bo2"), "3");
        assert_eq!(hours_for_series("BO3"), "4");
        assert_eq!(hours_for_series("bO5"), "6");
        assert_eq!(hours_for_series("Bo7"), "");
        assert_eq!(hours_for_series("best of three"), "");
        assert_eq!(hours_for_series(""), "");
    }

    #[test]
    fn test_from_option() {
        for category in Category::ALL {
            assert_eq!(Category::from_option(category.option_value()), category);
        }
        assert_eq!(Category::from_option("Valorant"), Category::Other);
        assert_eq!(Category::from_option("dota"), Category::Other);
    }

    #[test]
    fn test_profiles() {
        let rl = Category::Rl.profile();
        assert_eq!(rl.label, "Rocket League");
        assert_eq!(rl.hours, HoursSource::Fixed("1"));
        assert_eq!(rl.channel_id, "1194677990290894989");
        assert_eq!(rl.entity_kind, EntityKind::Voice);
        assert_eq!(rl.form, FormTemplate::Game);

        let other = Category::Other.profile();
        assert_eq!(other.hours, HoursSource::FormInput);
        assert_eq!(other.entity_kind, EntityKind::StageInstance);
        assert_eq!(other.form, FormTemplate::Event);

        assert_eq!(Category::Dota.profile().channel_id, "738009797932351519");
        assert_eq!(Category::Cs.profile().channel_id, "746618267434614804");
        assert_eq!(Category::Cs.to_string(), "CS");
    }
}
