//! Rule-based context classification of mentions.

use std::collections::HashSet;

use toponym_common::{CategoryEntries, ClassifierSettings, Mention, LOCATION_CATEGORY, PERSON_CATEGORY};

use crate::traits::ContextClassifier;

/// Titles that mark the following name as a person.
pub const PERSON_PREFIXES: &[&str] = &[
    "Mrs.", "Mrs", "Mr.", "Mr", "Ms.", "Ms", "Miss", "Dr.", "Dr", "Prof.", "Professor", "President", "Vice",
    "Minister", "Chancellor", "Premier", "Governor", "Senator", "Sen.", "Rep.", "Representative",
    "Congressman", "Congresswoman", "Mayor", "Judge", "Justice", "General", "Gen.", "Colonel", "Col.",
    "Major", "Captain", "Capt.", "Lieutenant", "Lt.", "Sergeant", "Sgt.", "Admiral", "Commander", "Chief",
    "Secretary", "Ambassador", "Sir", "Lady", "Lord", "King", "Queen", "Prince", "Princess", "Duke",
    "Duchess", "Pope", "Saint", "Reverend", "Rev.", "Father", "Sister", "Brother", "Coach", "Officer",
    "Detective", "Agent", "Deputy", "Sheriff",
];

/// Prepositions that usually introduce a place.
pub const LOCATIVE_PREPOSITIONS: &[&str] = &[
    "in", "near", "from", "at", "to", "into", "outside", "across", "around", "throughout", "towards",
    "toward", "via", "within",
];

/// Looks at the `window` tokens left of a mention, nearest first: a person
/// title yields `PER = 1`, a locative preposition `LOC = 1`. Anything else
/// leaves the distribution empty.
#[derive(Debug, Clone)]
pub struct PrefixContextClassifier {
    window: usize,
    person_prefixes: HashSet<String>,
    locative: HashSet<String>,
}

impl PrefixContextClassifier {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            person_prefixes: PERSON_PREFIXES.iter().map(|p| p.to_lowercase()).collect(),
            locative: LOCATIVE_PREPOSITIONS.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn from_settings(settings: &ClassifierSettings) -> Self {
        Self::new(settings.context_window_size)
    }
}

impl ContextClassifier for PrefixContextClassifier {
    fn classify(&self, text: &str, mention: &Mention) -> CategoryEntries {
        let left = text.get(..mention.start_offset).unwrap_or("");
        for token in left.split_whitespace().rev().take(self.window) {
            let token = token
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '.')
                .to_lowercase();
            if self.person_prefixes.contains(&token) {
                return CategoryEntries::new().with(PERSON_CATEGORY, 1.0);
            }
            let bare = token.trim_end_matches('.');
            if self.locative.contains(bare) {
                return CategoryEntries::new().with(LOCATION_CATEGORY, 1.0);
            }
        }
        CategoryEntries::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str, value: &str) -> CategoryEntries {
        let offset = text.find(value).unwrap();
        PrefixContextClassifier::from_settings(&ClassifierSettings::default()).classify(text, &Mention::new(offset, value))
    }

    #[test]
    fn title_marks_person() {
        let categories = classify("Yesterday President Lincoln spoke", "Lincoln");
        assert_eq!(categories.probability(PERSON_CATEGORY), 1.0);
        assert_eq!(classify("a word from Mr. Jordan", "Jordan").probability(PERSON_CATEGORY), 1.0);
    }

    #[test]
    fn preposition_marks_location() {
        let categories = classify("He lives in Lincoln, Nebraska", "Lincoln");
        assert_eq!(categories.probability(LOCATION_CATEGORY), 1.0);
        assert_eq!(categories.probability(PERSON_CATEGORY), 0.0);
    }

    #[test]
    fn nearest_cue_wins_and_window_is_bounded() {
        // "in" is nearer than "Senator"
        let categories = classify("Senator Smith in Washington", "Washington");
        assert_eq!(categories.probability(LOCATION_CATEGORY), 1.0);

        let far = classify("President said that the weather today Lincoln", "Lincoln");
        assert!(far.is_empty());
    }

    #[test]
    fn start_of_text_has_no_context() {
        assert!(classify("Paris is lovely", "Paris").is_empty());
    }
}
