use std::fmt;

use super::SyncError;

/// A jpdb word-sense: vocabulary id plus sense id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VocabularyRef {
    pub vid: u64,
    pub sid: u64,
}

impl VocabularyRef {
    pub fn new(vid: u64, sid: u64) -> Self {
        Self { vid, sid }
    }

    /// The `c` query value the review page expects, before url encoding.
    pub fn review_key(&self) -> String {
        format!("vf,{},{}", self.vid, self.sid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeckState {
    NotInDeck,
    InYourDeck,
    Other(String), // "learning", "known", "blacklisted", ...
}

impl DeckState {
    pub const NOT_IN_DECK: &'static str = "not_in_deck";
    pub const IN_YOUR_DECK: &'static str = "in_your_deck";

    pub fn as_str(&self) -> &str {
        match self {
            DeckState::NotInDeck => Self::NOT_IN_DECK,
            DeckState::InYourDeck => Self::IN_YOUR_DECK,
            DeckState::Other(label) => label,
        }
    }

    pub fn is_in_deck(&self) -> bool {
        !matches!(self, DeckState::NotInDeck)
    }
}

impl From<&str> for DeckState {
    fn from(label: &str) -> Self {
        match label {
            Self::NOT_IN_DECK => DeckState::NotInDeck,
            Self::IN_YOUR_DECK => DeckState::InYourDeck,
            other => DeckState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DeckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grade the learner gave a card.
/// 1: Again, 2: Hard, 3: Good, 4: Easy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ease(u8);

impl Ease {
    pub const AGAIN: Ease = Ease(1);
    pub const HARD: Ease = Ease(2);
    pub const GOOD: Ease = Ease(3);
    pub const EASY: Ease = Ease(4);

    pub fn grade(&self) -> ReviewGrade {
        if self.0 >= 2 {
            ReviewGrade::Pass
        } else {
            ReviewGrade::Fail
        }
    }
}

impl TryFrom<u8> for Ease {
    type Error = SyncError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1..=4 => Ok(Ease(value)),
            other => Err(SyncError::InvalidEase(other)),
        }
    }
}

/// jpdb only gets a pass/fail answer from us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewGrade {
    Fail,
    Pass,
}

impl ReviewGrade {
    /// Value of the `g` query parameter.
    pub fn code(&self) -> u8 {
        match self {
            ReviewGrade::Fail => 1,
            ReviewGrade::Pass => 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Note {
    fields: Vec<(String, String)>, // (field name, value) in model order
}

impl Note {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|(field, _)| field == name).map(|(_, value)| value.as_str())
    }

    /// Value of the first candidate field this note has.
    pub fn first_field<'a, I>(&self, candidates: I) -> Option<&str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates.into_iter().find_map(|name| self.get(name))
    }
}

#[derive(Debug, Clone)]
pub struct Card {
    pub id: u64,
    pub note: Note,
    pub is_new: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_grades() {
        assert_eq!(Ease::AGAIN.grade(), ReviewGrade::Fail);
        assert_eq!(Ease::HARD.grade(), ReviewGrade::Pass);
        assert_eq!(Ease::GOOD.grade().code(), 4);
        assert_eq!(Ease::AGAIN.grade().code(), 1);

        assert!(Ease::try_from(0u8).is_err());
        assert!(Ease::try_from(5u8).is_err());
        assert_eq!(Ease::try_from(4u8).unwrap(), Ease::EASY);
    }

    #[test]
    fn test_deck_state_labels() {
        assert_eq!(DeckState::from("not_in_deck"), DeckState::NotInDeck);
        assert_eq!(DeckState::from("in_your_deck"), DeckState::InYourDeck);
        assert_eq!(DeckState::from("learning"), DeckState::Other("learning".to_string()));
        assert_eq!(DeckState::Other("known".to_string()).to_string(), "known");
        assert!(!DeckState::NotInDeck.is_in_deck());
    }

    #[test]
    fn test_note_first_field() {
        let note = Note::new().with_field("Sentence", "猫がいる").with_field("Word", "猫");

        assert_eq!(note.first_field(["Target", "Word", "Sentence"]), Some("猫"));
        assert_eq!(note.first_field(["Target"]), None);
        assert_eq!(VocabularyRef::new(1234, 5).review_key(), "vf,1234,5");
    }
}
