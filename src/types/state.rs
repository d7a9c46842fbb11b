//! Narrative state representation

use crate::errors::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Keys of the narrative state record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateKey {
    CurrentChapter,
    CurrentChallenge,
    UnlockedChapters,
    CompletedChallenges,
    UserAnswers,
    DebugMode,
    ScrollLocked,
    ActiveDecorativeObject,
    CurrentMusicTrack,
}

impl StateKey {
    pub const ALL: [StateKey; 9] = [
        StateKey::CurrentChapter,
        StateKey::CurrentChallenge,
        StateKey::UnlockedChapters,
        StateKey::CompletedChallenges,
        StateKey::UserAnswers,
        StateKey::DebugMode,
        StateKey::ScrollLocked,
        StateKey::ActiveDecorativeObject,
        StateKey::CurrentMusicTrack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::CurrentChapter => "currentChapter",
            StateKey::CurrentChallenge => "currentChallenge",
            StateKey::UnlockedChapters => "unlockedChapters",
            StateKey::CompletedChallenges => "completedChallenges",
            StateKey::UserAnswers => "userAnswers",
            StateKey::DebugMode => "debugMode",
            StateKey::ScrollLocked => "scrollLocked",
            StateKey::ActiveDecorativeObject => "activeDecorativeObject",
            StateKey::CurrentMusicTrack => "currentMusicTrack",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| StoreError::UnknownKey { key: s.to_string() })
    }
}

/// Process-wide record of narrative progress
///
/// Sets are ordered so that snapshots serialize deterministically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeState {
    pub current_chapter: u32,
    pub current_challenge: Option<String>,
    pub unlocked_chapters: BTreeSet<u32>,
    pub completed_challenges: BTreeSet<String>,
    pub user_answers: BTreeMap<String, Value>,
    pub debug_mode: bool,
    pub scroll_locked: bool,
    pub active_decorative_object: Option<String>,
    pub current_music_track: Option<String>,
}

impl Default for NarrativeState {
    fn default() -> Self {
        Self {
            current_chapter: 0,
            current_challenge: None,
            unlocked_chapters: BTreeSet::from([0]),
            completed_challenges: BTreeSet::new(),
            user_answers: BTreeMap::new(),
            debug_mode: false,
            scroll_locked: false,
            active_decorative_object: None,
            current_music_track: None,
        }
    }
}

impl NarrativeState {
    /// Create the initial state
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial state that keeps the given debug flag
    pub fn with_debug(debug_mode: bool) -> Self {
        Self {
            debug_mode,
            ..Default::default()
        }
    }

    /// Current value of a field as JSON
    pub fn field(&self, key: StateKey) -> Value {
        match key {
            StateKey::CurrentChapter => Value::from(self.current_chapter),
            StateKey::CurrentChallenge => to_json(&self.current_challenge),
            StateKey::UnlockedChapters => to_json(&self.unlocked_chapters),
            StateKey::CompletedChallenges => to_json(&self.completed_challenges),
            StateKey::UserAnswers => to_json(&self.user_answers),
            StateKey::DebugMode => Value::Bool(self.debug_mode),
            StateKey::ScrollLocked => Value::Bool(self.scroll_locked),
            StateKey::ActiveDecorativeObject => to_json(&self.active_decorative_object),
            StateKey::CurrentMusicTrack => to_json(&self.current_music_track),
        }
    }

    /// Replace a field from JSON, returning the previous value
    pub fn assign(&mut self, key: StateKey, value: Value) -> Result<Value, StoreError> {
        let previous = self.field(key);
        let parse_err = |e: serde_json::Error| StoreError::type_mismatch(key.as_str(), e);
        match key {
            StateKey::CurrentChapter => {
                self.current_chapter = serde_json::from_value(value).map_err(parse_err)?;
            }
            StateKey::CurrentChallenge => {
                self.current_challenge = serde_json::from_value(value).map_err(parse_err)?;
            }
            StateKey::UnlockedChapters => {
                let mut chapters: BTreeSet<u32> =
                    serde_json::from_value(value).map_err(parse_err)?;
                chapters.insert(0);
                self.unlocked_chapters = chapters;
            }
            StateKey::CompletedChallenges => {
                self.completed_challenges = serde_json::from_value(value).map_err(parse_err)?;
            }
            StateKey::UserAnswers => {
                self.user_answers = serde_json::from_value(value).map_err(parse_err)?;
            }
            StateKey::DebugMode => {
                self.debug_mode = serde_json::from_value(value).map_err(parse_err)?;
            }
            StateKey::ScrollLocked => {
                self.scroll_locked = serde_json::from_value(value).map_err(parse_err)?;
            }
            StateKey::ActiveDecorativeObject => {
                self.active_decorative_object =
                    serde_json::from_value(value).map_err(parse_err)?;
            }
            StateKey::CurrentMusicTrack => {
                self.current_music_track = serde_json::from_value(value).map_err(parse_err)?;
            }
        }
        Ok(previous)
    }
}

/// Plain data never fails to serialize; `Null` is unreachable in practice.
fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_names_round_trip() {
        for key in StateKey::ALL {
            assert_eq!(key.as_str().parse::<StateKey>().unwrap(), key);
        }
        assert!("nonsense".parse::<StateKey>().is_err());
    }

    #[test]
    fn initial_state_has_chapter_zero_unlocked() {
        let state = NarrativeState::new();
        assert_eq!(state.current_chapter, 0);
        assert!(state.unlocked_chapters.contains(&0));
        assert!(!state.scroll_locked);
    }

    #[test]
    fn assign_returns_previous_value() {
        let mut state = NarrativeState::new();
        let previous = state.assign(StateKey::CurrentChapter, json!(3)).unwrap();
        assert_eq!(previous, json!(0));
        assert_eq!(state.current_chapter, 3);
    }

    #[test]
    fn unlocked_chapters_always_keep_chapter_zero() {
        let mut state = NarrativeState::new();
        state.assign(StateKey::UnlockedChapters, json!([2, 4])).unwrap();
        assert_eq!(state.unlocked_chapters, BTreeSet::from([0, 2, 4]));
    }

    #[test]
    fn assign_rejects_wrong_type() {
        let mut state = NarrativeState::new();
        let err = state
            .assign(StateKey::ScrollLocked, json!("yes"))
            .unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { .. }));
        assert!(!state.scroll_locked);
    }

    #[test]
    fn nullable_fields_serialize_as_null() {
        let state = NarrativeState::new();
        assert_eq!(state.field(StateKey::CurrentMusicTrack), Value::Null);
        assert_eq!(state.field(StateKey::CompletedChallenges), json!([]));
    }
}
