//! Global state store with key-based observers
//!
//! The store is the only shared mutable resource of a journey. Every mutation
//! goes through [`StateStore::set`], which synchronously notifies the observers
//! registered for that key and then the wildcard observers, each group in
//! registration order. Observers run after the internal locks are released, so
//! they may read or write the store themselves.

use crate::errors::StoreError;
use crate::lock;
use crate::types::state::{NarrativeState, StateKey};
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};


/// Observer of a single key: `(new_value, old_value)`
///
/// `old_value` is `None` when the store was reset.
pub type KeyObserver = Arc<dyn Fn(&Value, Option<&Value>) + Send + Sync>;

/// Observer of every key: `(key, new_value, old_value)`
pub type WildcardObserver = Arc<dyn Fn(StateKey, &Value, Option<&Value>) + Send + Sync>;

/// Handle returned by `observe`, used to remove the observer again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

#[derive(Default)]
struct Observers {
    next_id: u64,
    /// Keys in first-registration order
    keyed: Vec<(StateKey, Vec<(Subscription, KeyObserver)>)>,
    wildcard: Vec<(Subscription, WildcardObserver)>,
}

impl Observers {
    fn next_subscription(&mut self) -> Subscription {
        self.next_id += 1;
        Subscription(self.next_id)
    }

    fn for_key(&self, key: StateKey) -> Vec<KeyObserver> {
        self.keyed
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, list)| list.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default()
    }
}

/// Process-wide narrative state with observer notification
pub struct StateStore {
    state: Mutex<NarrativeState>,
    observers: Mutex<Observers>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(false)
    }
}

impl StateStore {
    /// Create a store in its initial state
    pub fn new(debug_mode: bool) -> Self {
        Self {
            state: Mutex::new(NarrativeState::with_debug(debug_mode)),
            observers: Mutex::new(Observers::default()),
        }
    }

    /// Value of a key by name; `None` for unknown keys
    pub fn get(&self, key: &str) -> Option<Value> {
        let key = key.parse::<StateKey>().ok()?;
        Some(self.value(key))
    }

    /// Value of a known key
    pub fn value(&self, key: StateKey) -> Value {
        lock(&self.state).field(key)
    }

    /// Copy of the whole record
    pub fn snapshot(&self) -> NarrativeState {
        lock(&self.state).clone()
    }

    /// Replace a value and notify observers
    pub fn set(&self, key: StateKey, value: Value) -> Result<(), StoreError> {
        let (new_value, old_value) = {
            let mut state = lock(&self.state);
            let old = state.assign(key, value)?;
            (state.field(key), old)
        };
        debug!("[State] {} = {} (was {})", key, new_value, old_value);

        if key == StateKey::CurrentChapter {
            if let Some(chapter) = new_value.as_u64() {
                self.unlock_chapter_progress(chapter as u32);
            }
        }
        self.notify(key, &new_value, Some(&old_value));
        Ok(())
    }

    /// Set a value built from a typed field; the types here always match.
    fn put<T: Serialize>(&self, key: StateKey, value: T) {
        let result = serde_json::to_value(value)
            .map_err(|e| StoreError::type_mismatch(key.as_str(), e))
            .and_then(|value| self.set(key, value));
        if let Err(err) = result {
            warn!("[State] {}", err);
        }
    }

    /// Register an observer for one key
    pub fn observe<F>(&self, key: StateKey, callback: F) -> Subscription
    where
        F: Fn(&Value, Option<&Value>) + Send + Sync + 'static,
    {
        let mut observers = lock(&self.observers);
        let subscription = observers.next_subscription();
        let callback: KeyObserver = Arc::new(callback);
        match observers.keyed.iter_mut().find(|(k, _)| *k == key) {
            Some((_, list)) => list.push((subscription, callback)),
            None => observers.keyed.push((key, vec![(subscription, callback)])),
        }
        subscription
    }

    /// Register a wildcard observer that sees every key
    pub fn observe_all<F>(&self, callback: F) -> Subscription
    where
        F: Fn(StateKey, &Value, Option<&Value>) + Send + Sync + 'static,
    {
        let mut observers = lock(&self.observers);
        let subscription = observers.next_subscription();
        observers.wildcard.push((subscription, Arc::new(callback)));
        subscription
    }

    /// Remove an observer; returns false when it was already gone
    pub fn unobserve(&self, subscription: Subscription) -> bool {
        let mut observers = lock(&self.observers);
        for (_, list) in observers.keyed.iter_mut() {
            if let Some(pos) = list.iter().position(|(s, _)| *s == subscription) {
                list.remove(pos);
                return true;
            }
        }
        if let Some(pos) = observers
            .wildcard
            .iter()
            .position(|(s, _)| *s == subscription)
        {
            observers.wildcard.remove(pos);
            return true;
        }
        false
    }

    fn notify(&self, key: StateKey, new_value: &Value, old_value: Option<&Value>) {
        let (keyed, wildcard) = {
            let observers = lock(&self.observers);
            let wildcard: Vec<WildcardObserver> =
                observers.wildcard.iter().map(|(_, cb)| cb.clone()).collect();
            (observers.for_key(key), wildcard)
        };
        for callback in keyed {
            callback(new_value, old_value);
        }
        for callback in wildcard {
            callback(key, new_value, old_value);
        }
    }

    /// Reinitialize everything except `debugMode` and re-notify keyed observers
    pub fn reset(&self) {
        let fresh = {
            let mut state = lock(&self.state);
            *state = NarrativeState::with_debug(state.debug_mode);
            state.clone()
        };
        debug!("[State] reset (debug mode {})", fresh.debug_mode);

        let keyed: Vec<(StateKey, Vec<KeyObserver>)> = {
            let observers = lock(&self.observers);
            observers
                .keyed
                .iter()
                .map(|(key, list)| (*key, list.iter().map(|(_, cb)| cb.clone()).collect()))
                .collect()
        };
        for (key, callbacks) in keyed {
            let value = fresh.field(key);
            for callback in callbacks {
                callback(&value, None);
            }
        }
    }

    // Chapters

    pub fn current_chapter(&self) -> u32 {
        lock(&self.state).current_chapter
    }

    pub fn set_current_chapter(&self, chapter: u32) {
        self.put(StateKey::CurrentChapter, chapter);
    }

    /// Add a chapter to the unlocked set, publishing a fresh copy of the set
    pub fn unlock_chapter_progress(&self, chapter: u32) {
        let chapters = {
            let state = lock(&self.state);
            let mut chapters = state.unlocked_chapters.clone();
            chapters.insert(chapter);
            chapters
        };
        self.put(StateKey::UnlockedChapters, chapters);
    }

    pub fn is_unlocked(&self, chapter: u32) -> bool {
        lock(&self.state).unlocked_chapters.contains(&chapter)
    }

    /// Move to the next chapter and unlock it
    pub fn advance_chapter(&self) {
        let next = self.current_chapter() + 1;
        self.set_current_chapter(next);
    }

    /// Move back one chapter, never below zero
    pub fn previous_chapter(&self) {
        let current = self.current_chapter();
        if current > 0 {
            self.set_current_chapter(current - 1);
        }
    }

    // Challenges

    /// Mark a challenge as solved, publishing a fresh copy of the set
    pub fn complete_challenge(&self, id: &str) {
        let completed = {
            let state = lock(&self.state);
            let mut completed = state.completed_challenges.clone();
            completed.insert(id.to_string());
            completed
        };
        self.put(StateKey::CompletedChallenges, completed);
    }

    pub fn is_challenge_complete(&self, id: &str) -> bool {
        lock(&self.state).completed_challenges.contains(id)
    }

    pub fn current_challenge(&self) -> Option<String> {
        lock(&self.state).current_challenge.clone()
    }

    pub fn set_current_challenge(&self, id: Option<&str>) {
        self.put(StateKey::CurrentChallenge, id);
    }

    /// Record a free-form answer for a challenge
    pub fn record_answer(&self, id: &str, answer: impl Into<Value>) {
        let answers = {
            let state = lock(&self.state);
            let mut answers = state.user_answers.clone();
            answers.insert(id.to_string(), answer.into());
            answers
        };
        self.put(StateKey::UserAnswers, answers);
    }

    pub fn answer(&self, id: &str) -> Option<Value> {
        lock(&self.state).user_answers.get(id).cloned()
    }

    // Scroll lock

    pub fn scroll_locked(&self) -> bool {
        lock(&self.state).scroll_locked
    }

    pub fn lock_scroll(&self) {
        self.put(StateKey::ScrollLocked, true);
    }

    pub fn unlock_scroll(&self) {
        self.put(StateKey::ScrollLocked, false);
    }

    // Presentation

    pub fn active_object(&self) -> Option<String> {
        lock(&self.state).active_decorative_object.clone()
    }

    pub fn set_active_object(&self, name: Option<&str>) {
        self.put(StateKey::ActiveDecorativeObject, name);
    }

    pub fn current_music_track(&self) -> Option<String> {
        lock(&self.state).current_music_track.clone()
    }

    pub fn set_music_track(&self, name: Option<&str>) {
        self.put(StateKey::CurrentMusicTrack, name);
    }

    // Debug

    pub fn debug_mode(&self) -> bool {
        lock(&self.state).debug_mode
    }

    pub fn set_debug_mode(&self, enabled: bool) {
        self.put(StateKey::DebugMode, enabled);
    }

    pub fn toggle_debug(&self) {
        let enabled = self.debug_mode();
        self.set_debug_mode(!enabled);
    }

    /// Jump to a chapter; only honoured in debug mode
    pub fn jump_to_chapter(&self, chapter: u32) -> bool {
        if !self.debug_mode() {
            warn!("[State] jumping chapters is only possible in debug mode");
            return false;
        }
        self.set_current_chapter(chapter);
        true
    }

    /// Complete the challenge currently blocking progress; only in debug mode
    pub fn skip_current_challenge(&self) -> bool {
        if !self.debug_mode() {
            warn!("[State] skipping challenges is only possible in debug mode");
            return false;
        }
        match self.current_challenge() {
            Some(id) => {
                self.complete_challenge(&id);
                self.set_current_challenge(None);
                true
            }
            None => false,
        }
    }
}
