//! Puzzle and mini-game handlers
//!
//! Every handler owns the local state of one challenge and reports back
//! through a shared [`ChallengeContext`]: on success the challenge is marked
//! complete, the answer recorded and the closing dialogue queued, with the
//! scroll unlocked once the last line is on screen. Failures play the error
//! effect and write inline feedback next to the challenge.

pub mod chase;
pub mod code_word;
pub mod defense;
pub mod flight;
pub mod jigsaw;
pub mod light_sequence;
pub mod limit;
pub mod ordering;
pub mod qualities;
pub mod quiz;
pub mod riddikulus;
pub mod selection;
pub mod sliding;

pub use chase::{ChaseGame, ChaseOutcome, Direction};
pub use code_word::CodeWordPuzzle;
pub use defense::{Block, DefenseGame};
pub use flight::{FlightGame, FlightOutcome};
pub use jigsaw::JigsawPuzzle;
pub use light_sequence::{LightPress, LightSequenceGame};
pub use limit::{LimitOutcome, LimitPuzzle};
pub use ordering::OrderingPuzzle;
pub use qualities::{House, QualitiesPuzzle};
pub use quiz::{Question, QuizPuzzle};
pub use riddikulus::RiddikulusPuzzle;
pub use selection::{CardSelectionPuzzle, SelectionPhase};
pub use sliding::{Board, SlideMove, SlidingPuzzle};

use crate::audio::AudioManager;
use crate::config::TimingConfig;
use crate::dialogue::DialoguePresenter;
use crate::scheduler::Scheduler;
use crate::store::StateStore;
use crate::surface::PresentationSurface;
use crate::types::DialogueOptions;
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;

#[cfg(test)]
pub(crate) mod testing;

/// Result of submitting an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Solved,
    Rejected,
    /// Not enough input to judge yet
    Incomplete,
    /// The challenge no longer accepts input
    Ignored,
}

/// Element receiving inline feedback for a challenge
pub fn feedback_element(challenge: &str) -> String {
    format!("feedback-{challenge}")
}

/// Element revealed when a challenge's hint timer expires
pub fn hint_element(challenge: &str) -> String {
    format!("hint-{challenge}")
}

/// Shared services a challenge reports through
pub struct ChallengeContext {
    store: Arc<StateStore>,
    audio: Arc<AudioManager>,
    dialogue: Arc<DialoguePresenter>,
    surface: Arc<dyn PresentationSurface>,
    scheduler: Arc<Scheduler>,
    hint_delay: Duration,
}

impl ChallengeContext {
    pub fn new(
        store: Arc<StateStore>,
        audio: Arc<AudioManager>,
        dialogue: Arc<DialoguePresenter>,
        surface: Arc<dyn PresentationSurface>,
        scheduler: Arc<Scheduler>,
        timing: &TimingConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            audio,
            dialogue,
            surface,
            scheduler,
            hint_delay: timing.hint_reveal,
        })
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn dialogue(&self) -> &Arc<DialoguePresenter> {
        &self.dialogue
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn surface(&self) -> &Arc<dyn PresentationSurface> {
        &self.surface
    }

    pub fn is_complete(&self, challenge: &str) -> bool {
        self.store.is_challenge_complete(challenge)
    }

    /// Play a sound effect, logging instead of failing
    pub fn effect(&self, name: &str) {
        if let Err(err) = self.audio.play_effect(name) {
            warn!("[Puzzle] {}", err);
        }
    }

    /// Complete the challenge and queue the closing lines; the scroll unlocks
    /// once the last of them is displayed
    pub fn succeed<S: AsRef<str>>(&self, challenge: &str, answer: Option<Value>, lines: &[S]) {
        info!("[Puzzle] '{}' solved", challenge);
        self.store.complete_challenge(challenge);
        if let Some(answer) = answer {
            self.store.record_answer(challenge, answer);
        }
        self.feedback(challenge, "");
        let store = self.store.clone();
        self.dialogue.enqueue_sequence(
            lines.iter().map(|line| line.as_ref().to_string()),
            DialogueOptions::default(),
            Some(Box::new(move || store.unlock_scroll())),
        );
    }

    /// Error effect plus inline feedback, cleared again after `clear_after`
    /// unless it is zero
    pub fn fail(&self, challenge: &str, message: &str, clear_after: Duration) {
        self.reject(challenge, "erro", message, clear_after);
    }

    /// [`fail`](Self::fail) with a specific feedback effect
    pub fn reject(&self, challenge: &str, effect: &str, message: &str, clear_after: Duration) {
        debug!("[Puzzle] '{}' rejected: {}", challenge, message);
        self.effect(effect);
        self.feedback(challenge, message);
        if !clear_after.is_zero() {
            self.clear_feedback_after(challenge, clear_after);
        }
    }

    /// Write inline feedback; a missing element is skipped
    pub fn feedback(&self, challenge: &str, message: &str) {
        if let Err(err) = self.surface.set_text(&feedback_element(challenge), message) {
            debug!("[Puzzle] feedback skipped: {}", err);
        }
    }

    pub fn clear_feedback_after(&self, challenge: &str, delay: Duration) {
        let surface = self.surface.clone();
        let element = feedback_element(challenge);
        self.scheduler.after(delay, move || {
            let _ = surface.set_text(&element, "");
        });
    }

    /// Reveal the hint element once the hint delay has passed
    pub fn schedule_hint(&self, challenge: &str) -> AbortHandle {
        let surface = self.surface.clone();
        let element = hint_element(challenge);
        self.scheduler.after(self.hint_delay, move || {
            match surface.set_element_visible(&element, true, Duration::from_millis(500)) {
                Ok(()) => info!("[Puzzle] hint '{}' revealed", element),
                Err(err) => warn!("[Puzzle] {}", err),
            }
        })
    }
}
