//! Shared fixture for the puzzle tests

use super::{feedback_element, ChallengeContext};
use crate::audio::AudioManager;
use crate::config::{AudioConfig, TimingConfig};
use crate::dialogue::DialoguePresenter;
use crate::infrastructure::memory::{MemoryAudioBackend, MemoryDialogueSurface, MemorySurface};
use crate::scheduler::Scheduler;
use crate::store::StateStore;
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct Harness {
    pub ctx: Arc<ChallengeContext>,
    pub store: Arc<StateStore>,
    pub backend: Arc<MemoryAudioBackend>,
    pub surface: Arc<MemorySurface>,
    pub lines: Arc<MemoryDialogueSurface>,
    pub dialogue: Arc<DialoguePresenter>,
}

impl Harness {
    /// Fixture whose surface knows the feedback and hint elements of `challenges`
    pub fn new(challenges: &[&str]) -> Self {
        let elements: Vec<String> = challenges
            .iter()
            .flat_map(|id| [feedback_element(id), super::hint_element(id)])
            .collect();
        let timing = TimingConfig::default();
        let scheduler = Arc::new(Scheduler::new());
        let store = Arc::new(StateStore::default());
        let backend = Arc::new(MemoryAudioBackend::new(Duration::from_secs(1)));
        let audio = Arc::new(AudioManager::new(
            backend.clone(),
            AudioConfig::default(),
            store.clone(),
            scheduler.clone(),
        ));
        let lines = Arc::new(MemoryDialogueSurface::default());
        let dialogue = DialoguePresenter::new(lines.clone(), audio.clone(), scheduler.clone(), &timing);
        let surface = Arc::new(MemorySurface::new(Vec::new()).with_elements(elements));
        let ctx = ChallengeContext::new(
            store.clone(),
            audio,
            dialogue.clone(),
            surface.clone(),
            scheduler,
            &timing,
        );
        store.lock_scroll();
        Self {
            ctx,
            store,
            backend,
            surface,
            lines,
            dialogue,
        }
    }

    pub fn feedback(&self, challenge: &str) -> String {
        self.surface
            .text(&feedback_element(challenge))
            .unwrap_or_default()
    }

    /// Effect names played so far, derived from the asset file names
    pub fn effects(&self) -> Vec<String> {
        self.backend
            .played()
            .into_iter()
            .filter(|asset| asset.contains("/sfx/"))
            .filter_map(|asset| {
                asset
                    .rsplit('/')
                    .next()
                    .and_then(|file| file.strip_suffix(".mp3"))
                    .map(str::to_string)
            })
            .collect()
    }

    /// Click through the dialogue until the box closes
    pub async fn read_all(&self) {
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(400)).await;
            if !self.dialogue.is_active() {
                return;
            }
            self.dialogue.advance();
        }
    }
}

pub(crate) fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}
