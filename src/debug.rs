//! Developer shortcuts
//!
//! Force-unlock, complete a challenge by name and jump to a section by id.
//! Every command requires debug mode; the `Display` text of a refusal is
//! what the operator sees next to the input.

use crate::audio::AudioManager;
use crate::config::MusicConfig;
use crate::errors::DebugError;
use crate::progression::ProgressionController;
use crate::store::StateStore;
use log::{debug, info};
use std::sync::Arc;

pub struct DebugConsole {
    store: Arc<StateStore>,
    progression: Arc<ProgressionController>,
    audio: Arc<AudioManager>,
    music: MusicConfig,
}

impl DebugConsole {
    pub fn new(
        store: Arc<StateStore>,
        progression: Arc<ProgressionController>,
        audio: Arc<AudioManager>,
        music: MusicConfig,
    ) -> Self {
        Self {
            store,
            progression,
            audio,
            music,
        }
    }

    fn ensure_enabled(&self) -> Result<(), DebugError> {
        if self.store.debug_mode() {
            Ok(())
        } else {
            Err(DebugError::Disabled)
        }
    }

    fn read(input: &str) -> Result<&str, DebugError> {
        match input.trim() {
            "" => Err(DebugError::EmptyInput),
            name => Ok(name),
        }
    }

    /// Lift the scroll lock and show the arrow
    pub fn force_unlock(&self) -> Result<(), DebugError> {
        self.ensure_enabled()?;
        self.progression.unlock_and_show_arrow();
        Ok(())
    }

    /// Mark the typed challenge complete; returns the id as stored
    pub fn complete_challenge(&self, typed: &str) -> Result<String, DebugError> {
        self.ensure_enabled()?;
        let id = Self::read(typed)?;
        self.store.complete_challenge(id);
        info!("[Debug] challenge '{}' completed", id);
        Ok(id.to_string())
    }

    /// Jump to the typed section id. Every chapter up to the target's is
    /// unlocked, the current chapter set and the music re-keyed first.
    pub async fn jump_to_section(&self, typed: &str) -> Result<usize, DebugError> {
        self.ensure_enabled()?;
        let id = Self::read(typed)?;
        let Some(index) = self.progression.index_of(id) else {
            return Err(DebugError::UnknownSection { id: id.into() });
        };

        let chapter = (0..=index)
            .filter_map(|i| self.progression.section(i).and_then(|s| s.chapter))
            .last()
            .unwrap_or(0);
        for unlocked in 1..=chapter {
            self.store.unlock_chapter_progress(unlocked);
        }
        self.store.set_current_chapter(chapter);
        if chapter > 0 {
            if let Err(err) = self.audio.switch_track_for_chapter(
                chapter,
                self.music.chapter_fade_out,
                self.music.chapter_fade_in,
            ) {
                debug!("[Debug] {}", err);
            }
        }
        info!("[Debug] jumping to '{}' ({}), chapter {}", id, index, chapter);

        self.progression.jump_to(index).await?;
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoryConfig;
    use crate::dialogue::DialoguePresenter;
    use crate::infrastructure::memory::{MemoryAudioBackend, MemoryDialogueSurface, MemorySurface};
    use crate::scene::SceneManager;
    use crate::scheduler::Scheduler;
    use crate::types::Section;

    fn console() -> (DebugConsole, Arc<StateStore>, Arc<ProgressionController>) {
        let config = StoryConfig::default();
        let scheduler = Arc::new(Scheduler::new());
        let store = Arc::new(StateStore::default());
        let audio = Arc::new(AudioManager::new(
            Arc::new(MemoryAudioBackend::default()),
            config.audio.clone(),
            store.clone(),
            scheduler.clone(),
        ));
        let dialogue = DialoguePresenter::new(
            Arc::new(MemoryDialogueSurface::default()),
            audio.clone(),
            scheduler.clone(),
            &config.timing,
        );
        let surface = Arc::new(MemorySurface::new(vec![
            Section::new("inicio"),
            Section::new("cap1").with_chapter(1),
            Section::new("desafio-codigo").requiring("codigo"),
            Section::new("cap3").with_chapter(3),
            Section::new("cap3-meio"),
        ]));
        let progression = ProgressionController::new(
            surface,
            store.clone(),
            audio.clone(),
            dialogue,
            Arc::new(SceneManager::new(store.clone(), scheduler.clone())),
            scheduler,
            config.timing,
            config.music.clone(),
            Vec::new(),
        );
        progression.initialize().unwrap();
        let console = DebugConsole::new(store.clone(), progression.clone(), audio, config.music);
        (console, store, progression)
    }

    #[tokio::test(start_paused = true)]
    async fn commands_require_debug_mode() {
        let (console, store, _) = console();
        assert_eq!(console.force_unlock(), Err(DebugError::Disabled));
        assert_eq!(console.complete_challenge("codigo"), Err(DebugError::Disabled));
        assert_eq!(console.jump_to_section("cap3").await, Err(DebugError::Disabled));
        assert!(!store.is_challenge_complete("codigo"));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_input_changes_nothing() {
        let (console, store, progression) = console();
        store.set_debug_mode(true);
        assert_eq!(console.complete_challenge("  "), Err(DebugError::EmptyInput));
        assert_eq!(
            console.jump_to_section("cap9").await,
            Err(DebugError::UnknownSection { id: "cap9".into() })
        );
        assert_eq!(
            DebugError::UnknownSection { id: "cap9".into() }.to_string(),
            "Section 'cap9' does not exist"
        );
        assert_eq!(progression.current_index(), 0);
        assert_eq!(store.current_chapter(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn complete_challenge_trims_the_name() {
        let (console, store, _) = console();
        store.set_debug_mode(true);
        assert_eq!(console.complete_challenge(" codigo \n").as_deref(), Ok("codigo"));
        assert!(store.is_challenge_complete("codigo"));
    }

    #[tokio::test(start_paused = true)]
    async fn jump_unlocks_chapters_and_rekeys_music() {
        let (console, store, progression) = console();
        store.set_debug_mode(true);
        assert_eq!(console.jump_to_section("cap3-meio").await, Ok(4));

        assert_eq!(progression.current_index(), 4);
        assert_eq!(store.current_chapter(), 3);
        assert!(store.is_unlocked(1) && store.is_unlocked(2) && store.is_unlocked(3));
        assert_eq!(store.current_music_track().as_deref(), Some("cap3"));
    }

    #[tokio::test(start_paused = true)]
    async fn force_unlock_lifts_a_block() {
        let (console, store, progression) = console();
        store.set_debug_mode(true);
        console.jump_to_section("desafio-codigo").await.unwrap();
        assert!(progression.is_blocked());
        console.force_unlock().unwrap();
        assert!(!progression.is_blocked());
        assert!(progression.arrow_visible());
        assert!(!store.scroll_locked());
    }
}
