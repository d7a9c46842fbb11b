//! # storyscroll
//!
//! A narrative controller for scroll-driven stories: full-viewport sections
//! read one after the other, some of them gated by a challenge that must be
//! solved before the advance arrow lets the reader move on.
//!
//! The library never touches a page, a speaker or a renderer directly. The
//! host hands a [`Journey`] its [`Capabilities`] and the story services drive
//! them: a global state store, the section progression controller, a
//! dialogue presenter, music and effects, decorative objects, the puzzle
//! handlers and the chapter cinematics.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use storyscroll::infrastructure::{
//!     MemoryAudioBackend, MemoryDialogueSurface, MemoryRenderer, MemorySurface,
//! };
//! use storyscroll::types::Section;
//! use storyscroll::{Capabilities, Journey, StoryConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let surface = MemorySurface::new(vec![
//!     Section::new("inicio"),
//!     Section::new("cap1").with_chapter(1),
//!     Section::new("desafio-codigo").requiring("codigo"),
//! ]);
//! let journey = Journey::new(
//!     StoryConfig::default(),
//!     Capabilities {
//!         surface: Arc::new(surface),
//!         dialogue: Arc::new(MemoryDialogueSurface::default()),
//!         audio: Arc::new(MemoryAudioBackend::default()),
//!         renderer: Arc::new(MemoryRenderer::default()),
//!     },
//! );
//! journey.initialize();
//! journey.start();
//! # }
//! ```
//!
//! Every timer is a tokio task, so the services must be used from inside a
//! tokio runtime.

pub mod app;
pub mod audio;
pub mod cinematics;
pub mod cli;
pub mod config;
pub mod debug;
pub mod dialogue;
pub mod errors;
pub mod infrastructure;
pub mod progression;
pub mod puzzles;
pub mod scene;
pub mod scheduler;
pub mod store;
pub mod surface;
pub mod types;

pub use app::{Capabilities, Journey, Puzzles};
pub use audio::{AudioBackend, AudioManager, Bus};
pub use cinematics::{Cinematics, SequencerGuard, Stone};
pub use config::{AudioConfig, MusicConfig, StoryConfig, TimingConfig};
pub use debug::DebugConsole;
pub use dialogue::DialoguePresenter;
pub use errors::{
    AudioError, DebugError, ProgressError, SequencerError, StoreError, SurfaceError,
};
pub use progression::{Advance, Phase, ProgressionController};
pub use scene::{AnimationCue, DecorativeObject, Renderer, SceneManager};
pub use scheduler::Scheduler;
pub use store::StateStore;
pub use surface::{DialogueSurface, PresentationSurface};
pub use types::{NarrativeState, Section, StateKey};

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the data if a holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
