//! Chapter cinematics
//!
//! Scripted sequences that run as a strict series of pauses and audio or
//! visual changes. Only one sequence runs at a time: each one takes the
//! single [`SequencerGuard`] slot before its first step and fails fast,
//! logged, when the slot is taken. A step whose element is missing from the
//! surface is skipped and the sequence carries on.

mod defeat;
mod finale;
mod patronus;


pub use finale::Stone;

use crate::audio::AudioManager;
use crate::errors::SequencerError;
use crate::lock;
use crate::progression::ProgressionController;
use crate::scheduler::Scheduler;
use crate::store::StateStore;
use crate::surface::PresentationSurface;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

pub const PATRONUS: &str = "patronus";
pub const DEFEAT: &str = "defeat";
pub const FINALE: &str = "finale";
pub const POST_CREDITS: &str = "post-credits";

/// Section whose arrival starts the Patronus sequence
pub const PATRONUS_TRIGGER: &str = "cap7-esperanca";
/// Section whose arrival starts the finale
pub const FINALE_TRIGGER: &str = "cap8-pos-derrota";

/// Single-slot token for the running sequence
#[derive(Default)]
pub struct SequencerGuard {
    inner: Mutex<GuardState>,
}

#[derive(Default)]
struct GuardState {
    active: Option<String>,
    ran: HashSet<String>,
}

/// Held while a sequence runs; frees the slot on drop
pub struct SequencerTicket<'a> {
    guard: &'a SequencerGuard,
    name: String,
}

impl Drop for SequencerTicket<'_> {
    fn drop(&mut self) {
        let mut state = lock(&self.guard.inner);
        if state.active.as_deref() == Some(self.name.as_str()) {
            state.active = None;
        }
        debug!("[Cinematic] '{}' released", self.name);
    }
}

impl SequencerGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the slot for `name`; every sequence runs at most once per session
    pub fn acquire(&self, name: &str) -> Result<SequencerTicket<'_>, SequencerError> {
        let mut state = lock(&self.inner);
        let refused = if let Some(active) = &state.active {
            Some(SequencerError::AlreadyActive {
                requested: name.into(),
                active: active.clone(),
            })
        } else if state.ran.contains(name) {
            Some(SequencerError::AlreadyRan { name: name.into() })
        } else {
            None
        };
        if let Some(err) = refused {
            warn!("[Cinematic] {}", err);
            return Err(err);
        }
        state.active = Some(name.to_string());
        state.ran.insert(name.to_string());
        info!("[Cinematic] '{}' started", name);
        Ok(SequencerTicket {
            guard: self,
            name: name.to_string(),
        })
    }

    pub fn active(&self) -> Option<String> {
        lock(&self.inner).active.clone()
    }

    pub fn has_run(&self, name: &str) -> bool {
        lock(&self.inner).ran.contains(name)
    }

    /// Forget which sequences ran
    pub fn reset(&self) {
        let mut state = lock(&self.inner);
        state.active = None;
        state.ran.clear();
    }
}

/// The sequences and the services they drive
pub struct Cinematics {
    me: Weak<Cinematics>,
    surface: Arc<dyn PresentationSurface>,
    audio: Arc<AudioManager>,
    store: Arc<StateStore>,
    progression: Arc<ProgressionController>,
    scheduler: Arc<Scheduler>,
    guard: SequencerGuard,
    stone: Mutex<Stone>,
}

impl Cinematics {
    pub fn new(
        surface: Arc<dyn PresentationSurface>,
        audio: Arc<AudioManager>,
        store: Arc<StateStore>,
        progression: Arc<ProgressionController>,
        scheduler: Arc<Scheduler>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            surface,
            audio,
            store,
            progression,
            scheduler,
            guard: SequencerGuard::new(),
            stone: Mutex::new(Stone::Hidden),
        })
    }

    pub fn guard(&self) -> &SequencerGuard {
        &self.guard
    }

    /// Start the sequences tied to section arrivals
    pub fn attach(&self) {
        let me = self.me.clone();
        self.progression.on_arrival(move |_, section| {
            let Some(cinematics) = me.upgrade() else {
                return;
            };
            if let Some(active) = cinematics.guard.active() {
                debug!("[Cinematic] arrival at '{}' during '{}'", section.id, active);
                return;
            }
            match section.id.as_str() {
                PATRONUS_TRIGGER => cinematics.spawn(|c| async move { c.patronus().await }),
                FINALE_TRIGGER => cinematics.spawn(|c| async move { c.finale().await }),
                _ => {}
            }
        });
    }

    /// Run a sequence on the scheduler; a refused start is already logged
    pub fn spawn<F, Fut>(&self, sequence: F)
    where
        F: FnOnce(Arc<Cinematics>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), SequencerError>> + Send + 'static,
    {
        let Some(cinematics) = self.me.upgrade() else {
            return;
        };
        self.scheduler.spawn(async move {
            let _ = sequence(cinematics).await;
        });
    }

    /// Forget which sequences ran and hide the stone again
    pub fn reset(&self) {
        self.guard.reset();
        *lock(&self.stone) = Stone::Hidden;
    }

    // Steps

    fn show(&self, id: &str, fade: Duration) -> bool {
        self.set_visible(id, true, fade)
    }

    fn hide(&self, id: &str, fade: Duration) -> bool {
        self.set_visible(id, false, fade)
    }

    fn set_visible(&self, id: &str, visible: bool, fade: Duration) -> bool {
        match self.surface.set_element_visible(id, visible, fade) {
            Ok(()) => true,
            Err(err) => {
                warn!("[Cinematic] {}, step skipped", err);
                false
            }
        }
    }

    fn set_text(&self, id: &str, text: &str) {
        if let Err(err) = self.surface.set_text(id, text) {
            warn!("[Cinematic] {}, step skipped", err);
        }
    }

    fn effect(&self, name: &str) {
        if let Err(err) = self.audio.play_effect(name) {
            debug!("[Cinematic] {}", err);
        }
    }

    fn music(&self, chapter: &str, fade_out: Duration, fade_in: Duration) {
        if let Err(err) = self.audio.switch_track_for_chapter(chapter, fade_out, fade_in) {
            debug!("[Cinematic] {}", err);
        }
    }

    /// Start a scroll to the section without waiting for it to settle
    fn scroll_to(&self, id: &str, duration: Duration) {
        let Some(index) = self.progression.index_of(id) else {
            warn!("[Cinematic] section '{}' not found, scroll skipped", id);
            return;
        };
        let progression = self.progression.clone();
        self.scheduler.spawn(async move {
            if let Err(err) = progression.go_to_section(index, duration).await {
                warn!("[Cinematic] {}", err);
            }
        });
    }
}

async fn pause(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
