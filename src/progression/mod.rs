//! Section progression controller
//!
//! Owns the ordered section list and the index the viewport rests on. Native
//! scrolling stays suppressed; the only way forward is the advance arrow,
//! which is hidden whenever the current section waits on an unsolved
//! challenge. Arrival at a section updates the chapter, keys the background
//! music, fires section cues, and decides whether the arrow may come back.

use crate::audio::AudioManager;
use crate::config::{MusicConfig, SectionCue, TimingConfig};
use crate::dialogue::DialoguePresenter;
use crate::errors::ProgressError;
use crate::lock;
use crate::scene::SceneManager;
use crate::scheduler::Scheduler;
use crate::store::{StateStore, Subscription};
use crate::surface::PresentationSurface;
use crate::types::{Section, StateKey};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

#[cfg(test)]
mod tests;

/// One-shot effects played the first time a section is reached
const ARRIVAL_EFFECTS: [(&str, &str); 6] = [
    ("cap4", "penseira"),
    ("cap4-final", "pagina"),
    ("cap4-recompensa", "pagina"),
    ("cap5-final", "pagina"),
    ("cap5-recompensa", "pagina"),
    ("cap6-recompensa", "coruja"),
];

/// The rain loop plays while the viewport rests here
const RAIN_SECTION: &str = "cap8-pos-derrota";
const RAIN_EFFECT: &str = "chuva";

/// Called with the index and section the viewport has settled on
pub type ArrivalHook = Arc<dyn Fn(usize, &Section) + Send + Sync>;

/// Where the controller is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not initialized
    Idle,
    AtSection(usize),
    /// A programmatic scroll is in flight
    Advancing { from: usize, to: usize },
    /// The section waits on an unsolved challenge
    Blocked(usize),
}

/// Result of pressing the advance arrow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Already blocked; the arrow shook
    Refused,
    /// The current section requires this challenge first
    Blocked(String),
    /// Moved to this section
    Moved(usize),
    /// Already at the last section
    End,
    /// A transition is still running
    InTransit,
}

struct Inner {
    sections: Vec<Section>,
    index: usize,
    phase: Phase,
    arrow_visible: bool,
    /// A task is waiting for dialogue to finish before revealing the arrow
    awaiting_dialogue: bool,
    subscription: Option<Subscription>,
    /// Bumped by every transition; stale arrivals and arrow timers compare it
    transition: u64,
    visited: HashSet<String>,
    raining: bool,
}

pub struct ProgressionController {
    me: Weak<ProgressionController>,
    surface: Arc<dyn PresentationSurface>,
    store: Arc<StateStore>,
    audio: Arc<AudioManager>,
    dialogue: Arc<DialoguePresenter>,
    scene: Arc<SceneManager>,
    scheduler: Arc<Scheduler>,
    timing: TimingConfig,
    music: MusicConfig,
    cues: Vec<SectionCue>,
    arrival_hooks: Mutex<Vec<ArrivalHook>>,
    inner: Mutex<Inner>,
}

impl ProgressionController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        surface: Arc<dyn PresentationSurface>,
        store: Arc<StateStore>,
        audio: Arc<AudioManager>,
        dialogue: Arc<DialoguePresenter>,
        scene: Arc<SceneManager>,
        scheduler: Arc<Scheduler>,
        timing: TimingConfig,
        music: MusicConfig,
        cues: Vec<SectionCue>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            surface,
            store,
            audio,
            dialogue,
            scene,
            scheduler,
            timing,
            music,
            cues,
            arrival_hooks: Mutex::new(Vec::new()),
            inner: Mutex::new(Inner {
                sections: Vec::new(),
                index: 0,
                phase: Phase::Idle,
                arrow_visible: false,
                awaiting_dialogue: false,
                subscription: None,
                transition: 0,
                visited: HashSet::new(),
                raining: false,
            }),
        })
    }

    /// Read the sections, suppress native scrolling, create the hidden arrow
    /// and activate the first section
    pub fn initialize(&self) -> Result<(), ProgressError> {
        if self.phase() != Phase::Idle {
            debug!("[Progress] already initialized");
            return Ok(());
        }
        let sections = self.surface.sections();
        if sections.is_empty() {
            error!("[Progress] no sections found on the presentation surface");
            return Err(ProgressError::NoSections);
        }
        info!("[Progress] {} sections", sections.len());

        self.surface.set_native_scroll(false);
        self.surface.create_arrow();
        self.surface.set_arrow_visible(false);

        let me = self.me.clone();
        let subscription = self.store.observe(StateKey::ScrollLocked, move |locked, _| {
            if locked.as_bool() == Some(false) {
                if let Some(controller) = me.upgrade() {
                    controller.on_unlocked();
                }
            }
        });

        {
            let mut inner = lock(&self.inner);
            inner.sections = sections;
            inner.index = 0;
            inner.phase = Phase::AtSection(0);
            inner.arrow_visible = false;
            inner.subscription = Some(subscription);
        }
        if let Err(err) = self.surface.set_content_active(0, true) {
            warn!("[Progress] {}", err);
        }
        Ok(())
    }

    /// Restore native scrolling and remove the arrow
    pub fn destroy(&self) {
        let subscription = {
            let mut inner = lock(&self.inner);
            inner.phase = Phase::Idle;
            inner.arrow_visible = false;
            inner.awaiting_dialogue = false;
            inner.transition += 1;
            inner.visited.clear();
            inner.raining = false;
            inner.subscription.take()
        };
        if let Some(subscription) = subscription {
            self.store.unobserve(subscription);
        }
        self.surface.remove_arrow();
        self.surface.set_native_scroll(true);
        info!("[Progress] destroyed");
    }

    /// Run `hook` after every settled arrival
    pub fn on_arrival(&self, hook: impl Fn(usize, &Section) + Send + Sync + 'static) {
        lock(&self.arrival_hooks).push(Arc::new(hook));
    }

    pub fn arrival_hook_count(&self) -> usize {
        lock(&self.arrival_hooks).len()
    }

    // Queries

    pub fn phase(&self) -> Phase {
        lock(&self.inner).phase
    }

    pub fn current_index(&self) -> usize {
        lock(&self.inner).index
    }

    pub fn section_count(&self) -> usize {
        lock(&self.inner).sections.len()
    }

    pub fn section(&self, index: usize) -> Option<Section> {
        lock(&self.inner).sections.get(index).cloned()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        lock(&self.inner).sections.iter().position(|s| s.id == id)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.phase(), Phase::Blocked(_))
    }

    pub fn arrow_visible(&self) -> bool {
        lock(&self.inner).arrow_visible
    }

    // Arrow

    fn show_arrow(&self) {
        lock(&self.inner).arrow_visible = true;
        self.surface.set_arrow_visible(true);
    }

    pub fn hide_arrow(&self) {
        lock(&self.inner).arrow_visible = false;
        self.surface.set_arrow_visible(false);
    }

    /// Show the arrow if nothing forbids it right now
    fn show_arrow_if_allowed(&self, transition: u64) {
        let allowed = {
            let inner = lock(&self.inner);
            inner.transition == transition
                && inner.phase == Phase::AtSection(inner.index)
                && inner.index + 1 < inner.sections.len()
        };
        if allowed && !self.store.scroll_locked() {
            debug!("[Progress] arrow shown");
            self.show_arrow();
        }
    }

    /// Reveal the arrow `delay` after dialogue has finished, polling within a
    /// bound. One waiter serves every arrival made while it polls, so the
    /// transition is read when the dialogue settles.
    fn reveal_after_dialogue(&self, delay: Duration) {
        {
            let mut inner = lock(&self.inner);
            if inner.awaiting_dialogue {
                return;
            }
            inner.awaiting_dialogue = true;
        }
        let me = self.me.clone();
        let dialogue = self.dialogue.clone();
        let poll = self.timing.dialogue_poll_interval;
        let bound = self.timing.unlock_wait_timeout;
        self.scheduler.spawn(async move {
            let settled = tokio::time::timeout(bound, async {
                loop {
                    tokio::time::sleep(poll).await;
                    if !dialogue.is_active() {
                        break;
                    }
                }
            })
            .await
            .is_ok();
            let Some(controller) = me.upgrade() else {
                return;
            };
            let transition = {
                let mut inner = lock(&controller.inner);
                inner.awaiting_dialogue = false;
                inner.transition
            };
            if !settled {
                warn!("[Progress] dialogue still active after {:?}, showing arrow anyway", bound);
            }
            tokio::time::sleep(delay).await;
            controller.show_arrow_if_allowed(transition);
        });
    }

    fn on_unlocked(&self) {
        let reveal = {
            let mut inner = lock(&self.inner);
            if let Phase::Blocked(index) = inner.phase {
                inner.phase = Phase::AtSection(index);
            }
            inner.phase != Phase::Idle && inner.index + 1 < inner.sections.len()
        };
        info!("[Progress] scroll unlocked");
        if reveal {
            self.reveal_after_dialogue(self.timing.unlock_arrow_delay);
        }
    }

    fn block(&self, index: usize, challenge: &str) {
        {
            let mut inner = lock(&self.inner);
            inner.phase = Phase::Blocked(index);
        }
        self.hide_arrow();
        self.store.lock_scroll();
        self.store.set_current_challenge(Some(challenge));
        info!("[Progress] challenge '{}' blocks section {}", challenge, index);
    }

    // Transitions

    /// Press the advance arrow
    pub async fn attempt_advance(&self) -> Result<Advance, ProgressError> {
        let (phase, index, count, requires) = {
            let inner = lock(&self.inner);
            let requires = inner
                .sections
                .get(inner.index)
                .and_then(|s| s.requires.clone());
            (inner.phase, inner.index, inner.sections.len(), requires)
        };

        match phase {
            Phase::Idle => return Err(ProgressError::NotInitialized),
            Phase::Blocked(_) => {
                debug!("[Progress] blocked, advance refused");
                self.surface.shake_arrow();
                return Ok(Advance::Refused);
            }
            Phase::Advancing { .. } => return Ok(Advance::InTransit),
            Phase::AtSection(_) => {}
        }

        if let Some(challenge) = requires {
            if !self.store.is_challenge_complete(&challenge) {
                self.block(index, &challenge);
                return Ok(Advance::Blocked(challenge));
            }
        }

        if index + 1 < count {
            self.go_to_section(index + 1, self.timing.scroll_duration)
                .await?;
            Ok(Advance::Moved(index + 1))
        } else {
            info!("[Progress] end of the journey");
            self.hide_arrow();
            Ok(Advance::End)
        }
    }

    /// Scroll to a section and run the arrival logic once the viewport settles
    pub async fn go_to_section(&self, index: usize, duration: Duration) -> Result<(), ProgressError> {
        let (from, section, transition) = {
            let mut inner = lock(&self.inner);
            if inner.phase == Phase::Idle {
                return Err(ProgressError::NotInitialized);
            }
            let count = inner.sections.len();
            let Some(section) = inner.sections.get(index).cloned() else {
                error!("[Progress] invalid section index {}", index);
                return Err(ProgressError::InvalidIndex { index, count });
            };
            let from = inner.index;
            inner.index = index;
            inner.phase = Phase::Advancing { from, to: index };
            inner.transition += 1;
            (from, section, inner.transition)
        };
        info!(
            "[Progress] section {} -> {} ({}{})",
            from,
            index,
            section.id,
            section
                .chapter
                .map(|c| format!(", chapter {c}"))
                .unwrap_or_default()
        );

        self.hide_arrow();
        for cue in self.cues.iter().filter(|cue| cue.index == index) {
            self.scene.animate(&cue.object, cue.cue);
        }
        if let Err(err) = self.surface.set_content_active(index, true) {
            warn!("[Progress] {}", err);
        }

        self.surface.set_native_scroll(true);
        let bound = duration + self.timing.scroll_settle_margin;
        match tokio::time::timeout(bound, self.surface.scroll_to(index, duration)).await {
            Ok(Ok(())) => debug!("[Progress] scroll settled at {}", index),
            Ok(Err(err)) => warn!("[Progress] {}", err),
            Err(_) => warn!("[Progress] scroll did not settle within {:?}", bound),
        }
        self.surface.set_native_scroll(false);

        if lock(&self.inner).transition != transition {
            debug!("[Progress] arrival at {} superseded", index);
            return Ok(());
        }
        self.arrive(index, &section, transition);
        Ok(())
    }

    fn arrive(&self, index: usize, section: &Section, transition: u64) {
        for previous in 0..index {
            if let Err(err) = self.surface.set_content_active(previous, false) {
                warn!("[Progress] {}", err);
            }
        }

        if let Some(chapter) = section.chapter {
            let previous = self.store.current_chapter();
            self.store.set_current_chapter(chapter);
            if chapter != previous && chapter > 0 && chapter <= self.music.last_auto_chapter {
                if let Err(err) = self.audio.switch_track_for_chapter(
                    chapter,
                    self.music.chapter_fade_out,
                    self.music.chapter_fade_in,
                ) {
                    debug!("[Progress] {}", err);
                }
            }
        }

        self.arrival_effects(&section.id);
        let hooks = lock(&self.arrival_hooks).clone();
        for hook in hooks {
            hook(index, section);
        }

        let unmet = section
            .requires
            .as_deref()
            .filter(|challenge| !self.store.is_challenge_complete(challenge));
        if let Some(challenge) = unmet {
            self.block(index, challenge);
            if self.music.battle_challenges.iter().any(|c| c == challenge) {
                info!("[Progress] battle music for '{}'", challenge);
                if let Err(err) = self.audio.switch_track(
                    &self.music.battle_track,
                    self.music.battle_fade_out,
                    self.music.battle_fade_in,
                ) {
                    debug!("[Progress] {}", err);
                }
            }
            return;
        }

        let last = {
            let mut inner = lock(&self.inner);
            inner.phase = Phase::AtSection(index);
            index + 1 >= inner.sections.len()
        };
        if last {
            return;
        }
        if self.store.scroll_locked() {
            debug!("[Progress] scroll locked, arrow withheld");
        } else if self.dialogue.is_active() {
            debug!("[Progress] dialogue active, arrow withheld");
            self.reveal_after_dialogue(self.timing.arrow_delay);
        } else {
            let me = self.me.clone();
            self.scheduler.after(self.timing.arrow_delay, move || {
                if let Some(controller) = me.upgrade() {
                    controller.show_arrow_if_allowed(transition);
                }
            });
        }
    }

    fn arrival_effects(&self, id: &str) {
        let (first_visit, stop_rain, start_rain) = {
            let mut inner = lock(&self.inner);
            let first_visit = inner.visited.insert(id.to_string());
            let here = id == RAIN_SECTION;
            let stop_rain = inner.raining && !here;
            let start_rain = here && !inner.raining;
            inner.raining = here;
            (first_visit, stop_rain, start_rain)
        };

        if first_visit {
            if let Some((_, effect)) = ARRIVAL_EFFECTS.iter().find(|(section, _)| *section == id) {
                if let Err(err) = self.audio.play_effect(effect) {
                    debug!("[Progress] {}", err);
                }
            }
        }
        if start_rain {
            if let Err(err) = self.audio.play_effect(RAIN_EFFECT) {
                debug!("[Progress] {}", err);
            }
        }
        if stop_rain {
            self.audio.stop_effect(RAIN_EFFECT);
        }
    }

    // Debug shortcuts

    /// Jump straight to a section; requires debug mode
    pub async fn jump_to(&self, index: usize) -> Result<(), ProgressError> {
        if !self.store.debug_mode() {
            warn!("[Progress] jumping is only possible in debug mode");
            return Err(ProgressError::DebugModeRequired);
        }
        self.go_to_section(index, self.timing.scroll_duration).await
    }

    /// Lift any block and show the arrow at once
    pub fn unlock_and_show_arrow(&self) {
        {
            let mut inner = lock(&self.inner);
            if let Phase::Blocked(index) = inner.phase {
                inner.phase = Phase::AtSection(index);
            }
        }
        self.store.unlock_scroll();
        self.show_arrow();
        info!("[Progress] force unlocked");
    }
}
