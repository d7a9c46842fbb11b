//! In-memory implementations of the capability traits
//!
//! They record every call so tests can assert on side effects, and double as
//! the silent backends of the terminal player.

use crate::audio::AudioBackend;
use crate::errors::{AudioError, SurfaceError};
use crate::lock;
use crate::scene::{Renderer, Transform};
use crate::surface::{DialogueSurface, PresentationSurface};
use crate::types::{ChoiceOption, Section, ToastKind};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// A call made on [`MemoryAudioBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    Play {
        asset: String,
        volume: f32,
        looping: bool,
    },
    Stop(String),
    Pause(String),
    Resume(String),
    Fade {
        asset: String,
        to: f32,
        duration: Duration,
    },
    SetVolume {
        asset: String,
        volume: f32,
    },
    Muted(bool),
}

#[derive(Default)]
struct AudioInner {
    events: Vec<AudioEvent>,
    playing: HashMap<String, f32>,
    missing: HashSet<String>,
}

/// Records playback; non-looping assets "finish" after `clip_length`
pub struct MemoryAudioBackend {
    inner: Mutex<AudioInner>,
    clip_length: Duration,
}

impl Default for MemoryAudioBackend {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl MemoryAudioBackend {
    pub fn new(clip_length: Duration) -> Self {
        Self {
            inner: Mutex::new(AudioInner::default()),
            clip_length,
        }
    }

    /// Make `play` fail for an asset, like a file that did not load
    pub fn with_missing(self, asset: &str) -> Self {
        lock(&self.inner).missing.insert(asset.to_string());
        self
    }

    pub fn events(&self) -> Vec<AudioEvent> {
        lock(&self.inner).events.clone()
    }

    pub fn clear_events(&self) {
        lock(&self.inner).events.clear();
    }

    /// Assets passed to `play`, in order
    pub fn played(&self) -> Vec<String> {
        lock(&self.inner)
            .events
            .iter()
            .filter_map(|event| match event {
                AudioEvent::Play { asset, .. } => Some(asset.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn volume_of(&self, asset: &str) -> Option<f32> {
        lock(&self.inner).playing.get(asset).copied()
    }
}

#[async_trait]
impl AudioBackend for MemoryAudioBackend {
    fn play(&self, asset: &str, volume: f32, looping: bool) -> Result<(), AudioError> {
        let mut inner = lock(&self.inner);
        if inner.missing.contains(asset) {
            return Err(AudioError::backend(asset, "asset failed to load"));
        }
        inner.events.push(AudioEvent::Play {
            asset: asset.to_string(),
            volume,
            looping,
        });
        inner.playing.insert(asset.to_string(), volume);
        Ok(())
    }

    fn stop(&self, asset: &str) {
        let mut inner = lock(&self.inner);
        inner.events.push(AudioEvent::Stop(asset.to_string()));
        inner.playing.remove(asset);
    }

    fn pause(&self, asset: &str) {
        lock(&self.inner).events.push(AudioEvent::Pause(asset.to_string()));
    }

    fn resume(&self, asset: &str) {
        lock(&self.inner).events.push(AudioEvent::Resume(asset.to_string()));
    }

    fn fade(&self, asset: &str, to: f32, duration: Duration) {
        let mut inner = lock(&self.inner);
        inner.events.push(AudioEvent::Fade {
            asset: asset.to_string(),
            to,
            duration,
        });
        if let Some(volume) = inner.playing.get_mut(asset) {
            *volume = to;
        }
    }

    fn set_volume(&self, asset: &str, volume: f32) {
        let mut inner = lock(&self.inner);
        inner.events.push(AudioEvent::SetVolume {
            asset: asset.to_string(),
            volume,
        });
        if let Some(current) = inner.playing.get_mut(asset) {
            *current = volume;
        }
    }

    fn is_playing(&self, asset: &str) -> bool {
        lock(&self.inner).playing.contains_key(asset)
    }

    fn set_muted(&self, muted: bool) {
        lock(&self.inner).events.push(AudioEvent::Muted(muted));
    }

    async fn finished(&self, asset: &str) {
        tokio::time::sleep(self.clip_length).await;
        lock(&self.inner).playing.remove(asset);
    }
}

/// A call made on [`MemorySurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    ContentActive { index: usize, active: bool },
    NativeScroll(bool),
    ArrowCreated,
    Arrow(bool),
    Shake,
    ArrowRemoved,
    ScrollTo(usize),
    Element { id: String, visible: bool },
    Text { id: String, text: String },
    Flash(String),
}

#[derive(Default)]
struct SurfaceInner {
    events: Vec<SurfaceEvent>,
    active: BTreeSet<usize>,
    native_scroll: bool,
    arrow: Option<bool>,
    position: usize,
    visible_elements: BTreeSet<String>,
    texts: HashMap<String, String>,
}

/// Sections and elements held in memory
pub struct MemorySurface {
    sections: Vec<Section>,
    elements: HashSet<String>,
    /// When false, `scroll_to` never settles
    settles: bool,
    inner: Mutex<SurfaceInner>,
}

impl MemorySurface {
    pub fn new(sections: Vec<Section>) -> Self {
        Self {
            sections,
            elements: HashSet::new(),
            settles: true,
            inner: Mutex::new(SurfaceInner {
                native_scroll: true,
                ..SurfaceInner::default()
            }),
        }
    }

    /// Declare element ids that exist besides the sections
    pub fn with_elements<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.elements.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn never_settling(mut self) -> Self {
        self.settles = false;
        self
    }

    fn has_element(&self, id: &str) -> bool {
        self.elements.contains(id) || self.sections.iter().any(|s| s.id == id)
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        lock(&self.inner).events.clone()
    }

    pub fn clear_events(&self) {
        lock(&self.inner).events.clear();
    }

    /// `None` until the arrow is created
    pub fn arrow_visible(&self) -> Option<bool> {
        lock(&self.inner).arrow
    }

    pub fn shakes(&self) -> usize {
        lock(&self.inner)
            .events
            .iter()
            .filter(|e| **e == SurfaceEvent::Shake)
            .count()
    }

    pub fn active_contents(&self) -> Vec<usize> {
        lock(&self.inner).active.iter().copied().collect()
    }

    pub fn native_scroll(&self) -> bool {
        lock(&self.inner).native_scroll
    }

    /// Section index the viewport rests on
    pub fn position(&self) -> usize {
        lock(&self.inner).position
    }

    pub fn element_visible(&self, id: &str) -> bool {
        lock(&self.inner).visible_elements.contains(id)
    }

    pub fn text(&self, id: &str) -> Option<String> {
        lock(&self.inner).texts.get(id).cloned()
    }
}

#[async_trait]
impl PresentationSurface for MemorySurface {
    fn sections(&self) -> Vec<Section> {
        self.sections.clone()
    }

    fn set_content_active(&self, index: usize, active: bool) -> Result<(), SurfaceError> {
        if index >= self.sections.len() {
            return Err(SurfaceError::MissingSection { index });
        }
        let mut inner = lock(&self.inner);
        inner.events.push(SurfaceEvent::ContentActive { index, active });
        if active {
            inner.active.insert(index);
        } else {
            inner.active.remove(&index);
        }
        Ok(())
    }

    fn set_native_scroll(&self, enabled: bool) {
        let mut inner = lock(&self.inner);
        inner.events.push(SurfaceEvent::NativeScroll(enabled));
        inner.native_scroll = enabled;
    }

    fn create_arrow(&self) {
        let mut inner = lock(&self.inner);
        inner.events.push(SurfaceEvent::ArrowCreated);
        inner.arrow = Some(false);
    }

    fn set_arrow_visible(&self, visible: bool) {
        let mut inner = lock(&self.inner);
        if inner.arrow.is_some() {
            inner.events.push(SurfaceEvent::Arrow(visible));
            inner.arrow = Some(visible);
        }
    }

    fn shake_arrow(&self) {
        lock(&self.inner).events.push(SurfaceEvent::Shake);
    }

    fn remove_arrow(&self) {
        let mut inner = lock(&self.inner);
        inner.events.push(SurfaceEvent::ArrowRemoved);
        inner.arrow = None;
    }

    async fn scroll_to(&self, index: usize, duration: Duration) -> Result<(), SurfaceError> {
        if index >= self.sections.len() {
            return Err(SurfaceError::MissingSection { index });
        }
        lock(&self.inner).events.push(SurfaceEvent::ScrollTo(index));
        if !self.settles {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(duration).await;
        lock(&self.inner).position = index;
        Ok(())
    }

    fn set_element_visible(
        &self,
        id: &str,
        visible: bool,
        _fade: Duration,
    ) -> Result<(), SurfaceError> {
        if !self.has_element(id) {
            return Err(SurfaceError::missing_element(id));
        }
        let mut inner = lock(&self.inner);
        inner.events.push(SurfaceEvent::Element {
            id: id.to_string(),
            visible,
        });
        if visible {
            inner.visible_elements.insert(id.to_string());
        } else {
            inner.visible_elements.remove(id);
        }
        Ok(())
    }

    fn set_text(&self, id: &str, text: &str) -> Result<(), SurfaceError> {
        if !self.has_element(id) {
            return Err(SurfaceError::missing_element(id));
        }
        let mut inner = lock(&self.inner);
        inner.events.push(SurfaceEvent::Text {
            id: id.to_string(),
            text: text.to_string(),
        });
        inner.texts.insert(id.to_string(), text.to_string());
        Ok(())
    }

    fn flash(&self, color: &str, _fade_in: Duration, _fade_out: Duration) {
        lock(&self.inner)
            .events
            .push(SurfaceEvent::Flash(color.to_string()));
    }
}

#[derive(Default)]
struct DialogueInner {
    lines: Vec<String>,
    current: Option<String>,
    advance_button: bool,
    box_visible: bool,
    choice: Option<(String, Vec<ChoiceOption>)>,
    toasts: HashMap<u64, (String, ToastKind)>,
    toast_log: Vec<String>,
}

/// Dialogue box held in memory
#[derive(Default)]
pub struct MemoryDialogueSurface {
    inner: Mutex<DialogueInner>,
}

impl MemoryDialogueSurface {
    /// Every line shown, in order
    pub fn lines(&self) -> Vec<String> {
        lock(&self.inner).lines.clone()
    }

    pub fn current(&self) -> Option<String> {
        lock(&self.inner).current.clone()
    }

    pub fn advance_button(&self) -> bool {
        lock(&self.inner).advance_button
    }

    pub fn box_visible(&self) -> bool {
        lock(&self.inner).box_visible
    }

    pub fn choice(&self) -> Option<(String, Vec<ChoiceOption>)> {
        lock(&self.inner).choice.clone()
    }

    pub fn open_toasts(&self) -> Vec<String> {
        lock(&self.inner)
            .toasts
            .values()
            .map(|(text, _)| text.clone())
            .collect()
    }

    /// Every toast text ever shown
    pub fn toast_log(&self) -> Vec<String> {
        lock(&self.inner).toast_log.clone()
    }
}

impl DialogueSurface for MemoryDialogueSurface {
    fn show_line(&self, text: &str, show_advance_button: bool) {
        let mut inner = lock(&self.inner);
        inner.lines.push(text.to_string());
        inner.current = Some(text.to_string());
        inner.advance_button = show_advance_button;
        inner.choice = None;
    }

    fn show_choice(&self, prompt: &str, options: &[ChoiceOption]) {
        let mut inner = lock(&self.inner);
        inner.current = Some(prompt.to_string());
        inner.advance_button = false;
        inner.choice = Some((prompt.to_string(), options.to_vec()));
    }

    fn set_box_visible(&self, visible: bool) {
        let mut inner = lock(&self.inner);
        inner.box_visible = visible;
        if !visible {
            inner.choice = None;
        }
    }

    fn show_toast(&self, id: u64, text: &str, kind: ToastKind) {
        let mut inner = lock(&self.inner);
        inner.toasts.insert(id, (text.to_string(), kind));
        inner.toast_log.push(text.to_string());
    }

    fn remove_toast(&self, id: u64) {
        lock(&self.inner).toasts.remove(&id);
    }
}

/// Remembers the last transform and visibility per prop
#[derive(Default)]
pub struct MemoryRenderer {
    transforms: Mutex<HashMap<String, Transform>>,
    visibility: Mutex<HashMap<String, bool>>,
}

impl MemoryRenderer {
    pub fn last_transform(&self, object: &str) -> Option<Transform> {
        lock(&self.transforms).get(object).copied()
    }

    pub fn visible(&self, object: &str) -> Option<bool> {
        lock(&self.visibility).get(object).copied()
    }
}

impl Renderer for MemoryRenderer {
    fn set_visible(&self, object: &str, visible: bool) {
        lock(&self.visibility).insert(object.to_string(), visible);
    }

    fn set_transform(&self, object: &str, transform: &Transform) {
        lock(&self.transforms).insert(object.to_string(), *transform);
    }
}
