//! Sound capability
//!
//! [`AudioManager`] owns the narration line, the effect table and the looping
//! music tracks on top of an opaque [`AudioBackend`]. Missing assets and
//! backend failures are logged and turn the call into a no-op.

use crate::config::AudioConfig;
use crate::errors::AudioError;
use crate::lock;
use crate::scheduler::Scheduler;
use crate::store::StateStore;
use crate::types::Callback;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::AbortHandle;


/// Playback of named assets
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start playing an asset from the beginning at `volume`
    fn play(&self, asset: &str, volume: f32, looping: bool) -> Result<(), AudioError>;

    fn stop(&self, asset: &str);

    fn pause(&self, asset: &str);

    fn resume(&self, asset: &str);

    /// Ramp the volume of a playing asset to `to` over `duration`
    fn fade(&self, asset: &str, to: f32, duration: Duration);

    fn set_volume(&self, asset: &str, volume: f32);

    fn is_playing(&self, asset: &str) -> bool;

    /// Silence every output without touching bus volumes
    fn set_muted(&self, muted: bool);

    /// Resolves when the current playback of a non-looping asset reaches its end
    async fn finished(&self, asset: &str);
}

/// Independent volume buses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bus {
    Master,
    Narration,
    Music,
    Sfx,
}

#[derive(Debug, Clone, Copy)]
struct Volumes {
    master: f32,
    narration: f32,
    music: f32,
    sfx: f32,
}

struct AudioState {
    volumes: Volumes,
    muted: bool,
    /// Name of the background track slot, playing or not
    track: Option<String>,
    narration_end: Option<AbortHandle>,
}

pub struct AudioManager {
    backend: Arc<dyn AudioBackend>,
    config: AudioConfig,
    store: Arc<StateStore>,
    scheduler: Arc<Scheduler>,
    state: Arc<Mutex<AudioState>>,
}

impl AudioManager {
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        config: AudioConfig,
        store: Arc<StateStore>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        let volumes = Volumes {
            master: config.master_volume.clamp(0.0, 1.0),
            narration: config.narration_volume.clamp(0.0, 1.0),
            music: config.music_volume.clamp(0.0, 1.0),
            sfx: config.sfx_volume.clamp(0.0, 1.0),
        };
        Self {
            backend,
            config,
            store,
            scheduler,
            state: Arc::new(Mutex::new(AudioState {
                volumes,
                muted: false,
                track: None,
                narration_end: None,
            })),
        }
    }

    fn volumes(&self) -> Volumes {
        lock(&self.state).volumes
    }

    pub fn is_muted(&self) -> bool {
        lock(&self.state).muted
    }

    /// Name of the current background track slot
    pub fn current_track(&self) -> Option<String> {
        lock(&self.state).track.clone()
    }

    // Narration

    /// Play the narration line, restarting it if needed; `on_end` fires when it
    /// finishes naturally, never after `stop_narration`
    pub fn play_narration(&self, on_end: Option<Callback>) {
        if self.is_muted() {
            return;
        }
        let asset = self.config.narration.clone();
        self.cancel_narration_end();
        if self.backend.is_playing(&asset) {
            self.backend.stop(&asset);
        }

        let volumes = self.volumes();
        if let Err(err) = self
            .backend
            .play(&asset, volumes.narration * volumes.master, false)
        {
            warn!("[Audio] narration unavailable: {}", err);
            return;
        }

        if let Some(on_end) = on_end {
            let backend = self.backend.clone();
            let handle = self.scheduler.spawn(async move {
                backend.finished(&asset).await;
                on_end();
            });
            lock(&self.state).narration_end = Some(handle);
        }
    }

    pub fn stop_narration(&self) {
        self.cancel_narration_end();
        self.backend.stop(&self.config.narration);
    }

    fn cancel_narration_end(&self) {
        if let Some(handle) = lock(&self.state).narration_end.take() {
            handle.abort();
        }
    }

    // Effects

    pub fn play_effect(&self, name: &str) -> Result<(), AudioError> {
        if self.is_muted() {
            return Ok(());
        }
        let Some(effect) = self.config.effects.get(name) else {
            warn!("[Audio] sound effect '{}' not found", name);
            return Err(AudioError::UnknownEffect { name: name.into() });
        };
        let volumes = self.volumes();
        self.backend
            .play(&effect.path, volumes.sfx * volumes.master, effect.looping)
            .inspect_err(|err| warn!("[Audio] {}", err))
    }

    pub fn stop_effect(&self, name: &str) {
        match self.config.effects.get(name) {
            Some(effect) => self.backend.stop(&effect.path),
            None => warn!("[Audio] sound effect '{}' not found", name),
        }
    }

    // Music

    /// Crossfade to a named track
    pub fn switch_track(
        &self,
        name: &str,
        fade_out: Duration,
        fade_in: Duration,
    ) -> Result<(), AudioError> {
        let Some(asset) = self.config.tracks.get(name).cloned() else {
            warn!(
                "[Audio] track '{}' not found, available: {:?}",
                name,
                self.config.tracks.keys().collect::<Vec<_>>()
            );
            return Err(AudioError::UnknownTrack { name: name.into() });
        };
        let volumes = self.volumes();
        let target = volumes.music * volumes.master;
        let previous = self.current_track();

        if previous.as_deref() == Some(name) {
            if self.backend.is_playing(&asset) {
                debug!("[Audio] '{}' already playing", name);
            } else {
                info!("[Audio] restarting '{}'", name);
                self.backend
                    .play(&asset, target, true)
                    .inspect_err(|err| warn!("[Audio] {}", err))?;
            }
            self.store.set_music_track(Some(name));
            return Ok(());
        }

        if let Some(old_asset) = previous
            .as_deref()
            .and_then(|old| self.config.tracks.get(old))
            .cloned()
        {
            if self.backend.is_playing(&old_asset) {
                self.backend.fade(&old_asset, 0.0, fade_out);
                self.stop_track_after(old_asset, fade_out);
            } else {
                self.backend.stop(&old_asset);
            }
        }

        lock(&self.state).track = Some(name.to_string());
        info!("[Audio] switching to '{}' ({:?} in)", name, fade_in);
        self.backend
            .play(&asset, 0.0, true)
            .inspect_err(|err| warn!("[Audio] failed to start '{}': {}", name, err))?;
        self.backend.fade(&asset, target, fade_in);
        self.store.set_music_track(Some(name));
        Ok(())
    }

    /// Crossfade to the track mapped for a chapter key such as `3` or `7_batalha`
    pub fn switch_track_for_chapter(
        &self,
        chapter: impl Display,
        fade_out: Duration,
        fade_in: Duration,
    ) -> Result<(), AudioError> {
        let chapter = chapter.to_string();
        let Some(track) = self.config.chapter_tracks.get(&chapter).cloned() else {
            warn!("[Audio] no track mapped for chapter '{}'", chapter);
            return Err(AudioError::UnmappedChapter { chapter });
        };
        debug!("[Audio] chapter {} -> '{}'", chapter, track);
        self.switch_track(&track, fade_out, fade_in)
    }

    /// Stop a faded-out track unless it became current again meanwhile
    fn stop_track_after(&self, asset: String, delay: Duration) {
        let backend = self.backend.clone();
        let state = self.state.clone();
        let tracks = self.config.tracks.clone();
        self.scheduler.after(delay, move || {
            let current = lock(&state)
                .track
                .as_ref()
                .and_then(|name| tracks.get(name).cloned());
            if current.as_deref() != Some(asset.as_str()) {
                backend.stop(&asset);
            }
        });
    }

    /// Fade the music out and clear the track slot
    pub fn stop_music(&self, fade_out: Duration) {
        let Some(name) = lock(&self.state).track.take() else {
            return;
        };
        let Some(asset) = self.config.tracks.get(&name).cloned() else {
            return;
        };
        self.backend.fade(&asset, 0.0, fade_out);
        self.stop_track_after(asset, fade_out);
        self.store.set_music_track(None);
    }

    pub fn pause_music(&self) {
        if let Some(asset) = self.current_track_asset() {
            self.backend.pause(&asset);
        }
    }

    pub fn resume_music(&self) {
        if let Some(asset) = self.current_track_asset() {
            self.backend.resume(&asset);
        }
    }

    fn current_track_asset(&self) -> Option<String> {
        let name = self.current_track()?;
        self.config.tracks.get(&name).cloned()
    }

    // Volumes

    /// Set a bus volume, clamped to [0, 1], and apply it to what is playing
    pub fn set_volume(&self, bus: Bus, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        let volumes = {
            let mut state = lock(&self.state);
            match bus {
                Bus::Master => state.volumes.master = volume,
                Bus::Narration => state.volumes.narration = volume,
                Bus::Music => state.volumes.music = volume,
                Bus::Sfx => state.volumes.sfx = volume,
            }
            state.volumes
        };

        if matches!(bus, Bus::Master | Bus::Narration) {
            self.backend
                .set_volume(&self.config.narration, volumes.narration * volumes.master);
        }
        if matches!(bus, Bus::Master | Bus::Music) {
            if let Some(asset) = self.current_track_asset() {
                self.backend.set_volume(&asset, volumes.music * volumes.master);
            }
        }
        if matches!(bus, Bus::Master | Bus::Sfx) {
            for effect in self.config.effects.values() {
                self.backend
                    .set_volume(&effect.path, volumes.sfx * volumes.master);
            }
        }
    }

    pub fn volume(&self, bus: Bus) -> f32 {
        let volumes = self.volumes();
        match bus {
            Bus::Master => volumes.master,
            Bus::Narration => volumes.narration,
            Bus::Music => volumes.music,
            Bus::Sfx => volumes.sfx,
        }
    }

    /// Flip the global mute; returns the new state
    pub fn toggle_mute(&self) -> bool {
        let muted = {
            let mut state = lock(&self.state);
            state.muted = !state.muted;
            state.muted
        };
        self.backend.set_muted(muted);
        muted
    }

    /// Stop narration, every effect, and fade the music out
    pub fn stop_all(&self) {
        self.stop_narration();
        self.stop_music(Duration::from_millis(500));
        for effect in self.config.effects.values() {
            self.backend.stop(&effect.path);
        }
    }
}
