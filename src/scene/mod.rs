//! Decorative object capability
//!
//! A [`SceneManager`] keeps the registry of named props. Each prop exposes a
//! closed set of [`AnimationCue`]s; asking for anything else is a logged no-op.
//! Starting an animation on a prop aborts the one it is still running.

mod objects;

pub use objects::{IdleMotion, Keyframe, TimelineObject};

use crate::lock;
use crate::scheduler::Scheduler;
use crate::store::StateStore;
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

/// Canned animation timelines a prop may provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationCue {
    /// Rise into view
    Entrance,
    /// Placement for a section of the opening chapter
    Section(u8),
    /// Leave the screen
    Exit,
}

/// Position, rotation (radians), uniform scale and opacity of a prop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: f32,
    pub opacity: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: 1.0,
            opacity: 1.0,
        }
    }
}

impl Transform {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
            ..Self::default()
        }
    }

    pub fn scaled(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn lerp(&self, to: &Transform, t: f32) -> Transform {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        Transform {
            position: std::array::from_fn(|i| mix(self.position[i], to.position[i])),
            rotation: std::array::from_fn(|i| mix(self.rotation[i], to.rotation[i])),
            scale: mix(self.scale, to.scale),
            opacity: mix(self.opacity, to.opacity),
        }
    }
}

/// The 3D rendering backend
pub trait Renderer: Send + Sync {
    fn set_visible(&self, object: &str, visible: bool);
    fn set_transform(&self, object: &str, transform: &Transform);
}

/// A named prop driven by canned timelines
#[async_trait]
pub trait DecorativeObject: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, cue: AnimationCue) -> bool;

    fn set_visible(&self, visible: bool);

    fn is_visible(&self) -> bool;

    /// Run a timeline to its end
    async fn animate(&self, cue: AnimationCue);

    /// Per-frame idle motion
    fn frame(&self, delta: f32, elapsed: f32);
}

/// Completion of a started animation
pub struct Animation {
    done: oneshot::Receiver<()>,
}

impl Animation {
    /// Wait for the timeline; false when it was interrupted by a newer one
    pub async fn finished(self) -> bool {
        self.done.await.is_ok()
    }
}

pub struct SceneManager {
    store: Arc<StateStore>,
    scheduler: Arc<Scheduler>,
    objects: Mutex<Vec<Arc<dyn DecorativeObject>>>,
    running: Mutex<HashMap<String, AbortHandle>>,
    render_loop: Mutex<Option<AbortHandle>>,
}

impl SceneManager {
    pub fn new(store: Arc<StateStore>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            store,
            scheduler,
            objects: Mutex::new(Vec::new()),
            running: Mutex::new(HashMap::new()),
            render_loop: Mutex::new(None),
        }
    }

    /// Register a prop, replacing any prop with the same name
    pub fn add(&self, object: Arc<dyn DecorativeObject>) {
        let mut objects = lock(&self.objects);
        objects.retain(|o| o.name() != object.name());
        debug!("[Scene] added '{}'", object.name());
        objects.push(object);
    }

    pub fn remove(&self, name: &str) {
        self.stop(name);
        lock(&self.objects).retain(|o| o.name() != name);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DecorativeObject>> {
        lock(&self.objects).iter().find(|o| o.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        lock(&self.objects).iter().map(|o| o.name().to_string()).collect()
    }

    /// Make a prop visible and the active one
    pub fn show(&self, name: &str) {
        match self.get(name) {
            Some(object) => {
                object.set_visible(true);
                self.store.set_active_object(Some(name));
            }
            None => warn!("[Scene] object '{}' not found", name),
        }
    }

    pub fn hide(&self, name: &str) {
        let Some(object) = self.get(name) else {
            warn!("[Scene] object '{}' not found", name);
            return;
        };
        object.set_visible(false);
        if self.store.active_object().as_deref() == Some(name) {
            self.store.set_active_object(None);
        }
    }

    pub fn hide_all(&self) {
        for name in self.names() {
            self.stop(&name);
            self.hide(&name);
        }
    }

    /// Start a canned timeline; `None` when the prop or cue does not exist
    pub fn animate(&self, name: &str, cue: AnimationCue) -> Option<Animation> {
        let Some(object) = self.get(name) else {
            warn!("[Scene] object '{}' not found", name);
            return None;
        };
        if !object.supports(cue) {
            warn!("[Scene] '{}' has no {:?} animation", name, cue);
            return None;
        }

        let (tx, rx) = oneshot::channel();
        let handle = self.scheduler.spawn(async move {
            object.animate(cue).await;
            let _ = tx.send(());
        });
        if let Some(previous) = lock(&self.running).insert(name.to_string(), handle) {
            previous.abort();
        }
        debug!("[Scene] '{}' playing {:?}", name, cue);
        Some(Animation { done: rx })
    }

    /// Kill the in-flight animation of a prop
    pub fn stop(&self, name: &str) {
        if let Some(handle) = lock(&self.running).remove(name) {
            handle.abort();
        }
    }

    /// Advance idle motion of every visible prop
    pub fn frame(&self, delta: f32, elapsed: f32) {
        let objects = lock(&self.objects).clone();
        for object in objects.iter().filter(|o| o.is_visible()) {
            object.frame(delta, elapsed);
        }
    }

    /// Drive `frame` from a timer until `stop_render_loop`
    pub fn start_render_loop(self: &Arc<Self>, interval: Duration) {
        let scene = Arc::downgrade(self);
        let handle = self.scheduler.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let start = tokio::time::Instant::now();
            let mut last = start;
            loop {
                let now = ticker.tick().await;
                let Some(scene) = scene.upgrade() else {
                    break;
                };
                scene.frame(
                    (now - last).as_secs_f32(),
                    (now - start).as_secs_f32(),
                );
                last = now;
            }
        });
        if let Some(previous) = lock(&self.render_loop).replace(handle) {
            previous.abort();
        }
    }

    pub fn stop_render_loop(&self) {
        if let Some(handle) = lock(&self.render_loop).take() {
            handle.abort();
        }
    }
}
