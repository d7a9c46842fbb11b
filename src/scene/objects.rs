//! Keyframed props

use super::{AnimationCue, DecorativeObject, Renderer, Transform};
use crate::lock;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const FRAME: Duration = Duration::from_millis(16);

/// One step of a timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub duration: Duration,
    /// Target pose; `None` holds the current one
    pub to: Option<Transform>,
}

impl Keyframe {
    pub fn to(duration: Duration, to: Transform) -> Self {
        Self {
            duration,
            to: Some(to),
        }
    }

    pub fn hold(duration: Duration) -> Self {
        Self { duration, to: None }
    }

    /// Jump to a pose without tweening
    pub fn set(to: Transform) -> Self {
        Self::to(Duration::ZERO, to)
    }
}

/// Idle sway (rotation around z) and bob (vertical offset)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IdleMotion {
    pub sway_speed: f32,
    pub sway_amplitude: f32,
    pub bob_speed: f32,
    pub bob_amplitude: f32,
}

impl IdleMotion {
    fn offset(&self, base: &Transform, elapsed: f32) -> Transform {
        let mut pose = *base;
        pose.rotation[2] += (elapsed * self.sway_speed).sin() * self.sway_amplitude;
        pose.position[1] += (elapsed * self.bob_speed).sin() * self.bob_amplitude;
        pose
    }
}

struct Pose {
    /// Settled transform, without idle offsets
    anchor: Transform,
    visible: bool,
    animating: bool,
}

/// A prop whose cues are keyframe timelines pushed to a [`Renderer`]
pub struct TimelineObject {
    name: String,
    renderer: Arc<dyn Renderer>,
    timelines: BTreeMap<AnimationCue, Vec<Keyframe>>,
    idle: IdleMotion,
    pose: Mutex<Pose>,
}

/// Clears the animating flag even when the timeline is aborted
struct Animating<'a>(&'a Mutex<Pose>);

impl Drop for Animating<'_> {
    fn drop(&mut self) {
        lock(self.0).animating = false;
    }
}

impl TimelineObject {
    pub fn new(name: impl Into<String>, renderer: Arc<dyn Renderer>, rest: Transform) -> Self {
        Self {
            name: name.into(),
            renderer,
            timelines: BTreeMap::new(),
            idle: IdleMotion::default(),
            pose: Mutex::new(Pose {
                anchor: rest,
                visible: false,
                animating: false,
            }),
        }
    }

    pub fn with_timeline(mut self, cue: AnimationCue, keyframes: Vec<Keyframe>) -> Self {
        self.timelines.insert(cue, keyframes);
        self
    }

    pub fn with_idle(mut self, idle: IdleMotion) -> Self {
        self.idle = idle;
        self
    }

    pub fn transform(&self) -> Transform {
        lock(&self.pose).anchor
    }

    fn apply(&self, transform: Transform) {
        lock(&self.pose).anchor = transform;
        self.renderer.set_transform(&self.name, &transform);
    }

    async fn tween(&self, keyframe: &Keyframe) {
        let from = self.transform();
        let to = keyframe.to.unwrap_or(from);
        if keyframe.duration.is_zero() {
            self.apply(to);
            return;
        }
        let steps = (keyframe.duration.as_millis() / FRAME.as_millis()).max(1) as u32;
        let step = keyframe.duration / steps;
        for i in 1..=steps {
            tokio::time::sleep(step).await;
            let t = i as f32 / steps as f32;
            self.apply(from.lerp(&to, ease_in_out(t)));
        }
    }

    /// Shared shape of the opening-chapter props: rise from below at `large`
    /// scale, then the per-section placements at `normal` scale
    fn prop(name: &str, renderer: Arc<dyn Renderer>, normal: f32, large: f32) -> Self {
        let below = Transform::at(0.0, -4.0, 0.0).scaled(large);
        let third = Transform::at(0.0, -0.8, 0.0).scaled(large);
        let top = Transform::at(0.0, 2.0, 0.0).scaled(large);
        let right = Transform::at(2.0, 0.0, 0.0).scaled(normal);
        let left = Transform::at(-0.65, -0.2, 0.0).scaled(normal);
        let above = Transform::at(0.0, 0.8, 0.0).scaled(normal * 0.8);
        let center_right = Transform::at(1.5, 0.0, 0.0).scaled(normal);
        let center_below = Transform::at(0.0, -0.5, 0.0).scaled(large);
        let gone = Transform::at(-2.0, -6.0, 0.0).scaled(large).with_opacity(0.0);
        let ms = Duration::from_millis;

        Self::new(name, renderer, below)
            .with_timeline(
                AnimationCue::Entrance,
                vec![
                    Keyframe::set(below),
                    Keyframe::to(ms(2000), third),
                    Keyframe::hold(ms(2000)),
                ],
            )
            .with_timeline(
                AnimationCue::Section(1),
                vec![Keyframe::to(ms(500), top), Keyframe::to(ms(800), right)],
            )
            .with_timeline(AnimationCue::Section(2), vec![Keyframe::to(ms(1200), left)])
            .with_timeline(
                AnimationCue::Section(3),
                vec![
                    Keyframe::to(ms(400), above),
                    Keyframe::to(ms(400), center_right),
                    Keyframe::to(ms(400), center_below),
                ],
            )
            .with_timeline(AnimationCue::Section(4), vec![Keyframe::to(ms(1200), gone)])
    }

    /// The sorting hat, narrator of the opening chapter
    pub fn hat(renderer: Arc<dyn Renderer>) -> Self {
        Self::prop("chapeu", renderer, 3.0, 3.9).with_idle(IdleMotion {
            sway_speed: 0.8,
            sway_amplitude: 0.05,
            bob_speed: 1.5,
            bob_amplitude: 0.08,
        })
    }

    pub fn chest(renderer: Arc<dyn Renderer>) -> Self {
        Self::prop("bau", renderer, 0.7, 1.1).with_idle(IdleMotion {
            sway_speed: 0.7,
            sway_amplitude: 0.03,
            bob_speed: 1.0,
            bob_amplitude: 0.06,
        })
    }

    pub fn pensieve(renderer: Arc<dyn Renderer>) -> Self {
        Self::prop("penseira", renderer, 0.6, 1.0).with_idle(IdleMotion {
            bob_speed: 1.2,
            bob_amplitude: 0.05,
            ..IdleMotion::default()
        })
    }

    pub fn wand(renderer: Arc<dyn Renderer>) -> Self {
        Self::prop("varinha", renderer, 0.5, 0.9).with_idle(IdleMotion {
            sway_speed: 1.0,
            sway_amplitude: 0.08,
            ..IdleMotion::default()
        })
    }

    /// Flies up from below and away again; no section placements
    pub fn phoenix(renderer: Arc<dyn Renderer>) -> Self {
        let tilt = -std::f32::consts::FRAC_PI_4;
        let mut start = Transform::at(0.0, -5.0, 0.0).scaled(0.6);
        start.rotation[2] = tilt;
        let mut center = Transform::at(0.0, 0.0, 0.0).scaled(0.6);
        center.rotation[2] = tilt;
        let mut away = Transform::at(0.0, 6.0, 0.0).scaled(0.6).with_opacity(0.0);
        away.rotation[2] = tilt;

        Self::new("fenix", renderer, start)
            .with_timeline(
                AnimationCue::Entrance,
                vec![Keyframe::set(start), Keyframe::to(Duration::from_secs(3), center)],
            )
            .with_timeline(AnimationCue::Exit, vec![Keyframe::to(Duration::from_secs(3), away)])
            .with_idle(IdleMotion {
                sway_speed: 2.0,
                sway_amplitude: 0.2,
                ..IdleMotion::default()
            })
    }
}

fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

#[async_trait]
impl DecorativeObject for TimelineObject {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, cue: AnimationCue) -> bool {
        self.timelines.contains_key(&cue)
    }

    fn set_visible(&self, visible: bool) {
        lock(&self.pose).visible = visible;
        self.renderer.set_visible(&self.name, visible);
    }

    fn is_visible(&self) -> bool {
        lock(&self.pose).visible
    }

    async fn animate(&self, cue: AnimationCue) {
        let Some(keyframes) = self.timelines.get(&cue) else {
            return;
        };
        lock(&self.pose).animating = true;
        let _animating = Animating(&self.pose);
        for keyframe in keyframes {
            self.tween(keyframe).await;
        }
    }

    fn frame(&self, _delta: f32, elapsed: f32) {
        let pose = {
            let pose = lock(&self.pose);
            if !pose.visible || pose.animating {
                return;
            }
            self.idle.offset(&pose.anchor, elapsed)
        };
        self.renderer.set_transform(&self.name, &pose);
    }
}
