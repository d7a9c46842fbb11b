//! Broom flight: keep the broom between the towers
//!
//! A small side-scroller stepped once per frame. Gravity pulls the broom
//! down, a jump sets an upward speed, the ceiling clamps and the floor or a
//! tower ends the flight. Passing eight towers wins.

use super::ChallengeContext;
use crate::lock;
use log::{debug, info};
use rand::Rng;
use serde_json::json;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

const CHALLENGE: &str = "voo";
pub const FIELD_WIDTH: f32 = 600.0;
pub const FIELD_HEIGHT: f32 = 600.0;
pub const GRAVITY: f32 = 0.5;
pub const JUMP_SPEED: f32 = -8.0;
pub const OBSTACLE_SPEED: f32 = 3.0;
pub const OBSTACLE_WIDTH: f32 = 60.0;
pub const OBSTACLE_SPACING: f32 = 250.0;
pub const GAP: f32 = 180.0;
pub const PASSES_TO_WIN: u32 = 8;
const BROOM_X: f32 = 100.0;
const BROOM_WIDTH: f32 = 40.0;
const BROOM_HEIGHT: f32 = 60.0;
const MIN_TOWER: f32 = 50.0;
/// About sixty frames per second
pub const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub x: f32,
    /// Height of the upper tower; the gap starts below it
    pub top: f32,
    passed: bool,
}

impl Obstacle {
    fn bottom(&self) -> f32 {
        self.top + GAP
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightOutcome {
    Flying,
    /// A tower was passed; total so far
    Passed(u32),
    Crashed,
    Won,
}

/// Physics of one flight
#[derive(Debug, Clone)]
pub struct FlightWorld {
    pub y: f32,
    pub speed: f32,
    pub obstacles: Vec<Obstacle>,
    pub passed: u32,
    fixed_top: Option<f32>,
}

impl Default for FlightWorld {
    fn default() -> Self {
        Self::with_towers(None)
    }
}

impl FlightWorld {
    /// A world whose towers all leave the gap at `top`, or random ones
    pub fn with_towers(fixed_top: Option<f32>) -> Self {
        let mut world = Self {
            y: FIELD_HEIGHT / 2.0,
            speed: 0.0,
            obstacles: Vec::new(),
            passed: 0,
            fixed_top,
        };
        for i in 0..3 {
            world.spawn_obstacle(FIELD_WIDTH + i as f32 * OBSTACLE_SPACING);
        }
        world
    }

    fn spawn_obstacle(&mut self, x: f32) {
        let top = self.fixed_top.unwrap_or_else(|| {
            let highest = FIELD_HEIGHT - GAP - MIN_TOWER;
            rand::rng().random_range(MIN_TOWER..highest)
        });
        self.obstacles.push(Obstacle {
            x,
            top,
            passed: false,
        });
    }

    pub fn jump(&mut self) {
        self.speed = JUMP_SPEED;
    }

    fn collides(&self, obstacle: &Obstacle) -> bool {
        let overlaps = BROOM_X + BROOM_WIDTH > obstacle.x && BROOM_X < obstacle.x + OBSTACLE_WIDTH;
        overlaps && (self.y < obstacle.top || self.y + BROOM_HEIGHT > obstacle.bottom())
    }

    /// Advance one frame
    pub fn step(&mut self) -> FlightOutcome {
        self.speed += GRAVITY;
        self.y += self.speed;
        if self.y < 0.0 {
            self.y = 0.0;
            self.speed = 0.0;
        }
        if self.y + BROOM_HEIGHT > FIELD_HEIGHT {
            return FlightOutcome::Crashed;
        }

        let mut outcome = FlightOutcome::Flying;
        for index in 0..self.obstacles.len() {
            let obstacle = &mut self.obstacles[index];
            obstacle.x -= OBSTACLE_SPEED;
            if !obstacle.passed && obstacle.x + OBSTACLE_WIDTH < BROOM_X {
                obstacle.passed = true;
                self.passed += 1;
                if self.passed >= PASSES_TO_WIN {
                    return FlightOutcome::Won;
                }
                outcome = FlightOutcome::Passed(self.passed);
            }
            if self.collides(&self.obstacles[index]) {
                return FlightOutcome::Crashed;
            }
        }

        self.obstacles.retain(|o| o.x + OBSTACLE_WIDTH > 0.0);
        if self
            .obstacles
            .last()
            .is_none_or(|last| last.x < FIELD_WIDTH - OBSTACLE_SPACING)
        {
            self.spawn_obstacle(FIELD_WIDTH);
        }
        outcome
    }
}

pub struct FlightGame {
    me: Weak<FlightGame>,
    ctx: Arc<ChallengeContext>,
    state: Mutex<FlightState>,
}

#[derive(Default)]
struct FlightState {
    world: FlightWorld,
    flying: bool,
    won: bool,
    /// Bumped per flight so a stale frame loop stops
    run: u64,
}

impl FlightGame {
    pub fn new(ctx: Arc<ChallengeContext>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            ctx,
            state: Mutex::new(FlightState::default()),
        })
    }

    pub fn is_flying(&self) -> bool {
        lock(&self.state).flying
    }

    pub fn passed(&self) -> u32 {
        lock(&self.state).world.passed
    }

    /// The start button; a no-op mid-flight or after winning
    pub fn start(&self) {
        let Some(run) = self.take_off(None) else {
            return;
        };
        let me = self.me.clone();
        self.ctx.scheduler().spawn(async move {
            let mut frames = tokio::time::interval(FRAME);
            loop {
                frames.tick().await;
                let Some(game) = me.upgrade() else {
                    return;
                };
                if matches!(game.frame(run), FlightOutcome::Crashed | FlightOutcome::Won) {
                    return;
                }
            }
        });
    }

    fn take_off(&self, fixed_top: Option<f32>) -> Option<u64> {
        let mut state = lock(&self.state);
        if state.flying || state.won {
            return None;
        }
        state.world = FlightWorld::with_towers(fixed_top);
        state.flying = true;
        state.run += 1;
        info!("[Puzzle] flight started");
        Some(state.run)
    }

    /// Space or click
    pub fn jump(&self) {
        {
            let mut state = lock(&self.state);
            if !state.flying {
                return;
            }
            state.world.jump();
        }
        self.ctx.effect("whoosh");
    }

    fn frame(&self, run: u64) -> FlightOutcome {
        let (outcome, passed) = {
            let mut state = lock(&self.state);
            if state.run != run || !state.flying {
                return FlightOutcome::Crashed;
            }
            let outcome = state.world.step();
            match outcome {
                FlightOutcome::Crashed => state.flying = false,
                FlightOutcome::Won => {
                    state.flying = false;
                    state.won = true;
                }
                FlightOutcome::Flying | FlightOutcome::Passed(_) => {}
            }
            (outcome, state.world.passed)
        };

        match outcome {
            FlightOutcome::Flying => {}
            FlightOutcome::Passed(count) => {
                debug!("[Puzzle] flight passed {}/{}", count, PASSES_TO_WIN);
                self.ctx.effect("progresso");
            }
            FlightOutcome::Crashed => {
                self.ctx.effect("erro");
                self.ctx.dialogue().enqueue_sequence(
                    ["Nem todo voo é perfeito.", "Respire. Tente outra vez."],
                    Default::default(),
                    None,
                );
            }
            FlightOutcome::Won => {
                self.ctx.effect("sucesso");
                self.ctx
                    .succeed(CHALLENGE, Some(json!(passed)), &["Você se manteve.", "Isso basta."]);
            }
        }
        outcome
    }
}
