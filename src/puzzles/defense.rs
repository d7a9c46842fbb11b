//! Protego: block ten attacks in a row
//!
//! Each attack can be blocked between 500 ms and 2000 ms after launch and
//! lands at 2500 ms. A landed attack stops the game; it restarts from zero
//! once the player has read the line.

use super::ChallengeContext;
use crate::lock;
use crate::types::{DialogueEntry, DialogueOptions};
use log::debug;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

const CHALLENGE: &str = "protego";
pub const BLOCKS_TO_WIN: u32 = 10;
pub const WINDOW_OPENS: Duration = Duration::from_millis(500);
pub const WINDOW_CLOSES: Duration = Duration::from_millis(2000);
pub const ATTACK_LANDS: Duration = Duration::from_millis(2500);
const NEXT_ATTACK: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    /// Attack blocked; total blocks so far
    Blocked(u32),
    /// Outside the defend window
    Missed,
    Inactive,
}

pub struct DefenseGame {
    me: Weak<DefenseGame>,
    ctx: Arc<ChallengeContext>,
    state: Mutex<DefenseState>,
}

#[derive(Default)]
struct DefenseState {
    active: bool,
    blocked: u32,
    /// Identifies the attack in flight; stale timers compare it
    attack: u64,
    window_open: bool,
    defended: bool,
    won: bool,
}

impl DefenseGame {
    pub fn new(ctx: Arc<ChallengeContext>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            ctx,
            state: Mutex::new(DefenseState::default()),
        })
    }

    pub fn blocked(&self) -> u32 {
        lock(&self.state).blocked
    }

    pub fn is_active(&self) -> bool {
        lock(&self.state).active
    }

    pub fn window_open(&self) -> bool {
        lock(&self.state).window_open
    }

    /// The start button
    pub fn start(&self) {
        {
            let mut state = lock(&self.state);
            if state.won {
                return;
            }
            state.active = true;
            state.blocked = 0;
        }
        self.launch();
    }

    fn launch(&self) {
        let attack = {
            let mut state = lock(&self.state);
            if !state.active {
                return;
            }
            if state.blocked >= BLOCKS_TO_WIN {
                state.active = false;
                state.won = true;
                None
            } else {
                state.attack += 1;
                state.window_open = false;
                state.defended = false;
                Some(state.attack)
            }
        };
        let Some(attack) = attack else {
            self.finish();
            return;
        };
        debug!("[Puzzle] protego attack {}", attack);
        self.at(attack, WINDOW_OPENS, |state| state.window_open = true);
        self.at(attack, WINDOW_CLOSES, |state| state.window_open = false);
        let me = self.me.clone();
        self.ctx.scheduler().after(ATTACK_LANDS, move || {
            if let Some(game) = me.upgrade() {
                game.land(attack);
            }
        });
    }

    /// Apply `change` after `delay` if `attack` is still the one in flight
    fn at(&self, attack: u64, delay: Duration, change: fn(&mut DefenseState)) {
        let me = self.me.clone();
        self.ctx.scheduler().after(delay, move || {
            if let Some(game) = me.upgrade() {
                let mut state = lock(&game.state);
                if state.attack == attack && !state.defended {
                    change(&mut state);
                }
            }
        });
    }

    fn land(&self, attack: u64) {
        {
            let mut state = lock(&self.state);
            if state.attack != attack || state.defended || !state.active {
                return;
            }
            state.active = false;
            state.window_open = false;
        }
        self.ctx.effect("erro");
        let me = self.me.clone();
        self.ctx.dialogue().enqueue(
            DialogueEntry::new("O ataque te atingiu! Tente novamente.", DialogueOptions::default())
                .on_complete(move || {
                    if let Some(game) = me.upgrade() {
                        game.start();
                    }
                }),
        );
    }

    /// The Protego button
    pub fn defend(&self) -> Block {
        let blocked = {
            let mut state = lock(&self.state);
            if !state.active {
                return Block::Inactive;
            }
            if !state.window_open {
                return Block::Missed;
            }
            state.window_open = false;
            state.defended = true;
            state.blocked += 1;
            state.blocked
        };
        self.ctx.effect("sucesso");
        let me = self.me.clone();
        self.ctx.scheduler().after(NEXT_ATTACK, move || {
            if let Some(game) = me.upgrade() {
                game.launch();
            }
        });
        Block::Blocked(blocked)
    }

    fn finish(&self) {
        self.ctx.succeed(
            CHALLENGE,
            None,
            &["Protego! Você defendeu todos os ataques."],
        );
    }
}
