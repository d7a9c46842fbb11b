//! Lumos: repeat a growing light sequence on a 3x3 grid
//!
//! Level `n` shows `n + 2` lights; five levels win. A wrong press replays
//! the current level with a fresh sequence once the player has read the
//! retry line.

use super::ChallengeContext;
use crate::lock;
use crate::types::{DialogueEntry, DialogueOptions};
use log::debug;
use rand::Rng;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

const CHALLENGE: &str = "lumos";
pub const LIGHTS: usize = 9;
pub const LAST_LEVEL: u32 = 5;
const LEAD_IN: Duration = Duration::from_millis(800);
const LIT: Duration = Duration::from_millis(600);
const GAP: Duration = Duration::from_millis(300);
const NEXT_ROUND: Duration = Duration::from_secs(1);

pub fn light_element(index: usize) -> String {
    format!("lumos-light-{index}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightPress {
    Correct,
    /// Level finished, the next one starts shortly
    RoundComplete(u32),
    /// Last level finished
    Won,
    Wrong,
    /// Sequence still playing, game idle or index out of range
    Ignored,
}

pub struct LightSequenceGame {
    me: Weak<LightSequenceGame>,
    ctx: Arc<ChallengeContext>,
    state: Mutex<LightState>,
}

#[derive(Default)]
struct LightState {
    level: u32,
    sequence: Vec<usize>,
    entered: Vec<usize>,
    accepting: bool,
    round: u64,
    won: bool,
}

impl LightSequenceGame {
    pub fn new(ctx: Arc<ChallengeContext>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            ctx,
            state: Mutex::new(LightState::default()),
        })
    }

    pub fn level(&self) -> u32 {
        lock(&self.state).level
    }

    /// The sequence of the current round, as shown
    pub fn sequence(&self) -> Vec<usize> {
        lock(&self.state).sequence.clone()
    }

    pub fn is_accepting(&self) -> bool {
        lock(&self.state).accepting
    }

    /// The start button
    pub fn start(&self) {
        {
            let mut state = lock(&self.state);
            if state.won {
                return;
            }
            state.level = 1;
        }
        self.play_round();
    }

    fn play_round(&self) {
        let (sequence, round) = {
            let mut state = lock(&self.state);
            let mut rng = rand::rng();
            state.sequence = (0..state.level as usize + 2)
                .map(|_| rng.random_range(0..LIGHTS))
                .collect();
            state.entered.clear();
            state.accepting = false;
            state.round += 1;
            (state.sequence.clone(), state.round)
        };
        debug!("[Puzzle] lumos round {} shows {:?}", round, sequence);
        let me = self.me.clone();
        self.ctx.scheduler().spawn(async move {
            tokio::time::sleep(LEAD_IN).await;
            for index in sequence {
                let Some(game) = me.upgrade() else {
                    return;
                };
                game.ctx.effect("luz");
                game.light(index, true);
                drop(game);
                tokio::time::sleep(LIT).await;
                if let Some(game) = me.upgrade() {
                    game.light(index, false);
                }
                tokio::time::sleep(GAP).await;
            }
            if let Some(game) = me.upgrade() {
                let mut state = lock(&game.state);
                if state.round == round {
                    state.accepting = true;
                }
            }
        });
    }

    fn light(&self, index: usize, on: bool) {
        if let Err(err) = self
            .ctx
            .surface()
            .set_element_visible(&light_element(index), on, Duration::ZERO)
        {
            debug!("[Puzzle] {}", err);
        }
    }

    /// Click a light
    pub fn press(&self, index: usize) -> LightPress {
        let outcome = {
            let mut state = lock(&self.state);
            if !state.accepting || index >= LIGHTS {
                return LightPress::Ignored;
            }
            let position = state.entered.len();
            state.entered.push(index);
            if state.sequence[position] != index {
                state.accepting = false;
                LightPress::Wrong
            } else if state.entered.len() < state.sequence.len() {
                LightPress::Correct
            } else {
                state.accepting = false;
                if state.level >= LAST_LEVEL {
                    state.won = true;
                    LightPress::Won
                } else {
                    state.level += 1;
                    LightPress::RoundComplete(state.level - 1)
                }
            }
        };

        match outcome {
            LightPress::Wrong => {
                self.ctx.effect("erro");
                let me = self.me.clone();
                self.ctx.dialogue().enqueue(
                    DialogueEntry::new(
                        "Tente novamente. Memorize a sequência com atenção.",
                        DialogueOptions::default(),
                    )
                    .on_complete(move || {
                        if let Some(game) = me.upgrade() {
                            game.play_round();
                        }
                    }),
                );
            }
            LightPress::RoundComplete(_) => {
                self.ctx.effect("sucesso");
                let me = self.me.clone();
                self.ctx.scheduler().after(NEXT_ROUND, move || {
                    if let Some(game) = me.upgrade() {
                        game.play_round();
                    }
                });
            }
            LightPress::Won => {
                self.ctx.effect("sucesso");
                self.ctx
                    .succeed(CHALLENGE, None, &["Lumos Máxima! A luz afasta as sombras."]);
            }
            LightPress::Correct | LightPress::Ignored => {}
        }
        outcome
    }
}
