//! The limit: a challenge with no winning move
//!
//! Every try fails. After the last allowed try the puzzle admits there is no
//! solution and offers to continue, which completes the challenge.

use super::{Attempt, ChallengeContext};
use crate::lock;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

const CHALLENGE: &str = "limite";
pub const MAX_TRIES: u32 = 3;
const NOTHING: &str = "Nada acontece.";
const REVEAL: &str = "Há lutas que não se vencem insistindo. Apenas permanecendo.";
const CONTINUE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitOutcome {
    NothingHappens,
    /// No more tries; "continue" shows up shortly
    Revealed,
    Ignored,
}

pub struct LimitPuzzle {
    me: Weak<LimitPuzzle>,
    ctx: Arc<ChallengeContext>,
    state: Mutex<LimitState>,
}

#[derive(Default)]
struct LimitState {
    tries: u32,
    can_continue: bool,
    done: bool,
}

impl LimitPuzzle {
    pub fn new(ctx: Arc<ChallengeContext>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            ctx,
            state: Mutex::new(LimitState::default()),
        })
    }

    pub fn tries(&self) -> u32 {
        lock(&self.state).tries
    }

    pub fn can_continue(&self) -> bool {
        lock(&self.state).can_continue
    }

    pub fn try_again(&self) -> LimitOutcome {
        let tries = {
            let mut state = lock(&self.state);
            if state.tries >= MAX_TRIES {
                return LimitOutcome::Ignored;
            }
            state.tries += 1;
            state.tries
        };
        if tries < MAX_TRIES {
            self.ctx.fail(CHALLENGE, NOTHING, CONTINUE_DELAY);
            return LimitOutcome::NothingHappens;
        }
        self.ctx.fail(CHALLENGE, REVEAL, Duration::ZERO);
        let me = self.me.clone();
        self.ctx.scheduler().after(CONTINUE_DELAY, move || {
            if let Some(puzzle) = me.upgrade() {
                lock(&puzzle.state).can_continue = true;
            }
        });
        LimitOutcome::Revealed
    }

    /// Accept the limit
    pub fn continue_on(&self) -> Attempt {
        {
            let mut state = lock(&self.state);
            if !state.can_continue || state.done {
                return Attempt::Ignored;
            }
            state.done = true;
        }
        self.ctx.effect("progresso");
        self.ctx.succeed(CHALLENGE, None, &["Você compreendeu."]);
        Attempt::Solved
    }
}
