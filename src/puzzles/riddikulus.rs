//! Riddikulus: pick a fear, then describe what it turns into

use super::{Attempt, ChallengeContext};
use crate::lock;
use log::debug;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CHALLENGE: &str = "riddikulus";
pub const AREA_ELEMENT: &str = "area-riddikulus";
pub const MIN_TRANSFORMATION: usize = 10;
const CHOOSE_FIRST: &str = "Escolha um medo primeiro...";
const DESCRIBE_MORE: &str = "Descreva melhor a transformação...";

pub struct RiddikulusPuzzle {
    ctx: Arc<ChallengeContext>,
    state: Mutex<RiddikulusState>,
}

#[derive(Default)]
struct RiddikulusState {
    fear: Option<String>,
    done: bool,
}

impl RiddikulusPuzzle {
    pub fn new(ctx: Arc<ChallengeContext>) -> Self {
        Self {
            ctx,
            state: Mutex::new(RiddikulusState::default()),
        }
    }

    pub fn id(&self) -> &str {
        CHALLENGE
    }

    pub fn fear(&self) -> Option<String> {
        lock(&self.state).fear.clone()
    }

    /// Pick a fear from the list; reveals the transformation field
    pub fn choose_fear(&self, fear: &str) -> bool {
        let fear = fear.trim();
        {
            let mut state = lock(&self.state);
            if state.done || fear.is_empty() {
                return false;
            }
            state.fear = Some(fear.to_string());
        }
        let area = self.ctx.surface().set_element_visible(AREA_ELEMENT, true, Duration::from_millis(300));
        if let Err(err) = area {
            debug!("[Puzzle] {}", err);
        }
        self.ctx.effect("clique");
        true
    }

    pub fn cast(&self, transformation: &str) -> Attempt {
        let transformation = transformation.trim();
        let fear = {
            let mut state = lock(&self.state);
            if state.done {
                return Attempt::Ignored;
            }
            match state.fear.clone() {
                None => None,
                Some(_) if transformation.chars().count() < MIN_TRANSFORMATION => {
                    drop(state);
                    self.ctx.feedback(CHALLENGE, DESCRIBE_MORE);
                    return Attempt::Incomplete;
                }
                Some(fear) => {
                    state.done = true;
                    Some(fear)
                }
            }
        };
        let Some(fear) = fear else {
            self.ctx.feedback(CHALLENGE, CHOOSE_FIRST);
            return Attempt::Incomplete;
        };
        self.ctx.effect("sucesso");
        self.ctx.succeed(
            CHALLENGE,
            Some(json!({ "medo": fear, "transformacao": transformation })),
            &[
                "Riddikulus!",
                "O medo se transforma em algo ridículo...",
                "E perde seu poder sobre você.",
            ],
        );
        Attempt::Solved
    }
}
