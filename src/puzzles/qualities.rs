//! Qualities: match each remembered moment with a Hogwarts house
//!
//! A moment is selected on the left, then a house on the right records the
//! pair. Once every moment has a house the continue button appears; any
//! pairing is accepted.

use super::{Attempt, ChallengeContext};
use crate::lock;
use log::debug;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CHALLENGE: &str = "qualidades";
pub const MOMENTS: usize = 4;
const SELECT_FIRST: &str = "Selecione um momento primeiro!";
const FEEDBACK_CLEAR: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum House {
    Gryffindor,
    Slytherin,
    Ravenclaw,
    Hufflepuff,
}

impl House {
    pub fn name(self) -> &'static str {
        match self {
            House::Gryffindor => "grifinoria",
            House::Slytherin => "sonserina",
            House::Ravenclaw => "corvinal",
            House::Hufflepuff => "lufa-lufa",
        }
    }
}

pub struct QualitiesPuzzle {
    ctx: Arc<ChallengeContext>,
    state: Mutex<QualitiesState>,
}

#[derive(Default)]
struct QualitiesState {
    selected: Option<usize>,
    answers: BTreeMap<usize, House>,
    done: bool,
}

impl QualitiesPuzzle {
    pub fn new(ctx: Arc<ChallengeContext>) -> Self {
        Self {
            ctx,
            state: Mutex::new(QualitiesState::default()),
        }
    }

    pub fn id(&self) -> &str {
        CHALLENGE
    }

    pub fn selected(&self) -> Option<usize> {
        lock(&self.state).selected
    }

    pub fn house_of(&self, moment: usize) -> Option<House> {
        lock(&self.state).answers.get(&moment).copied()
    }

    /// Every moment has a house
    pub fn can_continue(&self) -> bool {
        let state = lock(&self.state);
        !state.done && state.answers.len() == MOMENTS
    }

    /// Click on a moment; replaces any earlier selection
    pub fn select_moment(&self, moment: usize) -> bool {
        {
            let mut state = lock(&self.state);
            if state.done || moment >= MOMENTS {
                return false;
            }
            state.selected = Some(moment);
        }
        self.ctx.effect("clique");
        true
    }

    /// Click on a house; pairs it with the selected moment
    pub fn assign(&self, house: House) -> Attempt {
        let moment = {
            let mut state = lock(&self.state);
            if state.done {
                return Attempt::Ignored;
            }
            let Some(moment) = state.selected.take() else {
                drop(state);
                self.ctx.feedback(CHALLENGE, SELECT_FIRST);
                self.ctx.clear_feedback_after(CHALLENGE, FEEDBACK_CLEAR);
                return Attempt::Rejected;
            };
            state.answers.insert(moment, house);
            moment
        };
        debug!("[Puzzle] moment {} -> {}", moment, house.name());
        self.ctx.effect("progresso");
        Attempt::Incomplete
    }

    /// The continue button, shown once every moment is matched
    pub fn continue_on(&self) -> Attempt {
        let answers = {
            let mut state = lock(&self.state);
            if state.done || state.answers.len() < MOMENTS {
                return Attempt::Ignored;
            }
            state.done = true;
            state
                .answers
                .iter()
                .map(|(moment, house)| ((moment + 1).to_string(), Value::from(house.name())))
                .collect::<Map<String, Value>>()
        };
        self.ctx.effect("progresso");
        self.ctx.succeed(
            CHALLENGE,
            Some(Value::Object(answers)),
            &["O Chapéu vê suas escolhas.", "E reconhece a verdade em cada uma."],
        );
        Attempt::Solved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzles::testing::{ms, Harness};
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn a_house_needs_a_selected_moment() {
        let h = Harness::new(&[CHALLENGE]);
        let puzzle = QualitiesPuzzle::new(h.ctx.clone());

        assert_eq!(puzzle.assign(House::Ravenclaw), Attempt::Rejected);
        assert_eq!(h.feedback(CHALLENGE), SELECT_FIRST);
        tokio::time::sleep(ms(2001)).await;
        assert_eq!(h.feedback(CHALLENGE), "");
        assert!(!puzzle.select_moment(MOMENTS));
    }

    #[tokio::test(start_paused = true)]
    async fn matching_every_moment_offers_continue() {
        let h = Harness::new(&[CHALLENGE]);
        let puzzle = QualitiesPuzzle::new(h.ctx.clone());
        let houses = [
            House::Gryffindor,
            House::Hufflepuff,
            House::Ravenclaw,
            House::Slytherin,
        ];

        assert_eq!(puzzle.continue_on(), Attempt::Ignored);
        for (moment, house) in houses.into_iter().enumerate() {
            assert!(puzzle.select_moment(moment));
            assert_eq!(puzzle.assign(house), Attempt::Incomplete);
            assert_eq!(puzzle.selected(), None);
        }
        // a moment can be matched again before continuing
        puzzle.select_moment(0);
        puzzle.assign(House::Slytherin);
        assert_eq!(puzzle.house_of(0), Some(House::Slytherin));
        assert!(puzzle.can_continue());

        assert_eq!(puzzle.continue_on(), Attempt::Solved);
        assert_eq!(puzzle.continue_on(), Attempt::Ignored);
        assert_eq!(puzzle.assign(House::Gryffindor), Attempt::Ignored);
        assert!(h.store.is_challenge_complete(CHALLENGE));
        assert_eq!(
            h.store.answer(CHALLENGE),
            Some(json!({
                "1": "sonserina",
                "2": "lufa-lufa",
                "3": "corvinal",
                "4": "sonserina"
            }))
        );
        assert_eq!(h.lines.current().as_deref(), Some("O Chapéu vê suas escolhas."));

        h.read_all().await;
        assert!(!h.store.scroll_locked());
        assert_eq!(h.lines.lines().len(), 2);
    }
}
