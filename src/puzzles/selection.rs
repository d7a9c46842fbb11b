//! Memory card selection
//!
//! Every card is shown for a few seconds; afterwards the cards come back
//! shuffled and the player picks the ones that "stayed". Success iff the
//! picked set equals the correct set.

use super::{Attempt, ChallengeContext};
use crate::lock;
use log::debug;
use rand::seq::SliceRandom;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

const MEMORISE_FOR: Duration = Duration::from_secs(5);
const WRONG_SET: &str = "Nem toda lembrança vem na primeira vez. Olhe com mais atenção.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    Waiting,
    Memorising,
    Selecting,
    Solved,
}

pub struct CardSelectionPuzzle {
    me: Weak<CardSelectionPuzzle>,
    ctx: Arc<ChallengeContext>,
    id: String,
    cards: Vec<String>,
    correct: BTreeSet<String>,
    state: Mutex<SelectionState>,
}

struct SelectionState {
    phase: SelectionPhase,
    /// Card order while selecting
    shuffled: Vec<String>,
    selected: Vec<String>,
}

impl CardSelectionPuzzle {
    pub fn new<I, J, S, T>(ctx: Arc<ChallengeContext>, id: &str, cards: I, correct: J) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            ctx,
            id: id.to_string(),
            cards: cards.into_iter().map(Into::into).collect(),
            correct: correct.into_iter().map(Into::into).collect(),
            state: Mutex::new(SelectionState {
                phase: SelectionPhase::Waiting,
                shuffled: Vec::new(),
                selected: Vec::new(),
            }),
        })
    }

    pub fn memoria(ctx: Arc<ChallengeContext>) -> Arc<Self> {
        Self::new(
            ctx,
            "memoria",
            [
                "Primeiro filme juntos",
                "Uma briga boba",
                "Uma oração compartilhada",
                "Uma promessa",
                "Uma viagem",
                "Um silêncio importante",
                "Um presente especial",
                "Uma música marcante",
            ],
            ["Uma oração compartilhada", "Uma promessa", "Um silêncio importante"],
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> SelectionPhase {
        lock(&self.state).phase
    }

    /// Cards on display: all of them in order while memorising, shuffled
    /// while selecting
    pub fn cards(&self) -> Vec<String> {
        let state = lock(&self.state);
        match state.phase {
            SelectionPhase::Selecting | SelectionPhase::Solved => state.shuffled.clone(),
            _ => self.cards.clone(),
        }
    }

    pub fn selected(&self) -> Vec<String> {
        lock(&self.state).selected.clone()
    }

    /// Number of cards to pick
    pub fn required(&self) -> usize {
        self.correct.len()
    }

    /// The section came into view: show every card, then switch to selection
    pub fn start(&self) {
        if self.ctx.is_complete(&self.id) {
            return;
        }
        {
            let mut state = lock(&self.state);
            if state.phase != SelectionPhase::Waiting {
                return;
            }
            state.phase = SelectionPhase::Memorising;
        }
        debug!("[Puzzle] '{}' memorise for {:?}", self.id, MEMORISE_FOR);
        let me = self.me.clone();
        self.ctx.scheduler().after(MEMORISE_FOR, move || {
            if let Some(puzzle) = me.upgrade() {
                puzzle.begin_selection();
            }
        });
    }

    fn begin_selection(&self) {
        let mut shuffled = self.cards.clone();
        shuffled.shuffle(&mut rand::rng());
        let mut state = lock(&self.state);
        state.shuffled = shuffled;
        state.selected.clear();
        state.phase = SelectionPhase::Selecting;
    }

    /// Click a card by its text; false when it cannot be selected
    pub fn toggle(&self, card: &str) -> bool {
        let mut state = lock(&self.state);
        if state.phase != SelectionPhase::Selecting || !state.shuffled.iter().any(|c| c == card) {
            return false;
        }
        if let Some(position) = state.selected.iter().position(|c| c == card) {
            state.selected.remove(position);
            return true;
        }
        if state.selected.len() >= self.correct.len() {
            drop(state);
            let message = format!("Apenas {} cartas podem ser selecionadas.", self.correct.len());
            self.ctx.feedback(&self.id, &message);
            self.ctx
                .clear_feedback_after(&self.id, Duration::from_secs(2));
            return false;
        }
        state.selected.push(card.to_string());
        true
    }

    /// The confirm button, available once enough cards are selected
    pub fn confirm(&self) -> Attempt {
        let selected = {
            let mut state = lock(&self.state);
            if state.phase != SelectionPhase::Selecting {
                return Attempt::Ignored;
            }
            if state.selected.len() != self.correct.len() {
                return Attempt::Incomplete;
            }
            let picked: BTreeSet<String> = state.selected.iter().cloned().collect();
            if picked != self.correct {
                state.selected.clear();
                drop(state);
                self.ctx.fail(&self.id, WRONG_SET, Duration::from_secs(3));
                return Attempt::Rejected;
            }
            state.phase = SelectionPhase::Solved;
            state.selected.clone()
        };
        self.ctx.effect("sucesso");
        self.ctx.succeed(
            &self.id,
            Some(Value::from(selected)),
            &["Você lembrou.", "Então pode seguir."],
        );
        Attempt::Solved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzles::testing::{ms, Harness};

    #[tokio::test(start_paused = true)]
    async fn cards_are_memorised_before_selection() {
        let h = Harness::new(&["memoria"]);
        let puzzle = CardSelectionPuzzle::memoria(h.ctx.clone());
        assert!(!puzzle.toggle("Uma promessa"));

        puzzle.start();
        assert_eq!(puzzle.phase(), SelectionPhase::Memorising);
        assert_eq!(puzzle.cards()[0], "Primeiro filme juntos");
        assert!(!puzzle.toggle("Uma promessa"));

        tokio::time::sleep(ms(5001)).await;
        assert_eq!(puzzle.phase(), SelectionPhase::Selecting);
        let mut shown = puzzle.cards();
        shown.sort();
        let mut all = puzzle.cards.clone();
        all.sort();
        assert_eq!(shown, all);
    }

    #[tokio::test(start_paused = true)]
    async fn exactly_the_correct_set_solves() {
        let h = Harness::new(&["memoria"]);
        let puzzle = CardSelectionPuzzle::memoria(h.ctx.clone());
        puzzle.start();
        tokio::time::sleep(ms(5001)).await;

        assert!(puzzle.toggle("Um silêncio importante"));
        assert!(puzzle.toggle("Uma promessa"));
        assert_eq!(puzzle.confirm(), Attempt::Incomplete);
        assert!(puzzle.toggle("Uma oração compartilhada"));
        assert!(!puzzle.toggle("Uma viagem"));
        assert_eq!(h.feedback("memoria"), "Apenas 3 cartas podem ser selecionadas.");

        assert_eq!(puzzle.confirm(), Attempt::Solved);
        assert_eq!(puzzle.phase(), SelectionPhase::Solved);
        assert!(h.store.is_challenge_complete("memoria"));
        assert_eq!(
            h.store.answer("memoria"),
            Some(serde_json::json!([
                "Um silêncio importante",
                "Uma promessa",
                "Uma oração compartilhada"
            ]))
        );

        h.read_all().await;
        assert!(!h.store.scroll_locked());
        assert_eq!(h.lines.lines(), vec!["Você lembrou.", "Então pode seguir."]);
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_set_clears_the_selection() {
        let h = Harness::new(&["memoria"]);
        let puzzle = CardSelectionPuzzle::memoria(h.ctx.clone());
        puzzle.start();
        tokio::time::sleep(ms(5001)).await;

        for card in ["Uma viagem", "Uma promessa", "Um silêncio importante"] {
            assert!(puzzle.toggle(card));
        }
        assert!(puzzle.toggle("Uma viagem"));
        assert!(puzzle.toggle("Uma música marcante"));
        assert_eq!(puzzle.confirm(), Attempt::Rejected);
        assert!(puzzle.selected().is_empty());
        assert_eq!(puzzle.phase(), SelectionPhase::Selecting);
        assert_eq!(h.effects(), vec!["erro"]);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_challenge_does_not_restart() {
        let h = Harness::new(&["memoria"]);
        h.store.complete_challenge("memoria");
        let puzzle = CardSelectionPuzzle::memoria(h.ctx.clone());
        puzzle.start();
        assert_eq!(puzzle.phase(), SelectionPhase::Waiting);
    }
}
