//! Put shuffled fragments back in order

use super::{Attempt, ChallengeContext};
use crate::lock;
use rand::seq::SliceRandom;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct OrderingPuzzle {
    ctx: Arc<ChallengeContext>,
    id: String,
    correct: Vec<String>,
    lines: Vec<String>,
    record_answer: bool,
    state: Mutex<OrderState>,
}

struct OrderState {
    /// Fragments not picked yet, in display order
    available: Vec<String>,
    chosen: Vec<String>,
    solved: bool,
}

impl OrderingPuzzle {
    pub fn new<I, S>(ctx: Arc<ChallengeContext>, id: &str, correct: I, line: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let correct: Vec<String> = correct.into_iter().map(Into::into).collect();
        let mut available = correct.clone();
        available.shuffle(&mut rand::rng());
        Self {
            ctx,
            id: id.to_string(),
            correct,
            lines: vec![line.to_string()],
            record_answer: false,
            state: Mutex::new(OrderState {
                available,
                chosen: Vec::new(),
                solved: false,
            }),
        }
    }

    /// Store the assembled text as the challenge answer
    pub fn recording_answer(mut self) -> Self {
        self.record_answer = true;
        self
    }

    /// Jeremiah 1:5 in four fragments
    pub fn ordenar_frase(ctx: Arc<ChallengeContext>) -> Self {
        Self::new(
            ctx,
            "ordenar-frase",
            ["Antes que eu", "te formasse", "no ventre materno,", "eu te conheci"],
            "Antes de existir... você já era conhecida.",
        )
        .recording_answer()
    }

    pub fn memorias_cronologia(ctx: Arc<ChallengeContext>) -> Self {
        Self::new(
            ctx,
            "memorias-cronologia",
            [
                "Nos conhecemos no trabalho",
                "Primeira conversa no café",
                "Primeiro encontro oficial",
                "Primeira viagem juntos",
                "Conheci sua família",
            ],
            "Perfeito. Cada passo trouxe vocês até aqui.",
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn available(&self) -> Vec<String> {
        lock(&self.state).available.clone()
    }

    pub fn chosen(&self) -> Vec<String> {
        lock(&self.state).chosen.clone()
    }

    /// Move the fragment at `index` of the available list to the end of the
    /// assembly; false for an unknown index
    pub fn pick(&self, index: usize) -> bool {
        {
            let mut state = lock(&self.state);
            if state.solved || index >= state.available.len() {
                return false;
            }
            let fragment = state.available.remove(index);
            state.chosen.push(fragment);
        }
        self.ctx.effect("clique");
        true
    }

    /// Return the last assembled fragment to the pool
    pub fn undo(&self) -> bool {
        let mut state = lock(&self.state);
        if state.solved {
            return false;
        }
        match state.chosen.pop() {
            Some(fragment) => {
                state.available.push(fragment);
                true
            }
            None => false,
        }
    }

    /// Clear the assembly
    pub fn reset(&self) {
        {
            let mut state = lock(&self.state);
            if state.solved {
                return;
            }
            let chosen = std::mem::take(&mut state.chosen);
            state.available.extend(chosen);
        }
        self.ctx.feedback(&self.id, "");
        self.ctx.effect("clique");
    }

    pub fn confirm(&self) -> Attempt {
        let chosen = {
            let mut state = lock(&self.state);
            if state.solved {
                return Attempt::Ignored;
            }
            if state.chosen.len() != self.correct.len() {
                drop(state);
                self.ctx
                    .fail(&self.id, "Complete a frase primeiro...", Duration::ZERO);
                return Attempt::Incomplete;
            }
            if state.chosen != self.correct {
                drop(state);
                self.ctx.fail(
                    &self.id,
                    "A ordem não está correta. Tente novamente.",
                    Duration::from_millis(2500),
                );
                return Attempt::Rejected;
            }
            state.solved = true;
            state.chosen.clone()
        };
        self.ctx.effect("sucesso");
        let answer = self
            .record_answer
            .then(|| Value::String(chosen.join(" ")));
        self.ctx.succeed(&self.id, answer, &self.lines);
        Attempt::Solved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzles::testing::{ms, Harness};

    fn pick_text(puzzle: &OrderingPuzzle, text: &str) {
        let index = puzzle
            .available()
            .iter()
            .position(|fragment| fragment == text)
            .unwrap();
        assert!(puzzle.pick(index));
    }

    #[tokio::test(start_paused = true)]
    async fn correct_order_solves_and_records_the_sentence() {
        let h = Harness::new(&["ordenar-frase"]);
        let puzzle = OrderingPuzzle::ordenar_frase(h.ctx.clone());
        for fragment in ["Antes que eu", "te formasse", "no ventre materno,", "eu te conheci"] {
            pick_text(&puzzle, fragment);
        }
        assert!(puzzle.available().is_empty());
        assert_eq!(puzzle.confirm(), Attempt::Solved);
        assert_eq!(
            h.store.answer("ordenar-frase"),
            Some(Value::from("Antes que eu te formasse no ventre materno, eu te conheci"))
        );
        tokio::time::sleep(ms(150)).await;
        assert!(!h.store.scroll_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn partial_assembly_is_incomplete() {
        let h = Harness::new(&["ordenar-frase"]);
        let puzzle = OrderingPuzzle::ordenar_frase(h.ctx.clone());
        pick_text(&puzzle, "Antes que eu");
        assert_eq!(puzzle.confirm(), Attempt::Incomplete);
        assert_eq!(h.feedback("ordenar-frase"), "Complete a frase primeiro...");
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_order_can_be_undone_and_retried() {
        let h = Harness::new(&["memorias-cronologia"]);
        let puzzle = OrderingPuzzle::memorias_cronologia(h.ctx.clone());
        let mut order = vec![
            "Primeira conversa no café",
            "Nos conhecemos no trabalho",
            "Primeiro encontro oficial",
            "Primeira viagem juntos",
            "Conheci sua família",
        ];
        for fragment in &order {
            pick_text(&puzzle, fragment);
        }
        assert_eq!(puzzle.confirm(), Attempt::Rejected);
        assert!(!h.store.is_challenge_complete("memorias-cronologia"));
        tokio::time::sleep(ms(2501)).await;
        assert_eq!(h.feedback("memorias-cronologia"), "");

        puzzle.reset();
        assert!(puzzle.chosen().is_empty());
        assert_eq!(puzzle.available().len(), 5);

        order.swap(0, 1);
        for fragment in &order {
            pick_text(&puzzle, fragment);
        }
        assert!(puzzle.undo());
        pick_text(&puzzle, "Conheci sua família");
        assert_eq!(puzzle.confirm(), Attempt::Solved);
        assert_eq!(h.store.answer("memorias-cronologia"), None);
    }
}
