//! Word-scramble input puzzles
//!
//! A card shows a scrambled word; the player types the word back. Input is
//! compared case-insensitively after trimming.

use super::{Attempt, ChallengeContext};
use crate::lock;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::AbortHandle;

const EMPTY_INPUT: &str = "Digite algo...";
const FEEDBACK_CLEAR: Duration = Duration::from_secs(3);

pub struct CodeWordPuzzle {
    ctx: Arc<ChallengeContext>,
    id: String,
    answer: String,
    lines: Vec<String>,
    wrong_message: String,
    success_effect: &'static str,
    retry_effect: &'static str,
    clear_after: Duration,
    with_hint: bool,
    state: Mutex<CodeState>,
}

#[derive(Default)]
struct CodeState {
    solved: bool,
    hint: Option<AbortHandle>,
}

impl CodeWordPuzzle {
    pub fn new(ctx: Arc<ChallengeContext>, id: &str, answer: &str) -> Self {
        Self {
            ctx,
            id: id.to_string(),
            answer: answer.trim().to_uppercase(),
            lines: Vec::new(),
            wrong_message: "Código incorreto. Tente novamente.".into(),
            success_effect: "sucesso",
            retry_effect: "erro",
            clear_after: FEEDBACK_CLEAR,
            with_hint: false,
            state: Mutex::new(CodeState::default()),
        }
    }

    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_wrong_message(mut self, message: &str, clear_after: Duration) -> Self {
        self.wrong_message = message.to_string();
        self.clear_after = clear_after;
        self
    }

    pub fn with_effects(mut self, success: &'static str, retry: &'static str) -> Self {
        self.success_effect = success;
        self.retry_effect = retry;
        self
    }

    /// Reveal the hint element after the configured delay once started
    pub fn with_hint(mut self) -> Self {
        self.with_hint = true;
        self
    }

    /// The chapter 1 code card
    pub fn codigo(ctx: Arc<ChallengeContext>) -> Self {
        Self::new(ctx, "codigo", "SABEDORIA")
            .with_lines(["Sabedoria... A primeira chave."])
            .with_wrong_message("Não é essa palavra... Tente novamente.", FEEDBACK_CLEAR)
            .with_effects("progresso", "tenteNovamente")
    }

    pub fn obliviate(ctx: Arc<ChallengeContext>) -> Self {
        Self::new(ctx, "obliviate", "OBLIVIATE")
            .with_lines([
                "Obliviate... O feitiço que apaga memórias. Mas algumas, não podem ser esquecidas.",
            ])
            .with_wrong_message("Código incorreto. Verifique o cartão.", Duration::ZERO)
            .with_hint()
    }

    pub fn aruossav(ctx: Arc<ChallengeContext>) -> Self {
        Self::new(ctx, "aruossav", "VASSOURA")
            .with_lines([
                "VASSOURA... A chave está no que parece ao contrário.",
                "Mas não se trata apenas de voar.",
                "Trata-se de não cair.",
            ])
            .with_hint()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The challenge section came into view
    pub fn start(&self) {
        if !self.with_hint || self.ctx.is_complete(&self.id) {
            return;
        }
        let mut state = lock(&self.state);
        if state.hint.is_none() {
            state.hint = Some(self.ctx.schedule_hint(&self.id));
        }
    }

    pub fn submit(&self, input: &str) -> Attempt {
        let typed = input.trim().to_uppercase();
        {
            let mut state = lock(&self.state);
            if state.solved {
                return Attempt::Ignored;
            }
            if typed.is_empty() {
                drop(state);
                self.ctx.feedback(&self.id, EMPTY_INPUT);
                return Attempt::Incomplete;
            }
            if typed != self.answer {
                drop(state);
                self.ctx
                    .reject(&self.id, self.retry_effect, &self.wrong_message, self.clear_after);
                return Attempt::Rejected;
            }
            state.solved = true;
            if let Some(hint) = state.hint.take() {
                hint.abort();
            }
        }
        self.ctx.effect(self.success_effect);
        self.ctx.succeed(&self.id, Some(Value::String(typed)), &self.lines);
        Attempt::Solved
    }

    pub fn is_solved(&self) -> bool {
        lock(&self.state).solved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzles::hint_element;
    use crate::puzzles::testing::{ms, Harness};

    #[tokio::test(start_paused = true)]
    async fn input_is_trimmed_and_case_insensitive() {
        let h = Harness::new(&["codigo"]);
        let puzzle = CodeWordPuzzle::codigo(h.ctx.clone());

        assert_eq!(puzzle.submit("  sabedoria \n"), Attempt::Solved);
        assert!(h.store.is_challenge_complete("codigo"));
        assert_eq!(h.store.answer("codigo"), Some(Value::from("SABEDORIA")));
        assert_eq!(h.lines.current().as_deref(), Some("Sabedoria... A primeira chave."));

        tokio::time::sleep(ms(150)).await;
        assert!(!h.store.scroll_locked());
        assert_eq!(puzzle.submit("SABEDORIA"), Attempt::Ignored);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_input_asks_for_something() {
        let h = Harness::new(&["codigo"]);
        let puzzle = CodeWordPuzzle::codigo(h.ctx.clone());
        assert_eq!(puzzle.submit("   "), Attempt::Incomplete);
        assert_eq!(h.feedback("codigo"), "Digite algo...");
        assert!(h.backend.played().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_word_gives_feedback_that_fades() {
        let h = Harness::new(&["codigo"]);
        let puzzle = CodeWordPuzzle::codigo(h.ctx.clone());

        assert_eq!(puzzle.submit("SABERIDOA"), Attempt::Rejected);
        assert_eq!(h.feedback("codigo"), "Não é essa palavra... Tente novamente.");
        assert_eq!(h.effects(), vec!["erro"]);
        assert!(!h.store.is_challenge_complete("codigo"));

        tokio::time::sleep(ms(3001)).await;
        assert_eq!(h.feedback("codigo"), "");
        assert!(h.store.scroll_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn hint_appears_after_two_minutes() {
        let h = Harness::new(&["obliviate"]);
        let puzzle = CodeWordPuzzle::obliviate(h.ctx.clone());
        puzzle.start();

        tokio::time::sleep(ms(119_000)).await;
        assert!(!h.surface.element_visible(&hint_element("obliviate")));
        tokio::time::sleep(ms(1_001)).await;
        assert!(h.surface.element_visible(&hint_element("obliviate")));
    }

    #[tokio::test(start_paused = true)]
    async fn solving_cancels_the_hint() {
        let h = Harness::new(&["aruossav"]);
        let puzzle = CodeWordPuzzle::aruossav(h.ctx.clone());
        puzzle.start();
        assert_eq!(puzzle.submit("vassoura"), Attempt::Solved);

        tokio::time::sleep(ms(121_000)).await;
        assert!(!h.surface.element_visible(&hint_element("aruossav")));
    }

    #[tokio::test(start_paused = true)]
    async fn multi_line_success_unlocks_on_the_last_line() {
        let h = Harness::new(&["aruossav"]);
        let puzzle = CodeWordPuzzle::aruossav(h.ctx.clone());
        puzzle.submit("VASSOURA");

        tokio::time::sleep(ms(500)).await;
        assert!(h.store.scroll_locked());
        h.read_all().await;
        assert!(!h.store.scroll_locked());
        assert_eq!(h.lines.lines().len(), 3);
    }
}
