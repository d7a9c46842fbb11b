//! Multiple-choice quizzes
//!
//! Single-question quizzes lock their buttons after a wrong pick and re-open
//! them shortly after. A scored quiz asks every question once, whatever the
//! answers, then shows the score and completes on "continue".

use super::{Attempt, ChallengeContext};
use crate::lock;
use log::debug;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    /// `None` accepts any option
    pub correct: Option<usize>,
}

impl Question {
    pub fn new<I, S>(prompt: &str, options: I, correct: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prompt: prompt.to_string(),
            options: options.into_iter().map(Into::into).collect(),
            correct: Some(correct),
        }
    }

    /// Every option is accepted
    pub fn open<I, S>(prompt: &str, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            correct: None,
            ..Self::new(prompt, options, 0)
        }
    }

    fn accepts(&self, index: usize) -> bool {
        self.correct.is_none_or(|correct| correct == index)
    }
}

enum Mode {
    /// Retry the same question after a wrong pick
    Retry {
        wrong_message: String,
        reopen_after: Duration,
    },
    /// Ask each question once and report the score
    Scored,
}

impl Mode {
    fn retry(wrong_message: &str, reopen_after: Duration) -> Self {
        Mode::Retry {
            wrong_message: wrong_message.to_string(),
            reopen_after,
        }
    }
}

pub struct QuizPuzzle {
    me: Weak<QuizPuzzle>,
    ctx: Arc<ChallengeContext>,
    id: String,
    questions: Vec<Question>,
    lines: Vec<String>,
    success_effect: &'static str,
    success_delay: Duration,
    mode: Mode,
    state: Mutex<QuizState>,
}

#[derive(Default)]
struct QuizState {
    current: usize,
    /// Buttons disabled until a timer re-opens them
    locked: bool,
    results: Vec<bool>,
    finished: bool,
    solved: bool,
}

const SCORED_NEXT_CORRECT: Duration = Duration::from_millis(1500);
const SCORED_NEXT_WRONG: Duration = Duration::from_millis(2500);

impl QuizPuzzle {
    fn build(
        ctx: Arc<ChallengeContext>,
        id: &str,
        questions: Vec<Question>,
        lines: &[&str],
        mode: Mode,
        success: (&'static str, Duration),
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            ctx,
            id: id.to_string(),
            questions,
            lines: lines.iter().map(|line| line.to_string()).collect(),
            success_effect: success.0,
            success_delay: success.1,
            mode,
            state: Mutex::new(QuizState::default()),
        })
    }

    /// One question retried until answered correctly
    pub fn single(
        ctx: Arc<ChallengeContext>,
        id: &str,
        question: Question,
        lines: &[&str],
        wrong_message: &str,
        reopen_after: Duration,
    ) -> Arc<Self> {
        Self::build(
            ctx,
            id,
            vec![question],
            lines,
            Mode::retry(wrong_message, reopen_after),
            ("sucesso", Duration::ZERO),
        )
    }

    /// Questions asked once each, completed through [`continue_on`](Self::continue_on)
    pub fn scored(ctx: Arc<ChallengeContext>, id: &str, questions: Vec<Question>, line: &str) -> Arc<Self> {
        Self::build(ctx, id, questions, &[line], Mode::Scored, ("sucesso", Duration::ZERO))
    }

    /// Spell quizzes hold the closing line while the button animates
    fn spell(
        ctx: Arc<ChallengeContext>,
        id: &str,
        question: Question,
        line: &str,
        wrong_message: &str,
    ) -> Arc<Self> {
        Self::build(
            ctx,
            id,
            vec![question],
            &[line],
            Mode::retry(wrong_message, Duration::from_millis(1500)),
            ("sucesso", Duration::from_millis(800)),
        )
    }

    pub fn escolha(ctx: Arc<ChallengeContext>) -> Arc<Self> {
        Self::build(
            ctx,
            "escolha",
            vec![Question::open(
                "O que você leva consigo?",
                ["Coragem", "Sabedoria", "Lealdade", "Ambição"],
            )],
            &["Interessante escolha."],
            Mode::retry("", Duration::ZERO),
            ("clique", Duration::ZERO),
        )
    }

    pub fn ortografia(ctx: Arc<ChallengeContext>) -> Arc<Self> {
        Self::single(
            ctx,
            "ortografia",
            Question::new(
                "Qual é a grafia correta do feitiço?",
                ["Expeliarmus", "Expelliarmus", "Expelliarmos"],
                1,
            ),
            &["Pequenos detalhes também protegem."],
            "Nem tudo o que parece certo está correto. Tente outra vez.",
            Duration::from_secs(2),
        )
    }

    pub fn expecto_patronum(ctx: Arc<ChallengeContext>) -> Arc<Self> {
        Self::spell(
            ctx,
            "expecto-patronum",
            Question::new(
                "O que é preciso para conjurar um Patrono?",
                ["Raiva contida", "Uma memória verdadeiramente feliz", "Uma varinha nova"],
                1,
            ),
            "Exatamente. Uma memória verdadeiramente feliz.",
            "Não é isso. Tente novamente.",
        )
    }

    pub fn wingardium_leviosa(ctx: Arc<ChallengeContext>) -> Arc<Self> {
        Self::spell(
            ctx,
            "wingardium-leviosa",
            Question::new(
                "Como se pronuncia o feitiço?",
                ["Levio-SA", "Levi-O-sa", "LE-viosa"],
                1,
            ),
            "É Levi-O-sa, não Levio-SA! Perfeito.",
            "Não... A pronúncia importa!",
        )
    }

    pub fn pai_nosso_1(ctx: Arc<ChallengeContext>) -> Arc<Self> {
        Self::spell(
            ctx,
            "pai-nosso-1",
            Question::new(
                "Dimitte nobis debita nostra. O que significa \"dimitte\"?",
                ["Dá", "Perdoa", "Livra"],
                1,
            ),
            "Sim. Perdão... A palavra que liberta.",
            "Não é essa. Reflita sobre o significado.",
        )
    }

    pub fn pai_nosso_2(ctx: Arc<ChallengeContext>) -> Arc<Self> {
        Self::spell(
            ctx,
            "pai-nosso-2",
            Question::new(
                "Sicut et nos ______ debitoribus nostris.",
                ["dimittimus", "dimitte", "debita"],
                0,
            ),
            "Sicut et nos dimittimus... Assim como nós perdoamos.",
            "Não é essa palavra. Tente novamente.",
        )
    }

    pub fn memorias_quiz(ctx: Arc<ChallengeContext>) -> Arc<Self> {
        Self::scored(
            ctx,
            "memorias-quiz",
            vec![
                Question::new(
                    "Qual a cor do vestido que usou na primeira vez que saímos?",
                    ["Vermelho", "Azul", "Preto", "Branco"],
                    0,
                ),
                Question::new(
                    "Quais pratos pedimos no restaurante que conversamos pela primeira vez sobre intenção de namoro?",
                    ["Pizza e Massa", "Hambúrguer e Batata", "Sushi e Sashimi", "Salada e Risoto"],
                    0,
                ),
                Question::new(
                    "Qual foi o primeiro filme que assistimos juntos?",
                    ["Harry Potter", "Senhor dos Anéis", "Star Wars", "Marvel"],
                    0,
                ),
            ],
            "Cada lembrança é um tesouro guardado...",
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The question on screen, `None` once the quiz is over
    pub fn question(&self) -> Option<Question> {
        let state = lock(&self.state);
        if state.finished || state.solved {
            return None;
        }
        self.questions.get(state.current).cloned()
    }

    /// Correct answers and question count, once a scored quiz is over
    pub fn score(&self) -> Option<(usize, usize)> {
        let state = lock(&self.state);
        state.finished.then(|| {
            let correct = state.results.iter().filter(|r| **r).count();
            (correct, self.questions.len())
        })
    }

    /// Click an option of the current question
    pub fn answer(&self, index: usize) -> Attempt {
        let (question, current) = {
            let mut state = lock(&self.state);
            if state.locked || state.finished || state.solved {
                return Attempt::Ignored;
            }
            let Some(question) = self.questions.get(state.current).cloned() else {
                return Attempt::Ignored;
            };
            if index >= question.options.len() {
                return Attempt::Ignored;
            }
            state.locked = true;
            (question, state.current)
        };
        let correct = question.accepts(index);
        match &self.mode {
            Mode::Retry {
                wrong_message,
                reopen_after,
            } => {
                if correct {
                    lock(&self.state).solved = true;
                    self.ctx.effect(self.success_effect);
                    let answer = Value::String(question.options[index].clone());
                    self.finish_after(self.success_delay, answer);
                    Attempt::Solved
                } else {
                    self.ctx.fail(&self.id, wrong_message, *reopen_after);
                    self.reopen_after(*reopen_after);
                    Attempt::Rejected
                }
            }
            Mode::Scored => {
                lock(&self.state).results.push(correct);
                let delay = if correct {
                    self.ctx.effect("sucesso");
                    SCORED_NEXT_CORRECT
                } else {
                    self.ctx.fail(&self.id, "Ops! Mas vamos continuar...", Duration::ZERO);
                    SCORED_NEXT_WRONG
                };
                self.next_question_after(current, delay);
                if correct {
                    Attempt::Solved
                } else {
                    Attempt::Rejected
                }
            }
        }
    }

    /// "Continuar" on the score screen of a scored quiz
    pub fn continue_on(&self) -> Attempt {
        let (correct, total) = {
            let mut state = lock(&self.state);
            if !state.finished || state.solved {
                return Attempt::Ignored;
            }
            state.solved = true;
            (
                state.results.iter().filter(|r| **r).count(),
                self.questions.len(),
            )
        };
        self.ctx.effect("progresso");
        self.ctx.succeed(
            &self.id,
            Some(json!({ "acertos": correct, "total": total })),
            &self.lines,
        );
        Attempt::Solved
    }

    fn finish_after(&self, delay: Duration, answer: Value) {
        if delay.is_zero() {
            self.ctx.succeed(&self.id, Some(answer), &self.lines);
            return;
        }
        let me = self.me.clone();
        self.ctx.scheduler().after(delay, move || {
            if let Some(quiz) = me.upgrade() {
                quiz.ctx.succeed(&quiz.id, Some(answer), &quiz.lines);
            }
        });
    }

    fn reopen_after(&self, delay: Duration) {
        let me = self.me.clone();
        self.ctx.scheduler().after(delay, move || {
            if let Some(quiz) = me.upgrade() {
                lock(&quiz.state).locked = false;
            }
        });
    }

    fn next_question_after(&self, current: usize, delay: Duration) {
        let me = self.me.clone();
        self.ctx.scheduler().after(delay, move || {
            let Some(quiz) = me.upgrade() else {
                return;
            };
            {
                let mut state = lock(&quiz.state);
                if state.current != current {
                    return;
                }
                state.current += 1;
                state.locked = false;
                state.finished = state.current >= quiz.questions.len();
            }
            quiz.ctx.feedback(&quiz.id, "");
            debug!("[Puzzle] '{}' question {}", quiz.id, current + 2);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzles::testing::{ms, Harness};

    #[tokio::test(start_paused = true)]
    async fn wrong_pick_locks_until_reopened() {
        let h = Harness::new(&["ortografia"]);
        let quiz = QuizPuzzle::ortografia(h.ctx.clone());

        assert_eq!(quiz.answer(0), Attempt::Rejected);
        assert_eq!(
            h.feedback("ortografia"),
            "Nem tudo o que parece certo está correto. Tente outra vez."
        );
        assert_eq!(quiz.answer(1), Attempt::Ignored);

        tokio::time::sleep(ms(2001)).await;
        assert_eq!(h.feedback("ortografia"), "");
        assert_eq!(quiz.answer(1), Attempt::Solved);
        assert_eq!(h.store.answer("ortografia"), Some(Value::from("Expelliarmus")));
        tokio::time::sleep(ms(150)).await;
        assert!(!h.store.scroll_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn closing_line_can_wait_for_the_button_animation() {
        let h = Harness::new(&["pai-nosso-2"]);
        let quiz = QuizPuzzle::pai_nosso_2(h.ctx.clone());
        assert_eq!(quiz.answer(0), Attempt::Solved);
        assert!(h.lines.lines().is_empty());
        assert!(!h.store.is_challenge_complete("pai-nosso-2"));

        tokio::time::sleep(ms(801)).await;
        assert_eq!(
            h.lines.current().as_deref(),
            Some("Sicut et nos dimittimus... Assim como nós perdoamos.")
        );
        assert!(h.store.is_challenge_complete("pai-nosso-2"));
    }

    #[tokio::test(start_paused = true)]
    async fn open_question_accepts_anything() {
        let h = Harness::new(&["escolha"]);
        let quiz = QuizPuzzle::escolha(h.ctx.clone());
        assert_eq!(quiz.answer(3), Attempt::Solved);
        assert_eq!(h.store.answer("escolha"), Some(Value::from("Ambição")));
        assert_eq!(h.effects(), vec!["click"]);
    }

    #[tokio::test(start_paused = true)]
    async fn scored_quiz_continues_after_mistakes() {
        let h = Harness::new(&["memorias-quiz"]);
        let quiz = QuizPuzzle::memorias_quiz(h.ctx.clone());

        assert_eq!(quiz.answer(0), Attempt::Solved);
        assert_eq!(quiz.answer(1), Attempt::Ignored);
        tokio::time::sleep(ms(1501)).await;

        assert_eq!(quiz.answer(2), Attempt::Rejected);
        assert_eq!(h.feedback("memorias-quiz"), "Ops! Mas vamos continuar...");
        tokio::time::sleep(ms(2501)).await;

        assert_eq!(quiz.answer(0), Attempt::Solved);
        assert_eq!(quiz.score(), None);
        assert_eq!(quiz.continue_on(), Attempt::Ignored);
        tokio::time::sleep(ms(1501)).await;

        assert_eq!(quiz.question(), None);
        assert_eq!(quiz.score(), Some((2, 3)));
        assert!(!h.store.is_challenge_complete("memorias-quiz"));
        assert_eq!(quiz.continue_on(), Attempt::Solved);
        assert_eq!(
            h.store.answer("memorias-quiz"),
            Some(json!({ "acertos": 2, "total": 3 }))
        );
    }
}
