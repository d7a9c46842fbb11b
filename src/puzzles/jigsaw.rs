//! Photo jigsaw: swap pieces until each sits at its own index

use super::ChallengeContext;
use crate::lock;
use rand::seq::SliceRandom;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

pub const COLUMNS: usize = 4;
pub const ROWS: usize = 6;
const CHALLENGE: &str = "quebra-cabeca";
const COMPLETE_PAUSE: Duration = Duration::from_millis(500);

pub struct JigsawPuzzle {
    me: Weak<JigsawPuzzle>,
    ctx: Arc<ChallengeContext>,
    state: Mutex<JigsawState>,
}

struct JigsawState {
    /// `pieces[position]` is the piece shown at that position
    pieces: Vec<usize>,
    solved: bool,
}

fn shuffled_pieces() -> Vec<usize> {
    let mut pieces: Vec<usize> = (0..COLUMNS * ROWS).collect();
    let mut rng = rand::rng();
    while pieces.iter().enumerate().all(|(i, p)| i == *p) {
        pieces.shuffle(&mut rng);
    }
    pieces
}

impl JigsawPuzzle {
    pub fn new(ctx: Arc<ChallengeContext>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            ctx,
            state: Mutex::new(JigsawState {
                pieces: shuffled_pieces(),
                solved: false,
            }),
        })
    }

    pub fn id(&self) -> &str {
        CHALLENGE
    }

    pub fn pieces(&self) -> Vec<usize> {
        lock(&self.state).pieces.clone()
    }

    /// Pieces already at their own position
    pub fn correct_count(&self) -> usize {
        lock(&self.state)
            .pieces
            .iter()
            .enumerate()
            .filter(|(position, piece)| position == *piece)
            .count()
    }

    pub fn is_solved(&self) -> bool {
        lock(&self.state).solved
    }

    /// Drop the piece at `from` onto `to`; returns the correct count afterwards
    pub fn swap(&self, from: usize, to: usize) -> Option<usize> {
        let complete = {
            let mut state = lock(&self.state);
            let total = state.pieces.len();
            if state.solved || from >= total || to >= total {
                return None;
            }
            state.pieces.swap(from, to);
            let complete = state.pieces.iter().enumerate().all(|(i, p)| i == *p);
            state.solved = complete;
            complete
        };
        self.ctx.effect("clique");
        if complete {
            let me = self.me.clone();
            self.ctx.scheduler().after(COMPLETE_PAUSE, move || {
                if let Some(puzzle) = me.upgrade() {
                    puzzle.ctx.effect("sucesso");
                    puzzle.ctx.succeed(
                        CHALLENGE,
                        None,
                        &["A imagem se completa... E com ela, a memória de tudo que viveram juntos."],
                    );
                }
            });
        }
        Some(self.correct_count())
    }

    /// Deal a new shuffle
    pub fn reset(&self) {
        {
            let mut state = lock(&self.state);
            if state.solved {
                return;
            }
            state.pieces = shuffled_pieces();
        }
        self.ctx.effect("clique");
    }

    #[cfg(test)]
    fn arrange(&self, pieces: Vec<usize>) {
        lock(&self.state).pieces = pieces;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzles::testing::{ms, Harness};

    #[tokio::test(start_paused = true)]
    async fn deal_is_a_shuffled_permutation() {
        let h = Harness::new(&[CHALLENGE]);
        let puzzle = JigsawPuzzle::new(h.ctx.clone());
        let mut pieces = puzzle.pieces();
        assert_eq!(pieces.len(), 24);
        assert!(puzzle.correct_count() < 24);
        pieces.sort_unstable();
        assert_eq!(pieces, (0..24).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn swapping_counts_and_completes() {
        let h = Harness::new(&[CHALLENGE]);
        let puzzle = JigsawPuzzle::new(h.ctx.clone());
        let mut pieces: Vec<usize> = (0..24).collect();
        pieces.swap(0, 5);
        pieces.swap(10, 23);
        puzzle.arrange(pieces);
        assert_eq!(puzzle.correct_count(), 20);

        assert_eq!(puzzle.swap(0, 5), Some(22));
        assert_eq!(puzzle.swap(24, 0), None);
        assert!(!puzzle.is_solved());
        assert_eq!(puzzle.swap(23, 10), Some(24));
        assert!(puzzle.is_solved());
        assert_eq!(puzzle.swap(1, 2), None);

        tokio::time::sleep(ms(499)).await;
        assert!(!h.store.is_challenge_complete(CHALLENGE));
        tokio::time::sleep(ms(2)).await;
        assert!(h.store.is_challenge_complete(CHALLENGE));
        tokio::time::sleep(ms(101)).await;
        assert!(!h.store.scroll_locked());
    }
}
