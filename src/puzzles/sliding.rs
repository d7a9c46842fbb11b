//! Sliding tiles over three levels
//!
//! Boards are shuffled by a random walk of legal moves from the solved
//! position, so every level is solvable. A level is complete when every tile
//! sits at its row-major index with the blank in the last cell.

use super::ChallengeContext;
use crate::lock;
use crate::types::{DialogueEntry, DialogueOptions};
use log::{debug, info};
use rand::Rng;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Rows and columns of each level
pub const LEVELS: [(usize, usize); 3] = [(3, 3), (4, 4), (4, 5)];
const LEVEL_PAUSE: Duration = Duration::from_millis(800);
const CHALLENGE: &str = "sliding-blocks";

/// A grid of numbered tiles, `0` is the blank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    tiles: Vec<u8>,
}

impl Board {
    pub fn solved(rows: usize, cols: usize) -> Self {
        let cells = rows * cols;
        let tiles = (1..cells as u8).chain(std::iter::once(0)).collect();
        Self { rows, cols, tiles }
    }

    /// Build from row-major tiles; `None` unless it is a permutation of `0..rows*cols`
    pub fn from_tiles(rows: usize, cols: usize, tiles: Vec<u8>) -> Option<Self> {
        let mut sorted = tiles.clone();
        sorted.sort_unstable();
        let expected: Vec<u8> = (0..(rows * cols) as u8).collect();
        (sorted == expected).then_some(Self { rows, cols, tiles })
    }

    /// Random walk from the solved position, never ending solved
    pub fn shuffled<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        let mut board = Self::solved(rows, cols);
        let mut previous = None;
        let steps = rows * cols * 20;
        let mut step = 0;
        while step < steps || board.is_solved() {
            let (blank_row, blank_col) = board.blank();
            let candidates: Vec<(usize, usize)> = board
                .neighbours(blank_row, blank_col)
                .into_iter()
                .filter(|cell| Some(*cell) != previous)
                .collect();
            let (row, col) = candidates[rng.random_range(0..candidates.len())];
            board.slide(row, col);
            previous = Some((blank_row, blank_col));
            step += 1;
        }
        board
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn tiles(&self) -> &[u8] {
        &self.tiles
    }

    pub fn tile(&self, row: usize, col: usize) -> Option<u8> {
        (row < self.rows && col < self.cols).then(|| self.tiles[row * self.cols + col])
    }

    pub fn blank(&self) -> (usize, usize) {
        let index = self.tiles.iter().position(|t| *t == 0).unwrap_or(0);
        (index / self.cols, index % self.cols)
    }

    fn neighbours(&self, row: usize, col: usize) -> Vec<(usize, usize)> {
        let mut cells = Vec::with_capacity(4);
        if row > 0 {
            cells.push((row - 1, col));
        }
        if row + 1 < self.rows {
            cells.push((row + 1, col));
        }
        if col > 0 {
            cells.push((row, col - 1));
        }
        if col + 1 < self.cols {
            cells.push((row, col + 1));
        }
        cells
    }

    /// Orthogonally adjacent to the blank
    pub fn is_movable(&self, row: usize, col: usize) -> bool {
        let (blank_row, blank_col) = self.blank();
        row < self.rows
            && col < self.cols
            && blank_row.abs_diff(row) + blank_col.abs_diff(col) == 1
    }

    /// Move the tile at (row, col) into the blank
    pub fn slide(&mut self, row: usize, col: usize) -> bool {
        if !self.is_movable(row, col) {
            return false;
        }
        let (blank_row, blank_col) = self.blank();
        self.tiles
            .swap(row * self.cols + col, blank_row * self.cols + blank_col);
        true
    }

    pub fn is_solved(&self) -> bool {
        let last = self.tiles.len() - 1;
        self.tiles
            .iter()
            .enumerate()
            .all(|(index, tile)| if index == last { *tile == 0 } else { *tile as usize == index + 1 })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideMove {
    Moved,
    /// The move finished the current level
    LevelComplete(usize),
    /// The tile is not next to the blank
    Blocked,
    Ignored,
}

pub struct SlidingPuzzle {
    me: Weak<SlidingPuzzle>,
    ctx: Arc<ChallengeContext>,
    state: Mutex<SlidingState>,
}

struct SlidingState {
    level: usize,
    board: Option<Board>,
    moves: u32,
    /// Between a completed level and the next board
    settling: bool,
    solved: bool,
}

impl SlidingPuzzle {
    pub fn new(ctx: Arc<ChallengeContext>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            ctx,
            state: Mutex::new(SlidingState {
                level: 0,
                board: None,
                moves: 0,
                settling: false,
                solved: false,
            }),
        })
    }

    pub fn id(&self) -> &str {
        CHALLENGE
    }

    /// Deal the first level
    pub fn start(&self) {
        let mut state = lock(&self.state);
        if state.board.is_none() && !state.solved {
            state.board = Some(Self::deal(state.level));
        }
    }

    fn deal(level: usize) -> Board {
        let (rows, cols) = LEVELS[level];
        Board::shuffled(rows, cols, &mut rand::rng())
    }

    /// One-based level number
    pub fn level(&self) -> usize {
        lock(&self.state).level + 1
    }

    pub fn moves(&self) -> u32 {
        lock(&self.state).moves
    }

    pub fn board(&self) -> Option<Board> {
        lock(&self.state).board.clone()
    }

    /// Reshuffle the current level
    pub fn reset_level(&self) {
        {
            let mut state = lock(&self.state);
            if state.solved || state.settling {
                return;
            }
            state.board = Some(Self::deal(state.level));
            state.moves = 0;
        }
        self.ctx.feedback(CHALLENGE, "");
        self.ctx.effect("clique");
    }

    /// Click a tile
    pub fn slide(&self, row: usize, col: usize) -> SlideMove {
        let level = {
            let mut state = lock(&self.state);
            if state.solved || state.settling {
                return SlideMove::Ignored;
            }
            let Some(board) = state.board.as_mut() else {
                return SlideMove::Ignored;
            };
            if !board.slide(row, col) {
                return SlideMove::Blocked;
            }
            let done = board.is_solved();
            state.moves += 1;
            if !done {
                drop(state);
                self.ctx.effect("clique");
                return SlideMove::Moved;
            }
            state.settling = true;
            state.level
        };
        self.ctx.effect("clique");
        self.ctx.effect("sucesso");
        info!("[Puzzle] sliding level {} complete", level + 1);
        let me = self.me.clone();
        self.ctx.scheduler().after(LEVEL_PAUSE, move || {
            if let Some(puzzle) = me.upgrade() {
                puzzle.after_level(level);
            }
        });
        SlideMove::LevelComplete(level + 1)
    }

    fn after_level(&self, level: usize) {
        if level + 1 >= LEVELS.len() {
            lock(&self.state).solved = true;
            self.ctx.succeed(
                CHALLENGE,
                None,
                &["Os três selos foram quebrados. O baú se abre..."],
            );
            return;
        }
        let me = self.me.clone();
        let text = format!("Nível {} completo! Preparando próximo desafio...", level + 1);
        self.ctx.dialogue().enqueue(
            DialogueEntry::new(text, DialogueOptions::default()).on_complete(move || {
                if let Some(puzzle) = me.upgrade() {
                    puzzle.next_level(level + 1);
                }
            }),
        );
    }

    fn next_level(&self, level: usize) {
        let mut state = lock(&self.state);
        state.level = level;
        state.board = Some(Self::deal(level));
        state.moves = 0;
        state.settling = false;
        debug!("[Puzzle] sliding level {} dealt", level + 1);
    }

    #[cfg(test)]
    fn arrange(&self, board: Board) {
        lock(&self.state).board = Some(board);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzles::testing::{ms, Harness};

    /// Solved board with the last tile pulled into the blank
    fn one_move_from_solved(rows: usize, cols: usize) -> Board {
        let mut board = Board::solved(rows, cols);
        assert!(board.slide(rows - 1, cols - 2));
        board
    }

    #[test]
    fn completion_requires_every_tile_in_place() {
        for (rows, cols) in LEVELS {
            let board = Board::solved(rows, cols);
            assert!(board.is_solved(), "{rows}x{cols}");
            assert_eq!(board.blank(), (rows - 1, cols - 1));

            let mut off = board.clone();
            assert!(off.slide(rows - 2, cols - 1));
            assert!(!off.is_solved());
            assert!(off.slide(rows - 1, cols - 1));
            assert!(off.is_solved());
        }

        let swapped = Board::from_tiles(3, 3, vec![2, 1, 3, 4, 5, 6, 7, 8, 0]).unwrap();
        assert!(!swapped.is_solved());
        assert!(Board::from_tiles(3, 3, vec![1, 1, 3, 4, 5, 6, 7, 8, 0]).is_none());
    }

    #[test]
    fn only_tiles_next_to_the_blank_move() {
        let mut board = Board::solved(3, 3);
        assert!(!board.is_movable(0, 0));
        assert!(!board.is_movable(1, 1));
        assert!(!board.slide(1, 1));
        assert!(board.is_movable(2, 1));
        assert!(board.is_movable(1, 2));
        assert!(!board.is_movable(3, 2));
        assert!(board.slide(1, 2));
        assert_eq!(board.tile(2, 2), Some(6));
        assert_eq!(board.blank(), (1, 2));
    }

    #[test]
    fn shuffles_keep_every_tile_and_are_not_solved() {
        let mut rng = rand::rng();
        for (rows, cols) in LEVELS {
            for _ in 0..20 {
                let board = Board::shuffled(rows, cols, &mut rng);
                assert!(!board.is_solved());
                assert!(Board::from_tiles(rows, cols, board.tiles().to_vec()).is_some());
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn three_levels_complete_the_challenge() {
        let h = Harness::new(&[CHALLENGE]);
        let puzzle = SlidingPuzzle::new(h.ctx.clone());
        puzzle.start();
        assert_eq!(puzzle.level(), 1);
        assert!(!puzzle.board().unwrap().is_solved());

        for (level, (rows, cols)) in LEVELS.into_iter().enumerate() {
            puzzle.arrange(one_move_from_solved(rows, cols));
            assert_eq!(puzzle.slide(0, 0), SlideMove::Blocked);
            assert_eq!(puzzle.slide(rows - 1, cols - 1), SlideMove::LevelComplete(level + 1));
            assert_eq!(puzzle.slide(rows - 1, cols - 2), SlideMove::Ignored);

            tokio::time::sleep(ms(801)).await;
            if level + 1 < LEVELS.len() {
                assert_eq!(
                    h.lines.current(),
                    Some(format!("Nível {} completo! Preparando próximo desafio...", level + 1))
                );
                tokio::time::sleep(ms(101)).await;
                assert_eq!(puzzle.level(), level + 2);
                assert_eq!(puzzle.moves(), 0);
                h.dialogue.advance();
                assert!(!h.store.is_challenge_complete(CHALLENGE));
            }
        }

        assert!(h.store.is_challenge_complete(CHALLENGE));
        tokio::time::sleep(ms(401)).await;
        assert!(!h.store.scroll_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_reshuffles_the_level() {
        let h = Harness::new(&[CHALLENGE]);
        let puzzle = SlidingPuzzle::new(h.ctx.clone());
        puzzle.start();
        puzzle.arrange(Board::from_tiles(3, 3, vec![1, 2, 3, 4, 5, 6, 0, 7, 8]).unwrap());
        assert_eq!(puzzle.slide(1, 0), SlideMove::Moved);
        assert_eq!(puzzle.moves(), 1);
        puzzle.reset_level();
        assert_eq!(puzzle.moves(), 0);
        assert_eq!(puzzle.level(), 1);
    }
}
