//! Maze chase: reach the exit before the dementor reaches you
//!
//! The chaser takes a king step toward the player every tick while the
//! player may take a single orthogonal step per tick, and the round ends
//! after fifteen ticks regardless. The exit is eighteen steps away, so the
//! chase is lost by construction and losing is what moves the story on.

use super::ChallengeContext;
use crate::lock;
use crate::types::Callback;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

const CHALLENGE: &str = "maze";
pub const COLUMNS: i32 = 10;
pub const ROWS: i32 = 10;
pub const TICK: Duration = Duration::from_secs(1);
pub const TICK_LIMIT: u32 = 15;
const CAUGHT_PAUSE: Duration = Duration::from_millis(500);
const TIMER_ELEMENT: &str = "maze-tempo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaseOutcome {
    Running,
    Caught,
    Escaped,
}

/// Positions and clock of one chase
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChaseBoard {
    pub player: Position,
    pub chaser: Position,
    pub exit: Position,
    pub ticks: u32,
    /// The player already stepped during the current tick
    stepped: bool,
}

impl Default for ChaseBoard {
    fn default() -> Self {
        Self {
            player: Position::new(0, 0),
            chaser: Position::new(0, ROWS - 1),
            exit: Position::new(COLUMNS - 1, ROWS - 1),
            ticks: 0,
            stepped: false,
        }
    }
}

impl ChaseBoard {
    /// Step the player; off-grid moves and second moves in a tick are refused
    pub fn step(&mut self, direction: Direction) -> Option<ChaseOutcome> {
        if self.stepped {
            return None;
        }
        let (dx, dy) = direction.delta();
        let next = Position::new(self.player.x + dx, self.player.y + dy);
        if !(0..COLUMNS).contains(&next.x) || !(0..ROWS).contains(&next.y) {
            return None;
        }
        self.player = next;
        self.stepped = true;
        Some(self.outcome())
    }

    /// Advance the clock: the chaser closes in on both axes at once
    pub fn tick(&mut self) -> ChaseOutcome {
        self.ticks += 1;
        self.stepped = false;
        self.chaser.x += (self.player.x - self.chaser.x).signum();
        self.chaser.y += (self.player.y - self.chaser.y).signum();
        match self.outcome() {
            ChaseOutcome::Running if self.ticks >= TICK_LIMIT => ChaseOutcome::Caught,
            outcome => outcome,
        }
    }

    fn outcome(&self) -> ChaseOutcome {
        if self.player == self.chaser {
            ChaseOutcome::Caught
        } else if self.player == self.exit {
            ChaseOutcome::Escaped
        } else {
            ChaseOutcome::Running
        }
    }
}

pub struct ChaseGame {
    me: Weak<ChaseGame>,
    ctx: Arc<ChallengeContext>,
    state: Mutex<ChaseState>,
    on_caught: Mutex<Option<Callback>>,
}

#[derive(Default)]
struct ChaseState {
    board: ChaseBoard,
    active: bool,
    /// Bumped on every start so an old tick loop stops
    run: u64,
}

impl ChaseGame {
    pub fn new(ctx: Arc<ChallengeContext>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            ctx,
            state: Mutex::new(ChaseState::default()),
            on_caught: Mutex::new(None),
        })
    }

    /// Sequence to run once the player has been caught
    pub fn on_caught(&self, callback: impl FnOnce() + Send + 'static) {
        *lock(&self.on_caught) = Some(Box::new(callback));
    }

    pub fn board(&self) -> ChaseBoard {
        lock(&self.state).board.clone()
    }

    pub fn is_active(&self) -> bool {
        lock(&self.state).active
    }

    /// The start button
    pub fn start(&self) {
        let run = {
            let mut state = lock(&self.state);
            if state.active {
                return;
            }
            state.board = ChaseBoard::default();
            state.active = true;
            state.run += 1;
            state.run
        };
        info!("[Puzzle] maze chase started");
        self.show_time(0);
        let me = self.me.clone();
        self.ctx.scheduler().spawn(async move {
            let mut ticker = tokio::time::interval(TICK);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(game) = me.upgrade() else {
                    return;
                };
                if !game.tick(run) {
                    return;
                }
            }
        });
    }

    /// Arrow key; returns false when the step was refused
    pub fn step(&self, direction: Direction) -> bool {
        let outcome = {
            let mut state = lock(&self.state);
            if !state.active {
                return false;
            }
            let Some(outcome) = state.board.step(direction) else {
                return false;
            };
            if outcome != ChaseOutcome::Running {
                state.active = false;
            }
            outcome
        };
        self.finish(outcome);
        true
    }

    /// One clock tick of run `run`; false once the loop should stop
    fn tick(&self, run: u64) -> bool {
        let (outcome, ticks) = {
            let mut state = lock(&self.state);
            if state.run != run || !state.active {
                return false;
            }
            let outcome = state.board.tick();
            if outcome != ChaseOutcome::Running {
                state.active = false;
            }
            (outcome, state.board.ticks)
        };
        debug!("[Puzzle] maze tick {}", ticks);
        self.show_time(ticks);
        self.finish(outcome);
        outcome == ChaseOutcome::Running
    }

    fn show_time(&self, ticks: u32) {
        if let Err(err) = self.ctx.surface().set_text(TIMER_ELEMENT, &ticks.to_string()) {
            debug!("[Puzzle] {}", err);
        }
    }

    fn finish(&self, outcome: ChaseOutcome) {
        match outcome {
            ChaseOutcome::Running => {}
            ChaseOutcome::Escaped => {
                self.ctx.effect("sucesso");
                self.ctx
                    .succeed(CHALLENGE, None, &["Impossível... você conseguiu!"]);
            }
            ChaseOutcome::Caught => {
                info!("[Puzzle] maze chase lost");
                let callback = lock(&self.on_caught).take();
                match callback {
                    Some(callback) => {
                        self.ctx.scheduler().after(CAUGHT_PAUSE, callback);
                    }
                    None => warn!("[Puzzle] maze lost with no defeat sequence attached"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzles::testing::{ms, Harness};
    use std::collections::{HashSet, VecDeque};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn one_step_per_tick_inside_the_grid() {
        let mut board = ChaseBoard::default();
        assert_eq!(board.step(Direction::Up), None);
        assert_eq!(board.step(Direction::Right), Some(ChaseOutcome::Running));
        assert_eq!(board.step(Direction::Right), None);
        assert_eq!(board.player, Position::new(1, 0));

        assert_eq!(board.tick(), ChaseOutcome::Running);
        assert_eq!(board.chaser, Position::new(1, 8));
        assert_eq!(board.step(Direction::Down), Some(ChaseOutcome::Running));
    }

    #[test]
    fn standing_still_is_caught_by_the_bound() {
        let mut board = ChaseBoard::default();
        let mut ticks = 0;
        while board.tick() == ChaseOutcome::Running {
            ticks += 1;
        }
        assert_eq!(ticks + 1, 9);
        assert_eq!(board.chaser, board.player);
    }

    #[test]
    fn every_reachable_play_ends_caught() {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([ChaseBoard::default()]);
        while let Some(board) = queue.pop_front() {
            if !seen.insert(board.clone()) {
                continue;
            }
            let mut choices = vec![board.clone()];
            for direction in Direction::ALL {
                let mut moved = board.clone();
                match moved.step(direction) {
                    None => continue,
                    Some(ChaseOutcome::Escaped) => panic!("escaped at {:?}", moved),
                    Some(ChaseOutcome::Caught) => continue,
                    Some(ChaseOutcome::Running) => choices.push(moved),
                }
            }
            for mut next in choices {
                match next.tick() {
                    ChaseOutcome::Running => {
                        assert!(next.ticks < TICK_LIMIT);
                        queue.push_back(next);
                    }
                    ChaseOutcome::Caught => assert!(next.ticks <= TICK_LIMIT),
                    ChaseOutcome::Escaped => panic!("escaped at {:?}", next),
                }
            }
        }
        assert!(seen.len() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn losing_runs_the_defeat_sequence() {
        let h = Harness::new(&[CHALLENGE]);
        let game = ChaseGame::new(h.ctx.clone());
        let defeated = Arc::new(AtomicBool::new(false));
        let flag = defeated.clone();
        game.on_caught(move || flag.store(true, Ordering::SeqCst));

        game.start();
        assert!(game.is_active());
        tokio::time::sleep(ms(500)).await;
        assert!(game.step(Direction::Right));
        assert!(!game.step(Direction::Right));

        // (1, 0) is reached by the chaser on the ninth tick
        tokio::time::sleep(ms(8501)).await;
        assert!(!game.is_active());
        assert_eq!(h.surface.text(TIMER_ELEMENT), None);
        assert!(!game.step(Direction::Down));
        assert!(!defeated.load(Ordering::SeqCst));
        tokio::time::sleep(ms(501)).await;
        assert!(defeated.load(Ordering::SeqCst));
        assert!(!h.store.is_challenge_complete(CHALLENGE));
    }
}
