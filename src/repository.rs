//! Play-session orchestration: moves, spawns, lives, undo and snapshots.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, GameConfig};
use crate::engine::{Direction, GridError, GridState, Score, Tile};
use crate::events::{Listener, Notification};
use crate::history::UndoChain;
use crate::serialization::{GameSnapshot, GridSnapshot, SnapshotError};

const STUCK_MESSAGE: &str = "The grid is stuck, you can not move, you lose a life. \
If you run out of lives it is GAME OVER. You can undo if you have lives.";
const OUT_OF_LIVES_MESSAGE: &str = "You have run out of lives, game is over";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    GameOver,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is not active")]
    NotActive,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoError {
    #[error("no earlier state to return to")]
    NoHistory,
    #[error("the game is over and undo after game over is disabled")]
    SessionOver,
}

/// What a move did to the session.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveResult {
    NoError,
    /// Nothing slid; the session is untouched.
    CannotMoveInThatDirection,
    /// The grid is stuck and a life was spent. Undo to keep playing.
    NotGameEnding { remaining_lives: u32, message: String },
    /// The grid is stuck and no lives remain.
    GameOver { message: String },
}

impl MoveResult {
    pub fn message(&self) -> Option<&str> {
        match self {
            MoveResult::NotGameEnding { message, .. } | MoveResult::GameOver { message } => Some(message),
            _ => None,
        }
    }

    pub fn is_game_over(&self) -> bool { matches!(self, MoveResult::GameOver { .. }) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PlaySession {
    chain: UndoChain,
    remaining_lives: u32,
    goal: Tile,
    goal_reached: bool,
    highest_number: Tile,
    player_name: String,
    accepted_spawnables: Vec<Tile>,
    status: SessionStatus,
}

impl PlaySession {
    fn from_snapshot(snapshot: &GameSnapshot) -> Result<Self, SnapshotError> {
        let states = snapshot.grid_states()?;
        let chain = UndoChain::from_states(states, snapshot.max_undos)?;
        // never trust a stored maximum; derive it from what is actually retained
        let highest_number = chain.iter().map(GridState::highest_tile).max().unwrap_or(0);
        let status = if snapshot.remaining_lives == 0 { SessionStatus::GameOver } else { SessionStatus::Active };
        Ok(Self {
            chain,
            remaining_lives: snapshot.remaining_lives,
            goal: snapshot.goal,
            goal_reached: highest_number >= snapshot.goal,
            highest_number,
            player_name: snapshot.player_name.clone(),
            accepted_spawnables: snapshot.accepted_spawnables.clone(),
            status,
        })
    }
}

/// A single play session.
///
/// The repository owns its random source and its listeners. Every call runs to
/// completion and either applies fully or leaves the session untouched.
///
/// ```
/// use tiles_2048::config::GameConfig;
/// use tiles_2048::engine::Direction;
/// use tiles_2048::repository::{GameRepository, MoveResult};
///
/// let mut game = GameRepository::with_seed(&GameConfig::classic(), 42).unwrap();
/// assert_eq!(game.current_state().count_non_empty(), 2);
/// match game.move_grid(Direction::Left).unwrap() {
///     MoveResult::CannotMoveInThatDirection => assert_eq!(game.remaining_undos(), 0),
///     _ => assert_eq!(game.remaining_undos(), 1),
/// }
/// ```
pub struct GameRepository<R = StdRng> {
    session: PlaySession,
    rng: R,
    listeners: Vec<Box<dyn Listener>>,
    undo_after_game_over: bool,
}

impl GameRepository<StdRng> {
    pub fn with_seed(config: &GameConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::new(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> GameRepository<R> {
    /// Start a fresh session: an empty grid with the configured starter tiles.
    pub fn new(config: &GameConfig, mut rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut state = GridState::empty(config.default_grid_width, config.default_grid_height)
            .map_err(|e| match e {
                GridError::TooLarge { width, height } => ConfigError::GridTooLarge { width, height },
                _ => ConfigError::GridTooSmall { width: config.default_grid_width, height: config.default_grid_height },
            })?;
        for _ in 0..config.default_starter_tiles {
            state = state.with_random_tile(&config.default_accepted_spawnables, &mut rng).state;
        }
        let highest_number = state.highest_tile();
        let chain = UndoChain::new(state, config.default_max_undos).map_err(|_| ConfigError::NoUndos)?;

        info!(
            width = config.default_grid_width,
            height = config.default_grid_height,
            lives = config.default_max_lives,
            goal = config.default_goal,
            "new session"
        );
        Ok(Self {
            session: PlaySession {
                chain,
                remaining_lives: config.default_max_lives,
                goal: config.default_goal,
                goal_reached: highest_number >= config.default_goal,
                highest_number,
                player_name: String::new(),
                accepted_spawnables: config.default_accepted_spawnables.clone(),
                status: SessionStatus::Active,
            },
            rng,
            listeners: Vec::new(),
            undo_after_game_over: false,
        })
    }

    /// Rebuild a session from a snapshot.
    pub fn from_snapshot(snapshot: &GameSnapshot, rng: R) -> Result<Self, SnapshotError> {
        let session = PlaySession::from_snapshot(snapshot).inspect_err(|e| warn!(error = %e, "rejected snapshot"))?;
        info!(depth = session.chain.depth(), lives = session.remaining_lives, "session restored");
        Ok(Self { session, rng, listeners: Vec::new(), undo_after_game_over: false })
    }

    pub fn subscribe(&mut self, listener: impl Listener + 'static) { self.listeners.push(Box::new(listener)); }

    /// Allow `undo` to back out of a finished game.
    pub fn set_undo_after_game_over(&mut self, enabled: bool) { self.undo_after_game_over = enabled; }

    pub fn move_grid(&mut self, direction: Direction) -> Result<MoveResult, SessionError> {
        if self.session.status != SessionStatus::Active {
            return Err(SessionError::NotActive);
        }

        let slid = self.session.chain.peek_front().shift(direction);
        if !slid.moved {
            debug!(%direction, "move rejected");
            return Ok(MoveResult::CannotMoveInThatDirection);
        }

        let spawned = slid.state.with_random_tile(&self.session.accepted_spawnables, &mut self.rng);
        let next = spawned.state;
        let stuck = !next.has_any_legal_move();
        let highest = next.highest_tile();
        let score = next.score();
        debug!(%direction, score, merges = slid.merges, spawned = ?spawned.placed, "move applied");

        let evicted = self.session.chain.push_front(next);
        self.emit(Notification::MoveApplied {
            direction,
            changes: slid.changes,
            spawned: spawned.placed,
            score_delta: slid.score_delta,
            score,
        });
        // an eviction leaves the visible undo count where it was
        if evicted.is_none() {
            let remaining_undos = self.session.chain.remaining_undos();
            self.emit(Notification::UndoDepthChanged { remaining_undos });
        }

        if highest > self.session.highest_number {
            self.session.highest_number = highest;
            self.emit(Notification::MaxNumberChanged { highest });
        }
        if !self.session.goal_reached && self.session.highest_number >= self.session.goal {
            self.session.goal_reached = true;
            info!(goal = self.session.goal, score, "goal reached");
            let (goal, highest) = (self.session.goal, self.session.highest_number);
            self.emit(Notification::GoalReached { goal, highest });
        }

        if !stuck {
            return Ok(MoveResult::NoError);
        }
        self.session.remaining_lives = self.session.remaining_lives.saturating_sub(1);
        if self.session.remaining_lives == 0 {
            self.session.status = SessionStatus::GameOver;
            let highest = self.session.highest_number;
            info!(score, highest, "game over");
            self.emit(Notification::GameOver { score, highest });
            return Ok(MoveResult::GameOver { message: OUT_OF_LIVES_MESSAGE.to_string() });
        }
        let remaining_lives = self.session.remaining_lives;
        debug!(remaining_lives, "grid stuck, life lost");
        self.emit(Notification::LivesChanged { remaining_lives });
        Ok(MoveResult::NotGameEnding { remaining_lives, message: STUCK_MESSAGE.to_string() })
    }

    /// Step back one state. Lives already spent stay spent.
    pub fn undo(&mut self) -> Result<&GridState, UndoError> {
        let reviving = self.session.status == SessionStatus::GameOver;
        if reviving && !self.undo_after_game_over {
            return Err(UndoError::SessionOver);
        }
        let state = self.session.chain.pop_front().map_err(|_| UndoError::NoHistory)?.clone();
        if reviving {
            self.session.status = SessionStatus::Active;
            info!("session revived by undo");
        }
        debug!(remaining_undos = self.session.chain.remaining_undos(), "undo applied");

        let remaining_undos = self.session.chain.remaining_undos();
        self.emit(Notification::UndoApplied { state });
        self.emit(Notification::UndoDepthChanged { remaining_undos });
        Ok(self.session.chain.peek_front())
    }

    pub fn set_player_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.session.player_name = name.clone();
        self.emit(Notification::PlayerNameChanged { name });
    }

    pub fn serialize(&self) -> GameSnapshot {
        let s = &self.session;
        GameSnapshot {
            remaining_lives: s.remaining_lives,
            grid_width: s.chain.peek_front().width(),
            grid_height: s.chain.peek_front().height(),
            goal: s.goal,
            player_name: s.player_name.clone(),
            accepted_spawnables: s.accepted_spawnables.clone(),
            max_undos: s.chain.capacity(),
            undo_chain: s.chain.iter().map(GridSnapshot::from).collect(),
        }
    }

    /// Replace the whole session with `snapshot`. On error nothing changes.
    pub fn restore(&mut self, snapshot: &GameSnapshot) -> Result<(), SnapshotError> {
        let session = PlaySession::from_snapshot(snapshot).inspect_err(|e| warn!(error = %e, "rejected snapshot"))?;
        info!(depth = session.chain.depth(), lives = session.remaining_lives, "session restored");
        self.session = session;
        Ok(())
    }

    fn emit(&mut self, notification: Notification) {
        for listener in &mut self.listeners {
            listener.notify(&notification);
        }
    }
}

impl<R> GameRepository<R> {
    #[inline]
    pub fn current_state(&self) -> &GridState { self.session.chain.peek_front() }

    pub fn score(&self) -> Score { self.current_state().score() }

    pub fn remaining_lives(&self) -> u32 { self.session.remaining_lives }

    pub fn remaining_undos(&self) -> usize { self.session.chain.remaining_undos() }

    /// Highest tile seen in this session.
    pub fn highest_number(&self) -> Tile { self.session.highest_number }

    pub fn goal(&self) -> Tile { self.session.goal }

    pub fn goal_reached(&self) -> bool { self.session.goal_reached }

    pub fn grid_width(&self) -> usize { self.current_state().width() }

    pub fn grid_height(&self) -> usize { self.current_state().height() }

    pub fn player_name(&self) -> &str { &self.session.player_name }

    pub fn accepted_spawnables(&self) -> &[Tile] { &self.session.accepted_spawnables }

    pub fn max_undos(&self) -> usize { self.session.chain.capacity() }

    pub fn status(&self) -> SessionStatus { self.session.status }

    pub fn undo_chain(&self) -> &UndoChain { &self.session.chain }
}

impl<R> fmt::Debug for GameRepository<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameRepository")
            .field("session", &self.session)
            .field("listeners", &self.listeners.len())
            .field("undo_after_game_over", &self.undo_after_game_over)
            .finish_non_exhaustive()
    }
}
