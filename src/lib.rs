//! tiles-2048: a sliding-tile game engine with lives, bounded undo and saves
//!
//! This crate provides:
//! - An immutable `GridState` for any `width x height` grid (`shift`, `has_any_legal_move`, `with_random_tile`, ...)
//! - A bounded undo chain (`history` module)
//! - `GameRepository`, the play-session state machine that ties moves, spawns, lives and undo together
//! - Snapshots as camelCase JSON or a checksummed binary container (`serialization`, `saves`)
//!
//! Quick start:
//! ```
//! use tiles_2048::config::GameConfig;
//! use tiles_2048::engine::Direction;
//! use tiles_2048::events::Notification;
//! use tiles_2048::repository::GameRepository;
//!
//! let mut game = GameRepository::with_seed(&GameConfig::classic(), 42).unwrap();
//! game.subscribe(|n: &Notification| {
//!     if let Notification::GameOver { score, .. } = n {
//!         println!("final score {score}");
//!     }
//! });
//! for direction in Direction::ALL {
//!     let _ = game.move_grid(direction);
//! }
//! let snapshot = game.serialize();
//! let json = snapshot.to_json().unwrap();
//! assert!(json.contains("\"undoChain\""));
//! ```
//!
//! Randomness is always injected: pass a seeded RNG (or use `with_seed`) when
//! you need reproducible sessions.

pub mod config;
pub mod engine;
pub mod events;
pub mod history;
pub mod repository;
pub mod saves;
pub mod serialization;

pub use config::GameConfig;
pub use engine::{Direction, GridState};
pub use repository::{GameRepository, MoveResult};
