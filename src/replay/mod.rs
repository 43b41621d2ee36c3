//! Game state replay
//!
//! Walks a game's events in file order and derives a context row for each
//! one: score, runs, lead changes, possessions, momentum, bonus and timeouts.

mod engine;
mod state;
mod types;

pub use engine::{GameReplay, replay_game};
pub use state::{GameRunningState, MomentumWindow, PeriodFouls};
pub use types::DerivedEvent;
