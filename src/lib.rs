//! Tile World rule engine, Lynx ruleset.
//!
//! `domain` holds the value types (tiles, actors, directions, the packed
//! grid, random sources). `sim` owns a level in play and advances it one
//! tick at a time.

pub mod config;
pub mod domain;
pub mod sim;

pub use domain::dir::{DirMask, Direction};
pub use domain::rng::{LegacyRng, Randomness};
pub use sim::event::{EventSet, GameEvent};
pub use sim::world::{EndCause, Level, LevelData, LevelError, StartConditions};
