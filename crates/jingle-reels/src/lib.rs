//! # jingle-reels — Holiday slot spin engine
//!
//! A single-session slot machine: weighted reel strips, staggered reel stops,
//! row wins, sticky bonus symbols, stacked bonus rounds and a rare instant-win
//! prize. Runs on a virtual clock so hosts, simulators and tests drive time
//! explicitly.
//!
//! ## Architecture
//!
//! ```text
//! SpinEngine
//!     │
//!     ├── StripBuilder (weights, hot symbol, removals, omen, prize pooling)
//!     ├── TimerQueue   (reel ticks, stops, evaluation, auto-spins)
//!     ├── detect       (row wins, bonus matches, instant-win cell)
//!     ├── StickyTracker / BonusController
//!     └── Reconciler ──▶ SessionReporter (host callbacks)
//!           │
//!           v
//!     Vec<StageEvent> → presentation / audio
//! ```

pub mod bonus;
pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod grid;
pub mod instant_win;
pub mod modifiers;
pub mod reconcile;
pub mod reels;
pub mod rng;
pub mod sticky;
pub mod strip;
pub mod symbols;
pub mod timing;

pub use bonus::*;
pub use config::*;
pub use detect::*;
pub use engine::*;
pub use error::*;
pub use grid::*;
pub use instant_win::*;
pub use modifiers::*;
pub use reconcile::*;
pub use reels::*;
pub use rng::*;
pub use sticky::*;
pub use strip::*;
pub use symbols::*;
pub use timing::*;

pub use jingle_stage::{Stage, StageEvent, StageTrace};
