//! # jingle-stage — Stage System for the Jingle reels
//!
//! Defines the canonical moments a spin session passes through. The
//! presentation layer (reel rendering, sound cues, modals) reacts to stages,
//! never to the engine's internal timers.
//!
//! ## Flow
//!
//! ```text
//! SpinStart → ReelStop ×N → EvaluateWins → RowWin / BonusTriggered / StickyFreeze
//!           → WinPresent → SpinEnd
//!
//! BonusEnter → (auto spins) → BonusExit
//! InstantWin → InstantWinReveal
//! ```

pub mod event;
pub mod stage;
pub mod trace;

pub use event::*;
pub use stage::*;
pub use trace::*;
