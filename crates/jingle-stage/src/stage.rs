//! Stage — The canonical moments of a spin session
//!
//! A Stage is NOT an animation and NOT an engine timer.
//! A Stage is the SEMANTIC MEANING of a moment in the session flow.

use serde::{Deserialize, Serialize};

/// Canonical session stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Stage {
    // ═══════════════════════════════════════════════════════════════════════
    // SPIN LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════
    /// Reels started moving
    SpinStart {
        /// Started by the bonus controller rather than the player
        #[serde(default)]
        auto: bool,
        /// Symbol receiving boosted weight this spin
        #[serde(default)]
        hot_symbol: Option<String>,
        /// Symbol removed from the strip this spin
        #[serde(default)]
        removed_symbol: Option<String>,
    },

    /// Reel has stopped, showing final symbols
    ReelStop {
        /// Which reel stopped (0-indexed)
        reel_index: u8,
        /// Symbols on this reel (top to bottom)
        #[serde(default)]
        symbols: Vec<String>,
        /// Rows on this reel holding a bonus symbol
        #[serde(default)]
        bonus_rows: Vec<u8>,
    },

    /// All reels stopped, grid being evaluated
    EvaluateWins,

    /// Spin fully settled
    SpinEnd,

    // ═══════════════════════════════════════════════════════════════════════
    // WINS
    // ═══════════════════════════════════════════════════════════════════════
    /// A full row of identical symbols
    RowWin {
        row_index: u8,
        symbol: String,
        /// Base tickets for this row (before bonus multiplier)
        tickets: u64,
    },

    /// Win celebration for the whole spin
    WinPresent {
        total_tickets: u64,
        base_tickets: u64,
        multiplier: u32,
        row_count: u8,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // STICKY SYMBOLS
    // ═══════════════════════════════════════════════════════════════════════
    /// A bonus symbol froze in place
    StickyFreeze {
        reel_index: u8,
        row_index: u8,
        symbol: String,
        /// Spins the symbol stays frozen
        lifetime: u8,
    },

    /// A frozen cell thawed
    StickyExpire { reel_index: u8, row_index: u8 },

    // ═══════════════════════════════════════════════════════════════════════
    // BONUS ROUNDS
    // ═══════════════════════════════════════════════════════════════════════
    /// Bonus threshold met on the grid
    BonusTriggered {
        symbol: String,
        label: String,
        /// Stacked behind an active round
        #[serde(default)]
        queued: bool,
    },

    /// Bonus round activated
    BonusEnter {
        symbol: String,
        label: String,
        rounds: u32,
        multiplier: u32,
    },

    /// Bonus round advanced by one spin
    BonusStep { rounds_left: u32 },

    /// Bonus chain finished, banked tickets moved to the session total
    BonusExit { total_tickets: u64 },

    /// Next automatic spin queued
    AutoSpinScheduled { delay_ms: u64 },

    // ═══════════════════════════════════════════════════════════════════════
    // INSTANT WIN
    // ═══════════════════════════════════════════════════════════════════════
    /// Reserved prize symbol landed
    InstantWin {
        prize_id: String,
        prize_name: String,
        reel_index: u8,
        row_index: u8,
    },

    /// Prize reveal should open
    InstantWinReveal { prize_id: String },
}

/// Stage category for grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageCategory {
    SpinLifecycle,
    WinLifecycle,
    Sticky,
    Bonus,
    InstantWin,
}

impl Stage {
    /// Get the category of this stage
    pub fn category(&self) -> StageCategory {
        match self {
            Stage::SpinStart { .. }
            | Stage::ReelStop { .. }
            | Stage::EvaluateWins
            | Stage::SpinEnd => StageCategory::SpinLifecycle,

            Stage::RowWin { .. } | Stage::WinPresent { .. } => StageCategory::WinLifecycle,

            Stage::StickyFreeze { .. } | Stage::StickyExpire { .. } => StageCategory::Sticky,

            Stage::BonusTriggered { .. }
            | Stage::BonusEnter { .. }
            | Stage::BonusStep { .. }
            | Stage::BonusExit { .. }
            | Stage::AutoSpinScheduled { .. } => StageCategory::Bonus,

            Stage::InstantWin { .. } | Stage::InstantWinReveal { .. } => StageCategory::InstantWin,
        }
    }

    /// Get a simple string name for this stage type
    pub fn type_name(&self) -> &'static str {
        match self {
            Stage::SpinStart { .. } => "spin_start",
            Stage::ReelStop { .. } => "reel_stop",
            Stage::EvaluateWins => "evaluate_wins",
            Stage::SpinEnd => "spin_end",
            Stage::RowWin { .. } => "row_win",
            Stage::WinPresent { .. } => "win_present",
            Stage::StickyFreeze { .. } => "sticky_freeze",
            Stage::StickyExpire { .. } => "sticky_expire",
            Stage::BonusTriggered { .. } => "bonus_triggered",
            Stage::BonusEnter { .. } => "bonus_enter",
            Stage::BonusStep { .. } => "bonus_step",
            Stage::BonusExit { .. } => "bonus_exit",
            Stage::AutoSpinScheduled { .. } => "auto_spin_scheduled",
            Stage::InstantWin { .. } => "instant_win",
            Stage::InstantWinReveal { .. } => "instant_win_reveal",
        }
    }

    /// Stages that warrant a celebration cue
    pub fn is_celebration(&self) -> bool {
        matches!(
            self,
            Stage::WinPresent { .. }
                | Stage::BonusTriggered { .. }
                | Stage::StickyFreeze { .. }
                | Stage::InstantWin { .. }
        )
    }
}
