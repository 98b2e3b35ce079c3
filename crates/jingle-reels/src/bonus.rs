//! Bonus round controller
//!
//! Triggered bonuses wait in a FIFO queue. The player activates the head of
//! the queue, after which the round plays itself through auto-spins. Bonuses
//! triggered during a round stack behind it and the tickets of a whole chain
//! are banked until the last round ends.
//!
//! ```text
//! Idle ──trigger──▶ Ready ──activate──▶ Active ──rounds hit 0──▶ Ready (queue not empty)
//!                                                            └─▶ Idle  (queue empty, tickets paid)
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::symbols::{BonusDefinition, Symbol};
use crate::timing::AutoSpinDelays;

/// A triggered bonus waiting for activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBonus {
    pub symbol: Symbol,
    pub label: String,
    pub rounds: u32,
    pub multiplier: u32,
}

impl From<&BonusDefinition> for PendingBonus {
    fn from(def: &BonusDefinition) -> Self {
        Self {
            symbol: def.symbol.clone(),
            label: def.label.clone(),
            rounds: def.rounds,
            multiplier: def.multiplier,
        }
    }
}

/// Live round state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BonusRoundState {
    pub rounds_left: u32,
    pub multiplier: u32,
    pub active_symbol: Option<Symbol>,
    pub active_label: Option<String>,
    /// Tickets banked across the current chain
    pub bonus_tickets_earned: u64,
    /// The activation spin has not completed yet
    pub first_spin: bool,
}

impl Default for BonusRoundState {
    fn default() -> Self {
        Self {
            rounds_left: 0,
            multiplier: 1,
            active_symbol: None,
            active_label: None,
            bonus_tickets_earned: 0,
            first_spin: false,
        }
    }
}

/// What happened to the round after a spin completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundProgress {
    /// No round playing
    Idle,
    /// Round continues; `first` when the activation spin just finished
    Continue { first: bool, rounds_left: u32 },
    /// Round over, another bonus waits for activation
    RoundOver,
    /// Chain over; banked tickets move to the session total
    ChainComplete { tickets: u64 },
}

/// Result flags of the spin that just completed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpinOutcome {
    pub won: bool,
    pub bonus_triggered: bool,
}

/// Queue plus round state
#[derive(Debug, Clone, Default)]
pub struct BonusController {
    state: BonusRoundState,
    queue: VecDeque<PendingBonus>,
    activation_available: bool,
    chain_in_progress: bool,
    just_ended: bool,
    round_ended: bool,
}

impl BonusController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &BonusRoundState {
        &self.state
    }

    pub fn queue(&self) -> &VecDeque<PendingBonus> {
        &self.queue
    }

    pub fn is_active(&self) -> bool {
        self.state.rounds_left > 0
    }

    /// Round multiplier, 1 outside a round
    pub fn multiplier(&self) -> u32 {
        if self.is_active() {
            self.state.multiplier
        } else {
            1
        }
    }

    pub fn activation_available(&self) -> bool {
        self.activation_available
    }

    pub fn just_ended(&self) -> bool {
        self.just_ended
    }

    /// The last round ended, whether or not more of the chain is queued
    pub fn round_ended(&self) -> bool {
        self.round_ended
    }

    pub fn clear_just_ended(&mut self) {
        self.just_ended = false;
        self.round_ended = false;
    }

    pub fn active_symbol(&self) -> Option<&Symbol> {
        self.state.active_symbol.as_ref().filter(|_| self.is_active())
    }

    /// Queue a triggered bonus. Returns true when it stacked behind a live round.
    pub fn enqueue(&mut self, bonus: PendingBonus) -> bool {
        self.queue.push_back(bonus);
        if self.is_active() {
            true
        } else {
            self.activation_available = true;
            false
        }
    }

    /// Pop the queue head into a live round
    pub fn activate(&mut self) -> Option<PendingBonus> {
        if !self.activation_available || self.is_active() {
            return None;
        }
        let bonus = self.queue.pop_front()?;
        let banked = if self.chain_in_progress {
            self.state.bonus_tickets_earned
        } else {
            0
        };
        self.state = BonusRoundState {
            rounds_left: bonus.rounds,
            multiplier: bonus.multiplier,
            active_symbol: Some(bonus.symbol.clone()),
            active_label: Some(bonus.label.clone()),
            bonus_tickets_earned: banked,
            first_spin: true,
        };
        self.activation_available = false;
        self.chain_in_progress = true;
        self.just_ended = false;
        self.round_ended = false;
        log::info!(
            "Bonus round {} activated: {} rounds at x{}",
            bonus.label,
            bonus.rounds,
            bonus.multiplier
        );
        Some(bonus)
    }

    /// Bank tickets won inside a round
    pub fn credit(&mut self, tickets: u64) {
        self.state.bonus_tickets_earned += tickets;
    }

    /// Advance the round after a completed spin
    pub fn on_spin_complete(&mut self) -> RoundProgress {
        if !self.is_active() {
            return RoundProgress::Idle;
        }
        if self.state.first_spin {
            self.state.first_spin = false;
            return RoundProgress::Continue {
                first: true,
                rounds_left: self.state.rounds_left,
            };
        }

        self.state.rounds_left -= 1;
        if self.state.rounds_left > 0 {
            return RoundProgress::Continue {
                first: false,
                rounds_left: self.state.rounds_left,
            };
        }

        self.round_ended = true;
        if !self.queue.is_empty() {
            self.activation_available = true;
            log::info!("Bonus round over; {} bonus(es) queued", self.queue.len());
            return RoundProgress::RoundOver;
        }

        let tickets = self.state.bonus_tickets_earned;
        self.state = BonusRoundState::default();
        self.chain_in_progress = false;
        self.just_ended = true;
        log::info!("Bonus chain complete: {tickets} tickets");
        RoundProgress::ChainComplete { tickets }
    }

    /// Delay before the next auto-spin
    pub fn auto_spin_delay(first: bool, outcome: SpinOutcome, delays: &AutoSpinDelays) -> u64 {
        if first {
            delays.default_ms
        } else if outcome.bonus_triggered {
            delays.bonus_win_ms
        } else if outcome.won {
            delays.win_ms
        } else {
            delays.default_ms
        }
    }
}
