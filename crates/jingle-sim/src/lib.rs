//! # jingle-sim — Batch simulator for Jingle reels
//!
//! Plays many independent sessions on virtual time, in parallel, the way an
//! autoplaying player would: spin until the spins run out, activate every
//! bonus, dismiss every instant-win reveal. Each session is checked for
//! reporting drift before its statistics are accepted.
//!
//! ```text
//! SimConfig ──▶ rayon (session i, seed + i) ──▶ SessionReport ×N ──▶ SimReport
//! ```

use std::sync::Arc;

use jingle_reels::{
    CommandError, ConfigError, EngineConfig, PrizeRecord, RecordingReporter, SpinEngine,
};
use jingle_stage::{Stage, StageTrace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Virtual time one settle call may run before control returns
const SETTLE_LIMIT_MS: u64 = 3_600_000;

// ═══════════════════════════════════════════════════════════════════════════
// CONFIG & ERRORS
// ═══════════════════════════════════════════════════════════════════════════

/// Batch parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub sessions: usize,
    pub spins_per_session: u32,
    /// Session `i` is seeded with `seed + i`
    pub seed: u64,
    /// Synthetic instant-win prizes per session
    pub prizes_per_session: usize,
    pub engine: EngineConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            sessions: 100,
            spins_per_session: 50,
            seed: 1,
            prizes_per_session: 3,
            engine: EngineConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("no sessions requested")]
    NoSessions,

    #[error("invalid engine config: {0}")]
    Config(#[from] ConfigError),

    #[error("session {session}: command rejected: {source}")]
    Command {
        session: usize,
        source: CommandError,
    },

    #[error("session {session}: reported {reported} tickets but earned {earned}")]
    TicketDrift {
        session: usize,
        reported: u64,
        earned: u64,
    },

    #[error("session {session}: reported {reported} spins consumed of {granted}")]
    SpinDrift {
        session: usize,
        reported: u32,
        granted: u32,
    },

    #[error("runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

// ═══════════════════════════════════════════════════════════════════════════
// REPORTS
// ═══════════════════════════════════════════════════════════════════════════

/// Outcome of one simulated session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub index: usize,
    pub seed: u64,
    pub player_spins: u32,
    /// Bonus-round spins, activation spins included
    pub auto_spins: u64,
    pub winning_spins: u64,
    pub tickets_earned: u64,
    pub max_spin_tickets: u64,
    pub bonuses_triggered: u64,
    pub stacked_bonuses: u64,
    pub bonus_rounds: u64,
    pub sticky_freezes: u64,
    pub instant_wins: u64,
    pub virtual_ms: u64,
}

impl SessionReport {
    fn from_trace(index: usize, seed: u64, trace: &StageTrace) -> Self {
        let mut report = Self {
            index,
            seed,
            winning_spins: trace.count("win_present") as u64,
            bonuses_triggered: trace.count("bonus_triggered") as u64,
            bonus_rounds: trace.count("bonus_enter") as u64,
            sticky_freezes: trace.count("sticky_freeze") as u64,
            instant_wins: trace.count("instant_win") as u64,
            ..Self::default()
        };
        for event in &trace.events {
            match &event.stage {
                Stage::SpinStart { auto: true, .. } => report.auto_spins += 1,
                Stage::BonusTriggered { queued: true, .. } => report.stacked_bonuses += 1,
                Stage::WinPresent { total_tickets, .. } => {
                    report.max_spin_tickets = report.max_spin_tickets.max(*total_tickets);
                }
                _ => {}
            }
        }
        report
    }

    pub fn total_spins(&self) -> u64 {
        u64::from(self.player_spins) + self.auto_spins
    }
}

/// Aggregate over a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimReport {
    pub sessions: usize,
    pub player_spins: u64,
    pub auto_spins: u64,
    pub winning_spins: u64,
    pub total_tickets: u64,
    pub max_session_tickets: u64,
    pub max_spin_tickets: u64,
    pub bonuses_triggered: u64,
    pub stacked_bonuses: u64,
    pub bonus_rounds: u64,
    pub sticky_freezes: u64,
    pub instant_wins: u64,
    pub session_reports: Vec<SessionReport>,
}

impl SimReport {
    pub fn from_sessions(session_reports: Vec<SessionReport>) -> Self {
        let mut report = Self {
            sessions: session_reports.len(),
            ..Self::default()
        };
        for session in &session_reports {
            report.player_spins += u64::from(session.player_spins);
            report.auto_spins += session.auto_spins;
            report.winning_spins += session.winning_spins;
            report.total_tickets += session.tickets_earned;
            report.max_session_tickets = report.max_session_tickets.max(session.tickets_earned);
            report.max_spin_tickets = report.max_spin_tickets.max(session.max_spin_tickets);
            report.bonuses_triggered += session.bonuses_triggered;
            report.stacked_bonuses += session.stacked_bonuses;
            report.bonus_rounds += session.bonus_rounds;
            report.sticky_freezes += session.sticky_freezes;
            report.instant_wins += session.instant_wins;
        }
        report.session_reports = session_reports;
        report
    }

    pub fn total_spins(&self) -> u64 {
        self.player_spins + self.auto_spins
    }

    /// Tickets per player spin
    pub fn tickets_per_spin(&self) -> f64 {
        ratio(self.total_tickets, self.player_spins)
    }

    /// Percentage of spins (auto included) that paid a row
    pub fn hit_rate(&self) -> f64 {
        ratio(self.winning_spins, self.total_spins()) * 100.0
    }

    /// Bonus triggers per 100 player spins
    pub fn bonus_rate(&self) -> f64 {
        ratio(self.bonuses_triggered, self.player_spins) * 100.0
    }

    pub fn mean_session_tickets(&self) -> f64 {
        ratio(self.total_tickets, self.sessions as u64)
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator > 0 {
        numerator as f64 / denominator as f64
    } else {
        0.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RUNNER
// ═══════════════════════════════════════════════════════════════════════════

/// Synthetic catalog for one session
pub fn prize_catalog(session: usize, count: usize) -> Vec<PrizeRecord> {
    (0..count)
        .map(|i| {
            PrizeRecord::new(format!("s{session}-p{i}"), format!("Prize {}", i + 1))
                .with_value(((i + 1) * 10) as i64)
        })
        .collect()
}

/// Play one session to exhaustion
pub fn run_session(config: &SimConfig, index: usize) -> Result<SessionReport, SimError> {
    let seed = config.seed.wrapping_add(index as u64);
    let recorder = RecordingReporter::new();
    let mut engine = SpinEngine::builder()
        .config(config.engine.clone())
        .initial_spins(config.spins_per_session)
        .prizes(prize_catalog(index, config.prizes_per_session))
        .reporter(Arc::new(recorder.clone()))
        .seed(seed)
        .build()?;
    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    let mut trace = StageTrace::new().with_session(format!("session-{index}"));
    let rejected = |source: CommandError| SimError::Command {
        session: index,
        source,
    };

    loop {
        if engine.instant_win().is_some() {
            engine.dismiss_instant_win().map_err(rejected)?;
        } else {
            match engine.spin() {
                Ok(_) => {}
                Err(CommandError::NoSpinsLeft) => break,
                Err(err) => return Err(rejected(err)),
            }
        }
        engine.settle(SETTLE_LIMIT_MS);
        trace.extend(engine.drain_stages());
        runtime.block_on(engine.flush_reports());
    }
    runtime.block_on(engine.flush_reports());

    let reported = recorder.total_tickets();
    if reported != engine.tickets_earned() {
        return Err(SimError::TicketDrift {
            session: index,
            reported,
            earned: engine.tickets_earned(),
        });
    }
    let consumed = recorder.total_spins_consumed();
    if consumed != config.spins_per_session {
        return Err(SimError::SpinDrift {
            session: index,
            reported: consumed,
            granted: config.spins_per_session,
        });
    }

    let mut report = SessionReport::from_trace(index, seed, &trace);
    report.player_spins = consumed;
    report.tickets_earned = engine.tickets_earned();
    report.virtual_ms = engine.now_ms();
    engine.dispose();

    log::debug!(
        "Session {index} done: {} tickets over {} spins",
        report.tickets_earned,
        report.total_spins()
    );
    Ok(report)
}

/// Run every session in parallel
pub fn simulate(config: &SimConfig) -> Result<SimReport, SimError> {
    if config.sessions == 0 {
        return Err(SimError::NoSessions);
    }
    config.engine.validate()?;

    log::info!(
        "Simulating {} sessions x {} spins (seed {})",
        config.sessions,
        config.spins_per_session,
        config.seed
    );
    let sessions = (0..config.sessions)
        .into_par_iter()
        .map(|index| run_session(config, index))
        .collect::<Result<Vec<_>, _>>()?;

    let report = SimReport::from_sessions(sessions);
    log::info!(
        "Simulation done: {} tickets, hit rate {:.2}%",
        report.total_tickets,
        report.hit_rate()
    );
    Ok(report)
}
