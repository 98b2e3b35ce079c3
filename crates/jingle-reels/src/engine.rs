//! SpinEngine — one play session
//!
//! The engine owns every piece of session state and runs on a virtual clock.
//! Commands start work; [`SpinEngine::advance_to`] fires due timers through a
//! single dispatch point. After every command and timer the reconciler
//! reports spin and ticket deltas to the host.
//!
//! ```text
//! spin() ──▶ Spinning ──ReelStop × N──▶ Evaluating ──Evaluate──▶ Idle
//!                                                        │
//!                             bonus round active ◀───────┘ AutoSpin
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use jingle_stage::{Stage, StageEvent};
use serde::Serialize;

use crate::bonus::{BonusController, BonusRoundState, PendingBonus, RoundProgress, SpinOutcome};
use crate::config::EngineConfig;
use crate::detect::{self, WinningRow};
use crate::error::{CommandError, ConfigError};
use crate::grid::{CellId, Grid};
use crate::instant_win::{PooledPrize, PrizePool, PrizeRecord, PrizeUpdate};
use crate::modifiers::{ModifierRolls, SpinModifiers};
use crate::reconcile::{NullReporter, Reconciler, SessionReporter};
use crate::reels::{self, ReelSet};
use crate::rng::SpinRng;
use crate::sticky::{StickyCell, StickyTracker};
use crate::strip::{ReelStrip, StripBuilder, StripRequest};
use crate::symbols::Symbol;
use crate::timing::{TimerKind, TimerQueue};

/// Engine lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    Idle,
    Spinning,
    Evaluating,
    Disposed,
}

/// Most recent winning spin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastWinSummary {
    pub total_tickets: u64,
    pub base_tickets: u64,
    pub rows: Vec<WinningRow>,
    pub bonus_triggered: Option<Symbol>,
    pub bonus_multiplier: u32,
    /// Credit de-duplication key
    pub spin_id: u64,
}

impl Default for LastWinSummary {
    fn default() -> Self {
        Self {
            total_tickets: 0,
            base_tickets: 0,
            rows: Vec::new(),
            bonus_triggered: None,
            bonus_multiplier: 1,
            spin_id: 0,
        }
    }
}

/// A won prize waiting for the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstantWinState {
    pub prize: PrizeRecord,
    pub cell: CellId,
    /// Reveal delay elapsed
    pub reveal_open: bool,
}

/// Rigged outcome for the next spin (demos and tests)
#[derive(Debug, Clone, PartialEq)]
pub struct ForcedSpin {
    pub grid: Grid,
    /// Pool this prize instead of rolling for one
    pub instant_win_prize: Option<String>,
}

impl ForcedSpin {
    pub fn grid(grid: Grid) -> Self {
        Self {
            grid,
            instant_win_prize: None,
        }
    }

    pub fn with_instant_win(mut self, prize_id: impl Into<String>) -> Self {
        self.instant_win_prize = Some(prize_id.into());
        self
    }
}

/// Read-only view for rendering
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub phase: EnginePhase,
    pub now_ms: u64,
    pub grid: Grid,
    pub reel_positions: Vec<usize>,
    pub stopped_reels: Vec<bool>,
    pub bonus_reels: Vec<bool>,
    pub winning_cells: BTreeSet<CellId>,
    pub bonus_cells: BTreeSet<CellId>,
    pub sticky_cells: Vec<StickyCell>,
    pub spins_left: u32,
    pub tickets_earned: u64,
    pub bonus_round: BonusRoundState,
    pub pending_bonuses: Vec<PendingBonus>,
    pub activation_available: bool,
    pub bonus_just_ended: bool,
    pub bonus_round_ended: bool,
    pub last_win: LastWinSummary,
    pub hot_symbol: Option<Symbol>,
    pub removal_symbol: Option<Symbol>,
    pub instant_win: Option<InstantWinState>,
    pub can_spin: bool,
}

// ═══════════════════════════════════════════════════════════════════════════
// BUILDER
// ═══════════════════════════════════════════════════════════════════════════

/// Session construction options
pub struct SpinEngineBuilder {
    config: EngineConfig,
    initial_spins: u32,
    prizes: Vec<PrizeRecord>,
    reporter: Option<Arc<dyn SessionReporter>>,
    seed: Option<u64>,
}

impl SpinEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn initial_spins(mut self, spins: u32) -> Self {
        self.initial_spins = spins;
        self
    }

    pub fn prizes(mut self, prizes: Vec<PrizeRecord>) -> Self {
        self.prizes = prizes;
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn SessionReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Deterministic session
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<SpinEngine, ConfigError> {
        self.config.validate()?;

        let mut rng = self.seed.map_or_else(SpinRng::from_entropy, SpinRng::seeded);
        let strip = StripBuilder::new(&self.config.table)
            .with_omen_chance(self.config.probabilities.omen)
            .with_shuffles(self.config.strip_shuffles)
            .build(&StripRequest::default(), &mut rng);
        let positions = (0..self.config.grid.reels)
            .map(|_| rng.index(strip.len()))
            .collect();

        let reporter = self
            .reporter
            .unwrap_or_else(|| Arc::new(NullReporter) as Arc<dyn SessionReporter>);
        let prizes = PrizePool::new(self.prizes, self.config.instant_win_default_weight);

        log::info!(
            "Spin engine ready: {} spins, {} prizes, seed {:?}",
            self.initial_spins,
            prizes.len(),
            rng.seed()
        );

        Ok(SpinEngine {
            rng,
            timers: TimerQueue::new(),
            phase: EnginePhase::Idle,
            strip,
            reels: ReelSet::at_rest(positions),
            spin_seq: 0,
            modifiers: SpinModifiers::default(),
            pooled_prize: None,
            forced: None,
            prizes,
            sticky: StickyTracker::new(),
            bonus: BonusController::new(),
            spins_left: self.initial_spins,
            tickets_earned: 0,
            winning_cells: BTreeSet::new(),
            bonus_cells: BTreeSet::new(),
            last_win: LastWinSummary::default(),
            last_win_id: 0,
            last_credited_win: 0,
            instant_win: None,
            deferred_auto_spin: None,
            reconciler: Reconciler::new(reporter, self.initial_spins, 0),
            stages: Vec::new(),
            config: self.config,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════

/// One play session
#[derive(Debug)]
pub struct SpinEngine {
    config: EngineConfig,
    rng: SpinRng,
    timers: TimerQueue,
    phase: EnginePhase,

    strip: ReelStrip,
    reels: ReelSet,
    spin_seq: u64,
    modifiers: SpinModifiers,
    pooled_prize: Option<PooledPrize>,
    forced: Option<ForcedSpin>,

    prizes: PrizePool,
    sticky: StickyTracker,
    bonus: BonusController,

    spins_left: u32,
    tickets_earned: u64,
    winning_cells: BTreeSet<CellId>,
    bonus_cells: BTreeSet<CellId>,
    last_win: LastWinSummary,
    last_win_id: u64,
    last_credited_win: u64,

    instant_win: Option<InstantWinState>,
    deferred_auto_spin: Option<u64>,

    reconciler: Reconciler,
    stages: Vec<StageEvent>,
}

impl SpinEngine {
    pub fn builder() -> SpinEngineBuilder {
        SpinEngineBuilder {
            config: EngineConfig::default(),
            initial_spins: 0,
            prizes: Vec::new(),
            reporter: None,
            seed: None,
        }
    }

    // ─── Commands ───────────────────────────────────────────────────────────

    /// Start a player spin. Activates the pending bonus instead when one is ready.
    pub fn spin(&mut self) -> Result<u64, CommandError> {
        self.ensure_ready()?;
        if self.bonus.activation_available() {
            return self.activate_pending_bonus();
        }
        if self.bonus.is_active() {
            return Err(CommandError::BonusRoundActive);
        }
        if self.spins_left == 0 {
            return Err(CommandError::NoSpinsLeft);
        }

        self.spins_left -= 1;
        self.last_win = LastWinSummary::default();
        self.bonus.clear_just_ended();
        self.start_spin(false);
        self.reconcile();
        Ok(self.spin_seq)
    }

    /// Start the round at the head of the bonus queue
    pub fn activate_pending_bonus(&mut self) -> Result<u64, CommandError> {
        self.ensure_ready()?;
        if self.bonus.is_active() {
            return Err(CommandError::BonusRoundActive);
        }
        let Some(bonus) = self.bonus.activate() else {
            return Err(CommandError::NothingToActivate);
        };

        self.sticky.reset();
        self.emit(Stage::BonusEnter {
            symbol: bonus.symbol.to_string(),
            label: bonus.label,
            rounds: bonus.rounds,
            multiplier: bonus.multiplier,
        });
        self.start_spin(true);
        self.reconcile();
        Ok(self.spin_seq)
    }

    /// Close the instant-win reveal and resume a deferred auto-spin
    pub fn dismiss_instant_win(&mut self) -> Result<PrizeRecord, CommandError> {
        if self.phase == EnginePhase::Disposed {
            return Err(CommandError::Disposed);
        }
        let Some(state) = self.instant_win.take() else {
            return Err(CommandError::NoInstantWin);
        };
        self.timers
            .cancel_where(|k| *k == TimerKind::InstantWinReveal);
        if let Some(delay) = self.deferred_auto_spin.take() {
            self.schedule_auto_spin(delay);
        }
        log::debug!("Instant win {} dismissed", state.prize.id);
        self.reconcile();
        Ok(state.prize)
    }

    /// Apply a live prize catalog change
    pub fn update_prizes(&mut self, update: PrizeUpdate) {
        if self.phase == EnginePhase::Disposed {
            return;
        }
        self.prizes.apply(update);
    }

    /// Rig the next spin (player, activation or auto)
    pub fn force_next_spin(&mut self, forced: ForcedSpin) -> Result<(), CommandError> {
        if self.phase == EnginePhase::Disposed {
            return Err(CommandError::Disposed);
        }
        self.forced = Some(forced);
        Ok(())
    }

    /// Advance the virtual clock by `ms`
    pub fn advance_by(&mut self, ms: u64) {
        self.advance_to(self.timers.now().saturating_add(ms));
    }

    /// Fire every timer due at or before `target_ms`
    pub fn advance_to(&mut self, target_ms: u64) {
        if self.phase == EnginePhase::Disposed {
            return;
        }
        while let Some((_, kind)) = self.timers.pop_due(target_ms) {
            self.dispatch(kind);
            self.reconcile();
        }
        self.timers.finish(target_ms);
    }

    /// Run spins and bonus rounds until nothing is left to play or `limit_ms`
    /// elapses. Returns the virtual time spent.
    pub fn settle(&mut self, limit_ms: u64) -> u64 {
        let start = self.timers.now();
        let deadline = start.saturating_add(limit_ms);
        while let Some(due) = self.timers.next_due_where(|k| k.drives_play()) {
            if due > deadline {
                break;
            }
            self.advance_to(due);
        }
        self.timers.now() - start
    }

    /// Stop the session. Every timer is dropped and later commands are inert.
    pub fn dispose(&mut self) {
        if self.phase == EnginePhase::Disposed {
            return;
        }
        self.timers.clear();
        self.deferred_auto_spin = None;
        self.phase = EnginePhase::Disposed;
        log::info!(
            "Spin engine disposed after {} spins, {} tickets",
            self.spin_seq,
            self.tickets_earned
        );
    }

    /// Take the stage events emitted since the last drain
    pub fn drain_stages(&mut self) -> Vec<StageEvent> {
        std::mem::take(&mut self.stages)
    }

    /// Take pending report futures for the host to drive
    pub fn take_reports(&mut self) -> Vec<BoxFuture<'static, ()>> {
        self.reconciler.take()
    }

    /// Drive pending reports to completion
    pub async fn flush_reports(&mut self) {
        self.reconciler.flush().await;
    }

    // ─── Read surface ───────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn now_ms(&self) -> u64 {
        self.timers.now()
    }

    pub fn spin_seq(&self) -> u64 {
        self.spin_seq
    }

    pub fn spins_left(&self) -> u32 {
        self.spins_left
    }

    pub fn tickets_earned(&self) -> u64 {
        self.tickets_earned
    }

    pub fn strip(&self) -> &ReelStrip {
        &self.strip
    }

    /// Visible grid at the current reel positions
    pub fn grid(&self) -> Grid {
        Grid::from_strip(&self.strip, self.reels.positions(), self.config.grid.rows)
    }

    pub fn reel_positions(&self) -> &[usize] {
        self.reels.positions()
    }

    pub fn stopped_reels(&self) -> &[bool] {
        self.reels.stopped()
    }

    pub fn bonus_reels(&self) -> &[bool] {
        self.reels.bonus_reels()
    }

    pub fn winning_cells(&self) -> &BTreeSet<CellId> {
        &self.winning_cells
    }

    pub fn bonus_cells(&self) -> &BTreeSet<CellId> {
        &self.bonus_cells
    }

    /// Active sticky cells; hidden while a bonus round plays
    pub fn sticky_cells(&self) -> Vec<StickyCell> {
        if self.bonus.is_active() {
            return Vec::new();
        }
        self.sticky.active().cloned().collect()
    }

    pub fn bonus_round(&self) -> &BonusRoundState {
        self.bonus.state()
    }

    pub fn pending_bonuses(&self) -> Vec<PendingBonus> {
        self.bonus.queue().iter().cloned().collect()
    }

    pub fn activation_available(&self) -> bool {
        self.bonus.activation_available()
    }

    pub fn bonus_just_ended(&self) -> bool {
        self.bonus.just_ended()
    }

    /// A round ended, including one with more of its chain still queued
    pub fn bonus_round_ended(&self) -> bool {
        self.bonus.round_ended()
    }

    pub fn last_win(&self) -> &LastWinSummary {
        &self.last_win
    }

    pub fn hot_symbol(&self) -> Option<&Symbol> {
        self.modifiers.hot_symbol.as_ref()
    }

    pub fn removal_symbol(&self) -> Option<&Symbol> {
        self.modifiers.forced_removal.as_ref()
    }

    pub fn instant_win(&self) -> Option<&InstantWinState> {
        self.instant_win.as_ref()
    }

    pub fn prizes(&self) -> &PrizePool {
        &self.prizes
    }

    pub fn pending_reports(&self) -> usize {
        self.reconciler.pending()
    }

    /// Whether `spin()` would be accepted
    pub fn can_spin(&self) -> bool {
        self.ensure_ready().is_ok()
            && (self.bonus.activation_available()
                || (!self.bonus.is_active() && self.spins_left > 0))
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            phase: self.phase,
            now_ms: self.now_ms(),
            grid: self.grid(),
            reel_positions: self.reels.positions().to_vec(),
            stopped_reels: self.reels.stopped().to_vec(),
            bonus_reels: self.reels.bonus_reels().to_vec(),
            winning_cells: self.winning_cells.clone(),
            bonus_cells: self.bonus_cells.clone(),
            sticky_cells: self.sticky_cells(),
            spins_left: self.spins_left,
            tickets_earned: self.tickets_earned,
            bonus_round: self.bonus.state().clone(),
            pending_bonuses: self.pending_bonuses(),
            activation_available: self.bonus.activation_available(),
            bonus_just_ended: self.bonus.just_ended(),
            bonus_round_ended: self.bonus.round_ended(),
            last_win: self.last_win.clone(),
            hot_symbol: self.modifiers.hot_symbol.clone(),
            removal_symbol: self.modifiers.forced_removal.clone(),
            instant_win: self.instant_win.clone(),
            can_spin: self.can_spin(),
        }
    }

    // ─── Spin lifecycle ─────────────────────────────────────────────────────

    fn ensure_ready(&self) -> Result<(), CommandError> {
        match self.phase {
            EnginePhase::Disposed => Err(CommandError::Disposed),
            EnginePhase::Spinning | EnginePhase::Evaluating => Err(CommandError::SpinInFlight),
            EnginePhase::Idle if self.instant_win.is_some() => Err(CommandError::InstantWinPending),
            EnginePhase::Idle => Ok(()),
        }
    }

    fn start_spin(&mut self, auto: bool) {
        self.timers.cancel_where(|k| k.drives_play());
        self.spin_seq += 1;
        self.phase = EnginePhase::Spinning;
        self.winning_cells.clear();
        self.bonus_cells.clear();

        let forced = self
            .forced
            .take()
            .filter(|f| self.fits_grid(&f.grid));

        // Instant-win pooling resolves before the modifier rolls
        self.pooled_prize = match &forced {
            Some(f) => f
                .instant_win_prize
                .as_deref()
                .and_then(|id| self.prizes.pool_by_id(id)),
            None => self
                .prizes
                .draw(self.config.probabilities.instant_win, &mut self.rng),
        };

        let suppressed: Vec<Symbol> = self
            .bonus
            .active_symbol()
            .and_then(|symbol| self.config.table.bonus(symbol))
            .map(|def| def.remove_symbols.clone())
            .unwrap_or_default();
        let held = self.sticky.held_symbols();

        self.modifiers = ModifierRolls {
            table: &self.config.table,
            hot_chance: self.config.probabilities.hot_symbol,
            removal_chance: self.config.probabilities.forced_removal,
            suppressed: &suppressed,
            sticky_held: &held,
            min_distinct_after_removal: self.config.min_distinct_after_removal,
        }
        .roll(&mut self.rng);

        let request = StripRequest {
            hot_symbol: self.modifiers.hot_symbol.clone(),
            suppressed,
            forced_removal: self.modifiers.forced_removal.clone(),
            instant_win_weight: self.pooled_prize.as_ref().map(|p| p.weight),
        };
        self.strip = StripBuilder::new(&self.config.table)
            .with_omen_chance(self.config.probabilities.omen)
            .with_shuffles(self.config.strip_shuffles)
            .build(&request, &mut self.rng);

        let stops = match forced {
            Some(f) => self.rig_strip(&f.grid),
            None => reels::compute_stop_positions(
                &self.strip,
                self.config.grid,
                Some(&self.sticky),
                &mut self.rng,
            ),
        };
        self.reels.begin(stops);

        for reel in 0..self.config.grid.reels {
            self.timers.schedule_repeating(
                self.config.timing.spin_speed_ms,
                TimerKind::ReelTick { reel },
            );
            self.timers
                .schedule(self.config.timing.stop_delay(reel), TimerKind::ReelStop { reel });
        }

        log::debug!(
            "Spin {} started (auto: {auto}, strip: {}, hot: {:?}, removed: {:?}, prize pooled: {})",
            self.spin_seq,
            self.strip.len(),
            self.modifiers.hot_symbol,
            self.modifiers.forced_removal,
            self.pooled_prize.is_some()
        );
        self.emit(Stage::SpinStart {
            auto,
            hot_symbol: self.modifiers.hot_symbol.as_ref().map(Symbol::to_string),
            removed_symbol: self.modifiers.forced_removal.as_ref().map(Symbol::to_string),
        });
    }

    fn fits_grid(&self, grid: &Grid) -> bool {
        let fits = grid.reels().len() == usize::from(self.config.grid.reels)
            && grid
                .reels()
                .iter()
                .all(|reel| reel.len() == usize::from(self.config.grid.rows));
        if !fits {
            log::warn!("Forced grid does not match the configured grid; ignored");
        }
        fits
    }

    /// Append the forced columns to the strip and stop each reel on its column
    fn rig_strip(&mut self, grid: &Grid) -> Vec<usize> {
        let mut stops = Vec::with_capacity(grid.reel_count() as usize);
        for column in grid.reels() {
            stops.push(self.strip.len());
            self.strip.append(column.iter().cloned());
        }
        stops
    }

    fn dispatch(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::ReelTick { reel } => self.reels.tick(reel, self.strip.len()),
            TimerKind::ReelStop { reel } => self.stop_reel(reel),
            TimerKind::Evaluate => self.evaluate(),
            TimerKind::AutoSpin => self.auto_spin(),
            TimerKind::InstantWinReveal => self.open_instant_win_reveal(),
        }
    }

    fn stop_reel(&mut self, reel: u8) {
        if self.phase != EnginePhase::Spinning {
            return;
        }
        self.timers
            .cancel_where(|k| *k == TimerKind::ReelTick { reel });
        if !self.reels.stop(reel) {
            return;
        }

        let grid = self.grid();
        let bonus_rows = detect::bonus_rows_in_reel(&grid, reel, &self.config.table);
        if !bonus_rows.is_empty() {
            self.reels.mark_bonus_reel(reel);
            self.bonus_cells
                .extend(bonus_rows.iter().map(|&row| CellId::new(reel, row)));
        }
        self.emit(Stage::ReelStop {
            reel_index: reel,
            symbols: grid.reel(reel).iter().map(Symbol::to_string).collect(),
            bonus_rows,
        });

        if self.reels.all_stopped() {
            self.phase = EnginePhase::Evaluating;
            self.timers
                .schedule(self.config.timing.evaluate_delay_ms, TimerKind::Evaluate);
        }
    }

    fn evaluate(&mut self) {
        if self.phase != EnginePhase::Evaluating {
            log::debug!("Evaluation skipped in phase {:?}", self.phase);
            return;
        }
        self.phase = EnginePhase::Idle;
        self.emit(Stage::EvaluateWins);

        let grid = self.grid();

        if self.pooled_prize.is_some() {
            if let Some(cell) = detect::find_instant_win(&grid, &self.config.table) {
                self.award_instant_win(cell);
                self.finish_spin(SpinOutcome::default());
                return;
            }
        }
        self.pooled_prize = None;

        let detection = detect::detect_wins(&grid, &self.config.table);

        for cell in self.sticky.age() {
            self.emit(Stage::StickyExpire {
                reel_index: cell.reel,
                row_index: cell.row,
            });
        }
        if !self.bonus.is_active() {
            let probabilities = &self.config.probabilities;
            let frozen = self.sticky.roll_new(
                &grid,
                &self.config.table,
                probabilities.sticky,
                probabilities.sticky_long_lifetime,
                &mut self.rng,
            );
            for sticky in frozen {
                self.emit(Stage::StickyFreeze {
                    reel_index: sticky.cell.reel,
                    row_index: sticky.cell.row,
                    symbol: sticky.symbol.to_string(),
                    lifetime: sticky.lifetime,
                });
            }
        }

        let won = detection.has_row_win();
        let triggered = detection.triggered.clone();
        self.winning_cells = detection.winning_cells.clone();
        self.bonus_cells = detection.bonus_cells.clone();

        if won || triggered.is_some() {
            let multiplier = self.bonus.multiplier();
            self.last_win_id += 1;
            self.last_win = LastWinSummary {
                total_tickets: detection.base_tickets * u64::from(multiplier),
                base_tickets: detection.base_tickets,
                rows: detection.rows.clone(),
                bonus_triggered: triggered.as_ref().map(|def| def.symbol.clone()),
                bonus_multiplier: multiplier,
                spin_id: self.last_win_id,
            };

            for row in &detection.rows {
                self.emit(Stage::RowWin {
                    row_index: row.row,
                    symbol: row.symbol.to_string(),
                    tickets: row.tickets,
                });
            }
            if won {
                self.emit(Stage::WinPresent {
                    total_tickets: self.last_win.total_tickets,
                    base_tickets: detection.base_tickets,
                    multiplier,
                    row_count: detection.rows.len() as u8,
                });
            }
            self.credit_last_win();

            if let Some(def) = &triggered {
                self.sticky.clear_active();
                let queued = self.bonus.enqueue(PendingBonus::from(def));
                log::info!(
                    "{} triggered ({} matches){}",
                    def.label,
                    detection.bonus_counts.get(&def.symbol).copied().unwrap_or(0),
                    if queued { ", stacked" } else { "" }
                );
                self.emit(Stage::BonusTriggered {
                    symbol: def.symbol.to_string(),
                    label: def.label.clone(),
                    queued,
                });
            }
        }

        self.finish_spin(SpinOutcome {
            won,
            bonus_triggered: triggered.is_some(),
        });
    }

    /// Credit the summary once, to the round bank or the session total
    fn credit_last_win(&mut self) {
        let win = &self.last_win;
        if win.spin_id <= self.last_credited_win || win.base_tickets == 0 {
            return;
        }
        self.last_credited_win = win.spin_id;
        let total = win.total_tickets;
        if self.bonus.is_active() {
            self.bonus.credit(total);
        } else {
            self.tickets_earned += total;
        }
    }

    fn finish_spin(&mut self, outcome: SpinOutcome) {
        match self.bonus.on_spin_complete() {
            RoundProgress::Idle => {}
            RoundProgress::Continue { first, rounds_left } => {
                self.emit(Stage::BonusStep { rounds_left });
                let delay = BonusController::auto_spin_delay(first, outcome, &self.config.auto_spin);
                self.schedule_auto_spin(delay);
            }
            RoundProgress::RoundOver => {
                self.emit(Stage::BonusStep { rounds_left: 0 });
            }
            RoundProgress::ChainComplete { tickets } => {
                self.tickets_earned += tickets;
                self.emit(Stage::BonusExit {
                    total_tickets: tickets,
                });
            }
        }
        self.emit(Stage::SpinEnd);
    }

    fn schedule_auto_spin(&mut self, delay_ms: u64) {
        if self.instant_win.is_some() {
            log::debug!("Auto-spin deferred until the instant win is dismissed");
            self.deferred_auto_spin = Some(delay_ms);
            return;
        }
        self.timers.schedule(delay_ms, TimerKind::AutoSpin);
        self.emit(Stage::AutoSpinScheduled { delay_ms });
    }

    fn auto_spin(&mut self) {
        if self.phase != EnginePhase::Idle || self.instant_win.is_some() || !self.bonus.is_active() {
            log::debug!("Auto-spin dropped in phase {:?}", self.phase);
            return;
        }
        self.start_spin(true);
    }

    fn award_instant_win(&mut self, cell: CellId) {
        let Some(pooled) = self.pooled_prize.take() else {
            return;
        };
        self.winning_cells = BTreeSet::from([cell]);
        self.bonus_cells.clear();

        let prize = match self.prizes.mark_claimed(&pooled.prize.id) {
            Some(prize) => prize,
            None => PrizeRecord {
                claimed: true,
                ..pooled.prize
            },
        };
        self.reconciler.claim(prize.clone());

        self.timers
            .cancel_where(|k| *k == TimerKind::InstantWinReveal);
        self.timers.schedule(
            self.config.timing.instant_win_reveal_ms,
            TimerKind::InstantWinReveal,
        );

        log::info!("Instant win {} ({}) at {cell}", prize.name, prize.id);
        self.emit(Stage::InstantWin {
            prize_id: prize.id.clone(),
            prize_name: prize.name.clone(),
            reel_index: cell.reel,
            row_index: cell.row,
        });
        self.instant_win = Some(InstantWinState {
            prize,
            cell,
            reveal_open: false,
        });
    }

    fn open_instant_win_reveal(&mut self) {
        let Some(state) = self.instant_win.as_mut() else {
            return;
        };
        state.reveal_open = true;
        let prize_id = state.prize.id.clone();
        self.emit(Stage::InstantWinReveal { prize_id });
    }

    fn reconcile(&mut self) {
        self.reconciler
            .reconcile(self.spins_left, self.tickets_earned);
    }

    fn emit(&mut self, stage: Stage) {
        self.stages
            .push(StageEvent::new(stage, self.timers.now(), self.spin_seq));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Probabilities;
    use crate::reconcile::{RecordingReporter, Report};

    fn quiet_config() -> EngineConfig {
        EngineConfig::default().with_probabilities(Probabilities {
            hot_symbol: 0.0,
            omen: 0.0,
            forced_removal: 0.0,
            sticky: 0.0,
            sticky_long_lifetime: 0.5,
            instant_win: 0.0,
        })
    }

    fn engine(spins: u32) -> SpinEngine {
        SpinEngine::builder()
            .config(quiet_config())
            .initial_spins(spins)
            .seed(7)
            .build()
            .unwrap()
    }

    fn losing_grid() -> Grid {
        Grid::from_rows(&[
            &["🎄", "🎅", "🥁", "⛄", "🎄"],
            &["🎅", "🥁", "⛄", "🎄", "🎅"],
            &["🥁", "⛄", "🎄", "🎅", "🥁"],
        ])
    }

    #[test]
    fn test_reels_stop_in_order_on_schedule() {
        let mut engine = engine(1);
        engine.spin().unwrap();
        assert_eq!(engine.phase(), EnginePhase::Spinning);

        engine.advance_to(999);
        assert!(engine.stopped_reels().iter().all(|s| !s));
        engine.advance_to(1000);
        assert_eq!(engine.stopped_reels(), &[true, false, false, false, false]);
        engine.advance_to(3400);
        assert_eq!(engine.phase(), EnginePhase::Evaluating);
        engine.advance_to(3500);
        assert_eq!(engine.phase(), EnginePhase::Idle);

        let stops: Vec<u8> = engine
            .drain_stages()
            .iter()
            .filter_map(|e| match e.stage {
                Stage::ReelStop { reel_index, .. } => Some(reel_index),
                _ => None,
            })
            .collect();
        assert_eq!(stops, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_spin_rejections() {
        let mut engine = engine(1);
        engine.force_next_spin(ForcedSpin::grid(losing_grid())).unwrap();
        engine.spin().unwrap();
        assert_eq!(engine.spin(), Err(CommandError::SpinInFlight));
        engine.settle(10_000);
        assert_eq!(engine.spin(), Err(CommandError::NoSpinsLeft));
        assert!(!engine.can_spin());
        assert_eq!(
            engine.activate_pending_bonus(),
            Err(CommandError::NothingToActivate)
        );
    }

    #[test]
    fn test_evaluation_runs_once_per_spin() {
        let mut engine = engine(3);
        for _ in 0..3 {
            engine.force_next_spin(ForcedSpin::grid(losing_grid())).unwrap();
            engine.spin().unwrap();
            engine.settle(10_000);
        }
        let evaluations = engine
            .drain_stages()
            .iter()
            .filter(|e| e.stage == Stage::EvaluateWins)
            .count();
        assert_eq!(evaluations, 3);
    }

    #[test]
    fn test_repeated_evaluation_credits_once() {
        let recorder = RecordingReporter::new();
        let mut engine = SpinEngine::builder()
            .config(quiet_config())
            .initial_spins(3)
            .reporter(Arc::new(recorder.clone()))
            .seed(7)
            .build()
            .unwrap();
        engine
            .force_next_spin(ForcedSpin::grid(Grid::from_rows(&[
                &["🎅", "🎅", "🎅", "🎅", "🎅"],
                &["🎄", "🥁", "⛄", "🎄", "🥁"],
                &["🥁", "⛄", "🎄", "🥁", "⛄"],
            ])))
            .unwrap();
        engine.spin().unwrap();
        engine.advance_by(3_500);
        assert_eq!(engine.tickets_earned(), 2);

        // A stray evaluation timer and direct re-entry change nothing
        engine.timers.schedule(0, TimerKind::Evaluate);
        engine.advance_by(0);
        engine.evaluate();
        engine.credit_last_win();
        engine.reconcile();

        assert_eq!(engine.tickets_earned(), 2);
        assert_eq!(engine.last_win().spin_id, 1);
        assert_eq!(
            recorder.reports(),
            vec![Report::SpinsConsumed(1), Report::TicketsEarned(2)]
        );
        let evaluations = engine
            .drain_stages()
            .iter()
            .filter(|e| e.stage == Stage::EvaluateWins)
            .count();
        assert_eq!(evaluations, 1);
    }

    #[test]
    fn test_oversized_forced_grid_is_ignored() {
        let mut engine = engine(1);
        let oversized = Grid::from_reels(vec![vec![Symbol::new("🎄"); 3]; 261]);
        engine.force_next_spin(ForcedSpin::grid(oversized)).unwrap();
        engine.spin().unwrap();
        engine.settle(10_000);

        assert_eq!(engine.phase(), EnginePhase::Idle);
        assert_eq!(engine.reel_positions().len(), 5);
        assert!(engine.stopped_reels().iter().all(|s| *s));
        assert_eq!(engine.grid().reel_count(), 5);
    }

    #[test]
    fn test_forced_grid_lands_exactly() {
        let mut engine = engine(1);
        engine.force_next_spin(ForcedSpin::grid(losing_grid())).unwrap();
        engine.spin().unwrap();
        engine.settle(10_000);
        assert_eq!(engine.grid(), losing_grid());
        assert_eq!(engine.last_win(), &LastWinSummary::default());
        assert_eq!(engine.tickets_earned(), 0);
    }

    #[test]
    fn test_dispose_is_terminal() {
        let mut engine = engine(5);
        engine.spin().unwrap();
        engine.advance_by(1_500);
        engine.dispose();

        let positions = engine.reel_positions().to_vec();
        engine.advance_by(60_000);
        assert_eq!(engine.reel_positions(), positions.as_slice());
        assert_eq!(engine.phase(), EnginePhase::Disposed);
        assert_eq!(engine.spin(), Err(CommandError::Disposed));
        assert!(!engine.can_spin());
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut engine = engine(2);
        engine.force_next_spin(ForcedSpin::grid(losing_grid())).unwrap();
        engine.spin().unwrap();
        engine.settle(10_000);
        let json = serde_json::to_value(engine.snapshot()).unwrap();
        assert_eq!(json["spins_left"], 1);
        assert_eq!(json["phase"], "idle");
        assert_eq!(json["can_spin"], true);
    }
}
