//! Timing profiles and the virtual-clock timer queue
//!
//! The engine never sleeps. Every delayed action is a [`TimerKind`] in a
//! [`TimerQueue`], and the host advances the clock explicitly. Due timers fire
//! in `(due, sequence)` order.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Timing profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingProfile {
    /// Normal gameplay timing
    #[default]
    Normal,
    /// Fast mode
    Turbo,
    /// Scaled from another profile
    Custom,
}

/// Spin animation and follow-up delays, all in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinTiming {
    pub profile: TimingProfile,

    /// Interval between reel position ticks while spinning
    pub spin_speed_ms: u64,

    /// Delay before the first reel stops
    pub base_stop_delay_ms: u64,

    /// Added stop delay per reel index
    pub per_reel_delay_ms: u64,

    /// Pause between the last stop and evaluation
    pub evaluate_delay_ms: u64,

    /// Delay before an instant-win reveal opens
    pub instant_win_reveal_ms: u64,
}

impl SpinTiming {
    /// Normal gameplay timing
    pub fn normal() -> Self {
        Self {
            profile: TimingProfile::Normal,
            spin_speed_ms: 120,
            base_stop_delay_ms: 1000,
            per_reel_delay_ms: 600,
            evaluate_delay_ms: 100,
            instant_win_reveal_ms: 3000,
        }
    }

    /// Turbo mode
    pub fn turbo() -> Self {
        Self {
            profile: TimingProfile::Turbo,
            spin_speed_ms: 60,
            base_stop_delay_ms: 400,
            per_reel_delay_ms: 150,
            evaluate_delay_ms: 50,
            instant_win_reveal_ms: 1500,
        }
    }

    /// Get timing for a profile
    pub fn from_profile(profile: TimingProfile) -> Self {
        match profile {
            TimingProfile::Normal | TimingProfile::Custom => Self::normal(),
            TimingProfile::Turbo => Self::turbo(),
        }
    }

    /// Scale every delay by `factor` (< 1.0 = faster). Intervals never drop below 1ms.
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |ms: u64| ((ms as f64 * factor).round() as u64).max(1);
        Self {
            profile: TimingProfile::Custom,
            spin_speed_ms: scale(self.spin_speed_ms),
            base_stop_delay_ms: scale(self.base_stop_delay_ms),
            per_reel_delay_ms: scale(self.per_reel_delay_ms),
            evaluate_delay_ms: scale(self.evaluate_delay_ms),
            instant_win_reveal_ms: scale(self.instant_win_reveal_ms),
        }
    }

    /// Stop delay for a reel, measured from spin start
    pub fn stop_delay(&self, reel: u8) -> u64 {
        self.base_stop_delay_ms + u64::from(reel) * self.per_reel_delay_ms
    }

    /// Spin start to evaluation
    pub fn total_spin_duration(&self, reel_count: u8) -> u64 {
        self.stop_delay(reel_count.saturating_sub(1)) + self.evaluate_delay_ms
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spin_speed_ms == 0 {
            return Err(ConfigError::InvalidTiming("spin_speed_ms must be positive"));
        }
        Ok(())
    }
}

impl Default for SpinTiming {
    fn default() -> Self {
        Self::normal()
    }
}

/// Follow-up delay after a bonus-round spin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoSpinDelays {
    pub default_ms: u64,
    /// After a spin that won tickets
    pub win_ms: u64,
    /// After a spin that triggered another bonus
    pub bonus_win_ms: u64,
}

impl Default for AutoSpinDelays {
    fn default() -> Self {
        Self {
            default_ms: 300,
            win_ms: 1500,
            bonus_win_ms: 3000,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TIMER QUEUE
// ═══════════════════════════════════════════════════════════════════════════

/// Handle to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerId(u64);

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerKind {
    /// Advance a spinning reel by one position
    ReelTick { reel: u8 },
    /// Land a reel on its stop position
    ReelStop { reel: u8 },
    /// Evaluate the settled grid
    Evaluate,
    /// Next bonus-round spin
    AutoSpin,
    /// Open the instant-win reveal
    InstantWinReveal,
}

impl TimerKind {
    /// Timers that belong to an in-flight spin or bonus round
    pub fn drives_play(&self) -> bool {
        !matches!(self, TimerKind::InstantWinReveal)
    }
}

#[derive(Debug, Clone)]
struct Scheduled {
    id: TimerId,
    kind: TimerKind,
    interval_ms: Option<u64>,
}

/// Virtual-clock timer queue
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    now_ms: u64,
    next_id: u64,
    next_seq: u64,
    entries: BTreeMap<(u64, u64), Scheduled>,
    index: HashMap<TimerId, (u64, u64)>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One-shot timer firing `delay_ms` from now
    pub fn schedule(&mut self, delay_ms: u64, kind: TimerKind) -> TimerId {
        let id = self.allocate_id();
        self.insert(self.now_ms + delay_ms, id, kind, None);
        id
    }

    /// Repeating timer, first firing one interval from now
    pub fn schedule_repeating(&mut self, interval_ms: u64, kind: TimerKind) -> TimerId {
        let interval = interval_ms.max(1);
        let id = self.allocate_id();
        self.insert(self.now_ms + interval, id, kind, Some(interval));
        id
    }

    /// Cancel one timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.index.remove(&id) {
            Some(key) => self.entries.remove(&key).is_some(),
            None => false,
        }
    }

    /// Cancel every timer whose kind matches
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&TimerKind) -> bool) -> usize {
        let doomed: Vec<(u64, u64)> = self
            .entries
            .iter()
            .filter(|(_, s)| predicate(&s.kind))
            .map(|(key, _)| *key)
            .collect();
        for key in &doomed {
            if let Some(scheduled) = self.entries.remove(key) {
                self.index.remove(&scheduled.id);
            }
        }
        doomed.len()
    }

    /// Drop every timer
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn contains(&self, kind: TimerKind) -> bool {
        self.entries.values().any(|s| s.kind == kind)
    }

    /// Earliest due time of a matching timer
    pub fn next_due_where(&self, mut predicate: impl FnMut(&TimerKind) -> bool) -> Option<u64> {
        self.entries
            .iter()
            .find(|(_, s)| predicate(&s.kind))
            .map(|((due, _), _)| *due)
    }

    /// Pop the earliest timer due at or before `until_ms`, moving the clock to
    /// its due time. Repeating timers are re-armed under the same id.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerId, TimerKind)> {
        let (&key, _) = self.entries.iter().next()?;
        if key.0 > until_ms {
            return None;
        }
        let scheduled = self.entries.remove(&key)?;
        self.index.remove(&scheduled.id);
        self.now_ms = self.now_ms.max(key.0);

        if let Some(interval) = scheduled.interval_ms {
            self.insert(key.0 + interval, scheduled.id, scheduled.kind, Some(interval));
        }
        Some((scheduled.id, scheduled.kind))
    }

    /// Move the clock forward without firing anything
    pub fn finish(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }

    fn allocate_id(&mut self) -> TimerId {
        self.next_id += 1;
        TimerId(self.next_id)
    }

    fn insert(&mut self, due: u64, id: TimerId, kind: TimerKind, interval_ms: Option<u64>) {
        self.next_seq += 1;
        let key = (due, self.next_seq);
        self.entries.insert(
            key,
            Scheduled {
                id,
                kind,
                interval_ms,
            },
        );
        self.index.insert(id, key);
    }
}
