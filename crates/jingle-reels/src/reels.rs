//! Per-reel spin state

use serde::Serialize;

use crate::config::GridSpec;
use crate::rng::SpinRng;
use crate::sticky::StickyTracker;
use crate::strip::ReelStrip;

/// Positions and stop flags for every reel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReelSet {
    positions: Vec<usize>,
    stop_positions: Vec<usize>,
    stopped: Vec<bool>,
    bonus_reels: Vec<bool>,
}

impl ReelSet {
    /// All reels stopped at `positions`
    pub fn at_rest(positions: Vec<usize>) -> Self {
        let count = positions.len();
        Self {
            stop_positions: positions.clone(),
            positions,
            stopped: vec![true; count],
            bonus_reels: vec![false; count],
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn stop_positions(&self) -> &[usize] {
        &self.stop_positions
    }

    pub fn stopped(&self) -> &[bool] {
        &self.stopped
    }

    pub fn bonus_reels(&self) -> &[bool] {
        &self.bonus_reels
    }

    pub fn all_stopped(&self) -> bool {
        self.stopped.iter().all(|s| *s)
    }

    /// Start a spin toward precomputed stops
    pub fn begin(&mut self, stop_positions: Vec<usize>) {
        let count = stop_positions.len();
        self.positions.resize(count, 0);
        self.stop_positions = stop_positions;
        self.stopped = vec![false; count];
        self.bonus_reels = vec![false; count];
    }

    /// Advance a spinning reel one position
    pub fn tick(&mut self, reel: u8, strip_len: usize) {
        let i = reel as usize;
        if strip_len == 0 || self.stopped.get(i).copied().unwrap_or(true) {
            return;
        }
        if let Some(pos) = self.positions.get_mut(i) {
            *pos = (*pos + 1) % strip_len;
        }
    }

    /// Clamp a reel to its stop position. Returns false if it was not spinning.
    pub fn stop(&mut self, reel: u8) -> bool {
        let i = reel as usize;
        match self.stopped.get(i) {
            Some(false) => {}
            _ => return false,
        }
        if let (Some(pos), Some(target)) = (self.positions.get_mut(i), self.stop_positions.get(i)) {
            *pos = *target;
        }
        self.stopped[i] = true;
        true
    }

    pub fn mark_bonus_reel(&mut self, reel: u8) {
        if let Some(flag) = self.bonus_reels.get_mut(reel as usize) {
            *flag = true;
        }
    }
}

/// Stop positions for the next spin. Reels holding a sticky cell land the
/// sticky symbol back on its row when the strip allows it.
pub fn compute_stop_positions(
    strip: &ReelStrip,
    grid: GridSpec,
    sticky: Option<&StickyTracker>,
    rng: &mut SpinRng,
) -> Vec<usize> {
    (0..grid.reels)
        .map(|reel| {
            let anchor = sticky.and_then(|tracker| tracker.first_in_reel(reel));
            if let Some(cell) = anchor {
                match strip.find_alignment(&cell.symbol, cell.cell.row) {
                    Some(position) => return position,
                    None => log::warn!(
                        "Sticky {} at {} missing from strip; random stop",
                        cell.symbol,
                        cell.cell
                    ),
                }
            }
            rng.index(strip.len())
        })
        .collect()
}
