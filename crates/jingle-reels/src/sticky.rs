//! Sticky symbol tracking
//!
//! A landed bonus symbol may freeze for one or two spins. Every cell that has
//! ever frozen is remembered so it cannot freeze again until a bonus round
//! resets the tracker.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::grid::{CellId, Grid};
use crate::rng::SpinRng;
use crate::symbols::{Symbol, SymbolTable};

/// An active frozen cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StickyCell {
    pub cell: CellId,
    pub symbol: Symbol,
    /// Evaluated spins left
    pub lifetime: u8,
}

/// Active sticky cells plus the ever-sticky set
#[derive(Debug, Clone, Default)]
pub struct StickyTracker {
    active: BTreeMap<CellId, StickyCell>,
    ever: BTreeSet<CellId>,
}

impl StickyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Active cells, reel-major
    pub fn active(&self) -> impl Iterator<Item = &StickyCell> {
        self.active.values()
    }

    pub fn get(&self, cell: CellId) -> Option<&StickyCell> {
        self.active.get(&cell)
    }

    pub fn is_active(&self, cell: CellId) -> bool {
        self.active.contains_key(&cell)
    }

    pub fn has_been_sticky(&self, cell: CellId) -> bool {
        self.ever.contains(&cell)
    }

    pub fn ever_sticky(&self) -> &BTreeSet<CellId> {
        &self.ever
    }

    /// Distinct symbols held by active cells
    pub fn held_symbols(&self) -> Vec<Symbol> {
        let held: BTreeSet<&Symbol> = self.active.values().map(|c| &c.symbol).collect();
        held.into_iter().cloned().collect()
    }

    /// Topmost active cell in a reel
    pub fn first_in_reel(&self, reel: u8) -> Option<&StickyCell> {
        self.active
            .range(CellId::new(reel, 0)..=CellId::new(reel, u8::MAX))
            .next()
            .map(|(_, cell)| cell)
    }

    /// Freeze a cell
    pub fn insert(&mut self, cell: CellId, symbol: Symbol, lifetime: u8) {
        self.ever.insert(cell);
        self.active.insert(
            cell,
            StickyCell {
                cell,
                symbol,
                lifetime,
            },
        );
    }

    /// Decrement every lifetime; returns the cells that expired
    pub fn age(&mut self) -> Vec<CellId> {
        let mut expired = Vec::new();
        self.active.retain(|cell, sticky| {
            sticky.lifetime = sticky.lifetime.saturating_sub(1);
            if sticky.lifetime == 0 {
                expired.push(*cell);
                false
            } else {
                true
            }
        });
        expired
    }

    /// Roll eligible cells of a settled grid. A cell is eligible when its
    /// symbol has a multi-match bonus and it is neither sticky now nor before.
    pub fn roll_new(
        &mut self,
        grid: &Grid,
        table: &SymbolTable,
        chance: f64,
        long_lifetime_chance: f64,
        rng: &mut SpinRng,
    ) -> Vec<StickyCell> {
        let eligible: Vec<(CellId, Symbol)> = grid
            .cells()
            .filter(|(cell, symbol)| {
                table.bonus(symbol).is_some_and(|b| b.can_stick())
                    && !self.is_active(*cell)
                    && !self.has_been_sticky(*cell)
            })
            .map(|(cell, symbol)| (cell, symbol.clone()))
            .collect();

        let mut frozen = Vec::new();
        for (cell, symbol) in eligible {
            if !rng.chance(chance) {
                continue;
            }
            let lifetime = if rng.chance(long_lifetime_chance) { 2 } else { 1 };
            log::debug!("Sticky {symbol} frozen at {cell} for {lifetime} spin(s)");
            self.insert(cell, symbol.clone(), lifetime);
            frozen.push(StickyCell {
                cell,
                symbol,
                lifetime,
            });
        }
        frozen
    }

    /// Drop active cells, keep the ever-sticky history
    pub fn clear_active(&mut self) {
        self.active.clear();
    }

    /// Forget everything
    pub fn reset(&mut self) {
        self.active.clear();
        self.ever.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snow_grid() -> Grid {
        Grid::from_rows(&[
            &["❄️", "🎄", "🎄", "🎄", "❄️"],
            &["🎄", "🕊️", "🎄", "🎄", "🎄"],
            &["🎄", "🎄", "🚂", "🎄", "🎄"],
        ])
    }

    #[test]
    fn test_only_multi_match_bonus_symbols_freeze() {
        let table = SymbolTable::holiday();
        let mut tracker = StickyTracker::new();
        let frozen = tracker.roll_new(&snow_grid(), &table, 1.0, 0.5, &mut SpinRng::seeded(1));

        let cells: Vec<String> = frozen.iter().map(|s| s.cell.to_string()).collect();
        assert_eq!(cells, ["cell-0-0", "cell-2-2", "cell-4-0"]);
        assert!(frozen.iter().all(|s| (1..=2).contains(&s.lifetime)));
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn test_ever_sticky_cells_never_refreeze() {
        let table = SymbolTable::holiday();
        let mut tracker = StickyTracker::new();
        let mut rng = SpinRng::seeded(2);
        tracker.roll_new(&snow_grid(), &table, 1.0, 0.0, &mut rng);

        let expired = tracker.age();
        assert_eq!(expired.len(), 3);
        assert!(tracker.is_empty());

        let again = tracker.roll_new(&snow_grid(), &table, 1.0, 0.0, &mut rng);
        assert!(again.is_empty());
        assert!(tracker.has_been_sticky(CellId::new(0, 0)));
    }

    #[test]
    fn test_lifetime_two_survives_one_age() {
        let mut tracker = StickyTracker::new();
        tracker.insert(CellId::new(1, 2), Symbol::new("🚂"), 2);
        tracker.insert(CellId::new(1, 0), Symbol::new("❄️"), 1);

        assert_eq!(tracker.first_in_reel(1).unwrap().cell.row, 0);
        assert_eq!(tracker.age(), vec![CellId::new(1, 0)]);
        assert_eq!(tracker.get(CellId::new(1, 2)).unwrap().lifetime, 1);
        assert_eq!(tracker.held_symbols(), vec![Symbol::new("🚂")]);
        assert_eq!(tracker.age(), vec![CellId::new(1, 2)]);
        assert!(tracker.first_in_reel(1).is_none());
    }

    #[test]
    fn test_reset_clears_history() {
        let mut tracker = StickyTracker::new();
        tracker.insert(CellId::new(0, 0), Symbol::new("❄️"), 1);
        tracker.clear_active();
        assert!(tracker.has_been_sticky(CellId::new(0, 0)));
        tracker.reset();
        assert!(!tracker.has_been_sticky(CellId::new(0, 0)));
    }
}
