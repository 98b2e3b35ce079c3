//! Per-spin forced-removal and hot-symbol rolls

use serde::Serialize;

use crate::rng::SpinRng;
use crate::symbols::{Symbol, SymbolTable};

/// Modifiers chosen for one spin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpinModifiers {
    /// Boosted symbol
    pub hot_symbol: Option<Symbol>,
    /// Symbol taken off the strip
    pub forced_removal: Option<Symbol>,
}

/// Inputs to the modifier rolls
#[derive(Debug, Clone)]
pub struct ModifierRolls<'a> {
    pub table: &'a SymbolTable,
    pub hot_chance: f64,
    pub removal_chance: f64,
    /// Symbols the active bonus keeps off the strip
    pub suppressed: &'a [Symbol],
    /// Symbols held by active sticky cells
    pub sticky_held: &'a [Symbol],
    pub min_distinct_after_removal: usize,
}

impl ModifierRolls<'_> {
    /// Forced removal first, then the hot symbol
    pub fn roll(&self, rng: &mut SpinRng) -> SpinModifiers {
        let forced_removal = self.roll_forced_removal(rng);
        let hot_symbol = self.roll_hot_symbol(forced_removal.as_ref(), rng);
        SpinModifiers {
            hot_symbol,
            forced_removal,
        }
    }

    fn roll_forced_removal(&self, rng: &mut SpinRng) -> Option<Symbol> {
        if !rng.chance(self.removal_chance) {
            return None;
        }

        let available = self
            .table
            .base_symbols()
            .filter(|s| !self.suppressed.contains(s))
            .count();
        if available.saturating_sub(1) < self.min_distinct_after_removal {
            log::debug!("Forced removal skipped: only {available} symbols available");
            return None;
        }

        let candidates: Vec<Symbol> = self
            .table
            .base_symbols()
            .filter(|s| !self.suppressed.contains(s) && !self.sticky_held.contains(s))
            .cloned()
            .collect();
        let removed = rng.pick(&candidates).cloned();
        if let Some(symbol) = &removed {
            log::debug!("Forced removal: {symbol}");
        }
        removed
    }

    fn roll_hot_symbol(&self, removed: Option<&Symbol>, rng: &mut SpinRng) -> Option<Symbol> {
        if !rng.chance(self.hot_chance) {
            return None;
        }

        let candidates: Vec<(Symbol, u32)> = self
            .table
            .symbols
            .iter()
            .filter(|s| {
                s.hot_weight > 0 && !self.suppressed.contains(&s.symbol) && removed != Some(&s.symbol)
            })
            .map(|s| (s.symbol.clone(), s.hot_weight))
            .collect();

        let hot = rng.pick_weighted(&candidates).cloned();
        match &hot {
            Some(symbol) => log::debug!("Hot symbol: {symbol}"),
            None => log::debug!("No hot-symbol candidate left; nothing boosted"),
        }
        hot
    }
}
