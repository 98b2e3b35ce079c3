//! Reel strip construction
//!
//! One strip is built per spin and shared by every reel. Weights become
//! copies on the strip, so a symbol's odds of landing are proportional to its
//! weight after boosting and removals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rng::SpinRng;
use crate::symbols::{Symbol, SymbolTable};

/// A virtual reel strip
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReelStrip {
    symbols: Vec<Symbol>,
}

impl ReelStrip {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self { symbols }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Get symbol at position (wraps around)
    pub fn symbol_at(&self, position: usize) -> Option<&Symbol> {
        if self.symbols.is_empty() {
            return None;
        }
        self.symbols.get(position % self.symbols.len())
    }

    /// `rows` consecutive symbols starting at `position`
    pub fn window(&self, position: usize, rows: u8) -> Vec<Symbol> {
        (0..rows as usize)
            .filter_map(|row| self.symbol_at(position + row).cloned())
            .collect()
    }

    /// First position that puts `symbol` on `row`
    pub fn find_alignment(&self, symbol: &Symbol, row: u8) -> Option<usize> {
        (0..self.symbols.len()).find(|&p| self.symbol_at(p + row as usize) == Some(symbol))
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    /// Copies per symbol
    pub fn counts(&self) -> BTreeMap<Symbol, usize> {
        let mut counts = BTreeMap::new();
        for symbol in &self.symbols {
            *counts.entry(symbol.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Append symbols at the end of the strip
    pub fn append(&mut self, symbols: impl IntoIterator<Item = Symbol>) {
        self.symbols.extend(symbols);
    }
}

/// Per-spin strip inputs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StripRequest {
    /// Symbol boosted by its hot weight
    pub hot_symbol: Option<Symbol>,
    /// Symbols kept off the strip by the active bonus round
    pub suppressed: Vec<Symbol>,
    /// Symbol randomly removed this spin
    pub forced_removal: Option<Symbol>,
    /// Weight of the reserved instant-win symbol when a prize is pooled
    pub instant_win_weight: Option<u32>,
}

/// Builds strips from a symbol table
#[derive(Debug, Clone)]
pub struct StripBuilder<'a> {
    table: &'a SymbolTable,
    omen_chance: f64,
    shuffles: u32,
}

impl<'a> StripBuilder<'a> {
    pub fn new(table: &'a SymbolTable) -> Self {
        Self {
            table,
            omen_chance: 0.1,
            shuffles: 5,
        }
    }

    pub fn with_omen_chance(mut self, chance: f64) -> Self {
        self.omen_chance = chance;
        self
    }

    pub fn with_shuffles(mut self, shuffles: u32) -> Self {
        self.shuffles = shuffles;
        self
    }

    /// Weighted entries before expansion
    pub fn weights(&self, request: &StripRequest, rng: &mut SpinRng) -> Vec<(Symbol, u32)> {
        let mut entries: Vec<(Symbol, u32)> = self
            .table
            .symbols
            .iter()
            .map(|s| (s.symbol.clone(), s.weight))
            .collect();

        if rng.chance(self.omen_chance) {
            entries.push((self.table.omen.symbol.clone(), 1));
        }
        if let Some(weight) = request.instant_win_weight {
            entries.push((self.table.instant_win_symbol.clone(), weight));
        }

        let before_removal = entries.clone();
        entries.retain(|(symbol, _)| {
            !request.suppressed.contains(symbol) && request.forced_removal.as_ref() != Some(symbol)
        });
        if entries.iter().all(|(_, w)| *w == 0) {
            log::warn!("Strip removals would empty the strip; ignoring removals");
            entries = before_removal;
        }

        if let Some(hot) = &request.hot_symbol {
            let boost = self.table.hot_weight(hot);
            if boost > 0 {
                if let Some((_, weight)) = entries.iter_mut().find(|(s, _)| s == hot) {
                    *weight += boost;
                }
            }
        }

        entries
    }

    /// Build and shuffle a strip
    pub fn build(&self, request: &StripRequest, rng: &mut SpinRng) -> ReelStrip {
        let entries = self.weights(request, rng);
        let mut symbols: Vec<Symbol> = entries
            .iter()
            .flat_map(|(symbol, weight)| std::iter::repeat_n(symbol.clone(), *weight as usize))
            .collect();

        for _ in 0..self.shuffles {
            rng.shuffle(&mut symbols);
        }

        ReelStrip::new(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    #[test]
    fn test_base_strip_matches_weights() {
        let table = SymbolTable::holiday();
        let mut rng = SpinRng::seeded(5);
        let strip = StripBuilder::new(&table)
            .with_omen_chance(0.0)
            .build(&StripRequest::default(), &mut rng);

        assert_eq!(strip.len(), 200 + 90 + 65 + 30 + 5 + 3);
        let counts = strip.counts();
        assert_eq!(counts[&sym("🎄")], 200);
        assert_eq!(counts[&sym("🚂")], 3);
        assert!(!strip.contains(&table.instant_win_symbol));
    }

    #[test]
    fn test_hot_boost_is_additive_and_removals_apply() {
        let table = SymbolTable::holiday();
        let mut rng = SpinRng::seeded(11);
        let request = StripRequest {
            hot_symbol: Some(sym("⛄")),
            suppressed: vec![sym("🎄")],
            forced_removal: Some(sym("🥁")),
            instant_win_weight: Some(50),
        };
        let counts = StripBuilder::new(&table)
            .with_omen_chance(1.0)
            .build(&request, &mut rng)
            .counts();

        assert_eq!(counts[&sym("⛄")], 30 + 400);
        assert_eq!(counts[&sym("🎁")], 50);
        assert_eq!(counts[&sym("🕊️")], 1);
        assert!(!counts.contains_key(&sym("🎄")));
        assert!(!counts.contains_key(&sym("🥁")));
    }

    #[test]
    fn test_hot_symbol_removed_gets_no_boost() {
        let table = SymbolTable::holiday();
        let mut rng = SpinRng::seeded(2);
        let request = StripRequest {
            hot_symbol: Some(sym("🎄")),
            suppressed: vec![sym("🎄")],
            ..Default::default()
        };
        let counts = StripBuilder::new(&table).build(&request, &mut rng).counts();
        assert!(!counts.contains_key(&sym("🎄")));
    }

    #[test]
    fn test_strip_never_empty() {
        let mut table = SymbolTable::holiday();
        table.symbols.truncate(1);
        let mut rng = SpinRng::seeded(4);
        let request = StripRequest {
            forced_removal: Some(sym("🎄")),
            ..Default::default()
        };
        let strip = StripBuilder::new(&table)
            .with_omen_chance(0.0)
            .build(&request, &mut rng);
        assert_eq!(strip.len(), 200);
    }

    #[test]
    fn test_fixed_seed_gives_same_multiset() {
        let table = SymbolTable::holiday();
        let request = StripRequest {
            hot_symbol: Some(sym("🎅")),
            ..Default::default()
        };
        let a = StripBuilder::new(&table).build(&request, &mut SpinRng::seeded(77));
        let b = StripBuilder::new(&table).build(&request, &mut SpinRng::seeded(77));
        assert_eq!(a, b);
        assert_eq!(a.counts(), b.counts());
    }

    #[test]
    fn test_alignment_and_window() {
        let strip = ReelStrip::new(vec![sym("a"), sym("b"), sym("c"), sym("d")]);
        assert_eq!(strip.find_alignment(&sym("a"), 2), Some(2));
        assert_eq!(strip.find_alignment(&sym("z"), 0), None);
        assert_eq!(strip.window(3, 2), vec![sym("d"), sym("a")]);
        assert_eq!(strip.symbol_at(9), Some(&sym("b")));
        assert_eq!(ReelStrip::default().symbol_at(0), None);
    }
}
