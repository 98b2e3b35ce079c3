//! Symbol definitions and the weight table

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Rare omen symbol that may join a strip at weight 1
pub const OMEN_SYMBOL: &str = "🕊️";

/// Reserved instant-win symbol, only present when a prize is pooled
pub const INSTANT_WIN_SYMBOL: &str = "🎁";

/// Opaque symbol token
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(Arc::from(token.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Symbol {
    fn from(token: String) -> Self {
        Self(Arc::from(token))
    }
}

impl From<&str> for Symbol {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0.to_string()
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

fn default_multiplier() -> u32 {
    1
}

/// Weight-table entry for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSpec {
    pub symbol: Symbol,
    /// Copies placed on the strip
    pub weight: u32,
    /// Tickets per full row
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
    /// Extra copies added when chosen as the hot symbol
    #[serde(default)]
    pub hot_weight: u32,
}

impl SymbolSpec {
    pub fn new(symbol: impl Into<Symbol>, weight: u32, multiplier: u32) -> Self {
        Self {
            symbol: symbol.into(),
            weight,
            multiplier,
            hot_weight: 0,
        }
    }

    pub fn with_hot_weight(mut self, hot_weight: u32) -> Self {
        self.hot_weight = hot_weight;
        self
    }
}

/// A bonus that triggers when enough of its symbol lands anywhere on the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusDefinition {
    pub symbol: Symbol,
    pub label: String,
    /// Matching cells needed to trigger
    pub min_matches: u32,
    /// Rounds granted on activation
    pub rounds: u32,
    /// Ticket multiplier while the round plays
    pub multiplier: u32,
    /// Symbols kept off the strip while the round plays
    #[serde(default)]
    pub remove_symbols: Vec<Symbol>,
}

impl BonusDefinition {
    pub fn new(
        symbol: impl Into<Symbol>,
        label: impl Into<String>,
        min_matches: u32,
        rounds: u32,
        multiplier: u32,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            label: label.into(),
            min_matches,
            rounds,
            multiplier,
            remove_symbols: Vec::new(),
        }
    }

    pub fn removing(mut self, symbols: impl IntoIterator<Item = impl Into<Symbol>>) -> Self {
        self.remove_symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    /// Single-match bonuses never freeze
    pub fn can_stick(&self) -> bool {
        self.min_matches > 1
    }
}

/// The full symbol configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    /// Base symbols, in table order
    pub symbols: Vec<SymbolSpec>,
    /// Omen symbol rolled into some strips
    pub omen: SymbolSpec,
    /// Bonus definitions, in precedence order
    #[serde(default)]
    pub bonuses: Vec<BonusDefinition>,
    /// Reserved symbol for a pooled instant-win prize
    pub instant_win_symbol: Symbol,
}

impl SymbolTable {
    /// Holiday table: six base symbols, the dove omen and three bonuses
    pub fn holiday() -> Self {
        Self {
            symbols: vec![
                SymbolSpec::new("🎄", 200, 1).with_hot_weight(650),
                SymbolSpec::new("🎅", 90, 2).with_hot_weight(500),
                SymbolSpec::new("🥁", 65, 3).with_hot_weight(500),
                SymbolSpec::new("⛄", 30, 5).with_hot_weight(400),
                SymbolSpec::new("❄️", 5, 10).with_hot_weight(30),
                SymbolSpec::new("🚂", 3, 15).with_hot_weight(20),
            ],
            omen: SymbolSpec::new(OMEN_SYMBOL, 1, 1),
            bonuses: vec![
                BonusDefinition::new("❄️", "Snowflake Bonus", 3, 15, 2),
                BonusDefinition::new("🚂", "Train Bonus", 3, 15, 3),
                BonusDefinition::new(OMEN_SYMBOL, "Dove Bonus", 1, 10, 5).removing(["🎄"]),
            ],
            instant_win_symbol: Symbol::new(INSTANT_WIN_SYMBOL),
        }
    }

    /// Base symbols in table order
    pub fn base_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().map(|s| &s.symbol)
    }

    /// Look up a base or omen symbol
    pub fn spec(&self, symbol: &Symbol) -> Option<&SymbolSpec> {
        self.symbols
            .iter()
            .chain(std::iter::once(&self.omen))
            .find(|s| &s.symbol == symbol)
    }

    pub fn weight(&self, symbol: &Symbol) -> u32 {
        self.spec(symbol).map_or(0, |s| s.weight)
    }

    /// Tickets per full row (unknown symbols pay 1)
    pub fn multiplier(&self, symbol: &Symbol) -> u32 {
        self.spec(symbol).map_or(1, |s| s.multiplier)
    }

    pub fn hot_weight(&self, symbol: &Symbol) -> u32 {
        self.spec(symbol).map_or(0, |s| s.hot_weight)
    }

    pub fn bonus(&self, symbol: &Symbol) -> Option<&BonusDefinition> {
        self.bonuses.iter().find(|b| &b.symbol == symbol)
    }

    pub fn is_bonus_symbol(&self, symbol: &Symbol) -> bool {
        self.bonus(symbol).is_some()
    }

    pub fn is_instant_win(&self, symbol: &Symbol) -> bool {
        symbol == &self.instant_win_symbol
    }

    /// Validate table invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::EmptyTable);
        }

        let mut seen = std::collections::HashSet::new();
        for spec in self.symbols.iter().chain(std::iter::once(&self.omen)) {
            if spec.weight == 0 {
                return Err(ConfigError::ZeroWeight(spec.symbol.clone()));
            }
            if spec.multiplier == 0 {
                return Err(ConfigError::ZeroMultiplier(spec.symbol.clone()));
            }
            if !seen.insert(spec.symbol.clone()) {
                return Err(ConfigError::DuplicateSymbol(spec.symbol.clone()));
            }
        }

        if seen.contains(&self.instant_win_symbol) {
            return Err(ConfigError::ReservedSymbolCollision(
                self.instant_win_symbol.clone(),
            ));
        }

        let mut bonus_symbols = std::collections::HashSet::new();
        for bonus in &self.bonuses {
            if !seen.contains(&bonus.symbol) {
                return Err(ConfigError::UnknownBonusSymbol(bonus.symbol.clone()));
            }
            if !bonus_symbols.insert(bonus.symbol.clone()) {
                return Err(ConfigError::DuplicateSymbol(bonus.symbol.clone()));
            }
            let reason = if bonus.min_matches == 0 {
                Some("min_matches must be at least 1")
            } else if bonus.rounds == 0 {
                Some("rounds must be at least 1")
            } else if bonus.multiplier == 0 {
                Some("multiplier must be at least 1")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(ConfigError::InvalidBonus {
                    symbol: bonus.symbol.clone(),
                    reason,
                });
            }
        }

        Ok(())
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::holiday()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holiday_table_lookups() {
        let table = SymbolTable::holiday();
        assert!(table.validate().is_ok());
        assert_eq!(table.multiplier(&Symbol::new("🎅")), 2);
        assert_eq!(table.multiplier(&Symbol::new("🚂")), 15);
        assert_eq!(table.multiplier(&Symbol::new("❓")), 1);
        assert_eq!(table.weight(&Symbol::new(OMEN_SYMBOL)), 1);
        assert_eq!(table.hot_weight(&Symbol::new("🎄")), 650);

        let dove = table.bonus(&Symbol::new(OMEN_SYMBOL)).unwrap();
        assert!(!dove.can_stick());
        assert_eq!(dove.remove_symbols, vec![Symbol::new("🎄")]);
        assert!(table.bonus(&Symbol::new("❄️")).unwrap().can_stick());
    }

    #[test]
    fn test_validation_rejects_bad_tables() {
        let mut table = SymbolTable::holiday();
        table.bonuses[0].rounds = 0;
        assert!(matches!(
            table.validate(),
            Err(ConfigError::InvalidBonus { .. })
        ));

        let mut table = SymbolTable::holiday();
        table.symbols.push(SymbolSpec::new("🎄", 1, 1));
        assert!(matches!(table.validate(), Err(ConfigError::DuplicateSymbol(_))));

        let mut table = SymbolTable::holiday();
        table.instant_win_symbol = Symbol::new("🎅");
        assert!(matches!(
            table.validate(),
            Err(ConfigError::ReservedSymbolCollision(_))
        ));

        let mut table = SymbolTable::holiday();
        table.bonuses.push(BonusDefinition::new("🦌", "Reindeer", 3, 5, 2));
        assert!(matches!(
            table.validate(),
            Err(ConfigError::UnknownBonusSymbol(_))
        ));
    }

    #[test]
    fn test_symbol_serializes_as_plain_string() {
        let json = serde_json::to_string(&Symbol::new("⛄")).unwrap();
        assert_eq!(json, "\"⛄\"");
        let back: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(back, "⛄");
    }
}
