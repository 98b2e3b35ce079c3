//! Engine configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::CellId;
use crate::symbols::SymbolTable;
use crate::timing::{AutoSpinDelays, SpinTiming};

/// Grid specification (reels × rows)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of reels (columns)
    pub reels: u8,
    /// Number of visible rows per reel
    pub rows: u8,
}

impl GridSpec {
    /// Standard 5×3
    pub fn standard_5x3() -> Self {
        Self { reels: 5, rows: 3 }
    }

    /// Total grid positions
    pub fn total_positions(&self) -> usize {
        self.reels as usize * self.rows as usize
    }

    /// Every cell, reel-major
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        (0..self.reels).flat_map(move |reel| (0..self.rows).map(move |row| CellId::new(reel, row)))
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::standard_5x3()
    }
}

/// Per-spin roll probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Probabilities {
    /// A hot symbol is boosted this spin
    pub hot_symbol: f64,
    /// The omen symbol joins the strip
    pub omen: f64,
    /// One base symbol is removed from the strip
    pub forced_removal: f64,
    /// An eligible landed bonus symbol freezes
    pub sticky: f64,
    /// A new sticky cell gets the 2-spin lifetime instead of 1
    pub sticky_long_lifetime: f64,
    /// An unclaimed prize is pooled into the strip
    pub instant_win: f64,
}

impl Default for Probabilities {
    fn default() -> Self {
        Self {
            hot_symbol: 0.5,
            omen: 0.1,
            forced_removal: 0.05,
            sticky: 0.2,
            sticky_long_lifetime: 0.5,
            instant_win: 0.03,
        }
    }
}

impl Probabilities {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("hot_symbol", self.hot_symbol),
            ("omen", self.omen),
            ("forced_removal", self.forced_removal),
            ("sticky", self.sticky),
            ("sticky_long_lifetime", self.sticky_long_lifetime),
            ("instant_win", self.instant_win),
        ];
        for (name, value) in checks {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        Ok(())
    }
}

fn default_instant_win_weight() -> u32 {
    50
}

fn default_strip_shuffles() -> u32 {
    5
}

fn default_min_distinct() -> usize {
    4
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub grid: GridSpec,
    #[serde(default)]
    pub table: SymbolTable,
    #[serde(default)]
    pub probabilities: Probabilities,
    #[serde(default)]
    pub timing: SpinTiming,
    #[serde(default)]
    pub auto_spin: AutoSpinDelays,
    /// Strip weight for a pooled prize whose record carries no weight
    #[serde(default = "default_instant_win_weight")]
    pub instant_win_default_weight: u32,
    /// Full shuffle passes over a built strip
    #[serde(default = "default_strip_shuffles")]
    pub strip_shuffles: u32,
    /// Forced removal is skipped when fewer distinct symbols would remain
    #[serde(default = "default_min_distinct")]
    pub min_distinct_after_removal: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            table: SymbolTable::default(),
            probabilities: Probabilities::default(),
            timing: SpinTiming::default(),
            auto_spin: AutoSpinDelays::default(),
            instant_win_default_weight: default_instant_win_weight(),
            strip_shuffles: default_strip_shuffles(),
            min_distinct_after_removal: default_min_distinct(),
        }
    }
}

impl EngineConfig {
    /// Builder: timing
    pub fn with_timing(mut self, timing: SpinTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Builder: probabilities
    pub fn with_probabilities(mut self, probabilities: Probabilities) -> Self {
        self.probabilities = probabilities;
        self
    }

    /// Builder: symbol table
    pub fn with_table(mut self, table: SymbolTable) -> Self {
        self.table = table;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            Some("yaml") | Some("yml") => Self::from_yaml(&text),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.reels == 0 || self.grid.rows == 0 {
            return Err(ConfigError::InvalidGrid(
                "Grid must have at least 1 reel and 1 row",
            ));
        }
        self.table.validate()?;
        self.probabilities.validate()?;
        self.timing.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid.total_positions(), 15);
        assert_eq!(config.instant_win_default_weight, 50);
    }

    #[test]
    fn test_grid_cells_are_reel_major() {
        let cells: Vec<String> = GridSpec { reels: 2, rows: 2 }
            .cells()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(cells, ["cell-0-0", "cell-0-1", "cell-1-0", "cell-1-1"]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(
            r#"{ "probabilities": { "hot_symbol": 1.0 }, "timing": {
                "profile": "turbo", "spin_speed_ms": 60, "base_stop_delay_ms": 400,
                "per_reel_delay_ms": 150, "evaluate_delay_ms": 50, "instant_win_reveal_ms": 1500 } }"#,
        )
        .unwrap();
        assert_eq!(config.probabilities.hot_symbol, 1.0);
        assert_eq!(config.probabilities.omen, 0.1);
        assert_eq!(config.timing, SpinTiming::turbo());
        assert_eq!(config.table, SymbolTable::holiday());
    }

    #[test]
    fn test_yaml_and_rejection() {
        let config = EngineConfig::from_yaml("grid:\n  reels: 3\n  rows: 3\n").unwrap();
        assert_eq!(config.grid.reels, 3);

        let err = EngineConfig::from_yaml("probabilities:\n  sticky: 1.5\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidProbability { name: "sticky", .. }
        ));

        let err = EngineConfig::from_json(r#"{ "grid": { "reels": 0, "rows": 3 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidGrid(_)));
    }

    #[test]
    fn test_json_round_trip_preserves_table() {
        let config = EngineConfig::default();
        let json = config.to_json_pretty().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }
}
