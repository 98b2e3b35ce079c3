//! Engine error types

use crate::symbols::Symbol;

/// Configuration validation and loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Symbol table has no base symbols")]
    EmptyTable,

    #[error("Symbol {0} has zero spin weight")]
    ZeroWeight(Symbol),

    #[error("Symbol {0} has a zero multiplier")]
    ZeroMultiplier(Symbol),

    #[error("Symbol {0} is defined more than once")]
    DuplicateSymbol(Symbol),

    #[error("Instant-win symbol {0} collides with a gameplay symbol")]
    ReservedSymbolCollision(Symbol),

    #[error("Bonus symbol {0} is not in the symbol table")]
    UnknownBonusSymbol(Symbol),

    #[error("Invalid bonus {symbol}: {reason}")]
    InvalidBonus { symbol: Symbol, reason: &'static str },

    #[error("Invalid grid: {0}")]
    InvalidGrid(&'static str),

    #[error("Probability {name} must be within 0..=1, got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("Invalid timing: {0}")]
    InvalidTiming(&'static str),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Config read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON config error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML config error: {0}")]
    Yaml(#[from] serde_yml::Error),
}

/// A rejected engine command. Rejection leaves the engine untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("A spin is already in flight")]
    SpinInFlight,

    #[error("No spins left")]
    NoSpinsLeft,

    #[error("A bonus round is playing")]
    BonusRoundActive,

    #[error("An instant-win prize is waiting to be dismissed")]
    InstantWinPending,

    #[error("No instant-win prize to dismiss")]
    NoInstantWin,

    #[error("No pending bonus to activate")]
    NothingToActivate,

    #[error("Engine has been disposed")]
    Disposed,
}

/// Failure reported by a session callback
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error("Report rejected: {0}")]
    Rejected(String),

    #[error("Reporting backend unavailable: {0}")]
    Unavailable(String),
}
