//! Visible grid and cell identity

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::strip::ReelStrip;
use crate::symbols::Symbol;

/// One visible cell. Rendered as `cell-{reel}-{row}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId {
    pub reel: u8,
    pub row: u8,
}

impl CellId {
    pub fn new(reel: u8, row: u8) -> Self {
        Self { reel, row }
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell-{}-{}", self.reel, self.row)
    }
}

/// Visible symbols, indexed `[reel][row]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    reels: Vec<Vec<Symbol>>,
}

impl Grid {
    /// Window of `rows` symbols from each reel position
    pub fn from_strip(strip: &ReelStrip, positions: &[usize], rows: u8) -> Self {
        let reels = positions
            .iter()
            .map(|&pos| strip.window(pos, rows))
            .collect();
        Self { reels }
    }

    /// Build from reel columns (top to bottom)
    pub fn from_reels(reels: Vec<Vec<Symbol>>) -> Self {
        Self { reels }
    }

    /// Build from rows (left to right). Rows must share one length.
    pub fn from_rows(rows: &[&[&str]]) -> Self {
        let width = rows.first().map_or(0, |r| r.len());
        let reels = (0..width)
            .map(|reel| {
                rows.iter()
                    .filter_map(|row| row.get(reel).map(|s| Symbol::new(*s)))
                    .collect()
            })
            .collect();
        Self { reels }
    }

    /// Saturates at `u8::MAX`
    pub fn reel_count(&self) -> u8 {
        u8::try_from(self.reels.len()).unwrap_or(u8::MAX)
    }

    /// Saturates at `u8::MAX`
    pub fn row_count(&self) -> u8 {
        self.reels
            .first()
            .map_or(0, |r| u8::try_from(r.len()).unwrap_or(u8::MAX))
    }

    pub fn at(&self, cell: CellId) -> Option<&Symbol> {
        self.reels.get(cell.reel as usize)?.get(cell.row as usize)
    }

    pub fn reel(&self, reel: u8) -> &[Symbol] {
        self.reels.get(reel as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn reels(&self) -> &[Vec<Symbol>] {
        &self.reels
    }

    /// One row, left to right
    pub fn row(&self, row: u8) -> Vec<&Symbol> {
        self.reels
            .iter()
            .filter_map(|reel| reel.get(row as usize))
            .collect()
    }

    /// Every cell with its symbol, reel-major
    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Symbol)> {
        self.reels.iter().enumerate().flat_map(|(reel, column)| {
            column
                .iter()
                .enumerate()
                .map(move |(row, symbol)| (CellId::new(reel as u8, row as u8), symbol))
        })
    }
}
