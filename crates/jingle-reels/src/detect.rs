//! Win and bonus detection over a settled grid
//!
//! Pure functions: nothing here touches engine state.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::grid::{CellId, Grid};
use crate::symbols::{BonusDefinition, Symbol, SymbolTable};

/// A row of identical symbols
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WinningRow {
    pub row: u8,
    pub symbol: Symbol,
    /// Base tickets for the row
    pub tickets: u64,
}

/// Everything found on one grid
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Detection {
    pub rows: Vec<WinningRow>,
    /// Sum of row tickets before any round multiplier
    pub base_tickets: u64,
    pub winning_cells: BTreeSet<CellId>,
    /// Cells of every bonus that met its threshold
    pub bonus_cells: BTreeSet<CellId>,
    /// Per-symbol counts for bonus symbols
    pub bonus_counts: BTreeMap<Symbol, u32>,
    /// First definition in table order that met its threshold
    pub triggered: Option<BonusDefinition>,
}

impl Detection {
    pub fn has_row_win(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.triggered.is_none()
    }
}

/// First reserved-symbol cell, scanning reel-major
pub fn find_instant_win(grid: &Grid, table: &SymbolTable) -> Option<CellId> {
    grid.cells()
        .find(|(_, symbol)| table.is_instant_win(symbol))
        .map(|(cell, _)| cell)
}

/// Row wins and bonus matches
pub fn detect_wins(grid: &Grid, table: &SymbolTable) -> Detection {
    let mut detection = Detection::default();

    for row in 0..grid.row_count() {
        let symbols = grid.row(row);
        let Some(first) = symbols.first() else {
            continue;
        };
        if symbols.len() == grid.reel_count() as usize && symbols.iter().all(|s| s == first) {
            let tickets = u64::from(table.multiplier(first));
            detection.base_tickets += tickets;
            detection.rows.push(WinningRow {
                row,
                symbol: (*first).clone(),
                tickets,
            });
            for reel in 0..grid.reel_count() {
                detection.winning_cells.insert(CellId::new(reel, row));
            }
        }
    }

    for bonus in &table.bonuses {
        let cells: Vec<CellId> = grid
            .cells()
            .filter(|(_, symbol)| **symbol == bonus.symbol)
            .map(|(cell, _)| cell)
            .collect();
        let count = cells.len() as u32;
        if count > 0 {
            detection.bonus_counts.insert(bonus.symbol.clone(), count);
        }
        if count >= bonus.min_matches {
            detection.bonus_cells.extend(cells);
            if detection.triggered.is_none() {
                detection.triggered = Some(bonus.clone());
            }
        }
    }

    detection
}

/// Rows of one reel holding any bonus symbol
pub fn bonus_rows_in_reel(grid: &Grid, reel: u8, table: &SymbolTable) -> Vec<u8> {
    grid.reel(reel)
        .iter()
        .enumerate()
        .filter(|(_, symbol)| table.is_bonus_symbol(symbol))
        .map(|(row, _)| row as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_santa_row_with_snowflake_bonus() {
        let table = SymbolTable::holiday();
        let grid = Grid::from_rows(&[
            &["🎅", "🎅", "🎅", "🎅", "🎅"],
            &["❄️", "🎄", "🥁", "⛄", "🎄"],
            &["🎄", "❄️", "🥁", "🎄", "❄️"],
        ]);

        let detection = detect_wins(&grid, &table);
        assert_eq!(detection.rows.len(), 1);
        assert_eq!(detection.base_tickets, 2);
        assert_eq!(detection.winning_cells.len(), 5);
        assert_eq!(detection.bonus_counts[&Symbol::new("❄️")], 3);
        assert_eq!(detection.bonus_cells.len(), 3);
        let triggered = detection.triggered.unwrap();
        assert_eq!(triggered.label, "Snowflake Bonus");
        assert_eq!(triggered.rounds, 15);
        assert_eq!(triggered.multiplier, 2);
    }

    #[test]
    fn test_every_uniform_row_wins() {
        let table = SymbolTable::holiday();
        let grid = Grid::from_rows(&[
            &["🚂", "🚂", "🚂", "🚂", "🚂"],
            &["🎄", "🎄", "🎄", "🎄", "🎅"],
            &["⛄", "⛄", "⛄", "⛄", "⛄"],
        ]);
        let detection = detect_wins(&grid, &table);
        let rows: Vec<u8> = detection.rows.iter().map(|r| r.row).collect();
        assert_eq!(rows, [0, 2]);
        assert_eq!(detection.base_tickets, 15 + 5);
        // five trains also clear the train bonus threshold
        assert_eq!(detection.triggered.unwrap().symbol, "🚂");
    }

    #[test]
    fn test_first_definition_in_table_order_wins() {
        let table = SymbolTable::holiday();
        let grid = Grid::from_rows(&[
            &["🚂", "❄️", "🚂", "❄️", "🚂"],
            &["🎄", "❄️", "🎄", "🎅", "🎅"],
            &["🎄", "🎄", "🎄", "🎅", "🎅"],
        ]);
        let detection = detect_wins(&grid, &table);
        assert_eq!(detection.triggered.unwrap().symbol, "❄️");
        assert_eq!(detection.bonus_cells.len(), 6);
        assert!(detection.rows.is_empty());
    }

    #[test]
    fn test_instant_win_scan_is_reel_major() {
        let table = SymbolTable::holiday();
        let grid = Grid::from_rows(&[
            &["🎄", "🎄", "🎁", "🎄", "🎄"],
            &["🎄", "🎁", "🎄", "🎄", "🎄"],
            &["🎄", "🎄", "🎄", "🎄", "🎄"],
        ]);
        assert_eq!(find_instant_win(&grid, &table), Some(CellId::new(1, 1)));
        assert_eq!(bonus_rows_in_reel(&grid, 1, &table), Vec::<u8>::new());
    }

    #[test]
    fn test_bonus_rows_in_reel() {
        let table = SymbolTable::holiday();
        let grid = Grid::from_rows(&[&["❄️"], &["🎄"], &["🕊️"]]);
        assert_eq!(bonus_rows_in_reel(&grid, 0, &table), vec![0, 2]);
    }
}
