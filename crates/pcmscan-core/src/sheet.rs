//! Sparse sheet grid
//!
//! Both format backends read the first worksheet into this structure.
//! It is read-only once built; out-of-range lookups return `None` instead
//! of failing, which is the contract the adapters rely on.

use crate::cell::CellValue;
use std::collections::HashMap;

/// A sparse grid of cell values for a single worksheet.
#[derive(Debug, Default, Clone)]
pub struct Sheet {
    cells: HashMap<(u32, u16), CellValue>,
    nrows: u32,
}

impl Sheet {
    /// Create an empty sheet
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell value, growing the populated extent as needed.
    ///
    /// Empty values are not stored; writing one clears the cell, so a
    /// blank cell and an absent cell are indistinguishable to readers.
    pub fn set_value(&mut self, row: u32, col: u16, value: CellValue) {
        if row + 1 > self.nrows {
            self.nrows = row + 1;
        }
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }

    /// Get the value at (row, col), or `None` when the cell is empty or
    /// beyond the populated extent.
    pub fn value_at(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    /// Number of rows in the populated extent (0 for an empty sheet)
    pub fn nrows(&self) -> u32 {
        self.nrows
    }

    /// Number of populated cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}
