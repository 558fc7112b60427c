//! # pcmscan-core
//!
//! Core data structures for the pcmscan project-cost spreadsheet extractor.
//!
//! This crate provides the fundamental types shared by the format backends
//! and the extraction engine:
//! - [`CellValue`] - Raw cell values (numbers, strings, booleans, date-times)
//! - [`CellAddress`] - A1-style cell addressing
//! - [`Sheet`] - A sparse read-only grid of cell values
//! - [`ProjectRecord`] and [`RecordStatus`] - One extraction result per file
//! - [`clean_currency`] - Normalization of heterogeneous monetary cells
//!
//! ## Example
//!
//! ```rust
//! use pcmscan_core::{CellAddress, CellValue, Sheet};
//!
//! let addr = CellAddress::parse("K4").unwrap();
//! assert_eq!((addr.row, addr.col), (3, 10));
//!
//! let mut sheet = Sheet::new();
//! sheet.set_value(3, 10, CellValue::string("P-1051"));
//! assert_eq!(sheet.value_at(3, 10).unwrap().to_text(), "P-1051");
//! ```

pub mod cell;
pub mod dates;
pub mod error;
pub mod money;
pub mod record;
pub mod sanitize;
pub mod sheet;

// Re-exports for convenience
pub use cell::{CellAddress, CellValue};
pub use dates::{DateSystem, SENTINEL_DATE};
pub use error::{Error, Result};
pub use money::clean_currency;
pub use record::{ProjectRecord, RecordStatus, LOCAL_CURRENCY};
pub use sanitize::sanitize_filename;
pub use sheet::Sheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;
