//! # pcmscan-xls
//!
//! Legacy-format (XLS/BIFF8) backend for pcmscan. Opens the CFB container,
//! parses the workbook globals and the first worksheet substream, and
//! returns a [`pcmscan_core::Sheet`] of raw cell values together with the
//! workbook's serial-date system.
//!
//! Only what the extraction engine needs is decoded: cell values (shared
//! and inline strings, numbers, RK/MULRK, booleans, cached formula
//! results) and the DATEMODE record. Styles, merged regions and the rest
//! of the BIFF record zoo are skipped.

pub mod biff;
pub mod error;
pub mod reader;

pub use error::{XlsError, XlsResult};
pub use reader::{XlsSheet, XlsReader};
