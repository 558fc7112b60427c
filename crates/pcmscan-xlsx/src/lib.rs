//! # pcmscan-xlsx
//!
//! XLSX (Office Open XML) support for pcmscan: a value-level reader for
//! the first worksheet of cost sheets, and a styled summary report writer.

pub mod error;
pub mod number_formats;
pub mod reader;
pub mod report;

pub use error::{XlsxError, XlsxResult};
pub use reader::{XlsxReader, XlsxSheet};
pub use report::ReportWriter;
