//! The extraction result record
//!
//! One [`ProjectRecord`] is produced per input file. Records are created
//! fresh on every scan; the only post-creation mutation is the batch
//! processor reclassifying OK records as duplicates.

use crate::dates::SENTINEL_DATE;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::fmt;
use std::path::PathBuf;

/// Outcome classification for a single scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordStatus {
    /// All required fields extracted
    Ok,
    /// File parsed but a required business field is missing or zero
    DataIncomplete,
    /// File parsed but no project id could be resolved
    ParsingError,
    /// Project id collides with another OK record in the same batch
    Duplicate,
    /// The file could not be opened or parsed at all
    Error,
    /// Extension not recognized; never handed to the extraction engine
    Skip,
}

impl RecordStatus {
    /// Human-readable label used in reports and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Ok => "OK",
            RecordStatus::DataIncomplete => "DATA INCOMPLETE",
            RecordStatus::ParsingError => "PARSING ERROR",
            RecordStatus::Duplicate => "DUPLICATE",
            RecordStatus::Error => "ERROR",
            RecordStatus::Skip => "SKIP",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured extraction result for one spreadsheet file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    /// Outcome classification; exactly one status holds per record
    pub status: RecordStatus,
    /// Human-readable detail, set when status is not OK
    pub error_message: Option<String>,
    /// Ordering key; [`SENTINEL_DATE`] when the project date is unknown
    pub sort_date: NaiveDateTime,
    /// Business key used for duplicate detection
    pub project_id: String,
    /// Customer name, may be empty
    pub customer_name: String,
    /// Formatted project date ("05-Jan-25"), may be empty
    pub project_date_display: String,
    /// 3-letter currency code, defaulted to the local currency
    pub currency_code: String,
    /// Exchange rate against the local currency
    pub exchange_rate: Decimal,
    pub project_value: Decimal,
    pub sub_total: Decimal,
    pub penalty: Decimal,
    pub warranty: Decimal,
    pub total_cost: Decimal,
    pub cm_booked: Decimal,
    pub cr_booked: Decimal,
    /// Provenance: original file name
    pub source_file_name: String,
    /// Provenance: full path of the scanned file
    pub source_path: PathBuf,
}

impl Default for ProjectRecord {
    fn default() -> Self {
        Self {
            status: RecordStatus::Ok,
            error_message: None,
            sort_date: SENTINEL_DATE,
            project_id: String::new(),
            customer_name: String::new(),
            project_date_display: String::new(),
            currency_code: LOCAL_CURRENCY.to_string(),
            exchange_rate: Decimal::ONE,
            project_value: Decimal::ZERO,
            sub_total: Decimal::ZERO,
            penalty: Decimal::ZERO,
            warranty: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            cm_booked: Decimal::ZERO,
            cr_booked: Decimal::ZERO,
            source_file_name: String::new(),
            source_path: PathBuf::new(),
        }
    }
}

/// Currency assumed when no code can be detected in the sheet.
pub const LOCAL_CURRENCY: &str = "IDR";

impl ProjectRecord {
    /// A fresh record with OK status and all fields defaulted.
    pub fn new() -> Self {
        Self::default()
    }

    /// A record representing a file-level failure.
    pub fn failed<S: Into<String>>(status: RecordStatus, message: S) -> Self {
        Self {
            status,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Whether this record qualifies for the copy/rename export step.
    pub fn is_exportable(&self) -> bool {
        matches!(
            self.status,
            RecordStatus::Ok | RecordStatus::Duplicate
        ) && !self.project_id.trim().is_empty()
    }
}
