//! Per-sheet field extraction
//!
//! Cost sheets share a loose layout: fixed header anchors near the top
//! left, a "PROJECT NO" label that drifts between revisions, and a footer
//! block of labelled totals somewhere below row 10. Extraction reads the
//! anchors, scans for the footer keywords, and assembles one
//! [`ProjectRecord`] with a completeness status.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::adapter::SheetAdapter;
use crate::error::EngineResult;
use pcmscan_core::dates::{format_display, SENTINEL_DATE};
use pcmscan_core::{clean_currency, CellAddress, CellValue, ProjectRecord, RecordStatus, LOCAL_CURRENCY};

/// Footer keyword scan starts at this row (0-based).
const FOOTER_SCAN_START: u32 = 9;
/// Footer keyword scan never goes past this row.
const FOOTER_SCAN_LIMIT: u32 = 150;
/// Column holding the footer keywords.
const FOOTER_KEYWORD_COL: u16 = 0;
/// Column holding the footer values.
const FOOTER_VALUE_COL: u16 = 4;

/// "PROJECT NO" label search window: rows 0..11, columns 0..21.
const HEADER_SEARCH_ROWS: u32 = 11;
const HEADER_SEARCH_COLS: u16 = 21;

/// Matches the currency phrase, e.g. "Sales price in USD".
static CURRENCY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Sales price in\s+([A-Za-z]{3})").expect("valid currency regex")
});

/// Fixed cell anchors for the header block.
///
/// Addresses are 0-based (row, col); the A1 names are noted per field.
#[derive(Debug, Clone)]
pub struct Anchors {
    /// B3: project date
    pub project_date: CellAddress,
    /// A5: currency phrase ("Sales price in XXX")
    pub currency_text: CellAddress,
    /// B4: exchange rate
    pub exchange_rate: CellAddress,
    /// B5: project value
    pub project_value: CellAddress,
    /// K4: project id, primary fallback
    pub primary_id: CellAddress,
    /// K3: customer name, primary fallback
    pub primary_customer: CellAddress,
    /// H4: project id, secondary fallback
    pub secondary_id: CellAddress,
    /// H3: customer name, secondary fallback
    pub secondary_customer: CellAddress,
}

impl Default for Anchors {
    fn default() -> Self {
        Self {
            project_date: CellAddress { row: 2, col: 1 },
            currency_text: CellAddress { row: 4, col: 0 },
            exchange_rate: CellAddress { row: 3, col: 1 },
            project_value: CellAddress { row: 4, col: 1 },
            primary_id: CellAddress { row: 3, col: 10 },
            primary_customer: CellAddress { row: 2, col: 10 },
            secondary_id: CellAddress { row: 3, col: 7 },
            secondary_customer: CellAddress { row: 2, col: 7 },
        }
    }
}

/// Raw footer captures, before monetary normalization.
#[derive(Debug, Default)]
struct FooterTotals {
    sub_total: Option<CellValue>,
    penalty: Option<CellValue>,
    warranty: Option<CellValue>,
    total_cost: Option<CellValue>,
    cm_booked: Option<CellValue>,
    cr_booked: Option<CellValue>,
}

/// Extract one record from a sheet. Unexpected failures become an
/// `Error`-status record here; this is the only place that conversion
/// happens.
pub fn extract(adapter: &SheetAdapter, anchors: &Anchors) -> ProjectRecord {
    match extract_inner(adapter, anchors) {
        Ok(record) => record,
        Err(e) => ProjectRecord::failed(RecordStatus::Error, e.to_string()),
    }
}

fn extract_inner(adapter: &SheetAdapter, anchors: &Anchors) -> EngineResult<ProjectRecord> {
    let mut record = ProjectRecord::new();

    // Project date: a real date when the cell decodes as one, otherwise
    // whatever text sits there (kept for display, useless for sorting)
    match adapter.date_by_addr(&anchors.project_date) {
        Some(dt) => {
            record.project_date_display = format_display(&dt);
            record.sort_date = dt;
        }
        None => {
            record.project_date_display = cell_text(adapter.value_by_addr(&anchors.project_date));
            record.sort_date = SENTINEL_DATE;
        }
    }

    // Currency phrase
    record.currency_code =
        detect_currency(&cell_text(adapter.value_by_addr(&anchors.currency_text)));

    let totals = scan_footer(adapter);

    // Project id and customer: dynamic label search first, then the two
    // fixed fallback column pairs
    let (mut project_id, mut customer) = find_project_header(adapter);
    if is_missing(&project_id) {
        project_id = adapter.value_by_addr(&anchors.primary_id).cloned();
        customer = adapter.value_by_addr(&anchors.primary_customer).cloned();
    }
    if is_missing(&project_id) {
        project_id = adapter.value_by_addr(&anchors.secondary_id).cloned();
        customer = adapter.value_by_addr(&anchors.secondary_customer).cloned();
    }
    record.project_id = cell_text(project_id.as_ref());
    record.customer_name = cell_text(customer.as_ref());

    record.exchange_rate = clean_currency(adapter.value_by_addr(&anchors.exchange_rate));
    record.project_value = clean_currency(adapter.value_by_addr(&anchors.project_value));

    record.sub_total = clean_currency(totals.sub_total.as_ref());
    record.penalty = clean_currency(totals.penalty.as_ref());
    record.warranty = clean_currency(totals.warranty.as_ref());
    record.total_cost = clean_currency(totals.total_cost.as_ref());
    record.cm_booked = clean_currency(totals.cm_booked.as_ref());
    record.cr_booked = clean_currency(totals.cr_booked.as_ref());

    // Completeness, checked in precedence order. The sub-total check runs
    // against the raw capture: a garbage string that cleans to zero still
    // counts as "present" here, matching how these sheets are reviewed.
    if record.project_value.is_zero() {
        record.status = RecordStatus::DataIncomplete;
        record.error_message = Some("Project Value missing or zero".into());
    } else if is_missing(&totals.sub_total) {
        record.status = RecordStatus::DataIncomplete;
        record.error_message = Some("Sub Total missing or failed to parse".into());
    } else if record.project_date_display.is_empty() {
        record.status = RecordStatus::DataIncomplete;
        record.error_message = Some("Project date empty".into());
    }

    Ok(record)
}

/// Scan the footer block for labelled totals.
///
/// At most one keyword fires per row (the first match in label order),
/// and each slot captures only once; later rows with the same label are
/// ignored.
fn scan_footer(adapter: &SheetAdapter) -> FooterTotals {
    let mut totals = FooterTotals::default();
    let limit = adapter.nrows().min(FOOTER_SCAN_LIMIT);

    for r in FOOTER_SCAN_START..limit {
        let txt = match adapter.value_at(r, FOOTER_KEYWORD_COL) {
            Some(v) if !v.is_empty() => v.to_text().to_uppercase(),
            _ => continue,
        };
        if txt.is_empty() {
            continue;
        }

        let value = adapter
            .value_at(r, FOOTER_VALUE_COL)
            .cloned()
            .unwrap_or(CellValue::Empty);

        if txt.contains("SUB TOTAL") && totals.sub_total.is_none() {
            totals.sub_total = Some(value);
        } else if txt.contains("PENALTY") && totals.penalty.is_none() {
            totals.penalty = Some(value);
        } else if (txt.contains("WARRANTY") || txt.contains("WARRANTTY"))
            && totals.warranty.is_none()
        {
            // "WARRANTTY" is a recurring typo in older sheet revisions
            totals.warranty = Some(value);
        } else if txt.contains("TOTAL COST") && totals.total_cost.is_none() {
            totals.total_cost = Some(value);
        } else if txt.contains("CM BOOKED") && totals.cm_booked.is_none() {
            totals.cm_booked = Some(value);
        } else if txt.contains("CR BOOKED") && totals.cr_booked.is_none() {
            totals.cr_booked = Some(value);
        }
    }

    totals
}

/// Search the header window for a cell starting with "PROJECT NO"; the id
/// sits one column right and the customer one row above that.
fn find_project_header(adapter: &SheetAdapter) -> (Option<CellValue>, Option<CellValue>) {
    for r in 0..HEADER_SEARCH_ROWS {
        for c in 0..HEADER_SEARCH_COLS {
            let is_label = match adapter.value_at(r, c) {
                Some(v) if !v.is_empty() => {
                    v.to_text().trim().to_uppercase().starts_with("PROJECT NO")
                }
                _ => false,
            };
            if is_label {
                let id = adapter.value_at(r, c + 1).cloned();
                let customer = if r > 0 {
                    adapter.value_at(r - 1, c + 1).cloned()
                } else {
                    None
                };
                return (id, customer);
            }
        }
    }
    (None, None)
}

/// Uppercased 3-letter code from the currency phrase, or the local
/// currency when the phrase is absent.
fn detect_currency(text: &str) -> String {
    CURRENCY_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_uppercase())
        .unwrap_or_else(|| LOCAL_CURRENCY.to_string())
}

/// Text form of an optional cell, empty string for absent/empty cells.
fn cell_text(value: Option<&CellValue>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_text(),
        _ => String::new(),
    }
}

/// Missing in the sense of the fallback chain: absent, empty, zero or
/// false all trigger the next fallback.
fn is_missing(value: &Option<CellValue>) -> bool {
    match value {
        None => true,
        Some(v) => v.is_blank_or_zero(),
    }
}
