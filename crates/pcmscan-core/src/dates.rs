//! Excel serial-date conversion and display formatting
//!
//! Excel stores dates as serial numbers (days since a base date). The 1900
//! date system treats 1900 as a leap year, giving a non-existent day
//! 1900-02-29 as serial 60; serials at or above 60 are shifted by one day
//! to compensate. The 1904 system counts days since 1904-01-01.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

/// Which serial-date base the workbook uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateSystem {
    /// 1900 date system (Windows default, serial 1 = 1900-01-01)
    #[default]
    V1900,
    /// 1904 date system (legacy Mac, serial 0 = 1904-01-01)
    V1904,
}

/// Sentinel "minimum date" marking an unknown/unparseable project date.
/// Records carrying it sort before any real date.
pub const SENTINEL_DATE: NaiveDateTime = NaiveDateTime::MIN;

/// Display format for project dates, e.g. "05-Jan-25".
pub const DISPLAY_FORMAT: &str = "%d-%b-%y";

/// Convert an Excel serial number to a date-time.
///
/// Returns `None` for serials before day 1 or outside chrono's range.
pub fn datetime_from_serial(serial: f64, system: DateSystem) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }

    let days = serial.trunc() as i64;
    let secs = (serial.fract() * 86_400.0).round() as i64;

    let base = match system {
        DateSystem::V1904 => NaiveDate::from_ymd_opt(1904, 1, 1)?,
        // Serial 60 is the phantom 1900-02-29; everything from there on is
        // off by one against the real calendar.
        DateSystem::V1900 if days >= 60 => NaiveDate::from_ymd_opt(1899, 12, 30)?,
        DateSystem::V1900 => NaiveDate::from_ymd_opt(1899, 12, 31)?,
    };

    let date = base.checked_add_signed(Duration::days(days))?;
    Some(date.and_hms_opt(0, 0, 0)? + Duration::seconds(secs))
}

/// Convert a date-time to a 1900-system serial number (for writing).
///
/// Only meaningful for dates after 1900-02-28, which covers every project
/// date this tool handles.
pub fn serial_from_datetime(dt: &NaiveDateTime) -> f64 {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid base date");
    let days = (dt.date() - base).num_days() as f64;
    let frac = dt.time().num_seconds_from_midnight() as f64 / 86_400.0;
    days + frac
}

/// Format a date-time the way project dates are displayed ("05-Jan-25").
pub fn format_display(dt: &NaiveDateTime) -> String {
    dt.format(DISPLAY_FORMAT).to_string()
}

/// Extract a 4-digit year from a `day-month-year` display string.
///
/// Two-digit years are assumed to be 2000s. Returns `None` when the string
/// is not a 3-part dash-separated date.
pub fn year_from_display(display: &str) -> Option<String> {
    let parts: Vec<&str> = display.split('-').collect();
    if parts.len() != 3 {
        return None;
    }
    let yy = parts[2].trim();
    match yy.len() {
        2 if yy.chars().all(|c| c.is_ascii_digit()) => Some(format!("20{yy}")),
        4 if yy.chars().all(|c| c.is_ascii_digit()) => Some(yy.to_string()),
        _ => None,
    }
}
