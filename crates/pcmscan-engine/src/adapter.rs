//! Format adapters
//!
//! The extraction logic reads cells through a closed adapter over the two
//! supported formats. The variants differ in how dates surface: the XLSX
//! reader already decodes date-styled cells to [`CellValue::DateTime`],
//! while XLS sheets keep raw serial numbers that are converted here using
//! the workbook's date system.

use chrono::NaiveDateTime;

use pcmscan_core::dates::datetime_from_serial;
use pcmscan_core::{CellAddress, CellValue};
use pcmscan_xls::XlsSheet;
use pcmscan_xlsx::XlsxSheet;

/// A read-only view over the first worksheet of a cost sheet.
pub enum SheetAdapter {
    Xls(XlsSheet),
    Xlsx(XlsxSheet),
}

impl SheetAdapter {
    /// Cell value at 0-based coordinates, `None` when the cell is absent.
    pub fn value_at(&self, row: u32, col: u16) -> Option<&CellValue> {
        match self {
            SheetAdapter::Xls(xls) => xls.sheet.value_at(row, col),
            SheetAdapter::Xlsx(xlsx) => xlsx.sheet.value_at(row, col),
        }
    }

    /// Cell value at an anchor address.
    pub fn value_by_addr(&self, addr: &CellAddress) -> Option<&CellValue> {
        self.value_at(addr.row, addr.col)
    }

    /// Interpret the cell at the given coordinates as a date, if possible.
    pub fn date_at(&self, row: u32, col: u16) -> Option<NaiveDateTime> {
        match self {
            SheetAdapter::Xls(xls) => match xls.sheet.value_at(row, col)? {
                CellValue::Number(serial) => datetime_from_serial(*serial, xls.date_system),
                CellValue::DateTime(dt) => Some(*dt),
                _ => None,
            },
            SheetAdapter::Xlsx(xlsx) => match xlsx.sheet.value_at(row, col)? {
                CellValue::DateTime(dt) => Some(*dt),
                _ => None,
            },
        }
    }

    /// Date at an anchor address.
    pub fn date_by_addr(&self, addr: &CellAddress) -> Option<NaiveDateTime> {
        self.date_at(addr.row, addr.col)
    }

    /// Number of rows in the sheet (highest occupied row + 1).
    pub fn nrows(&self) -> u32 {
        match self {
            SheetAdapter::Xls(xls) => xls.sheet.nrows(),
            SheetAdapter::Xlsx(xlsx) => xlsx.sheet.nrows(),
        }
    }
}
