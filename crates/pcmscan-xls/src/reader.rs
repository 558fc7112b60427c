//! XLS (BIFF8) reader.
//!
//! Opens a Compound File Binary (CFB/OLE2) container, reads the `Workbook`
//! stream, parses BIFF8 records, and populates a [`Sheet`] with the cell
//! values of the first worksheet.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use pcmscan_core::{CellValue, DateSystem, Sheet};

use crate::biff::parser::{read_f64, read_rk, read_u16, read_u32};
use crate::biff::records;
use crate::biff::strings::{parse_sst, read_short_string, read_unicode_string};
use crate::biff::{self, BiffRecord};
use crate::error::{XlsError, XlsResult};

/// The first worksheet of an XLS workbook, plus its serial-date system.
#[derive(Debug)]
pub struct XlsSheet {
    pub sheet: Sheet,
    pub date_system: DateSystem,
}

/// Metadata for a sheet parsed from the BOUNDSHEET record.
#[derive(Debug)]
struct SheetInfo {
    /// Sheet type: 0 = worksheet, 2 = chart, 6 = macro/VBA.
    sheet_type: u8,
    /// Sheet name (kept for diagnostics).
    name: String,
}

/// XLS file reader.
pub struct XlsReader;

impl XlsReader {
    /// Read the first worksheet from an XLS file on disk.
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsResult<XlsSheet> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::read(file)
    }

    /// Read the first worksheet from any `Read + Seek` source.
    pub fn read<R: Read + Seek>(reader: R) -> XlsResult<XlsSheet> {
        let mut cfb = cfb::CompoundFile::open(reader)?;

        // The stream is "Workbook" in BIFF8; some older writers use "Book".
        let stream_path = if cfb.exists("/Workbook") {
            "/Workbook"
        } else if cfb.exists("/Book") {
            "/Book"
        } else {
            return Err(XlsError::InvalidFormat(
                "no Workbook or Book stream found in CFB".into(),
            ));
        };

        let mut stream_data = Vec::new();
        cfb.open_stream(stream_path)?
            .read_to_end(&mut stream_data)?;

        let mut cursor = Cursor::new(&stream_data);
        let all_records = biff::read_all_records(&mut cursor)?;

        // Phase 1: workbook globals (SST, sheet directory, date mode)
        let mut sst: Vec<String> = Vec::new();
        let mut sheets: Vec<SheetInfo> = Vec::new();
        let mut date_system = DateSystem::V1900;
        let mut in_globals = false;
        let mut globals_end_idx = 0;

        for (idx, rec) in all_records.iter().enumerate() {
            match rec.record_type {
                records::BOF => {
                    let (version, dt) = biff::parse_bof(&rec.data)?;
                    if dt == records::BOF_WORKBOOK_GLOBALS {
                        if version != records::BIFF8_VERSION {
                            return Err(XlsError::UnsupportedVersion(format!(
                                "expected BIFF8 (0x0600), got 0x{version:04X}"
                            )));
                        }
                        in_globals = true;
                    }
                }
                records::EOF if in_globals => {
                    globals_end_idx = idx;
                    break;
                }
                records::SST if in_globals => {
                    sst = parse_sst(&rec.data)?;
                }
                records::BOUNDSHEET if in_globals => {
                    sheets.push(Self::parse_boundsheet(&rec.data)?);
                }
                records::DATEMODE if in_globals => {
                    if rec.data.len() >= 2 {
                        let mode = u16::from_le_bytes([rec.data[0], rec.data[1]]);
                        if mode == 1 {
                            date_system = DateSystem::V1904;
                        }
                    }
                }
                _ => {}
            }
        }

        if globals_end_idx == 0 && !in_globals {
            return Err(XlsError::InvalidFormat(
                "no workbook globals BOF found".into(),
            ));
        }

        // Phase 2: locate the first worksheet substream. Substreams follow
        // the globals in BOUNDSHEET order (BOF..EOF pairs); charts and
        // macro sheets are skipped using the directory's type field.
        let remaining = &all_records[globals_end_idx + 1..];
        let groups = Self::split_sheet_records(remaining);

        let first_ws = sheets
            .iter()
            .position(|s| s.sheet_type == records::SHEET_TYPE_WORKSHEET)
            .ok_or_else(|| XlsError::InvalidFormat("workbook has no worksheet".into()))?;

        let mut sheet = Sheet::new();
        if let Some(sheet_records) = groups.get(first_ws) {
            log::debug!(
                "reading worksheet '{}' ({} records)",
                sheets[first_ws].name,
                sheet_records.len()
            );
            Self::parse_sheet_records(sheet_records, &mut sheet, &sst)?;
        }

        Ok(XlsSheet { sheet, date_system })
    }

    /// Parse a BOUNDSHEET record body.
    fn parse_boundsheet(data: &[u8]) -> XlsResult<SheetInfo> {
        let mut offset = 0;
        let _abs_offset = read_u32(data, &mut offset)?;
        let _visibility = data.get(offset).copied().unwrap_or(0);
        offset += 1;
        let sheet_type = data.get(offset).copied().unwrap_or(0);
        offset += 1;
        let name = read_short_string(data, &mut offset)?;

        Ok(SheetInfo { sheet_type, name })
    }

    /// Split the post-globals records into per-sheet groups (each BOF..EOF
    /// pair is one substream).
    fn split_sheet_records(records: &[BiffRecord]) -> Vec<Vec<&BiffRecord>> {
        let mut groups: Vec<Vec<&BiffRecord>> = Vec::new();
        let mut current: Option<Vec<&BiffRecord>> = None;
        let mut depth = 0i32;

        for rec in records {
            match rec.record_type {
                records::BOF => {
                    if depth == 0 {
                        current = Some(Vec::new());
                    }
                    depth += 1;
                }
                records::EOF => {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(group) = current.take() {
                            groups.push(group);
                        }
                    }
                }
                _ => {
                    if let Some(ref mut group) = current {
                        group.push(rec);
                    }
                }
            }
        }

        groups
    }

    /// Parse cell records from a sheet's record group into the grid.
    fn parse_sheet_records(
        records: &[&BiffRecord],
        sheet: &mut Sheet,
        sst: &[String],
    ) -> XlsResult<()> {
        // A FORMULA with a string result is followed by a STRING record
        // carrying the cached text.
        let mut pending_formula_cell: Option<(u32, u16)> = None;

        for rec in records {
            match rec.record_type {
                records::LABELSST => {
                    Self::parse_labelsst(&rec.data, sheet, sst)?;
                    pending_formula_cell = None;
                }
                records::LABEL => {
                    Self::parse_label(&rec.data, sheet)?;
                    pending_formula_cell = None;
                }
                records::NUMBER => {
                    Self::parse_number(&rec.data, sheet)?;
                    pending_formula_cell = None;
                }
                records::RK => {
                    Self::parse_rk(&rec.data, sheet)?;
                    pending_formula_cell = None;
                }
                records::MULRK => {
                    Self::parse_mulrk(&rec.data, sheet)?;
                    pending_formula_cell = None;
                }
                records::BOOLERR => {
                    Self::parse_boolerr(&rec.data, sheet)?;
                    pending_formula_cell = None;
                }
                records::FORMULA => {
                    pending_formula_cell = Self::parse_formula(&rec.data, sheet)?;
                }
                records::STRING => {
                    if let Some((row, col)) = pending_formula_cell.take() {
                        let mut off = 0;
                        let text = read_unicode_string(&rec.data, &mut off)?;
                        sheet.set_value(row, col, CellValue::String(text));
                    }
                }
                _ => {
                    // Skip structural/style records
                }
            }
        }

        Ok(())
    }

    // ── Cell record parsers ──────────────────────────────────────────────

    /// LABELSST: row(2) + col(2) + xf(2) + sst_index(4)
    fn parse_labelsst(data: &[u8], sheet: &mut Sheet, sst: &[String]) -> XlsResult<()> {
        let mut off = 0;
        let row = read_u16(data, &mut off)? as u32;
        let col = read_u16(data, &mut off)?;
        let _xf = read_u16(data, &mut off)?;
        let sst_idx = read_u32(data, &mut off)? as usize;

        if let Some(s) = sst.get(sst_idx) {
            sheet.set_value(row, col, CellValue::string(s));
        }
        Ok(())
    }

    /// LABEL: row(2) + col(2) + xf(2) + unicode_string
    fn parse_label(data: &[u8], sheet: &mut Sheet) -> XlsResult<()> {
        let mut off = 0;
        let row = read_u16(data, &mut off)? as u32;
        let col = read_u16(data, &mut off)?;
        let _xf = read_u16(data, &mut off)?;
        let text = read_unicode_string(data, &mut off)?;

        sheet.set_value(row, col, CellValue::String(text));
        Ok(())
    }

    /// NUMBER: row(2) + col(2) + xf(2) + f64(8)
    fn parse_number(data: &[u8], sheet: &mut Sheet) -> XlsResult<()> {
        let mut off = 0;
        let row = read_u16(data, &mut off)? as u32;
        let col = read_u16(data, &mut off)?;
        let _xf = read_u16(data, &mut off)?;
        let value = read_f64(data, &mut off)?;

        sheet.set_value(row, col, CellValue::Number(value));
        Ok(())
    }

    /// RK: row(2) + col(2) + xf(2) + rk(4)
    fn parse_rk(data: &[u8], sheet: &mut Sheet) -> XlsResult<()> {
        let mut off = 0;
        let row = read_u16(data, &mut off)? as u32;
        let col = read_u16(data, &mut off)?;
        let _xf = read_u16(data, &mut off)?;
        let value = read_rk(data, &mut off)?;

        sheet.set_value(row, col, CellValue::Number(value));
        Ok(())
    }

    /// MULRK: row(2) + first_col(2) + [xf(2) + rk(4)]* + last_col(2)
    fn parse_mulrk(data: &[u8], sheet: &mut Sheet) -> XlsResult<()> {
        let mut off = 0;
        let row = read_u16(data, &mut off)? as u32;
        let first_col = read_u16(data, &mut off)?;

        if data.len() < 6 {
            return Err(XlsError::Parse("MULRK record too short".into()));
        }
        let last_col = u16::from_le_bytes([data[data.len() - 2], data[data.len() - 1]]);
        let rk_data_end = data.len() - 2; // exclude the trailing last_col field

        // Widened so a file-supplied last_col of 0xFFFF cannot wrap the
        // column counter.
        let mut col = first_col as u32;
        while off + 6 <= rk_data_end && col <= last_col as u32 {
            let _xf = read_u16(data, &mut off)?;
            let value = read_rk(data, &mut off)?;
            sheet.set_value(row, col as u16, CellValue::Number(value));
            col += 1;
        }

        Ok(())
    }

    /// BOOLERR: row(2) + col(2) + xf(2) + value(1) + is_error(1)
    ///
    /// Error cells carry no value the extraction engine can use and are
    /// left blank.
    fn parse_boolerr(data: &[u8], sheet: &mut Sheet) -> XlsResult<()> {
        let mut off = 0;
        let row = read_u16(data, &mut off)? as u32;
        let col = read_u16(data, &mut off)?;
        let _xf = read_u16(data, &mut off)?;
        let val = data.get(off).copied().unwrap_or(0);
        off += 1;
        let is_error = data.get(off).copied().unwrap_or(0);

        if is_error == 0 {
            sheet.set_value(row, col, CellValue::Boolean(val != 0));
        }
        Ok(())
    }

    /// FORMULA: row(2) + col(2) + xf(2) + result(8) + options(2) + ...
    ///
    /// Only the cached result matters here; the formula bytes are ignored.
    /// Returns the (row, col) if the cached result is a string (meaning a
    /// STRING record follows with the text).
    fn parse_formula(data: &[u8], sheet: &mut Sheet) -> XlsResult<Option<(u32, u16)>> {
        if data.len() < 20 {
            return Err(XlsError::Parse("FORMULA record too short".into()));
        }

        let mut off = 0;
        let row = read_u16(data, &mut off)? as u32;
        let col = read_u16(data, &mut off)?;
        let _xf = read_u16(data, &mut off)?;

        let result_bytes: [u8; 8] = data[off..off + 8]
            .try_into()
            .expect("length checked above");

        // Special (non-numeric) results have bytes 6-7 == 0xFFFF
        if result_bytes[6] == 0xFF && result_bytes[7] == 0xFF {
            match result_bytes[0] {
                0x00 => {
                    // Cached string follows in a STRING record
                    return Ok(Some((row, col)));
                }
                0x01 => {
                    sheet.set_value(row, col, CellValue::Boolean(result_bytes[2] != 0));
                }
                _ => {
                    // Error or empty cached result; leave the cell blank
                }
            }
        } else {
            let value = f64::from_le_bytes(result_bytes);
            sheet.set_value(row, col, CellValue::Number(value));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(record_type: u16, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&record_type.to_le_bytes());
        out.extend_from_slice(&(body.len() as u16).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    fn cell_header(row: u16, col: u16) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&row.to_le_bytes());
        out.extend_from_slice(&col.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // xf
        out
    }

    /// Build a minimal single-sheet BIFF8 stream for parser tests.
    fn build_stream(date_1904: bool, cells: &[Vec<u8>]) -> Vec<u8> {
        let mut stream = Vec::new();

        // Globals substream
        stream.extend(rec(records::BOF, &[0x00, 0x06, 0x05, 0x00, 0, 0, 0, 0]));
        stream.extend(rec(
            records::DATEMODE,
            &(if date_1904 { 1u16 } else { 0u16 }).to_le_bytes(),
        ));
        // SST with one string "SUB TOTAL"
        let mut sst = Vec::new();
        sst.extend_from_slice(&1u32.to_le_bytes());
        sst.extend_from_slice(&1u32.to_le_bytes());
        sst.extend_from_slice(&[0x09, 0x00, 0x00]);
        sst.extend_from_slice(b"SUB TOTAL");
        stream.extend(rec(records::SST, &sst));
        // BOUNDSHEET: offset(4) + visibility(1) + type(1) + short name
        let mut bs = Vec::new();
        bs.extend_from_slice(&0u32.to_le_bytes());
        bs.push(0); // visible
        bs.push(records::SHEET_TYPE_WORKSHEET);
        bs.extend_from_slice(&[0x06, 0x00]);
        bs.extend_from_slice(b"Sheet1");
        stream.extend(rec(records::BOUNDSHEET, &bs));
        stream.extend(rec(records::EOF, &[]));

        // Worksheet substream
        stream.extend(rec(records::BOF, &[0x00, 0x06, 0x10, 0x00, 0, 0, 0, 0]));
        for cell in cells {
            stream.extend_from_slice(cell);
        }
        stream.extend(rec(records::EOF, &[]));

        stream
    }

    /// Wrap a BIFF stream in a CFB container with a Workbook stream.
    fn build_cfb(stream: &[u8]) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut cfb = cfb::CompoundFile::create(cursor).unwrap();
        {
            use std::io::Write;
            let mut s = cfb.create_stream("/Workbook").unwrap();
            s.write_all(stream).unwrap();
        }
        cfb.into_inner().into_inner()
    }

    #[test]
    fn test_read_minimal_workbook() {
        // A2 = shared string 0, E2 = NUMBER 1500.5, B1 = RK 42
        let mut labelsst = cell_header(1, 0);
        labelsst.extend_from_slice(&0u32.to_le_bytes());
        let labelsst = rec(records::LABELSST, &labelsst);

        let mut number = cell_header(1, 4);
        number.extend_from_slice(&1500.5f64.to_le_bytes());
        let number = rec(records::NUMBER, &number);

        let mut rk = cell_header(0, 1);
        rk.extend_from_slice(&(((42u32) << 2) | 0x02).to_le_bytes());
        let rk = rec(records::RK, &rk);

        let data = build_cfb(&build_stream(false, &[labelsst, number, rk]));
        let xls = XlsReader::read(Cursor::new(data)).unwrap();

        assert_eq!(xls.date_system, DateSystem::V1900);
        assert_eq!(
            xls.sheet.value_at(1, 0),
            Some(&CellValue::string("SUB TOTAL"))
        );
        assert_eq!(xls.sheet.value_at(1, 4), Some(&CellValue::Number(1500.5)));
        assert_eq!(xls.sheet.value_at(0, 1), Some(&CellValue::Number(42.0)));
        assert_eq!(xls.sheet.nrows(), 2);
    }

    #[test]
    fn test_mulrk_ending_at_last_column() {
        // A MULRK run reaching column 0xFFFF must terminate cleanly
        let mut body = Vec::new();
        body.extend_from_slice(&0u16.to_le_bytes()); // row
        body.extend_from_slice(&0xFFFEu16.to_le_bytes()); // first col
        for v in [7u32, 8u32] {
            body.extend_from_slice(&0u16.to_le_bytes()); // xf
            body.extend_from_slice(&((v << 2) | 0x02).to_le_bytes());
        }
        body.extend_from_slice(&0xFFFFu16.to_le_bytes()); // last col
        let mulrk = rec(records::MULRK, &body);

        let data = build_cfb(&build_stream(false, &[mulrk]));
        let xls = XlsReader::read(Cursor::new(data)).unwrap();

        assert_eq!(xls.sheet.value_at(0, 0xFFFE), Some(&CellValue::Number(7.0)));
        assert_eq!(xls.sheet.value_at(0, 0xFFFF), Some(&CellValue::Number(8.0)));
    }

    #[test]
    fn test_date_mode_1904() {
        let data = build_cfb(&build_stream(true, &[]));
        let xls = XlsReader::read(Cursor::new(data)).unwrap();
        assert_eq!(xls.date_system, DateSystem::V1904);
    }

    #[test]
    fn test_not_a_cfb_file() {
        let garbage = b"this is not a spreadsheet at all".to_vec();
        assert!(XlsReader::read(Cursor::new(garbage)).is_err());
    }

    #[test]
    fn test_missing_workbook_stream() {
        let cursor = Cursor::new(Vec::new());
        let mut cfb = cfb::CompoundFile::create(cursor).unwrap();
        {
            use std::io::Write;
            let mut s = cfb.create_stream("/Unrelated").unwrap();
            s.write_all(b"x").unwrap();
        }
        let data = cfb.into_inner().into_inner();

        let err = XlsReader::read(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, XlsError::InvalidFormat(_)));
    }
}
