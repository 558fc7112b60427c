//! Summary report writer
//!
//! Produces the `PCM {year} SUMMARY.xlsx` workbook: a title cell, a styled
//! 21-column header row, one data row per exported record (duplicates
//! highlighted), and a grand-total row. Derived columns are written as
//! formulas so the numbers stay live when the report is edited.

use std::fs::File;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::XlsxResult;
use pcmscan_core::dates::{format_display, serial_from_datetime, SENTINEL_DATE};
use pcmscan_core::{ProjectRecord, RecordStatus, LOCAL_CURRENCY};

/// Report column headers, in sheet order (columns A through U).
const HEADERS: [&str; 21] = [
    "File name",
    "No",
    "Project no.",
    "Busunit",
    "Proj date",
    "Cust name",
    "Ccy",
    "Project value",
    "Kurs",
    "Proj IDR",
    "BARANG&JASA",
    "Penalty",
    "Warranty",
    "Freight",
    "Cost (estd.)",
    "CM booked",
    "CR booked",
    "CM IDR",
    "CM %",
    "COST %",
    "Ket.",
];

const HEADER_ROW: u32 = 3;
const COL_COUNT: u32 = HEADERS.len() as u32;

/// Columns summed in the grand-total row (1-based).
const SUM_COLS: [u32; 9] = [8, 10, 11, 12, 13, 14, 15, 16, 18];

// Fixed cellXfs indices; must match the table in `styles_xml`.
const XF_TITLE: u32 = 1;
const XF_HEADER: u32 = 2;
const XF_DATA: u32 = 3;
const XF_DATE: u32 = 4;
const XF_THOUSANDS: u32 = 5;
const XF_RATE: u32 = 6;
const XF_PERCENT: u32 = 7;
/// Duplicate-row styles are the data styles shifted by this much.
const XF_DUP_OFFSET: u32 = 5;
const XF_TOTAL: u32 = 13;
const XF_TOTAL_SUM: u32 = 14;

/// Summary report writer
pub struct ReportWriter;

impl ReportWriter {
    /// Write `PCM {currentYear} SUMMARY.xlsx` into `output_dir` and return
    /// the written path.
    pub fn write_summary(records: &[ProjectRecord], output_dir: &Path) -> XlsxResult<PathBuf> {
        let title = format!("PCM {} SUMMARY", Local::now().year());
        let path = output_dir.join(format!("{title}.xlsx"));
        let file = File::create(&path)?;
        Self::write(records, &title, file)?;
        Ok(path)
    }

    /// Write the report to any writer, with an explicit title.
    pub fn write<W: Write + Seek>(
        records: &[ProjectRecord],
        title: &str,
        writer: W,
    ) -> XlsxResult<()> {
        let mut zip = zip::ZipWriter::new(writer);
        let options = zip::write::SimpleFileOptions::default();

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES_XML.as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(ROOT_RELS_XML.as_bytes())?;

        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(Self::workbook_xml(title).as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(WORKBOOK_RELS_XML.as_bytes())?;

        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(STYLES_XML.as_bytes())?;

        zip.start_file("xl/worksheets/sheet1.xml", options)?;
        zip.write_all(Self::worksheet_xml(records, title).as_bytes())?;

        zip.finish()?;
        Ok(())
    }

    fn workbook_xml(title: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>
        <sheet name="{}" sheetId="1" r:id="rId1"/>
    </sheets>
</workbook>"#,
            escape_xml(title)
        )
    }

    fn worksheet_xml(records: &[ProjectRecord], title: &str) -> String {
        let mut sheet = SheetBuilder::new();

        // Title (row 1, shifted to column B)
        sheet.open_row(1);
        sheet.text_cell(1, 2, title, XF_TITLE);
        sheet.close_row();

        // Header (row 3; row 2 stays empty)
        sheet.open_row(HEADER_ROW);
        for (i, header) in HEADERS.iter().enumerate() {
            sheet.text_cell(HEADER_ROW, i as u32 + 1, header, XF_HEADER);
        }
        sheet.close_row();

        // Data rows
        let start_data_row = HEADER_ROW + 1;
        let end_data_row = HEADER_ROW + records.len() as u32;
        for (idx, record) in records.iter().enumerate() {
            let r = start_data_row + idx as u32;
            Self::write_data_row(&mut sheet, r, idx as u32 + 1, record);
        }

        // Grand-total row
        if !records.is_empty() {
            let r = end_data_row + 1;
            sheet.open_row(r);
            for c in 1..=COL_COUNT {
                if c == 7 {
                    sheet.text_cell(r, c, "GRAND TOTAL", XF_TOTAL);
                } else if SUM_COLS.contains(&c) {
                    let col = col_letter(c);
                    sheet.formula_cell(
                        r,
                        c,
                        &format!("SUM({col}{start_data_row}:{col}{end_data_row})"),
                        XF_TOTAL_SUM,
                    );
                } else {
                    sheet.empty_cell(r, c, XF_TOTAL);
                }
            }
            sheet.close_row();
        }

        sheet.finish()
    }

    fn write_data_row(sheet: &mut SheetBuilder, r: u32, no: u32, record: &ProjectRecord) {
        let duplicate = record.status == RecordStatus::Duplicate;
        let xf = |c: u32| data_xf(c, duplicate);

        let rate = if record.currency_code == LOCAL_CURRENCY || record.exchange_rate.is_zero() {
            1.0
        } else {
            to_f64(record.exchange_rate)
        };

        sheet.open_row(r);
        sheet.text_cell(r, 1, &record.source_file_name, xf(1));
        sheet.number_cell(r, 2, no as f64, xf(2));
        sheet.text_cell(r, 3, &record.project_id, xf(3));
        sheet.empty_cell(r, 4, xf(4)); // Busunit, filled in by hand later

        // Project date: a real date serial when known, the raw display
        // text otherwise
        if record.sort_date != SENTINEL_DATE {
            sheet.date_cell(r, 5, serial_from_datetime(&record.sort_date), xf(5));
            sheet.note_width(5, format_display(&record.sort_date).len());
        } else if !record.project_date_display.is_empty() {
            sheet.text_cell(r, 5, &record.project_date_display, xf(5));
        } else {
            sheet.empty_cell(r, 5, xf(5));
        }

        sheet.text_cell(r, 6, &record.customer_name, xf(6));
        sheet.text_cell(r, 7, &record.currency_code, xf(7));
        sheet.number_cell(r, 8, to_f64(record.project_value), xf(8));
        sheet.number_cell(r, 9, rate, xf(9));
        sheet.formula_cell(r, 10, &format!("H{r}*I{r}"), xf(10));
        sheet.number_cell(r, 11, to_f64(record.sub_total), xf(11));
        sheet.number_cell(r, 12, to_f64(record.penalty), xf(12));
        sheet.number_cell(r, 13, to_f64(record.warranty), xf(13));
        sheet.number_cell(r, 14, 0.0, xf(14)); // Freight, no source column
        sheet.formula_cell(r, 15, &format!("SUM(K{r}:N{r})"), xf(15));
        sheet.number_cell(r, 16, to_f64(record.cm_booked), xf(16));
        sheet.number_cell(r, 17, to_f64(record.cr_booked), xf(17));
        sheet.formula_cell(r, 18, &format!("J{r}-O{r}"), xf(18));
        sheet.formula_cell(r, 19, &format!("IF(J{r}=0, 0, R{r}/J{r})"), xf(19));
        sheet.formula_cell(r, 20, &format!("IF(S{r}=0, 0, 1-S{r})"), xf(20));

        if duplicate {
            sheet.text_cell(r, 21, "Duplikat Input", xf(21));
        } else {
            sheet.empty_cell(r, 21, xf(21));
        }
        sheet.close_row();
    }
}

fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Pick the data-cell style for a 1-based report column.
fn data_xf(col: u32, duplicate: bool) -> u32 {
    let base = match col {
        5 => XF_DATE,
        9 => XF_RATE,
        17 | 19 | 20 => XF_PERCENT,
        8 | 10..=16 | 18 => XF_THOUSANDS,
        _ => XF_DATA,
    };
    if duplicate {
        base + XF_DUP_OFFSET
    } else {
        base
    }
}

/// Column letter for 1-based columns A..Z (the report uses 21).
fn col_letter(col: u32) -> char {
    debug_assert!((1..=26).contains(&col));
    (b'A' + (col - 1) as u8) as char
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Accumulates worksheet XML and per-column text widths.
struct SheetBuilder {
    body: String,
    widths: [usize; COL_COUNT as usize],
}

impl SheetBuilder {
    fn new() -> Self {
        Self {
            body: String::new(),
            widths: [0; COL_COUNT as usize],
        }
    }

    fn open_row(&mut self, r: u32) {
        self.body.push_str(&format!("\n        <row r=\"{}\">", r));
    }

    fn close_row(&mut self) {
        self.body.push_str("\n        </row>");
    }

    fn text_cell(&mut self, r: u32, c: u32, text: &str, xf: u32) {
        if text.is_empty() {
            self.empty_cell(r, c, xf);
            return;
        }
        self.note_width(c, text.chars().count());
        self.body.push_str(&format!(
            "\n            <c r=\"{}{}\" s=\"{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
            col_letter(c),
            r,
            xf,
            escape_xml(text)
        ));
    }

    fn number_cell(&mut self, r: u32, c: u32, n: f64, xf: u32) {
        self.note_width(c, format!("{}", n).len());
        self.body.push_str(&format!(
            "\n            <c r=\"{}{}\" s=\"{}\"><v>{}</v></c>",
            col_letter(c),
            r,
            xf,
            n
        ));
    }

    /// A date serial; width is noted separately by the caller because the
    /// rendered form differs from the stored number.
    fn date_cell(&mut self, r: u32, c: u32, serial: f64, xf: u32) {
        self.body.push_str(&format!(
            "\n            <c r=\"{}{}\" s=\"{}\"><v>{}</v></c>",
            col_letter(c),
            r,
            xf,
            serial
        ));
    }

    fn formula_cell(&mut self, r: u32, c: u32, formula: &str, xf: u32) {
        self.note_width(c, formula.len() + 1);
        self.body.push_str(&format!(
            "\n            <c r=\"{}{}\" s=\"{}\"><f>{}</f></c>",
            col_letter(c),
            r,
            xf,
            escape_xml(formula)
        ));
    }

    fn empty_cell(&mut self, r: u32, c: u32, xf: u32) {
        self.body.push_str(&format!(
            "\n            <c r=\"{}{}\" s=\"{}\"/>",
            col_letter(c),
            r,
            xf
        ));
    }

    fn note_width(&mut self, c: u32, len: usize) {
        let slot = &mut self.widths[(c - 1) as usize];
        *slot = (*slot).max(len);
    }

    fn finish(self) -> String {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        // Column widths: longest cell text + 2
        content.push_str("\n    <cols>");
        for (i, &w) in self.widths.iter().enumerate() {
            if w > 0 {
                content.push_str(&format!(
                    "\n        <col min=\"{0}\" max=\"{0}\" width=\"{1}\" customWidth=\"1\"/>",
                    i + 1,
                    w + 2
                ));
            }
        }
        content.push_str("\n    </cols>");

        content.push_str("\n    <sheetData>");
        content.push_str(&self.body);
        content.push_str("\n    </sheetData>\n</worksheet>");
        content
    }
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
    <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

/// Fixed style table. The cellXfs order is load-bearing: indices must
/// match the `XF_*` constants above.
const STYLES_XML: &str = r##"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="4">
    <numFmt numFmtId="164" formatCode="d-mmm-yy"/>
    <numFmt numFmtId="165" formatCode="#,##0"/>
    <numFmt numFmtId="166" formatCode="#,##0.00"/>
    <numFmt numFmtId="167" formatCode="0.00%"/>
  </numFmts>
  <fonts count="3">
    <font><sz val="11"/><name val="Calibri"/></font>
    <font><b/><sz val="11"/><name val="Calibri"/></font>
    <font><b/><sz val="14"/><name val="Calibri"/></font>
  </fonts>
  <fills count="4">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FF00FFFF"/><bgColor indexed="64"/></patternFill></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="4">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left style="thin"><color indexed="64"/></left><right style="thin"><color indexed="64"/></right><top style="thin"><color indexed="64"/></top><bottom style="thin"><color indexed="64"/></bottom><diagonal/></border>
    <border><left style="thin"><color indexed="64"/></left><right style="thin"><color indexed="64"/></right><top/><bottom/><diagonal/></border>
    <border><left/><right/><top style="thin"><color indexed="64"/></top><bottom style="medium"><color indexed="64"/></bottom><diagonal/></border>
  </borders>
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>
  <cellXfs count="15">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="0" fontId="2" fillId="0" borderId="0" xfId="0" applyFont="1"/>
    <xf numFmtId="0" fontId="1" fillId="2" borderId="1" xfId="0" applyFont="1" applyFill="1" applyBorder="1" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf>
    <xf numFmtId="0" fontId="0" fillId="0" borderId="2" xfId="0" applyBorder="1"/>
    <xf numFmtId="164" fontId="0" fillId="0" borderId="2" xfId="0" applyNumberFormat="1" applyBorder="1"/>
    <xf numFmtId="165" fontId="0" fillId="0" borderId="2" xfId="0" applyNumberFormat="1" applyBorder="1"/>
    <xf numFmtId="166" fontId="0" fillId="0" borderId="2" xfId="0" applyNumberFormat="1" applyBorder="1"/>
    <xf numFmtId="167" fontId="0" fillId="0" borderId="2" xfId="0" applyNumberFormat="1" applyBorder="1"/>
    <xf numFmtId="0" fontId="0" fillId="3" borderId="2" xfId="0" applyFill="1" applyBorder="1"/>
    <xf numFmtId="164" fontId="0" fillId="3" borderId="2" xfId="0" applyNumberFormat="1" applyFill="1" applyBorder="1"/>
    <xf numFmtId="165" fontId="0" fillId="3" borderId="2" xfId="0" applyNumberFormat="1" applyFill="1" applyBorder="1"/>
    <xf numFmtId="166" fontId="0" fillId="3" borderId="2" xfId="0" applyNumberFormat="1" applyFill="1" applyBorder="1"/>
    <xf numFmtId="167" fontId="0" fillId="3" borderId="2" xfId="0" applyNumberFormat="1" applyFill="1" applyBorder="1"/>
    <xf numFmtId="0" fontId="1" fillId="0" borderId="3" xfId="0" applyFont="1" applyBorder="1"/>
    <xf numFmtId="165" fontId="1" fillId="0" borderId="3" xfId="0" applyNumberFormat="1" applyFont="1" applyBorder="1"/>
  </cellXfs>
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>
  <dxfs count="0"/>
  <tableStyles count="0" defaultTableStyle="TableStyleMedium9" defaultPivotStyle="PivotStyleLight16"/>
</styleSheet>"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::XlsxReader;
    use pcmscan_core::CellValue;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Read};

    fn sample_record(id: &str, status: RecordStatus) -> ProjectRecord {
        let mut rec = ProjectRecord::new();
        rec.status = status;
        rec.project_id = id.into();
        rec.customer_name = "Acme".into();
        rec.source_file_name = format!("{id}.xlsx");
        rec.project_value = Decimal::from(1_000_000);
        rec.sub_total = Decimal::from(750_000);
        rec.sort_date = chrono::NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        rec.project_date_display = "10-Mar-25".into();
        rec
    }

    fn part_text(data: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(data.to_vec())).unwrap();
        let mut out = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_report_layout() {
        let records = vec![
            sample_record("P100", RecordStatus::Ok),
            sample_record("P200", RecordStatus::Duplicate),
        ];

        let mut buf = Vec::new();
        ReportWriter::write(&records, "PCM 2025 SUMMARY", Cursor::new(&mut buf)).unwrap();

        let sheet = part_text(&buf, "xl/worksheets/sheet1.xml");
        // Title and headers
        assert!(sheet.contains("PCM 2025 SUMMARY"));
        assert!(sheet.contains("Project no."));
        assert!(sheet.contains("BARANG&amp;JASA"));
        // Derived columns are formulas, first data row is 4
        assert!(sheet.contains("<f>H4*I4</f>"));
        assert!(sheet.contains("<f>SUM(K4:N4)</f>"));
        assert!(sheet.contains("<f>J5-O5</f>"));
        assert!(sheet.contains("<f>IF(J4=0, 0, R4/J4)</f>"));
        // Duplicate marking
        assert!(sheet.contains("Duplikat Input"));
        // Grand total sums the data rows (rows 4..5, total row 6)
        assert!(sheet.contains("<f>SUM(H4:H5)</f>"));
        assert!(sheet.contains("GRAND TOTAL"));
    }

    #[test]
    fn test_no_total_row_without_records() {
        let mut buf = Vec::new();
        ReportWriter::write(&[], "PCM 2025 SUMMARY", Cursor::new(&mut buf)).unwrap();

        let sheet = part_text(&buf, "xl/worksheets/sheet1.xml");
        assert!(!sheet.contains("GRAND TOTAL"));
        assert!(sheet.contains("Project no."));
    }

    #[test]
    fn test_rate_defaults_to_one_for_local_currency() {
        let mut rec = sample_record("P100", RecordStatus::Ok);
        rec.currency_code = "IDR".into();
        rec.exchange_rate = Decimal::from(15_000);

        let mut buf = Vec::new();
        ReportWriter::write(&[rec], "PCM 2025 SUMMARY", Cursor::new(&mut buf)).unwrap();

        // Kurs is column I, first data row is 4
        let sheet = part_text(&buf, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"<c r="I4" s="6"><v>1</v></c>"#));
    }

    #[test]
    fn test_report_reads_back() {
        let records = vec![sample_record("P100", RecordStatus::Ok)];

        let mut buf = Vec::new();
        ReportWriter::write(&records, "PCM 2025 SUMMARY", Cursor::new(&mut buf)).unwrap();

        let xlsx = XlsxReader::read(Cursor::new(buf)).unwrap();
        // Title at B1
        assert_eq!(
            xlsx.sheet.value_at(0, 1),
            Some(&CellValue::string("PCM 2025 SUMMARY"))
        );
        // First header at A3, project id at C4
        assert_eq!(
            xlsx.sheet.value_at(2, 0),
            Some(&CellValue::string("File name"))
        );
        assert_eq!(xlsx.sheet.value_at(3, 2), Some(&CellValue::string("P100")));
        // The date cell round-trips through the d-mmm-yy style
        assert_eq!(
            xlsx.sheet.value_at(3, 4),
            Some(&CellValue::DateTime(records[0].sort_date))
        );
    }

    #[test]
    fn test_write_summary_names_file_by_year() {
        let dir = tempfile::tempdir().unwrap();
        let path = ReportWriter::write_summary(&[], dir.path()).unwrap();

        let expected = format!("PCM {} SUMMARY.xlsx", Local::now().year());
        assert_eq!(path.file_name().unwrap().to_string_lossy(), expected);
        assert!(path.exists());
    }
}
