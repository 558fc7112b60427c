//! Number format classification for date-typed cells.
//!
//! XLSX stores dates as plain numbers; whether a cell holds a date is
//! decided by its number format. A numeric cell is date-typed when its
//! cellXfs entry points at a builtin date format (ids 14-22 and 45-47)
//! or at a custom format whose code contains date/time tokens outside
//! quoted literals and bracket sections.

use std::collections::HashMap;
use std::io::{BufReader, Read};

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};

/// Builtin number format ids that render as dates or times.
pub fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 45..=47)
}

/// Decide whether a custom format code renders as a date or time.
///
/// Scans for `y`, `m`, `d`, `h` or `s` tokens, skipping `"..."` literals,
/// `[...]` sections (colors, conditions, elapsed-time markers) and
/// backslash-escaped characters.
pub fn is_date_format_code(code: &str) -> bool {
    let mut chars = code.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            '[' => {
                for b in chars.by_ref() {
                    if b == ']' {
                        break;
                    }
                }
            }
            '\\' => {
                chars.next();
            }
            'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }

    false
}

/// Parse styles.xml and return, for each cellXfs entry, whether that
/// style index is a date format.
pub(crate) fn read_date_styles<R: Read>(reader: R) -> XlsxResult<Vec<bool>> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut custom_formats: HashMap<u32, String> = HashMap::new();
    let mut date_styles: Vec<bool> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"numFmt" => {
                    let mut id = None;
                    let mut code = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"numFmtId" => {
                                id = attr.unescape_value().ok().and_then(|s| s.parse().ok());
                            }
                            b"formatCode" => {
                                code = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            _ => {}
                        }
                    }
                    if let (Some(id), Some(code)) = (id, code) {
                        custom_formats.insert(id, code);
                    }
                }
                b"cellXfs" => {
                    in_cell_xfs = true;
                }
                b"xf" if in_cell_xfs => {
                    let mut num_fmt_id = 0u32;
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"numFmtId" {
                            num_fmt_id = attr
                                .unescape_value()
                                .ok()
                                .and_then(|s| s.parse().ok())
                                .unwrap_or(0);
                        }
                    }
                    let is_date = is_builtin_date_format(num_fmt_id)
                        || custom_formats
                            .get(&num_fmt_id)
                            .map(|code| is_date_format_code(code))
                            .unwrap_or(false);
                    date_styles.push(is_date);
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"cellXfs" => {
                in_cell_xfs = false;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(date_styles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_date_ids() {
        assert!(is_builtin_date_format(14)); // m/d/yyyy
        assert!(is_builtin_date_format(22)); // m/d/yyyy h:mm
        assert!(is_builtin_date_format(45)); // mm:ss
        assert!(!is_builtin_date_format(0)); // General
        assert!(!is_builtin_date_format(4)); // #,##0.00
        assert!(!is_builtin_date_format(44)); // accounting
    }

    #[test]
    fn test_custom_date_codes() {
        assert!(is_date_format_code("d-mmm-yy"));
        assert!(is_date_format_code("yyyy/mm/dd"));
        assert!(is_date_format_code("hh:mm:ss"));
        assert!(is_date_format_code("DD.MM.YYYY"));
    }

    #[test]
    fn test_non_date_codes() {
        assert!(!is_date_format_code("#,##0.00"));
        assert!(!is_date_format_code("0.00%"));
        assert!(!is_date_format_code("General"));
        assert!(!is_date_format_code("0.00E+00"));
    }

    #[test]
    fn test_quoted_and_bracketed_tokens_ignored() {
        // "days" is a literal, not a date token
        assert!(!is_date_format_code("#,##0 \"days\""));
        // color section contains no date meaning
        assert!(!is_date_format_code("[Red]#,##0"));
        // escaped character
        assert!(!is_date_format_code("#,##0\\d"));
        // but real tokens after a literal still count
        assert!(is_date_format_code("\"on \"d-mmm"));
    }

    #[test]
    fn test_read_date_styles() {
        let styles = r#"<?xml version="1.0"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1">
    <numFmt numFmtId="164" formatCode="d-mmm-yy"/>
  </numFmts>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="14" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="164" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="4" fontId="0" fillId="0" borderId="0"/>
  </cellXfs>
</styleSheet>"#;

        let date_styles = read_date_styles(styles.as_bytes()).unwrap();
        assert_eq!(date_styles, vec![false, true, true, false]);
    }
}
