//! BIFF8 (Binary Interchange File Format) record handling.
//!
//! A BIFF8 stream is a sequence of records, each with a 4-byte header
//! (2 bytes record type + 2 bytes body length) followed by the body.
//! CONTINUE records (type 0x003C) extend the body of the preceding record
//! beyond the 8224-byte per-record limit.

pub mod parser;
pub mod records;
pub mod strings;

use crate::error::{XlsError, XlsResult};
use std::io::{Read, Seek};

/// A single BIFF8 record (with CONTINUE bodies already merged).
#[derive(Debug)]
pub struct BiffRecord {
    /// Record type ID (e.g. `records::SST`, `records::NUMBER`).
    pub record_type: u16,
    /// Record body bytes (CONTINUE records have been concatenated).
    pub data: Vec<u8>,
}

/// Reads all BIFF8 records from a byte stream, merging CONTINUE records
/// into their parent.
pub fn read_all_records<R: Read + Seek>(stream: &mut R) -> XlsResult<Vec<BiffRecord>> {
    let mut records: Vec<BiffRecord> = Vec::new();
    let mut header_buf = [0u8; 4];

    loop {
        // Read 4-byte record header
        match stream.read_exact(&mut header_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(XlsError::Io(e)),
        }

        let record_type = u16::from_le_bytes([header_buf[0], header_buf[1]]);
        let body_len = u16::from_le_bytes([header_buf[2], header_buf[3]]) as usize;

        let mut body = vec![0u8; body_len];
        if body_len > 0 {
            stream.read_exact(&mut body).map_err(XlsError::Io)?;
        }

        if record_type == records::CONTINUE {
            // Append to the previous record's data; an orphaned CONTINUE
            // with no parent is dropped.
            if let Some(prev) = records.last_mut() {
                prev.data.extend_from_slice(&body);
            }
        } else {
            records.push(BiffRecord { record_type, data: body });
        }
    }

    Ok(records)
}

/// Extract the BOF record fields from a record body.
///
/// Returns `(version, substream_type)`:
/// - `version` should be `0x0600` for BIFF8
/// - `substream_type`: 0x0005 = workbook globals, 0x0010 = worksheet, etc.
pub fn parse_bof(data: &[u8]) -> XlsResult<(u16, u16)> {
    if data.len() < 4 {
        return Err(XlsError::InvalidFormat("BOF record too short".into()));
    }
    let version = u16::from_le_bytes([data[0], data[1]]);
    let dt = u16::from_le_bytes([data[2], data[3]]);
    Ok((version, dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record_bytes(record_type: u16, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&record_type.to_le_bytes());
        out.extend_from_slice(&(body.len() as u16).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn test_read_records_merges_continue() {
        let mut stream = Vec::new();
        stream.extend(record_bytes(records::SST, &[1, 2]));
        stream.extend(record_bytes(records::CONTINUE, &[3, 4]));
        stream.extend(record_bytes(records::EOF, &[]));

        let recs = read_all_records(&mut Cursor::new(stream)).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].record_type, records::SST);
        assert_eq!(recs[0].data, vec![1, 2, 3, 4]);
        assert_eq!(recs[1].record_type, records::EOF);
    }

    #[test]
    fn test_parse_bof() {
        let body = [0x00, 0x06, 0x05, 0x00, 0, 0, 0, 0];
        let (version, dt) = parse_bof(&body).unwrap();
        assert_eq!(version, records::BIFF8_VERSION);
        assert_eq!(dt, records::BOF_WORKBOOK_GLOBALS);
    }
}
