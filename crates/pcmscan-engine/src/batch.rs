//! Folder scanning and batch classification
//!
//! One record per candidate file. Scanning never fails as a whole: file
//! level errors become `Error`-status records, an unreadable folder logs
//! a warning and yields an empty batch, and a raised cancel flag returns
//! the records produced so far.

use std::collections::HashMap;
use std::path::Path;

use crate::adapter::SheetAdapter;
use crate::cancel::CancelFlag;
use crate::extract::{extract, Anchors};
use pcmscan_core::{ProjectRecord, RecordStatus};
use pcmscan_xls::XlsReader;
use pcmscan_xlsx::XlsxReader;

/// Prefix of Office lock files left behind while a workbook is open.
const LOCK_FILE_PREFIX: &str = "~$";

/// Extract a single file into a record, never returning an error.
pub fn extract_file(path: &Path) -> ProjectRecord {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    let anchors = Anchors::default();
    let mut record = match ext.as_deref() {
        Some("xls") => match XlsReader::read_file(path) {
            Ok(sheet) => extract(&SheetAdapter::Xls(sheet), &anchors),
            Err(e) => ProjectRecord::failed(RecordStatus::Error, format!("XLS Error: {e}")),
        },
        Some("xlsx") => match XlsxReader::read_file(path) {
            Ok(sheet) => extract(&SheetAdapter::Xlsx(sheet), &anchors),
            Err(e) => ProjectRecord::failed(RecordStatus::Error, format!("XLSX Error: {e}")),
        },
        _ => ProjectRecord::failed(RecordStatus::Skip, "Unsupported format"),
    };

    // A parse that succeeded but produced no project id is unusable for
    // both dedup and export
    if record.status == RecordStatus::Ok && record.project_id.trim().is_empty() {
        record.status = RecordStatus::ParsingError;
        record.error_message = Some("Project No empty".into());
    }

    record
}

/// Scan a folder of cost sheets into a classified, sorted batch.
///
/// Files are processed in name order; records come back sorted by project
/// date with unknown dates first, ties keeping processing order.
pub fn scan_folder(folder: &Path, cancel: &CancelFlag) -> Vec<ProjectRecord> {
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("cannot read folder {}: {e}", folder.display());
            return Vec::new();
        }
    };

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_candidate(p))
        .collect();
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        if cancel.is_cancelled() {
            log::info!("scan cancelled after {} files", records.len());
            break;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::debug!("extracting {name}");

        let mut record = extract_file(&path);
        record.source_file_name = name;
        record.source_path = path;
        records.push(record);
    }

    classify_duplicates(&mut records);
    records.sort_by_key(|r| r.sort_date);
    records
}

fn is_candidate(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };
    if name.starts_with(LOCK_FILE_PREFIX) {
        return false;
    }
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()).as_deref(),
        Some("xls") | Some("xlsx")
    )
}

/// Reclassify OK records whose project id appears more than once.
///
/// Every colliding record becomes a duplicate; non-OK records never take
/// part, so a failed re-parse of the same sheet does not taint a good one.
fn classify_duplicates(records: &mut [ProjectRecord]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records.iter() {
        if record.status == RecordStatus::Ok {
            *counts.entry(record.project_id.trim().to_string()).or_insert(0) += 1;
        }
    }

    for record in records.iter_mut() {
        if record.status == RecordStatus::Ok
            && counts.get(record.project_id.trim()).copied().unwrap_or(0) > 1
        {
            record.status = RecordStatus::Duplicate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcmscan_core::dates::SENTINEL_DATE;
    use pretty_assertions::assert_eq;

    fn ok_record(pid: &str) -> ProjectRecord {
        let mut rec = ProjectRecord::new();
        rec.project_id = pid.to_string();
        rec
    }

    #[test]
    fn test_extract_file_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let record = extract_file(&path);
        assert_eq!(record.status, RecordStatus::Skip);
        assert_eq!(record.error_message.as_deref(), Some("Unsupported format"));
    }

    #[test]
    fn test_extract_file_corrupt_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"this is not a zip archive").unwrap();

        let record = extract_file(&path);
        assert_eq!(record.status, RecordStatus::Error);
        assert!(record.error_message.unwrap().starts_with("XLSX Error: "));
    }

    #[test]
    fn test_extract_file_corrupt_xls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xls");
        std::fs::write(&path, b"this is not a compound file").unwrap();

        let record = extract_file(&path);
        assert_eq!(record.status, RecordStatus::Error);
        assert!(record.error_message.unwrap().starts_with("XLS Error: "));
    }

    #[test]
    fn test_is_candidate() {
        assert!(is_candidate(Path::new("/f/a.xls")));
        assert!(is_candidate(Path::new("/f/a.XLSX")));
        assert!(!is_candidate(Path::new("/f/a.csv")));
        assert!(!is_candidate(Path::new("/f/noext")));
        assert!(!is_candidate(Path::new("/f/~$open.xlsx")));
    }

    #[test]
    fn test_classify_duplicates() {
        let mut batch = vec![
            ok_record("P100"),
            ok_record(" P100 "),
            ok_record("P200"),
            ProjectRecord::failed(RecordStatus::Error, "bad"),
        ];
        classify_duplicates(&mut batch);

        assert_eq!(batch[0].status, RecordStatus::Duplicate);
        assert_eq!(batch[1].status, RecordStatus::Duplicate);
        assert_eq!(batch[2].status, RecordStatus::Ok);
        assert_eq!(batch[3].status, RecordStatus::Error);
    }

    #[test]
    fn test_scan_missing_folder_is_empty() {
        let records = scan_folder(Path::new("/no/such/folder"), &CancelFlag::new());
        assert!(records.is_empty());
    }

    #[test]
    fn test_scan_skips_non_spreadsheets_and_locks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md"), "x").unwrap();
        std::fs::write(dir.path().join("~$locked.xlsx"), "x").unwrap();
        std::fs::write(dir.path().join("bad.xls"), "x").unwrap();

        let records = scan_folder(dir.path(), &CancelFlag::new());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, RecordStatus::Error);
        assert_eq!(records[0].source_file_name, "bad.xls");
        assert_eq!(records[0].sort_date, SENTINEL_DATE);
    }

    #[test]
    fn test_scan_pre_cancelled_returns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.xls"), "x").unwrap();

        let cancel = CancelFlag::new();
        cancel.cancel();
        assert!(scan_folder(dir.path(), &cancel).is_empty());
    }
}
