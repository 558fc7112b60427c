//! The generate step: renamed copies plus the summary report
//!
//! Eligible records (OK and duplicates with a usable project id) are
//! copied into the output folder under a normalized name, then a single
//! summary workbook covering the same records is written next to them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};

use crate::cancel::CancelFlag;
use crate::error::{EngineError, EngineResult};
use pcmscan_core::dates::year_from_display;
use pcmscan_core::{sanitize_filename, ProjectRecord};
use pcmscan_xlsx::ReportWriter;

/// What a completed generate run produced.
#[derive(Debug)]
pub struct GenerateOutcome {
    /// Number of files copied (failed copies are logged and not counted)
    pub copied: usize,
    /// Path of the summary workbook
    pub report_path: PathBuf,
}

/// Copy eligible source files into `output_folder` under the
/// "PCM {id} {year} {customer}" template and write the summary report.
///
/// Within-run name collisions get a " (n)" suffix; a pre-existing file on
/// disk from an earlier run is overwritten. A single failed copy is
/// logged and skipped; its record still appears in the report.
pub fn generate(
    records: &[ProjectRecord],
    output_folder: &Path,
    cancel: &CancelFlag,
) -> EngineResult<GenerateOutcome> {
    let eligible: Vec<ProjectRecord> = records
        .iter()
        .filter(|r| r.is_exportable())
        .cloned()
        .collect();

    std::fs::create_dir_all(output_folder)?;

    let mut created: HashSet<PathBuf> = HashSet::new();
    let mut copied = 0usize;
    for record in &eligible {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let target = output_folder.join(unique_name(record, &created));
        created.insert(target.clone());

        match std::fs::copy(&record.source_path, &target) {
            Ok(_) => copied += 1,
            Err(e) => {
                log::warn!(
                    "copy {} -> {} failed: {e}",
                    record.source_path.display(),
                    target.display()
                );
            }
        }
    }

    let report_path = ReportWriter::write_summary(&eligible, output_folder)?;
    log::info!("generated {copied} copies and {}", report_path.display());

    Ok(GenerateOutcome {
        copied,
        report_path,
    })
}

/// Target file name for a record, unique among the names created so far.
fn unique_name(record: &ProjectRecord, created: &HashSet<PathBuf>) -> String {
    let pid = sanitize_filename(record.project_id.trim());
    let customer = sanitize_filename(record.customer_name.trim());
    let year = year_from_display(&record.project_date_display)
        .unwrap_or_else(|| Local::now().year().to_string());
    let ext = record
        .source_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    let base = format!("PCM {pid} {year} {customer}");
    let mut name = format!("{base}{ext}");
    let mut counter = 1;
    while created.iter().any(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy() == name.as_str())
            .unwrap_or(false)
    }) {
        name = format!("{base} ({counter}){ext}");
        counter += 1;
    }
    name
}
