use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::contracts::types::{FailedRecord, ValidationReport};
use crate::ingest::normalize::NormalizationEvent;
use crate::state::map_io_error;
use crate::{ClientError, ClientResult};

pub(crate) const SCHEMA_SNAPSHOT: &str = "schema_snapshot.json";
pub(crate) const EXCEL_STRUCTURE: &str = "excel_structure.json";
pub(crate) const COMPARISON: &str = "comparison.json";
pub(crate) const ACCOUNT_MAPPING: &str = "account_mapping.json";
pub(crate) const UNBALANCED_ENTRIES: &str = "unbalanced_entries.json";
pub(crate) const VALIDATION_REPORT: &str = "validation_report.json";
pub(crate) const VALIDATION_REPORT_CSV: &str = "validation_report.csv";
pub(crate) const NORMALIZATION_EVENTS_CSV: &str = "normalization_events.csv";
pub(crate) const FAILED_RECORDS_CSV: &str = "failed_records.csv";
pub(crate) const MIGRATION_SUMMARY: &str = "migration_summary.json";
pub(crate) const VERIFICATION_REPORT: &str = "verification_report.json";

pub(crate) fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> ClientResult<PathBuf> {
    let path = dir.join(name);
    let mut content = serde_json::to_vec_pretty(value)
        .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;
    content.push(b'\n');
    fs::write(&path, content).map_err(|error| map_io_error(&path, &error))?;
    debug!(path = %path.display(), "artefact written");
    Ok(path)
}

/// One row per issue, for spreadsheet review.
pub(crate) fn write_validation_csv(dir: &Path, report: &ValidationReport) -> ClientResult<PathBuf> {
    let rows = report.issues.iter().map(|issue| {
        vec![
            issue.row.map(|row| row.to_string()).unwrap_or_default(),
            issue.entry_key.clone().unwrap_or_default(),
            issue.field.clone(),
            issue.severity.as_str().to_string(),
            issue.category.as_str().to_string(),
            issue.code.clone(),
            issue.message.clone(),
            issue.observed.clone().unwrap_or_default(),
            issue.expected.clone().unwrap_or_default(),
        ]
    });
    write_rows(
        &dir.join(VALIDATION_REPORT_CSV),
        &[
            "row", "entry_key", "field", "severity", "category", "code", "message", "observed",
            "expected",
        ],
        rows,
    )
}

/// Every cell the normaliser had to change or could not coerce.
pub(crate) fn write_normalization_csv(
    dir: &Path,
    events: &[NormalizationEvent],
) -> ClientResult<PathBuf> {
    let rows = events.iter().map(|event| {
        vec![
            event.row.to_string(),
            event.field.as_str().to_string(),
            event.category.as_str().to_string(),
            event.code.clone(),
            event.message.clone(),
            event.observed.clone().unwrap_or_default(),
        ]
    });
    write_rows(
        &dir.join(NORMALIZATION_EVENTS_CSV),
        &["row", "field", "category", "code", "message", "observed"],
        rows,
    )
}

/// Records the loader gave up on, with the payload it tried to insert.
pub(crate) fn write_failed_records_csv(dir: &Path, records: &[FailedRecord]) -> ClientResult<PathBuf> {
    let rows = records.iter().map(|record| {
        vec![
            record.entry_key.clone().unwrap_or_default(),
            record
                .source_row
                .map(|row| row.to_string())
                .unwrap_or_default(),
            record.error.clone(),
            record.payload.to_string(),
        ]
    });
    write_rows(
        &dir.join(FAILED_RECORDS_CSV),
        &["entry_key", "source_row", "error", "payload"],
        rows,
    )
}

fn write_rows<I>(path: &Path, header: &[&str], rows: I) -> ClientResult<PathBuf>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let csv_error = |error: csv::Error| ClientError::artefact_write_failed(path, &error.to_string());

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer.write_record(header).map_err(csv_error)?;
    for row in rows {
        writer.write_record(&row).map_err(csv_error)?;
    }
    writer.flush().map_err(|error| map_io_error(path, &error))?;
    debug!(path = %path.display(), "artefact written");
    Ok(path.to_path_buf())
}
