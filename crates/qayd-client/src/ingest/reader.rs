use std::collections::BTreeMap;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use tracing::{debug, info};

use crate::contracts::types::{ColumnMatch, ExcelStructureReport};
use crate::mapping::{CanonicalField, ColumnMapping};
use crate::{ClientError, ClientResult};

/// A cell exactly as the workbook stores it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawCell {
    Empty,
    Text(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
    DateSerial(f64),
    DateIso(String),
    Error(String),
}

impl RawCell {
    pub(crate) fn display(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(text) | Self::DateIso(text) | Self::Error(text) => Some(text.clone()),
            Self::Integer(value) => Some(value.to_string()),
            Self::Number(value) | Self::DateSerial(value) => Some(value.to_string()),
            Self::Bool(value) => Some(value.to_string()),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&Data> for RawCell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty => Self::Empty,
            Data::String(text) => Self::Text(text.clone()),
            Data::Int(integer) => Self::Integer(*integer),
            Data::Float(number) => Self::Number(*number),
            Data::Bool(flag) => Self::Bool(*flag),
            Data::DateTime(date_time) => Self::DateSerial(date_time.as_f64()),
            Data::DateTimeIso(text) | Data::DurationIso(text) => Self::DateIso(text.clone()),
            Data::Error(error) => Self::Error(error.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RawRow {
    /// 1-based row number in the sheet.
    pub(crate) source_row: i64,
    pub(crate) cells: BTreeMap<CanonicalField, RawCell>,
    pub(crate) extras: BTreeMap<String, RawCell>,
}

#[derive(Debug, Clone)]
pub(crate) struct SheetTable {
    pub(crate) rows: Vec<RawRow>,
    pub(crate) structure: ExcelStructureReport,
}

enum ColumnRole {
    Mapped(CanonicalField),
    Extra(String),
}

/// Fails with `header_mismatch` when a required canonical field has no source column.
pub(crate) fn require_columns(structure: &ExcelStructureReport) -> ClientResult<()> {
    if structure.missing_required.is_empty() {
        return Ok(());
    }
    let actual = structure
        .columns
        .iter()
        .map(|column| column.source_header.clone())
        .collect::<Vec<String>>();
    Err(ClientError::header_mismatch(
        structure.missing_required.clone(),
        actual,
    ))
}

/// Reads the sheet and reports its structure. Required columns are checked by [`require_columns`].
pub(crate) fn read_sheet(
    path: &Path,
    sheet_name: &str,
    mapping: &ColumnMapping,
) -> ClientResult<SheetTable> {
    if !path.is_file() {
        return Err(ClientError::file_not_found(path));
    }

    let mut workbook = open_workbook_auto(path)
        .map_err(|error| ClientError::workbook_unreadable(path, &error.to_string()))?;
    let available_sheets = workbook.sheet_names();

    if !available_sheets.iter().any(|name| name == sheet_name) {
        let near_match = available_sheets
            .iter()
            .find(|name| name.trim() == sheet_name.trim())
            .map(String::as_str);
        return Err(ClientError::sheet_not_found(
            sheet_name,
            &available_sheets,
            near_match,
        ));
    }

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|error| ClientError::workbook_unreadable(path, &error.to_string()))?;
    let (start_row, start_column) = range.start().unwrap_or((0, 0));
    let header_row = i64::from(start_row) + 1;

    let mut rows_iter = range.rows();
    let header_cells = rows_iter.next().unwrap_or(&[]);

    let mut roles = Vec::with_capacity(header_cells.len());
    let mut columns = Vec::with_capacity(header_cells.len());
    let mut extra_columns = Vec::new();
    for (offset, cell) in header_cells.iter().enumerate() {
        let index = start_column as usize + offset;
        let source_header = match cell {
            Data::Empty => String::new(),
            other => other.to_string().trim().to_string(),
        };
        if source_header.is_empty() {
            roles.push(None);
            continue;
        }

        match mapping.lookup_header(&source_header) {
            Some(entry) => {
                roles.push(Some(ColumnRole::Mapped(entry.canonical)));
                columns.push(ColumnMatch {
                    index,
                    source_header,
                    canonical_name: Some(entry.canonical.as_str().to_string()),
                    declared_type: Some(entry.declared_type.as_str().to_string()),
                    required: entry.required,
                    status: "matched".to_string(),
                });
            }
            None => {
                roles.push(Some(ColumnRole::Extra(source_header.clone())));
                extra_columns.push(source_header.clone());
                columns.push(ColumnMatch {
                    index,
                    source_header,
                    canonical_name: None,
                    declared_type: None,
                    required: false,
                    status: "extra".to_string(),
                });
            }
        }
    }

    let mut present = Vec::new();
    for role in roles.iter().flatten() {
        if let ColumnRole::Mapped(field) = role {
            present.push(*field);
        }
    }
    let mut missing_required = Vec::new();
    let mut missing_optional = Vec::new();
    for field in CanonicalField::ALL {
        if mapping.aliases(field).is_empty() || present.contains(&field) {
            continue;
        }
        if mapping.required_fields().contains(&field) {
            missing_required.push(field.as_str().to_string());
        } else {
            missing_optional.push(field.as_str().to_string());
        }
    }

    let mut rows = Vec::new();
    let mut data_rows = 0_i64;
    for (offset, cells) in rows_iter.enumerate() {
        data_rows += 1;
        let source_row = header_row + 1 + offset as i64;
        let mut row = RawRow {
            source_row,
            cells: BTreeMap::new(),
            extras: BTreeMap::new(),
        };
        for (cell, role) in cells.iter().zip(roles.iter()) {
            let raw = RawCell::from(cell);
            match role {
                Some(ColumnRole::Mapped(field)) => {
                    // Bilingual aliases may both be present; the first non-empty one wins.
                    let keep_existing = row.cells.get(field).is_some_and(|existing| !existing.is_empty());
                    if !keep_existing {
                        row.cells.insert(*field, raw);
                    }
                }
                Some(ColumnRole::Extra(name)) => {
                    row.extras.insert(name.clone(), raw);
                }
                None => {}
            }
        }
        rows.push(row);
    }

    info!(
        sheet = sheet_name,
        data_rows,
        matched = columns.iter().filter(|column| column.status == "matched").count(),
        extra = extra_columns.len(),
        "read journal sheet"
    );
    debug!(?missing_optional, "optional columns absent from sheet");

    Ok(SheetTable {
        rows,
        structure: ExcelStructureReport {
            path: path.display().to_string(),
            sheet_name: sheet_name.to_string(),
            available_sheets,
            header_row,
            data_rows,
            columns,
            missing_required,
            missing_optional,
            extra_columns,
        },
    })
}
