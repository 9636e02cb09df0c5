//! Cell cleaning and type coercion.
//!
//! Every cell passes through the same steps: invisible characters are removed,
//! Unicode is normalised (NFKC for codes, NFC for free text), Arabic-Indic and
//! Persian digits fold to ASCII, whitespace collapses and null tokens become
//! `None`. The cleaned value is then coerced to the column's declared type.
//! Failures are reported as events and never abort the run.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use crate::contracts::types::IssueCategory;
use crate::ingest::reader::{RawCell, RawRow};
use crate::mapping::{CanonicalField, ColumnMapping, DeclaredType};

const NULL_TOKENS: [&str; 5] = ["", "na", "null", "none", "-"];
const AMOUNT_SCALE: u32 = 2;
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

/// Event code for an amount rounded to two places. The rounded value stays valid.
pub(crate) const AMOUNT_ROUNDED: &str = "amount_rounded";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CellValue {
    Null,
    Integer(i64),
    Decimal(Decimal),
    Date(NaiveDate),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct NormalizedRow {
    pub(crate) source_row: i64,
    pub(crate) fiscal_year: Option<i64>,
    pub(crate) month: Option<i64>,
    pub(crate) entry_no: Option<String>,
    pub(crate) entry_date: Option<NaiveDate>,
    pub(crate) account_code: Option<String>,
    pub(crate) classification_code: Option<String>,
    pub(crate) project_code: Option<String>,
    pub(crate) work_analysis_code: Option<String>,
    pub(crate) sub_tree_code: Option<String>,
    pub(crate) debit: Option<Decimal>,
    pub(crate) credit: Option<Decimal>,
    pub(crate) description: Option<String>,
    pub(crate) notes: Option<String>,
    /// Fields whose cell held a value that could not be coerced.
    pub(crate) invalid_fields: BTreeSet<CanonicalField>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NormalizationEvent {
    pub(crate) row: i64,
    pub(crate) field: CanonicalField,
    pub(crate) category: IssueCategory,
    pub(crate) code: String,
    pub(crate) message: String,
    pub(crate) observed: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct NormalizeOutput {
    pub(crate) rows: Vec<NormalizedRow>,
    pub(crate) events: Vec<NormalizationEvent>,
    pub(crate) dropped_empty: i64,
}

pub(crate) fn normalize_rows(rows: &[RawRow], mapping: &ColumnMapping) -> NormalizeOutput {
    let mut output = NormalizeOutput::default();

    for raw in rows {
        let mut values = BTreeMap::new();
        let mut events = Vec::new();
        for (field, cell) in &raw.cells {
            let declared = mapping.declared_type(*field);
            let value = coerce_cell(cell, declared, field.is_code(), raw.source_row, *field, &mut events);
            values.insert(*field, value);
        }

        let extras_empty = raw
            .extras
            .values()
            .all(|cell| matches!(coerce_extra(cell), CellValue::Null));
        if extras_empty && events.is_empty() && values.values().all(|value| *value == CellValue::Null) {
            output.dropped_empty += 1;
            continue;
        }

        let row = build_row(raw.source_row, &values, &mut events);
        output.events.extend(events);
        output.rows.push(row);
    }

    output
}

fn coerce_extra(cell: &RawCell) -> CellValue {
    match cell {
        RawCell::Text(text) => clean_text(text, false).map_or(CellValue::Null, CellValue::Text),
        RawCell::Empty => CellValue::Null,
        other => other.display().map_or(CellValue::Null, CellValue::Text),
    }
}

fn build_row(
    source_row: i64,
    values: &BTreeMap<CanonicalField, CellValue>,
    events: &mut Vec<NormalizationEvent>,
) -> NormalizedRow {
    let mut row = NormalizedRow {
        source_row,
        ..NormalizedRow::default()
    };
    for event in events.iter().filter(|event| event.code != AMOUNT_ROUNDED) {
        row.invalid_fields.insert(event.field);
    }

    for (field, value) in values {
        if *value == CellValue::Null {
            continue;
        }
        let converted = match field {
            CanonicalField::FiscalYear => as_integer(value).map(|v| row.fiscal_year = Some(v)),
            CanonicalField::Month => as_integer(value).map(|v| row.month = Some(v)),
            CanonicalField::EntryNo => as_text(value).map(|v| row.entry_no = Some(v)),
            CanonicalField::EntryDate => as_date(value).map(|v| row.entry_date = Some(v)),
            CanonicalField::AccountCode => as_text(value).map(|v| row.account_code = Some(v)),
            CanonicalField::ClassificationCode => {
                as_text(value).map(|v| row.classification_code = Some(v))
            }
            CanonicalField::ProjectCode => as_text(value).map(|v| row.project_code = Some(v)),
            CanonicalField::WorkAnalysisCode => {
                as_text(value).map(|v| row.work_analysis_code = Some(v))
            }
            CanonicalField::SubTreeCode => as_text(value).map(|v| row.sub_tree_code = Some(v)),
            CanonicalField::Debit => as_decimal(value).map(|v| row.debit = Some(v)),
            CanonicalField::Credit => as_decimal(value).map(|v| row.credit = Some(v)),
            CanonicalField::Description => as_text(value).map(|v| row.description = Some(v)),
            CanonicalField::Notes => as_text(value).map(|v| row.notes = Some(v)),
        };
        if converted.is_none() {
            row.invalid_fields.insert(*field);
            events.push(NormalizationEvent {
                row: source_row,
                field: *field,
                category: IssueCategory::WrongType,
                code: "wrong_type".to_string(),
                message: format!("`{}` cannot hold this value", field.as_str()),
                observed: Some(render(value)),
            });
        }
    }

    row
}

fn as_integer(value: &CellValue) -> Option<i64> {
    match value {
        CellValue::Integer(integer) => Some(*integer),
        CellValue::Decimal(decimal) if decimal.fract().is_zero() => {
            i64::from_str(&decimal.trunc().normalize().to_string()).ok()
        }
        CellValue::Text(text) => parse_decimal(text)
            .filter(|decimal| decimal.fract().is_zero())
            .and_then(|decimal| i64::from_str(&decimal.trunc().normalize().to_string()).ok()),
        _ => None,
    }
}

fn as_decimal(value: &CellValue) -> Option<Decimal> {
    match value {
        CellValue::Decimal(decimal) => Some(*decimal),
        CellValue::Integer(integer) => Some(scale_amount(Decimal::from(*integer))),
        CellValue::Text(text) => parse_decimal(text).map(|decimal| scale_amount(round_amount(decimal))),
        _ => None,
    }
}

fn as_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Date(date) => Some(*date),
        CellValue::Text(text) => parse_iso_date(text),
        _ => None,
    }
}

fn as_text(value: &CellValue) -> Option<String> {
    match value {
        CellValue::Null => None,
        other => Some(render(other)),
    }
}

pub(crate) fn render(value: &CellValue) -> String {
    match value {
        CellValue::Null => String::new(),
        CellValue::Integer(integer) => integer.to_string(),
        CellValue::Decimal(decimal) => decimal.to_string(),
        CellValue::Date(date) => date.format("%Y-%m-%d").to_string(),
        CellValue::Text(text) => text.clone(),
    }
}

fn coerce_cell(
    cell: &RawCell,
    declared: DeclaredType,
    is_code: bool,
    row: i64,
    field: CanonicalField,
    events: &mut Vec<NormalizationEvent>,
) -> CellValue {
    let mut push = |category: IssueCategory, code: &str, message: String| {
        events.push(NormalizationEvent {
            row,
            field,
            category,
            code: code.to_string(),
            message,
            observed: cell.display(),
        });
    };

    match cell {
        RawCell::Empty => CellValue::Null,
        RawCell::Error(error) => {
            push(
                IssueCategory::WrongType,
                "cell_error",
                format!("spreadsheet error value {error}"),
            );
            CellValue::Null
        }
        RawCell::Number(number) if !number.is_finite() => {
            push(
                IssueCategory::OutOfRange,
                "non_finite",
                "numeric cell is not finite".to_string(),
            );
            CellValue::Null
        }
        _ => {
            let result = match declared {
                DeclaredType::Integer => coerce_integer(cell),
                DeclaredType::Decimal => coerce_decimal(cell, &mut push),
                DeclaredType::Date => coerce_date(cell),
                DeclaredType::String => Ok(coerce_string(cell, is_code)),
            };
            match result {
                Ok(value) => value,
                Err((category, code)) => {
                    let message = match category {
                        IssueCategory::BadDate => {
                            "expected a spreadsheet date or an ISO-8601 date".to_string()
                        }
                        _ => format!("expected {}", declared.as_str()),
                    };
                    push(category, code, message);
                    CellValue::Null
                }
            }
        }
    }
}

type CoerceResult = Result<CellValue, (IssueCategory, &'static str)>;

fn coerce_integer(cell: &RawCell) -> CoerceResult {
    let wrong = (IssueCategory::WrongType, "wrong_type");
    match cell {
        RawCell::Integer(integer) => Ok(CellValue::Integer(*integer)),
        RawCell::Number(number) if number.fract() == 0.0 && number.abs() < 9.0e15 => {
            Ok(CellValue::Integer(*number as i64))
        }
        RawCell::Text(text) => match clean_text(text, true) {
            None => Ok(CellValue::Null),
            Some(cleaned) => parse_decimal(&cleaned)
                .filter(|decimal| decimal.fract().is_zero())
                .and_then(|decimal| i64::from_str(&decimal.trunc().normalize().to_string()).ok())
                .map(CellValue::Integer)
                .ok_or(wrong),
        },
        _ => Err(wrong),
    }
}

fn coerce_decimal<F>(cell: &RawCell, push: &mut F) -> CoerceResult
where
    F: FnMut(IssueCategory, &str, String),
{
    let wrong = (IssueCategory::WrongType, "wrong_type");
    let parsed = match cell {
        RawCell::Integer(integer) => Decimal::from(*integer),
        RawCell::Number(number) => parse_decimal(&number.to_string()).ok_or(wrong)?,
        RawCell::Text(text) => match clean_text(text, true) {
            None => return Ok(CellValue::Null),
            Some(cleaned) => parse_decimal(&cleaned).ok_or(wrong)?,
        },
        _ => return Err(wrong),
    };

    let rounded = round_amount(parsed);
    if rounded != parsed {
        push(
            IssueCategory::WrongType,
            AMOUNT_ROUNDED,
            format!("rounded half-to-even to {rounded}"),
        );
    }
    Ok(CellValue::Decimal(scale_amount(rounded)))
}

fn coerce_date(cell: &RawCell) -> CoerceResult {
    let bad = (IssueCategory::BadDate, "bad_date");
    match cell {
        RawCell::DateSerial(serial) | RawCell::Number(serial) => {
            excel_serial_to_date(*serial).map(CellValue::Date).ok_or(bad)
        }
        RawCell::Integer(serial) => excel_serial_to_date(*serial as f64)
            .map(CellValue::Date)
            .ok_or(bad),
        RawCell::DateIso(text) => parse_iso_date(text).map(CellValue::Date).ok_or(bad),
        RawCell::Text(text) => match clean_text(text, true) {
            None => Ok(CellValue::Null),
            Some(cleaned) => parse_iso_date(&cleaned).map(CellValue::Date).ok_or(bad),
        },
        _ => Err(bad),
    }
}

fn coerce_string(cell: &RawCell, is_code: bool) -> CellValue {
    let text = match cell {
        RawCell::Text(text) | RawCell::DateIso(text) => text.clone(),
        RawCell::Integer(integer) => integer.to_string(),
        RawCell::Number(number) if number.fract() == 0.0 && number.abs() < 9.0e15 => {
            (*number as i64).to_string()
        }
        RawCell::Number(number) => number.to_string(),
        RawCell::Bool(flag) => flag.to_string(),
        RawCell::DateSerial(serial) => match excel_serial_to_date(*serial) {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => serial.to_string(),
        },
        RawCell::Empty | RawCell::Error(_) => String::new(),
    };
    clean_text(&text, is_code).map_or(CellValue::Null, CellValue::Text)
}

/// Cleans one text cell. Returns `None` for the null tokens.
pub(crate) fn clean_text(value: &str, is_code: bool) -> Option<String> {
    let visible = value
        .chars()
        .filter(|ch| !is_invisible(*ch))
        .collect::<String>();
    let normalized: String = if is_code {
        visible.nfkc().collect()
    } else {
        visible.nfc().collect()
    };
    let folded = normalized.chars().map(fold_digit).collect::<String>();
    let collapsed = folded.split_whitespace().collect::<Vec<&str>>().join(" ");

    if NULL_TOKENS.contains(&collapsed.to_lowercase().as_str()) {
        None
    } else {
        Some(collapsed)
    }
}

fn is_invisible(ch: char) -> bool {
    matches!(
        ch,
        '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' | '\u{FEFF}' | '\u{061C}'
    )
}

pub(crate) fn fold_digit(ch: char) -> char {
    match ch {
        '\u{0660}'..='\u{0669}' => char::from(b'0' + (ch as u32 - 0x0660) as u8),
        '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (ch as u32 - 0x06F0) as u8),
        '\u{066B}' => '.',
        '\u{066C}' => ',',
        other => other,
    }
}

/// Parses a cleaned numeric string; thousands separators are ignored.
pub(crate) fn parse_decimal(text: &str) -> Option<Decimal> {
    let compact = text
        .chars()
        .map(fold_digit)
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect::<String>();
    if compact.is_empty() {
        return None;
    }
    Decimal::from_str(&compact)
        .ok()
        .or_else(|| Decimal::from_scientific(&compact).ok())
}

pub(crate) fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointNearestEven)
}

fn scale_amount(mut value: Decimal) -> Decimal {
    value.rescale(AMOUNT_SCALE);
    value
}

pub(crate) fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=EXCEL_MAX_SERIAL).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.floor() as i64))
}

pub(crate) fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(date_time.date());
        }
    }
    chrono::DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|date_time| date_time.date_naive())
}
