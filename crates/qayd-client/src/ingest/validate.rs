use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use tracing::info;

use crate::contracts::types::{IssueCategory, Severity, ValidationIssue, ValidationReport};
use crate::ingest::group::{GroupOutput, HeaderDraft, LineDraft, balance_tolerance};
use crate::ingest::load::{header_record, line_record};
use crate::ingest::normalize::{AMOUNT_ROUNDED, NormalizeOutput, NormalizedRow};
use crate::ingest::resolve::{Dimension, ReferenceResolver, Resolution};
use crate::ingest::schema::SchemaRegistry;
use crate::mapping::{CanonicalField, ColumnMapping};
use crate::migrations::{HEADER_TABLE, LINE_TABLE};

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;
const PLACEHOLDER_TENANT: &str = "<tenant>";
const PLACEHOLDER_HEADER: &str = "<header>";
const PLACEHOLDER_REFERENCE: &str = "<unresolved>";

/// A grouped line with its dimension codes resolved to surrogate ids.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedLine {
    pub(crate) draft: LineDraft,
    pub(crate) dimension_ids: BTreeMap<Dimension, String>,
}

impl ResolvedLine {
    pub(crate) fn account_id(&self) -> Option<&str> {
        self.dimension_ids
            .get(&Dimension::Account)
            .map(String::as_str)
    }
}

pub(crate) struct ValidationInput<'a> {
    pub(crate) normalized: &'a NormalizeOutput,
    pub(crate) grouped: &'a GroupOutput,
    pub(crate) resolver: &'a ReferenceResolver,
    pub(crate) registry: &'a SchemaRegistry,
    pub(crate) mapping: &'a ColumnMapping,
    pub(crate) rows_read: i64,
    pub(crate) today: NaiveDate,
    pub(crate) future_horizon_days: i64,
    pub(crate) tenant_id: Option<&'a str>,
    pub(crate) created_by: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub(crate) struct ValidationOutcome {
    pub(crate) report: ValidationReport,
    pub(crate) headers: Vec<HeaderDraft>,
    pub(crate) lines: Vec<ResolvedLine>,
    pub(crate) error_entries: BTreeSet<String>,
}

impl ValidationOutcome {
    pub(crate) fn passed(&self) -> bool {
        self.report.passed
    }

    /// Drops every entry that owns at least one error. The report keeps its failing status.
    pub(crate) fn quarantine(&mut self) {
        let excluded = &self.error_entries;
        self.headers
            .retain(|header| !excluded.contains(&header.entry_key));
        self.lines
            .retain(|line| !excluded.contains(&line.draft.entry_key));
        self.report.quarantined_entries = excluded.iter().cloned().collect();
    }
}

struct IssueLog {
    issues: Vec<ValidationIssue>,
}

impl IssueLog {
    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        row: Option<i64>,
        entry_key: Option<&str>,
        field: &str,
        severity: Severity,
        category: IssueCategory,
        code: &str,
        message: String,
        observed: Option<String>,
        expected: Option<&str>,
    ) {
        self.issues.push(ValidationIssue {
            row,
            entry_key: entry_key.map(str::to_string),
            field: field.to_string(),
            severity,
            category,
            code: code.to_string(),
            message,
            observed,
            expected: expected.map(str::to_string),
        });
    }
}

pub(crate) fn validate(input: &ValidationInput<'_>) -> ValidationOutcome {
    let mut log = IssueLog { issues: Vec::new() };
    let row_entries = &input.grouped.row_entries;
    let required = input.mapping.required_fields();

    for event in &input.normalized.events {
        let severity = if required.contains(&event.field) && event.code != AMOUNT_ROUNDED {
            Severity::Error
        } else {
            Severity::Warning
        };
        log.push(
            Some(event.row),
            row_entries.get(&event.row).map(String::as_str),
            event.field.as_str(),
            severity,
            event.category,
            &event.code,
            event.message.clone(),
            event.observed.clone(),
            Some(input.mapping.declared_type(event.field).as_str()),
        );
    }

    for row in &input.normalized.rows {
        check_row(row, input, &mut log);
    }

    if input.resolver.is_skipped() {
        log.push(
            None,
            None,
            "account_code",
            Severity::Warning,
            IssueCategory::UnknownCode,
            "resolution_skipped",
            "No tenant id was supplied, so reference codes were not resolved.".to_string(),
            None,
            Some("TENANT_ID"),
        );
    }

    let lines = resolve_lines(&input.grouped.lines, input.resolver, &mut log);
    check_entries(&input.grouped.headers, &lines, &mut log);
    check_schema(input, &input.grouped.headers, &lines, &mut log);

    let mut error_entries = BTreeSet::new();
    for issue in &log.issues {
        if issue.severity != Severity::Error {
            continue;
        }
        let entry = issue
            .entry_key
            .clone()
            .or_else(|| issue.row.and_then(|row| row_entries.get(&row).cloned()));
        if let Some(entry) = entry {
            error_entries.insert(entry);
        }
    }

    let error_count = log
        .issues
        .iter()
        .filter(|issue| issue.severity == Severity::Error)
        .count() as i64;
    let warning_count = log.issues.len() as i64 - error_count;

    info!(
        errors = error_count,
        warnings = warning_count,
        entries = input.grouped.headers.len(),
        lines = lines.len(),
        "validated grouped entries"
    );

    ValidationOutcome {
        report: ValidationReport {
            passed: error_count == 0,
            error_count,
            warning_count,
            rows_read: input.rows_read,
            rows_dropped_empty: input.normalized.dropped_empty,
            entries_checked: input.grouped.headers.len() as i64,
            lines_checked: lines.len() as i64,
            quarantined_entries: Vec::new(),
            issues: log.issues,
        },
        headers: input.grouped.headers.clone(),
        lines,
        error_entries,
    }
}

fn check_row(row: &NormalizedRow, input: &ValidationInput<'_>, log: &mut IssueLog) {
    let source_row = Some(row.source_row);
    let entry = input
        .grouped
        .row_entries
        .get(&row.source_row)
        .map(String::as_str);
    let invalid = |field: CanonicalField| row.invalid_fields.contains(&field);

    match row.entry_no.as_deref() {
        None if !invalid(CanonicalField::EntryNo) => log.push(
            source_row,
            entry,
            "entry_no",
            Severity::Error,
            IssueCategory::MissingRequired,
            "missing_entry_no",
            "Entry number is required.".to_string(),
            None,
            Some("digits"),
        ),
        Some(entry_no) if !entry_no.chars().all(|ch| ch.is_ascii_digit()) => log.push(
            source_row,
            entry,
            "entry_no",
            Severity::Warning,
            IssueCategory::WrongType,
            "entry_no_not_numeric",
            "Entry number contains characters other than digits.".to_string(),
            Some(entry_no.to_string()),
            Some("digits"),
        ),
        _ => {}
    }

    match row.entry_date {
        None if !invalid(CanonicalField::EntryDate) => log.push(
            source_row,
            entry,
            "entry_date",
            Severity::Error,
            IssueCategory::MissingRequired,
            "missing_entry_date",
            "Entry date is required.".to_string(),
            None,
            Some("date"),
        ),
        Some(date) if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) => log.push(
            source_row,
            entry,
            "entry_date",
            Severity::Error,
            IssueCategory::BadDate,
            "date_out_of_range",
            format!("Entry date year must be between {MIN_YEAR} and {MAX_YEAR}."),
            Some(date.to_string()),
            Some("1900-01-01..2100-12-31"),
        ),
        Some(date) if date > input.today + Duration::days(input.future_horizon_days) => log.push(
            source_row,
            entry,
            "entry_date",
            Severity::Error,
            IssueCategory::BadDate,
            "future_date",
            format!(
                "Entry date is more than {} days in the future.",
                input.future_horizon_days
            ),
            Some(date.to_string()),
            Some("today plus the future-date horizon"),
        ),
        _ => {}
    }

    if row.account_code.is_none() && !invalid(CanonicalField::AccountCode) {
        log.push(
            source_row,
            entry,
            "account_code",
            Severity::Error,
            IssueCategory::MissingRequired,
            "missing_account_code",
            "Account code is required.".to_string(),
            None,
            Some("legacy account code"),
        );
    }

    if let Some(year) = row.fiscal_year
        && !(i64::from(MIN_YEAR)..=i64::from(MAX_YEAR)).contains(&year)
    {
        log.push(
            source_row,
            entry,
            "fiscal_year",
            Severity::Error,
            IssueCategory::OutOfRange,
            "fiscal_year_out_of_range",
            format!("Fiscal year must be between {MIN_YEAR} and {MAX_YEAR}."),
            Some(year.to_string()),
            Some("1900..2100"),
        );
    }

    if let Some(month) = row.month
        && !(1..=12).contains(&month)
    {
        log.push(
            source_row,
            entry,
            "month",
            Severity::Error,
            IssueCategory::OutOfRange,
            "month_out_of_range",
            "Month must be between 1 and 12.".to_string(),
            Some(month.to_string()),
            Some("1..12"),
        );
    }

    for (field, value) in [("debit", row.debit), ("credit", row.credit)] {
        if let Some(amount) = value
            && amount < Decimal::ZERO
        {
            log.push(
                source_row,
                entry,
                field,
                Severity::Error,
                IssueCategory::OutOfRange,
                "negative_amount",
                "Amounts must not be negative.".to_string(),
                Some(amount.to_string()),
                Some(">= 0"),
            );
        }
    }

    let amounts_invalid = invalid(CanonicalField::Debit) || invalid(CanonicalField::Credit);
    let debit = row.debit.unwrap_or_default();
    let credit = row.credit.unwrap_or_default();
    if !amounts_invalid && debit >= Decimal::ZERO && credit >= Decimal::ZERO {
        if debit.is_zero() && credit.is_zero() {
            log.push(
                source_row,
                entry,
                "debit",
                Severity::Error,
                IssueCategory::BusinessRule,
                "zero_amount_line",
                "Line has neither a debit nor a credit amount; it was dropped.".to_string(),
                Some("0/0".to_string()),
                Some("exactly one of debit, credit > 0"),
            );
        } else if debit > Decimal::ZERO && credit > Decimal::ZERO {
            log.push(
                source_row,
                entry,
                "debit",
                Severity::Error,
                IssueCategory::BusinessRule,
                "both_amounts_positive",
                "Line carries both a debit and a credit amount; it was rejected.".to_string(),
                Some(format!("{debit}/{credit}")),
                Some("exactly one of debit, credit > 0"),
            );
        }
    }
}

fn resolve_lines(
    lines: &[LineDraft],
    resolver: &ReferenceResolver,
    log: &mut IssueLog,
) -> Vec<ResolvedLine> {
    let mut resolved = Vec::with_capacity(lines.len());

    for line in lines {
        let mut dimension_ids = BTreeMap::new();
        for dimension in Dimension::ALL {
            let code = match dimension {
                Dimension::Account => {
                    if let Some(account_id) = &line.account_id {
                        dimension_ids.insert(dimension, account_id.clone());
                        continue;
                    }
                    line.account_code.as_deref()
                }
                Dimension::Classification => line.classification_code.as_deref(),
                Dimension::Project => line.project_code.as_deref(),
                Dimension::WorkAnalysis => line.work_analysis_code.as_deref(),
                Dimension::SubTree => line.sub_tree_code.as_deref(),
            };

            match resolver.resolve(dimension, code) {
                Resolution::Resolved { id, .. } => {
                    dimension_ids.insert(dimension, id);
                }
                Resolution::Absent => {}
                Resolution::Unresolved if resolver.is_skipped() => {}
                Resolution::Unresolved => {
                    let code = code.unwrap_or_default();
                    let reason = if resolver.is_ambiguous(dimension, code) {
                        "matches more than one reference row"
                    } else {
                        "does not exist for this tenant"
                    };
                    let (severity, issue_code) = if dimension == Dimension::Account {
                        (Severity::Error, "unresolved_account")
                    } else {
                        (Severity::Warning, "unresolved_dimension")
                    };
                    log.push(
                        line.source_row,
                        Some(&line.entry_key),
                        &format!("{}_code", dimension_field(dimension)),
                        severity,
                        IssueCategory::UnknownCode,
                        issue_code,
                        format!("{} code `{code}` {reason}.", dimension.as_str()),
                        Some(code.to_string()),
                        Some(dimension.match_column()),
                    );
                }
            }
        }
        resolved.push(ResolvedLine {
            draft: line.clone(),
            dimension_ids,
        });
    }

    resolved
}

fn dimension_field(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Account => "account",
        Dimension::Classification => "classification",
        Dimension::Project => "project",
        Dimension::WorkAnalysis => "work_analysis",
        Dimension::SubTree => "sub_tree",
    }
}

fn check_entries(headers: &[HeaderDraft], lines: &[ResolvedLine], log: &mut IssueLog) {
    let mut header_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for header in headers {
        *header_counts.entry(header.entry_key.as_str()).or_default() += 1;
    }

    let mut by_entry: BTreeMap<&str, Vec<&ResolvedLine>> = BTreeMap::new();
    for line in lines {
        let key = line.draft.entry_key.as_str();
        if header_counts.get(key).copied() != Some(1) {
            log.push(
                line.draft.source_row,
                Some(key),
                "entry_key",
                Severity::Error,
                IssueCategory::Referential,
                "orphan_line",
                "Line does not match exactly one journal entry header.".to_string(),
                Some(key.to_string()),
                Some("one header"),
            );
        }
        by_entry.entry(key).or_default().push(line);
    }

    for header in headers {
        let entry_lines = by_entry
            .get(header.entry_key.as_str())
            .cloned()
            .unwrap_or_default();
        let debit: Decimal = entry_lines.iter().map(|line| line.draft.debit).sum();
        let credit: Decimal = entry_lines.iter().map(|line| line.draft.credit).sum();

        if (debit - header.total_debit).abs() > balance_tolerance()
            || (credit - header.total_credit).abs() > balance_tolerance()
            || entry_lines.len() as i64 != header.line_count
        {
            log.push(
                None,
                Some(&header.entry_key),
                "total_debit",
                Severity::Error,
                IssueCategory::BusinessRule,
                "header_total_mismatch",
                "Header totals do not equal the sum of its lines.".to_string(),
                Some(format!("{}/{}", header.total_debit, header.total_credit)),
                Some(&format!("{debit}/{credit}")),
            );
        }

        if (debit - credit).abs() > balance_tolerance() {
            for line in &entry_lines {
                log.push(
                    line.draft.source_row,
                    Some(&header.entry_key),
                    "debit",
                    Severity::Error,
                    IssueCategory::BusinessRule,
                    "unbalanced_entry",
                    format!(
                        "Entry {} is unbalanced by {}.",
                        header.entry_key,
                        debit - credit
                    ),
                    Some(format!("{debit}/{credit}")),
                    Some("|debit - credit| <= 0.01"),
                );
            }
        }

        for row in &header.period_conflicts {
            log.push(
                Some(*row),
                Some(&header.entry_key),
                "month",
                Severity::Warning,
                IssueCategory::BusinessRule,
                "inconsistent_period",
                format!(
                    "Row disagrees with the entry's period {}-{:02}.",
                    header.fiscal_year, header.month
                ),
                None,
                Some(&format!("{}-{:02}", header.fiscal_year, header.month)),
            );
        }
    }
}

fn check_schema(
    input: &ValidationInput<'_>,
    headers: &[HeaderDraft],
    lines: &[ResolvedLine],
    log: &mut IssueLog,
) {
    let tenant = input.tenant_id.unwrap_or(PLACEHOLDER_TENANT);

    for header in headers {
        let record = header_record(header, tenant, input.created_by);
        for violation in input.registry.validate_row(HEADER_TABLE, &record) {
            push_schema_issue(log, None, &header.entry_key, HEADER_TABLE, &violation);
        }
    }

    for line in lines {
        let mut line = line.clone();
        if input.resolver.is_skipped() && line.account_id().is_none() {
            line.dimension_ids
                .insert(Dimension::Account, PLACEHOLDER_REFERENCE.to_string());
        }
        // Unresolved accounts are already reported; do not report them twice.
        if line.account_id().is_none() {
            continue;
        }
        let record = line_record(&line, tenant, PLACEHOLDER_HEADER, line.draft.position);
        for violation in input.registry.validate_row(LINE_TABLE, &record) {
            push_schema_issue(
                log,
                line.draft.source_row,
                &line.draft.entry_key,
                LINE_TABLE,
                &violation,
            );
        }
    }
}

fn push_schema_issue(
    log: &mut IssueLog,
    row: Option<i64>,
    entry_key: &str,
    table: &str,
    violation: &crate::ingest::schema::RowViolation,
) {
    let category = match violation.code {
        "missing_required" => IssueCategory::MissingRequired,
        "type_mismatch" => IssueCategory::WrongType,
        _ => IssueCategory::Referential,
    };
    log.push(
        row,
        Some(entry_key),
        &format!("{table}.{}", violation.column),
        if violation.is_error {
            Severity::Error
        } else {
            Severity::Warning
        },
        category,
        &format!("schema_{}", violation.code),
        violation.message.clone(),
        None,
        None,
    );
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::Path;

    use chrono::NaiveDate;
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::{ValidationInput, validate};
    use crate::config::UnbalancedStrategy;
    use crate::contracts::types::Severity;
    use crate::ingest::group::group_entries;
    use crate::ingest::normalize::{NormalizeOutput, NormalizedRow, normalize_rows};
    use crate::ingest::reader::{RawCell, RawRow};
    use crate::ingest::resolve::{Dimension, ReferenceResolver};
    use crate::ingest::schema::SchemaRegistry;
    use crate::mapping::{CanonicalField, ColumnMapping};
    use crate::migrations::run_pending;
    use crate::store::SqliteStore;

    fn row(source_row: i64, entry_no: &str, account: &str, debit: Decimal, credit: Decimal) -> NormalizedRow {
        NormalizedRow {
            source_row,
            entry_no: Some(entry_no.to_string()),
            entry_date: NaiveDate::from_ymd_opt(2025, 1, 15),
            account_code: Some(account.to_string()),
            debit: Some(debit),
            credit: Some(credit),
            ..NormalizedRow::default()
        }
    }

    fn migrated_registry() -> SchemaRegistry {
        let mut connection = match Connection::open_in_memory() {
            Ok(connection) => connection,
            Err(error) => panic!("in-memory database should open: {error}"),
        };
        if let Err(error) = run_pending(&mut connection) {
            panic!("migrations should apply: {error}");
        }
        let store = SqliteStore::from_connection(connection, Path::new(":memory:"));
        match SchemaRegistry::from_store(&store) {
            Ok(registry) => registry,
            Err(error) => panic!("schema snapshot should build: {error}"),
        }
    }

    fn default_mapping() -> ColumnMapping {
        match ColumnMapping::default_bilingual() {
            Ok(mapping) => mapping,
            Err(error) => panic!("default mapping should build: {error}"),
        }
    }

    fn raw_line(source_row: i64, entry_no: f64, account: &str, debit: RawCell, credit: RawCell) -> RawRow {
        RawRow {
            source_row,
            cells: [
                (CanonicalField::EntryNo, RawCell::Number(entry_no)),
                (CanonicalField::EntryDate, RawCell::Text("2025-01-15".to_string())),
                (CanonicalField::AccountCode, RawCell::Text(account.to_string())),
                (CanonicalField::Debit, debit),
                (CanonicalField::Credit, credit),
            ]
            .into_iter()
            .collect(),
            extras: BTreeMap::new(),
        }
    }

    fn run(rows: Vec<NormalizedRow>, strategy: UnbalancedStrategy) -> super::ValidationOutcome {
        let normalized = NormalizeOutput {
            rows,
            events: Vec::new(),
            dropped_empty: 0,
        };
        run_normalized(normalized, strategy)
    }

    fn run_raw(rows: &[RawRow], strategy: UnbalancedStrategy) -> super::ValidationOutcome {
        run_normalized(normalize_rows(rows, &default_mapping()), strategy)
    }

    fn run_normalized(normalized: NormalizeOutput, strategy: UnbalancedStrategy) -> super::ValidationOutcome {
        let mapping = default_mapping();
        let grouped = match group_entries(&normalized.rows, strategy, None) {
            Ok(grouped) => grouped,
            Err(error) => panic!("grouping should succeed: {error}"),
        };
        let observed = BTreeMap::from([(
            Dimension::Account,
            grouped
                .lines
                .iter()
                .filter_map(|line| line.account_code.clone())
                .collect(),
        )]);
        let resolver = ReferenceResolver::skipped(&observed);
        let registry = migrated_registry();
        let input = ValidationInput {
            normalized: &normalized,
            grouped: &grouped,
            resolver: &resolver,
            registry: &registry,
            mapping: &mapping,
            rows_read: normalized.rows.len() as i64,
            today: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap_or_default(),
            future_horizon_days: 30,
            tenant_id: None,
            created_by: None,
        };
        validate(&input)
    }

    fn codes(outcome: &super::ValidationOutcome, severity: Severity) -> Vec<String> {
        outcome
            .report
            .issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .map(|issue| issue.code.clone())
            .collect()
    }

    #[test]
    fn zero_and_double_sided_lines_are_business_rule_errors() {
        let outcome = run(
            vec![
                row(2, "1", "1001", dec!(0), dec!(0)),
                row(3, "2", "1001", dec!(5), dec!(5)),
            ],
            UnbalancedStrategy::Skip,
        );
        let errors = codes(&outcome, Severity::Error);
        assert!(errors.contains(&"zero_amount_line".to_string()));
        assert!(errors.contains(&"both_amounts_positive".to_string()));
        assert!(!outcome.passed());
        assert_eq!(outcome.error_entries.len(), 2);
    }

    #[test]
    fn fail_strategy_flags_every_line_of_unbalanced_entry() {
        let outcome = run(
            vec![
                row(2, "4", "1001", dec!(600), dec!(0)),
                row(3, "4", "2001", dec!(0), dec!(500)),
            ],
            UnbalancedStrategy::Fail,
        );
        let unbalanced = outcome
            .report
            .issues
            .iter()
            .filter(|issue| issue.code == "unbalanced_entry")
            .count();
        assert_eq!(unbalanced, 2);
    }

    #[test]
    fn missing_tenant_records_single_resolution_warning() {
        let outcome = run(
            vec![
                row(2, "1", "1001", dec!(10), dec!(0)),
                row(3, "1", "2001", dec!(0), dec!(10)),
            ],
            UnbalancedStrategy::Fail,
        );
        assert!(outcome.passed());
        assert_eq!(codes(&outcome, Severity::Warning), vec!["resolution_skipped".to_string()]);
    }

    #[test]
    fn quarantine_keeps_clean_entries_only() {
        let mut outcome = run(
            vec![
                row(2, "1", "1001", dec!(10), dec!(0)),
                row(3, "1", "2001", dec!(0), dec!(10)),
                row(4, "2", "1001", dec!(-3), dec!(0)),
            ],
            UnbalancedStrategy::Skip,
        );
        assert!(!outcome.passed());
        outcome.quarantine();
        assert_eq!(outcome.headers.len(), 1);
        assert_eq!(outcome.lines.len(), 2);
        assert!(!outcome.passed());
        assert_eq!(outcome.report.quarantined_entries.len(), 1);
    }

    #[test]
    fn future_and_out_of_range_dates_are_errors() {
        let mut future = row(2, "1", "1001", dec!(10), dec!(0));
        future.entry_date = NaiveDate::from_ymd_opt(2025, 6, 1);
        let mut ancient = row(3, "2", "1001", dec!(10), dec!(0));
        ancient.entry_date = NaiveDate::from_ymd_opt(1850, 1, 1);
        ancient.month = Some(13);
        let outcome = run(vec![future, ancient], UnbalancedStrategy::Skip);
        let errors = codes(&outcome, Severity::Error);
        assert!(errors.contains(&"future_date".to_string()));
        assert!(errors.contains(&"date_out_of_range".to_string()));
        assert!(errors.contains(&"month_out_of_range".to_string()));
    }

    #[test]
    fn amount_rounded_to_zero_is_a_zero_amount_error() {
        let outcome = run_raw(
            &[
                raw_line(2, 1.0, "1001", RawCell::Number(10.0), RawCell::Empty),
                raw_line(3, 1.0, "2001", RawCell::Empty, RawCell::Number(10.0)),
                raw_line(4, 1.0, "1001", RawCell::Number(0.004), RawCell::Empty),
            ],
            UnbalancedStrategy::Skip,
        );
        let errors = codes(&outcome, Severity::Error);
        assert!(errors.contains(&"zero_amount_line".to_string()), "{errors:?}");
        assert!(codes(&outcome, Severity::Warning).contains(&"amount_rounded".to_string()));
        assert!(!outcome.passed());
        assert!(outcome.error_entries.contains("1_2025-01-15"));
    }

    #[test]
    fn rounded_amounts_on_both_sides_are_rejected() {
        let outcome = run_raw(
            &[raw_line(
                2,
                3.0,
                "1001",
                RawCell::Text("5.004".to_string()),
                RawCell::Number(7.126),
            )],
            UnbalancedStrategy::Skip,
        );
        let errors = codes(&outcome, Severity::Error);
        assert!(errors.contains(&"both_amounts_positive".to_string()), "{errors:?}");
        assert!(!outcome.passed());
    }
}
