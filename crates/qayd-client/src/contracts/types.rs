use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKeySchema {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexSchema {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySchema>,
    #[serde(default)]
    pub indexes: Vec<IndexSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaSnapshot {
    pub generated_at: String,
    pub source: String,
    pub tables: BTreeMap<String, TableSchema>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnMatch {
    pub index: usize,
    pub source_header: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
    pub required: bool,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExcelStructureReport {
    pub path: String,
    pub sheet_name: String,
    pub available_sheets: Vec<String>,
    pub header_row: i64,
    pub data_rows: i64,
    pub columns: Vec<ColumnMatch>,
    pub missing_required: Vec<String>,
    pub missing_optional: Vec<String>,
    pub extra_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TargetColumnRef {
    pub canonical_name: String,
    pub target_table: String,
    pub target_column: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub matched: Vec<TargetColumnRef>,
    pub mapped_columns_missing_in_schema: Vec<TargetColumnRef>,
    pub required_schema_columns_without_source: Vec<String>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Exact,
    Manual,
    Unresolved,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeMapping {
    pub code: String,
    pub target_id: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverrideRecord {
    pub dimension: String,
    pub code: String,
    pub target_id: String,
    pub confidence: Confidence,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionResolution {
    pub dimension: String,
    pub reference_table: String,
    pub match_column: String,
    pub observed: i64,
    pub resolved: i64,
    pub unresolved: Vec<String>,
    pub ambiguous: Vec<String>,
    pub overrides: Vec<OverrideRecord>,
    pub mappings: Vec<CodeMapping>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub skipped: bool,
    pub dimensions: Vec<DimensionResolution>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnbalancedEntry {
    pub entry_key: String,
    pub entry_no: String,
    pub entry_date: String,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub residue: Decimal,
    pub line_count: i64,
    pub source_rows: Vec<i64>,
    pub action: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceReport {
    pub strategy: String,
    pub entries_total: i64,
    pub balanced: i64,
    pub unbalanced: Vec<UnbalancedEntry>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    MissingRequired,
    WrongType,
    OutOfRange,
    BadDate,
    UnknownCode,
    Referential,
    BusinessRule,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRequired => "missing_required",
            Self::WrongType => "wrong_type",
            Self::OutOfRange => "out_of_range",
            Self::BadDate => "bad_date",
            Self::UnknownCode => "unknown_code",
            Self::Referential => "referential",
            Self::BusinessRule => "business_rule",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_key: Option<String>,
    pub field: String,
    pub severity: Severity,
    pub category: IssueCategory,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub error_count: i64,
    pub warning_count: i64,
    pub rows_read: i64,
    pub rows_dropped_empty: i64,
    pub entries_checked: i64,
    pub lines_checked: i64,
    pub quarantined_entries: Vec<String>,
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_row: Option<i64>,
    pub payload: Value,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub ordinal: i64,
    pub table: String,
    pub records_attempted: i64,
    pub records_succeeded: i64,
    pub records_failed: i64,
    pub attempts: i64,
    pub failed_records: Vec<FailedRecord>,
    pub wall_time_ms: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TableLoadSummary {
    pub table: String,
    pub batches: i64,
    pub attempted: i64,
    pub succeeded: i64,
    pub failed: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupMetadata {
    pub snapshot_id: String,
    pub created_at: String,
    pub tenant_id: String,
    pub headers_path: String,
    pub lines_path: String,
    pub header_count: i64,
    pub line_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationSummary {
    pub run_id: String,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub batch_size: i64,
    pub started_at: String,
    pub finished_at: String,
    pub wall_time_ms: i64,
    pub headers: TableLoadSummary,
    pub lines: TableLoadSummary,
    pub batches: Vec<BatchResult>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupMetadata>,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationCheck {
    pub name: String,
    pub passed: bool,
    pub evidence: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub tenant_id: String,
    pub passed: bool,
    pub sample_size: i64,
    pub checks: Vec<VerificationCheck>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NextStep {
    pub label: String,
    pub command: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Action {
    pub label: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestRunSummary {
    pub rows_read: i64,
    pub rows_dropped_empty: i64,
    pub entries: i64,
    pub lines: i64,
    pub unbalanced_entries: i64,
    pub errors: i64,
    pub warnings: i64,
    pub headers_inserted: i64,
    pub lines_inserted: i64,
    pub records_failed: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunData {
    pub run_id: String,
    pub mode: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub strategy: String,
    pub reports_dir: String,
    pub artefacts: BTreeMap<String, String>,
    pub summary: IngestRunSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_passed: Option<bool>,
    pub overrides: Vec<OverrideRecord>,
    pub next_step: NextStep,
    pub other_actions: Vec<Action>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RowCounts {
    pub headers: i64,
    pub lines: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RollbackData {
    pub snapshot_id: String,
    pub tenant_id: String,
    pub message: String,
    pub before: RowCounts,
    pub restored: RowCounts,
    pub verification: VerificationReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyData {
    pub snapshot_id: String,
    pub verification: VerificationReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupListData {
    pub backup_dir: String,
    pub rows: Vec<BackupMetadata>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaExportData {
    pub path: String,
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbInitData {
    pub db_path: String,
    pub tables: Vec<String>,
}
