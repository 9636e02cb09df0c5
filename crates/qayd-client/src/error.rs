use std::path::Path;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

pub(crate) const INGEST_HELP_COMMAND: &str = "qayd ingest --help";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Configuration,
    InputShape,
    Normalisation,
    Resolution,
    Accounting,
    Schema,
    Transport,
    FatalInternal,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::InputShape => "input_shape",
            Self::Normalisation => "normalisation",
            Self::Resolution => "resolution",
            Self::Accounting => "accounting",
            Self::Schema => "schema",
            Self::Transport => "transport",
            Self::FatalInternal => "fatal_internal",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl ClientError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_ingest_help(self) -> Self {
        let data = self.data.clone().unwrap_or_else(|| json!({}));
        self.with_data(merge_ingest_help_data(data))
    }

    pub fn class(&self) -> ErrorClass {
        match self.code.as_str() {
            "invalid_argument"
            | "invalid_config"
            | "missing_config"
            | "invalid_mapping"
            | "mapping_file_unreadable"
            | "missing_unbalanced_strategy"
            | "suspense_account_unavailable"
            | "overrides_not_acknowledged"
            | "override_file_invalid"
            | "missing_tenant"
            | "rollback_confirmation_required" => ErrorClass::Configuration,
            "file_not_found"
            | "workbook_unreadable"
            | "sheet_not_found"
            | "header_mismatch"
            | "schema_snapshot_invalid"
            | "snapshot_not_found" => ErrorClass::InputShape,
            "validation_failed" => ErrorClass::Normalisation,
            "unbalanced_entries" => ErrorClass::Accounting,
            "load_failed" | "verification_failed" | "rollback_count_mismatch" => {
                ErrorClass::Schema
            }
            "transport_failed" | "database_locked" | "database_unavailable" | "backup_failed" => {
                ErrorClass::Transport
            }
            _ => ErrorClass::FatalInternal,
        }
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::new(
            "invalid_argument",
            message,
            vec!["Run `qayd --help` for usage.".to_string()],
        )
    }

    pub fn invalid_argument_with_recovery(message: &str, recovery_steps: Vec<String>) -> Self {
        Self::new("invalid_argument", message, recovery_steps)
    }

    pub fn invalid_argument_for_command(message: &str, command_path: Option<&str>) -> Self {
        let help = match command_path {
            Some(path) => format!("Run `qayd {path} --help` for usage."),
            None => "Run `qayd --help` for usage.".to_string(),
        };
        let error = Self::invalid_argument_with_recovery(message, vec![help]);
        if command_path == Some("ingest") {
            error.with_ingest_help()
        } else {
            error
        }
    }

    pub fn invalid_config(variable: &str, detail: &str) -> Self {
        Self::new(
            "invalid_config",
            &format!("Configuration value `{variable}` is invalid: {detail}"),
            vec![format!(
                "Fix `{variable}` in the environment or pass the matching command-line flag."
            )],
        )
        .with_data(json!({ "variable": variable }))
    }

    pub fn missing_config(variable: &str) -> Self {
        Self::new(
            "missing_config",
            &format!("Configuration value `{variable}` is required but was not set."),
            vec![format!(
                "Set `{variable}` in the environment or pass the matching command-line flag."
            )],
        )
        .with_data(json!({ "variable": variable }))
    }

    pub fn missing_tenant() -> Self {
        Self::new(
            "missing_tenant",
            "A tenant id is required to write to the target database.",
            vec![
                "Set `TENANT_ID` to the owning organisation id.".to_string(),
                "Or rerun with `--dry-run` to validate without writing.".to_string(),
            ],
        )
        .with_ingest_help()
    }

    pub fn invalid_mapping(detail: &str) -> Self {
        Self::new(
            "invalid_mapping",
            &format!("Column mapping is invalid: {detail}"),
            vec![
                "Fix the listed row in the column-mapping file.".to_string(),
                "Allowed declared types: integer, decimal, date, string.".to_string(),
            ],
        )
    }

    pub fn mapping_file_unreadable(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "mapping_file_unreadable",
            &format!("Could not read column mapping `{location}`: {detail}"),
            vec!["Verify the mapping path exists and is a readable CSV file.".to_string()],
        )
    }

    pub fn missing_unbalanced_strategy() -> Self {
        Self::new(
            "missing_unbalanced_strategy",
            "No unbalanced-entry strategy was chosen for this run.",
            vec![
                "Pass `--strategy fail`, `--strategy skip` or `--strategy auto-balance`."
                    .to_string(),
                "Or set `UNBALANCED_STRATEGY` in the environment.".to_string(),
            ],
        )
        .with_ingest_help()
    }

    pub fn suspense_account_unavailable(detail: &str) -> Self {
        Self::new(
            "suspense_account_unavailable",
            &format!("The auto-balance strategy cannot run: {detail}"),
            vec![
                "Pass `--suspense-account <account-id>` with an existing account id.".to_string(),
                "Or choose `--strategy skip` or `--strategy fail`.".to_string(),
            ],
        )
    }

    pub fn overrides_not_acknowledged(dimensions: &[String]) -> Self {
        Self::new(
            "overrides_not_acknowledged",
            "Manual code overrides were supplied without operator acknowledgement.",
            vec![
                "Review the override files, then rerun with `--acknowledge-overrides`.".to_string(),
            ],
        )
        .with_data(json!({ "dimensions": dimensions }))
    }

    pub fn override_file_invalid(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "override_file_invalid",
            &format!("Manual override file `{location}` is invalid: {detail}"),
            vec!["Provide a JSON object of `{\"source_code\": \"target_id\"}` pairs.".to_string()],
        )
    }

    pub fn file_not_found(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "file_not_found",
            &format!("Workbook `{location}` does not exist."),
            vec![
                "Verify the path, or set `EXCEL_FILE_PATH` to the journal workbook.".to_string(),
            ],
        )
        .with_data(json!({ "path": location }))
    }

    pub fn workbook_unreadable(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "workbook_unreadable",
            &format!("Workbook `{location}` could not be opened: {detail}"),
            vec!["Re-export the workbook as .xlsx and retry.".to_string()],
        )
    }

    pub fn sheet_not_found(sheet: &str, available: &[String], near_match: Option<&str>) -> Self {
        let mut recovery_steps = vec![
            "Pass `--sheet` with the exact sheet name, including any trailing spaces.".to_string(),
        ];
        if let Some(candidate) = near_match {
            recovery_steps.push(format!(
                "A sheet named `{candidate}` exists; it differs only in surrounding whitespace."
            ));
        }
        Self::new(
            "sheet_not_found",
            &format!("Sheet `{sheet}` was not found in the workbook."),
            recovery_steps,
        )
        .with_data(json!({
            "requested_sheet": sheet,
            "available_sheets": available,
            "near_match": near_match,
        }))
    }

    pub fn header_mismatch(missing: Vec<String>, actual_headers: Vec<String>) -> Self {
        Self::new(
            "header_mismatch",
            "Sheet headers do not cover every required column of the mapping.",
            vec![
                "Add the missing columns or extend the column mapping with their headers."
                    .to_string(),
                "Run `qayd inspect` to review matched and extra columns.".to_string(),
            ],
        )
        .with_data(json!({
            "missing_required": missing,
            "actual_headers": actual_headers,
        }))
        .with_ingest_help()
    }

    pub fn schema_snapshot_invalid(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "schema_snapshot_invalid",
            &format!("Schema snapshot `{location}` could not be loaded: {detail}"),
            vec![
                "Regenerate it with `qayd schema export`.".to_string(),
                "Or omit `--schema` to read live database metadata.".to_string(),
            ],
        )
    }

    pub fn validation_failed(summary: Value) -> Self {
        Self::new(
            "validation_failed",
            "Validation reported errors. No rows were written.",
            vec![
                "Fix the issues listed in validation_report.json.".to_string(),
                "Rerun `qayd ingest --dry-run` until it passes.".to_string(),
                "Or rerun with `--quarantine-invalid` to load only clean entries.".to_string(),
            ],
        )
        .with_data(summary)
        .with_ingest_help()
    }

    pub fn unbalanced_entries(summary: Value) -> Self {
        Self::new(
            "unbalanced_entries",
            "Unbalanced journal entries were found and the fail strategy is active. No rows were written.",
            vec![
                "Review unbalanced_entries.json.".to_string(),
                "Rerun with `--strategy skip` or `--strategy auto-balance` if appropriate."
                    .to_string(),
            ],
        )
        .with_data(summary)
    }

    pub fn load_failed(summary: Value) -> Self {
        Self::new(
            "load_failed",
            "Some records failed to load. See migration_summary.json for details.",
            vec![
                "Inspect the failed records in migration_summary.json.".to_string(),
                "Roll back with `qayd rollback <snapshot-id>` if the partial load is unwanted."
                    .to_string(),
            ],
        )
        .with_data(summary)
    }

    pub fn verification_failed(summary: Value) -> Self {
        Self::new(
            "verification_failed",
            "Post-load verification failed. See verification_report.json.",
            vec![
                "Review the failing checks in verification_report.json.".to_string(),
                "Roll back with `qayd rollback <snapshot-id>` if needed.".to_string(),
            ],
        )
        .with_data(summary)
    }

    pub fn rollback_confirmation_required(snapshot_id: &str) -> Self {
        Self::new(
            "rollback_confirmation_required",
            &format!(
                "Rolling back to snapshot `{snapshot_id}` deletes the tenant's current rows and needs confirmation."
            ),
            vec![
                format!("Rerun `qayd rollback {snapshot_id} --yes` to confirm."),
                "Or set `AUTO_ROLLBACK=true` for automated pipelines.".to_string(),
            ],
        )
    }

    pub fn snapshot_not_found(snapshot_id: &str) -> Self {
        Self::new(
            "snapshot_not_found",
            &format!("Backup snapshot `{snapshot_id}` was not found."),
            vec!["Run `qayd backup list` to find a valid snapshot id.".to_string()],
        )
        .with_data(json!({ "snapshot_id": snapshot_id }))
    }

    pub fn backup_failed(detail: &str) -> Self {
        Self::new(
            "backup_failed",
            &format!("Backup snapshot could not be written: {detail}. No rows were written."),
            vec!["Check free space and permissions under `QAYD_HOME`.".to_string()],
        )
    }

    pub fn rollback_count_mismatch(expected: Value, actual: Value) -> Self {
        Self::new(
            "rollback_count_mismatch",
            "Restored row counts do not match the snapshot.",
            vec!["Inspect the target tables before retrying the rollback.".to_string()],
        )
        .with_data(json!({ "expected": expected, "actual": actual }))
    }

    pub fn transport_failed(detail: &str) -> Self {
        Self::new(
            "transport_failed",
            &format!("Database call failed: {detail}"),
            vec!["Retry once the database is reachable.".to_string()],
        )
    }

    pub fn database_locked(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "database_locked",
            &format!("Target database is locked at `{location}`."),
            vec![format!(
                "Close other processes using `{location}` so the lock is released."
            )],
        )
    }

    pub fn database_unavailable(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "database_unavailable",
            &format!("Target database at `{location}` could not be used: {detail}"),
            vec!["Verify `DATABASE_URL` points at a readable SQLite database.".to_string()],
        )
    }

    pub fn store_failed(detail: &str) -> Self {
        Self::new("internal_store_error", detail, Vec::new())
    }

    pub fn migration_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "internal_migration_failed",
            &format!("Schema bootstrap failed at `{location}`: {detail}"),
            vec!["Run `qayd db init` only against an empty database.".to_string()],
        )
    }

    pub fn artefact_write_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "internal_artefact_write_failed",
            &format!("Could not write `{location}`: {detail}"),
            vec!["Check permissions under `QAYD_HOME`.".to_string()],
        )
    }

    pub fn internal_invariant(message: &str) -> Self {
        Self::new("internal_invariant", message, Vec::new())
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }
}

fn merge_ingest_help_data(mut data: Value) -> Value {
    if !data.is_object() {
        data = json!({});
    }

    if let Some(object) = data.as_object_mut() {
        object.insert(
            "help_command".to_string(),
            Value::String(INGEST_HELP_COMMAND.to_string()),
        );
    }

    data
}

pub type ClientResult<T> = Result<T, ClientError>;
