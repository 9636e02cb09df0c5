//! The journal ingest pipeline.
//!
//! Phases run strictly in order: read, normalise, group, resolve, validate,
//! back up, load, verify. Each phase writes its artefact before the next
//! starts, so a failed run still leaves its evidence under the run directory.

pub(crate) mod artifacts;
pub(crate) mod backup;
pub(crate) mod group;
pub(crate) mod load;
pub(crate) mod normalize;
pub(crate) mod reader;
pub(crate) mod resolve;
pub(crate) mod rollback;
pub(crate) mod schema;
pub(crate) mod validate;
pub(crate) mod verify;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, SecondsFormat, Utc};
use rand::RngCore;
use serde_json::{Value, json};
use tracing::{info, warn};
use ulid::Ulid;

use crate::config::{IngestConfig, UnbalancedStrategy};
use crate::contracts::types::{
    Action, BackupMetadata, IngestRunData, IngestRunSummary, MigrationSummary, NextStep,
    RowCounts, VerificationReport,
};
use crate::mapping::ColumnMapping;
use crate::state::{backups_dir, ensure_directory, reports_dir};
use crate::store::{SqliteStore, TargetStore};
use crate::{ClientError, ClientResult};

use self::group::group_entries;
use self::load::{LoadOptions, load_entries};
use self::normalize::normalize_rows;
use self::resolve::{Dimension, OverrideSet, ReferenceResolver, load_override_file};
use self::schema::SchemaRegistry;
use self::validate::{ValidationInput, validate};
use self::verify::{ExpectedState, verify};

/// Everything one `ingest` invocation needs beyond the environment.
#[derive(Debug, Clone)]
pub(crate) struct IngestRequest {
    pub(crate) config: IngestConfig,
    pub(crate) home: PathBuf,
    pub(crate) dry_run: bool,
    pub(crate) schema_path: Option<PathBuf>,
    pub(crate) overrides: Vec<(Dimension, PathBuf)>,
    pub(crate) acknowledge_overrides: bool,
    pub(crate) quarantine_invalid: bool,
    pub(crate) sample_size: usize,
    pub(crate) today: NaiveDate,
}

/// Paths of the artefacts written so far, keyed by artefact name.
#[derive(Debug)]
struct ArtefactLog {
    dir: PathBuf,
    written: BTreeMap<String, String>,
}

impl ArtefactLog {
    fn json<T: serde::Serialize>(&mut self, name: &str, value: &T) -> ClientResult<()> {
        let path = artifacts::write_json(&self.dir, name, value)?;
        self.record(name, &path);
        Ok(())
    }

    fn record(&mut self, name: &str, path: &Path) {
        self.written
            .insert(name.to_string(), path.display().to_string());
    }

    fn context(&self, run_id: &str, extra: Value) -> Value {
        let mut data = json!({
            "run_id": run_id,
            "reports_dir": self.dir.display().to_string(),
            "artefacts": self.written,
        });
        if let (Value::Object(target), Value::Object(source)) = (&mut data, extra) {
            target.extend(source);
        }
        data
    }
}

pub(crate) fn run_pipeline(
    request: &IngestRequest,
    sleep: &dyn Fn(Duration),
    rng: &mut dyn RngCore,
) -> ClientResult<IngestRunData> {
    let config = &request.config;
    let strategy = config.require_strategy()?;
    let db_path = config.require_database()?;
    let workbook_path = config.require_workbook()?;
    let tenant = if request.dry_run {
        config.tenant_id.clone()
    } else {
        Some(config.require_tenant()?)
    };
    let suspense = match strategy {
        UnbalancedStrategy::AutoBalance => Some(config.suspense_account_id.clone().ok_or_else(
            || ClientError::suspense_account_unavailable("no suspense account id was supplied"),
        )?),
        _ => None,
    };
    if !request.overrides.is_empty() && !request.acknowledge_overrides {
        let dimensions = request
            .overrides
            .iter()
            .map(|(dimension, _)| dimension.as_str().to_string())
            .collect::<Vec<String>>();
        return Err(ClientError::overrides_not_acknowledged(&dimensions));
    }

    let mapping = match &config.column_mapping_path {
        Some(path) => ColumnMapping::load(path)?,
        None => ColumnMapping::default_bilingual()?,
    };
    let mut override_set = OverrideSet::new();
    for (dimension, path) in &request.overrides {
        override_set
            .entry(*dimension)
            .or_default()
            .extend(load_override_file(path)?);
    }

    let run_id = format!("run_{}", Ulid::new());
    let started = Instant::now();
    let started_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let mode = if request.dry_run { "dry_run" } else { "execute" };
    let mut log = ArtefactLog {
        dir: reports_dir(&request.home, &run_id),
        written: BTreeMap::new(),
    };
    ensure_directory(&log.dir)?;
    info!(run_id = %run_id, mode, strategy = strategy.as_str(), "ingest run started");

    let mut store = if request.dry_run {
        SqliteStore::open_readonly(&db_path, config.timeout)?
    } else {
        SqliteStore::open(&db_path, config.timeout)?
    };

    let registry = match &request.schema_path {
        Some(path) => SchemaRegistry::load_file(path)?,
        None => SchemaRegistry::from_store(&store)?,
    };
    log.json(artifacts::SCHEMA_SNAPSHOT, registry.snapshot())?;

    let table = reader::read_sheet(&workbook_path, &config.sheet_name, &mapping)?;
    log.json(artifacts::EXCEL_STRUCTURE, &table.structure)?;
    reader::require_columns(&table.structure)?;
    log.json(artifacts::COMPARISON, &registry.compare(&mapping))?;

    let normalized = normalize_rows(&table.rows, &mapping);
    let events_path = artifacts::write_normalization_csv(&log.dir, &normalized.events)?;
    log.record(artifacts::NORMALIZATION_EVENTS_CSV, &events_path);

    if let (Some(tenant), Some(suspense)) = (tenant.as_deref(), suspense.as_deref()) {
        let existing =
            store.existing_ids(Dimension::Account.table(), tenant, &[suspense.to_string()])?;
        if !existing.contains(suspense) {
            return Err(ClientError::suspense_account_unavailable(&format!(
                "account `{suspense}` does not exist for tenant `{tenant}`"
            )));
        }
    }

    let grouped = group_entries(&normalized.rows, strategy, suspense.as_deref())?;
    log.json(artifacts::UNBALANCED_ENTRIES, &grouped.balance)?;

    let observed = observed_codes(&grouped.lines);
    let resolver = match tenant.as_deref() {
        Some(tenant) => ReferenceResolver::build(&store, tenant, &observed, &override_set)?,
        None => ReferenceResolver::skipped(&observed),
    };
    log.json(artifacts::ACCOUNT_MAPPING, &resolver.report())?;

    let mut outcome = validate(&ValidationInput {
        normalized: &normalized,
        grouped: &grouped,
        resolver: &resolver,
        registry: &registry,
        mapping: &mapping,
        rows_read: table.rows.len() as i64,
        today: request.today,
        future_horizon_days: config.future_date_horizon_days,
        tenant_id: tenant.as_deref(),
        created_by: config.created_by.as_deref(),
    });
    let validation_passed = outcome.passed();
    let error_entries = outcome.error_entries.len();
    if !validation_passed && request.quarantine_invalid {
        outcome.quarantine();
    }
    log.json(artifacts::VALIDATION_REPORT, &outcome.report)?;
    let csv_path = artifacts::write_validation_csv(&log.dir, &outcome.report)?;
    log.record(artifacts::VALIDATION_REPORT_CSV, &csv_path);

    let unbalanced = grouped
        .balance
        .unbalanced
        .iter()
        .filter(|entry| entry.action == "failed")
        .count();
    if strategy == UnbalancedStrategy::Fail && unbalanced > 0 {
        return Err(ClientError::unbalanced_entries(log.context(
            &run_id,
            json!({ "unbalanced_entries": unbalanced }),
        )));
    }
    if !validation_passed && !request.quarantine_invalid {
        return Err(ClientError::validation_failed(log.context(
            &run_id,
            json!({
                "errors": outcome.report.error_count,
                "warnings": outcome.report.warning_count,
                "entries_with_errors": error_entries,
            }),
        )));
    }

    let tenant_for_load = tenant.clone().unwrap_or_default();
    let (backup, before) = if request.dry_run {
        (None, RowCounts::default())
    } else {
        let metadata = backup::create_backup(&store, &backups_dir(&request.home), &tenant_for_load)?;
        let before = RowCounts {
            headers: metadata.header_count,
            lines: metadata.line_count,
        };
        (Some(metadata), before)
    };

    let loaded = load_entries(
        &mut store,
        &outcome.headers,
        &outcome.lines,
        &LoadOptions {
            tenant_id: &tenant_for_load,
            created_by: config.created_by.as_deref(),
            batch_size: config.batch_size,
            retry: config.retry,
            dry_run: request.dry_run,
        },
        sleep,
    )?;
    let failed_path = artifacts::write_failed_records_csv(&log.dir, &loaded.failed_records)?;
    log.record(artifacts::FAILED_RECORDS_CSV, &failed_path);

    let errors = loaded
        .failed_records
        .iter()
        .map(|record| match (&record.entry_key, record.source_row) {
            (Some(entry), Some(row)) => format!("{entry} (row {row}): {}", record.error),
            (Some(entry), None) => format!("{entry}: {}", record.error),
            _ => record.error.clone(),
        })
        .collect::<Vec<String>>();
    let load_passed = errors.is_empty();
    let summary = MigrationSummary {
        run_id: run_id.clone(),
        mode: mode.to_string(),
        tenant_id: tenant.clone(),
        batch_size: config.batch_size as i64,
        started_at,
        finished_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        wall_time_ms: started.elapsed().as_millis() as i64,
        headers: loaded.headers.clone(),
        lines: loaded.lines.clone(),
        batches: loaded.batches.clone(),
        errors,
        backup: backup.clone(),
        passed: load_passed,
    };
    log.json(artifacts::MIGRATION_SUMMARY, &summary)?;

    let verification = if request.dry_run {
        None
    } else {
        let expected = ExpectedState::after_load(&tenant_for_load, &before, &loaded);
        let report = verify(&store, &expected, request.sample_size, rng)?;
        log.json(artifacts::VERIFICATION_REPORT, &report)?;
        Some(report)
    };

    let snapshot_hint = backup_hint(backup.as_ref());
    if !load_passed {
        warn!(run_id = %run_id, failed = summary.errors.len(), "load finished with failed records");
        return Err(ClientError::load_failed(log.context(
            &run_id,
            json!({
                "records_failed": summary.errors.len(),
                "headers_inserted": loaded.headers.succeeded,
                "lines_inserted": loaded.lines.succeeded,
                "snapshot_id": snapshot_hint,
            }),
        )));
    }
    if let Some(report) = verification.as_ref().filter(|report| !report.passed) {
        return Err(ClientError::verification_failed(log.context(
            &run_id,
            json!({
                "failed_checks": failed_checks(report),
                "snapshot_id": snapshot_hint,
            }),
        )));
    }
    if !validation_passed {
        return Err(ClientError::validation_failed(log.context(
            &run_id,
            json!({
                "errors": outcome.report.error_count,
                "warnings": outcome.report.warning_count,
                "quarantined_entries": outcome.report.quarantined_entries,
                "headers_inserted": loaded.headers.succeeded,
                "lines_inserted": loaded.lines.succeeded,
                "snapshot_id": snapshot_hint,
            }),
        )));
    }

    info!(
        run_id = %run_id,
        headers = loaded.headers.succeeded,
        lines = loaded.lines.succeeded,
        wall_time_ms = summary.wall_time_ms,
        "ingest run finished"
    );

    let message = if request.dry_run {
        format!(
            "Dry run complete: {} entries and {} lines would be loaded.",
            loaded.headers.succeeded, loaded.lines.succeeded
        )
    } else {
        format!(
            "Loaded {} entries and {} lines; verification passed.",
            loaded.headers.succeeded, loaded.lines.succeeded
        )
    };

    Ok(IngestRunData {
        run_id,
        mode: mode.to_string(),
        message,
        tenant_id: tenant,
        strategy: strategy.as_str().to_string(),
        reports_dir: log.dir.display().to_string(),
        artefacts: log.written,
        summary: IngestRunSummary {
            rows_read: outcome.report.rows_read,
            rows_dropped_empty: outcome.report.rows_dropped_empty,
            entries: outcome.headers.len() as i64,
            lines: outcome.lines.len() as i64,
            unbalanced_entries: grouped.balance.unbalanced.len() as i64,
            errors: outcome.report.error_count,
            warnings: outcome.report.warning_count,
            headers_inserted: loaded.headers.succeeded,
            lines_inserted: loaded.lines.succeeded,
            records_failed: 0,
        },
        backup: backup.clone(),
        verification_passed: verification.as_ref().map(|report| report.passed),
        overrides: resolver.overrides(),
        next_step: next_step(request.dry_run, strategy, backup.as_ref(), &log.dir),
        other_actions: other_actions(backup.as_ref()),
    })
}

fn observed_codes(lines: &[group::LineDraft]) -> BTreeMap<Dimension, BTreeSet<String>> {
    let mut observed: BTreeMap<Dimension, BTreeSet<String>> = BTreeMap::new();
    for line in lines {
        // Lines with a known account id (the suspense line) have nothing to resolve.
        let account = if line.account_id.is_none() {
            line.account_code.as_ref()
        } else {
            None
        };
        let codes = [
            (Dimension::Account, account),
            (Dimension::Classification, line.classification_code.as_ref()),
            (Dimension::Project, line.project_code.as_ref()),
            (Dimension::WorkAnalysis, line.work_analysis_code.as_ref()),
            (Dimension::SubTree, line.sub_tree_code.as_ref()),
        ];
        for (dimension, code) in codes {
            if let Some(code) = code {
                observed.entry(dimension).or_default().insert(code.clone());
            }
        }
    }
    observed
}

fn failed_checks(report: &VerificationReport) -> Vec<String> {
    report
        .checks
        .iter()
        .filter(|check| !check.passed)
        .map(|check| check.name.clone())
        .collect()
}

fn backup_hint(backup: Option<&BackupMetadata>) -> Option<String> {
    backup.map(|metadata| metadata.snapshot_id.clone())
}

fn next_step(
    dry_run: bool,
    strategy: UnbalancedStrategy,
    backup: Option<&BackupMetadata>,
    reports_dir: &Path,
) -> NextStep {
    if dry_run {
        return NextStep {
            label: "Run the load for real".to_string(),
            command: format!("qayd ingest --strategy {}", strategy.as_str()),
        };
    }
    let report = reports_dir.join(artifacts::VERIFICATION_REPORT);
    match backup {
        Some(metadata) => NextStep {
            label: format!(
                "Review {}; snapshot {} restores the pre-load state",
                report.display(),
                metadata.snapshot_id
            ),
            command: "qayd backup list".to_string(),
        },
        None => NextStep {
            label: format!("Review {}", report.display()),
            command: "qayd backup list".to_string(),
        },
    }
}

fn other_actions(backup: Option<&BackupMetadata>) -> Vec<Action> {
    let mut actions = vec![Action {
        label: "Inspect the workbook structure".to_string(),
        command: "qayd inspect".to_string(),
        risk: None,
    }];
    if let Some(metadata) = backup {
        actions.push(Action {
            label: "Restore the tenant to its pre-load state".to_string(),
            command: format!("qayd rollback {} --yes", metadata.snapshot_id),
            risk: Some("deletes every header and line row of the tenant before restoring".to_string()),
        });
    }
    actions
}
