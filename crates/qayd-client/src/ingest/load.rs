use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RetryPolicy;
use crate::contracts::types::{BatchResult, FailedRecord, TableLoadSummary};
use crate::ingest::group::HeaderDraft;
use crate::ingest::resolve::Dimension;
use crate::ingest::validate::ResolvedLine;
use crate::migrations::{HEADER_TABLE, LINE_TABLE};
use crate::store::{Record, RecordOutcome, TargetStore};
use crate::ClientResult;

const PARENT_NOT_INSERTED: &str = "parent header was not inserted";
const APPROVAL_STATUS: &str = "approved";

/// Renders an amount with exactly two decimal places.
pub(crate) fn amount_text(amount: Decimal) -> String {
    let mut value = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    value.rescale(2);
    value.to_string()
}

pub(crate) fn header_record(header: &HeaderDraft, tenant_id: &str, created_by: Option<&str>) -> Record {
    let mut record = Record::new();
    record.insert("org_id".to_string(), json!(tenant_id));
    record.insert("reference_number".to_string(), json!(header.entry_no));
    record.insert(
        "entry_date".to_string(),
        json!(header.entry_date.format("%Y-%m-%d").to_string()),
    );
    record.insert("fiscal_year".to_string(), json!(header.fiscal_year));
    record.insert("month".to_string(), json!(header.month));
    if let Some(description) = &header.description {
        record.insert("description".to_string(), json!(description));
    }
    record.insert("total_debit".to_string(), json!(amount_text(header.total_debit)));
    record.insert("total_credit".to_string(), json!(amount_text(header.total_credit)));
    record.insert("line_count".to_string(), json!(header.line_count));
    record.insert("approval_status".to_string(), json!(APPROVAL_STATUS));
    if let Some(created_by) = created_by {
        record.insert("created_by".to_string(), json!(created_by));
    }
    record
}

pub(crate) fn line_record(line: &ResolvedLine, tenant_id: &str, header_id: &str, line_no: i64) -> Record {
    let mut record = Record::new();
    record.insert("org_id".to_string(), json!(tenant_id));
    record.insert("transaction_id".to_string(), json!(header_id));
    record.insert("line_no".to_string(), json!(line_no));
    for dimension in Dimension::ALL {
        if let Some(id) = line.dimension_ids.get(&dimension) {
            record.insert(dimension.line_column().to_string(), json!(id));
        }
    }
    record.insert("debit_amount".to_string(), json!(amount_text(line.draft.debit)));
    record.insert("credit_amount".to_string(), json!(amount_text(line.draft.credit)));
    if let Some(description) = &line.draft.description {
        record.insert("description".to_string(), json!(description));
    }
    record
}

pub(crate) struct LoadOptions<'a> {
    pub(crate) tenant_id: &'a str,
    pub(crate) created_by: Option<&'a str>,
    pub(crate) batch_size: usize,
    pub(crate) retry: RetryPolicy,
    pub(crate) dry_run: bool,
}

/// A line row as written, kept for verification.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InsertedLine {
    pub(crate) id: String,
    pub(crate) header_id: String,
    pub(crate) entry_key: String,
    pub(crate) account_id: Option<String>,
    pub(crate) debit: Decimal,
    pub(crate) credit: Decimal,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct LoadOutcome {
    pub(crate) batches: Vec<BatchResult>,
    pub(crate) headers: TableLoadSummary,
    pub(crate) lines: TableLoadSummary,
    /// Entry key to inserted (or, in dry runs, placeholder) header id.
    pub(crate) header_ids: BTreeMap<String, String>,
    pub(crate) inserted_lines: Vec<InsertedLine>,
    pub(crate) failed_records: Vec<FailedRecord>,
}

struct PendingRecord {
    entry_key: String,
    source_row: Option<i64>,
    record: Record,
}

/// Writes headers, then lines, in batches. Transient store errors retry the whole batch.
pub(crate) fn load_entries(
    store: &mut dyn TargetStore,
    headers: &[HeaderDraft],
    lines: &[ResolvedLine],
    options: &LoadOptions<'_>,
    sleep: &dyn Fn(Duration),
) -> ClientResult<LoadOutcome> {
    let mut outcome = LoadOutcome {
        headers: TableLoadSummary {
            table: HEADER_TABLE.to_string(),
            ..TableLoadSummary::default()
        },
        lines: TableLoadSummary {
            table: LINE_TABLE.to_string(),
            ..TableLoadSummary::default()
        },
        ..LoadOutcome::default()
    };

    let pending_headers = headers
        .iter()
        .map(|header| PendingRecord {
            entry_key: header.entry_key.clone(),
            source_row: header.source_rows.first().copied(),
            record: header_record(header, options.tenant_id, options.created_by),
        })
        .collect::<Vec<PendingRecord>>();

    let header_ids = load_table(store, HEADER_TABLE, &pending_headers, options, sleep, &mut outcome);
    for (pending, id) in pending_headers.iter().zip(header_ids) {
        if let Some(id) = id {
            outcome.header_ids.insert(pending.entry_key.clone(), id);
        }
    }

    let mut base_line_numbers: HashMap<String, i64> = HashMap::new();
    let mut pending_lines = Vec::with_capacity(lines.len());
    let mut line_meta = Vec::with_capacity(lines.len());
    for line in lines {
        let Some(header_id) = outcome.header_ids.get(&line.draft.entry_key).cloned() else {
            outcome.lines.attempted += 1;
            outcome.lines.failed += 1;
            outcome.failed_records.push(FailedRecord {
                entry_key: Some(line.draft.entry_key.clone()),
                source_row: line.draft.source_row,
                payload: Value::Null,
                error: PARENT_NOT_INSERTED.to_string(),
            });
            continue;
        };

        let base = match base_line_numbers.get(&header_id) {
            Some(base) => *base,
            None => {
                let base = if options.dry_run {
                    0
                } else {
                    store.max_line_no(&header_id)?
                };
                base_line_numbers.insert(header_id.clone(), base);
                base
            }
        };

        pending_lines.push(PendingRecord {
            entry_key: line.draft.entry_key.clone(),
            source_row: line.draft.source_row,
            record: line_record(line, options.tenant_id, &header_id, base + line.draft.position),
        });
        line_meta.push((line, header_id));
    }

    let line_ids = load_table(store, LINE_TABLE, &pending_lines, options, sleep, &mut outcome);
    for ((line, header_id), id) in line_meta.into_iter().zip(line_ids) {
        if let Some(id) = id {
            outcome.inserted_lines.push(InsertedLine {
                id,
                header_id,
                entry_key: line.draft.entry_key.clone(),
                account_id: line.account_id().map(str::to_string),
                debit: line.draft.debit,
                credit: line.draft.credit,
            });
        }
    }

    info!(
        headers_inserted = outcome.headers.succeeded,
        lines_inserted = outcome.lines.succeeded,
        failed = outcome.failed_records.len(),
        dry_run = options.dry_run,
        "load finished"
    );

    Ok(outcome)
}

fn load_table(
    store: &mut dyn TargetStore,
    table: &str,
    pending: &[PendingRecord],
    options: &LoadOptions<'_>,
    sleep: &dyn Fn(Duration),
    outcome: &mut LoadOutcome,
) -> Vec<Option<String>> {
    let mut ids = Vec::with_capacity(pending.len());
    let batch_size = options.batch_size.max(1);

    for chunk in pending.chunks(batch_size) {
        let started = Instant::now();
        let records = chunk
            .iter()
            .map(|item| item.record.clone())
            .collect::<Vec<Record>>();

        let (outcomes, attempts) = if options.dry_run {
            let simulated = records
                .iter()
                .map(|_| RecordOutcome::Inserted(Uuid::new_v4().to_string()))
                .collect::<Vec<RecordOutcome>>();
            (simulated, 1)
        } else {
            insert_with_retry(store, table, &records, options.retry, sleep)
        };

        let mut result = BatchResult {
            ordinal: outcome.batches.len() as i64 + 1,
            table: table.to_string(),
            records_attempted: chunk.len() as i64,
            records_succeeded: 0,
            records_failed: 0,
            attempts,
            failed_records: Vec::new(),
            wall_time_ms: 0,
        };

        for (index, item) in chunk.iter().enumerate() {
            match outcomes.get(index) {
                Some(RecordOutcome::Inserted(id)) => {
                    result.records_succeeded += 1;
                    ids.push(Some(id.clone()));
                }
                other => {
                    let error = match other {
                        Some(RecordOutcome::Rejected(message)) => message.clone(),
                        _ => "store returned no outcome for this record".to_string(),
                    };
                    result.records_failed += 1;
                    result.failed_records.push(FailedRecord {
                        entry_key: Some(item.entry_key.clone()),
                        source_row: item.source_row,
                        payload: Value::Object(item.record.clone()),
                        error,
                    });
                    ids.push(None);
                }
            }
        }
        result.wall_time_ms = started.elapsed().as_millis() as i64;

        info!(
            table,
            batch = result.ordinal,
            succeeded = result.records_succeeded,
            failed = result.records_failed,
            attempts = result.attempts,
            "batch written"
        );

        let summary = if table == HEADER_TABLE {
            &mut outcome.headers
        } else {
            &mut outcome.lines
        };
        summary.batches += 1;
        summary.attempted += result.records_attempted;
        summary.succeeded += result.records_succeeded;
        summary.failed += result.records_failed;
        outcome
            .failed_records
            .extend(result.failed_records.iter().cloned());
        outcome.batches.push(result);
    }

    ids
}

fn insert_with_retry(
    store: &mut dyn TargetStore,
    table: &str,
    records: &[Record],
    retry: RetryPolicy,
    sleep: &dyn Fn(Duration),
) -> (Vec<RecordOutcome>, i64) {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match store.insert_batch(table, records) {
            Ok(outcomes) => return (outcomes, i64::from(attempt)),
            Err(error) if error.is_transient() && attempt <= retry.max_retries => {
                let delay = retry.delay_for(attempt);
                warn!(
                    table,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error.message,
                    "transient store error; retrying batch"
                );
                sleep(delay);
            }
            Err(error) => {
                warn!(table, attempt, error = %error.message, "batch failed");
                let rejected = records
                    .iter()
                    .map(|_| RecordOutcome::Rejected(error.message.clone()))
                    .collect();
                return (rejected, i64::from(attempt));
            }
        }
    }
}
