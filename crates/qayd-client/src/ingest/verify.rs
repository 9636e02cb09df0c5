use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use rand::RngCore;
use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::contracts::types::{RowCounts, VerificationCheck, VerificationReport};
use crate::ingest::load::LoadOutcome;
use crate::ingest::resolve::Dimension;
use crate::migrations::{HEADER_TABLE, LINE_TABLE};
use crate::store::{Record, TargetStore, record_str};
use crate::ClientResult;

/// Lines listed per failing check before evidence is truncated.
const EVIDENCE_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExpectedLine {
    pub(crate) id: String,
    pub(crate) header_id: String,
    pub(crate) account_id: Option<String>,
    pub(crate) debit: Decimal,
    pub(crate) credit: Decimal,
}

/// What the target must contain after a load or a restore.
#[derive(Debug, Clone)]
pub(crate) struct ExpectedState {
    pub(crate) tenant_id: String,
    pub(crate) counts: RowCounts,
    pub(crate) lines: Vec<ExpectedLine>,
}

impl ExpectedState {
    /// Rows present before the load plus everything the loader reports as inserted.
    pub(crate) fn after_load(tenant_id: &str, before: &RowCounts, outcome: &LoadOutcome) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            counts: RowCounts {
                headers: before.headers + outcome.headers.succeeded,
                lines: before.lines + outcome.lines.succeeded,
            },
            lines: outcome
                .inserted_lines
                .iter()
                .map(|line| ExpectedLine {
                    id: line.id.clone(),
                    header_id: line.header_id.clone(),
                    account_id: line.account_id.clone(),
                    debit: line.debit,
                    credit: line.credit,
                })
                .collect(),
        }
    }

    /// Exactly the rows of a backup snapshot.
    pub(crate) fn from_snapshot(tenant_id: &str, headers: &[Record], lines: &[Record]) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            counts: RowCounts {
                headers: headers.len() as i64,
                lines: lines.len() as i64,
            },
            lines: lines
                .iter()
                .map(|record| ExpectedLine {
                    id: record_str(record, "id").unwrap_or_default().to_string(),
                    header_id: record_str(record, "transaction_id")
                        .unwrap_or_default()
                        .to_string(),
                    account_id: record_str(record, "account_id").map(str::to_string),
                    debit: record.get("debit_amount").and_then(decimal_of).unwrap_or_default(),
                    credit: record
                        .get("credit_amount")
                        .and_then(decimal_of)
                        .unwrap_or_default(),
                })
                .collect(),
        }
    }
}

pub(crate) fn tenant_counts(store: &dyn TargetStore, tenant_id: &str) -> ClientResult<RowCounts> {
    Ok(RowCounts {
        headers: store.count_tenant_rows(HEADER_TABLE, tenant_id)?,
        lines: store.count_tenant_rows(LINE_TABLE, tenant_id)?,
    })
}

/// Runs every post-write check. A failing check never short-circuits the others.
pub(crate) fn verify(
    store: &dyn TargetStore,
    expected: &ExpectedState,
    sample_size: usize,
    rng: &mut dyn RngCore,
) -> ClientResult<VerificationReport> {
    let tenant = expected.tenant_id.as_str();
    let mut checks = Vec::with_capacity(5);

    let actual = tenant_counts(store, tenant)?;
    checks.push(VerificationCheck {
        name: "record_count".to_string(),
        passed: actual == expected.counts,
        evidence: json!({ "expected": expected.counts, "actual": actual }),
    });

    let orphans = store.orphan_line_ids(tenant)?;
    checks.push(VerificationCheck {
        name: "referential_integrity".to_string(),
        passed: orphans.is_empty(),
        evidence: json!({
            "orphan_lines": orphans.len(),
            "examples": orphans.iter().take(EVIDENCE_LIMIT).collect::<Vec<_>>(),
        }),
    });

    let ids = expected
        .lines
        .iter()
        .map(|line| line.id.clone())
        .collect::<Vec<String>>();
    let stored = store
        .fetch_by_ids(LINE_TABLE, &ids)?
        .into_iter()
        .filter_map(|record| record_str(&record, "id").map(str::to_string).map(|id| (id, record)))
        .collect::<HashMap<String, Record>>();

    checks.push(sample_comparison(store, expected, &stored, sample_size, rng)?);
    checks.push(account_mapping(store, expected, &stored)?);
    checks.push(dimension_integrity(store, tenant, &stored)?);

    let passed = checks.iter().all(|check| check.passed);
    if passed {
        info!(tenant, "verification passed");
    } else {
        let failed = checks
            .iter()
            .filter(|check| !check.passed)
            .map(|check| check.name.as_str())
            .collect::<Vec<&str>>()
            .join(",");
        warn!(tenant, failed = %failed, "verification failed");
    }

    Ok(VerificationReport {
        tenant_id: tenant.to_string(),
        passed,
        sample_size: sample_size.min(expected.lines.len()) as i64,
        checks,
    })
}

/// Compares sampled lines with what was written and checks their required fields.
fn sample_comparison(
    store: &dyn TargetStore,
    expected: &ExpectedState,
    stored: &HashMap<String, Record>,
    sample_size: usize,
    rng: &mut dyn RngCore,
) -> ClientResult<VerificationCheck> {
    let sample = expected
        .lines
        .choose_multiple(rng, sample_size)
        .collect::<Vec<&ExpectedLine>>();

    let mut header_ids = sample
        .iter()
        .map(|line| line.header_id.clone())
        .collect::<Vec<String>>();
    header_ids.sort();
    header_ids.dedup();
    let headers = store
        .fetch_by_ids(HEADER_TABLE, &header_ids)?
        .into_iter()
        .filter_map(|record| record_str(&record, "id").map(str::to_string).map(|id| (id, record)))
        .collect::<HashMap<String, Record>>();

    let mut mismatches = Vec::new();
    for line in &sample {
        let Some(record) = stored.get(&line.id) else {
            mismatches.push(json!({ "id": line.id, "problem": "missing" }));
            continue;
        };
        let mut fields = Vec::new();
        if record_str(record, "transaction_id") != Some(line.header_id.as_str()) {
            fields.push("transaction_id");
        }
        if record_str(record, "account_id") != line.account_id.as_deref() {
            fields.push("account_id");
        }
        let debit = record.get("debit_amount").and_then(decimal_of);
        let credit = record.get("credit_amount").and_then(decimal_of);
        if debit != Some(line.debit) {
            fields.push("debit_amount");
        }
        if credit != Some(line.credit) {
            fields.push("credit_amount");
        }

        let mut empty = Vec::new();
        let header = headers.get(&line.header_id);
        for column in ["reference_number", "entry_date"] {
            if !header.is_some_and(|header| is_populated(header, column)) {
                empty.push(column);
            }
        }
        if !is_populated(record, "account_id") {
            empty.push("account_id");
        }
        let positive = [debit, credit]
            .into_iter()
            .filter(|amount| amount.is_some_and(|amount| amount > Decimal::ZERO))
            .count();
        if positive != 1 {
            empty.push("amount");
        }

        if !fields.is_empty() || !empty.is_empty() {
            mismatches.push(json!({ "id": line.id, "fields": fields, "unpopulated": empty }));
        }
    }

    Ok(VerificationCheck {
        name: "sample_comparison".to_string(),
        passed: mismatches.is_empty(),
        evidence: json!({
            "sampled": sample.len(),
            "mismatches": mismatches.len(),
            "examples": mismatches.into_iter().take(EVIDENCE_LIMIT).collect::<Vec<Value>>(),
        }),
    })
}

fn is_populated(record: &Record, column: &str) -> bool {
    match record.get(column) {
        Some(Value::String(text)) => !text.trim().is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

fn account_mapping(
    store: &dyn TargetStore,
    expected: &ExpectedState,
    stored: &HashMap<String, Record>,
) -> ClientResult<VerificationCheck> {
    let mut missing_account = Vec::new();
    let mut account_ids = Vec::new();
    for line in &expected.lines {
        match stored.get(&line.id).and_then(|record| record_str(record, "account_id")) {
            Some(account_id) => account_ids.push(account_id.to_string()),
            None => missing_account.push(line.id.clone()),
        }
    }
    account_ids.sort();
    account_ids.dedup();

    let existing = store.existing_ids(
        Dimension::Account.table(),
        &expected.tenant_id,
        &account_ids,
    )?;
    let unknown = account_ids
        .into_iter()
        .filter(|id| !existing.contains(id))
        .collect::<Vec<String>>();

    Ok(VerificationCheck {
        name: "account_mapping".to_string(),
        passed: missing_account.is_empty() && unknown.is_empty(),
        evidence: json!({
            "lines_without_account": missing_account.len(),
            "unknown_account_ids": unknown.into_iter().take(EVIDENCE_LIMIT).collect::<Vec<String>>(),
        }),
    })
}

fn dimension_integrity(
    store: &dyn TargetStore,
    tenant: &str,
    stored: &HashMap<String, Record>,
) -> ClientResult<VerificationCheck> {
    let mut dangling: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();

    for dimension in Dimension::ALL
        .into_iter()
        .filter(|dimension| *dimension != Dimension::Account)
    {
        let mut ids = stored
            .values()
            .filter_map(|record| record_str(record, dimension.line_column()))
            .map(str::to_string)
            .collect::<Vec<String>>();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            continue;
        }
        let existing = store.existing_ids(dimension.table(), tenant, &ids)?;
        let missing = ids
            .into_iter()
            .filter(|id| !existing.contains(id))
            .take(EVIDENCE_LIMIT)
            .collect::<Vec<String>>();
        if !missing.is_empty() {
            dangling.insert(dimension.as_str(), missing);
        }
    }

    Ok(VerificationCheck {
        name: "dimension_integrity".to_string(),
        passed: dangling.is_empty(),
        evidence: json!({ "dangling": dangling }),
    })
}

fn decimal_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(text) => Decimal::from_str(text.trim()).ok(),
        Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
        _ => None,
    }
}
