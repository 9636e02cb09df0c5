use std::collections::BTreeMap;
use std::path::Path;

use serde_json::json;

use crate::commands::common::{load_config, load_home};
use crate::config::DEFAULT_SAMPLE_SIZE;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{RollbackData, VerifyData};
use crate::ingest::rollback::{rollback, verify_against_snapshot};
use crate::state::backups_dir;
use crate::store::SqliteStore;
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct RollbackOptions<'a> {
    pub snapshot_id: String,
    /// Operator confirmation; `AUTO_ROLLBACK=true` confirms as well.
    pub yes: bool,
    pub sample_size: Option<usize>,
    pub home_override: Option<&'a Path>,
    pub environment: Option<&'a BTreeMap<String, String>>,
}

pub fn run(snapshot_id: &str, yes: bool) -> ClientResult<SuccessEnvelope> {
    run_with_options(RollbackOptions {
        snapshot_id: snapshot_id.to_string(),
        yes,
        ..RollbackOptions::default()
    })
}

#[doc(hidden)]
pub fn run_with_options(options: RollbackOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let config = load_config(options.environment)?;
    let confirmed = options.yes || config.auto_rollback;
    let backup_dir = backups_dir(&load_home(options.home_override)?);
    let db_path = config.require_database()?;
    let mut store = SqliteStore::open(&db_path, config.timeout)?;
    let mut rng = rand::thread_rng();

    let outcome = rollback(
        &mut store,
        &backup_dir,
        &options.snapshot_id,
        confirmed,
        options.sample_size.unwrap_or(DEFAULT_SAMPLE_SIZE),
        &mut rng,
    )?;

    let data = RollbackData {
        message: format!(
            "Restored {} headers and {} lines for tenant `{}`.",
            outcome.restored.headers, outcome.restored.lines, outcome.metadata.tenant_id
        ),
        snapshot_id: outcome.metadata.snapshot_id,
        tenant_id: outcome.metadata.tenant_id,
        before: outcome.before,
        restored: outcome.restored,
        verification: outcome.verification,
    };
    success("rollback", data)
}

pub fn verify_snapshot(snapshot_id: &str) -> ClientResult<SuccessEnvelope> {
    verify_snapshot_with_options(RollbackOptions {
        snapshot_id: snapshot_id.to_string(),
        ..RollbackOptions::default()
    })
}

#[doc(hidden)]
pub fn verify_snapshot_with_options(options: RollbackOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let config = load_config(options.environment)?;
    let backup_dir = backups_dir(&load_home(options.home_override)?);
    let db_path = config.require_database()?;
    let store = SqliteStore::open_readonly(&db_path, config.timeout)?;
    let mut rng = rand::thread_rng();

    let verification = verify_against_snapshot(
        &store,
        &backup_dir,
        &options.snapshot_id,
        options.sample_size.unwrap_or(DEFAULT_SAMPLE_SIZE),
        &mut rng,
    )?;
    if !verification.passed {
        return Err(ClientError::verification_failed(json!({
            "snapshot_id": options.snapshot_id,
            "verification": verification,
        })));
    }

    let data = VerifyData {
        snapshot_id: options.snapshot_id,
        verification,
    };
    success("verify", data)
}
