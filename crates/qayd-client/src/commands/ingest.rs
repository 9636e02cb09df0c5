use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::commands::common::{load_config, load_home};
use crate::config::{DEFAULT_SAMPLE_SIZE, UnbalancedStrategy};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::ingest::resolve::Dimension;
use crate::ingest::{IngestRequest, run_pipeline};
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct IngestOptions<'a> {
    pub dry_run: bool,
    pub strategy: Option<String>,
    pub suspense_account: Option<String>,
    pub file: Option<PathBuf>,
    pub sheet: Option<String>,
    pub mapping: Option<PathBuf>,
    pub schema: Option<PathBuf>,
    /// Raw `<dimension>=<file.json>` pairs.
    pub overrides: Vec<String>,
    pub acknowledge_overrides: bool,
    pub quarantine_invalid: bool,
    pub sample_size: Option<usize>,
    pub home_override: Option<&'a Path>,
    /// Replaces the process environment when set.
    pub environment: Option<&'a BTreeMap<String, String>>,
}

pub fn run(options: IngestOptions<'_>) -> ClientResult<SuccessEnvelope> {
    run_with_options(options)
}

#[doc(hidden)]
pub fn run_with_options(options: IngestOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let mut config = load_config(options.environment)?;

    if let Some(raw) = options.strategy.as_deref() {
        config.unbalanced_strategy = Some(UnbalancedStrategy::parse(raw).ok_or_else(|| {
            ClientError::invalid_argument(&format!(
                "Unknown strategy `{raw}`. Use fail, skip or auto-balance."
            ))
            .with_ingest_help()
        })?);
    }
    if let Some(suspense) = options.suspense_account {
        config.suspense_account_id = Some(suspense);
    }
    if let Some(file) = options.file {
        config.excel_file_path = Some(file);
    }
    if let Some(sheet) = options.sheet {
        config.sheet_name = sheet;
    }
    if let Some(mapping) = options.mapping {
        config.column_mapping_path = Some(mapping);
    }

    let overrides = options
        .overrides
        .iter()
        .map(|raw| parse_override(raw))
        .collect::<ClientResult<Vec<(Dimension, PathBuf)>>>()?;

    let request = IngestRequest {
        config,
        home: load_home(options.home_override)?,
        dry_run: options.dry_run,
        schema_path: options.schema,
        overrides,
        acknowledge_overrides: options.acknowledge_overrides,
        quarantine_invalid: options.quarantine_invalid,
        sample_size: options.sample_size.unwrap_or(DEFAULT_SAMPLE_SIZE),
        today: Utc::now().date_naive(),
    };

    let mut rng = rand::thread_rng();
    let data = run_pipeline(&request, &std::thread::sleep, &mut rng)?;
    success("ingest", data)
}

fn parse_override(raw: &str) -> ClientResult<(Dimension, PathBuf)> {
    let invalid = || {
        ClientError::invalid_argument_with_recovery(
            &format!("Invalid override `{raw}`; expected `<dimension>=<file.json>`."),
            vec![format!(
                "Dimensions are: {}.",
                Dimension::ALL
                    .iter()
                    .map(|dimension| dimension.as_str())
                    .collect::<Vec<&str>>()
                    .join(", ")
            )],
        )
    };
    let (dimension, path) = raw.split_once('=').ok_or_else(invalid)?;
    let dimension = Dimension::parse(dimension).ok_or_else(invalid)?;
    if path.trim().is_empty() {
        return Err(invalid());
    }
    Ok((dimension, PathBuf::from(path.trim())))
}
