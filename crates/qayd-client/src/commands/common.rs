use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::ClientResult;
use crate::config::IngestConfig;
use crate::state::resolve_qayd_home;

/// Builds the run configuration from `environment` when given, else from the process environment.
pub(crate) fn load_config(environment: Option<&BTreeMap<String, String>>) -> ClientResult<IngestConfig> {
    match environment {
        Some(values) => IngestConfig::from_lookup(|name| values.get(name).cloned()),
        None => IngestConfig::from_env(),
    }
}

pub(crate) fn load_home(home_override: Option<&Path>) -> ClientResult<PathBuf> {
    resolve_qayd_home(home_override)
}
