use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::commands::common::{load_config, load_home};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::SchemaExportData;
use crate::ingest::artifacts::{SCHEMA_SNAPSHOT, write_json};
use crate::ingest::schema::SchemaRegistry;
use crate::state::ensure_directory;
use crate::store::SqliteStore;
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct SchemaExportOptions<'a> {
    pub out: Option<PathBuf>,
    pub home_override: Option<&'a Path>,
    pub environment: Option<&'a BTreeMap<String, String>>,
}

/// Writes a snapshot of the live target schema for use with `ingest --schema`.
pub fn export(options: SchemaExportOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let config = load_config(options.environment)?;
    let db_path = config.require_database()?;
    let store = SqliteStore::open_readonly(&db_path, config.timeout)?;
    let registry = SchemaRegistry::from_store(&store)?;

    let out = match options.out {
        Some(path) => path,
        None => load_home(options.home_override)?.join(SCHEMA_SNAPSHOT),
    };
    let (dir, name) = match (out.parent(), out.file_name()) {
        (Some(dir), Some(name)) => (dir.to_path_buf(), name.to_string_lossy().to_string()),
        _ => {
            return Err(ClientError::invalid_argument(&format!(
                "`{}` is not a file path.",
                out.display()
            )));
        }
    };
    if !dir.as_os_str().is_empty() {
        ensure_directory(&dir)?;
    }
    let path = write_json(&dir, &name, registry.snapshot())?;

    let data = SchemaExportData {
        path: path.display().to_string(),
        tables: registry.snapshot().tables.keys().cloned().collect(),
    };
    success("schema export", data)
}
