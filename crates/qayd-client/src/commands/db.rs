use std::collections::BTreeMap;

use tracing::info;

use crate::commands::common::load_config;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::DbInitData;
use crate::migrations::{run_pending, target_table_names};
use crate::state::open_connection;
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct DbInitOptions<'a> {
    pub environment: Option<&'a BTreeMap<String, String>>,
}

pub fn init() -> ClientResult<SuccessEnvelope> {
    init_with_options(DbInitOptions::default())
}

/// Creates the reference, header and line tables. Re-running on an initialised database is a no-op.
#[doc(hidden)]
pub fn init_with_options(options: DbInitOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let config = load_config(options.environment)?;
    let db_path = config.require_database()?;
    let mut connection = open_connection(&db_path, config.timeout)?;
    run_pending(&mut connection)
        .map_err(|error| ClientError::migration_failed(&db_path, &error.to_string()))?;
    info!(db_path = %db_path.display(), "target schema ready");

    let data = DbInitData {
        db_path: db_path.display().to_string(),
        tables: target_table_names(),
    };
    success("db init", data)
}
