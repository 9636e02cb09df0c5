use std::path::Path;

use crate::commands::common::load_home;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::BackupListData;
use crate::ingest::backup::list_backups;
use crate::state::backups_dir;
use crate::ClientResult;

#[derive(Debug, Default)]
pub struct BackupListOptions<'a> {
    pub home_override: Option<&'a Path>,
}

pub fn list() -> ClientResult<SuccessEnvelope> {
    list_with_options(BackupListOptions::default())
}

#[doc(hidden)]
pub fn list_with_options(options: BackupListOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let backup_dir = backups_dir(&load_home(options.home_override)?);
    let rows = list_backups(&backup_dir)?;
    let data = BackupListData {
        backup_dir: backup_dir.display().to_string(),
        rows,
    };
    success("backup list", data)
}
