use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::commands::common::load_config;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::ingest::reader::read_sheet;
use crate::mapping::ColumnMapping;
use crate::ClientResult;

#[derive(Debug, Default)]
pub struct InspectOptions<'a> {
    pub file: Option<PathBuf>,
    pub sheet: Option<String>,
    pub mapping: Option<PathBuf>,
    pub environment: Option<&'a BTreeMap<String, String>>,
}

/// Reports the workbook's sheets and how its header row lines up with the column mapping.
/// Missing required columns are listed, not raised.
pub fn run(options: InspectOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let config = load_config(options.environment)?;
    let path = match options.file {
        Some(path) => path,
        None => config.require_workbook()?,
    };
    let sheet = options.sheet.unwrap_or(config.sheet_name);
    let mapping = match options.mapping.or(config.column_mapping_path) {
        Some(path) => ColumnMapping::load(&path)?,
        None => ColumnMapping::default_bilingual()?,
    };

    let table = read_sheet(&path, &sheet, &mapping)?;
    success("inspect", table.structure)
}
