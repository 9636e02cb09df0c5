use qayd_client::commands;
use qayd_client::commands::ingest::IngestOptions;
use qayd_client::commands::inspect::InspectOptions;
use qayd_client::commands::schema::SchemaExportOptions;
use qayd_client::{ClientResult, SuccessEnvelope};

use crate::cli::{BackupCommand, Cli, Commands, DbCommand, SchemaCommand};

pub fn dispatch(cli: &Cli) -> ClientResult<SuccessEnvelope> {
    match &cli.command {
        Commands::Ingest {
            dry_run,
            strategy,
            suspense_account,
            file,
            sheet,
            mapping,
            schema,
            overrides,
            acknowledge_overrides,
            quarantine_invalid,
            sample_size,
            json: _,
        } => commands::ingest::run(IngestOptions {
            dry_run: *dry_run,
            strategy: strategy.clone(),
            suspense_account: suspense_account.clone(),
            file: file.clone(),
            sheet: sheet.clone(),
            mapping: mapping.clone(),
            schema: schema.clone(),
            overrides: overrides.clone(),
            acknowledge_overrides: *acknowledge_overrides,
            quarantine_invalid: *quarantine_invalid,
            sample_size: *sample_size,
            ..IngestOptions::default()
        }),
        Commands::Inspect {
            file,
            sheet,
            mapping,
            ..
        } => commands::inspect::run(InspectOptions {
            file: file.clone(),
            sheet: sheet.clone(),
            mapping: mapping.clone(),
            ..InspectOptions::default()
        }),
        Commands::Schema { command } => match command {
            SchemaCommand::Export { out, .. } => commands::schema::export(SchemaExportOptions {
                out: out.clone(),
                ..SchemaExportOptions::default()
            }),
        },
        Commands::Rollback {
            snapshot_id, yes, ..
        } => commands::rollback::run(snapshot_id, *yes),
        Commands::Verify { snapshot_id, .. } => commands::rollback::verify_snapshot(snapshot_id),
        Commands::Backup { command } => match command {
            BackupCommand::List { .. } => commands::backup::list(),
        },
        Commands::Db { command } => match command {
            DbCommand::Init { .. } => commands::db::init(),
        },
    }
}
