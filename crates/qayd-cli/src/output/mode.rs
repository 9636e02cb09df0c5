use crate::cli::{BackupCommand, Commands, DbCommand, SchemaCommand};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
}

pub fn mode_for_command(command: &Commands) -> OutputMode {
    let json = match command {
        Commands::Ingest { json, .. }
        | Commands::Inspect { json, .. }
        | Commands::Rollback { json, .. }
        | Commands::Verify { json, .. }
        | Commands::Schema {
            command: SchemaCommand::Export { json, .. },
        }
        | Commands::Backup {
            command: BackupCommand::List { json },
        }
        | Commands::Db {
            command: DbCommand::Init { json },
        } => *json,
    };
    if json {
        OutputMode::Json
    } else {
        OutputMode::Text
    }
}
