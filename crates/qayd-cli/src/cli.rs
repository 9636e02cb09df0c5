use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub fn parse_strategy(value: &str) -> Result<String, String> {
    match value {
        "fail" | "skip" | "auto-balance" => Ok(value.to_string()),
        _ => Err("strategy must be one of: fail, skip, auto-balance".to_string()),
    }
}

pub fn parse_sample_size(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(size) if size >= 1 => Ok(size),
        _ => Err("sample size must be a positive integer".to_string()),
    }
}

/// Extended help shown after `qayd ingest --help`.
pub const INGEST_AFTER_HELP: &str = "\
How ingest works:
  The journal sheet is read, normalised, grouped into entries by
  (entry number, entry date), resolved against the tenant's reference
  tables, validated, then loaded as one transaction header per entry
  plus one transaction line per journal row.

  Every run writes its reports under `$QAYD_HOME/reports/run_<id>/`.

What to do next:
  1. Run `qayd db init` once against a new database.
  2. Run `qayd inspect` to confirm the sheet and header row are recognised.
  3. Run `qayd ingest --dry-run --strategy fail` and fix reported issues.
  4. Run `qayd ingest --strategy fail` once the dry run passes.
  5. Keep the snapshot id it prints; `qayd rollback <snapshot-id>` undoes the run.

Unbalanced entries (--strategy is required):
  fail          abort the run if any entry's debits and credits differ
  skip          drop unbalanced entries and load the rest
  auto-balance  add one line against --suspense-account for the residue

Environment:
  DATABASE_URL          SQLite database path or sqlite:// URL (required)
  TENANT_ID             tenant every row is scoped to (required unless --dry-run)
  EXCEL_FILE_PATH       workbook path (or --file)
  SHEET_NAME            sheet name, taken verbatim (default `القيود `)
  COLUMN_MAPPING_PATH   column mapping CSV (or --mapping)
  UNBALANCED_STRATEGY   default for --strategy
  SUSPENSE_ACCOUNT_ID   default for --suspense-account
  BATCH_SIZE, MAX_RETRIES, RETRY_DELAY_SECONDS, TIMEOUT_SECONDS
  FUTURE_DATE_HORIZON_DAYS, CREATED_BY, QAYD_HOME

Overrides:
  --override accounts=fixes.json maps unresolved codes to target ids.
  The file is a JSON object of `code -> id`. Any override requires
  --acknowledge-overrides, and every applied override is listed in
  account_mapping.json with confidence `manual`.
";

#[derive(Debug, Parser)]
#[command(
    name = "qayd",
    version,
    about = "bilingual journal ingest for the accounting ledger",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Read, validate and load the journal sheet for one tenant
    #[command(after_long_help = INGEST_AFTER_HELP)]
    Ingest {
        /// Run every stage without writing to the database
        #[arg(long)]
        dry_run: bool,
        /// How unbalanced entries are handled: fail, skip or auto-balance
        #[arg(long, value_parser = parse_strategy)]
        strategy: Option<String>,
        /// Account id used for auto-balance residue lines
        #[arg(long)]
        suspense_account: Option<String>,
        /// Path to the journal workbook
        #[arg(long)]
        file: Option<PathBuf>,
        /// Sheet name, matched exactly
        #[arg(long)]
        sheet: Option<String>,
        /// Column mapping CSV
        #[arg(long)]
        mapping: Option<PathBuf>,
        /// Offline schema snapshot to validate against instead of the live database
        #[arg(long)]
        schema: Option<PathBuf>,
        /// Manual code mapping as <dimension>=<file.json>; repeatable
        #[arg(long = "override", value_name = "DIM=FILE")]
        overrides: Vec<String>,
        /// Confirm that manual overrides were reviewed
        #[arg(long)]
        acknowledge_overrides: bool,
        /// Load clean entries and set aside the ones with errors
        #[arg(long)]
        quarantine_invalid: bool,
        /// Rows compared field by field during verification
        #[arg(long, value_parser = parse_sample_size)]
        sample_size: Option<usize>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Show the workbook's sheets and how its columns map
    Inspect {
        /// Path to the journal workbook
        #[arg(long)]
        file: Option<PathBuf>,
        /// Sheet name, matched exactly
        #[arg(long)]
        sheet: Option<String>,
        /// Column mapping CSV
        #[arg(long)]
        mapping: Option<PathBuf>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Target schema commands
    #[command(arg_required_else_help = true)]
    Schema {
        #[command(subcommand)]
        command: SchemaCommand,
    },
    /// Restore a tenant's transactions from a backup snapshot
    Rollback {
        /// Snapshot id printed by `qayd ingest` or `qayd backup list`
        snapshot_id: String,
        /// Confirm the restore without prompting
        #[arg(long)]
        yes: bool,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Check the live database against a backup snapshot
    Verify {
        /// Snapshot id to compare against
        snapshot_id: String,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Backup snapshot commands
    #[command(arg_required_else_help = true)]
    Backup {
        #[command(subcommand)]
        command: BackupCommand,
    },
    /// Database setup commands
    #[command(arg_required_else_help = true)]
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum SchemaCommand {
    /// Write a JSON snapshot of the target tables
    Export {
        /// Output path (defaults to `$QAYD_HOME/schema_snapshot.json`)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum BackupCommand {
    /// List backup snapshots, oldest first
    List {
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum DbCommand {
    /// Create the reference and transaction tables
    Init {
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
pub fn parse_from<I, T>(itr: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(itr)
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::{BackupCommand, Commands, DbCommand, SchemaCommand, parse_from};

    #[test]
    fn parse_command_paths() {
        let cases: [Vec<&str>; 14] = [
            vec!["qayd", "ingest", "--strategy", "fail"],
            vec!["qayd", "ingest", "--dry-run", "--strategy", "skip", "--json"],
            vec![
                "qayd",
                "ingest",
                "--strategy",
                "auto-balance",
                "--suspense-account",
                "acc-9999",
            ],
            vec!["qayd", "ingest", "--file", "journal.xlsx", "--sheet", "Journal"],
            vec!["qayd", "ingest", "--schema", "snapshot.json", "--dry-run"],
            vec!["qayd", "ingest", "--quarantine-invalid", "--sample-size", "5"],
            vec!["qayd", "inspect"],
            vec!["qayd", "inspect", "--file", "journal.xlsx", "--json"],
            vec!["qayd", "schema", "export"],
            vec!["qayd", "schema", "export", "--out", "snap.json", "--json"],
            vec!["qayd", "rollback", "20260101T000000_000Z", "--yes"],
            vec!["qayd", "verify", "20260101T000000_000Z", "--json"],
            vec!["qayd", "backup", "list"],
            vec!["qayd", "db", "init", "--json"],
        ];

        for case in cases {
            let parsed = parse_from(case.clone());
            assert!(parsed.is_ok(), "failed to parse: {case:?}");
        }
    }

    #[test]
    fn parse_repeated_overrides() {
        let parsed = parse_from([
            "qayd",
            "ingest",
            "--override",
            "accounts=a.json",
            "--override",
            "projects=p.json",
            "--acknowledge-overrides",
        ]);
        assert!(parsed.is_ok());
        if let Ok(cli) = parsed {
            match cli.command {
                Commands::Ingest {
                    overrides,
                    acknowledge_overrides,
                    ..
                } => {
                    assert_eq!(overrides, vec!["accounts=a.json", "projects=p.json"]);
                    assert!(acknowledge_overrides);
                }
                other => panic!("unexpected command: {other:?}"),
            }
        }
    }

    #[test]
    fn parse_nested_subcommands() {
        let schema = parse_from(["qayd", "schema", "export", "--json"]);
        assert!(schema.is_ok());
        if let Ok(cli) = schema {
            assert!(matches!(
                cli.command,
                Commands::Schema {
                    command: SchemaCommand::Export { json: true, .. }
                }
            ));
        }

        let backup = parse_from(["qayd", "backup", "list"]);
        assert!(backup.is_ok());
        if let Ok(cli) = backup {
            assert!(matches!(
                cli.command,
                Commands::Backup {
                    command: BackupCommand::List { json: false }
                }
            ));
        }

        let db = parse_from(["qayd", "db", "init"]);
        assert!(db.is_ok());
        if let Ok(cli) = db {
            assert!(matches!(
                cli.command,
                Commands::Db {
                    command: DbCommand::Init { json: false }
                }
            ));
        }
    }

    #[test]
    fn rejects_unknown_strategy() {
        let parsed = parse_from(["qayd", "ingest", "--strategy", "ignore"]);
        assert!(parsed.is_err());
        if let Err(error) = parsed {
            assert_eq!(error.kind(), ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn rejects_zero_sample_size() {
        let parsed = parse_from(["qayd", "ingest", "--sample-size", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn rollback_requires_snapshot_id() {
        let parsed = parse_from(["qayd", "rollback"]);
        assert!(parsed.is_err());
        if let Err(error) = parsed {
            assert_eq!(error.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn groups_without_subcommand_show_help() {
        let parsed = parse_from(["qayd", "backup"]);
        assert!(parsed.is_err());
        if let Err(error) = parsed {
            assert_eq!(
                error.kind(),
                ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            );
        }
    }
}
