mod error_text;
mod format;
mod ingest_text;
mod json;
mod mode;
mod ops_text;

use std::io;

use qayd_client::{ClientError, SuccessEnvelope};

use crate::stdout_io::write_stdout_line;

pub use mode::{OutputMode, mode_for_command};

pub fn print_success(success: &SuccessEnvelope, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Text => render_text_success(success)?,
        OutputMode::Json => json::render_success_json(success)?,
    };
    write_stdout_line(&body)
}

pub fn print_failure(error: &ClientError, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Json => json::render_error_json(error)?,
        OutputMode::Text => error_text::render_error(error),
    };
    write_stdout_line(&body)
}

fn render_text_success(success: &SuccessEnvelope) -> io::Result<String> {
    match success.command.as_str() {
        "ingest" => ingest_text::render_ingest_run(&success.data),
        "inspect" => ingest_text::render_inspect(&success.data),
        "rollback" => ops_text::render_rollback(&success.data),
        "verify" => ops_text::render_verify(&success.data),
        "backup list" => ops_text::render_backup_list(&success.data),
        "schema export" => ops_text::render_schema_export(&success.data),
        "db init" => ops_text::render_db_init(&success.data),
        _ => Err(io::Error::other(format!(
            "unsupported text output command `{}`",
            success.command
        ))),
    }
}
