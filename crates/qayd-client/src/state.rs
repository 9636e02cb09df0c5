use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, Error as SqliteError, OpenFlags, ffi::ErrorCode};

use crate::{ClientError, ClientResult};

pub fn resolve_qayd_home(home_override: Option<&Path>) -> ClientResult<PathBuf> {
    let candidate = match home_override {
        Some(path) => path.to_path_buf(),
        None => {
            if let Some(override_path) = std::env::var_os("QAYD_HOME") {
                PathBuf::from(override_path)
            } else if let Some(home_path) = home::home_dir() {
                home_path.join(".qayd")
            } else {
                return Err(ClientError::invalid_config(
                    "QAYD_HOME",
                    "could not resolve a home directory for reports and backups",
                ));
            }
        }
    };

    absolutize(&candidate)
}

pub fn ensure_directory(path: &Path) -> ClientResult<()> {
    fs::create_dir_all(path).map_err(|error| map_io_error(path, &error))?;
    set_private_permissions_best_effort(path);
    Ok(())
}

pub fn reports_dir(home: &Path, run_id: &str) -> PathBuf {
    home.join("reports").join(run_id)
}

pub fn backups_dir(home: &Path) -> PathBuf {
    home.join("backups")
}

pub fn open_connection(db_path: &Path, timeout: Duration) -> ClientResult<Connection> {
    let connection =
        Connection::open(db_path).map_err(|error| map_sqlite_error(db_path, &error))?;
    configure(&connection, db_path, timeout)?;
    Ok(connection)
}

pub fn open_readonly_connection(db_path: &Path, timeout: Duration) -> ClientResult<Connection> {
    if !db_path.exists() {
        return Err(ClientError::database_unavailable(
            db_path,
            "database file does not exist",
        ));
    }
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI;
    let connection = Connection::open_with_flags(db_path, flags)
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    configure(&connection, db_path, timeout)?;
    Ok(connection)
}

fn configure(connection: &Connection, db_path: &Path, timeout: Duration) -> ClientResult<()> {
    connection
        .busy_timeout(timeout)
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(())
}

pub fn map_io_error(path: &Path, error: &std::io::Error) -> ClientError {
    ClientError::artefact_write_failed(path, &error.to_string())
}

pub fn map_sqlite_error(path: &Path, error: &SqliteError) -> ClientError {
    let error_code = error.sqlite_error_code();

    if matches!(
        error_code,
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    ) {
        return ClientError::database_locked(path);
    }

    if matches!(
        error_code,
        Some(ErrorCode::NotADatabase | ErrorCode::CannotOpen | ErrorCode::ReadOnly)
    ) {
        return ClientError::database_unavailable(path, &error.to_string());
    }

    ClientError::store_failed(&format!("{}: {error}", path.display()))
}

fn absolutize(path: &Path) -> ClientResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|error| ClientError::invalid_config("QAYD_HOME", &error.to_string()))
}

#[cfg(unix)]
fn set_private_permissions_best_effort(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o700));
}

#[cfg(not(unix))]
fn set_private_permissions_best_effort(_path: &Path) {}
