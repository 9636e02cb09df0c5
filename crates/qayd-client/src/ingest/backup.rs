use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::info;

use crate::contracts::types::BackupMetadata;
use crate::migrations::{HEADER_TABLE, LINE_TABLE};
use crate::state::ensure_directory;
use crate::store::{Record, TargetStore};
use crate::{ClientError, ClientResult};

/// A backup loaded back from disk.
#[derive(Debug, Clone)]
pub(crate) struct BackupSnapshot {
    pub(crate) metadata: BackupMetadata,
    pub(crate) headers: Vec<Record>,
    pub(crate) lines: Vec<Record>,
}

pub(crate) fn new_snapshot_id() -> String {
    Utc::now().format("%Y%m%dT%H%M%S_%3fZ").to_string()
}

/// Dumps every header and line row owned by `tenant_id` before any write happens.
pub(crate) fn create_backup(
    store: &dyn TargetStore,
    backup_dir: &Path,
    tenant_id: &str,
) -> ClientResult<BackupMetadata> {
    create_backup_with_id(store, backup_dir, tenant_id, &new_snapshot_id())
}

pub(crate) fn create_backup_with_id(
    store: &dyn TargetStore,
    backup_dir: &Path,
    tenant_id: &str,
    snapshot_id: &str,
) -> ClientResult<BackupMetadata> {
    ensure_directory(backup_dir)
        .map_err(|error| ClientError::backup_failed(&error.message))?;

    let headers = store
        .tenant_rows(HEADER_TABLE, tenant_id)
        .map_err(|error| ClientError::backup_failed(&error.message))?;
    let lines = store
        .tenant_rows(LINE_TABLE, tenant_id)
        .map_err(|error| ClientError::backup_failed(&error.message))?;

    let headers_path = backup_dir.join(format!("headers_{snapshot_id}.json"));
    let lines_path = backup_dir.join(format!("lines_{snapshot_id}.json"));
    let metadata_path = metadata_path(backup_dir, snapshot_id);

    write_new_file(&headers_path, &headers)?;
    write_new_file(&lines_path, &lines)?;

    let metadata = BackupMetadata {
        snapshot_id: snapshot_id.to_string(),
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        tenant_id: tenant_id.to_string(),
        headers_path: headers_path.display().to_string(),
        lines_path: lines_path.display().to_string(),
        header_count: headers.len() as i64,
        line_count: lines.len() as i64,
    };
    write_new_file(&metadata_path, &metadata)?;

    info!(
        snapshot_id,
        headers = metadata.header_count,
        lines = metadata.line_count,
        "tenant backup written"
    );

    Ok(metadata)
}

pub(crate) fn load_backup(backup_dir: &Path, snapshot_id: &str) -> ClientResult<BackupSnapshot> {
    if snapshot_id.is_empty()
        || !snapshot_id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(ClientError::snapshot_not_found(snapshot_id));
    }

    let metadata_path = metadata_path(backup_dir, snapshot_id);
    if !metadata_path.exists() {
        return Err(ClientError::snapshot_not_found(snapshot_id));
    }

    let metadata = read_json::<BackupMetadata>(&metadata_path)?;
    let headers = read_json::<Vec<Record>>(Path::new(&metadata.headers_path))?;
    let lines = read_json::<Vec<Record>>(Path::new(&metadata.lines_path))?;

    Ok(BackupSnapshot {
        metadata,
        headers,
        lines,
    })
}

/// Metadata of every snapshot under `backup_dir`, oldest first.
pub(crate) fn list_backups(backup_dir: &Path) -> ClientResult<Vec<BackupMetadata>> {
    if !backup_dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(backup_dir)
        .map_err(|error| ClientError::artefact_write_failed(backup_dir, &error.to_string()))?;
    let mut rows = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|error| ClientError::artefact_write_failed(backup_dir, &error.to_string()))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with("metadata_") && name.ends_with(".json") {
            rows.push(read_json::<BackupMetadata>(&entry.path())?);
        }
    }
    rows.sort_by(|left, right| left.snapshot_id.cmp(&right.snapshot_id));
    Ok(rows)
}

fn metadata_path(backup_dir: &Path, snapshot_id: &str) -> PathBuf {
    backup_dir.join(format!("metadata_{snapshot_id}.json"))
}

fn write_new_file<T: serde::Serialize>(path: &Path, value: &T) -> ClientResult<()> {
    let content = serde_json::to_vec_pretty(value)
        .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|error| ClientError::backup_failed(&format!("{}: {error}", path.display())))?;
    file.write_all(&content)
        .and_then(|()| file.sync_all())
        .map_err(|error| ClientError::backup_failed(&format!("{}: {error}", path.display())))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> ClientResult<T> {
    let content = fs::read_to_string(path).map_err(|error| {
        ClientError::backup_failed(&format!("{} is unreadable: {error}", path.display()))
    })?;
    serde_json::from_str::<T>(&content).map_err(|error| {
        ClientError::backup_failed(&format!("{} is not a valid backup file: {error}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rusqlite::Connection;
    use tempfile::TempDir;

    use super::{create_backup_with_id, list_backups, load_backup};
    use crate::migrations::run_pending;
    use crate::store::SqliteStore;

    fn seeded_store() -> SqliteStore {
        let mut connection = match Connection::open_in_memory() {
            Ok(connection) => connection,
            Err(error) => panic!("in-memory database should open: {error}"),
        };
        if let Err(error) = run_pending(&mut connection) {
            panic!("migrations should apply: {error}");
        }
        let seeded = connection.execute_batch(
            "INSERT INTO accounts (id, org_id, legacy_code) VALUES ('acc-1', 'org-1', '7');
             INSERT INTO transactions (id, org_id, reference_number, entry_date, total_debit, total_credit, line_count)
                 VALUES ('tx-1', 'org-1', '1', '2025-01-15', '5.00', '5.00', 1),
                        ('tx-2', 'org-2', '1', '2025-01-15', '5.00', '5.00', 0);
             INSERT INTO transaction_lines (id, org_id, transaction_id, line_no, account_id, debit_amount)
                 VALUES ('ln-1', 'org-1', 'tx-1', 1, 'acc-1', '5.00');",
        );
        assert!(seeded.is_ok());
        SqliteStore::from_connection(connection, Path::new(":memory:"))
    }

    #[test]
    fn backup_captures_only_tenant_rows_and_loads_back() {
        let temp = TempDir::new();
        assert!(temp.is_ok());
        let Ok(temp) = temp else {
            return;
        };
        let store = seeded_store();
        let created = create_backup_with_id(&store, temp.path(), "org-1", "20250115T000000_000Z");
        assert!(created.is_ok());
        if let Ok(metadata) = created {
            assert_eq!(metadata.header_count, 1);
            assert_eq!(metadata.line_count, 1);
        }

        let loaded = load_backup(temp.path(), "20250115T000000_000Z");
        assert!(loaded.is_ok());
        if let Ok(snapshot) = loaded {
            assert_eq!(snapshot.headers.len(), 1);
            assert_eq!(
                snapshot.headers[0].get("id").and_then(|value| value.as_str()),
                Some("tx-1")
            );
        }

        let listed = list_backups(temp.path());
        assert!(listed.is_ok());
        if let Ok(rows) = listed {
            assert_eq!(rows.len(), 1);
        }
    }

    #[test]
    fn existing_snapshot_files_are_never_overwritten() {
        let temp = TempDir::new();
        assert!(temp.is_ok());
        let Ok(temp) = temp else {
            return;
        };
        let store = seeded_store();
        assert!(create_backup_with_id(&store, temp.path(), "org-1", "snap").is_ok());
        let second = create_backup_with_id(&store, temp.path(), "org-1", "snap");
        assert!(second.is_err());
        if let Err(error) = second {
            assert_eq!(error.code, "backup_failed");
        }
    }

    #[test]
    fn unknown_or_unsafe_snapshot_ids_are_not_found() {
        let temp = TempDir::new();
        assert!(temp.is_ok());
        let Ok(temp) = temp else {
            return;
        };
        for id in ["missing", "../etc", ""] {
            let loaded = load_backup(temp.path(), id);
            assert!(loaded.is_err());
            if let Err(error) = loaded {
                assert_eq!(error.code, "snapshot_not_found");
            }
        }
    }
}
