use std::path::Path;

use rand::RngCore;
use serde_json::json;
use tracing::{info, warn};

use crate::contracts::types::{BackupMetadata, RowCounts, VerificationReport};
use crate::ingest::backup::load_backup;
use crate::ingest::verify::{ExpectedState, tenant_counts, verify};
use crate::store::TargetStore;
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone)]
pub(crate) struct RollbackOutcome {
    pub(crate) metadata: BackupMetadata,
    pub(crate) before: RowCounts,
    pub(crate) restored: RowCounts,
    pub(crate) verification: VerificationReport,
}

/// Replaces the tenant's header and line rows with a backup snapshot, then verifies the result.
pub(crate) fn rollback(
    store: &mut dyn TargetStore,
    backup_dir: &Path,
    snapshot_id: &str,
    confirmed: bool,
    sample_size: usize,
    rng: &mut dyn RngCore,
) -> ClientResult<RollbackOutcome> {
    if !confirmed {
        return Err(ClientError::rollback_confirmation_required(snapshot_id));
    }

    let snapshot = load_backup(backup_dir, snapshot_id)?;
    let tenant = snapshot.metadata.tenant_id.clone();
    let before = tenant_counts(store, &tenant)?;

    info!(
        snapshot_id,
        tenant = %tenant,
        headers = snapshot.headers.len(),
        lines = snapshot.lines.len(),
        "restoring tenant rows from snapshot"
    );
    store.restore_tenant_rows(&tenant, &snapshot.headers, &snapshot.lines)?;

    let restored = tenant_counts(store, &tenant)?;
    let recorded = RowCounts {
        headers: snapshot.metadata.header_count,
        lines: snapshot.metadata.line_count,
    };
    if restored != recorded {
        warn!(snapshot_id, "restored counts differ from snapshot");
        return Err(ClientError::rollback_count_mismatch(
            json!(recorded),
            json!(restored),
        ));
    }

    let expected = ExpectedState::from_snapshot(&tenant, &snapshot.headers, &snapshot.lines);
    let verification = verify(store, &expected, sample_size, rng)?;
    if !verification.passed {
        return Err(ClientError::verification_failed(json!({
            "snapshot_id": snapshot_id,
            "verification": verification,
        })));
    }

    Ok(RollbackOutcome {
        metadata: snapshot.metadata,
        before,
        restored,
        verification,
    })
}

/// Checks the current tenant rows against a snapshot without changing anything.
pub(crate) fn verify_against_snapshot(
    store: &dyn TargetStore,
    backup_dir: &Path,
    snapshot_id: &str,
    sample_size: usize,
    rng: &mut dyn RngCore,
) -> ClientResult<VerificationReport> {
    let snapshot = load_backup(backup_dir, snapshot_id)?;
    let expected = ExpectedState::from_snapshot(
        &snapshot.metadata.tenant_id,
        &snapshot.headers,
        &snapshot.lines,
    );
    verify(store, &expected, sample_size, rng)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rusqlite::Connection;
    use tempfile::TempDir;

    use super::{rollback, verify_against_snapshot};
    use crate::ingest::backup::create_backup_with_id;
    use crate::migrations::run_pending;
    use crate::store::{SqliteStore, TargetStore};

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
                 VALUES ('tx-1', 'org-1', '1', '2025-01-15', '5.00', '5.00', 1);
             INSERT INTO transaction_lines (id, org_id, transaction_id, line_no, account_id, debit_amount)
                 VALUES ('ln-1', 'org-1', 'tx-1', 1, 'acc-1', '5.00');",
        );
        assert!(seeded.is_ok());
        SqliteStore::from_connection(connection, Path::new(":memory:"))
    }

    #[test]
    fn rollback_requires_confirmation() {
        let temp = TempDir::new();
        assert!(temp.is_ok());
        let Ok(temp) = temp else {
            return;
        };
        let mut store = seeded_store();
        let mut rng = StdRng::seed_from_u64(3);
        let result = rollback(&mut store, temp.path(), "snap", false, 10, &mut rng);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "rollback_confirmation_required");
        }
    }

    #[test]
    fn rollback_removes_rows_written_after_the_snapshot() {
        let temp = TempDir::new();
        assert!(temp.is_ok());
        let Ok(temp) = temp else {
            return;
        };
        let mut store = seeded_store();
        assert!(create_backup_with_id(&store, temp.path(), "org-1", "snap").is_ok());

        let later = store.connection_mut().execute_batch(
            "INSERT INTO transactions (id, org_id, reference_number, entry_date, total_debit, total_credit, line_count)
                 VALUES ('tx-2', 'org-1', '2', '2025-01-16', '1.00', '1.00', 0);",
        );
        assert!(later.is_ok());

        let mut rng = StdRng::seed_from_u64(3);
        let drifted = verify_against_snapshot(&store, temp.path(), "snap", 10, &mut rng);
        assert!(drifted.is_ok_and(|report| !report.passed));

        let result = rollback(&mut store, temp.path(), "snap", true, 10, &mut rng);
        assert!(result.is_ok());
        if let Ok(outcome) = result {
            assert_eq!(outcome.before.headers, 2);
            assert_eq!(outcome.restored.headers, 1);
            assert_eq!(outcome.restored.lines, 1);
            assert!(outcome.verification.passed);
        }
        assert_eq!(store.count_tenant_rows("transactions", "org-1").ok(), Some(1));
    }
}
