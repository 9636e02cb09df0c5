mod support;

use qayd_client::commands::backup::{self, BackupListOptions};
use qayd_client::commands::rollback::{self, RollbackOptions};
use serde_json::Value;
use support::journal_kit::{Fixture, happy_rows, row};

fn snapshot_of(data: &Value) -> String {
    data["backup"]["snapshot_id"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

fn is_snapshot_id(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 20
        && bytes[8] == b'T'
        && bytes[15] == b'_'
        && bytes[19] == b'Z'
        && bytes
            .iter()
            .enumerate()
            .filter(|(index, _)| ![8, 15, 19].contains(index))
            .all(|(_, byte)| byte.is_ascii_digit())
}

/// Loads entry 1, then entry 2, returning the snapshot taken before the second load.
fn two_loads(fixture: &Fixture) -> String {
    fixture.write_journal(&happy_rows());
    let first = fixture.ingest("fail", false);
    assert!(first.is_ok(), "{first:?}");

    fixture.write_journal(&[
        row(2.0, "2025-01-16", "1001", 40.0, 0.0),
        row(2.0, "2025-01-16", "2001", 0.0, 40.0),
    ]);
    let second = fixture.ingest("fail", false);
    assert!(second.is_ok(), "{second:?}");
    match second {
        Ok(success) => snapshot_of(&success.data),
        Err(_) => String::new(),
    }
}

#[test]
fn rollback_restores_pre_load_rows() {
    let fixture = Fixture::new();
    let snapshot_id = two_loads(&fixture);
    assert!(is_snapshot_id(&snapshot_id), "unexpected id {snapshot_id}");
    assert_eq!(fixture.count("SELECT COUNT(*) FROM transactions"), 2);

    let result = rollback::run_with_options(RollbackOptions {
        snapshot_id: snapshot_id.clone(),
        yes: true,
        home_override: Some(&fixture.home),
        environment: Some(&fixture.env),
        ..RollbackOptions::default()
    });
    assert!(result.is_ok(), "{result:?}");
    if let Ok(success) = result {
        assert_eq!(success.command, "rollback");
        assert_eq!(success.data["before"]["headers"], 2);
        assert_eq!(success.data["before"]["lines"], 4);
        assert_eq!(success.data["restored"]["headers"], 1);
        assert_eq!(success.data["restored"]["lines"], 2);
        assert_eq!(success.data["verification"]["passed"], Value::Bool(true));
    }

    assert_eq!(fixture.count("SELECT COUNT(*) FROM transactions"), 1);
    assert_eq!(fixture.text("SELECT reference_number FROM transactions"), "1");
    assert_eq!(fixture.count("SELECT COUNT(*) FROM transaction_lines"), 2);

    let verified = rollback::verify_snapshot_with_options(RollbackOptions {
        snapshot_id,
        home_override: Some(&fixture.home),
        environment: Some(&fixture.env),
        ..RollbackOptions::default()
    });
    assert!(verified.is_ok(), "{verified:?}");
}

#[test]
fn rollback_needs_confirmation() {
    let mut fixture = Fixture::new();
    let snapshot_id = two_loads(&fixture);

    let refused = rollback::run_with_options(RollbackOptions {
        snapshot_id: snapshot_id.clone(),
        home_override: Some(&fixture.home),
        environment: Some(&fixture.env),
        ..RollbackOptions::default()
    });
    assert!(refused.is_err());
    if let Err(error) = refused {
        assert_eq!(error.code, "rollback_confirmation_required");
    }
    assert_eq!(fixture.count("SELECT COUNT(*) FROM transactions"), 2);

    fixture.set_env("AUTO_ROLLBACK", "true");
    let confirmed = rollback::run_with_options(RollbackOptions {
        snapshot_id,
        home_override: Some(&fixture.home),
        environment: Some(&fixture.env),
        ..RollbackOptions::default()
    });
    assert!(confirmed.is_ok(), "{confirmed:?}");
    assert_eq!(fixture.count("SELECT COUNT(*) FROM transactions"), 1);
}

#[test]
fn verify_detects_drift_from_snapshot() {
    let fixture = Fixture::new();
    let snapshot_id = two_loads(&fixture);

    let result = rollback::verify_snapshot_with_options(RollbackOptions {
        snapshot_id,
        home_override: Some(&fixture.home),
        environment: Some(&fixture.env),
        ..RollbackOptions::default()
    });
    assert!(result.is_err());
    if let Err(error) = result {
        assert_eq!(error.code, "verification_failed");
        let data = error.data.unwrap_or_default();
        let checks = data["verification"]["checks"].as_array().cloned().unwrap_or_default();
        let record_count = checks
            .iter()
            .find(|check| check["name"] == "record_count")
            .cloned()
            .unwrap_or_default();
        assert_eq!(record_count["passed"], Value::Bool(false));
    }
}

#[test]
fn unknown_snapshot_is_reported() {
    let fixture = Fixture::new();
    let result = rollback::run_with_options(RollbackOptions {
        snapshot_id: "20990101T000000_000Z".to_string(),
        yes: true,
        home_override: Some(&fixture.home),
        environment: Some(&fixture.env),
        ..RollbackOptions::default()
    });
    assert!(result.is_err());
    if let Err(error) = result {
        assert_eq!(error.code, "snapshot_not_found");
    }
}

#[test]
fn backup_list_returns_snapshots_oldest_first() {
    let fixture = Fixture::new();
    let second_snapshot = two_loads(&fixture);

    let listed = backup::list_with_options(BackupListOptions {
        home_override: Some(&fixture.home),
    });
    assert!(listed.is_ok());
    if let Ok(success) = listed {
        let rows = success.data["rows"].as_array().cloned().unwrap_or_default();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["header_count"], 0);
        assert_eq!(rows[1]["snapshot_id"], Value::String(second_snapshot));
        assert_eq!(rows[1]["header_count"], 1);
        assert_eq!(rows[1]["line_count"], 2);
        assert_eq!(rows[1]["tenant_id"], "org-t");
    }
}

#[test]
fn suggested_step_after_load_succeeds() {
    let fixture = Fixture::new();
    fixture.write_journal(&happy_rows());
    let loaded = fixture.ingest("fail", false);
    assert!(loaded.is_ok(), "{loaded:?}");
    let Ok(loaded) = loaded else {
        return;
    };
    let snapshot_id = snapshot_of(&loaded.data);
    assert_eq!(loaded.snapshot_id.as_deref(), Some(snapshot_id.as_str()));
    assert!(loaded.run_id.is_some());
    let next = &loaded.data["next_step"];
    assert_eq!(next["command"], "qayd backup list");
    let label = next["label"].as_str().unwrap_or_default();
    assert!(label.contains("verification_report.json"), "{label}");
    assert!(label.contains(&snapshot_id));
    let report = loaded.data["artefacts"]["verification_report.json"]
        .as_str()
        .unwrap_or_default();
    assert!(std::path::Path::new(report).exists());

    let listed = backup::list_with_options(BackupListOptions {
        home_override: Some(&fixture.home),
    });
    assert!(listed.is_ok());
    if let Ok(success) = listed {
        let rows = success.data["rows"].as_array().cloned().unwrap_or_default();
        assert!(rows.iter().any(|row| row["snapshot_id"] == Value::String(snapshot_id.clone())));
    }
}
