use std::io;

use serde_json::Value;

use super::format::{Align, Column, key_value_rows, render_table};

fn text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn strings(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn verification_lines(report: &Value) -> Vec<String> {
    let mut lines = vec!["Verification:".to_string()];
    let rows = report
        .get("checks")
        .and_then(Value::as_array)
        .map(|checks| {
            checks
                .iter()
                .map(|check| {
                    let passed = check.get("passed").and_then(Value::as_bool) == Some(true);
                    vec![
                        text(check, "name"),
                        if passed { "pass" } else { "FAIL" }.to_string(),
                    ]
                })
                .collect::<Vec<Vec<String>>>()
        })
        .unwrap_or_default();
    lines.extend(render_table(
        &[
            Column {
                name: "Check",
                align: Align::Left,
            },
            Column {
                name: "Result",
                align: Align::Left,
            },
        ],
        &rows,
    ));
    lines
}

fn counts(value: &Value) -> String {
    format!(
        "{} headers, {} lines",
        value.get("headers").and_then(Value::as_i64).unwrap_or(0),
        value.get("lines").and_then(Value::as_i64).unwrap_or(0)
    )
}

pub fn render_rollback(data: &Value) -> io::Result<String> {
    let mut lines = vec![text(data, "message"), String::new()];
    lines.extend(key_value_rows(
        &[
            ("Snapshot:", text(data, "snapshot_id")),
            ("Tenant:", text(data, "tenant_id")),
            ("Before:", counts(data.get("before").unwrap_or(&Value::Null))),
            ("Restored:", counts(data.get("restored").unwrap_or(&Value::Null))),
        ],
        2,
    ));
    lines.push(String::new());
    lines.extend(verification_lines(
        data.get("verification").unwrap_or(&Value::Null),
    ));
    Ok(lines.join("\n"))
}

pub fn render_verify(data: &Value) -> io::Result<String> {
    let report = data.get("verification").unwrap_or(&Value::Null);
    let mut lines = vec![
        format!(
            "Database matches snapshot `{}` for tenant `{}`.",
            text(data, "snapshot_id"),
            text(report, "tenant_id")
        ),
        String::new(),
    ];
    lines.extend(verification_lines(report));
    Ok(lines.join("\n"))
}

pub fn render_backup_list(data: &Value) -> io::Result<String> {
    let rows = data
        .get("rows")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    vec![
                        text(row, "snapshot_id"),
                        text(row, "tenant_id"),
                        text(row, "header_count"),
                        text(row, "line_count"),
                        text(row, "created_at"),
                    ]
                })
                .collect::<Vec<Vec<String>>>()
        })
        .unwrap_or_default();

    if rows.is_empty() {
        return Ok(format!(
            "No backup snapshots in {}.",
            text(data, "backup_dir")
        ));
    }

    let mut lines = vec![format!("Backups in {}:", text(data, "backup_dir"))];
    lines.extend(render_table(
        &[
            Column {
                name: "Snapshot",
                align: Align::Left,
            },
            Column {
                name: "Tenant",
                align: Align::Left,
            },
            Column {
                name: "Headers",
                align: Align::Right,
            },
            Column {
                name: "Lines",
                align: Align::Right,
            },
            Column {
                name: "Created",
                align: Align::Left,
            },
        ],
        &rows,
    ));
    Ok(lines.join("\n"))
}

pub fn render_schema_export(data: &Value) -> io::Result<String> {
    let mut lines = vec![format!("Schema snapshot written to {}", text(data, "path"))];
    lines.extend(key_value_rows(
        &[("Tables:", strings(data, "tables").join(", "))],
        2,
    ));
    Ok(lines.join("\n"))
}

pub fn render_db_init(data: &Value) -> io::Result<String> {
    let mut lines = vec![format!("Database ready at {}", text(data, "db_path"))];
    lines.extend(key_value_rows(
        &[("Tables:", strings(data, "tables").join(", "))],
        2,
    ));
    Ok(lines.join("\n"))
}
