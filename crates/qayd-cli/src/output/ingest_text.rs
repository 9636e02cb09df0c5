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

fn count(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_i64)
        .unwrap_or(0)
        .to_string()
}

fn rows_of<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn render_ingest_run(data: &Value) -> io::Result<String> {
    let summary = data.get("summary").cloned().unwrap_or(Value::Null);
    let mut lines = vec![text(data, "message"), String::new()];

    let mut entries = vec![
        ("Run:", text(data, "run_id")),
        ("Mode:", text(data, "mode")),
    ];
    if let Some(tenant) = data.get("tenant_id").and_then(Value::as_str) {
        entries.push(("Tenant:", tenant.to_string()));
    }
    entries.extend([
        ("Strategy:", text(data, "strategy")),
        ("Rows read:", count(&summary, "rows_read")),
        ("Empty rows dropped:", count(&summary, "rows_dropped_empty")),
        ("Entries:", count(&summary, "entries")),
        ("Lines:", count(&summary, "lines")),
        ("Unbalanced entries:", count(&summary, "unbalanced_entries")),
        ("Errors:", count(&summary, "errors")),
        ("Warnings:", count(&summary, "warnings")),
        ("Headers inserted:", count(&summary, "headers_inserted")),
        ("Lines inserted:", count(&summary, "lines_inserted")),
        ("Records failed:", count(&summary, "records_failed")),
    ]);
    if let Some(snapshot) = data
        .get("backup")
        .and_then(|backup| backup.get("snapshot_id"))
        .and_then(Value::as_str)
    {
        entries.push(("Backup snapshot:", snapshot.to_string()));
    }
    if let Some(passed) = data.get("verification_passed").and_then(Value::as_bool) {
        let verdict = if passed { "passed" } else { "failed" };
        entries.push(("Verification:", verdict.to_string()));
    }
    entries.push(("Reports:", text(data, "reports_dir")));
    lines.extend(key_value_rows(&entries, 2));

    let overrides = rows_of(data, "overrides");
    if !overrides.is_empty() {
        lines.push(String::new());
        lines.push("Manual overrides:".to_string());
        let rows = overrides
            .iter()
            .map(|row| {
                vec![
                    text(row, "dimension"),
                    text(row, "code"),
                    text(row, "target_id"),
                    text(row, "status"),
                ]
            })
            .collect::<Vec<Vec<String>>>();
        lines.extend(render_table(
            &[
                Column {
                    name: "Dimension",
                    align: Align::Left,
                },
                Column {
                    name: "Code",
                    align: Align::Left,
                },
                Column {
                    name: "Target",
                    align: Align::Left,
                },
                Column {
                    name: "Status",
                    align: Align::Left,
                },
            ],
            &rows,
        ));
    }

    if let Some(next) = data.get("next_step") {
        lines.push(String::new());
        lines.push("Next step:".to_string());
        lines.push(format!("  {}: {}", text(next, "label"), text(next, "command")));
    }

    let actions = rows_of(data, "other_actions");
    if !actions.is_empty() {
        lines.push(String::new());
        lines.push("Other actions:".to_string());
        for action in actions {
            lines.push(format!(
                "  {}: {}",
                text(action, "label"),
                text(action, "command")
            ));
            let risk = text(action, "risk");
            if !risk.is_empty() {
                lines.push(format!("    Risk: {risk}"));
            }
        }
    }

    Ok(lines.join("\n"))
}

pub fn render_inspect(data: &Value) -> io::Result<String> {
    let mut lines = vec![
        "Workbook structure".to_string(),
        String::new(),
    ];
    let sheets = rows_of(data, "available_sheets")
        .iter()
        .filter_map(Value::as_str)
        .map(|sheet| format!("`{sheet}`"))
        .collect::<Vec<String>>()
        .join(", ");
    lines.extend(key_value_rows(
        &[
            ("File:", text(data, "path")),
            ("Sheet:", format!("`{}`", text(data, "sheet_name"))),
            ("Available sheets:", sheets),
            ("Header row:", count(data, "header_row")),
            ("Data rows:", count(data, "data_rows")),
        ],
        2,
    ));

    lines.push(String::new());
    lines.push("Columns:".to_string());
    let rows = rows_of(data, "columns")
        .iter()
        .map(|column| {
            vec![
                count(column, "index"),
                text(column, "source_header"),
                text(column, "canonical_name"),
                text(column, "declared_type"),
                text(column, "status"),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    lines.extend(render_table(
        &[
            Column {
                name: "#",
                align: Align::Right,
            },
            Column {
                name: "Header",
                align: Align::Left,
            },
            Column {
                name: "Mapped to",
                align: Align::Left,
            },
            Column {
                name: "Type",
                align: Align::Left,
            },
            Column {
                name: "Status",
                align: Align::Left,
            },
        ],
        &rows,
    ));

    for (label, key) in [
        ("Missing required columns:", "missing_required"),
        ("Missing optional columns:", "missing_optional"),
        ("Unmapped columns:", "extra_columns"),
    ] {
        let names = rows_of(data, key)
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<&str>>();
        if !names.is_empty() {
            lines.push(String::new());
            lines.push(format!("{label} {}", names.join(", ")));
        }
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{render_ingest_run, render_inspect};

    #[test]
    fn ingest_run_lists_counts_snapshot_and_actions() {
        let data = json!({
            "run_id": "run_01J",
            "mode": "execute",
            "message": "Loaded 2 entries.",
            "tenant_id": "org-1",
            "strategy": "fail",
            "reports_dir": "/tmp/reports/run_01J",
            "artefacts": {},
            "summary": {"rows_read": 4, "entries": 2, "lines": 4, "headers_inserted": 2, "lines_inserted": 4},
            "backup": {"snapshot_id": "20260101T000000_000Z"},
            "verification_passed": true,
            "overrides": [],
            "next_step": {"label": "Review the migration summary", "command": "cat summary.json"},
            "other_actions": [{"label": "Undo this run", "command": "qayd rollback 20260101T000000_000Z", "risk": "Restores the tenant's rows."}]
        });

        let rendered = render_ingest_run(&data);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("Loaded 2 entries."));
            assert!(text.contains("Tenant:"));
            assert!(text.contains("Backup snapshot:     20260101T000000_000Z"));
            assert!(text.contains("Verification:        passed"));
            assert!(text.contains("  Undo this run: qayd rollback 20260101T000000_000Z"));
            assert!(text.contains("    Risk: Restores the tenant's rows."));
            assert!(!text.contains("Manual overrides:"));
        }
    }

    #[test]
    fn inspect_lists_missing_columns() {
        let data = json!({
            "path": "journal.xlsx",
            "sheet_name": "القيود ",
            "available_sheets": ["القيود "],
            "header_row": 1,
            "data_rows": 3,
            "columns": [
                {"index": 0, "source_header": "رقم القيد", "canonical_name": "entry_no", "declared_type": "string", "required": true, "status": "matched"}
            ],
            "missing_required": ["account_code"],
            "missing_optional": [],
            "extra_columns": []
        });

        let rendered = render_inspect(&data);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.contains("`القيود `"));
            assert!(text.contains("entry_no"));
            assert!(text.contains("Missing required columns: account_code"));
            assert!(!text.contains("Unmapped columns:"));
        }
    }
}
