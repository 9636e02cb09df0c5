use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::contracts::types::{
    ColumnSchema, ComparisonReport, ForeignKeySchema, SchemaSnapshot, TableSchema,
    TargetColumnRef,
};
use crate::mapping::ColumnMapping;
use crate::migrations::{HEADER_TABLE, LINE_TABLE};
use crate::store::{Record, TargetStore};
use crate::{ClientError, ClientResult};

/// Columns the pipeline fills itself rather than reading from the sheet.
const GENERATED_COLUMNS: [(&str, &str); 13] = [
    (HEADER_TABLE, "id"),
    (HEADER_TABLE, "org_id"),
    (HEADER_TABLE, "fiscal_year"),
    (HEADER_TABLE, "month"),
    (HEADER_TABLE, "description"),
    (HEADER_TABLE, "total_debit"),
    (HEADER_TABLE, "total_credit"),
    (HEADER_TABLE, "line_count"),
    (HEADER_TABLE, "created_by"),
    (LINE_TABLE, "id"),
    (LINE_TABLE, "org_id"),
    (LINE_TABLE, "transaction_id"),
    (LINE_TABLE, "line_no"),
];

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct RowViolation {
    pub(crate) column: String,
    pub(crate) code: &'static str,
    pub(crate) is_error: bool,
    pub(crate) message: String,
}

/// Read-only view over one schema snapshot.
#[derive(Debug, Clone)]
pub(crate) struct SchemaRegistry {
    snapshot: SchemaSnapshot,
}

impl SchemaRegistry {
    pub(crate) fn from_snapshot(snapshot: SchemaSnapshot) -> Self {
        Self { snapshot }
    }

    pub(crate) fn load_file(path: &Path) -> ClientResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|error| ClientError::schema_snapshot_invalid(path, &error.to_string()))?;
        let snapshot = serde_json::from_str::<SchemaSnapshot>(&content)
            .map_err(|error| ClientError::schema_snapshot_invalid(path, &error.to_string()))?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub(crate) fn from_store(store: &dyn TargetStore) -> ClientResult<Self> {
        Ok(Self::from_snapshot(store.schema_snapshot()?))
    }

    pub(crate) fn snapshot(&self) -> &SchemaSnapshot {
        &self.snapshot
    }

    pub(crate) fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.snapshot.tables.get(name)
    }

    pub(crate) fn get_column(&self, table: &str, column: &str) -> Option<&ColumnSchema> {
        self.get_table(table)?
            .columns
            .iter()
            .find(|candidate| candidate.name == column)
    }

    pub(crate) fn get_foreign_keys(&self, table: &str) -> &[ForeignKeySchema] {
        self.get_table(table)
            .map(|schema| schema.foreign_keys.as_slice())
            .unwrap_or(&[])
    }

    /// Non-nullable columns without a default, excluding the generated primary key.
    pub(crate) fn get_required_columns(&self, table: &str) -> Vec<&ColumnSchema> {
        let Some(schema) = self.get_table(table) else {
            return Vec::new();
        };
        schema
            .columns
            .iter()
            .filter(|column| {
                !column.nullable
                    && column.default.is_none()
                    && !schema.primary_key.contains(&column.name)
            })
            .collect()
    }

    /// Checks presence of required columns and flags plainly mistyped values. No coercion.
    pub(crate) fn validate_row(&self, table: &str, row: &Record) -> Vec<RowViolation> {
        let Some(schema) = self.get_table(table) else {
            return vec![RowViolation {
                column: String::new(),
                code: "unknown_table",
                is_error: true,
                message: format!("table `{table}` is not in the schema snapshot"),
            }];
        };

        let mut violations = Vec::new();
        for column in self.get_required_columns(table) {
            let present = row.get(&column.name).is_some_and(|value| !value.is_null());
            if !present {
                violations.push(RowViolation {
                    column: column.name.clone(),
                    code: "missing_required",
                    is_error: true,
                    message: format!("`{table}.{}` is not nullable", column.name),
                });
            }
        }

        for (name, value) in row {
            let Some(column) = schema.columns.iter().find(|candidate| &candidate.name == name)
            else {
                violations.push(RowViolation {
                    column: name.clone(),
                    code: "unknown_column",
                    is_error: true,
                    message: format!("`{table}` has no column `{name}`"),
                });
                continue;
            };
            if plainly_mistyped(&column.data_type, value) {
                violations.push(RowViolation {
                    column: name.clone(),
                    code: "type_mismatch",
                    is_error: false,
                    message: format!(
                        "`{table}.{name}` is declared {} but the value is {value}",
                        column.data_type
                    ),
                });
            }
        }

        violations
    }

    /// Cross-checks mapping targets against this schema.
    pub(crate) fn compare(&self, mapping: &ColumnMapping) -> ComparisonReport {
        let mut matched = Vec::new();
        let mut missing = Vec::new();
        let mut covered = Vec::new();

        for (field, table, column) in mapping.targets() {
            let reference = TargetColumnRef {
                canonical_name: field.as_str().to_string(),
                target_table: table.to_string(),
                target_column: column.to_string(),
            };
            if self.get_column(table, column).is_some() {
                covered.push((table.to_string(), column.to_string()));
                matched.push(reference);
            } else {
                missing.push(reference);
            }
        }

        let mut without_source = Vec::new();
        for table in [HEADER_TABLE, LINE_TABLE] {
            for column in self.get_required_columns(table) {
                let generated = GENERATED_COLUMNS
                    .iter()
                    .any(|(t, c)| *t == table && *c == column.name);
                let mapped = covered
                    .iter()
                    .any(|(t, c)| t == table && *c == column.name);
                if !generated && !mapped {
                    without_source.push(format!("{table}.{}", column.name));
                }
            }
        }

        ComparisonReport {
            matched,
            mapped_columns_missing_in_schema: missing,
            required_schema_columns_without_source: without_source,
        }
    }
}

fn plainly_mistyped(declared: &str, value: &Value) -> bool {
    let declared = declared.to_ascii_uppercase();
    let numeric_text = |text: &str| text.trim().parse::<f64>().is_ok();
    if declared.contains("INT") {
        return match value {
            Value::Number(number) => !number.is_i64() && !number.is_u64(),
            Value::String(text) => text.trim().parse::<i64>().is_err(),
            Value::Bool(_) | Value::Array(_) | Value::Object(_) => true,
            Value::Null => false,
        };
    }
    if declared.contains("REAL") || declared.contains("NUM") || declared.contains("DEC") {
        return match value {
            Value::String(text) => !numeric_text(text),
            Value::Bool(_) | Value::Array(_) | Value::Object(_) => true,
            _ => false,
        };
    }
    matches!(value, Value::Array(_) | Value::Object(_))
}
