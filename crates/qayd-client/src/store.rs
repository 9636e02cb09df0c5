//! Target database access behind the [`TargetStore`] seam.
//!
//! Every pipeline phase that touches the database goes through this trait so
//! the loader, verifier and rollback can run against any relational backend.
//! [`SqliteStore`] is the bundled implementation.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, Error as SqliteError, TransactionBehavior, ffi::ErrorCode};
use serde_json::{Map, Number, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::contracts::types::{
    ColumnSchema, ForeignKeySchema, IndexSchema, SchemaSnapshot, TableSchema,
};
use crate::migrations::{HEADER_TABLE, LINE_TABLE};
use crate::state::{open_connection, open_readonly_connection};
use crate::{ClientError, ClientResult};

/// Ids bound per `IN (...)` query, well under SQLite's variable limit.
const ID_CHUNK: usize = 500;

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StoreErrorKind {
    /// Timeouts, lock contention, dropped connections. Worth retrying.
    Transient,
    /// Constraint or type violations. Retrying gives the same answer.
    Structural,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn transient(message: &str) -> Self {
        Self {
            kind: StoreErrorKind::Transient,
            message: message.to_string(),
        }
    }

    pub fn structural(message: &str) -> Self {
        Self {
            kind: StoreErrorKind::Structural,
            message: message.to_string(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == StoreErrorKind::Transient
    }
}

impl From<StoreError> for ClientError {
    fn from(error: StoreError) -> Self {
        match error.kind {
            StoreErrorKind::Transient => ClientError::transport_failed(&error.message),
            StoreErrorKind::Structural => ClientError::store_failed(&error.message),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RecordOutcome {
    Inserted(String),
    Rejected(String),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReferenceRow {
    pub id: String,
    pub code: Option<String>,
}

pub trait TargetStore {
    /// Rows of a reference table owned by `tenant_id`, with the match column rendered as text.
    fn reference_rows(
        &self,
        table: &str,
        match_column: &str,
        tenant_id: &str,
    ) -> Result<Vec<ReferenceRow>, StoreError>;

    /// Inserts `records` in one transaction with a savepoint per record.
    ///
    /// Records without an `id` get a fresh UUID. A structural failure rejects only
    /// its own record; a transient failure aborts the whole batch with `Err`.
    fn insert_batch(
        &mut self,
        table: &str,
        records: &[Record],
    ) -> Result<Vec<RecordOutcome>, StoreError>;

    fn max_line_no(&self, header_id: &str) -> Result<i64, StoreError>;

    fn tenant_rows(&self, table: &str, tenant_id: &str) -> Result<Vec<Record>, StoreError>;

    fn count_tenant_rows(&self, table: &str, tenant_id: &str) -> Result<i64, StoreError>;

    fn fetch_by_ids(&self, table: &str, ids: &[String]) -> Result<Vec<Record>, StoreError>;

    fn existing_ids(
        &self,
        table: &str,
        tenant_id: &str,
        ids: &[String],
    ) -> Result<HashSet<String>, StoreError>;

    /// Tenant lines whose `transaction_id` has no header row.
    fn orphan_line_ids(&self, tenant_id: &str) -> Result<Vec<String>, StoreError>;

    /// Replaces the tenant's header and line rows in a single transaction.
    fn restore_tenant_rows(
        &mut self,
        tenant_id: &str,
        headers: &[Record],
        lines: &[Record],
    ) -> Result<(), StoreError>;

    fn schema_snapshot(&self) -> Result<SchemaSnapshot, StoreError>;
}

pub struct SqliteStore {
    connection: Connection,
    db_path: PathBuf,
}

impl SqliteStore {
    pub fn open(db_path: &Path, timeout: Duration) -> ClientResult<Self> {
        Ok(Self {
            connection: open_connection(db_path, timeout)?,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn open_readonly(db_path: &Path, timeout: Duration) -> ClientResult<Self> {
        Ok(Self {
            connection: open_readonly_connection(db_path, timeout)?,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn from_connection(connection: Connection, db_path: &Path) -> Self {
        Self {
            connection,
            db_path: db_path.to_path_buf(),
        }
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    fn query_records(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Record>, StoreError> {
        let mut statement = self.connection.prepare(sql).map_err(classify)?;
        let column_names = statement
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<String>>();
        let mut rows = statement.query(params).map_err(classify)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(classify)? {
            let mut record = Record::new();
            for (index, name) in column_names.iter().enumerate() {
                let value = row.get_ref(index).map_err(classify)?;
                record.insert(name.clone(), json_from_sql(value));
            }
            records.push(record);
        }
        Ok(records)
    }
}

impl TargetStore for SqliteStore {
    fn reference_rows(
        &self,
        table: &str,
        match_column: &str,
        tenant_id: &str,
    ) -> Result<Vec<ReferenceRow>, StoreError> {
        ensure_identifier(table)?;
        ensure_identifier(match_column)?;
        let sql = format!("SELECT id, {match_column} FROM {table} WHERE org_id = ?1 ORDER BY id");
        let mut statement = self.connection.prepare(&sql).map_err(classify)?;
        let mut rows = statement.query([tenant_id]).map_err(classify)?;
        let mut output = Vec::new();
        while let Some(row) = rows.next().map_err(classify)? {
            let id = row.get::<_, String>(0).map_err(classify)?;
            let code = match row.get_ref(1).map_err(classify)? {
                ValueRef::Null => None,
                ValueRef::Integer(value) => Some(value.to_string()),
                ValueRef::Real(value) => Some(value.to_string()),
                ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                    Some(String::from_utf8_lossy(bytes).to_string())
                }
            };
            output.push(ReferenceRow { id, code });
        }
        Ok(output)
    }

    fn insert_batch(
        &mut self,
        table: &str,
        records: &[Record],
    ) -> Result<Vec<RecordOutcome>, StoreError> {
        ensure_identifier(table)?;
        let mut transaction = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(classify)?;

        let mut outcomes = Vec::with_capacity(records.len());
        for source in records {
            let mut record = source.clone();
            let id = match record.get("id").and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => {
                    let id = Uuid::new_v4().to_string();
                    record.insert("id".to_string(), Value::String(id.clone()));
                    id
                }
            };
            let sql = insert_statement(table, &record)?;
            let values = record.values().map(sql_from_json).collect::<Vec<SqlValue>>();

            let savepoint = transaction.savepoint().map_err(classify)?;
            match savepoint.execute(&sql, rusqlite::params_from_iter(values.iter())) {
                Ok(_) => {
                    savepoint.commit().map_err(classify)?;
                    outcomes.push(RecordOutcome::Inserted(id));
                }
                Err(error) => {
                    let classified = classify(error);
                    if classified.is_transient() {
                        return Err(classified);
                    }
                    drop(savepoint);
                    outcomes.push(RecordOutcome::Rejected(classified.message));
                }
            }
        }

        transaction.commit().map_err(classify)?;
        Ok(outcomes)
    }

    fn max_line_no(&self, header_id: &str) -> Result<i64, StoreError> {
        let sql = format!(
            "SELECT COALESCE(MAX(line_no), 0) FROM {LINE_TABLE} WHERE transaction_id = ?1"
        );
        self.connection
            .query_row(&sql, [header_id], |row| row.get::<_, i64>(0))
            .map_err(classify)
    }

    fn tenant_rows(&self, table: &str, tenant_id: &str) -> Result<Vec<Record>, StoreError> {
        ensure_identifier(table)?;
        let sql = format!("SELECT * FROM {table} WHERE org_id = ?1 ORDER BY id");
        self.query_records(&sql, &[&tenant_id])
    }

    fn count_tenant_rows(&self, table: &str, tenant_id: &str) -> Result<i64, StoreError> {
        ensure_identifier(table)?;
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE org_id = ?1");
        self.connection
            .query_row(&sql, [tenant_id], |row| row.get::<_, i64>(0))
            .map_err(classify)
    }

    fn fetch_by_ids(&self, table: &str, ids: &[String]) -> Result<Vec<Record>, StoreError> {
        ensure_identifier(table)?;
        let mut output = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(ID_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("SELECT * FROM {table} WHERE id IN ({placeholders}) ORDER BY id");
            let params = chunk
                .iter()
                .map(|id| id as &dyn rusqlite::ToSql)
                .collect::<Vec<&dyn rusqlite::ToSql>>();
            output.extend(self.query_records(&sql, &params)?);
        }
        Ok(output)
    }

    fn existing_ids(
        &self,
        table: &str,
        tenant_id: &str,
        ids: &[String],
    ) -> Result<HashSet<String>, StoreError> {
        ensure_identifier(table)?;
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE id = ?1 AND org_id = ?2");
        let mut statement = self.connection.prepare(&sql).map_err(classify)?;
        let mut found = HashSet::new();
        for id in ids {
            let count = statement
                .query_row([id.as_str(), tenant_id], |row| row.get::<_, i64>(0))
                .map_err(classify)?;
            if count > 0 {
                found.insert(id.clone());
            }
        }
        Ok(found)
    }

    fn orphan_line_ids(&self, tenant_id: &str) -> Result<Vec<String>, StoreError> {
        let sql = format!(
            "SELECT l.id FROM {LINE_TABLE} l
             LEFT JOIN {HEADER_TABLE} t ON t.id = l.transaction_id
             WHERE l.org_id = ?1 AND t.id IS NULL
             ORDER BY l.id"
        );
        let mut statement = self.connection.prepare(&sql).map_err(classify)?;
        let rows = statement
            .query_map([tenant_id], |row| row.get::<_, String>(0))
            .map_err(classify)?;
        rows.collect::<Result<Vec<String>, SqliteError>>()
            .map_err(classify)
    }

    fn restore_tenant_rows(
        &mut self,
        tenant_id: &str,
        headers: &[Record],
        lines: &[Record],
    ) -> Result<(), StoreError> {
        let transaction = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(classify)?;

        transaction
            .execute(
                &format!("DELETE FROM {LINE_TABLE} WHERE org_id = ?1"),
                [tenant_id],
            )
            .map_err(classify)?;
        transaction
            .execute(
                &format!("DELETE FROM {HEADER_TABLE} WHERE org_id = ?1"),
                [tenant_id],
            )
            .map_err(classify)?;

        for (table, records) in [(HEADER_TABLE, headers), (LINE_TABLE, lines)] {
            for record in records {
                let sql = insert_statement(table, record)?;
                let values = record.values().map(sql_from_json).collect::<Vec<SqlValue>>();
                transaction
                    .execute(&sql, rusqlite::params_from_iter(values.iter()))
                    .map_err(classify)?;
            }
        }

        transaction.commit().map_err(classify)
    }

    fn schema_snapshot(&self) -> Result<SchemaSnapshot, StoreError> {
        let mut statement = self
            .connection
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                 ORDER BY name",
            )
            .map_err(classify)?;
        let table_names = statement
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(classify)?
            .collect::<Result<Vec<String>, SqliteError>>()
            .map_err(classify)?;

        let mut tables = BTreeMap::new();
        for name in table_names {
            let table = self.describe_table(&name)?;
            tables.insert(name, table);
        }

        Ok(SchemaSnapshot {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            source: self.db_path.display().to_string(),
            tables,
        })
    }
}

impl SqliteStore {
    fn describe_table(&self, table: &str) -> Result<TableSchema, StoreError> {
        let mut column_statement = self
            .connection
            .prepare(
                "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
            )
            .map_err(classify)?;
        let column_rows = column_statement
            .query_map([table], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
            .map_err(classify)?
            .collect::<Result<Vec<_>, SqliteError>>()
            .map_err(classify)?;

        let mut primary_key = column_rows
            .iter()
            .filter(|(_, _, _, _, pk)| *pk > 0)
            .map(|(name, _, _, _, pk)| (*pk, name.clone()))
            .collect::<Vec<(i64, String)>>();
        primary_key.sort();

        let columns = column_rows
            .into_iter()
            .map(|(name, data_type, not_null, default, pk)| ColumnSchema {
                name,
                data_type: if data_type.is_empty() {
                    "ANY".to_string()
                } else {
                    data_type.to_ascii_uppercase()
                },
                nullable: not_null == 0 && pk == 0,
                default,
            })
            .collect::<Vec<ColumnSchema>>();

        let mut fk_statement = self
            .connection
            .prepare("SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq")
            .map_err(classify)?;
        let foreign_keys = fk_statement
            .query_map([table], |row| {
                Ok(ForeignKeySchema {
                    column: row.get::<_, String>(0)?,
                    references_table: row.get::<_, String>(1)?,
                    references_column: row
                        .get::<_, Option<String>>(2)?
                        .unwrap_or_else(|| "id".to_string()),
                })
            })
            .map_err(classify)?
            .collect::<Result<Vec<ForeignKeySchema>, SqliteError>>()
            .map_err(classify)?;

        let mut index_statement = self
            .connection
            .prepare("SELECT name, \"unique\" FROM pragma_index_list(?1) ORDER BY name")
            .map_err(classify)?;
        let index_rows = index_statement
            .query_map([table], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(classify)?
            .collect::<Result<Vec<(String, i64)>, SqliteError>>()
            .map_err(classify)?;

        let mut indexes = Vec::with_capacity(index_rows.len());
        for (name, unique) in index_rows {
            let mut info_statement = self
                .connection
                .prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")
                .map_err(classify)?;
            let index_columns = info_statement
                .query_map([name.as_str()], |row| row.get::<_, Option<String>>(0))
                .map_err(classify)?
                .collect::<Result<Vec<Option<String>>, SqliteError>>()
                .map_err(classify)?
                .into_iter()
                .flatten()
                .collect::<Vec<String>>();
            indexes.push(IndexSchema {
                name,
                columns: index_columns,
                unique: unique != 0,
            });
        }

        Ok(TableSchema {
            name: table.to_string(),
            columns,
            primary_key: primary_key.into_iter().map(|(_, name)| name).collect(),
            foreign_keys,
            indexes,
        })
    }
}

pub fn record_str<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

fn insert_statement(table: &str, record: &Record) -> Result<String, StoreError> {
    if record.is_empty() {
        return Err(StoreError::structural("cannot insert an empty record"));
    }
    let mut columns = Vec::with_capacity(record.len());
    for column in record.keys() {
        ensure_identifier(column)?;
        columns.push(column.as_str());
    }
    let placeholders = (1..=columns.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<String>>();
    Ok(format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    ))
}

fn ensure_identifier(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_');
    if valid_start && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        Ok(())
    } else {
        Err(StoreError::structural(&format!(
            "`{name}` is not a valid identifier"
        )))
    }
}

fn sql_from_json(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => SqlValue::Integer(integer),
            None => SqlValue::Real(number.as_f64().unwrap_or_default()),
        },
        Value::String(text) => SqlValue::Text(text.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn json_from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(integer) => Value::Number(Number::from(integer)),
        ValueRef::Real(real) => Number::from_f64(real).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).to_string())
        }
    }
}

fn classify(error: SqliteError) -> StoreError {
    let transient = matches!(
        error.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    );
    if transient {
        StoreError::transient(&error.to_string())
    } else {
        StoreError::structural(&error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use serde_json::json;

    use super::{Record, RecordOutcome, SqliteStore, TargetStore};
    use crate::migrations::run_pending;

    fn store() -> SqliteStore {
        let mut connection = match Connection::open_in_memory() {
            Ok(connection) => connection,
            Err(error) => panic!("in-memory database should open: {error}"),
        };
        assert!(connection.execute_batch("PRAGMA foreign_keys = ON;").is_ok());
        assert!(run_pending(&mut connection).is_ok());
        assert!(
            connection
                .execute_batch(
                    "INSERT INTO accounts (id, org_id, code, legacy_code, name)
                     VALUES ('acc-1', 'org-1', '1000', '7', 'Cash'),
                            ('acc-2', 'org-1', '2000', 12, 'Bank'),
                            ('acc-9', 'org-2', '1000', '7', 'Other tenant');"
                )
                .is_ok()
        );
        SqliteStore::from_connection(connection, std::path::Path::new(":memory:"))
    }

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn reference_rows_are_tenant_scoped_and_rendered_as_text() {
        let store = store();
        let rows = store.reference_rows("accounts", "legacy_code", "org-1");
        assert!(rows.is_ok());
        let rows = rows.unwrap_or_default();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].code.as_deref(), Some("7"));
        assert_eq!(rows[1].code.as_deref(), Some("12"));
    }

    #[test]
    fn structural_failure_rejects_only_its_record() {
        let mut store = store();
        let header = record(json!({
            "id": "hdr-1",
            "org_id": "org-1",
            "reference_number": "1_2024-01-01",
            "entry_date": "2024-01-01",
            "total_debit": "10.00",
            "total_credit": "10.00",
            "line_count": 2
        }));
        assert!(store.insert_batch("transactions", &[header]).is_ok());

        let good = record(json!({
            "org_id": "org-1",
            "transaction_id": "hdr-1",
            "line_no": 1,
            "account_id": "acc-1",
            "debit_amount": "10.00",
            "credit_amount": "0.00"
        }));
        let bad = record(json!({
            "org_id": "org-1",
            "transaction_id": "hdr-1",
            "line_no": 2,
            "account_id": "missing-account",
            "debit_amount": "0.00",
            "credit_amount": "10.00"
        }));
        let outcomes = store.insert_batch("transaction_lines", &[good, bad]);
        assert!(outcomes.is_ok());
        let outcomes = outcomes.unwrap_or_default();
        assert!(matches!(outcomes[0], RecordOutcome::Inserted(_)));
        assert!(matches!(outcomes[1], RecordOutcome::Rejected(_)));
        assert_eq!(
            store.count_tenant_rows("transaction_lines", "org-1").ok(),
            Some(1)
        );
        assert_eq!(store.max_line_no("hdr-1").ok(), Some(1));
    }

    #[test]
    fn fetch_by_ids_returns_only_known_rows_across_chunks() {
        let mut store = store();
        let headers = (0..super::ID_CHUNK + 3)
            .map(|index| {
                record(json!({
                    "id": format!("hdr-{index:04}"),
                    "org_id": "org-1",
                    "reference_number": index.to_string(),
                    "entry_date": "2024-01-01",
                    "total_debit": "0.00",
                    "total_credit": "0.00",
                    "line_count": 0
                }))
            })
            .collect::<Vec<Record>>();
        assert!(store.insert_batch("transactions", &headers).is_ok());

        let mut ids = (0..super::ID_CHUNK + 3)
            .step_by(2)
            .map(|index| format!("hdr-{index:04}"))
            .collect::<Vec<String>>();
        let expected = ids.len();
        ids.push("hdr-missing".to_string());

        let fetched = store.fetch_by_ids("transactions", &ids);
        assert!(fetched.is_ok());
        let fetched = fetched.unwrap_or_default();
        assert_eq!(fetched.len(), expected);
        assert!(fetched.iter().all(|row| row.get("org_id") == Some(&json!("org-1"))));
    }

    #[test]
    fn rejects_unsafe_identifiers() {
        let store = store();
        let result = store.tenant_rows("accounts; DROP TABLE accounts", "org-1");
        assert!(result.is_err());
    }

    #[test]
    fn restore_replaces_tenant_rows_only() {
        let mut store = store();
        let header = record(json!({
            "id": "hdr-1",
            "org_id": "org-1",
            "reference_number": "1_2024-01-01",
            "entry_date": "2024-01-01",
            "total_debit": "0.00",
            "total_credit": "0.00",
            "line_count": 0
        }));
        let other = record(json!({
            "id": "hdr-2",
            "org_id": "org-2",
            "reference_number": "1_2024-01-01",
            "entry_date": "2024-01-01",
            "total_debit": "0.00",
            "total_credit": "0.00",
            "line_count": 0
        }));
        assert!(store.insert_batch("transactions", &[header, other]).is_ok());

        assert!(store.restore_tenant_rows("org-1", &[], &[]).is_ok());
        assert_eq!(store.count_tenant_rows("transactions", "org-1").ok(), Some(0));
        assert_eq!(store.count_tenant_rows("transactions", "org-2").ok(), Some(1));
    }

    #[test]
    fn schema_snapshot_lists_foreign_keys() {
        let store = store();
        let snapshot = store.schema_snapshot();
        assert!(snapshot.is_ok());
        if let Ok(snapshot) = snapshot {
            let lines = snapshot.tables.get("transaction_lines");
            assert!(lines.is_some());
            if let Some(lines) = lines {
                assert!(
                    lines
                        .foreign_keys
                        .iter()
                        .any(|fk| fk.column == "account_id" && fk.references_table == "accounts")
                );
                assert_eq!(lines.primary_key, vec!["id".to_string()]);
            }
        }
    }
}
