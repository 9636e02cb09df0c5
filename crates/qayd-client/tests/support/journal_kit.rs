use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use qayd_client::commands::db::{self, DbInitOptions};
use qayd_client::commands::ingest::{self, IngestOptions};
use qayd_client::{ClientResult, SuccessEnvelope};
use rusqlite::{Connection, params};
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

pub const TENANT: &str = "org-t";
pub const SHEET: &str = "القيود ";

const HEADERS: [&str; 6] = [
    "رقم القيد",
    "تاريخ القيد",
    "رمز الحساب",
    "مدين",
    "دائن",
    "البيان",
];

#[derive(Debug, Clone)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

#[derive(Debug, Clone)]
pub struct JournalRow {
    pub entry_no: Cell,
    pub entry_date: Cell,
    pub account_code: Cell,
    pub debit: Cell,
    pub credit: Cell,
    pub description: Cell,
}

pub fn row(entry_no: f64, entry_date: &str, account_code: &str, debit: f64, credit: f64) -> JournalRow {
    JournalRow {
        entry_no: Cell::Number(entry_no),
        entry_date: Cell::from(entry_date),
        account_code: Cell::from(account_code),
        debit: Cell::Number(debit),
        credit: Cell::Number(credit),
        description: Cell::Empty,
    }
}

pub fn empty_row() -> JournalRow {
    JournalRow {
        entry_no: Cell::Empty,
        entry_date: Cell::Empty,
        account_code: Cell::Empty,
        debit: Cell::Empty,
        credit: Cell::Empty,
        description: Cell::Empty,
    }
}

pub struct Fixture {
    _dir: TempDir,
    pub home: PathBuf,
    pub db_path: PathBuf,
    pub workbook: PathBuf,
    pub env: BTreeMap<String, String>,
}

impl Fixture {
    /// A migrated database with accounts 1001 and 2001 seeded for `TENANT`.
    pub fn new() -> Self {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok());
        let dir = match dir {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let home = dir.path().join("qayd-home");
        let db_path = dir.path().join("ledger.db");
        let workbook = dir.path().join("journal.xlsx");

        let mut env = BTreeMap::new();
        env.insert("DATABASE_URL".to_string(), db_path.display().to_string());
        env.insert("TENANT_ID".to_string(), TENANT.to_string());
        env.insert("EXCEL_FILE_PATH".to_string(), workbook.display().to_string());
        env.insert("RETRY_DELAY_SECONDS".to_string(), "0".to_string());

        let fixture = Self {
            _dir: dir,
            home,
            db_path,
            workbook,
            env,
        };
        let init = db::init_with_options(DbInitOptions {
            environment: Some(&fixture.env),
        });
        assert!(init.is_ok());

        fixture.seed_account("acc-1001", TENANT, "1001");
        fixture.seed_account("acc-2001", TENANT, "2001");
        fixture
    }

    pub fn set_env(&mut self, name: &str, value: &str) {
        self.env.insert(name.to_string(), value.to_string());
    }

    pub fn connection(&self) -> Connection {
        let connection = Connection::open(&self.db_path);
        assert!(connection.is_ok());
        match connection {
            Ok(connection) => connection,
            Err(error) => panic!("open failed: {error}"),
        }
    }

    pub fn seed_account(&self, id: &str, tenant: &str, legacy_code: &str) {
        let inserted = self.connection().execute(
            "INSERT INTO accounts (id, org_id, code, legacy_code, name) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, tenant, format!("N-{legacy_code}"), legacy_code, format!("Account {legacy_code}")],
        );
        assert!(inserted.is_ok());
    }

    pub fn write_journal(&self, rows: &[JournalRow]) {
        write_workbook(&self.workbook, SHEET, rows);
    }

    pub fn ingest(&self, strategy: &str, dry_run: bool) -> ClientResult<SuccessEnvelope> {
        self.ingest_with(IngestOptions {
            strategy: Some(strategy.to_string()),
            dry_run,
            ..IngestOptions::default()
        })
    }

    pub fn ingest_with(&self, options: IngestOptions<'_>) -> ClientResult<SuccessEnvelope> {
        ingest::run_with_options(IngestOptions {
            home_override: Some(&self.home),
            environment: Some(&self.env),
            ..options
        })
    }

    pub fn count(&self, sql: &str) -> i64 {
        let value = self
            .connection()
            .query_row(sql, [], |row| row.get::<_, i64>(0));
        assert!(value.is_ok());
        value.unwrap_or(-1)
    }

    pub fn text(&self, sql: &str) -> String {
        let value = self
            .connection()
            .query_row(sql, [], |row| row.get::<_, String>(0));
        assert!(value.is_ok(), "query failed: {sql}");
        value.unwrap_or_default()
    }

    /// `(line_no, account_id, debit_amount, credit_amount)` for every line, in load order.
    pub fn lines(&self) -> Vec<(i64, String, String, String)> {
        let connection = self.connection();
        let statement = connection.prepare(
            "SELECT l.line_no, l.account_id, l.debit_amount, l.credit_amount
             FROM transaction_lines l JOIN transactions t ON t.id = l.transaction_id
             ORDER BY t.reference_number, l.line_no",
        );
        assert!(statement.is_ok());
        let Ok(mut statement) = statement else {
            return Vec::new();
        };
        let rows = statement.query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        });
        assert!(rows.is_ok());
        match rows {
            Ok(rows) => rows.filter_map(Result::ok).collect(),
            Err(_) => Vec::new(),
        }
    }
}

pub fn write_workbook(path: &Path, sheet_name: &str, rows: &[JournalRow]) {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    assert!(worksheet.set_name(sheet_name).is_ok());

    for (column, header) in HEADERS.iter().enumerate() {
        assert!(worksheet.write_string(0, column as u16, *header).is_ok());
    }

    for (offset, journal_row) in rows.iter().enumerate() {
        let row = offset as u32 + 1;
        let cells = [
            &journal_row.entry_no,
            &journal_row.entry_date,
            &journal_row.account_code,
            &journal_row.debit,
            &journal_row.credit,
            &journal_row.description,
        ];
        for (column, cell) in cells.into_iter().enumerate() {
            let column = column as u16;
            let written = match cell {
                Cell::Text(text) => worksheet.write_string(row, column, text.as_str()).map(|_| ()),
                Cell::Number(number) => worksheet.write_number(row, column, *number).map(|_| ()),
                Cell::Empty => Ok(()),
            };
            assert!(written.is_ok());
        }
    }

    assert!(workbook.save(path).is_ok());
}

/// Two balanced rows: entry 1 on 2025-01-15, 1000 against accounts 1001 and 2001.
pub fn happy_rows() -> Vec<JournalRow> {
    vec![
        row(1.0, "2025-01-15", "1001", 1000.0, 0.0),
        row(1.0, "2025-01-15", "2001", 0.0, 1000.0),
    ]
}
