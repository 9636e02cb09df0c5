use rusqlite::Connection;
use rusqlite_migration::{M, Migrations};

const TARGET_SCHEMA_SQL: &str = include_str!("migrations/0001_target_schema.sql");

pub const REFERENCE_TABLES: [&str; 5] = [
    "accounts",
    "projects",
    "transaction_classifications",
    "analysis_work_items",
    "sub_tree",
];

pub const HEADER_TABLE: &str = "transactions";
pub const LINE_TABLE: &str = "transaction_lines";

pub fn run_pending(conn: &mut Connection) -> rusqlite_migration::Result<()> {
    let migrations = Migrations::new(vec![M::up(TARGET_SCHEMA_SQL)]);
    migrations.to_latest(conn)
}

pub fn target_table_names() -> Vec<String> {
    REFERENCE_TABLES
        .iter()
        .chain([HEADER_TABLE, LINE_TABLE].iter())
        .map(|name| name.to_string())
        .collect()
}
