pub mod backup;
pub mod db;
pub mod ingest;
pub mod inspect;
pub mod rollback;
pub mod schema;

mod common;
