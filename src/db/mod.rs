//! Database module
//!
//! SQLite record store: connection pool and migrations.

pub mod connection;
pub mod migrations;

pub use connection::{now_timestamp, Database, DbError, DbResult};

#[cfg(test)]
pub(crate) use connection::test_support;
