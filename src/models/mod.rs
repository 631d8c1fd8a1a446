//! Data models
//!
//! Rust structs representing database entities.

mod account;
mod entry;
mod preferences;

pub use account::{Account, AccountCreate, AccountDeletion, AccountUpdate};
pub use entry::{validate_date, Entry, EntryCreate, EntryFilter, EntryUpdate};
pub use preferences::Preferences;
