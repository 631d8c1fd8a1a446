//! Instagram Growth Tracker (igtrack) Library
//!
//! Session recording, growth statistics, analysis and export.

pub mod analysis;
pub mod build_info;
pub mod config;
pub mod db;
pub mod export;
pub mod mcp;
pub mod metrics;
pub mod models;
pub mod tools;
