//! igtrack Tools module
//!
//! Transport-agnostic tool implementations. Each returns
//! `Result<Response, String>`; the MCP layer serializes the response.

pub mod accounts;
pub mod analysis;
pub mod entries;
pub mod export;
pub mod statistics;
pub mod status;
