//! courtside: basketball-reference scrape-to-record ingestion.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod engine;
pub mod scrape;
pub mod storage;
pub mod types;
