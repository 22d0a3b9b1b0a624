//! Crawl engine: pacing plus the unit-by-unit fetch -> parse -> write loop.

pub mod crawler;
pub mod pacing;

pub use crawler::{Crawler, IMPORT_TABLES};
