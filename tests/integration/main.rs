//! End-to-end tests: canned pages -> crawler -> in-memory SQLite.

mod mock_fetcher;
mod pipeline;
