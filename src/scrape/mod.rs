//! Scraping layer.
//!
//! Turns pages from the reference site into typed records:
//! - `fetch`: page retrieval behind the `PageFetcher` trait
//! - `source`: URL layout and table locations
//! - `comment`: markup hidden inside HTML comments
//! - `table` / `records`: stat tables to field maps to typed rows
//! - `tooltip`: shot-chart markers to shot events
//!
//! Nothing here touches the store.

pub mod coerce;
pub mod comment;
pub mod fetch;
pub mod records;
pub mod source;
pub mod table;
pub mod tooltip;

use scraper::Selector;

use crate::types::IngestError;

/// Compile a CSS selector, mapping the parser's error into the pipeline's
/// taxonomy.
pub(crate) fn selector(css: &str) -> Result<Selector, IngestError> {
    Selector::parse(css).map_err(|e| IngestError::Selector {
        css: css.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_compiles() {
        assert!(selector("div#div_shot-chart div#shot-wrapper").is_ok());
    }

    #[test]
    fn test_bad_selector_is_error() {
        let err = selector("div[").unwrap_err();
        assert!(matches!(err, IngestError::Selector { .. }));
        assert_eq!(err.kind(), "selector");
    }
}
