//! Page retrieval.
//!
//! The crawler only sees the [`PageFetcher`] trait; [`HttpFetcher`] is the
//! production implementation over `reqwest`. Status handling belongs to
//! the caller: a fetcher returns whatever the server answered.

use async_trait::async_trait;
use reqwest::Client;
use std::borrow::Cow;
use std::time::Duration;
use tracing::debug;

use crate::config::SourceConfig;
use crate::types::IngestError;

/// A fetched page body with the status it came back with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawPage {
    pub fn ok(url: &str, body: impl Into<Vec<u8>>) -> Self {
        Self { url: url.to_string(), status: 200, body: body.into() }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Body as text; invalid UTF-8 is replaced rather than rejected.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Retrieves pages by URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Transport failures are `IngestError::Fetch`; any HTTP status,
    /// including errors, is returned as a page.
    async fn fetch(&self, url: &str) -> Result<RawPage, IngestError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new(cfg: &SourceConfig) -> Result<Self, IngestError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(cfg.user_agent.as_str())
            .build()
            .map_err(|e| IngestError::Fetch {
                url: cfg.base_url.clone(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<RawPage, IngestError> {
        let transport = |e: reqwest::Error| IngestError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        };

        let resp = self.http.get(url).send().await.map_err(transport)?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(transport)?.to_vec();

        debug!(url, status, bytes = body.len(), "Fetched page");
        Ok(RawPage { url: url.to_string(), status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lossy_text() {
        let page = RawPage {
            url: "u".into(),
            status: 200,
            body: vec![b'o', b'k', 0xff],
        };
        assert!(page.text().starts_with("ok"));
        assert!(page.is_ok());
    }

    #[test]
    fn test_http_fetcher_builds_from_defaults() {
        assert!(HttpFetcher::new(&SourceConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_mock_fetcher_returns_status() {
        let mut mock = MockPageFetcher::new();
        mock.expect_fetch().returning(|url| {
            Ok(RawPage { url: url.to_string(), status: 429, body: Vec::new() })
        });
        let page = mock.fetch("https://example.test/x").await.unwrap();
        assert_eq!(page.status, 429);
        assert!(!page.is_ok());
    }
}
