use std::time::Duration;

use reqwest::blocking::Client;
use tracing::warn;

use crate::ScrapeError;

pub const CHAMBER_ORGANIZER_URL_PREFIX: &str =
    "http://www.chamberorganizer.com/Calendar/moreinfo.php?eventid=";

/// Source of page bodies, one per numeric page id.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, id: i64) -> Result<String, ScrapeError>;

    /// Human readable location of a page, for progress logs.
    fn locate(&self, id: i64) -> String {
        format!("page {}", id)
    }
}

impl<F> PageFetcher for F
where
    F: Fn(i64) -> Result<String, ScrapeError> + Send + Sync,
{
    fn fetch(&self, id: i64) -> Result<String, ScrapeError> {
        self(id)
    }
}

/// Blocking GET of `<url_prefix><id>`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    url_prefix: String,
}

impl HttpFetcher {
    /// A fetcher without any request timeout.
    pub fn new(url_prefix: &str) -> Result<Self, ScrapeError> {
        Self::with_timeout(url_prefix, None)
    }

    pub fn with_timeout(url_prefix: &str, timeout: Option<Duration>) -> Result<Self, ScrapeError> {
        // reqwest applies a 30s default unless told otherwise
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpFetcher {
            client,
            url_prefix: url_prefix.to_string(),
        })
    }

    pub fn url_for(&self, id: i64) -> String {
        format!("{}{}", self.url_prefix, id)
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, id: i64) -> Result<String, ScrapeError> {
        let url = self.url_for(id);
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            warn!("{} answered {}", url, status);
        }
        Ok(response.text()?)
    }

    fn locate(&self, id: i64) -> String {
        self.url_for(id)
    }
}
