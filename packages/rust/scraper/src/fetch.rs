//! HTTP fetching of source pages.
//!
//! One GET per source with a bounded timeout. No retries: a failed fetch is
//! reported to the caller, which records the source as failed and moves on.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};

use regassist_shared::{RegAssistError, Result, Source};

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("regassist/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// Raw response for one source.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: String,
    /// HTTP status code (always 2xx).
    pub status: u16,
    /// Declared `Content-Type`, if any.
    pub content_type: Option<String>,
    /// Decoded response body.
    pub body: String,
}

/// HTTP client for source pages.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
}

impl Fetcher {
    /// Create a fetcher whose requests fail after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| RegAssistError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }

    /// Fetch a source page.
    ///
    /// DNS failures, timeouts, non-2xx statuses and unreadable bodies all
    /// surface as [`RegAssistError::Network`].
    #[instrument(skip(self), fields(url = %source))]
    pub async fn fetch(&self, source: &Source) -> Result<FetchedPage> {
        let url = source.as_str();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.network_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegAssistError::Network(format!("{url}: HTTP {status}")));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response
            .text()
            .await
            .map_err(|e| self.network_error(url, &e))?;

        debug!(
            status = status.as_u16(),
            content_type = content_type.as_deref().unwrap_or("-"),
            bytes = body.len(),
            "page fetched"
        );

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }

    fn network_error(&self, url: &str, err: &reqwest::Error) -> RegAssistError {
        if err.is_timeout() {
            RegAssistError::Network(format!(
                "{url}: timed out after {}s",
                self.timeout.as_secs_f64()
            ))
        } else {
            RegAssistError::Network(format!("{url}: {err}"))
        }
    }
}
