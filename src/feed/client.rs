use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::feed::errors::FeedError;

/// HTTP client for the upstream quote feed.
///
/// The feed answers `GET {base}/list=<code,code,...>` with one
/// `var hq_str_<code>="...";` line per instrument, body encoded in a legacy
/// double-byte charset (GB18030 superset of the GB2312 the feed declares).
#[derive(Clone)]
pub struct FeedClient {
    http: Client,
    base_url: String,
}

impl FeedClient {
    pub fn new(base_url: String) -> Result<Self, FeedError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self { http, base_url })
    }

    #[instrument(
        skip(self, codes),
        fields(code_count = codes.len()),
        level = "debug"
    )]
    pub async fn fetch_quotes(&self, codes: &[&str]) -> Result<String, FeedError> {
        let url = format!("{}/list={}", self.base_url, codes.join(","));

        let resp = self
            .http
            .get(&url)
            // The feed rejects requests without its own referer.
            .header("Referer", "https://finance.sina.com.cn/")
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await?
            .error_for_status()?;

        let text = resp.text_with_charset("gb18030").await?;

        if text.trim().is_empty() {
            return Err(FeedError::EmptyResponse);
        }

        debug!(bytes = text.len(), "feed response decoded");

        Ok(text)
    }
}
