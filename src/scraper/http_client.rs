use crate::config::ScraperConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::sleep;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};
use url::Url;

use super::{DocumentSource, ScrapeError};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Live Fundamentus detail pages over HTTP.
pub struct FundamentusClient {
    inner: reqwest::Client,
    config: ScraperConfig,
}

impl FundamentusClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // Accept cookies so session-based pages work
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        // Fail on a bad base URL now rather than on every request.
        Url::parse(&config.base_url)
            .with_context(|| format!("Invalid scraper base_url {:?}", config.base_url))?;

        Ok(Self {
            inner,
            config: config.clone(),
        })
    }

    /// `{base_url}?papel={TICKER}`
    pub fn ticker_url(&self, ticker: &str) -> Result<Url, url::ParseError> {
        Url::parse_with_params(&self.config.base_url, &[("papel", ticker)])
    }

    /// Exponential backoff seeded from the polite delay, with jitter.
    fn retry_strategy(&self) -> impl Iterator<Item = Duration> + use<> {
        let factor = (self.config.request_delay_ms / 2).max(1);
        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(MAX_BACKOFF)
            .map(jitter)
            .take(self.config.max_retries as usize)
    }

    async fn get_once(&self, ticker: &str, url: &Url) -> Result<String, ScrapeError> {
        debug!("GET {}", url);

        let resp = self
            .inner
            .get(url.clone())
            .send()
            .await
            .map_err(|source| ScrapeError::Fetch {
                ticker: ticker.to_string(),
                source,
            })?;

        check_status(ticker, resp.status())?;
        resp.text().await.map_err(|source| ScrapeError::Fetch {
            ticker: ticker.to_string(),
            source,
        })
    }

    /// Sleep for the configured delay + random jitter.
    async fn polite_delay(&self) {
        let extra = jitter(Duration::from_millis(self.config.jitter_ms));
        sleep(Duration::from_millis(self.config.request_delay_ms) + extra).await;
    }
}

/// A 404 means the same as the not-found banner; any other non-2xx is `Http`.
fn check_status(ticker: &str, status: StatusCode) -> Result<(), ScrapeError> {
    match status {
        status if status.is_success() => Ok(()),
        StatusCode::NOT_FOUND => Err(ScrapeError::NotFound {
            ticker: ticker.to_string(),
        }),
        status => Err(ScrapeError::Http {
            ticker: ticker.to_string(),
            status,
        }),
    }
}

#[async_trait]
impl DocumentSource for FundamentusClient {
    async fn fetch_page(&self, ticker: &str) -> Result<String, ScrapeError> {
        let url = self.ticker_url(ticker).map_err(|_| ScrapeError::Http {
            ticker: ticker.to_string(),
            status: StatusCode::BAD_REQUEST,
        })?;

        self.polite_delay().await;

        RetryIf::start(
            self.retry_strategy(),
            || self.get_once(ticker, &url),
            |e: &ScrapeError| {
                let retry = e.is_transient();
                if retry {
                    warn!("{}, retrying", e);
                }
                retry
            },
        )
        .await
    }
}
