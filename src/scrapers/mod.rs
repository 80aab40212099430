// =============================================================================
// scrapers/mod.rs - THE FIVE STOREFRONT INFORMANTS
// =============================================================================
//
// Each source gets its own scraper: build a search URL from the title, fetch
// the HTML, dig out the first sensible hit. Every one of them can fail at any
// moment (captcha, redesign, 503, the game simply not existing) and none of
// them is allowed to take the others down with it. That's the orchestrator's
// job to enforce; this module just has to report failures honestly.
//
// All scrapers share one reqwest client but each has its own circuit breaker,
// so Amazon sulking doesn't stop us from asking Steam.
// =============================================================================

pub mod amazon;
pub mod bestbuy;
pub mod howlongtobeat;
pub mod html;
pub mod metacritic;
pub mod steam;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use tracing::{debug, warn};

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerSnapshot};
use crate::config::Config;
use crate::error::ScrapeError;
use crate::models::{Source, SourceData};

pub use amazon::AmazonScraper;
pub use bestbuy::BestBuyScraper;
pub use howlongtobeat::HowLongToBeatScraper;
pub use metacritic::MetacriticScraper;
pub use steam::SteamScraper;

/// One source's way of turning a game title into data.
#[async_trait]
pub trait Scraper: Send + Sync {
    fn source(&self) -> Source;

    async fn scrape(&self, title: &str) -> Result<SourceData, ScrapeError>;

    /// Breaker state for the metrics endpoint, if the scraper has one.
    fn breaker(&self) -> Option<CircuitBreakerSnapshot> {
        None
    }

    /// The orchestrator gave up waiting on this source. Scrapers with a
    /// breaker count it as a failure; a cancelled request never reports one.
    fn report_timeout(&self) {}
}

/// HTTP GET with a per-source circuit breaker in front of it.
pub struct PageFetcher {
    client: reqwest::Client,
    breaker: CircuitBreaker,
}

impl PageFetcher {
    pub fn new(client: reqwest::Client, breaker: CircuitBreaker) -> Self {
        Self { client, breaker }
    }

    /// Fetch a page body.
    ///
    /// Transport errors, 429 and 5xx count against the breaker. A 404 or
    /// other 4xx means the site is up and just didn't like the URL, so it
    /// counts as a healthy response even though the caller gets an error.
    pub async fn get_html(&self, url: &str) -> Result<String, ScrapeError> {
        if !self.breaker.allow_request() {
            debug!(
                breaker = self.breaker.name(),
                state = %self.breaker.state(),
                "Skipping request, circuit not closed"
            );
            return Err(ScrapeError::CircuitOpen);
        }

        debug!(breaker = self.breaker.name(), url = url, "Fetching page");

        let response = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                self.breaker.record_failure();
                return Err(e.into());
            }
        };

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            self.breaker.record_failure();
            warn!(breaker = self.breaker.name(), status = %status, "Source is refusing service");
            return Err(ScrapeError::Status(status.as_u16()));
        }
        if !status.is_success() {
            self.breaker.record_success();
            return Err(ScrapeError::Status(status.as_u16()));
        }

        match response.text().await {
            Ok(body) => {
                self.breaker.record_success();
                Ok(body)
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(e.into())
            }
        }
    }

    /// A failure the fetcher couldn't see itself: a 200 bot wall, or a
    /// request abandoned by the caller's timeout.
    pub fn report_failure(&self) {
        self.breaker.record_failure();
    }

    pub fn breaker_snapshot(&self) -> CircuitBreakerSnapshot {
        self.breaker.snapshot()
    }
}

/// Title as a search query: form-urlencoded, spaces as `+`.
pub fn search_term(title: &str) -> String {
    url::form_urlencoded::byte_serialize(title.trim().as_bytes()).collect()
}

/// Metacritic's URL slug: `The Legend of Zelda: Breath of the Wild` becomes
/// `the-legend-of-zelda-breath-of-the-wild`.
pub fn metacritic_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if (c.is_whitespace() || c == '-') && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// The shared HTTP client: browser-ish headers, compression, timeout.
pub fn build_client(config: &Config) -> anyhow::Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&config.accept_language).context("invalid FRIKI_ACCEPT_LANGUAGE")?,
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );

    reqwest::Client::builder()
        .timeout(config.http_timeout)
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .context("failed to build HTTP client")
}

/// Build every enabled scraper, in the configured order.
pub fn build_scrapers(config: &Config) -> anyhow::Result<Vec<Arc<dyn Scraper>>> {
    let client = build_client(config)?;

    let fetcher_for = |source: Source| {
        PageFetcher::new(
            client.clone(),
            CircuitBreaker::new(
                source.key(),
                config.circuit_breaker_failure_threshold,
                config.circuit_breaker_reset_timeout,
                config.circuit_breaker_success_threshold,
            ),
        )
    };

    let scrapers = config
        .sources
        .iter()
        .map(|&source| -> Arc<dyn Scraper> {
            let fetcher = fetcher_for(source);
            match source {
                Source::Amazon => Arc::new(AmazonScraper::new(fetcher, &config.amazon_base_url)),
                Source::BestBuy => Arc::new(BestBuyScraper::new(fetcher, &config.bestbuy_base_url)),
                Source::Steam => Arc::new(SteamScraper::new(fetcher, &config.steam_base_url)),
                Source::Metacritic => {
                    Arc::new(MetacriticScraper::new(fetcher, &config.metacritic_base_url))
                }
                Source::HowLongToBeat => {
                    Arc::new(HowLongToBeatScraper::new(fetcher, &config.hltb_base_url))
                }
            }
        })
        .collect();

    Ok(scrapers)
}
