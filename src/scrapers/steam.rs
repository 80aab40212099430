// =============================================================================
// scrapers/steam.rs - VALVE'S STOREFRONT
// =============================================================================
//
// Search URL: {base}/search/?term={title}
//
// Steam's search page is server-rendered and mercifully stable. Each hit is
// an <a class="search_result_row">. Discounted games carry a percentage
// block ("-50%") next to the final price; full-price ones don't.
// =============================================================================

use async_trait::async_trait;
use scraper::Html;

use super::html::{first_attr, first_element, first_text, first_text_of_any};
use super::{search_term, PageFetcher, Scraper};
use crate::circuit_breaker::CircuitBreakerSnapshot;
use crate::error::ScrapeError;
use crate::models::{Source, SourceData, StoreListing};

const PRICE_SELECTORS: &[&str] = &[
    "div.discount_final_price",
    "div.search_price",
];

pub struct SteamScraper {
    fetcher: PageFetcher,
    base_url: String,
}

impl SteamScraper {
    pub fn new(fetcher: PageFetcher, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

pub fn search_url(base_url: &str, title: &str) -> String {
    format!("{}/search/?term={}", base_url, search_term(title))
}

#[async_trait]
impl Scraper for SteamScraper {
    fn source(&self) -> Source {
        Source::Steam
    }

    async fn scrape(&self, title: &str) -> Result<SourceData, ScrapeError> {
        let body = self.fetcher.get_html(&search_url(&self.base_url, title)).await?;
        parse_search_page(&body)
            .map(SourceData::Listing)
            .ok_or(ScrapeError::NotFound("Product not found"))
    }

    fn breaker(&self) -> Option<CircuitBreakerSnapshot> {
        Some(self.fetcher.breaker_snapshot())
    }

    fn report_timeout(&self) {
        self.fetcher.report_failure();
    }
}

pub fn parse_search_page(body: &str) -> Option<StoreListing> {
    let doc = Html::parse_document(body);
    let row = first_element(&doc, "a.search_result_row")?;

    let discount = first_text(row, "div.discount_pct")
        .map(|d| d.trim_start_matches('-').to_string())
        .filter(|d| !d.is_empty());

    Some(StoreListing {
        title: first_text(row, "span.title"),
        img: first_attr(row, "img", "src"),
        price: first_text_of_any(row, PRICE_SELECTORS),
        discount,
    })
}
