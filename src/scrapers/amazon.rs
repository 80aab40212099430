// =============================================================================
// scrapers/amazon.rs - THE EVERYTHING STORE
// =============================================================================
//
// Search URL: {base}/s?k={title}&i=videogames
//
// The first few result slots are usually sponsored banners and carousels,
// so the product we want sits at data-index="2". If Amazon reshuffles that,
// we fall back to the first real search-result card.
//
// Amazon hands suspected bots a 200 OK captcha page. We treat that as a
// failure so the circuit breaker gets to do its job.
// =============================================================================

use async_trait::async_trait;
use scraper::Html;

use super::html::{clean_price, first_attr, first_element, first_text_of_any};
use super::{search_term, PageFetcher, Scraper};
use crate::circuit_breaker::CircuitBreakerSnapshot;
use crate::error::ScrapeError;
use crate::models::{Source, SourceData, StoreListing};

const PRODUCT_SELECTORS: &[&str] = &[
    r#"div[data-index="2"]"#,
    r#"div[data-component-type="s-search-result"]"#,
];

const TITLE_SELECTORS: &[&str] = &[
    "span.a-size-medium.a-color-base.a-text-normal",
    "h2 span",
];

pub struct AmazonScraper {
    fetcher: PageFetcher,
    base_url: String,
}

impl AmazonScraper {
    pub fn new(fetcher: PageFetcher, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

pub fn search_url(base_url: &str, title: &str) -> String {
    format!("{}/s?k={}&i=videogames", base_url, search_term(title))
}

#[async_trait]
impl Scraper for AmazonScraper {
    fn source(&self) -> Source {
        Source::Amazon
    }

    async fn scrape(&self, title: &str) -> Result<SourceData, ScrapeError> {
        let body = self.fetcher.get_html(&search_url(&self.base_url, title)).await?;

        if is_captcha_page(&body) {
            self.fetcher.report_failure();
            return Err(ScrapeError::Blocked);
        }

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

fn is_captcha_page(body: &str) -> bool {
    body.contains("/errors/validateCaptcha") || body.contains("api-services-support@amazon.com")
}

pub fn parse_search_page(body: &str) -> Option<StoreListing> {
    let doc = Html::parse_document(body);
    let product = PRODUCT_SELECTORS
        .iter()
        .find_map(|css| first_element(&doc, css))?;

    Some(StoreListing {
        title: first_text_of_any(product, TITLE_SELECTORS),
        img: first_attr(product, "img.s-image", "src"),
        price: first_text_of_any(product, &["span.a-price span.a-offscreen"])
            .and_then(|p| clean_price(&p)),
        discount: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitBreaker;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESULTS_PAGE: &str = r#"
        <html><body>
          <div data-index="0"><span>Sponsored nonsense</span></div>
          <div data-index="1"></div>
          <div data-index="2" data-component-type="s-search-result">
            <img class="s-image" src="https://m.media-amazon.com/images/I/hades.jpg">
            <h2><span class="a-size-medium a-color-base a-text-normal">Hades - Nintendo Switch</span></h2>
            <span class="a-price"><span class="a-offscreen">$24.99</span><span aria-hidden="true">$24<sup>99</sup></span></span>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_picks_third_slot() {
        let listing = parse_search_page(RESULTS_PAGE).unwrap();
        assert_eq!(listing.title.as_deref(), Some("Hades - Nintendo Switch"));
        assert_eq!(
            listing.img.as_deref(),
            Some("https://m.media-amazon.com/images/I/hades.jpg")
        );
        assert_eq!(listing.price.as_deref(), Some("24.99"));
    }

    #[test]
    fn test_parse_falls_back_to_first_result_card() {
        let page = r#"<div data-component-type="s-search-result">
            <h2><span>Celeste</span></h2></div>"#;
        let listing = parse_search_page(page).unwrap();
        assert_eq!(listing.title.as_deref(), Some("Celeste"));
        assert!(listing.price.is_none());
    }

    #[test]
    fn test_parse_empty_page() {
        assert!(parse_search_page("<html><body>No results</body></html>").is_none());
    }

    #[tokio::test]
    async fn test_scrape_against_mock_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/s"))
            .and(query_param("k", "Hades"))
            .and(query_param("i", "videogames"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
            .mount(&server)
            .await;

        let scraper = AmazonScraper::new(
            PageFetcher::new(
                reqwest::Client::new(),
                CircuitBreaker::new("amazon", 3, Duration::from_secs(60), 1),
            ),
            &server.uri(),
        );

        match scraper.scrape("Hades").await.unwrap() {
            SourceData::Listing(listing) => assert_eq!(listing.price.as_deref(), Some("24.99")),
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_captcha_page_is_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<form action="/errors/validateCaptcha"></form>"#),
            )
            .mount(&server)
            .await;

        let scraper = AmazonScraper::new(
            PageFetcher::new(
                reqwest::Client::new(),
                CircuitBreaker::new("amazon", 1, Duration::from_secs(60), 1),
            ),
            &server.uri(),
        );

        assert!(matches!(scraper.scrape("Hades").await, Err(ScrapeError::Blocked)));
        assert!(matches!(scraper.scrape("Hades").await, Err(ScrapeError::CircuitOpen)));
    }
}
