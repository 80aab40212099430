// =============================================================================
// scrapers/bestbuy.rs - THE BIG BLUE BOX
// =============================================================================
//
// Search URL: {base}/site/searchpage.jsp?st={title}
//
// Best Buy renders its search results as <li class="sku-item"> cards. The
// heading class has changed at least once (sku-title vs sku-header), so we
// accept both.
// =============================================================================

use async_trait::async_trait;
use scraper::Html;

use super::html::{clean_price, first_attr, first_element, first_text_of_any};
use super::{search_term, PageFetcher, Scraper};
use crate::circuit_breaker::CircuitBreakerSnapshot;
use crate::error::ScrapeError;
use crate::models::{Source, SourceData, StoreListing};

const TITLE_SELECTORS: &[&str] = &["h4.sku-title a", "h4.sku-header a", "h4 a"];

const PRICE_SELECTORS: &[&str] = &[
    "div.priceView-customer-price span",
    "div.priceView-hero-price span",
];

pub struct BestBuyScraper {
    fetcher: PageFetcher,
    base_url: String,
}

impl BestBuyScraper {
    pub fn new(fetcher: PageFetcher, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

pub fn search_url(base_url: &str, title: &str) -> String {
    format!("{}/site/searchpage.jsp?st={}", base_url, search_term(title))
}

#[async_trait]
impl Scraper for BestBuyScraper {
    fn source(&self) -> Source {
        Source::BestBuy
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
    let item = first_element(&doc, "li.sku-item")?;

    Some(StoreListing {
        title: first_text_of_any(item, TITLE_SELECTORS),
        img: first_attr(item, "img.product-image", "src"),
        price: first_text_of_any(item, PRICE_SELECTORS).and_then(|p| clean_price(&p)),
        discount: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_first_sku() {
        let page = r#"
            <ol class="sku-item-list">
              <li class="sku-item" data-sku-id="6412345">
                <img class="product-image" src="https://pisces.bbystatic.com/hades.jpg" alt="Hades">
                <h4 class="sku-title"><a href="/site/hades/6412345.p">Hades - Nintendo Switch</a></h4>
                <div class="priceView-hero-price priceView-customer-price">
                  <span aria-hidden="true">$19.99</span>
                  <span class="sr-only">Your price for this item is $19.99</span>
                </div>
              </li>
              <li class="sku-item"><h4 class="sku-title"><a>Hades (PS5)</a></h4></li>
            </ol>
        "#;
        let listing = parse_search_page(page).unwrap();
        assert_eq!(listing.title.as_deref(), Some("Hades - Nintendo Switch"));
        assert_eq!(
            listing.img.as_deref(),
            Some("https://pisces.bbystatic.com/hades.jpg")
        );
        assert_eq!(listing.price.as_deref(), Some("19.99"));
    }

    #[test]
    fn test_parse_no_items() {
        assert!(parse_search_page("<ol class=\"sku-item-list\"></ol>").is_none());
    }

    #[test]
    fn test_search_url() {
        assert_eq!(
            search_url("https://www.bestbuy.com", "Super Mario Odyssey"),
            "https://www.bestbuy.com/site/searchpage.jsp?st=Super+Mario+Odyssey"
        );
    }
}
