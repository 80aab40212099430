// =============================================================================
// scrapers/metacritic.rs - THE CRITICS' TABLE
// =============================================================================
//
// Product URL: {base}/game/{slug}/
//
// No search step: Metacritic's game pages live at a predictable slug, so we
// guess it from the title. A wrong guess is a 404, which we report as
// "Game not found" rather than an HTTP error.
//
// The metascore is a 0-100 integer. Unreleased or unreviewed games show
// "tbd", which we keep as a record with no score.
// =============================================================================

use async_trait::async_trait;
use scraper::Html;

use super::html::{first_element, text_of};
use super::{metacritic_slug, PageFetcher, Scraper};
use crate::circuit_breaker::CircuitBreakerSnapshot;
use crate::error::ScrapeError;
use crate::models::{ReviewScore, Source, SourceData};

const NOT_FOUND: &str = "Game not found";

const SCORE_SELECTORS: &[&str] = &[
    "div.c-productScoreInfo_scoreNumber span",
    "div.c-siteReviewScore span",
    r#"span[itemprop="ratingValue"]"#,
];

const TITLE_SELECTORS: &[&str] = &["div.c-productHero_title h1", "div.product_title h1", "h1"];

pub struct MetacriticScraper {
    fetcher: PageFetcher,
    base_url: String,
}

impl MetacriticScraper {
    pub fn new(fetcher: PageFetcher, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

pub fn game_url(base_url: &str, title: &str) -> String {
    format!("{}/game/{}/", base_url, metacritic_slug(title))
}

#[async_trait]
impl Scraper for MetacriticScraper {
    fn source(&self) -> Source {
        Source::Metacritic
    }

    async fn scrape(&self, title: &str) -> Result<SourceData, ScrapeError> {
        if metacritic_slug(title).is_empty() {
            return Err(ScrapeError::NotFound(NOT_FOUND));
        }

        let body = match self.fetcher.get_html(&game_url(&self.base_url, title)).await {
            Ok(body) => body,
            Err(ScrapeError::Status(404)) => return Err(ScrapeError::NotFound(NOT_FOUND)),
            Err(e) => return Err(e),
        };

        parse_game_page(&body)
            .map(SourceData::Review)
            .ok_or(ScrapeError::NotFound(NOT_FOUND))
    }

    fn breaker(&self) -> Option<CircuitBreakerSnapshot> {
        Some(self.fetcher.breaker_snapshot())
    }

    fn report_timeout(&self) {
        self.fetcher.report_failure();
    }
}

pub fn parse_game_page(body: &str) -> Option<ReviewScore> {
    let doc = Html::parse_document(body);

    let score = SCORE_SELECTORS
        .iter()
        .filter_map(|css| first_element(&doc, css))
        .filter_map(text_of)
        .find_map(|text| parse_score(&text));

    let title = TITLE_SELECTORS
        .iter()
        .filter_map(|css| first_element(&doc, css))
        .find_map(text_of);

    if score.is_none() && title.is_none() {
        return None;
    }
    Some(ReviewScore { title, score })
}

fn parse_score(text: &str) -> Option<u8> {
    text.trim().parse::<u8>().ok().filter(|s| *s <= 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitBreaker;
    use std::time::Duration;
    use wiremock::matchers::{any, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scraper_for(server: &MockServer) -> MetacriticScraper {
        MetacriticScraper::new(
            PageFetcher::new(
                reqwest::Client::new(),
                CircuitBreaker::new("metacritic", 1, Duration::from_secs(60), 1),
            ),
            &server.uri(),
        )
    }

    #[test]
    fn test_parse_scored_game() {
        let page = r#"
            <div class="c-productHero_title"><h1>Hades</h1></div>
            <div class="c-productScoreInfo_scoreNumber">
              <div class="c-siteReviewScore"><span>93</span></div>
            </div>
        "#;
        let review = parse_game_page(page).unwrap();
        assert_eq!(review.title.as_deref(), Some("Hades"));
        assert_eq!(review.score, Some(93));
    }

    #[test]
    fn test_parse_tbd_keeps_title_only() {
        let page = r#"<div class="c-productHero_title"><h1>Hollow Knight: Silksong</h1></div>
            <div class="c-siteReviewScore"><span>tbd</span></div>"#;
        let review = parse_game_page(page).unwrap();
        assert_eq!(review.title.as_deref(), Some("Hollow Knight: Silksong"));
        assert!(review.score.is_none());
    }

    #[test]
    fn test_parse_blank_page() {
        assert!(parse_game_page("<html><body></body></html>").is_none());
    }

    #[test]
    fn test_game_url_uses_slug() {
        assert_eq!(
            game_url("https://www.metacritic.com", "Elden Ring: Nightreign"),
            "https://www.metacritic.com/game/elden-ring-nightreign/"
        );
    }

    #[tokio::test]
    async fn test_scrape_scored_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/game/hades/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<div class="c-productHero_title"><h1>Hades</h1></div>
                   <div class="c-siteReviewScore"><span>93</span></div>"#,
            ))
            .mount(&server)
            .await;

        match scraper_for(&server).scrape("Hades").await.unwrap() {
            SourceData::Review(review) => assert_eq!(review.score, Some(93)),
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_slug_is_game_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let scraper = scraper_for(&server);
        for _ in 0..2 {
            let err = scraper.scrape("Not A Real Game").await.unwrap_err();
            assert_eq!(err.to_string(), "Game not found");
        }
        // 404s are the site working as intended.
        assert_eq!(scraper.breaker().unwrap().total_trips, 0);
    }

    #[tokio::test]
    async fn test_unsluggable_title_sends_no_request() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = scraper_for(&server).scrape(" ?!: ").await.unwrap_err();
        assert!(matches!(err, ScrapeError::NotFound("Game not found")));
    }
}
