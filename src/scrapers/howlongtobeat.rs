// =============================================================================
// scrapers/howlongtobeat.rs - THE BACKLOG REALITY CHECK
// =============================================================================
//
// Search URL: {base}/?q={title}
//
// Each game card lists its times as alternating label/value "tidbits":
//
//   Main Story | 12½ Hours | Main + Extra | 21 Hours | Completionist | 32 Hours
//
// Multiplayer-heavy games swap "Main Story" for "Single-Player" (plus Co-Op
// and Vs. rows we don't care about). Values come as hours with a ½ glyph,
// minutes for tiny games, or "--" when nobody has submitted a time.
// =============================================================================

use async_trait::async_trait;
use scraper::Html;

use super::html::{first_element, first_text_of_any, text_of};
use super::{search_term, PageFetcher, Scraper};
use crate::circuit_breaker::CircuitBreakerSnapshot;
use crate::error::ScrapeError;
use crate::models::{CompletionTimes, Source, SourceData};

const CARD_SELECTORS: &[&str] = &[r#"li[class*="GameCard"]"#, "li.back_darkish"];

const TIDBIT_SELECTOR: &str = r#"div[class*="search_list_tidbit"]"#;

pub struct HowLongToBeatScraper {
    fetcher: PageFetcher,
    base_url: String,
}

impl HowLongToBeatScraper {
    pub fn new(fetcher: PageFetcher, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

pub fn search_url(base_url: &str, title: &str) -> String {
    format!("{}/?q={}", base_url, search_term(title))
}

#[async_trait]
impl Scraper for HowLongToBeatScraper {
    fn source(&self) -> Source {
        Source::HowLongToBeat
    }

    async fn scrape(&self, title: &str) -> Result<SourceData, ScrapeError> {
        let body = self.fetcher.get_html(&search_url(&self.base_url, title)).await?;
        parse_search_page(&body)
            .map(SourceData::Completion)
            .ok_or(ScrapeError::NotFound("Game not found"))
    }

    fn breaker(&self) -> Option<CircuitBreakerSnapshot> {
        Some(self.fetcher.breaker_snapshot())
    }

    fn report_timeout(&self) {
        self.fetcher.report_failure();
    }
}

/// Completion times from the first game card, or `None` when there is no
/// card or the card has no usable times.
pub fn parse_search_page(body: &str) -> Option<CompletionTimes> {
    let doc = Html::parse_document(body);
    let card = CARD_SELECTORS
        .iter()
        .find_map(|css| first_element(&doc, css))?;

    let selector = scraper::Selector::parse(TIDBIT_SELECTOR).ok()?;
    let tidbits: Vec<String> = card.select(&selector).filter_map(text_of).collect();

    let mut times = CompletionTimes::default();
    for pair in tidbits.chunks_exact(2) {
        let hours = parse_hours(&pair[1]);
        match pair[0].to_ascii_lowercase().as_str() {
            "main story" | "single-player" => times.main_story = times.main_story.or(hours),
            "main + extra" | "main + extras" => times.extras = times.extras.or(hours),
            "completionist" => times.completionist = times.completionist.or(hours),
            _ => {}
        }
    }

    if times.is_empty() {
        // The title line is still worth a debug hint when times are missing.
        let name = first_text_of_any(card, &["h2 a", "h3 a"]);
        tracing::debug!(card = ?name, "HowLongToBeat card without completion times");
        return None;
    }
    Some(times)
}

/// `12½ Hours` -> 12.5, `45 Mins` -> 0.75, `--` -> None.
pub fn parse_hours(raw: &str) -> Option<f32> {
    let text = raw.trim().to_ascii_lowercase();
    let numeric: String = text
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut value: f32 = if numeric.is_empty() {
        0.0
    } else {
        numeric.parse().ok()?
    };
    if text.contains('½') {
        value += 0.5;
    }
    if value <= 0.0 {
        return None;
    }
    if text.contains("min") {
        value /= 60.0;
    }
    Some((value * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"
        <ul>
          <li class="back_darkish GameCard_search_list__IuMbi">
            <div class="GameCard_search_list_details__x">
              <h2><a href="/game/62941">Hades</a></h2>
              <div class="GameCard_search_list_tidbit__0r_OP text_white shadow_text">Main Story</div>
              <div class="GameCard_search_list_tidbit__0r_OP center time_100">22½ Hours </div>
              <div class="GameCard_search_list_tidbit__0r_OP text_white shadow_text">Main + Extra</div>
              <div class="GameCard_search_list_tidbit__0r_OP center time_100">49 Hours </div>
              <div class="GameCard_search_list_tidbit__0r_OP text_white shadow_text">Completionist</div>
              <div class="GameCard_search_list_tidbit__0r_OP center time_100">95 Hours </div>
            </div>
          </li>
          <li class="back_darkish GameCard_search_list__IuMbi"><h2><a>Hades II</a></h2></li>
        </ul>
    "#;

    #[test]
    fn test_parse_first_card() {
        let times = parse_search_page(SEARCH_PAGE).unwrap();
        assert_eq!(times.main_story, Some(22.5));
        assert_eq!(times.extras, Some(49.0));
        assert_eq!(times.completionist, Some(95.0));
    }

    #[test]
    fn test_parse_single_player_label() {
        let page = r#"<li class="GameCard_x">
            <div class="search_list_tidbit">Single-Player</div><div class="search_list_tidbit">8 Hours</div>
            <div class="search_list_tidbit">Co-Op</div><div class="search_list_tidbit">--</div></li>"#;
        let times = parse_search_page(page).unwrap();
        assert_eq!(times.main_story, Some(8.0));
        assert!(times.extras.is_none());
    }

    #[test]
    fn test_parse_card_without_times() {
        let page = r#"<li class="GameCard_x"><h2><a>Unknown</a></h2></li>"#;
        assert!(parse_search_page(page).is_none());
        assert!(parse_search_page("<ul></ul>").is_none());
    }

    #[test]
    fn test_parse_hours_formats() {
        assert_eq!(parse_hours("12½ Hours"), Some(12.5));
        assert_eq!(parse_hours("½ Hours"), Some(0.5));
        assert_eq!(parse_hours("45 Mins"), Some(0.75));
        assert_eq!(parse_hours("1 Hour"), Some(1.0));
        assert_eq!(parse_hours("--"), None);
        assert_eq!(parse_hours(""), None);
    }
}
