// =============================================================================
// models.rs - THE SACRED DATA STRUCTURES OF THE GAME GALLERY
// =============================================================================
//
// One GameRecord per title, with one slot per source. A slot is either the
// data we managed to pry out of that site, or the reason we couldn't. A slot
// that is None was never attempted (the source is disabled).
//
// The JSON shape is deliberately boring: found sources are objects, failed
// sources are a plain error string. The gallery and any human poking at
// results.json both get to read it without a decoder ring.
// =============================================================================

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;

/// Every site we bother for game metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Prices and box art. The first port of call.
    Amazon,
    /// Prices and box art, in case Amazon hands us a captcha.
    BestBuy,
    /// PC prices, discounts, capsule images.
    Steam,
    /// The critics' verdict, 0 to 100.
    Metacritic,
    /// How many evenings the game is going to eat.
    HowLongToBeat,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::Amazon,
        Source::BestBuy,
        Source::Steam,
        Source::Metacritic,
        Source::HowLongToBeat,
    ];

    /// The key used in config, JSON and metrics.
    pub fn key(&self) -> &'static str {
        match self {
            Source::Amazon => "amazon",
            Source::BestBuy => "bestbuy",
            Source::Steam => "steam",
            Source::Metacritic => "metacritic",
            Source::HowLongToBeat => "howlongtobeat",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Amazon => write!(f, "Amazon"),
            Source::BestBuy => write!(f, "Best Buy"),
            Source::Steam => write!(f, "Steam"),
            Source::Metacritic => write!(f, "Metacritic"),
            Source::HowLongToBeat => write!(f, "HowLongToBeat"),
        }
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "amazon" => Ok(Source::Amazon),
            "bestbuy" | "best_buy" | "best-buy" => Ok(Source::BestBuy),
            "steam" => Ok(Source::Steam),
            "metacritic" => Ok(Source::Metacritic),
            "howlongtobeat" | "hltb" => Ok(Source::HowLongToBeat),
            other => Err(format!("unknown source '{}'", other)),
        }
    }
}

/// What a storefront search gives us: the first sensible product hit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreListing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    /// Display price as the store shows it, minus any leading `$`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Percentage off, e.g. `50%`. Absent when the game is full price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReviewScore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

/// Completion times in hours.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompletionTimes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_story: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completionist: Option<f32>,
}

impl CompletionTimes {
    pub fn is_empty(&self) -> bool {
        self.main_story.is_none() && self.extras.is_none() && self.completionist.is_none()
    }
}

/// The payload a scraper hands back. Which variant is legal depends on the
/// source; `GameRecord::apply` enforces that.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceData {
    Listing(StoreListing),
    Review(ReviewScore),
    Completion(CompletionTimes),
}

impl SourceData {
    fn kind(&self) -> &'static str {
        match self {
            SourceData::Listing(_) => "listing",
            SourceData::Review(_) => "review",
            SourceData::Completion(_) => "completion",
        }
    }
}

/// A source slot: either the data, or the error string explaining its absence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SourceResult<T> {
    Found(T),
    Failed(String),
}

impl<T> SourceResult<T> {
    pub fn found(&self) -> Option<&T> {
        match self {
            SourceResult::Found(value) => Some(value),
            SourceResult::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SourceResult::Failed(_))
    }
}

/// The merged, persisted view of one game across every source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecord {
    pub title: String,
    pub scraped_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amazon: Option<SourceResult<StoreListing>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bestbuy: Option<SourceResult<StoreListing>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam: Option<SourceResult<StoreListing>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metacritic: Option<SourceResult<ReviewScore>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub howlongtobeat: Option<SourceResult<CompletionTimes>>,
}

impl GameRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            scraped_at: Utc::now(),
            amazon: None,
            bestbuy: None,
            steam: None,
            metacritic: None,
            howlongtobeat: None,
        }
    }

    /// Merge one source's outcome into the record. Errors are stored as their
    /// display text; a payload of the wrong kind counts as an error too.
    pub fn apply(&mut self, source: Source, outcome: Result<SourceData, ScrapeError>) {
        let outcome = match outcome {
            Ok(data) => data,
            Err(e) => {
                self.fail(source, e.to_string());
                return;
            }
        };

        match (source, outcome) {
            (Source::Amazon, SourceData::Listing(l)) => self.amazon = Some(SourceResult::Found(l)),
            (Source::BestBuy, SourceData::Listing(l)) => self.bestbuy = Some(SourceResult::Found(l)),
            (Source::Steam, SourceData::Listing(l)) => self.steam = Some(SourceResult::Found(l)),
            (Source::Metacritic, SourceData::Review(r)) => {
                self.metacritic = Some(SourceResult::Found(r))
            }
            (Source::HowLongToBeat, SourceData::Completion(c)) => {
                self.howlongtobeat = Some(SourceResult::Found(c))
            }
            (source, other) => {
                let err = ScrapeError::PayloadMismatch {
                    site: source.key(),
                    payload: other.kind(),
                };
                self.fail(source, err.to_string());
            }
        }
    }

    fn fail(&mut self, source: Source, message: String) {
        match source {
            Source::Amazon => self.amazon = Some(SourceResult::Failed(message)),
            Source::BestBuy => self.bestbuy = Some(SourceResult::Failed(message)),
            Source::Steam => self.steam = Some(SourceResult::Failed(message)),
            Source::Metacritic => self.metacritic = Some(SourceResult::Failed(message)),
            Source::HowLongToBeat => self.howlongtobeat = Some(SourceResult::Failed(message)),
        }
    }

    /// Keep last cycle's data for any source that failed this time around.
    /// A captcha page on Amazon shouldn't wipe a perfectly good price.
    pub fn carry_forward(&mut self, previous: &GameRecord) {
        carry(&mut self.amazon, &previous.amazon);
        carry(&mut self.bestbuy, &previous.bestbuy);
        carry(&mut self.steam, &previous.steam);
        carry(&mut self.metacritic, &previous.metacritic);
        carry(&mut self.howlongtobeat, &previous.howlongtobeat);
    }

    /// The image to show: Amazon, then Best Buy, then Steam.
    pub fn best_image(&self) -> Option<&str> {
        [&self.amazon, &self.bestbuy, &self.steam]
            .into_iter()
            .filter_map(|slot| slot.as_ref().and_then(SourceResult::found))
            .find_map(|listing| listing.img.as_deref())
    }

    pub fn failed_sources(&self) -> Vec<Source> {
        let mut failed = Vec::new();
        if self.amazon.as_ref().is_some_and(SourceResult::is_failed) {
            failed.push(Source::Amazon);
        }
        if self.bestbuy.as_ref().is_some_and(SourceResult::is_failed) {
            failed.push(Source::BestBuy);
        }
        if self.steam.as_ref().is_some_and(SourceResult::is_failed) {
            failed.push(Source::Steam);
        }
        if self.metacritic.as_ref().is_some_and(SourceResult::is_failed) {
            failed.push(Source::Metacritic);
        }
        if self.howlongtobeat.as_ref().is_some_and(SourceResult::is_failed) {
            failed.push(Source::HowLongToBeat);
        }
        failed
    }
}

fn carry<T: Clone>(current: &mut Option<SourceResult<T>>, previous: &Option<SourceResult<T>>) {
    let current_failed = current.as_ref().is_some_and(SourceResult::is_failed);
    if let (true, Some(SourceResult::Found(old))) = (current_failed, previous) {
        *current = Some(SourceResult::Found(old.clone()));
    }
}

impl fmt::Display for GameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failed_sources();
        if failed.is_empty() {
            write!(f, "{} (all sources ok)", self.title)
        } else {
            let names: Vec<&str> = failed.iter().map(Source::key).collect();
            write!(f, "{} (failed: {})", self.title, names.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(img: &str) -> StoreListing {
        StoreListing {
            title: Some("Hades".to_string()),
            img: Some(img.to_string()),
            price: Some("24.99".to_string()),
            discount: None,
        }
    }

    #[test]
    fn test_source_parses_aliases() {
        assert_eq!("HLTB".parse::<Source>().unwrap(), Source::HowLongToBeat);
        assert_eq!(" best_buy ".parse::<Source>().unwrap(), Source::BestBuy);
        assert!("gamestop".parse::<Source>().is_err());
    }

    #[test]
    fn test_apply_stores_found_and_failed() {
        let mut record = GameRecord::new("Hades");
        record.apply(Source::Amazon, Ok(SourceData::Listing(listing("a.jpg"))));
        record.apply(Source::Steam, Err(ScrapeError::NotFound("Product not found")));

        assert_eq!(record.amazon, Some(SourceResult::Found(listing("a.jpg"))));
        assert_eq!(
            record.steam,
            Some(SourceResult::Failed("Product not found".to_string()))
        );
        assert!(record.bestbuy.is_none());
        assert_eq!(record.failed_sources(), vec![Source::Steam]);
    }

    #[test]
    fn test_apply_rejects_mismatched_payload() {
        let mut record = GameRecord::new("Hades");
        record.apply(
            Source::Metacritic,
            Ok(SourceData::Listing(StoreListing::default())),
        );
        assert_eq!(
            record.metacritic,
            Some(SourceResult::Failed(
                "unexpected listing payload for metacritic".to_string()
            ))
        );
    }

    #[test]
    fn test_best_image_prefers_amazon_then_bestbuy() {
        let mut record = GameRecord::new("Hades");
        record.apply(Source::Steam, Ok(SourceData::Listing(listing("steam.jpg"))));
        assert_eq!(record.best_image(), Some("steam.jpg"));

        record.apply(Source::BestBuy, Ok(SourceData::Listing(listing("bb.jpg"))));
        assert_eq!(record.best_image(), Some("bb.jpg"));

        record.apply(Source::Amazon, Err(ScrapeError::Status(503)));
        assert_eq!(record.best_image(), Some("bb.jpg"));
    }

    #[test]
    fn test_carry_forward_only_replaces_failures() {
        let mut previous = GameRecord::new("Hades");
        previous.apply(Source::Amazon, Ok(SourceData::Listing(listing("old.jpg"))));
        previous.apply(Source::Steam, Ok(SourceData::Listing(listing("old-steam.jpg"))));

        let mut current = GameRecord::new("Hades");
        current.apply(Source::Amazon, Err(ScrapeError::Status(503)));
        current.apply(Source::Steam, Ok(SourceData::Listing(listing("new-steam.jpg"))));
        current.carry_forward(&previous);

        assert_eq!(current.amazon, Some(SourceResult::Found(listing("old.jpg"))));
        assert_eq!(
            current.steam,
            Some(SourceResult::Found(listing("new-steam.jpg")))
        );
    }

    #[test]
    fn test_json_shape_uses_objects_and_error_strings() {
        let mut record = GameRecord::new("Hades");
        record.apply(
            Source::Metacritic,
            Ok(SourceData::Review(ReviewScore {
                title: None,
                score: Some(93),
            })),
        );
        record.apply(Source::Amazon, Err(ScrapeError::NotFound("Product not found")));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["metacritic"]["score"], 93);
        assert_eq!(value["amazon"], "Product not found");
        assert!(value.get("steam").is_none());

        let back: GameRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
