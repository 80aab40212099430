// =============================================================================
// orchestrator.rs - THE FAN-OUT / FAN-IN
// =============================================================================
//
// Two levels of parallelism:
//
//   * across titles: up to `title_workers` games are in flight at once;
//   * across sources: every game fans out to every enabled scraper, each in
//     its own tokio task.
//
// A source that errors, times out or outright panics becomes a failed slot
// in that game's record. Nothing a single scraper does can sink the game, and
// nothing a single game does can sink the cycle.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::error::ScrapeError;
use crate::metrics::MetricsCollector;
use crate::models::{GameRecord, Source, SourceData};
use crate::scrapers::Scraper;

pub struct Orchestrator {
    scrapers: Vec<Arc<dyn Scraper>>,
    title_workers: usize,
    source_timeout: Duration,
    metrics: Arc<MetricsCollector>,
}

impl Orchestrator {
    pub fn new(
        scrapers: Vec<Arc<dyn Scraper>>,
        title_workers: usize,
        source_timeout: Duration,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        metrics.watch_scrapers(&scrapers);
        Self {
            scrapers,
            title_workers: title_workers.max(1),
            source_timeout,
            metrics,
        }
    }

    pub fn sources(&self) -> Vec<Source> {
        self.scrapers.iter().map(|s| s.source()).collect()
    }

    /// Scrape one title on every source at once and merge the outcomes.
    pub async fn scrape_title(&self, title: &str) -> GameRecord {
        let handles: Vec<(Source, tokio::task::JoinHandle<Result<SourceData, ScrapeError>>)> =
            self.scrapers
                .iter()
                .map(|scraper| {
                    let scraper = Arc::clone(scraper);
                    let title = title.to_string();
                    let budget = self.source_timeout;
                    let source = scraper.source();
                    let handle = tokio::spawn(async move {
                        match tokio::time::timeout(budget, scraper.scrape(&title)).await {
                            Ok(outcome) => outcome,
                            Err(_) => {
                                scraper.report_timeout();
                                Err(ScrapeError::Timeout(budget))
                            }
                        }
                    });
                    (source, handle)
                })
                .collect();

        let mut record = GameRecord::new(title);
        for (source, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => Err(ScrapeError::Aborted(join_err.to_string())),
            };

            match &outcome {
                Ok(_) => {
                    debug!(title = title, source = %source, "Source scraped");
                    self.metrics.record_source(source, true);
                }
                Err(e) => {
                    warn!(title = title, source = %source, error = %e, "Source failed");
                    self.metrics.record_source(source, false);
                }
            }
            record.apply(source, outcome);
        }

        self.metrics.increment_games();
        info!("🎮 {}", record);
        record
    }

    /// Scrape every title, `title_workers` at a time. Titles finish in any
    /// order, so a slow one never holds a free worker hostage; the output is
    /// put back in input order at the end.
    pub async fn scrape_all(&self, titles: &[String]) -> Vec<GameRecord> {
        info!(
            titles = titles.len(),
            workers = self.title_workers,
            sources = self.scrapers.len(),
            "Starting scraping..."
        );

        let mut finished: Vec<(usize, GameRecord)> =
            stream::iter(titles.iter().cloned().enumerate())
                .map(|(index, title)| async move { (index, self.scrape_title(&title).await) })
                .buffer_unordered(self.title_workers)
                .collect()
                .await;
        finished.sort_by_key(|(index, _)| *index);

        info!("Scraping finished!");
        finished.into_iter().map(|(_, record)| record).collect()
    }
}
