// =============================================================================
// cycle.rs - ONE FULL LAP
// =============================================================================
//
// titles.csv -> scrape everything -> patch over failures with last lap's data
// -> results.json -> index.html. The scheduler calls this on a timer.
// =============================================================================

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::gallery::{self, StoreLinks};
use crate::models::GameRecord;
use crate::orchestrator::Orchestrator;
use crate::{store, titles};

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub games: usize,
    /// Games where at least one enabled source failed (after carry-forward).
    pub games_with_failures: usize,
    /// Source slots restored from the previous cycle.
    pub carried_forward: usize,
    pub elapsed: Duration,
}

pub async fn run_cycle(config: &Config, orchestrator: &Orchestrator) -> Result<CycleReport> {
    let started = Instant::now();

    let titles = titles::load_titles(&config.titles_csv_path)?;
    if titles.is_empty() {
        warn!(path = %config.titles_csv_path.display(), "No titles to scrape");
    }
    info!("Scraping {} games...", titles.len());

    let mut records = orchestrator.scrape_all(&titles).await;

    let mut carried_forward = 0;
    if config.carry_forward {
        // A broken results file shouldn't stop fresh data from landing.
        let previous = match store::load_results(&config.results_json_path) {
            Ok(previous) => previous,
            Err(e) => {
                warn!(error = %e, "Could not read previous results, nothing to carry forward");
                Vec::new()
            }
        };
        carried_forward = apply_carry_forward(&mut records, &previous);
    }

    store::save_results(&config.results_json_path, &records)?;
    gallery::write_gallery(
        &config.gallery_html_path,
        &records,
        &config.gallery_heading,
        &StoreLinks::from_config(config),
    )?;

    let elapsed = started.elapsed();
    info!("Scraping took {:.2} seconds", elapsed.as_secs_f64());

    Ok(CycleReport {
        games: records.len(),
        games_with_failures: records
            .iter()
            .filter(|r| !r.failed_sources().is_empty())
            .count(),
        carried_forward,
        elapsed,
    })
}

/// Patch each record with the previous record of the same title. Returns how
/// many source slots were restored.
fn apply_carry_forward(records: &mut [GameRecord], previous: &[GameRecord]) -> usize {
    let by_title: HashMap<&str, &GameRecord> =
        previous.iter().map(|r| (r.title.as_str(), r)).collect();

    let mut restored = 0;
    for record in records.iter_mut() {
        if let Some(old) = by_title.get(record.title.as_str()) {
            let before = record.failed_sources().len();
            record.carry_forward(old);
            restored += before - record.failed_sources().len();
        }
    }
    restored
}
