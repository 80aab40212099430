// =============================================================================
// scheduler.rs - THE SLEEP LOOP
// =============================================================================
//
// Startup: make sure results.json exists and the gallery reflects it, so the
// page is never missing while the first (slow) cycle runs. Then: cycle, nap,
// cycle, nap, until someone hits Ctrl+C. A shutdown signal interrupts both the
// nap and a cycle in progress.
// =============================================================================

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::cycle;
use crate::gallery::{self, StoreLinks};
use crate::metrics::MetricsCollector;
use crate::orchestrator::Orchestrator;
use crate::store;

/// Render whatever results are already on disk.
pub fn render_existing(config: &Config) -> anyhow::Result<usize> {
    let records = store::load_or_init(&config.results_json_path)?;
    gallery::write_gallery(
        &config.gallery_html_path,
        &records,
        &config.gallery_heading,
        &StoreLinks::from_config(config),
    )?;
    Ok(records.len())
}

pub async fn run(
    config: Arc<Config>,
    orchestrator: Arc<Orchestrator>,
    metrics: Arc<MetricsCollector>,
    shutdown: &mut watch::Receiver<bool>,
) {
    match render_existing(&config) {
        Ok(count) => info!(games = count, "Gallery primed from saved results"),
        Err(e) => warn!(error = %e, "Could not render saved results"),
    }

    info!(
        interval_secs = config.scrape_interval.as_secs(),
        run_once = config.run_once,
        sources = ?orchestrator.sources(),
        "Scheduler online"
    );

    loop {
        let started = std::time::Instant::now();
        tokio::select! {
            outcome = cycle::run_cycle(&config, &orchestrator) => {
                match outcome {
                    Ok(report) => {
                        metrics.record_cycle(true, report.elapsed);
                        info!(
                            games = report.games,
                            games_with_failures = report.games_with_failures,
                            carried_forward = report.carried_forward,
                            "✅ Cycle complete"
                        );
                    }
                    Err(e) => {
                        metrics.record_cycle(false, started.elapsed());
                        error!(error = %format!("{:#}", e), "❌ Cycle failed");
                    }
                }
            }
            _ = shutdown.changed() => {
                warn!("Shutdown during a cycle, abandoning it");
                break;
            }
        }

        if config.run_once {
            info!("Single cycle requested, done");
            break;
        }

        info!("💤 Next cycle in {}s", config.scrape_interval.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(config.scrape_interval) => {}
            _ = shutdown.changed() => {
                info!("Scheduler received shutdown signal");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::models::{Source, SourceData};
    use crate::scrapers::Scraper;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    /// A storefront that never answers.
    struct Unresponsive;

    #[async_trait]
    impl Scraper for Unresponsive {
        fn source(&self) -> Source {
            Source::Amazon
        }

        async fn scrape(&self, _title: &str) -> Result<SourceData, ScrapeError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Err(ScrapeError::Blocked)
        }
    }

    fn config_in(dir: &std::path::Path, run_once: bool) -> Config {
        let mut map: HashMap<String, String> = HashMap::new();
        map.insert("FRIKI_TITLES_CSV".into(), dir.join("games.csv").display().to_string());
        map.insert("FRIKI_RESULTS_JSON".into(), dir.join("results.json").display().to_string());
        map.insert("FRIKI_GALLERY_HTML".into(), dir.join("index.html").display().to_string());
        map.insert("FRIKI_RUN_ONCE".into(), run_once.to_string());
        Config::from_lookup(|k| map.get(k).cloned())
    }

    fn no_scrapers(metrics: &Arc<MetricsCollector>) -> Arc<Orchestrator> {
        Arc::new(Orchestrator::new(
            Vec::new(),
            1,
            Duration::from_secs(1),
            metrics.clone(),
        ))
    }

    #[test]
    fn test_render_existing_initialises_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), true);
        assert_eq!(render_existing(&config).unwrap(), 0);
        assert!(config.results_json_path.exists());
        assert!(config.gallery_html_path.exists());
    }

    #[tokio::test]
    async fn test_run_once_runs_a_single_cycle() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("games.csv"), "title\nHades\n").unwrap();
        let config = Arc::new(config_in(dir.path(), true));
        let metrics = Arc::new(MetricsCollector::new());
        let (_tx, mut rx) = watch::channel(false);

        run(config.clone(), no_scrapers(&metrics), metrics.clone(), &mut rx).await;

        let snap = metrics.snapshot();
        assert_eq!(snap.cycles_completed, 1);
        assert_eq!(snap.games_scraped, 1);
        assert_eq!(store::load_results(&config.results_json_path).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_cycle_is_counted_and_shutdown_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        // No games.csv: every cycle fails.
        let config = Arc::new(config_in(dir.path(), false));
        let metrics = Arc::new(MetricsCollector::new());
        let (tx, mut rx) = watch::channel(false);

        let handle = {
            let metrics = metrics.clone();
            let orchestrator = no_scrapers(&metrics);
            tokio::spawn(async move { run(config, orchestrator, metrics, &mut rx).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();

        assert_eq!(metrics.snapshot().cycles_failed, 1);
    }

    #[tokio::test]
    async fn test_shutdown_abandons_a_cycle_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("games.csv"), "title\nHades\n").unwrap();
        let config = Arc::new(config_in(dir.path(), true));
        let metrics = Arc::new(MetricsCollector::new());
        let orchestrator = Arc::new(Orchestrator::new(
            vec![Arc::new(Unresponsive)],
            1,
            Duration::from_secs(600),
            metrics.clone(),
        ));
        let (tx, mut rx) = watch::channel(false);

        let handle = {
            let config = config.clone();
            let metrics = metrics.clone();
            tokio::spawn(async move { run(config, orchestrator, metrics, &mut rx).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler kept waiting on the cycle")
            .unwrap();

        let snap = metrics.snapshot();
        assert_eq!(snap.cycles_completed + snap.cycles_failed, 0);
        // Only the startup render ever touched the results file.
        assert!(store::load_results(&config.results_json_path).unwrap().is_empty());
    }
}
