// ═══════════════════════════════════════════════════════════════
// METRICS COLLECTOR - How many games, how many failures, how slow
// ═══════════════════════════════════════════════════════════════
//
// Atomic counters, one set per source, plus cycle totals. A tiny TCP
// server answers every connection with the current snapshot as JSON, so
// you can `curl localhost:9090` to see which storefront is sulking today.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use crate::circuit_breaker::CircuitBreakerSnapshot;
use crate::models::Source;
use crate::scrapers::Scraper;

#[derive(Default)]
struct SourceCounters {
    successes: AtomicU64,
    failures: AtomicU64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SourceSnapshot {
    pub successes: u64,
    pub failures: u64,
}

#[derive(Debug, Serialize, Clone)]
pub struct MetricsSnapshot {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub games_scraped: u64,
    pub last_cycle_duration_ms: u64,
    pub uptime_seconds: u64,
    pub sources: BTreeMap<&'static str, SourceSnapshot>,
    pub circuit_breakers: Vec<CircuitBreakerSnapshot>,
    pub status: String,
}

pub struct MetricsCollector {
    cycles_completed: AtomicU64,
    cycles_failed: AtomicU64,
    games_scraped: AtomicU64,
    last_cycle_duration_ms: AtomicU64,
    // Fixed set of keys, built once; only the atomics inside change.
    per_source: BTreeMap<Source, SourceCounters>,
    scrapers: RwLock<Vec<Arc<dyn Scraper>>>,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            cycles_completed: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            games_scraped: AtomicU64::new(0),
            last_cycle_duration_ms: AtomicU64::new(0),
            per_source: Source::ALL
                .iter()
                .map(|s| (*s, SourceCounters::default()))
                .collect(),
            scrapers: RwLock::new(Vec::new()),
            start_time: Instant::now(),
        }
    }

    /// Scrapers whose circuit breakers show up in the snapshot.
    pub fn watch_scrapers(&self, scrapers: &[Arc<dyn Scraper>]) {
        *self.scrapers.write() = scrapers.to_vec();
    }

    pub fn record_source(&self, source: Source, ok: bool) {
        if let Some(counters) = self.per_source.get(&source) {
            let counter = if ok { &counters.successes } else { &counters.failures };
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn increment_games(&self) {
        self.games_scraped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle(&self, ok: bool, elapsed: Duration) {
        let counter = if ok { &self.cycles_completed } else { &self.cycles_failed };
        counter.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_duration_ms
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let sources = self
            .per_source
            .iter()
            .map(|(source, c)| {
                (
                    source.key(),
                    SourceSnapshot {
                        successes: c.successes.load(Ordering::Relaxed),
                        failures: c.failures.load(Ordering::Relaxed),
                    },
                )
            })
            .collect();

        let circuit_breakers = self
            .scrapers
            .read()
            .iter()
            .filter_map(|s| s.breaker())
            .collect();

        MetricsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            games_scraped: self.games_scraped.load(Ordering::Relaxed),
            last_cycle_duration_ms: self.last_cycle_duration_ms.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            sources,
            circuit_breakers,
            status: "operational".to_string(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Serve the metrics snapshot as JSON on `port` until shutdown.
pub async fn run_metrics_server(
    metrics: Arc<MetricsCollector>,
    port: u16,
    shutdown: &mut watch::Receiver<bool>,
) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind metrics server on {}: {}", addr, e);
            return;
        }
    };

    info!("📊 Metrics server listening on http://{}", addr);
    serve_metrics(listener, metrics, shutdown).await;
}

/// Answer every connection on `listener` with the snapshot, then close it.
async fn serve_metrics(
    listener: TcpListener,
    metrics: Arc<MetricsCollector>,
    shutdown: &mut watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((mut stream, _addr)) => {
                        let json = serde_json::to_string_pretty(&metrics.snapshot())
                            .unwrap_or_else(|_| "{}".to_string());

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            json.len(),
                            json,
                        );

                        let _ = stream.write_all(response.as_bytes()).await;
                    }
                    Err(e) => {
                        error!("Metrics server accept error: {}", e);
                    }
                }
            }
            _ = shutdown.changed() => {
                info!("Metrics server: shutting down");
                break;
            }
        }
    }
}
