// ███████╗██████╗ ██╗██╗  ██╗██╗
// ██╔════╝██╔══██╗██║██║ ██╔╝██║
// █████╗  ██████╔╝██║█████╔╝ ██║
// ██╔══╝  ██╔══██╗██║██╔═██╗ ██║
// ██║     ██║  ██║██║██║  ██╗██║
// ╚═╝     ╚═╝  ╚═╝╚═╝╚═╝  ╚═╝╚═╝
//
//  G A M E S   E N G I N E
//
// Five storefronts, one CSV of games, a neon gallery page.
// Rust + Tokio + scraper + Circuit Breakers, all to find out whether
// Hollow Knight is on sale this week.

mod circuit_breaker;
mod config;
mod cycle;
mod error;
mod gallery;
mod metrics;
mod models;
mod orchestrator;
mod scheduler;
mod scrapers;
mod store;
mod titles;

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::metrics::MetricsCollector;
use crate::orchestrator::Orchestrator;

fn print_banner() {
    let banner = r#"

    ╔══════════════════════════════════════════════════════════════════╗
    ║                                                                  ║
    ║              ███████╗██████╗ ██╗██╗  ██╗██╗                      ║
    ║              ██╔════╝██╔══██╗██║██║ ██╔╝██║                      ║
    ║              █████╗  ██████╔╝██║█████╔╝ ██║                      ║
    ║              ██╔══╝  ██╔══██╗██║██╔═██╗ ██║                      ║
    ║              ██║     ██║  ██║██║██║  ██╗██║                      ║
    ║              ╚═╝     ╚═╝  ╚═╝╚═╝╚═╝  ╚═╝╚═╝                      ║
    ║                                                                  ║
    ║            🎮 VIDEO GAME PRICE & SCORE SCRAPER 🎮                ║
    ║                                                                  ║
    ║   Stores:   Amazon | Best Buy | Steam                            ║
    ║   Scores:   Metacritic | HowLongToBeat                           ║
    ║   Output:   results.json + a very neon index.html                ║
    ║   Resilience: Circuit Breakers on every storefront               ║
    ║                                                                  ║
    ║   "Insert coin to continue."                                     ║
    ║                                                                  ║
    ╚══════════════════════════════════════════════════════════════════╝

    "#;
    println!("{}", banner);
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(true)
        .init();

    print_banner();

    info!("🕹️ FRIKI GAMES ENGINE initializing...");

    let config = Arc::new(Config::from_env());
    info!(
        titles = %config.titles_csv_path.display(),
        results = %config.results_json_path.display(),
        gallery = %config.gallery_html_path.display(),
        "✅ Configuration loaded"
    );

    let metrics_collector = Arc::new(MetricsCollector::new());

    let scrapers = scrapers::build_scrapers(&config)?;
    if scrapers.is_empty() {
        warn!("No sources enabled, every record will be empty");
    }
    let orchestrator = Arc::new(Orchestrator::new(
        scrapers,
        config.title_workers,
        config.source_timeout,
        metrics_collector.clone(),
    ));
    info!(
        sources = ?orchestrator.sources(),
        title_workers = config.title_workers,
        "✅ Scrapers armed"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ═══════════════════════════════════════════
    // METRICS SERVER
    // ═══════════════════════════════════════════
    let metrics_handle = if config.metrics_port != 0 {
        let metrics_for_server = metrics_collector.clone();
        let port = config.metrics_port;
        let mut metrics_shutdown = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            info!("📊 Metrics server starting on port {}...", port);
            metrics::run_metrics_server(metrics_for_server, port, &mut metrics_shutdown).await;
            info!("📊 Metrics server: OFFLINE");
        }))
    } else {
        info!("📊 Metrics server disabled");
        None
    };

    // ═══════════════════════════════════════════
    // CTRL+C
    // ═══════════════════════════════════════════
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => warn!("🛑 Shutdown signal received!"),
            Err(err) => error!("❌ Signal listener error: {}", err),
        }
        let _ = signal_tx.send(true);
    });

    info!("═══════════════════════════════════════════════════════");
    info!("  🟢 FRIKI GAMES ENGINE ACTIVE");
    info!("  🎮 {} sources enabled", orchestrator.sources().len());
    info!("  ⚡ Press Ctrl+C for graceful shutdown");
    info!("═══════════════════════════════════════════════════════");

    let mut scheduler_shutdown = shutdown_rx.clone();
    scheduler::run(
        config.clone(),
        orchestrator,
        metrics_collector,
        &mut scheduler_shutdown,
    )
    .await;

    // Scheduler is done (run-once or Ctrl+C); take the metrics server down too.
    let _ = shutdown_tx.send(true);

    if let Some(handle) = metrics_handle {
        info!("⏳ Waiting for tasks to complete (timeout: 10s)...");
        let _ = tokio::time::timeout(Duration::from_secs(10), handle).await;
    }

    info!("💀 FRIKI GAMES ENGINE: OFFLINE");
    Ok(())
}
