// =============================================================================
// config.rs - THE CONTROL PANEL
// =============================================================================
//
// Every tunable knob of the engine lives here: where the titles come from,
// where results and the gallery go, how often we scrape, how many titles we
// chew through at once, and which storefronts get the honour of our traffic.
//
// All values can be overridden via FRIKI_* environment variables (or a .env
// file). A value that doesn't parse falls back to its default, because a typo
// in an env var shouldn't take the whole gallery down.
// =============================================================================

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::models::Source;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // FILES
    // =========================================================================
    /// CSV with a header row; the first column is the game title.
    pub titles_csv_path: PathBuf,

    /// Where the merged records are persisted between cycles.
    pub results_json_path: PathBuf,

    /// The static gallery page.
    pub gallery_html_path: PathBuf,

    /// Big neon heading at the top of the gallery.
    pub gallery_heading: String,

    // =========================================================================
    // SCHEDULING
    // =========================================================================
    /// Pause between the end of one cycle and the start of the next.
    /// Default: 6 hours. Prices don't move that fast.
    pub scrape_interval: Duration,

    /// Run a single cycle and exit. Handy for cron.
    pub run_once: bool,

    /// How many titles are scraped at the same time. Each title then fans
    /// out to every enabled source in parallel.
    pub title_workers: usize,

    /// Carry last cycle's data forward for sources that failed this cycle.
    pub carry_forward: bool,

    // =========================================================================
    // HTTP
    // =========================================================================
    /// Per-request timeout on the shared reqwest client.
    pub http_timeout: Duration,

    /// Upper bound on a whole source scrape for one title.
    pub source_timeout: Duration,

    /// Storefronts serve captchas to obvious bots, so we dress up as Chrome.
    pub user_agent: String,

    pub accept_language: String,

    /// Which sources are scraped, in this order.
    pub sources: Vec<Source>,

    pub amazon_base_url: String,
    pub bestbuy_base_url: String,
    pub steam_base_url: String,
    pub metacritic_base_url: String,
    pub hltb_base_url: String,

    // =========================================================================
    // CIRCUIT BREAKER PARAMETERS
    // One breaker per source. A site that's blocking us gets left alone for a
    // while instead of being asked about every remaining title.
    // =========================================================================
    pub circuit_breaker_failure_threshold: u32,
    pub circuit_breaker_reset_timeout: Duration,
    pub circuit_breaker_success_threshold: u32,

    // =========================================================================
    // METRICS SERVER
    // =========================================================================
    /// Port for the JSON metrics endpoint. 0 disables it.
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from the environment, after reading `.env` if one
    /// is lying around.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. `from_env` is this plus the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Config {
            titles_csv_path: PathBuf::from(get("FRIKI_TITLES_CSV", "games.csv")),
            results_json_path: PathBuf::from(get("FRIKI_RESULTS_JSON", "results.json")),
            gallery_html_path: PathBuf::from(get("FRIKI_GALLERY_HTML", "index.html")),
            gallery_heading: get("FRIKI_GALLERY_HEADING", "Friki Games"),

            scrape_interval: Duration::from_secs(parse_or(
                "FRIKI_SCRAPE_INTERVAL_SECS",
                &get("FRIKI_SCRAPE_INTERVAL_SECS", "21600"),
                21_600,
            )),
            run_once: parse_bool("FRIKI_RUN_ONCE", &get("FRIKI_RUN_ONCE", "false"), false),
            title_workers: parse_or::<usize>(
                "FRIKI_TITLE_WORKERS",
                &get("FRIKI_TITLE_WORKERS", "8"),
                8,
            )
            .max(1),
            carry_forward: parse_bool(
                "FRIKI_CARRY_FORWARD",
                &get("FRIKI_CARRY_FORWARD", "true"),
                true,
            ),

            http_timeout: Duration::from_secs(parse_or(
                "FRIKI_HTTP_TIMEOUT_SECS",
                &get("FRIKI_HTTP_TIMEOUT_SECS", "20"),
                20,
            )),
            source_timeout: Duration::from_secs(parse_or(
                "FRIKI_SOURCE_TIMEOUT_SECS",
                &get("FRIKI_SOURCE_TIMEOUT_SECS", "45"),
                45,
            )),
            user_agent: get("FRIKI_USER_AGENT", DEFAULT_USER_AGENT),
            accept_language: get("FRIKI_ACCEPT_LANGUAGE", "en-US,en;q=0.9"),
            sources: parse_sources(&get(
                "FRIKI_SOURCES",
                "amazon,bestbuy,steam,metacritic,howlongtobeat",
            )),

            amazon_base_url: trim_base(get("FRIKI_AMAZON_BASE_URL", "https://www.amazon.com")),
            bestbuy_base_url: trim_base(get("FRIKI_BESTBUY_BASE_URL", "https://www.bestbuy.com")),
            steam_base_url: trim_base(get(
                "FRIKI_STEAM_BASE_URL",
                "https://store.steampowered.com",
            )),
            metacritic_base_url: trim_base(get(
                "FRIKI_METACRITIC_BASE_URL",
                "https://www.metacritic.com",
            )),
            hltb_base_url: trim_base(get("FRIKI_HLTB_BASE_URL", "https://howlongtobeat.com")),

            circuit_breaker_failure_threshold: parse_or(
                "FRIKI_CB_FAILURE_THRESHOLD",
                &get("FRIKI_CB_FAILURE_THRESHOLD", "5"),
                5,
            ),
            circuit_breaker_reset_timeout: Duration::from_secs(parse_or(
                "FRIKI_CB_RESET_TIMEOUT_SECS",
                &get("FRIKI_CB_RESET_TIMEOUT_SECS", "300"),
                300,
            )),
            circuit_breaker_success_threshold: parse_or(
                "FRIKI_CB_SUCCESS_THRESHOLD",
                &get("FRIKI_CB_SUCCESS_THRESHOLD", "1"),
                1,
            ),

            metrics_port: parse_or(
                "FRIKI_METRICS_PORT",
                &get("FRIKI_METRICS_PORT", "9090"),
                9090,
            ),
        }
    }

    pub fn source_enabled(&self, source: Source) -> bool {
        self.sources.contains(&source)
    }
}

fn parse_or<T: FromStr>(key: &str, raw: &str, default: T) -> T {
    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(key = key, value = raw, "Unparseable config value, using default");
            default
        }
    }
}

fn parse_bool(key: &str, raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(key = key, value = raw, "Unparseable config value, using default");
            default
        }
    }
}

/// Comma-separated source keys. Unknown names are skipped with a warning,
/// duplicates collapse to their first position.
fn parse_sources(raw: &str) -> Vec<Source> {
    let mut sources = Vec::new();
    for name in raw.split(',').filter(|s| !s.trim().is_empty()) {
        match name.parse::<Source>() {
            Ok(source) if !sources.contains(&source) => sources.push(source),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Ignoring entry in FRIKI_SOURCES"),
        }
    }
    sources
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
