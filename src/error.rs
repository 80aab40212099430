// =============================================================================
// error.rs - EVERY WAY A STOREFRONT CAN LET US DOWN
// =============================================================================
//
// One enum for everything a single source can do wrong while we're asking it
// about a single game. The Display text is what ends up in results.json for a
// failed source, so keep the messages short and human.
// =============================================================================

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Connection refused, TLS sadness, body read failures, client timeouts.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The site answered, just not with a 2xx.
    #[error("HTTP {0}")]
    Status(u16),

    /// The page loaded but the thing we wanted was not on it.
    #[error("{0}")]
    NotFound(&'static str),

    /// The site served a captcha or bot wall instead of the page.
    #[error("blocked by bot detection")]
    Blocked,

    /// The source's circuit breaker is open; no request was made.
    #[error("circuit breaker open")]
    CircuitOpen,

    /// The whole source took longer than the per-source budget.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The scraper task panicked or was cancelled.
    #[error("scraper task aborted: {0}")]
    Aborted(String),

    /// A scraper returned a payload kind that doesn't belong to its source.
    #[error("unexpected {payload} payload for {site}")]
    PayloadMismatch {
        site: &'static str,
        payload: &'static str,
    },
}
