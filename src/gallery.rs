// =============================================================================
// gallery.rs - THE NEON SHOWROOM
// =============================================================================
//
// Renders the merged records into one static HTML page: a grid of cards with
// box art, a metascore star, price links to each store's search page, and
// HowLongToBeat times. Everything that came from a scraped page is escaped
// before it goes anywhere near the markup.
// =============================================================================

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::Config;
use crate::models::{CompletionTimes, GameRecord, SourceResult, StoreListing};
use crate::scrapers::{amazon, bestbuy, steam};
use crate::store::write_atomically;

const STYLE: &str = r#"
        @import url('https://fonts.googleapis.com/css2?family=Press+Start+2P&display=swap');

        body {
            font-family: 'Press Start 2P', cursive;
            margin: 0;
            padding: 20px;
            background: radial-gradient(circle at center, #1a1a2e, #16213e, #0f3460);
            color: #fff;
            overflow-x: hidden;
        }

        h1 {
            text-align: center;
            color: #ff2e63;
            font-size: 3em;
            text-shadow: 0 0 8px #ff2e63, 0 0 16px #ff2e63;
            margin: 20px 0;
        }

        .grid-container {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(250px, 1fr));
            max-width: 1200px;
            margin: 0 auto;
            gap: 20px;
            padding: 20px;
        }

        .grid-item {
            position: relative;
            background-color: #0f3460;
            border: 2px solid #e94560;
            border-radius: 12px;
            box-shadow: 0 4px 12px rgba(233, 69, 96, 0.4);
            transition: transform 0.3s ease, box-shadow 0.3s ease;
            padding: 15px;
            display: flex;
            flex-direction: column;
            justify-content: center;
            align-items: center;
            text-align: center;
        }

        .grid-item:hover {
            transform: scale(1.05);
            box-shadow: 0 6px 20px rgba(233, 69, 96, 0.6);
        }

        .grid-item img {
            max-width: 80%;
            height: auto;
            display: block;
            border-radius: 8px;
            margin-top: 10px;
            box-shadow: 0 4px 8px rgba(0, 0, 0, 0.3);
        }

        .grid-item h2 {
            font-size: 1.2em;
            margin: 15px 0;
            color: #ffde7d;
            text-shadow: 0 0 6px #ffde7d;
        }

        .prices, .hltb {
            width: 100%;
            display: flex;
            flex-direction: column;
            gap: 10px;
            align-items: start;
        }

        .prices { margin-top: 15px; }
        .hltb { margin-top: 30px; color: #ffde7d; }

        .prices a, .hltb p {
            color: #ffde7d;
            text-decoration: none;
            font-weight: bold;
            font-size: .7em;
            margin: 0;
            transition: color 0.3s ease;
        }

        .prices a:hover, .prices a:focus, .hltb p:hover {
            color: #ff2e63;
            text-shadow: 0 0 8px #ff2e63;
        }

        .star-score {
            position: absolute;
            top: 2px;
            right: 2px;
            width: 60px;
            height: 60px;
            display: flex;
            align-items: center;
            justify-content: center;
            color: #333;
            font-weight: bold;
            font-size: 14px;
        }

        .star-score span {
            position: relative;
            z-index: 10;
        }

        svg.star {
            position: absolute;
            z-index: 1;
            fill: #ffd700;
            width: 60px;
            height: 60px;
        }

        footer {
            text-align: center;
            font-size: .6em;
            color: #8892b0;
            margin-top: 30px;
        }
"#;

const STAR_POINTS: &str = "12,2 15,9 22,9 16,14 18,21 12,17 6,21 8,14 2,9 9,9";

/// Base URLs for the "go buy it" links on each card.
#[derive(Debug, Clone)]
pub struct StoreLinks {
    pub amazon: String,
    pub bestbuy: String,
    pub steam: String,
}

impl StoreLinks {
    pub fn from_config(config: &Config) -> Self {
        Self {
            amazon: config.amazon_base_url.clone(),
            bestbuy: config.bestbuy_base_url.clone(),
            steam: config.steam_base_url.clone(),
        }
    }
}

impl Default for StoreLinks {
    fn default() -> Self {
        Self {
            amazon: "https://www.amazon.com".to_string(),
            bestbuy: "https://www.bestbuy.com".to_string(),
            steam: "https://store.steampowered.com".to_string(),
        }
    }
}

/// Escape text for use in element content and double-quoted attributes.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Only http(s) image URLs make it into a src attribute.
fn safe_url(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    (lower.starts_with("https://") || lower.starts_with("http://") || lower.starts_with("//"))
        .then_some(trimmed)
}

pub fn render(
    records: &[GameRecord],
    heading: &str,
    links: &StoreLinks,
    generated_at: DateTime<Utc>,
) -> String {
    let mut html = String::with_capacity(8 * 1024 + records.len() * 1024);

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta http-equiv="X-UA-Compatible" content="IE=edge">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{heading}</title>
    <style>{STYLE}    </style>
</head>
<body>
    <h1>{heading}</h1>
    <div class="grid-container">
"#,
        heading = escape(heading),
    );

    for record in records {
        render_card(&mut html, record, links);
    }

    let _ = write!(
        html,
        r#"    </div>
    <footer>Last updated {}</footer>
</body>
</html>
"#,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    html
}

fn render_card(html: &mut String, record: &GameRecord, links: &StoreLinks) {
    let _ = writeln!(html, r#"        <div class="grid-item">"#);
    let _ = writeln!(html, "            <h2>{}</h2>", escape(&record.title));

    match record.best_image().and_then(safe_url) {
        Some(src) => {
            let _ = writeln!(
                html,
                r#"            <img src="{}" alt="{}">"#,
                escape(src),
                escape(&record.title)
            );
        }
        None => {
            let _ = writeln!(html, "            <p>Image not available</p>");
        }
    }

    if let Some(score) = record
        .metacritic
        .as_ref()
        .and_then(SourceResult::found)
        .and_then(|m| m.score)
    {
        let _ = writeln!(
            html,
            r##"            <div class="star-score"><svg class="star" viewBox="0 0 24 24" xmlns="http://www.w3.org/2000/svg"><polygon points="{}" fill="#FFD700"></polygon></svg><span>{}</span></div>"##,
            STAR_POINTS, score
        );
    }

    let _ = writeln!(html, r#"            <div class="prices">"#);
    if let Some(price) = listing_price(&record.amazon) {
        price_link(
            html,
            &amazon::search_url(&links.amazon, &record.title),
            &format!("Amazon: ${}", price),
        );
    }
    if let Some(price) = listing_price(&record.bestbuy) {
        price_link(
            html,
            &bestbuy::search_url(&links.bestbuy, &record.title),
            &format!("Best Buy: ${}", price),
        );
    }
    if let Some(listing) = record.steam.as_ref().and_then(SourceResult::found) {
        if let Some(price) = &listing.price {
            let mut label = format!("Steam: {}", price);
            if let Some(discount) = &listing.discount {
                let _ = write!(label, " ({} off)", discount);
            }
            price_link(html, &steam::search_url(&links.steam, &record.title), &label);
        }
    }
    let _ = writeln!(html, "            </div>");

    let _ = writeln!(html, r#"            <div class="hltb">"#);
    if let Some(times) = record.howlongtobeat.as_ref().and_then(SourceResult::found) {
        render_times(html, times);
    }
    let _ = writeln!(html, "            </div>");

    let _ = writeln!(html, "        </div>");
}

fn listing_price(slot: &Option<SourceResult<StoreListing>>) -> Option<&str> {
    slot.as_ref()
        .and_then(SourceResult::found)
        .and_then(|l| l.price.as_deref())
}

fn price_link(html: &mut String, href: &str, label: &str) {
    let _ = writeln!(
        html,
        r#"                <a href="{}">{}</a>"#,
        escape(href),
        escape(label)
    );
}

fn render_times(html: &mut String, times: &CompletionTimes) {
    // Without a main story time the rest is usually noise.
    let Some(main) = times.main_story else {
        return;
    };
    let _ = writeln!(html, "                <p>Main Story: {}h</p>", main);
    let _ = writeln!(html, "                <p>Main + Extra: {}</p>", hours(times.extras));
    let _ = writeln!(
        html,
        "                <p>Completionist: {}</p>",
        hours(times.completionist)
    );
}

fn hours(value: Option<f32>) -> String {
    value.map_or_else(|| "--".to_string(), |v| format!("{}h", v))
}

/// Render and write the gallery page.
pub fn write_gallery(
    path: &Path,
    records: &[GameRecord],
    heading: &str,
    links: &StoreLinks,
) -> Result<()> {
    let html = render(records, heading, links, Utc::now());
    write_atomically(path, html.as_bytes())?;
    info!(path = %path.display(), games = records.len(), "🖼️  Gallery rendered");
    Ok(())
}
