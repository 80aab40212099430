// =============================================================================
// titles.rs - THE WISHLIST
// =============================================================================
//
// games.csv: a header row, then one game per row with the title in the first
// column. Anything after the first column is ignored, so the spreadsheet can
// carry notes, platforms, whatever.
// =============================================================================

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

pub fn load_titles(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open titles file {}", path.display()))?;
    let titles = read_titles(file)
        .with_context(|| format!("failed to read titles from {}", path.display()))?;
    info!(path = %path.display(), count = titles.len(), "Loaded {} game titles", titles.len());
    Ok(titles)
}

/// First column of every record after the header, trimmed, without blanks
/// or repeats, in file order.
pub fn read_titles<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut seen = HashSet::new();
    let mut titles = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let Some(title) = row.get(0).map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        if seen.insert(title.to_string()) {
            titles.push(title.to_string());
        } else {
            debug!(title = title, "Skipping duplicate title");
        }
    }
    Ok(titles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_first_column_after_header() {
        let csv = "title,platform\nHades,Switch\n\"Zelda: Tears of the Kingdom\",Switch\nCeleste\n";
        let titles = read_titles(csv.as_bytes()).unwrap();
        assert_eq!(titles, vec!["Hades", "Zelda: Tears of the Kingdom", "Celeste"]);
    }

    #[test]
    fn test_skips_blanks_and_duplicates() {
        let csv = "name\n  Hades  \n,orphan note\nHades\n\nHollow Knight\n";
        let titles = read_titles(csv.as_bytes()).unwrap();
        assert_eq!(titles, vec!["Hades", "Hollow Knight"]);
    }

    #[test]
    fn test_header_only() {
        assert!(read_titles("title\n".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_titles(&dir.path().join("games.csv")).is_err());
    }
}
