// =============================================================================
// store.rs - RESULTS.JSON, THE ONE TRUE LEDGER
// =============================================================================
//
// The merged records are persisted as a pretty-printed JSON array. Writes go
// to a temp file next to the target and are renamed into place, so a crash
// mid-write never leaves the gallery reading half a file.
// =============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::models::GameRecord;

/// Write `contents` to `path` via a sibling temp file and a rename.
pub fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let tmp = temp_path(path);
    fs::write(&tmp, contents).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to move {} into place", path.display()))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

pub fn save_results(path: &Path, records: &[GameRecord]) -> Result<()> {
    let json = serde_json::to_vec_pretty(records).context("failed to serialize results")?;
    write_atomically(path, &json)?;
    info!(path = %path.display(), games = records.len(), "💾 Results saved");
    Ok(())
}

/// Load saved records. A missing file is an empty list, not an error.
pub fn load_results(path: &Path) -> Result<Vec<GameRecord>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No saved results yet");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    serde_json::from_slice(&bytes).with_context(|| format!("failed to parse {}", path.display()))
}

/// Like `load_results`, but leaves an empty `[]` behind when the file is
/// missing so the next reader finds something.
pub fn load_or_init(path: &Path) -> Result<Vec<GameRecord>> {
    if !path.exists() {
        save_results(path, &[])?;
        return Ok(Vec::new());
    }
    load_results(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::models::{Source, SourceData, StoreListing};

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");

        let mut record = GameRecord::new("Hades");
        record.apply(
            Source::Steam,
            Ok(SourceData::Listing(StoreListing {
                price: Some("$9.99".to_string()),
                ..Default::default()
            })),
        );
        record.apply(Source::Amazon, Err(ScrapeError::Blocked));

        save_results(&path, &[record.clone()]).unwrap();
        let loaded = load_results(&path).unwrap();
        assert_eq!(loaded, vec![record]);
        assert!(!dir.path().join("results.json.tmp").exists());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(load_results(&path).unwrap().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_load_or_init_creates_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("results.json");
        assert!(load_or_init(&path).unwrap().is_empty());
        let on_disk = fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk.trim(), "[]");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(load_results(&path).is_err());
    }
}
