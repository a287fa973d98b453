//! JSON persistence: pretty-printed files written atomically, plus the
//! last-update stamp consumed by the presentation layer.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Serialize `data` as pretty JSON into `path`, creating parent directories
/// and replacing any previous file. The payload goes through a temp file in
/// the target directory first, so a failed write never leaves a truncated
/// file that downstream readers would treat as valid.
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    let mut writer = BufWriter::new(&tmp);
    serde_json::to_writer_pretty(&mut writer, data)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    drop(writer);

    tmp.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Light post-write check used by the update orchestrator: the file must
/// hold a non-empty JSON array whose first record carries `expected_keys`.
/// Failures are warnings, not errors.
pub fn validate_series_file(path: &Path, expected_keys: &[&str]) -> bool {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Data file not found: {} ({})", path.display(), e);
            return false;
        }
    };
    let data: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Invalid JSON in {}: {}", path.display(), e);
            return false;
        }
    };

    let Some(entries) = data.as_array() else {
        warn!("Data file is not an array: {}", path.display());
        return false;
    };
    if entries.is_empty() {
        warn!("Data file is empty: {}", path.display());
        return false;
    }

    let missing: Vec<&str> = expected_keys
        .iter()
        .copied()
        .filter(|key| entries[0].get(key).is_none())
        .collect();
    if !missing.is_empty() {
        warn!(
            "Data file {} missing expected keys: {:?}",
            path.display(),
            missing
        );
        return false;
    }

    debug!("Validated {}: {} entries", path.display(), entries.len());
    true
}

const POLISH_MONTHS: [&str; 12] = [
    "stycznia",
    "lutego",
    "marca",
    "kwietnia",
    "maja",
    "czerwca",
    "lipca",
    "sierpnia",
    "września",
    "października",
    "listopada",
    "grudnia",
];

/// Timestamp document recording when the data files were last regenerated.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateStamp {
    pub timestamp: String,
    pub date: String,
    pub time: String,
    pub readable: String,
    pub iso: String,
}

impl UpdateStamp {
    pub fn now() -> Self {
        Self::from_datetime(Local::now())
    }

    fn from_datetime(now: DateTime<Local>) -> Self {
        let month_name = POLISH_MONTHS[now.month0() as usize];
        UpdateStamp {
            timestamp: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S").to_string(),
            readable: format!(
                "{} {} {} o {}",
                now.day(),
                month_name,
                now.year(),
                now.format("%H:%M:%S")
            ),
            iso: now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        }
    }
}

/// Write `last-update.json` into the data directory.
pub fn write_stamp(data_dir: &Path) -> Result<PathBuf> {
    let path = data_dir.join("last-update.json");
    let stamp = UpdateStamp::now();
    write_json(&path, &stamp)?;
    debug!("Timestamp: {}", stamp.timestamp);
    Ok(path)
}
