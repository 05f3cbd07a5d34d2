//! Status file load/save (`meme_info`).
//!
//! The file is a JSON map of path to status, written atomically (temp
//! file + rename) so a crash mid-write never leaves a truncated map.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::queue::MemeStatus;

/// Load persisted statuses. A missing file is an empty map, not an error.
pub fn load_statuses(path: &Path) -> Result<HashMap<PathBuf, MemeStatus>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let raw: HashMap<String, MemeStatus> =
        serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    Ok(raw.into_iter().map(|(k, v)| (PathBuf::from(k), v)).collect())
}

/// Persist statuses atomically. Keys are sorted for stable output.
pub fn save_statuses(path: &Path, statuses: &HashMap<PathBuf, MemeStatus>) -> Result<()> {
    let raw: BTreeMap<String, MemeStatus> = statuses
        .iter()
        .map(|(k, v)| (k.to_string_lossy().into_owned(), *v))
        .collect();
    let mut buf = serde_json::to_string_pretty(&raw).context("serialize statuses")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp status file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("replace status file {}", path.display()))?;
    Ok(())
}
