use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A finalized quotation record as written to `hadiths.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HadithRow {
    pub vol: u32,
    pub sec: u32,
    pub pages: Vec<u32>,
    pub id: String,
    pub title: String,
    pub ghael: String,
    pub sanad: String,
    pub content: String,
}

/// A record plus its translated title and content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedRow {
    #[serde(flatten)]
    pub hadith: HadithRow,
    pub title_fa: String,
    pub content_fa: String,
}

impl TranslatedRow {
    /// Source text moved into the translated fields, originals blanked.
    pub fn pass_through(hadith: &HadithRow) -> Self {
        TranslatedRow {
            hadith: HadithRow {
                title: String::new(),
                content: String::new(),
                ..hadith.clone()
            },
            title_fa: hadith.title.clone(),
            content_fa: hadith.content.clone(),
        }
    }
}

pub fn read_hadiths(path: &Path) -> Result<Vec<HadithRow>> {
    read_json(path)
}

/// Previously translated rows; a missing file means a fresh start.
pub fn read_partial(path: &Path) -> Result<Vec<TranslatedRow>> {
    match std::fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", path.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

pub fn write_json<T: Serialize>(path: &Path, rows: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(rows)?;
    write_atomic(path, &body)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Replace the whole file via a sibling temp file and rename.
pub fn write_atomic(path: &Path, body: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let tmp = tmp_path(path);
    std::fs::write(&tmp, body).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

// ── Tests ──
