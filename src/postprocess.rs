use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::store::{self, TranslatedRow};

/// Apply literal replacements in order; returns the count of substitutions.
fn expand(text: &mut String, replacements: &[(String, String)]) -> usize {
    let mut hits = 0;
    for (from, to) in replacements {
        if from.is_empty() {
            continue;
        }
        let n = text.matches(from.as_str()).count();
        if n > 0 {
            *text = text.replace(from.as_str(), to);
            hits += n;
        }
    }
    hits
}

pub fn apply(rows: &mut [TranslatedRow], replacements: &[(String, String)]) -> usize {
    let mut hits = 0;
    for row in rows.iter_mut() {
        for field in [
            &mut row.hadith.title,
            &mut row.hadith.ghael,
            &mut row.hadith.sanad,
            &mut row.hadith.content,
            &mut row.title_fa,
            &mut row.content_fa,
        ] {
            hits += expand(field, replacements);
        }
    }
    hits
}

/// Rewrite a translated file with abbreviations expanded.
pub fn apply_file(path: &Path, replacements: &[(String, String)]) -> Result<usize> {
    let mut rows = store::read_partial(path)?;
    let hits = apply(&mut rows, replacements);
    store::write_json(path, &rows)?;
    info!("Expanded {} abbreviations in {}", hits, path.display());
    Ok(hits)
}

// ── Tests ──
