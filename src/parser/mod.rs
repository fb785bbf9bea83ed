pub mod fallback;
pub mod fragments;
pub mod index;
pub mod merge;

use std::path::Path;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::store::{self, HadithRow};
use fallback::FallbackExtraction;
use fragments::{Extraction, Markup};
use index::SourcePage;

pub struct ParseSummary {
    pub files: usize,
    pub skipped: usize,
    pub records: usize,
    pub used_fallback: bool,
}

impl ParseSummary {
    pub fn print(&self) {
        println!(
            "Extracted {} records from {} pages ({} skipped){}.",
            self.records,
            self.files,
            self.skipped,
            if self.used_fallback { " using fallback pattern" } else { "" },
        );
    }
}

/// Index → extract → fallback if nothing found → write `output`.
pub fn run(root: &Path, output: &Path, markup: &Markup, default_title: &str) -> Result<ParseSummary> {
    let pages = index::index_pages(root)?;
    info!("Indexed {} page files under {}", pages.len(), root.display());

    let (rows, summary) = extract_corpus(&pages, markup, default_title);
    store::write_json(output, &rows)?;
    info!("Wrote {} records to {}", rows.len(), output.display());
    Ok(summary)
}

/// Primary markup extraction over the ordered pages; the text-pattern pass
/// runs only when that yields no records at all.
pub fn extract_corpus(
    pages: &[SourcePage],
    markup: &Markup,
    default_title: &str,
) -> (Vec<HadithRow>, ParseSummary) {
    let pb = progress_bar(pages.len());
    let mut skipped = 0usize;
    let mut primary = Extraction::new(markup, default_title);
    for page in pages {
        match load(page) {
            Some(fragments) => primary.process_page(page, &fragments),
            None => skipped += 1,
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let mut records = primary.into_records();
    let used_fallback = records.is_empty();
    if used_fallback {
        info!("No marked-up quotations found, trying text pattern");
        let mut fallback = FallbackExtraction::new(markup, default_title);
        for page in pages {
            if let Some(fragments) = load(page) {
                fallback.process_page(page, &fragments);
            }
        }
        records = fallback.into_records();
    }

    let rows = records.finalize();
    let summary = ParseSummary {
        files: pages.len(),
        skipped,
        records: rows.len(),
        used_fallback,
    };
    (rows, summary)
}

fn load(page: &SourcePage) -> Option<Vec<String>> {
    match fragments::read_fragments(&page.path) {
        Ok(Some(fragments)) => Some(fragments),
        Ok(None) => {
            debug!("No paragraph list in {}", page.path.display());
            None
        }
        Err(e) => {
            warn!("Skipping {}: {:#}", page.path.display(), e);
            None
        }
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkupSettings;
    use std::path::PathBuf;

    const FIXTURES: &str = "tests/fixtures/corpus";

    fn markup() -> Markup {
        Markup::from_settings(&MarkupSettings::default()).unwrap()
    }

    fn write_page(root: &Path, v: u32, s: u32, p: u32, fragments: &[&str]) {
        let dir = root.join(format!("volume_{}", v)).join(format!("section_{}", s));
        std::fs::create_dir_all(&dir).unwrap();
        let list: Vec<_> = fragments
            .iter()
            .map(|t| serde_json::json!({ "text": t }))
            .collect();
        let doc = serde_json::json!({ "data": [{ "paragList": list }] });
        std::fs::write(dir.join(format!("page_{}.json", p)), doc.to_string()).unwrap();
    }

    #[test]
    fn fixture_corpus_end_to_end() {
        let pages = index::index_pages(Path::new(FIXTURES)).unwrap();
        let (rows, summary) = extract_corpus(&pages, &markup(), "بدون عنوان");

        assert!(!summary.used_fallback);
        assert_eq!(summary.skipped, 2);

        let merged = rows.iter().find(|r| r.id == "101").unwrap();
        assert_eq!(merged.pages, vec![1, 2]);
        assert_eq!(merged.title, "باب فضل العلم");
        assert_eq!(merged.ghael, "قال");
        assert_eq!(merged.content, "طلب العلم فريضة\nعلى كل مسلم");

        let late = rows.iter().find(|r| r.id == "201").unwrap();
        assert_eq!((late.vol, late.sec), (1, 2));
        assert_eq!(late.title, "باب العقل");
        assert_eq!(late.sanad, "");

        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        let first = ids.iter().position(|id| *id == "101").unwrap();
        let second = ids.iter().position(|id| *id == "201").unwrap();
        assert!(first < second);
    }

    #[test]
    fn output_is_byte_identical_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        let m = markup();
        run(Path::new(FIXTURES), &a, &m, "t").unwrap();
        run(Path::new(FIXTURES), &b, &m, "t").unwrap();
        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
    }

    #[test]
    fn fallback_runs_only_when_primary_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        write_page(dir.path(), 1, 1, 1, &[r#"<p id="f1">علی فرمود: «دانش»</p>"#]);
        write_page(dir.path(), 1, 1, 2, &[r#"<p id="f2">حسن فرمود: «صبر»</p>"#]);

        let pages = index::index_pages(dir.path()).unwrap();
        let (rows, summary) = extract_corpus(&pages, &markup(), "t");
        assert!(summary.used_fallback);
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["fallback_f1", "fallback_f2"]);
        assert_eq!(rows[0].content, "دانش");
        assert_eq!(rows[0].ghael, "علی");
    }

    #[test]
    fn fallback_suppressed_by_any_primary_record() {
        let dir = tempfile::tempdir().unwrap();
        write_page(dir.path(), 1, 1, 1, &[r#"<p id="f1">علی فرمود: «دانش»</p>"#]);
        write_page(
            dir.path(),
            1,
            1,
            2,
            &[r#"<p id="x"><span class="hadith" data-index="1">متن</span></p>"#],
        );

        let pages = index::index_pages(dir.path()).unwrap();
        let (rows, summary) = extract_corpus(&pages, &markup(), "t");
        assert!(!summary.used_fallback);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "1");
    }

    #[test]
    fn missing_root_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.json");
        let missing = PathBuf::from(dir.path()).join("nowhere");
        assert!(run(&missing, &out, &markup(), "t").is_err());
        assert!(!out.exists());
    }
}
