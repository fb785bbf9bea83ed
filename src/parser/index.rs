use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{bail, Result};
use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

static PAGE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[/\\])volume_(\d+)[/\\]section_(\d+)[/\\]page_(\d+)\.json$").unwrap()
});

/// One input file with its position in the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePage {
    pub path: PathBuf,
    pub volume: u32,
    pub section: u32,
    pub page: u32,
}

impl SourcePage {
    /// Parse `.../volume_<V>/section_<S>/page_<P>.json`; anything else is `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let text = path.to_string_lossy();
        let caps = PAGE_PATH_RE.captures(&text)?;
        Some(SourcePage {
            path: path.to_path_buf(),
            volume: caps[1].parse().ok()?,
            section: caps[2].parse().ok()?,
            page: caps[3].parse().ok()?,
        })
    }

    fn order_key(&self) -> (u32, u32, u32, &Path) {
        (self.volume, self.section, self.page, &self.path)
    }
}

/// Every `.json` file under `root`, in filesystem listing order.
pub fn discover_json_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("Input directory not found: {}", root.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "json")
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Keep paths matching the page layout and sort by (volume, section, page).
pub fn order_pages(paths: &[PathBuf]) -> Vec<SourcePage> {
    let mut pages: Vec<SourcePage> = paths
        .iter()
        .filter_map(|p| {
            let page = SourcePage::from_path(p);
            if page.is_none() {
                debug!("Not a page file, skipped: {}", p.display());
            }
            page
        })
        .collect();
    pages.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    pages
}

pub fn index_pages(root: &Path) -> Result<Vec<SourcePage>> {
    let files = discover_json_files(root)?;
    Ok(order_pages(&files))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn parses_layout() {
        let page = SourcePage::from_path(&p("/data/volume_12/section_3/page_045.json")).unwrap();
        assert_eq!((page.volume, page.section, page.page), (12, 3, 45));
    }

    #[test]
    fn rejects_other_names() {
        assert!(SourcePage::from_path(&p("/data/volume_1/page_1.json")).is_none());
        assert!(SourcePage::from_path(&p("/data/volume_1/section_1/index.json")).is_none());
        assert!(SourcePage::from_path(&p("/data/volume_1/section_1/page_1.json.bak")).is_none());
    }

    #[test]
    fn orders_by_volume_then_section_then_page() {
        let paths = vec![
            p("/r/volume_1/section_2/page_1.json"),
            p("/r/volume_1/section_1/page_2.json"),
            p("/r/volume_2/section_1/page_1.json"),
        ];
        let ordered: Vec<_> = order_pages(&paths)
            .into_iter()
            .map(|s| (s.volume, s.section, s.page))
            .collect();
        assert_eq!(ordered, vec![(1, 1, 2), (1, 2, 1), (2, 1, 1)]);
    }

    #[test]
    fn numeric_not_lexicographic() {
        let paths = vec![
            p("/r/volume_1/section_1/page_10.json"),
            p("/r/volume_1/section_1/page_9.json"),
            p("/r/volume_10/section_1/page_1.json"),
            p("/r/volume_2/section_1/page_1.json"),
        ];
        let ordered: Vec<_> = order_pages(&paths)
            .into_iter()
            .map(|s| (s.volume, s.page))
            .collect();
        assert_eq!(ordered, vec![(1, 9), (1, 10), (2, 1), (10, 1)]);
    }

    #[test]
    fn volume_must_start_a_path_component() {
        assert!(SourcePage::from_path(&p("/r/backup_volume_1/section_1/page_1.json")).is_none());
        assert!(SourcePage::from_path(&p("volume_1/section_1/page_1.json")).is_some());
    }

    #[test]
    fn duplicate_triples_order_by_path() {
        let paths = vec![
            p("/r/b/volume_1/section_1/page_1.json"),
            p("/r/a/volume_1/section_1/page_1.json"),
        ];
        let ordered: Vec<PathBuf> = order_pages(&paths).into_iter().map(|s| s.path).collect();
        assert_eq!(
            ordered,
            vec![
                p("/r/a/volume_1/section_1/page_1.json"),
                p("/r/b/volume_1/section_1/page_1.json"),
            ]
        );
    }

    #[test]
    fn non_matching_paths_dropped() {
        let paths = vec![p("/r/meta.json"), p("/r/volume_1/section_1/page_1.json")];
        assert_eq!(order_pages(&paths).len(), 1);
    }

    #[test]
    fn missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_json_files(&dir.path().join("absent")).is_err());
    }

    #[test]
    fn discovers_nested_json_only() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("volume_1").join("section_1");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("page_1.json"), "{}").unwrap();
        std::fs::write(nested.join("notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("top.json"), "{}").unwrap();

        let files = discover_json_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(order_pages(&files).len(), 1);
    }
}
