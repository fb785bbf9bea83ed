use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

use super::fragments::{paragraph_key, trimmed_text, Markup};
use super::index::SourcePage;
use super::merge::{QuotationRecord, RecordSet};

/// `<attributor> فرمود: «<content>»`
static SAYING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(.+?)\s*فرمود\s*:\s*«([^»]+)»").unwrap());

/// Text-pattern extraction for pages without quotation markup.
/// A repeated identity is ignored, never merged.
pub struct FallbackExtraction<'m> {
    markup: &'m Markup,
    title: String,
    records: RecordSet,
}

impl<'m> FallbackExtraction<'m> {
    pub fn new(markup: &'m Markup, default_title: &str) -> Self {
        FallbackExtraction {
            markup,
            title: default_title.to_string(),
            records: RecordSet::new(),
        }
    }

    pub fn into_records(self) -> RecordSet {
        self.records
    }

    pub fn process_page(&mut self, page: &SourcePage, fragments: &[String]) {
        for (index, text) in fragments.iter().enumerate() {
            self.process_fragment(page, index, text);
        }
    }

    fn process_fragment(&mut self, page: &SourcePage, index: usize, text: &str) {
        let html = Html::parse_fragment(text);

        if let Some(heading) = html.select(&self.markup.heading).next() {
            self.title = trimmed_text(heading);
        }

        let Some(paragraph) = html.select(&self.markup.paragraph).next() else {
            return;
        };
        let plain = trimmed_text(paragraph);
        let Some(caps) = SAYING_RE.captures(&plain) else {
            return;
        };

        let id = paragraph.value().attr(&self.markup.paragraph_id_attr);
        let identity = format!("fallback_{}", paragraph_key(id, page, index));
        if self.records.contains(&identity) {
            return;
        }

        self.records.insert_new(QuotationRecord {
            identity,
            volume: page.volume,
            section: page.section,
            pages: vec![page.page],
            title: self.title.clone(),
            attribution: caps[1].trim().to_string(),
            chain: String::new(),
            variants: vec![caps[2].trim().to_string()],
        });
    }
}

// ── Tests ──
