use std::path::Path;

use anyhow::{anyhow, Context, Result};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::debug;

use super::index::SourcePage;
use super::merge::{QuotationRecord, RecordSet};
use crate::config::MarkupSettings;

#[derive(Debug, Deserialize)]
struct PageDocument {
    #[serde(default)]
    data: Vec<PageData>,
}

#[derive(Debug, Deserialize)]
struct PageData {
    #[serde(rename = "paragList")]
    parag_list: Option<Vec<Paragraph>>,
}

#[derive(Debug, Deserialize)]
struct Paragraph {
    #[serde(default)]
    text: String,
}

/// Markup text of each fragment on a page.
///
/// `Ok(None)` means the page has no `data[0].paragList` and is skipped.
pub fn read_fragments(path: &Path) -> Result<Option<Vec<String>>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_fragments(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn parse_fragments(raw: &str) -> Result<Option<Vec<String>>> {
    let doc: PageDocument = serde_json::from_str(raw)?;
    Ok(doc
        .data
        .into_iter()
        .next()
        .and_then(|d| d.parag_list)
        .map(|list| list.into_iter().map(|p| p.text).collect()))
}

/// Compiled selectors for the page markup.
#[derive(Debug, Clone)]
pub struct Markup {
    pub heading: Selector,
    pub quotation: Selector,
    pub chain: Selector,
    pub attributor: Selector,
    pub footnote: Selector,
    pub paragraph: Selector,
    pub index_attr: String,
    pub paragraph_id_attr: String,
}

impl Markup {
    pub fn from_settings(s: &MarkupSettings) -> Result<Self> {
        Ok(Markup {
            heading: selector(&s.heading)?,
            quotation: selector(&s.quotation)?,
            chain: selector(&s.chain)?,
            attributor: selector(&s.attributor)?,
            footnote: selector(&s.footnote)?,
            paragraph: selector(&s.paragraph)?,
            index_attr: s.index_attr.clone(),
            paragraph_id_attr: s.paragraph_id_attr.clone(),
        })
    }

    /// Identifier of the nearest paragraph enclosing (or being) `el`.
    fn paragraph_id<'a>(&self, el: ElementRef<'a>) -> Option<&'a str> {
        std::iter::once(el)
            .chain(el.ancestors().filter_map(ElementRef::wrap))
            .find(|e| self.paragraph.matches(e))
            .and_then(|p| p.value().attr(&self.paragraph_id_attr))
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {:?}: {}", css, e))
}

/// Paragraph key used in synthesized identities; falls back to the
/// fragment's position on its page when the paragraph carries no id.
pub fn paragraph_key(id: Option<&str>, page: &SourcePage, index: usize) -> String {
    match id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("v{}s{}p{}f{}", page.volume, page.section, page.page, index),
    }
}

pub fn trimmed_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Text of `el` with every descendant matching one of `excluded` removed.
fn text_without(el: ElementRef, excluded: &[&Selector]) -> String {
    let skipped: Vec<_> = excluded
        .iter()
        .flat_map(|s| el.select(s))
        .map(|e| e.id())
        .collect();

    let mut out = String::new();
    for node in el.descendants() {
        if let Some(text) = node.value().as_text() {
            if !node.ancestors().any(|a| skipped.contains(&a.id())) {
                out.push_str(text);
            }
        }
    }
    out.trim().to_string()
}

/// Single forward pass over the ordered pages. Owns the current heading
/// and the identity-keyed records built so far.
pub struct Extraction<'m> {
    markup: &'m Markup,
    title: String,
    records: RecordSet,
}

impl<'m> Extraction<'m> {
    pub fn new(markup: &'m Markup, default_title: &str) -> Self {
        Extraction {
            markup,
            title: default_title.to_string(),
            records: RecordSet::new(),
        }
    }

    #[cfg(test)]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[cfg(test)]
    pub fn records(&self) -> &RecordSet {
        &self.records
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

        for el in html.select(&self.markup.quotation) {
            let identity = match el.value().attr(&self.markup.index_attr) {
                Some(explicit) if !explicit.is_empty() => explicit.to_string(),
                _ => format!(
                    "gen_{}_{}",
                    page.path.display(),
                    paragraph_key(self.markup.paragraph_id(el), page, index)
                ),
            };
            let body = text_without(el, &[&self.markup.chain, &self.markup.footnote]);

            if self.records.merge(&identity, page.page, &body) {
                debug!("Merged {} from page {}", identity, page.page);
                continue;
            }

            let chain_el = el.select(&self.markup.chain).next();
            let attribution = chain_el
                .and_then(|c| c.select(&self.markup.attributor).next())
                .map(trimmed_text)
                .unwrap_or_default();
            let chain = chain_el.map(trimmed_text).unwrap_or_default();

            self.records.insert_new(QuotationRecord {
                identity,
                volume: page.volume,
                section: page.section,
                pages: vec![page.page],
                title: self.title.clone(),
                attribution,
                chain,
                variants: if body.is_empty() { Vec::new() } else { vec![body] },
            });
        }
    }
}

// ── Tests ──
