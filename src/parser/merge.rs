use std::collections::HashMap;

use crate::store::HadithRow;

/// One logical quotation, possibly seen on several pages.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotationRecord {
    pub identity: String,
    pub volume: u32,
    pub section: u32,
    pub pages: Vec<u32>,
    pub title: String,
    pub attribution: String,
    pub chain: String,
    pub variants: Vec<String>,
}

impl QuotationRecord {
    /// Flatten into the output row; variants become newline-joined content.
    pub fn finalize(self) -> HadithRow {
        HadithRow {
            vol: self.volume,
            sec: self.section,
            pages: self.pages,
            id: self.identity,
            title: self.title,
            ghael: self.attribution,
            sanad: self.chain,
            content: self.variants.join("\n").trim().to_string(),
        }
    }

    fn absorb(&mut self, page: u32, body: &str) {
        if !self.pages.contains(&page) {
            self.pages.push(page);
        }
        if !body.is_empty() && !self.variants.iter().any(|v| v == body) {
            self.variants.push(body.to_string());
        }
    }
}

/// Identity-keyed records, iterated in first-insertion order.
#[derive(Debug, Default)]
pub struct RecordSet {
    records: Vec<QuotationRecord>,
    by_identity: HashMap<String, usize>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.by_identity.contains_key(identity)
    }

    #[cfg(test)]
    pub fn get(&self, identity: &str) -> Option<&QuotationRecord> {
        self.by_identity.get(identity).map(|&i| &self.records[i])
    }

    /// Insert a new record. Returns false (and drops it) if the identity exists.
    pub fn insert_new(&mut self, record: QuotationRecord) -> bool {
        if self.contains(&record.identity) {
            return false;
        }
        self.by_identity
            .insert(record.identity.clone(), self.records.len());
        self.records.push(record);
        true
    }

    /// Fold another occurrence into an existing record. Title, attribution,
    /// chain, volume and section stay as first recorded.
    pub fn merge(&mut self, identity: &str, page: u32, body: &str) -> bool {
        match self.by_identity.get(identity) {
            Some(&i) => {
                self.records[i].absorb(page, body);
                true
            }
            None => false,
        }
    }

    pub fn finalize(self) -> Vec<HadithRow> {
        self.records.into_iter().map(QuotationRecord::finalize).collect()
    }
}

// ── Tests ──
