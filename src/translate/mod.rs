pub mod client;
pub mod prompts;
pub mod rotation;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::TranslationSettings;
use crate::store::{self, HadithRow, TranslatedRow};
use client::Translator;
use prompts::{Prompts, TextKind};
use rotation::KeyRotation;

#[derive(Debug, Default, PartialEq)]
pub struct TranslateSummary {
    pub total: usize,
    pub already_done: usize,
    pub translated: usize,
    pub empty: usize,
    pub substituted: usize,
}

impl TranslateSummary {
    pub fn print(&self) {
        println!(
            "Translated {} of {} records ({} already done, {} empty, {} texts kept untranslated).",
            self.translated, self.total, self.already_done, self.empty, self.substituted,
        );
    }
}

/// Sequential, resumable translation of finalized records.
pub struct Driver<T: Translator> {
    client: T,
    rotation: KeyRotation,
    prompts: Prompts,
    attempts_per_key: usize,
    untitled: String,
    title_cache: HashMap<String, String>,
    substituted: usize,
}

impl<T: Translator> Driver<T> {
    pub fn new(client: T, settings: &TranslationSettings, untitled: &str) -> Result<Self> {
        let rotation = KeyRotation::new(
            settings.api_keys.clone(),
            Duration::from_millis(settings.base_backoff_ms),
            Duration::from_millis(settings.max_backoff_ms),
        )?;
        Ok(Driver {
            client,
            rotation,
            prompts: Prompts::from_settings(settings),
            attempts_per_key: settings.attempts_per_key.max(1),
            untitled: untitled.to_string(),
            title_cache: HashMap::new(),
            substituted: 0,
        })
    }

    /// Translate every record not yet in `output`, rewriting the file after
    /// each one. `limit` caps how many records are translated this run.
    pub async fn run(
        &mut self,
        records: &[HadithRow],
        output: &Path,
        limit: Option<usize>,
    ) -> Result<TranslateSummary> {
        let mut done = store::read_partial(output)?;
        let seen: HashSet<String> = done.iter().map(|r| r.hadith.id.clone()).collect();

        let mut summary = TranslateSummary {
            total: records.len(),
            ..Default::default()
        };
        let mut pending: Vec<&HadithRow> = Vec::new();
        for r in records {
            if seen.contains(&r.id) {
                summary.already_done += 1;
            } else if r.content.is_empty() {
                debug!("Skipping {} (empty content)", r.id);
                summary.empty += 1;
            } else {
                pending.push(r);
            }
        }
        if let Some(n) = limit {
            pending.truncate(n);
        }

        info!(
            "{} records pending translation ({} already in {})",
            pending.len(),
            summary.already_done,
            output.display()
        );

        let pb = progress_bar(pending.len());
        for record in pending {
            let row = self.translate_record(record).await;
            done.push(row);
            store::write_json(output, &done)?;
            summary.translated += 1;
            pb.inc(1);
        }
        pb.finish_and_clear();

        summary.substituted = self.substituted;
        Ok(summary)
    }

    async fn translate_record(&mut self, record: &HadithRow) -> TranslatedRow {
        let title_fa = self.translate_title(&record.title).await;
        let content_fa = self
            .translate_text(TextKind::Content, &record.content)
            .await
            .unwrap_or_else(|| {
                warn!("Keeping original content for {}", record.id);
                self.substituted += 1;
                record.content.clone()
            });
        TranslatedRow {
            hadith: record.clone(),
            title_fa,
            content_fa,
        }
    }

    async fn translate_title(&mut self, title: &str) -> String {
        if title.is_empty() || title == self.untitled {
            return title.to_string();
        }
        if let Some(cached) = self.title_cache.get(title) {
            return cached.clone();
        }
        match self.translate_text(TextKind::Title, title).await {
            Some(translated) => {
                self.title_cache.insert(title.to_string(), translated.clone());
                translated
            }
            None => {
                warn!("Keeping original title {:?}", title);
                self.substituted += 1;
                title.to_string()
            }
        }
    }

    /// Up to `keys × attempts_per_key` attempts; `None` once the budget is
    /// spent or a non-retryable error occurs.
    async fn translate_text(&mut self, kind: TextKind, text: &str) -> Option<String> {
        let prompt = self.prompts.build(kind, text);
        let budget = self.rotation.len() * self.attempts_per_key;

        for attempt in 1..=budget {
            let key = self.rotation.current().to_string();
            match self.client.translate(&key, &prompt).await {
                Ok(translated) => {
                    self.rotation.on_success();
                    return Some(translated);
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        "Attempt {}/{} failed on key #{}: {}",
                        attempt,
                        budget,
                        self.rotation.index(),
                        e
                    );
                    let pause = self.rotation.on_retryable_failure();
                    if attempt == budget {
                        break;
                    }
                    if let Some(pause) = pause {
                        warn!("All keys failing, backing off {:.1}s", pause.as_secs_f64());
                        tokio::time::sleep(pause).await;
                    }
                }
                Err(e) => {
                    warn!("Translation failed: {}", e);
                    return None;
                }
            }
        }

        warn!("Gave up after {} attempts", budget);
        None
    }
}

/// Write every record with its source text moved into the translated fields.
pub fn write_pass_through(records: &[HadithRow], output: &Path) -> Result<usize> {
    let rows: Vec<TranslatedRow> = records.iter().map(TranslatedRow::pass_through).collect();
    store::write_json(output, &rows)?;
    Ok(rows.len())
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} (eta {eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

// ── Tests ──
