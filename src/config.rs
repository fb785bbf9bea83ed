use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

const CONFIG_FILE: &str = "hadith";
const ENV_PREFIX: &str = "HADITH";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub input_dir: PathBuf,
    pub output: PathBuf,
    pub translated_output: PathBuf,
    /// Heading label used until the first heading element is seen.
    pub default_title: String,
    pub markup: MarkupSettings,
    pub translation: TranslationSettings,
    /// Literal (from, to) pairs applied in order to the translated file.
    pub replacements: Vec<(String, String)>,
}

/// CSS selectors and attribute names describing the page markup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarkupSettings {
    pub heading: String,
    pub quotation: String,
    pub index_attr: String,
    pub chain: String,
    pub attributor: String,
    pub footnote: String,
    pub paragraph: String,
    pub paragraph_id_attr: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslationSettings {
    pub endpoint: String,
    pub model: String,
    pub api_keys: Vec<String>,
    pub source_language: String,
    pub target_language: String,
    pub attempts_per_key: usize,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub request_timeout_secs: u64,
    /// Known heading terms and their preferred rendering.
    pub glossary: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            input_dir: PathBuf::from("data/pages"),
            output: PathBuf::from("hadiths.json"),
            translated_output: PathBuf::from("hadiths_translated.json"),
            default_title: "بدون عنوان".to_string(),
            markup: MarkupSettings::default(),
            translation: TranslationSettings::default(),
            replacements: default_replacements(),
        }
    }
}

impl Default for MarkupSettings {
    fn default() -> Self {
        MarkupSettings {
            heading: "h1, h2, h3, h4, h5, h6".to_string(),
            quotation: ".hadith".to_string(),
            index_attr: "data-index".to_string(),
            chain: ".sanad".to_string(),
            attributor: ".ghael".to_string(),
            footnote: ".footnote".to_string(),
            paragraph: "p".to_string(),
            paragraph_id_attr: "id".to_string(),
        }
    }
}

impl Default for TranslationSettings {
    fn default() -> Self {
        TranslationSettings {
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_keys: Vec::new(),
            source_language: "Arabic".to_string(),
            target_language: "Persian".to_string(),
            attempts_per_key: 3,
            base_backoff_ms: 2000,
            max_backoff_ms: 60_000,
            request_timeout_secs: 120,
            glossary: BTreeMap::new(),
        }
    }
}

/// Honorific abbreviations expanded in the translated output.
fn default_replacements() -> Vec<(String, String)> {
    [
        ("(ص)", "(صلی الله علیه و آله)"),
        ("(عج)", "(عجل الله تعالی فرجه الشریف)"),
        ("(ع)", "(علیه السلام)"),
        ("(س)", "(سلام الله علیها)"),
        ("(ره)", "(رحمه الله)"),
        ("(رض)", "(رضی الله عنه)"),
    ]
    .into_iter()
    .map(|(from, to)| (from.to_string(), to.to_string()))
    .collect()
}

impl Settings {
    /// Defaults, then `hadith.toml` if present, then `HADITH_*` environment variables.
    pub fn load() -> Result<Self> {
        let built = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("translation.api_keys")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        built
            .try_deserialize()
            .context("Invalid configuration")
    }
}

// ── Tests ──
