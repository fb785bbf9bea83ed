use std::collections::BTreeMap;

use crate::config::TranslationSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Title,
    Content,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub text: String,
}

pub struct Prompts {
    source: String,
    target: String,
    glossary: BTreeMap<String, String>,
}

impl Prompts {
    pub fn from_settings(settings: &TranslationSettings) -> Self {
        Prompts {
            source: settings.source_language.clone(),
            target: settings.target_language.clone(),
            glossary: settings.glossary.clone(),
        }
    }

    pub fn build(&self, kind: TextKind, text: &str) -> Prompt {
        let mut system = format!(
            "Translate the following {} text into fluent {}. \
             Keep proper names, Quranic verses and honorific abbreviations intact. \
             Reply with JSON of the form {{\"translation\": \"...\"}} and nothing else.",
            self.source, self.target
        );

        if kind == TextKind::Title {
            system.push_str(" The text is a chapter heading from a hadith collection; keep it short.");
            let hints: Vec<String> = self
                .glossary
                .iter()
                .filter(|(term, _)| text.contains(term.as_str()))
                .map(|(term, rendering)| format!("{} => {}", term, rendering))
                .collect();
            if !hints.is_empty() {
                system.push_str("\nUse these renderings:\n");
                system.push_str(&hints.join("\n"));
            }
        }

        Prompt {
            system,
            text: text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts() -> Prompts {
        let mut settings = TranslationSettings::default();
        settings.glossary.insert("باب".to_string(), "باب".to_string());
        settings.glossary.insert("كتاب".to_string(), "کتاب".to_string());
        Prompts::from_settings(&settings)
    }

    #[test]
    fn title_gets_matching_glossary_hints_only() {
        let p = prompts().build(TextKind::Title, "باب العقل");
        assert!(p.system.contains("باب => باب"));
        assert!(!p.system.contains("كتاب =>"));
        assert_eq!(p.text, "باب العقل");
    }

    #[test]
    fn content_has_no_hints() {
        let p = prompts().build(TextKind::Content, "باب العقل");
        assert!(!p.system.contains("=>"));
        assert!(p.system.contains("Arabic"));
        assert!(p.system.contains("Persian"));
    }
}
