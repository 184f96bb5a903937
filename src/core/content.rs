/// Localized content tables — loading, merging, and startup validation.
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::core::config::MenuConfig;
use crate::schema::locale::LocaleContent;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("locale file has no usable name: {0}")]
    UnnamedLocale(String),
    #[error("locale table is empty")]
    EmptyTable,
    #[error("default locale '{0}' is not in the locale table")]
    MissingDefaultLocale(String),
    #[error("content validation failed: {}", format_issues(.0))]
    Validation(Vec<ValidationIssue>),
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A gap between the menus and one locale's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A menu offers an action that has no button label in this locale.
    MissingLabel { locale: String, action: String },
    /// A menu offers a topic that this locale does not describe.
    MissingTopic { locale: String, action: String },
    /// A required string is blank.
    EmptyField { locale: String, field: &'static str },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLabel { locale, action } => {
                write!(f, "[{}] no label for action '{}'", locale, action)
            }
            Self::MissingTopic { locale, action } => {
                write!(f, "[{}] no knowledge entry for topic '{}'", locale, action)
            }
            Self::EmptyField { locale, field } => {
                write!(f, "[{}] field '{}' is empty", locale, field)
            }
        }
    }
}

// Compiled-in tables, keyed by language code.
const BUILTIN_LOCALES: &[(&str, &str)] = &[
    ("en", include_str!("../../locale_data/locales/en.ron")),
    ("ru", include_str!("../../locale_data/locales/ru.ron")),
    ("uz", include_str!("../../locale_data/locales/uz.ron")),
];

/// Language code → content. Iterates in code order.
#[derive(Debug, Clone, Default)]
pub struct LocaleTable {
    locales: BTreeMap<String, LocaleContent>,
}

impl LocaleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tables shipped with the crate (`uz`, `ru`, `en`).
    pub fn builtin() -> Result<LocaleTable, ContentError> {
        let mut table = LocaleTable::new();
        for (code, src) in BUILTIN_LOCALES {
            table.insert(code, Self::parse_ron(src)?);
        }
        Ok(table)
    }

    /// Parse one locale's content from a RON string.
    pub fn parse_ron(input: &str) -> Result<LocaleContent, ContentError> {
        Ok(ron::from_str(input)?)
    }

    /// Load a single locale file. The file stem is the language code.
    pub fn load_from_ron(&mut self, path: &Path) -> Result<String, ContentError> {
        let code = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(normalize_code)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ContentError::UnnamedLocale(path.display().to_string()))?;
        let contents = std::fs::read_to_string(path)?;
        let content = Self::parse_ron(&contents)?;
        self.insert(&code, content);
        Ok(code)
    }

    /// Load every `*.ron` file in `dir`. Later files replace earlier
    /// entries with the same code.
    pub fn load_dir(&mut self, dir: &Path) -> Result<Vec<String>, ContentError> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("ron"))
            .collect();
        paths.sort();

        let mut loaded = Vec::with_capacity(paths.len());
        for path in &paths {
            loaded.push(self.load_from_ron(path)?);
        }
        tracing::info!(dir = %dir.display(), locales = ?loaded, "loaded locale files");
        Ok(loaded)
    }

    pub fn insert(&mut self, code: &str, content: LocaleContent) {
        self.locales.insert(normalize_code(code), content);
    }

    /// Merge another table into this one; `other` wins on conflicts.
    pub fn merge(&mut self, other: LocaleTable) {
        self.locales.extend(other.locales);
    }

    pub fn get(&self, code: &str) -> Option<&LocaleContent> {
        self.locales.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.locales.contains_key(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.locales.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.locales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }

    /// Find the table key for a requested code. Matching ignores case and
    /// surrounding whitespace, and a regional tag (`ru-RU`, `en_GB`) falls
    /// back to its primary language.
    pub fn lookup_code(&self, requested: &str) -> Option<&str> {
        let normalized = normalize_code(requested);
        if let Some((key, _)) = self.locales.get_key_value(&normalized) {
            return Some(key.as_str());
        }
        let primary = normalized.split(['-', '_']).next()?;
        self.locales
            .get_key_value(primary)
            .map(|(key, _)| key.as_str())
    }

    /// Check every locale against the menus: each offered action needs a
    /// label, each offered topic needs a knowledge entry.
    pub fn lint(&self, menus: &MenuConfig) -> Vec<ValidationIssue> {
        let actions = menus.actions();
        let mut issues = Vec::new();

        for (code, content) in &self.locales {
            for (field, value) in [
                ("header", &content.header),
                ("greeting", &content.greeting),
                ("custom_question", &content.custom_question),
                ("thank_you", &content.thank_you),
            ] {
                if value.trim().is_empty() {
                    issues.push(ValidationIssue::EmptyField {
                        locale: code.clone(),
                        field,
                    });
                }
            }

            for action in &actions {
                if !content.labels.contains_key(*action) {
                    issues.push(ValidationIssue::MissingLabel {
                        locale: code.clone(),
                        action: action.to_string(),
                    });
                }
                let is_topic = *action != crate::schema::locale::CUSTOM_ACTION;
                if is_topic && content.topic(action).is_none() {
                    issues.push(ValidationIssue::MissingTopic {
                        locale: code.clone(),
                        action: action.to_string(),
                    });
                }
            }
        }

        issues
    }

    /// Startup check: the table is non-empty, holds the default locale,
    /// and passes `lint`.
    pub fn validate(&self, menus: &MenuConfig, default_locale: &str) -> Result<(), ContentError> {
        if self.is_empty() {
            return Err(ContentError::EmptyTable);
        }
        if !self.contains(default_locale) {
            return Err(ContentError::MissingDefaultLocale(default_locale.to_string()));
        }
        let issues = self.lint(menus);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ContentError::Validation(issues))
        }
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_lowercase()
}
