/// Locale content integration tests — shipped tables and loader behavior.

use std::path::Path;
use support_chat::core::config::{ChatConfig, MenuConfig};
use support_chat::core::content::{ContentError, LocaleTable, ValidationIssue};

const TOPICS: [&str; 5] = ["pricing", "features", "setup", "trial", "contact"];

#[test]
fn shipped_locale_dir_loads() {
    let mut table = LocaleTable::new();
    let loaded = table.load_dir(Path::new("locale_data/locales")).unwrap();
    assert_eq!(loaded, vec!["en", "ru", "uz"]);
}

#[test]
fn every_shipped_locale_covers_every_topic() {
    let table = LocaleTable::builtin().unwrap();
    for code in table.codes() {
        let content = table.get(code).unwrap();
        for topic in &TOPICS {
            let entry = content
                .topic(topic)
                .unwrap_or_else(|| panic!("[{}] missing topic '{}'", code, topic));
            assert!(!entry.title.trim().is_empty(), "[{}] empty title for '{}'", code, topic);
            assert!(entry.body.contains("kb-section"), "[{}] body of '{}' lacks kb-section", code, topic);
        }
        assert!(content.labels.contains_key("custom"), "[{}] missing custom label", code);
    }
}

#[test]
fn shipped_config_matches_defaults() {
    let cfg = ChatConfig::load_from_ron(Path::new("locale_data/chat_config.ron")).unwrap();
    assert_eq!(cfg, ChatConfig::default());
}

#[test]
fn shipped_tables_pass_validation_against_shipped_config() {
    let cfg = ChatConfig::load_from_ron(Path::new("locale_data/chat_config.ron")).unwrap();
    let table = LocaleTable::builtin().unwrap();
    table.validate(&cfg.menus, &cfg.default_locale).unwrap();
}

#[test]
fn extra_locale_dir_extends_builtin() {
    let mut table = LocaleTable::builtin().unwrap();
    table.load_dir(Path::new("tests/fixtures/locales")).unwrap();
    assert_eq!(table.len(), 4);
    assert!(table.lint(&MenuConfig::default()).is_empty());
}

#[test]
fn incomplete_locale_is_reported() {
    let mut table = LocaleTable::builtin().unwrap();
    table.load_dir(Path::new("tests/fixtures/incomplete")).unwrap();

    let err = table.validate(&MenuConfig::default(), "uz").unwrap_err();
    let issues = match err {
        ContentError::Validation(issues) => issues,
        other => panic!("expected validation error, got {other}"),
    };
    assert_eq!(issues.len(), 2);
    assert!(issues.contains(&ValidationIssue::MissingLabel {
        locale: "de".to_string(),
        action: "custom".to_string(),
    }));
    assert!(issues.contains(&ValidationIssue::MissingTopic {
        locale: "de".to_string(),
        action: "trial".to_string(),
    }));
}

#[test]
fn missing_dir_is_io_error() {
    let mut table = LocaleTable::new();
    let err = table.load_dir(Path::new("tests/fixtures/nope")).unwrap_err();
    assert!(matches!(err, ContentError::Io(_)));
}
