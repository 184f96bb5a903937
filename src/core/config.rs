/// Widget configuration — default locale, reply delay, and action menus.
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::content::ContentError;
use crate::schema::locale::CUSTOM_ACTION;

/// One button in an action menu. The label comes from the active locale;
/// the icon class is shared by every locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub action: String,
    pub icon: String,
}

impl MenuItem {
    pub fn new(action: &str, icon: &str) -> Self {
        Self {
            action: action.to_string(),
            icon: icon.to_string(),
        }
    }

    pub fn is_custom(&self) -> bool {
        self.action == CUSTOM_ACTION
    }
}

/// The three menus the dialogue can offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// Offered with the greeting.
    pub greeting: Vec<MenuItem>,
    /// Offered after every topic answer.
    pub topic: Vec<MenuItem>,
    /// Offered with the thank-you reply to a free-text question.
    pub follow_up: Vec<MenuItem>,
}

impl Default for MenuConfig {
    fn default() -> Self {
        let pricing = MenuItem::new("pricing", "fas fa-tags");
        let features = MenuItem::new("features", "fas fa-star");
        let setup = MenuItem::new("setup", "fas fa-cog");
        let trial = MenuItem::new("trial", "fas fa-gift");
        let contact = MenuItem::new("contact", "fas fa-phone");
        let custom = MenuItem::new(CUSTOM_ACTION, "fas fa-comment");

        Self {
            greeting: vec![
                pricing.clone(),
                features.clone(),
                setup.clone(),
                trial,
                contact.clone(),
                custom.clone(),
            ],
            topic: vec![
                pricing.clone(),
                features.clone(),
                setup,
                contact.clone(),
                custom,
            ],
            follow_up: vec![pricing, features, contact],
        }
    }
}

impl MenuConfig {
    /// Every distinct action-id referenced by any menu, in first-seen order.
    pub fn actions(&self) -> Vec<&str> {
        let mut seen = FxHashSet::default();
        self.greeting
            .iter()
            .chain(&self.topic)
            .chain(&self.follow_up)
            .map(|item| item.action.as_str())
            .filter(|action| seen.insert(*action))
            .collect()
    }
}

/// Upper bound for `reply_delay_ms`: one hour.
pub const MAX_REPLY_DELAY_MS: u64 = 60 * 60 * 1000;

/// Top-level widget settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Locale used when the requested one is not in the table.
    pub default_locale: String,
    /// Delay before the canned reply to a free-text question. At most
    /// `MAX_REPLY_DELAY_MS`.
    pub reply_delay_ms: u64,
    /// Reject free text outside the `AwaitingFreeText` step instead of
    /// accepting it.
    pub strict_free_text: bool,
    pub menus: MenuConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_locale: "uz".to_string(),
            reply_delay_ms: 1000,
            strict_free_text: false,
            menus: MenuConfig::default(),
        }
    }
}

impl ChatConfig {
    /// Load a config from a RON file. Missing fields take their defaults.
    pub fn load_from_ron(path: &Path) -> Result<ChatConfig, ContentError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<ChatConfig, ContentError> {
        Ok(ron::from_str(input)?)
    }

    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_menus() {
        let menus = MenuConfig::default();
        assert_eq!(menus.greeting.len(), 6);
        assert_eq!(menus.topic.len(), 5);
        let follow_up: Vec<&str> = menus.follow_up.iter().map(|m| m.action.as_str()).collect();
        assert_eq!(follow_up, vec!["pricing", "features", "contact"]);
        assert!(menus.greeting.last().unwrap().is_custom());
    }

    #[test]
    fn actions_are_deduplicated() {
        let menus = MenuConfig::default();
        let actions = menus.actions();
        assert_eq!(
            actions,
            vec!["pricing", "features", "setup", "trial", "contact", "custom"]
        );
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let cfg = ChatConfig::parse_ron("(default_locale: \"ru\", reply_delay_ms: 250)").unwrap();
        assert_eq!(cfg.default_locale, "ru");
        assert_eq!(cfg.reply_delay(), Duration::from_millis(250));
        assert!(!cfg.strict_free_text);
        assert_eq!(cfg.menus, MenuConfig::default());
    }

    #[test]
    fn bad_ron_is_an_error() {
        assert!(ChatConfig::parse_ron("(reply_delay_ms: \"soon\")").is_err());
    }

    #[test]
    fn load_fixture_config() {
        let path = std::path::PathBuf::from("tests/fixtures/strict_config.ron");
        let cfg = ChatConfig::load_from_ron(&path).unwrap();
        assert!(cfg.strict_free_text);
        assert_eq!(cfg.menus.follow_up.len(), 1);
    }
}
