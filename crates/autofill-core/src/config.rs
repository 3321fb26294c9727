use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name under the platform config/cache dirs.
pub const APP_DIR: &str = "situation-autofill";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutofillConfig {
    #[serde(default)]
    pub labels: LabelConfig,

    #[serde(default)]
    pub limits: LimitConfig,

    #[serde(default)]
    pub timing: TimingConfig,
}

/// Keyword vocabulary used by field discovery. Matching is a case-sensitive
/// substring test, so every language the page is served in needs an entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelConfig {
    /// Text of the heading that introduces the situation image section.
    #[serde(default = "default_section_labels")]
    pub section: Vec<String>,

    #[serde(default = "default_title_labels")]
    pub title: Vec<String>,

    #[serde(default = "default_situation_labels")]
    pub situation: Vec<String>,

    #[serde(default = "default_hint_labels")]
    pub hint: Vec<String>,

    /// Text that only appears inside a single image card.
    #[serde(default = "default_card_markers")]
    pub card_markers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitConfig {
    /// Capacity assumed for a title field with no declared or visible limit.
    #[serde(default = "default_title_fallback")]
    pub title_fallback: usize,

    /// Capacity assumed for a situation field with no declared or visible limit.
    #[serde(default = "default_situation_fallback")]
    pub situation_fallback: usize,

    /// Upper bound on list items applied in one run.
    #[serde(default = "default_max_list_items")]
    pub max_list_items: usize,

    /// How many ancestors of a situation field are checked for card markers.
    #[serde(default = "default_card_search_depth")]
    pub card_search_depth: usize,

    /// Declared `maxlength` values at or above this are treated as absent.
    #[serde(default = "default_declared_limit_ceiling")]
    pub declared_limit_ceiling: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    /// Wait after clicking an edit affordance before re-querying the page.
    #[serde(default = "default_reveal_delay_ms")]
    pub reveal_delay_ms: u64,
}

fn default_section_labels() -> Vec<String> {
    vec!["상황 이미지".to_string(), "Situation Image".to_string()]
}
fn default_title_labels() -> Vec<String> {
    vec!["제목".to_string(), "Title".to_string()]
}
fn default_situation_labels() -> Vec<String> {
    vec!["상황".to_string(), "Situation".to_string()]
}
fn default_hint_labels() -> Vec<String> {
    vec!["이미지 힌트".to_string(), "Image Hint".to_string()]
}
fn default_card_markers() -> Vec<String> {
    vec![
        "이미지 변경".to_string(),
        "코드 복사".to_string(),
        "Change Image".to_string(),
        "Copy Code".to_string(),
    ]
}
fn default_title_fallback() -> usize {
    20
}
fn default_situation_fallback() -> usize {
    50
}
fn default_max_list_items() -> usize {
    50
}
fn default_card_search_depth() -> usize {
    6
}
fn default_declared_limit_ceiling() -> usize {
    10_000
}
fn default_reveal_delay_ms() -> u64 {
    120
}

impl Default for AutofillConfig {
    fn default() -> Self {
        Self {
            labels: LabelConfig::default(),
            limits: LimitConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            section: default_section_labels(),
            title: default_title_labels(),
            situation: default_situation_labels(),
            hint: default_hint_labels(),
            card_markers: default_card_markers(),
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            title_fallback: default_title_fallback(),
            situation_fallback: default_situation_fallback(),
            max_list_items: default_max_list_items(),
            card_search_depth: default_card_search_depth(),
            declared_limit_ceiling: default_declared_limit_ceiling(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reveal_delay_ms: default_reveal_delay_ms(),
        }
    }
}

impl TimingConfig {
    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }
}

impl AutofillConfig {
    /// Load config from ~/.config/situation-autofill/config.toml, creating defaults if missing.
    pub fn load() -> crate::error::Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = AutofillConfig::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    /// Save config to the default location.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AutofillError::Config(format!("Failed to read config: {e}"))
        })?;
        toml::from_str(&contents).map_err(|e| {
            crate::error::AutofillError::Config(format!("Failed to parse config: {e}"))
        })
    }

    pub fn save_to(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| {
            crate::error::AutofillError::Config(format!("Failed to serialize config: {e}"))
        })?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the config file path.
    pub fn config_path() -> crate::error::Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            crate::error::AutofillError::Config("Could not determine config directory".into())
        })?;
        Ok(config_dir.join(APP_DIR).join("config.toml"))
    }
}
