//! Resolved configuration and per-field merging of user overrides.
//!
//! [`Config`] is always complete. User files are read into [`PartialConfig`],
//! where every field is optional, and [`Config::merge`] applies one rule per
//! field so each fallback is visible.

pub mod loader;

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::CommitType;

pub use loader::{CONFIG_FILE_NAMES, load_config};

/// Shortest header length accepted from configuration.
pub const MIN_MESSAGE_LENGTH: usize = 20;

/// Maps a path pattern to a scope name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeMapping {
    pub pattern: String,
    pub scope: String,
}

impl ScopeMapping {
    pub fn new(pattern: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            scope: scope.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketLinking {
    pub enabled: bool,
    /// Extra regex patterns tried before the built-in ones.
    pub patterns: Vec<String>,
    pub prefix: String,
}

impl Default for TicketLinking {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: Vec::new(),
            prefix: "Refs:".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LearnFromHistory {
    pub enabled: bool,
    pub commit_count: usize,
}

impl Default for LearnFromHistory {
    fn default() -> Self {
        Self {
            enabled: true,
            commit_count: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakingChangeDetection {
    pub enabled: bool,
    pub keywords: Vec<String>,
    /// Append a `BREAKING CHANGE:` footer when breaking.
    pub include_footer: bool,
}

pub const DEFAULT_BREAKING_KEYWORDS: &[&str] = &[
    "breaking change",
    "breaking",
    "removed",
    "deprecated",
    "incompatible",
    "no longer supported",
    "migration required",
];

impl Default for BreakingChangeDetection {
    fn default() -> Self {
        Self {
            enabled: true,
            keywords: DEFAULT_BREAKING_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            include_footer: true,
        }
    }
}

/// Custom header templates; `None` selects the built-in layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Templates {
    pub default: Option<String>,
    pub no_scope: Option<String>,
    pub with_body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiSettings {
    pub enabled: bool,
    /// `claude` or `codex`.
    pub provider: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "claude".to_string(),
            api_key: None,
            model: None,
            timeout_secs: 15,
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub scopes: Vec<ScopeMapping>,
    /// Type used when there is nothing to classify.
    pub default_type: CommitType,
    /// `None` follows the history profile.
    pub include_emoji: Option<bool>,
    pub max_message_length: usize,
    pub ticket_linking: TicketLinking,
    pub learn_from_history: LearnFromHistory,
    pub breaking_change_detection: BreakingChangeDetection,
    pub templates: Templates,
    pub ai: AiSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scopes: Vec::new(),
            default_type: CommitType::Chore,
            include_emoji: None,
            max_message_length: 72,
            ticket_linking: TicketLinking::default(),
            learn_from_history: LearnFromHistory::default(),
            breaking_change_detection: BreakingChangeDetection::default(),
            templates: Templates::default(),
            ai: AiSettings::default(),
        }
    }
}

impl Config {
    /// Overlay `overrides` onto `defaults`, one rule per field.
    pub fn merge(defaults: Config, overrides: PartialConfig) -> Config {
        let default_type = match overrides.default_type {
            Some(name) => name.parse().unwrap_or_else(|e| {
                warn!("{e} in config, using '{}'", defaults.default_type);
                defaults.default_type
            }),
            None => defaults.default_type,
        };

        let max_message_length = match overrides.max_message_length {
            Some(n) if n >= MIN_MESSAGE_LENGTH => n,
            Some(n) => {
                warn!(
                    "maxMessageLength {n} is below {MIN_MESSAGE_LENGTH}, using {}",
                    defaults.max_message_length
                );
                defaults.max_message_length
            }
            None => defaults.max_message_length,
        };

        Config {
            scopes: overrides.scopes.unwrap_or(defaults.scopes),
            default_type,
            include_emoji: overrides.include_emoji.or(defaults.include_emoji),
            max_message_length,
            ticket_linking: merge_ticket_linking(defaults.ticket_linking, overrides.ticket_linking),
            learn_from_history: merge_learn_from_history(
                defaults.learn_from_history,
                overrides.learn_from_history,
            ),
            breaking_change_detection: merge_breaking(
                defaults.breaking_change_detection,
                overrides.breaking_change_detection,
            ),
            templates: merge_templates(defaults.templates, overrides.templates),
            ai: merge_ai(defaults.ai, overrides.ai),
        }
    }
}

fn merge_ticket_linking(d: TicketLinking, o: Option<PartialTicketLinking>) -> TicketLinking {
    let Some(o) = o else { return d };
    TicketLinking {
        enabled: o.enabled.unwrap_or(d.enabled),
        patterns: o.patterns.unwrap_or(d.patterns),
        prefix: o
            .prefix
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(d.prefix),
    }
}

fn merge_learn_from_history(d: LearnFromHistory, o: Option<PartialLearnFromHistory>) -> LearnFromHistory {
    let Some(o) = o else { return d };
    LearnFromHistory {
        enabled: o.enabled.unwrap_or(d.enabled),
        commit_count: o.commit_count.filter(|&n| n > 0).unwrap_or(d.commit_count),
    }
}

fn merge_breaking(
    d: BreakingChangeDetection,
    o: Option<PartialBreakingChangeDetection>,
) -> BreakingChangeDetection {
    let Some(o) = o else { return d };
    BreakingChangeDetection {
        enabled: o.enabled.unwrap_or(d.enabled),
        keywords: o.keywords.unwrap_or(d.keywords),
        include_footer: o.include_footer.unwrap_or(d.include_footer),
    }
}

fn merge_templates(d: Templates, o: Option<PartialTemplates>) -> Templates {
    let Some(o) = o else { return d };
    let non_blank = |t: Option<String>| t.filter(|t| !t.trim().is_empty());
    Templates {
        default: non_blank(o.default).or(d.default),
        no_scope: non_blank(o.no_scope).or(d.no_scope),
        with_body: non_blank(o.with_body).or(d.with_body),
    }
}

fn merge_ai(d: AiSettings, o: Option<PartialAiSettings>) -> AiSettings {
    let Some(o) = o else { return d };
    AiSettings {
        enabled: o.enabled.unwrap_or(d.enabled),
        provider: o.provider.map(|p| p.to_lowercase()).unwrap_or(d.provider),
        api_key: o.api_key.or(d.api_key),
        model: o.model.or(d.model),
        timeout_secs: o.timeout_secs.filter(|&s| s > 0).unwrap_or(d.timeout_secs),
    }
}

/// User-supplied configuration; every field optional.
///
/// Fields with the wrong JSON type are dropped individually (with a warning)
/// instead of rejecting the whole file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialConfig {
    #[serde(default, deserialize_with = "lenient")]
    pub scopes: Option<Vec<ScopeMapping>>,
    #[serde(default, deserialize_with = "lenient")]
    pub default_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub include_emoji: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub max_message_length: Option<usize>,
    #[serde(default, deserialize_with = "lenient")]
    pub ticket_linking: Option<PartialTicketLinking>,
    #[serde(default, deserialize_with = "lenient")]
    pub learn_from_history: Option<PartialLearnFromHistory>,
    #[serde(default, deserialize_with = "lenient")]
    pub breaking_change_detection: Option<PartialBreakingChangeDetection>,
    #[serde(default, deserialize_with = "lenient")]
    pub templates: Option<PartialTemplates>,
    #[serde(default, deserialize_with = "lenient")]
    pub ai: Option<PartialAiSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialTicketLinking {
    #[serde(default, deserialize_with = "lenient")]
    pub enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub patterns: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialLearnFromHistory {
    #[serde(default, deserialize_with = "lenient")]
    pub enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub commit_count: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialBreakingChangeDetection {
    #[serde(default, deserialize_with = "lenient")]
    pub enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub include_footer: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialTemplates {
    #[serde(default, deserialize_with = "lenient")]
    pub default: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub no_scope: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub with_body: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialAiSettings {
    #[serde(default, deserialize_with = "lenient")]
    pub enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub provider: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub api_key: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub timeout_secs: Option<u64>,
}

/// Deserialize a field, turning a type mismatch into `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            warn!("Ignoring invalid config value: {}", e);
            Ok(None)
        }
    }
}
