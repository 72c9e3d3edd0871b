//! Ticket references inferred from the branch name.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::TicketLinking;

/// Where a ticket id was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketSource {
    Branch,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketReference {
    pub id: String,
    pub source: TicketSource,
    pub prefix: String,
}

impl TicketReference {
    /// Footer line, e.g. `Refs: ABC-123`.
    pub fn footer(&self) -> String {
        format!("{} {}", self.prefix, self.id)
    }
}

static DEFAULT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"[A-Z][A-Z0-9]+-\d+", r"#\d+", r"(?i)\b(?:issue|gh|bug)[-_/]?\d+"]
        .into_iter()
        .map(|p| Regex::new(p).expect("ticket pattern must compile"))
        .collect()
});

/// Detect a ticket id in `branch`.
///
/// Custom patterns are tried first; the first capture group is the id when
/// present, otherwise the whole match.
pub fn detect_ticket(branch: Option<&str>, settings: &TicketLinking) -> Option<TicketReference> {
    if !settings.enabled {
        return None;
    }
    let branch = branch?.trim();
    if branch.is_empty() {
        return None;
    }

    let reference = |id: &str, source| TicketReference {
        id: id.to_string(),
        source,
        prefix: settings.prefix.clone(),
    };

    for pattern in &settings.patterns {
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(e) => {
                warn!("Ignoring invalid ticket pattern '{}': {}", pattern, e);
                continue;
            }
        };
        if let Some(caps) = re.captures(branch) {
            let id = caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str());
            if let Some(id) = id.filter(|id| !id.is_empty()) {
                debug!("Ticket {} from custom pattern '{}'", id, pattern);
                return Some(reference(id, TicketSource::Custom));
            }
        }
    }

    DEFAULT_PATTERNS
        .iter()
        .find_map(|re| re.find(branch))
        .map(|m| reference(m.as_str(), TicketSource::Branch))
}
