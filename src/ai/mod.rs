//! Optional AI-written descriptions.
//!
//! Best effort only: every failure is logged and turns into `None`, and the
//! deterministic suggestions are never altered.

pub mod prompt;
pub mod subprocess;

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::engine::ClassificationResult;
use crate::error::AiError;

pub use prompt::{MAX_AI_DIFF_CHARS, sanitize_diff};
pub use subprocess::{CliProvider, get_timeout};

/// Input sent to a description provider.
#[derive(Debug, Clone, PartialEq)]
pub struct AiRequest {
    /// Sanitized diff, at most [`MAX_AI_DIFF_CHARS`] characters.
    pub diff: String,
    pub summary: String,
}

impl AiRequest {
    pub fn new(diff: &str, classification: &ClassificationResult) -> Self {
        let mut summary = format!(
            "type: {}\ndescription: {}",
            classification.commit_type, classification.description
        );
        if let Some(scope) = &classification.scope {
            summary.push_str(&format!("\nscope: {scope}"));
        }
        if classification.is_breaking_change {
            summary.push_str("\nbreaking: yes");
        }
        let paths = classification.files_by_status.paths();
        if !paths.is_empty() {
            summary.push_str(&format!("\nfiles: {}", paths.join(", ")));
        }

        Self {
            diff: sanitize_diff(diff, MAX_AI_DIFF_CHARS),
            summary,
        }
    }
}

/// Trait for producing a commit description from a request.
///
/// This abstraction allows mocking the AI subprocess in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DescriptionProvider: Send + Sync {
    async fn describe(&self, request: &AiRequest) -> Result<String, AiError>;
}

/// Ask `provider` for a description, waiting at most `limit`.
///
/// Failures, timeouts and blank answers yield `None`; nothing is retried.
pub async fn augment_description(
    provider: &dyn DescriptionProvider,
    request: &AiRequest,
    limit: Duration,
) -> Option<String> {
    let result = match timeout(limit, provider.describe(request)).await {
        Ok(result) => result,
        Err(_) => Err(AiError::Timeout(limit.as_secs())),
    };

    match result {
        Ok(description) if !description.trim().is_empty() => {
            debug!("AI description: {}", description.trim());
            Some(description.trim().to_string())
        }
        Ok(_) => {
            warn!("AI description was empty; keeping rule-based suggestions");
            None
        }
        Err(e) => {
            warn!("AI description failed: {}; keeping rule-based suggestions", e);
            None
        }
    }
}
