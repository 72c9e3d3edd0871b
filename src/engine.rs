//! Suggestion pipeline: snapshot, classification, history, composition.

use git2::Oid;
use serde::Serialize;
use tracing::{debug, warn};

use crate::ai::{AiRequest, DescriptionProvider, augment_description, get_timeout};
use crate::analysis::{
    ChangeSet, ChangesByStatus, CommitType, FileTypeCounts, HistoryAnalyzer, StatusCounts,
    TicketReference, alternative_description, classify_explained, describe,
    detect_breaking_changes, detect_ticket, large_change_body, resolve_scope,
};
use crate::config::Config;
use crate::error::GitError;
use crate::git::VersionControl;
use crate::message::{CommitMessageVariant, append_ai_variant, compose};

/// Rule name reported for an empty change set.
pub const EMPTY_RULE: &str = "empty";

/// Everything derived from one change set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    #[serde(rename = "type")]
    pub commit_type: CommitType,
    /// Name of the cascade rule that decided the type.
    pub rule: &'static str,
    pub scope: Option<String>,
    pub description: String,
    /// Set only when it differs from `description`.
    pub alternative_description: Option<String>,
    /// Per-file summary, present for large changes.
    pub body: Option<String>,
    pub files_by_status: ChangesByStatus,
    pub is_large_change: bool,
    pub is_breaking_change: bool,
    pub breaking_reasons: Vec<String>,
}

/// Classify a change set. Pure: identical inputs give identical results.
pub fn classify_changes(changes: &ChangeSet, diff: &str, config: &Config) -> ClassificationResult {
    let files = &changes.files;
    let counts = FileTypeCounts::from_changes(files);
    let status = StatusCounts::from_changes(files);
    let description = describe(&counts, &status, files);

    let (commit_type, rule) = if changes.is_empty() {
        (config.default_type, EMPTY_RULE)
    } else {
        classify_explained(&counts, diff, files)
    };
    debug!("Classified as {} by rule '{}'", commit_type, rule);

    let alternative = alternative_description(&counts, files, diff);
    let breaking = detect_breaking_changes(diff, files, &config.breaking_change_detection);
    let is_large_change = changes.is_large_change();

    ClassificationResult {
        commit_type,
        rule,
        scope: resolve_scope(&changes.paths(), &config.scopes),
        alternative_description: (alternative != description).then_some(alternative),
        description,
        body: (is_large_change && !changes.is_empty()).then(|| large_change_body(files)),
        files_by_status: ChangesByStatus::from_changes(files),
        is_large_change,
        is_breaking_change: breaking.is_breaking,
        breaking_reasons: breaking.reasons,
    }
}

/// Result of one suggestion run.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestions {
    pub classification: ClassificationResult,
    pub ticket: Option<TicketReference>,
    /// At most [`MAX_VARIANTS`](crate::message::compose::MAX_VARIANTS) deterministic
    /// variants, plus one trailing "AI Suggestion" after
    /// [`CommitAssistant::suggest_with_ai`] succeeds.
    pub variants: Vec<CommitMessageVariant>,
    #[serde(skip)]
    pub diff: String,
}

/// Ties the repository, configuration and history together.
pub struct CommitAssistant<'h, V> {
    vcs: V,
    config: Config,
    history: HistoryAnalyzer<'h>,
}

impl<V: VersionControl> CommitAssistant<'static, V> {
    /// Assistant using the process-wide history cache.
    pub fn new(vcs: V, config: Config) -> Self {
        Self::with_history(vcs, config, HistoryAnalyzer::global())
    }
}

impl<'h, V: VersionControl> CommitAssistant<'h, V> {
    pub fn with_history(vcs: V, config: Config, history: HistoryAnalyzer<'h>) -> Self {
        Self {
            vcs,
            config,
            history,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Classify the staged changes and compose every deterministic variant.
    pub fn analyze(&self) -> Result<Suggestions, GitError> {
        let snapshot = self.vcs.staged_snapshot()?;
        let classification = classify_changes(&snapshot.changes, &snapshot.diff, &self.config);

        let branch = self.vcs.current_branch().unwrap_or_else(|e| {
            warn!("Failed to read current branch: {}", e);
            None
        });
        let ticket = detect_ticket(branch.as_deref(), &self.config.ticket_linking);

        // History is read only when emoji or scope still need a default.
        let needs_history = self.config.include_emoji.is_none() || classification.scope.is_none();
        let profile = needs_history
            .then(|| self.history.analyze(&self.vcs, &self.config.learn_from_history));

        let variants = compose(&classification, profile.as_ref(), ticket.as_ref(), &self.config);
        Ok(Suggestions {
            classification,
            ticket,
            variants,
            diff: snapshot.diff,
        })
    }

    pub fn suggest(&self) -> Result<Vec<CommitMessageVariant>, GitError> {
        Ok(self.analyze()?.variants)
    }

    /// The recommended variant.
    pub fn generate_commit_message(&self) -> Result<CommitMessageVariant, GitError> {
        self.suggest()?
            .into_iter()
            .next()
            .ok_or(GitError::NothingStaged)
    }

    /// [`analyze`](Self::analyze), then append an AI variant when enabled and successful.
    ///
    /// The deterministic variants are computed first and never change.
    pub async fn suggest_with_ai(
        &self,
        provider: &dyn DescriptionProvider,
    ) -> Result<Suggestions, GitError> {
        let mut suggestions = self.analyze()?;
        if !self.config.ai.enabled || suggestions.classification.files_by_status.paths().is_empty()
        {
            return Ok(suggestions);
        }

        let request = AiRequest::new(&suggestions.diff, &suggestions.classification);
        let limit = get_timeout(self.config.ai.timeout_secs);
        if let Some(description) = augment_description(provider, &request, limit).await {
            append_ai_variant(&mut suggestions.variants, &description, &self.config);
        }
        Ok(suggestions)
    }

    pub fn commit(&self, message: &str) -> Result<Oid, GitError> {
        let oid = self.vcs.commit(message)?;
        debug!("Created commit {}", oid);
        Ok(oid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockDescriptionProvider;
    use crate::analysis::history::HistoryCache;
    use crate::analysis::{FileChange, FileStatus};
    use crate::config::ScopeMapping;
    use crate::error::AiError;
    use crate::git::{MockVersionControl, StagedSnapshot};
    use crate::message::compose::{LABEL_AI, LABEL_NO_TICKET};

    fn snapshot(files: Vec<FileChange>, diff: &str) -> StagedSnapshot {
        StagedSnapshot {
            changes: ChangeSet::new(files, 0, 0),
            diff: diff.to_string(),
            truncated: false,
        }
    }

    fn mock_vcs(snap: StagedSnapshot, branch: Option<&str>) -> MockVersionControl {
        let mut vcs = MockVersionControl::new();
        vcs.expect_staged_snapshot()
            .returning(move || Ok(snap.clone()));
        let branch = branch.map(str::to_string);
        vcs.expect_current_branch()
            .returning(move || Ok(branch.clone()));
        vcs.expect_recent_subjects().returning(|_| Ok(Vec::new()));
        vcs
    }

    fn quiet_config() -> Config {
        Config {
            include_emoji: Some(false),
            ..Config::default()
        }
    }

    #[test]
    fn test_added_file_with_scope_mapping() {
        let config = Config {
            scopes: vec![ScopeMapping::new("src/api", "api")],
            ..quiet_config()
        };
        let changes = ChangeSet::new(vec![FileChange::new(FileStatus::Added, "src/api/users.ts")], 0, 0);

        let result = classify_changes(&changes, "", &config);
        assert_eq!(result.commit_type, CommitType::Feat);
        assert_eq!(result.scope.as_deref(), Some("api"));
        assert_eq!(result.description, "add users.ts");
        assert!(!result.is_large_change);
        assert_eq!(result.body, None);
    }

    #[test]
    fn test_readme_is_docs() {
        let changes = ChangeSet::new(vec![FileChange::new(FileStatus::Modified, "README.md")], 1, 1);
        let result = classify_changes(&changes, "-old\n+new\n", &quiet_config());
        assert_eq!(result.commit_type, CommitType::Docs);
        assert_eq!(result.description, "update README.md");
    }

    #[test]
    fn test_empty_change_set_uses_default_type() {
        let config = Config {
            default_type: CommitType::Fix,
            ..quiet_config()
        };
        let result = classify_changes(&ChangeSet::default(), "", &config);
        assert_eq!(result.commit_type, CommitType::Fix);
        assert_eq!(result.rule, EMPTY_RULE);
        assert_eq!(result.description, "update 0 files");
        assert!(!result.is_breaking_change);
    }

    #[test]
    fn test_large_change_has_body() {
        let files: Vec<FileChange> = ["src/a.rs", "src/b.rs", "src/c.rs"]
            .iter()
            .map(|p| FileChange::new(FileStatus::Modified, *p))
            .collect();
        let result = classify_changes(&ChangeSet::new(files, 2, 2), "", &quiet_config());
        assert!(result.is_large_change);
        assert_eq!(
            result.body.as_deref(),
            Some("- update src/a.rs\n- update src/b.rs\n- update src/c.rs")
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let changes = ChangeSet::new(
            vec![
                FileChange::new(FileStatus::Modified, "src/lib.rs"),
                FileChange::new(FileStatus::Deleted, "src/old.rs"),
            ],
            5,
            9,
        );
        let diff = "-pub fn old() {}\n+pub fn new() {}\n";
        let first = classify_changes(&changes, diff, &quiet_config());
        let second = classify_changes(&changes, diff, &quiet_config());
        assert_eq!(first, second);
    }

    #[test]
    fn test_suggest_with_ticket_and_breaking_change() {
        let snap = snapshot(
            vec![FileChange::new(FileStatus::Modified, "src/api.ts")],
            "-export function oldApi() {\n+function internal() {\n",
        );
        let vcs = mock_vcs(snap, Some("feature/ABC-123-add-login"));
        let cache = HistoryCache::new();
        let assistant =
            CommitAssistant::with_history(vcs, quiet_config(), HistoryAnalyzer::with_cache(&cache));

        let variants = assistant.suggest().unwrap();
        let first = &variants[0];
        assert!(first.is_breaking);
        assert!(first.full.lines().next().unwrap().contains("!:"));
        assert!(first.full.contains("BREAKING CHANGE:"));
        for v in &variants {
            assert_eq!(v.full.ends_with("Refs: ABC-123"), v.label != LABEL_NO_TICKET);
        }
    }

    #[test]
    fn test_history_skipped_when_not_needed() {
        let config = Config {
            scopes: vec![ScopeMapping::new("src", "core")],
            ..quiet_config()
        };
        let snap = snapshot(vec![FileChange::new(FileStatus::Added, "src/a.rs")], "");
        let mut vcs = MockVersionControl::new();
        vcs.expect_staged_snapshot()
            .returning(move || Ok(snap.clone()));
        vcs.expect_current_branch().returning(|| Ok(None));
        vcs.expect_recent_subjects().never();

        let cache = HistoryCache::new();
        let assistant =
            CommitAssistant::with_history(vcs, config, HistoryAnalyzer::with_cache(&cache));
        let message = assistant.generate_commit_message().unwrap();
        assert_eq!(message.full, "feat(core): add a.rs");
    }

    #[test]
    fn test_branch_error_is_not_fatal() {
        let snap = snapshot(vec![FileChange::new(FileStatus::Added, "notes.txt")], "");
        let mut vcs = MockVersionControl::new();
        vcs.expect_staged_snapshot()
            .returning(move || Ok(snap.clone()));
        vcs.expect_current_branch()
            .returning(|| Err(GitError::HeadFailed(git2::Error::from_str("bad HEAD"))));
        vcs.expect_recent_subjects().returning(|_| Ok(Vec::new()));

        let cache = HistoryCache::new();
        let assistant =
            CommitAssistant::with_history(vcs, quiet_config(), HistoryAnalyzer::with_cache(&cache));
        let suggestions = assistant.analyze().unwrap();
        assert_eq!(suggestions.ticket, None);
        assert!(!suggestions.variants.is_empty());
    }

    #[tokio::test]
    async fn test_ai_variant_appended_last() {
        let snap = snapshot(vec![FileChange::new(FileStatus::Added, "src/api/users.ts")], "+x\n");
        let vcs = mock_vcs(snap, None);
        let config = Config {
            ai: crate::config::AiSettings {
                enabled: true,
                ..Default::default()
            },
            ..quiet_config()
        };
        let cache = HistoryCache::new();
        let assistant =
            CommitAssistant::with_history(vcs, config, HistoryAnalyzer::with_cache(&cache));

        let deterministic = assistant.suggest().unwrap();
        let mut provider = MockDescriptionProvider::new();
        provider
            .expect_describe()
            .times(1)
            .returning(|_| Ok("expose user endpoints".to_string()));

        let suggestions = assistant.suggest_with_ai(&provider).await.unwrap();
        assert_eq!(&suggestions.variants[..deterministic.len()], &deterministic[..]);
        let last = suggestions.variants.last().unwrap();
        assert_eq!(last.label, LABEL_AI);
        assert_eq!(last.description, "expose user endpoints");
    }

    #[tokio::test]
    async fn test_ai_failure_keeps_deterministic_variants() {
        let snap = snapshot(vec![FileChange::new(FileStatus::Added, "src/api/users.ts")], "");
        let vcs = mock_vcs(snap, None);
        let config = Config {
            ai: crate::config::AiSettings {
                enabled: true,
                ..Default::default()
            },
            ..quiet_config()
        };
        let cache = HistoryCache::new();
        let assistant =
            CommitAssistant::with_history(vcs, config, HistoryAnalyzer::with_cache(&cache));

        let mut provider = MockDescriptionProvider::new();
        provider
            .expect_describe()
            .returning(|_| Err(AiError::Timeout(15)));

        let suggestions = assistant.suggest_with_ai(&provider).await.unwrap();
        assert_eq!(suggestions.variants, assistant.suggest().unwrap());
    }

    #[tokio::test]
    async fn test_ai_disabled_never_calls_provider() {
        let snap = snapshot(vec![FileChange::new(FileStatus::Added, "src/a.ts")], "");
        let vcs = mock_vcs(snap, None);
        let cache = HistoryCache::new();
        let assistant =
            CommitAssistant::with_history(vcs, quiet_config(), HistoryAnalyzer::with_cache(&cache));

        let mut provider = MockDescriptionProvider::new();
        provider.expect_describe().never();
        assistant.suggest_with_ai(&provider).await.unwrap();
    }

    #[test]
    fn test_commit_delegates_to_vcs() {
        let mut vcs = MockVersionControl::new();
        vcs.expect_commit()
            .withf(|m| m.trim() == "feat: add a.rs")
            .times(1)
            .returning(|_| Ok(Oid::zero()));

        let cache = HistoryCache::new();
        let assistant =
            CommitAssistant::with_history(vcs, quiet_config(), HistoryAnalyzer::with_cache(&cache));
        assert_eq!(assistant.commit("feat: add a.rs").unwrap(), Oid::zero());
    }
}
