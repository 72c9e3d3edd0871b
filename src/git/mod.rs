//! Version-control access using git2-rs.

pub mod repository;

use git2::Oid;

use crate::analysis::ChangeSet;
use crate::error::GitError;

pub use repository::GitRepository;

/// Staged changes as seen by the analysis.
#[derive(Debug, Clone, Default)]
pub struct StagedSnapshot {
    pub changes: ChangeSet,
    pub diff: String,
    /// True when the diff text was cut at the size limit.
    pub truncated: bool,
}

/// Read-only repository facts plus the single commit side effect.
///
/// This abstraction allows mocking the repository in tests.
#[cfg_attr(test, mockall::automock)]
pub trait VersionControl {
    /// Staged changes (HEAD tree against the index).
    fn staged_snapshot(&self) -> Result<StagedSnapshot, GitError>;

    /// Short name of the checked-out branch, None when detached.
    fn current_branch(&self) -> Result<Option<String>, GitError>;

    /// Subjects of the most recent `limit` commits reachable from HEAD, newest first.
    fn recent_subjects(&self, limit: usize) -> Result<Vec<String>, GitError>;

    /// Commit the index with `message`.
    fn commit(&self, message: &str) -> Result<Oid, GitError>;
}
