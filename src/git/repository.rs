//! `VersionControl` backed by a git2 repository.

use std::path::{Path, PathBuf};

use git2::{
    Delta, Diff, DiffFindOptions, DiffFormat, ErrorCode, Oid, Repository, Sort, Tree,
};
use tracing::{debug, warn};

use crate::analysis::{ChangeSet, FileChange, FileStatus};
use crate::error::GitError;
use crate::git::{StagedSnapshot, VersionControl};

/// Maximum characters for the unified diff text before truncation.
pub const MAX_DIFF_LENGTH: usize = 30_000;

pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open the repository containing `path`, searching parent directories.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self, GitError> {
        let repo = Repository::discover(path).map_err(GitError::OpenRepository)?;
        Ok(Self { repo })
    }

    pub fn from_repository(repo: Repository) -> Self {
        Self { repo }
    }

    /// Working directory root, or the git dir for bare repositories.
    pub fn root(&self) -> PathBuf {
        self.repo
            .workdir()
            .unwrap_or_else(|| self.repo.path())
            .to_path_buf()
    }
}

impl VersionControl for GitRepository {
    fn staged_snapshot(&self) -> Result<StagedSnapshot, GitError> {
        let head_tree = resolve_head_tree(&self.repo)?;
        let mut diff = self
            .repo
            .diff_tree_to_index(head_tree.as_ref(), None, None)
            .map_err(GitError::DiffFailed)?;
        diff.find_similar(Some(DiffFindOptions::new().renames(true)))
            .map_err(GitError::DiffFailed)?;

        let files = collect_files(&diff);
        let stats = diff.stats().map_err(GitError::DiffFailed)?;
        let mut text = String::new();
        let truncated = append_diff_text(&diff, &mut text);
        if truncated {
            debug!("Staged diff truncated at {} characters", MAX_DIFF_LENGTH);
        }

        Ok(StagedSnapshot {
            changes: ChangeSet::new(files, stats.insertions(), stats.deletions()),
            diff: text,
            truncated,
        })
    }

    fn current_branch(&self) -> Result<Option<String>, GitError> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().map(str::to_string)),
            Ok(_) => Ok(None),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                // HEAD still names the branch the first commit will create.
                let head = self
                    .repo
                    .find_reference("HEAD")
                    .map_err(GitError::HeadFailed)?;
                Ok(head
                    .symbolic_target()
                    .and_then(|target| target.strip_prefix("refs/heads/"))
                    .map(str::to_string))
            }
            Err(e) => Err(GitError::HeadFailed(e)),
        }
    }

    fn recent_subjects(&self, limit: usize) -> Result<Vec<String>, GitError> {
        if limit == 0 || resolve_head_tree(&self.repo)?.is_none() {
            return Ok(Vec::new());
        }

        let mut revwalk = self.repo.revwalk().map_err(GitError::RevwalkError)?;
        revwalk.push_head().map_err(GitError::RevwalkError)?;
        revwalk.set_sorting(Sort::TIME).map_err(GitError::RevwalkError)?;

        let mut subjects = Vec::with_capacity(limit);
        for oid in revwalk.take(limit) {
            let oid = oid.map_err(GitError::RevwalkError)?;
            let commit = self.repo.find_commit(oid).map_err(GitError::RevwalkError)?;
            let subject = commit
                .message()
                .and_then(|m| m.lines().next())
                .unwrap_or("")
                .trim();
            if !subject.is_empty() {
                subjects.push(subject.to_string());
            }
        }
        Ok(subjects)
    }

    fn commit(&self, message: &str) -> Result<Oid, GitError> {
        let mut index = self.repo.index().map_err(GitError::CommitFailed)?;
        let tree_id = index.write_tree().map_err(GitError::CommitFailed)?;
        let tree = self.repo.find_tree(tree_id).map_err(GitError::CommitFailed)?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit().map_err(GitError::HeadFailed)?),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                None
            }
            Err(e) => return Err(GitError::HeadFailed(e)),
        };

        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_id,
            None => tree.is_empty(),
        };
        if unchanged {
            return Err(GitError::NothingStaged);
        }

        let sig = self.repo.signature().map_err(GitError::ConfigError)?;
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .map_err(GitError::CommitFailed)
    }
}

/// Resolve the HEAD tree, distinguishing empty-repo errors from real failures.
///
/// Returns `Ok(None)` for repos with no commits (unborn branch / not found).
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, GitError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(GitError::HeadFailed(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(GitError::HeadFailed)?;
    Ok(Some(tree))
}

fn collect_files(diff: &Diff<'_>) -> Vec<FileChange> {
    diff.deltas()
        .filter_map(|delta| {
            let new_path = delta.new_file().path().map(|p| p.to_string_lossy().into_owned());
            let old_path = delta.old_file().path().map(|p| p.to_string_lossy().into_owned());

            let status = match delta.status() {
                Delta::Added | Delta::Copied => FileStatus::Added,
                Delta::Modified | Delta::Typechange => FileStatus::Modified,
                Delta::Deleted => FileStatus::Deleted,
                Delta::Renamed => FileStatus::Renamed,
                _ => FileStatus::Unknown,
            };

            match status {
                FileStatus::Renamed => {
                    let path = new_path.or_else(|| old_path.clone())?;
                    Some(match old_path {
                        Some(old) => FileChange::renamed(old, path),
                        None => FileChange::new(FileStatus::Renamed, path),
                    })
                }
                _ => new_path
                    .or(old_path)
                    .filter(|p| !p.is_empty())
                    .map(|path| FileChange::new(status, path)),
            }
        })
        .collect()
}

/// Append unified diff text, stopping at [`MAX_DIFF_LENGTH`]. Returns true when truncated.
fn append_diff_text(diff: &Diff<'_>, text: &mut String) -> bool {
    let mut truncated = false;

    if let Err(e) = diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let content = String::from_utf8_lossy(line.content());

        if text.len() + content.len() + 1 > MAX_DIFF_LENGTH {
            truncated = true;
            return false;
        }

        let origin = line.origin();
        if origin == '+' || origin == '-' || origin == ' ' {
            text.push(origin);
        }
        text.push_str(&content);
        true
    }) {
        // Returning false from the callback aborts the walk with a user error.
        if !truncated {
            warn!("Failed to collect diff text: {e}");
            truncated = true;
        }
    }

    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;

    fn init() -> (tempfile::TempDir, GitRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test").unwrap();
        config.set_str("user.email", "test@test.com").unwrap();
        (dir, GitRepository::from_repository(repo))
    }

    fn stage(dir: &Path, repo: &GitRepository, path: &str, content: &str) {
        let full = dir.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
        let mut index = repo.repo.index().unwrap();
        index.add_path(Path::new(path)).unwrap();
        index.write().unwrap();
    }

    fn commit_all(repo: &GitRepository, message: &str) -> Oid {
        let sig = Signature::now("Test", "test@test.com").unwrap();
        let mut index = repo.repo.index().unwrap();
        let tree = repo.repo.find_tree(index.write_tree().unwrap()).unwrap();
        let parent = repo.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    #[test]
    fn test_snapshot_on_unborn_head() {
        let (dir, repo) = init();
        stage(dir.path(), &repo, "src/main.rs", "fn main() {}\n");

        let snapshot = repo.staged_snapshot().unwrap();
        assert_eq!(
            snapshot.changes.files,
            vec![FileChange::new(FileStatus::Added, "src/main.rs")]
        );
        assert_eq!(snapshot.changes.stats.insertions, 1);
        assert!(snapshot.diff.contains("+fn main() {}"));
        assert!(!snapshot.truncated);
    }

    #[test]
    fn test_snapshot_ignores_unstaged_files() {
        let (dir, repo) = init();
        stage(dir.path(), &repo, "a.txt", "a\n");
        commit_all(&repo, "init");
        std::fs::write(dir.path().join("untracked.txt"), "x\n").unwrap();

        let snapshot = repo.staged_snapshot().unwrap();
        assert!(snapshot.changes.is_empty());
    }

    #[test]
    fn test_snapshot_detects_rename() {
        let (dir, repo) = init();
        let content = "line one\nline two\nline three\nline four\n";
        stage(dir.path(), &repo, "src/old.ts", content);
        commit_all(&repo, "init");

        let mut index = repo.repo.index().unwrap();
        index.remove_path(Path::new("src/old.ts")).unwrap();
        index.write().unwrap();
        std::fs::remove_file(dir.path().join("src/old.ts")).unwrap();
        stage(dir.path(), &repo, "src/new.ts", content);

        let snapshot = repo.staged_snapshot().unwrap();
        assert_eq!(
            snapshot.changes.files,
            vec![FileChange::renamed("src/old.ts", "src/new.ts")]
        );
    }

    #[test]
    fn test_snapshot_truncates_large_diff() {
        let (dir, repo) = init();
        let big: String = (0..5_000).map(|i| format!("line number {i}\n")).collect();
        stage(dir.path(), &repo, "big.txt", &big);

        let snapshot = repo.staged_snapshot().unwrap();
        assert!(snapshot.truncated);
        assert!(snapshot.diff.len() <= MAX_DIFF_LENGTH);
        assert_eq!(snapshot.changes.stats.insertions, 5_000);
    }

    #[test]
    fn test_current_branch_unborn_and_born() {
        let (dir, repo) = init();
        let unborn = repo.current_branch().unwrap();
        assert!(unborn.is_some());

        stage(dir.path(), &repo, "a.txt", "a\n");
        let oid = commit_all(&repo, "init");
        let commit = repo.repo.find_commit(oid).unwrap();
        repo.repo.branch("feature/ABC-1", &commit, false).unwrap();
        repo.repo.set_head("refs/heads/feature/ABC-1").unwrap();

        assert_eq!(repo.current_branch().unwrap().as_deref(), Some("feature/ABC-1"));

        repo.repo.set_head_detached(oid).unwrap();
        assert_eq!(repo.current_branch().unwrap(), None);
    }

    #[test]
    fn test_recent_subjects() {
        let (dir, repo) = init();
        assert!(repo.recent_subjects(10).unwrap().is_empty());

        for (i, msg) in ["feat: one", "fix: two\n\nbody", "docs: three"].iter().enumerate() {
            stage(dir.path(), &repo, "f.txt", &i.to_string());
            commit_all(&repo, msg);
        }

        let subjects = repo.recent_subjects(2).unwrap();
        assert_eq!(subjects.len(), 2);
        assert!(subjects.contains(&"docs: three".to_string()));
        assert_eq!(repo.recent_subjects(10).unwrap().len(), 3);
    }

    #[test]
    fn test_commit_creates_root_then_child() {
        let (dir, repo) = init();
        assert!(matches!(repo.commit("empty"), Err(GitError::NothingStaged)));

        stage(dir.path(), &repo, "a.txt", "a\n");
        let root = repo.commit("feat: first").unwrap();
        assert_eq!(repo.repo.find_commit(root).unwrap().parent_count(), 0);
        assert!(matches!(repo.commit("again"), Err(GitError::NothingStaged)));

        stage(dir.path(), &repo, "b.txt", "b\n");
        let child = repo.commit("feat: second").unwrap();
        let child = repo.repo.find_commit(child).unwrap();
        assert_eq!(child.parent_id(0).unwrap(), root);
        assert_eq!(child.message(), Some("feat: second"));
    }
}
