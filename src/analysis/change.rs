//! Staged change facts and path categorisation.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Status of a staged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Unknown,
}

impl FileStatus {
    /// Imperative verb used when describing a single change with this status.
    pub fn verb(self) -> &'static str {
        match self {
            FileStatus::Added => "add",
            FileStatus::Deleted => "remove",
            FileStatus::Renamed => "rename",
            FileStatus::Modified | FileStatus::Unknown => "update",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Added => write!(f, "Added"),
            FileStatus::Modified => write!(f, "Modified"),
            FileStatus::Deleted => write!(f, "Deleted"),
            FileStatus::Renamed => write!(f, "Renamed"),
            FileStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A single staged file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub status: FileStatus,
    pub path: String,
    /// Previous path for renamed files (None for non-rename changes).
    pub old_path: Option<String>,
}

impl FileChange {
    pub fn new(status: FileStatus, path: impl Into<String>) -> Self {
        Self {
            status,
            path: path.into(),
            old_path: None,
        }
    }

    pub fn renamed(old_path: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            status: FileStatus::Renamed,
            path: path.into(),
            old_path: Some(old_path.into()),
        }
    }

    /// Last path component.
    pub fn file_name(&self) -> &str {
        file_name(&self.path)
    }

    pub fn category(&self) -> FileCategory {
        FileCategory::of(&self.path)
    }
}

pub(crate) fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Aggregate line statistics for a change set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

/// Files that qualify a change set as large.
pub const LARGE_CHANGE_FILES: usize = 3;
/// Changed lines that qualify a change set as large.
pub const LARGE_CHANGE_LINES: usize = 100;

/// The ordered staged files plus their aggregate stats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub files: Vec<FileChange>,
    pub stats: DiffStats,
}

impl ChangeSet {
    /// Build a change set, counting files from the list.
    pub fn new(files: Vec<FileChange>, insertions: usize, deletions: usize) -> Self {
        let stats = DiffStats {
            files_changed: files.len(),
            insertions,
            deletions,
        };
        Self { files, stats }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.path.as_str()).collect()
    }

    pub fn is_large_change(&self) -> bool {
        self.stats.files_changed >= LARGE_CHANGE_FILES
            || self.stats.insertions + self.stats.deletions >= LARGE_CHANGE_LINES
    }
}

/// Coarse category of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Test,
    Docs,
    Config,
    Source,
}

impl FileCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Test => "test",
            FileCategory::Docs => "docs",
            FileCategory::Config => "config",
            FileCategory::Source => "source",
        }
    }

    /// Classify a path. The first matching pattern wins; anything unmatched is source.
    pub fn of(path: &str) -> Self {
        CATEGORY_PATTERNS
            .iter()
            .find(|(_, re)| re.is_match(path))
            .map(|(category, _)| *category)
            .unwrap_or(FileCategory::Source)
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static CATEGORY_PATTERNS: LazyLock<Vec<(FileCategory, Regex)>> = LazyLock::new(|| {
    [
        (FileCategory::Test, r"(^|/)(__tests__|__mocks__|tests?|specs?)/"),
        (FileCategory::Test, r"\.(test|spec)\.[A-Za-z0-9]+$"),
        (FileCategory::Test, r"(_test\.(go|py|rs)|(^|/)test_[^/]+\.py)$"),
        (FileCategory::Config, r"(^|/)requirements[^/]*\.txt$"),
        (FileCategory::Docs, r"(?i)\.(md|mdx|markdown|rst|adoc|txt)$"),
        (FileCategory::Docs, r"(^|/)docs?/"),
        (FileCategory::Docs, r"(^|/)(README|CHANGELOG|LICENSE|CONTRIBUTING|AUTHORS)[^/]*$"),
        (FileCategory::Config, r"(?i)\.(json|ya?ml|toml|ini|cfg|conf|lock|properties)$"),
        (FileCategory::Config, r"(^|/)\.[^/]*rc(\.[A-Za-z]+)?$"),
        (FileCategory::Config, r"\.config\.[A-Za-z]+$"),
        (
            FileCategory::Config,
            r"(^|/)(Dockerfile|Makefile|\.gitignore|\.gitattributes|\.editorconfig|\.env[^/]*)$",
        ),
    ]
    .into_iter()
    .map(|(category, pattern)| {
        (
            category,
            Regex::new(pattern).expect("category pattern must compile"),
        )
    })
    .collect()
});

/// Number of paths per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileTypeCounts {
    pub test: usize,
    pub docs: usize,
    pub config: usize,
    pub source: usize,
}

impl FileTypeCounts {
    pub fn from_changes(changes: &[FileChange]) -> Self {
        let mut counts = Self::default();
        for change in changes {
            match change.category() {
                FileCategory::Test => counts.test += 1,
                FileCategory::Docs => counts.docs += 1,
                FileCategory::Config => counts.config += 1,
                FileCategory::Source => counts.source += 1,
            }
        }
        counts
    }

    pub fn get(&self, category: FileCategory) -> usize {
        match category {
            FileCategory::Test => self.test,
            FileCategory::Docs => self.docs,
            FileCategory::Config => self.config,
            FileCategory::Source => self.source,
        }
    }

    pub fn total(&self) -> usize {
        self.test + self.docs + self.config + self.source
    }

    /// True when every counted path falls in `category`.
    pub fn only(&self, category: FileCategory) -> bool {
        let n = self.get(category);
        n > 0 && n == self.total()
    }
}

/// Number of files per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub renamed: usize,
    pub unknown: usize,
}

impl StatusCounts {
    pub fn from_changes(changes: &[FileChange]) -> Self {
        let mut counts = Self::default();
        for change in changes {
            match change.status {
                FileStatus::Added => counts.added += 1,
                FileStatus::Modified => counts.modified += 1,
                FileStatus::Deleted => counts.deleted += 1,
                FileStatus::Renamed => counts.renamed += 1,
                FileStatus::Unknown => counts.unknown += 1,
            }
        }
        counts
    }
}

/// Paths grouped by status, in change-set order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangesByStatus {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    pub renamed: Vec<String>,
    pub unknown: Vec<String>,
}

impl ChangesByStatus {
    pub fn from_changes(changes: &[FileChange]) -> Self {
        let mut grouped = Self::default();
        for change in changes {
            let bucket = match change.status {
                FileStatus::Added => &mut grouped.added,
                FileStatus::Modified => &mut grouped.modified,
                FileStatus::Deleted => &mut grouped.deleted,
                FileStatus::Renamed => &mut grouped.renamed,
                FileStatus::Unknown => &mut grouped.unknown,
            };
            bucket.push(change.path.clone());
        }
        grouped
    }

    /// All paths, grouped by status.
    pub fn paths(&self) -> Vec<&str> {
        [
            &self.added,
            &self.modified,
            &self.deleted,
            &self.renamed,
            &self.unknown,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect()
    }
}

/// Added and removed lines of a unified diff, without file headers.
#[derive(Debug, Default)]
pub(crate) struct DiffLines<'a> {
    pub added: Vec<&'a str>,
    pub removed: Vec<&'a str>,
}

impl<'a> DiffLines<'a> {
    pub fn parse(diff: &'a str) -> Self {
        let mut lines = Self::default();
        // `---`/`+++` are file headers only between `diff --git` and the first hunk.
        let mut in_hunk = false;
        for line in diff.lines() {
            if line.starts_with("diff --git ") {
                in_hunk = false;
                continue;
            }
            if line.starts_with("@@") {
                in_hunk = true;
                continue;
            }
            if !in_hunk && (line.starts_with("+++") || line.starts_with("---")) {
                continue;
            }
            if let Some(rest) = line.strip_prefix('+') {
                lines.added.push(rest);
            } else if let Some(rest) = line.strip_prefix('-') {
                lines.removed.push(rest);
            }
        }
        lines
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_patterns() {
        assert_eq!(FileCategory::of("src/api/users.test.ts"), FileCategory::Test);
        assert_eq!(FileCategory::of("tests/engine_test.rs"), FileCategory::Test);
        assert_eq!(FileCategory::of("pkg/store_test.go"), FileCategory::Test);
        assert_eq!(FileCategory::of("README.md"), FileCategory::Docs);
        assert_eq!(FileCategory::of("docs/guide/intro.html"), FileCategory::Docs);
        assert_eq!(FileCategory::of("package.json"), FileCategory::Config);
        assert_eq!(FileCategory::of(".eslintrc"), FileCategory::Config);
        assert_eq!(FileCategory::of("vite.config.ts"), FileCategory::Config);
        assert_eq!(FileCategory::of("Dockerfile"), FileCategory::Config);
        assert_eq!(FileCategory::of("src/main.rs"), FileCategory::Source);
    }

    #[test]
    fn test_first_matching_category_wins() {
        // A markdown file under tests/ is a test file, not docs.
        assert_eq!(FileCategory::of("tests/fixtures/notes.md"), FileCategory::Test);
        // A json fixture in docs/ is docs, not config.
        assert_eq!(FileCategory::of("docs/schema.json"), FileCategory::Docs);
    }

    #[test]
    fn test_file_type_counts() {
        let changes = vec![
            FileChange::new(FileStatus::Modified, "src/lib.rs"),
            FileChange::new(FileStatus::Added, "src/lib.test.ts"),
            FileChange::new(FileStatus::Modified, "README.md"),
        ];
        let counts = FileTypeCounts::from_changes(&changes);
        assert_eq!(counts.source, 1);
        assert_eq!(counts.test, 1);
        assert_eq!(counts.docs, 1);
        assert_eq!(counts.total(), 3);
        assert!(!counts.only(FileCategory::Source));
    }

    #[test]
    fn test_empty_counts() {
        let counts = FileTypeCounts::from_changes(&[]);
        assert_eq!(counts, FileTypeCounts::default());
        assert!(!counts.only(FileCategory::Docs));
    }

    #[test]
    fn test_is_large_change_thresholds() {
        let two_files = vec![
            FileChange::new(FileStatus::Modified, "a.rs"),
            FileChange::new(FileStatus::Modified, "b.rs"),
        ];
        assert!(!ChangeSet::new(two_files.clone(), 60, 39).is_large_change());
        assert!(ChangeSet::new(two_files.clone(), 60, 40).is_large_change());

        let mut three = two_files;
        three.push(FileChange::new(FileStatus::Added, "c.rs"));
        assert!(ChangeSet::new(three, 1, 0).is_large_change());
    }

    #[test]
    fn test_diff_lines_skip_headers() {
        let diff = "diff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -1 +1 @@\n-old\n+new\n context\n";
        let lines = DiffLines::parse(diff);
        assert_eq!(lines.added, vec!["new"]);
        assert_eq!(lines.removed, vec!["old"]);
    }

    #[test]
    fn test_diff_lines_keep_dashed_content() {
        let diff = concat!(
            "diff --git a/schema.sql b/schema.sql\n",
            "--- a/schema.sql\n",
            "+++ b/schema.sql\n",
            "@@ -1,2 +1,2 @@\n",
            "--- drop legacy column\n",
            "+-- keep column\n",
            "----\n",
            "+++i;\n",
            "diff --git a/y b/y\n",
            "--- a/y\n",
            "+++ b/y\n",
            "@@ -1 +1 @@\n",
            "-a\n",
            "+b\n",
        );
        let lines = DiffLines::parse(diff);
        assert_eq!(lines.removed, vec!["-- drop legacy column", "---", "a"]);
        assert_eq!(lines.added, vec!["-- keep column", "++i;", "b"]);
    }

    #[test]
    fn test_diff_lines_without_headers() {
        let lines = DiffLines::parse("-export function oldApi() {\n+x\n");
        assert_eq!(lines.removed, vec!["export function oldApi() {"]);
        assert_eq!(lines.added, vec!["x"]);
    }

    #[test]
    fn test_changes_by_status() {
        let changes = vec![
            FileChange::new(FileStatus::Added, "a"),
            FileChange::new(FileStatus::Deleted, "b"),
            FileChange::renamed("c", "d"),
        ];
        let grouped = ChangesByStatus::from_changes(&changes);
        assert_eq!(grouped.added, vec!["a"]);
        assert_eq!(grouped.deleted, vec!["b"]);
        assert_eq!(grouped.renamed, vec!["d"]);
        assert!(grouped.modified.is_empty());
    }
}
