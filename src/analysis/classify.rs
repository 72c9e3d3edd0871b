//! Commit type classification.
//!
//! The type is decided by an ordered cascade of rules. The first rule whose
//! predicate holds wins; later rules are never consulted. [`RULES`] is the
//! cascade itself, so its order is the tie-break.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::change::{DiffLines, FileCategory, FileChange, FileStatus, FileTypeCounts};
use crate::error::ConfigError;

/// Conventional commit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Perf,
    Test,
    Build,
    Ci,
    Chore,
    Revert,
}

impl CommitType {
    pub fn as_str(self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Docs => "docs",
            CommitType::Style => "style",
            CommitType::Refactor => "refactor",
            CommitType::Perf => "perf",
            CommitType::Test => "test",
            CommitType::Build => "build",
            CommitType::Ci => "ci",
            CommitType::Chore => "chore",
            CommitType::Revert => "revert",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CommitType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feat" => Ok(Self::Feat),
            "fix" => Ok(Self::Fix),
            "docs" => Ok(Self::Docs),
            "style" => Ok(Self::Style),
            "refactor" => Ok(Self::Refactor),
            "perf" => Ok(Self::Perf),
            "test" => Ok(Self::Test),
            "build" => Ok(Self::Build),
            "ci" => Ok(Self::Ci),
            "chore" => Ok(Self::Chore),
            "revert" => Ok(Self::Revert),
            _ => Err(ConfigError::UnknownCommitType(s.to_string())),
        }
    }
}

/// Churn ratio above which an all-modified change counts as a rework.
pub const REFACTOR_CHURN_RATIO: f64 = 0.3;

/// Facts a cascade rule may inspect.
pub struct ClassifyContext<'a> {
    pub counts: &'a FileTypeCounts,
    pub diff: &'a str,
    pub changes: &'a [FileChange],
    lines: DiffLines<'a>,
    /// Added and removed lines joined, headers and context excluded.
    changed_text: String,
}

impl<'a> ClassifyContext<'a> {
    pub fn new(counts: &'a FileTypeCounts, diff: &'a str, changes: &'a [FileChange]) -> Self {
        let lines = DiffLines::parse(diff);
        let changed_text = lines
            .added
            .iter()
            .chain(lines.removed.iter())
            .copied()
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            counts,
            diff,
            changes,
            lines,
            changed_text,
        }
    }

    fn all_modified(&self) -> bool {
        !self.changes.is_empty()
            && self
                .changes
                .iter()
                .all(|f| f.status == FileStatus::Modified)
    }

    fn introduces_symbols(&self) -> bool {
        let removed = declared_symbols(&self.lines.removed);
        declared_symbols(&self.lines.added)
            .iter()
            .any(|name| !removed.contains(name))
    }
}

/// One step of the cascade.
pub struct Rule {
    pub name: &'static str,
    pub outcome: CommitType,
    pub predicate: fn(&ClassifyContext<'_>) -> bool,
}

/// The classification cascade, evaluated top-down.
pub const RULES: &[Rule] = &[
    Rule {
        name: "only-tests",
        outcome: CommitType::Test,
        predicate: only_tests,
    },
    Rule {
        name: "only-docs",
        outcome: CommitType::Docs,
        predicate: only_docs,
    },
    Rule {
        name: "only-config",
        outcome: CommitType::Chore,
        predicate: only_config,
    },
    Rule {
        name: "style",
        outcome: CommitType::Style,
        predicate: style_change,
    },
    Rule {
        name: "perf-keywords",
        outcome: CommitType::Perf,
        predicate: perf_keywords,
    },
    Rule {
        name: "fix-keywords",
        outcome: CommitType::Fix,
        predicate: fix_keywords,
    },
    Rule {
        name: "refactor-signals",
        outcome: CommitType::Refactor,
        predicate: refactor_signals,
    },
    Rule {
        name: "dependency-or-tooling",
        outcome: CommitType::Chore,
        predicate: dependency_or_tooling,
    },
    Rule {
        name: "feature-signals",
        outcome: CommitType::Feat,
        predicate: feature_signals,
    },
];

/// Name reported when no rule in [`RULES`] matched.
pub const FALLBACK_RULE: &str = "fallback";

/// Classify a change set into a commit type.
pub fn classify(counts: &FileTypeCounts, diff: &str, changes: &[FileChange]) -> CommitType {
    classify_explained(counts, diff, changes).0
}

/// Classify and report which rule decided.
pub fn classify_explained(
    counts: &FileTypeCounts,
    diff: &str,
    changes: &[FileChange],
) -> (CommitType, &'static str) {
    let ctx = ClassifyContext::new(counts, diff, changes);

    RULES
        .iter()
        .find(|rule| (rule.predicate)(&ctx))
        .map(|rule| (rule.outcome, rule.name))
        .unwrap_or_else(|| (fallback(&ctx), FALLBACK_RULE))
}

fn fallback(ctx: &ClassifyContext<'_>) -> CommitType {
    if ctx.counts.source == 0 {
        CommitType::Chore
    } else if ctx.all_modified() {
        CommitType::Refactor
    } else {
        CommitType::Feat
    }
}

// --- predicates ---

fn only_tests(ctx: &ClassifyContext<'_>) -> bool {
    ctx.counts.test > 0 && ctx.counts.source == 0 && ctx.counts.docs == 0
}

fn only_docs(ctx: &ClassifyContext<'_>) -> bool {
    ctx.counts.only(FileCategory::Docs)
}

fn only_config(ctx: &ClassifyContext<'_>) -> bool {
    ctx.counts.only(FileCategory::Config)
}

fn style_change(ctx: &ClassifyContext<'_>) -> bool {
    ctx.changes.iter().any(|f| STYLE_FILE.is_match(&f.path)) || is_formatting_only(&ctx.lines)
}

fn perf_keywords(ctx: &ClassifyContext<'_>) -> bool {
    PERF_KEYWORDS.is_match(&ctx.changed_text)
}

fn fix_keywords(ctx: &ClassifyContext<'_>) -> bool {
    FIX_KEYWORDS.is_match(&ctx.changed_text)
        || ctx.lines.added.iter().any(|line| NULL_GUARD.is_match(line))
}

fn refactor_signals(ctx: &ClassifyContext<'_>) -> bool {
    if REFACTOR_KEYWORDS.is_match(&ctx.changed_text) {
        return true;
    }
    ctx.all_modified() && !ctx.introduces_symbols() && churn_ratio(&ctx.lines) > REFACTOR_CHURN_RATIO
}

fn dependency_or_tooling(ctx: &ClassifyContext<'_>) -> bool {
    ctx.changes.iter().any(|f| TOOLING_FILE.is_match(&f.path)) || DEPENDENCY_DIFF.is_match(ctx.diff)
}

fn feature_signals(ctx: &ClassifyContext<'_>) -> bool {
    ctx.changes.iter().any(|f| f.status == FileStatus::Added)
        || ctx.introduces_symbols()
        || FEATURE_KEYWORDS.is_match(&ctx.changed_text)
}

/// Ratio of the smaller to the larger of added and removed line counts.
fn churn_ratio(lines: &DiffLines<'_>) -> f64 {
    let added = lines.added.len();
    let removed = lines.removed.len();
    let larger = added.max(removed);
    if larger == 0 {
        return 0.0;
    }
    added.min(removed) as f64 / larger as f64
}

/// True when every edit only touches whitespace, quotes or semicolons.
fn is_formatting_only(lines: &DiffLines<'_>) -> bool {
    if lines.is_empty() {
        return false;
    }

    // Order matters: moved statements are a logic change.
    let normalize = |side: &[&str]| -> Vec<String> {
        side.iter()
            .map(|line| {
                line.chars()
                    .filter(|c| !c.is_whitespace() && !matches!(c, '\'' | '"' | '`' | ';'))
                    .collect::<String>()
            })
            .filter(|line| !line.is_empty())
            .collect()
    };

    normalize(&lines.added) == normalize(&lines.removed)
}

/// Names declared by exported symbols, functions or classes in the given lines.
pub(crate) fn declared_symbols<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    lines
        .iter()
        .filter_map(|&line| {
            let caps = DECLARATION.captures(line)?;
            (1..caps.len()).find_map(|i| caps.get(i).map(|m| m.as_str()))
        })
        .collect()
}

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?:",
        r"export\s+(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?(?:async\s+)?",
        r"(?:function\*?|class|const|let|var|interface|type|enum)\s+([A-Za-z_$][\w$]*)",
        r"|pub(?:\([^)]*\))?\s+(?:async\s+)?(?:unsafe\s+)?(?:fn|struct|enum|trait|type|const|static|mod)\s+([A-Za-z_]\w*)",
        r"|(?:async\s+)?def\s+([A-Za-z_]\w*)",
        r"|class\s+([A-Za-z_]\w*)",
        r"|func\s+(?:\([^)]*\)\s*)?([A-Z]\w*)",
        r")"
    ))
    .expect("declaration pattern must compile")
});

static STYLE_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(css|scss|sass|less|styl|pcss)$").expect("valid regex"));

static PERF_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(optimi[sz](e|es|ed|ing|ation)|performance|cach(e|es|ed|ing)|faster|speed\s?up|memoi[sz]\w*|lazy[\s_-]?load\w*|batch(es|ed|ing)?|debounc\w*|throttl\w*)\b",
    )
    .expect("valid regex")
});

static FIX_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(fix(es|ed|ing)?|bugs?|issues?|errors?|hotfix(es)?|patch(es|ed)?|resolv(e|es|ed)|crash(es|ed)?|workaround)\b",
    )
    .expect("valid regex")
});

static NULL_GUARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(!==?\s*(null|undefined|nil)\b|\b(null|undefined|nil)\s*!==?|\?\?|\bis\s+(not\s+)?None\b|\.is_none\(\)|\.is_some\(\))",
    )
    .expect("valid regex")
});

static REFACTOR_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(refactor\w*|restructur\w*|reorganiz\w*|renam(e|es|ed|ing)|extract(s|ed|ing)?|clean\s?up|simplif\w*|mov(e|es|ed|ing)\s+to)\b",
    )
    .expect("valid regex")
});

static TOOLING_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(^|/)(package(-lock)?\.json|npm-shrinkwrap\.json|yarn\.lock|pnpm-lock\.yaml",
        r"|Cargo\.(toml|lock)|go\.(mod|sum)|Gemfile(\.lock)?|poetry\.lock|Pipfile(\.lock)?",
        r"|pyproject\.toml|requirements[^/]*\.txt|composer\.(json|lock)",
        r"|\.eslintrc[^/]*|eslint\.config\.[a-z]+|\.prettierrc[^/]*|\.stylelintrc[^/]*",
        r"|\.travis\.yml|\.gitlab-ci\.yml|Jenkinsfile|azure-pipelines\.yml)$",
        r"|(^|/)\.(github|circleci)/"
    ))
    .expect("valid regex")
});

static DEPENDENCY_DIFF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)("(dev|peer|optional)?[Dd]ependencies"\s*:|^[ +-]?\[(dev-|build-)?dependencies\])"#)
        .expect("valid regex")
});

static FEATURE_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(adds?\s+new|implement(s|ed|ing)?|introduc(e|es|ed|ing)|enabl(e|es|ed|ing))\b")
        .expect("valid regex")
});
