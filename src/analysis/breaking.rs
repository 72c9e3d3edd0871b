//! Breaking-change evidence from diff text and file statuses.
//!
//! Four independent checks each contribute at most one reason (the structural
//! check contributes at most one per pattern family). Reasons are de-duplicated
//! in first-seen order.

use std::sync::LazyLock;

use regex_lite::Regex;
use semver::Version;
use serde::Serialize;
use tracing::debug;

use crate::analysis::change::{DiffLines, FileCategory, FileChange, FileStatus};
use crate::config::BreakingChangeDetection;

/// Outcome of breaking-change detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BreakingChangeReport {
    pub is_breaking: bool,
    pub reasons: Vec<String>,
}

impl BreakingChangeReport {
    fn from_reasons(reasons: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(reasons.len());
        for reason in reasons {
            if !unique.contains(&reason) {
                unique.push(reason);
            }
        }
        Self {
            is_breaking: !unique.is_empty(),
            reasons: unique,
        }
    }
}

/// Structural pattern families, checked in order.
const STRUCTURAL_FAMILIES: &[fn(&DiffLines<'_>) -> Option<String>] = &[
    removed_export,
    changed_signature,
    removed_member,
    major_version_bump,
];

/// Collect breaking-change evidence.
pub fn detect_breaking_changes(
    diff: &str,
    changes: &[FileChange],
    settings: &BreakingChangeDetection,
) -> BreakingChangeReport {
    if !settings.enabled {
        return BreakingChangeReport::default();
    }

    let lines = DiffLines::parse(diff);
    let mut reasons = Vec::new();

    if let Some(reason) = keyword_reason(diff, &settings.keywords) {
        reasons.push(reason);
    }

    if let Some(reason) = status_reason(changes, FileStatus::Deleted) {
        reasons.push(reason);
    }

    reasons.extend(STRUCTURAL_FAMILIES.iter().filter_map(|family| family(&lines)));

    if let Some(reason) = status_reason(changes, FileStatus::Renamed) {
        reasons.push(reason);
    }

    let report = BreakingChangeReport::from_reasons(reasons);
    if report.is_breaking {
        debug!("Breaking change evidence: {:?}", report.reasons);
    }
    report
}

fn keyword_reason(diff: &str, keywords: &[String]) -> Option<String> {
    let haystack = diff.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .find(|k| !k.is_empty() && haystack.contains(k.as_str()))
        .map(|k| format!("Diff mentions \"{k}\""))
}

fn status_reason(changes: &[FileChange], status: FileStatus) -> Option<String> {
    let sources: Vec<&FileChange> = changes
        .iter()
        .filter(|f| f.status == status && f.category() == FileCategory::Source)
        .collect();

    if sources.is_empty() {
        return None;
    }

    let listed = sources
        .iter()
        .map(|f| match (&f.old_path, status) {
            (Some(old), FileStatus::Renamed) => format!("{old} -> {}", f.path),
            _ => f.path.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ");

    Some(match status {
        FileStatus::Renamed => format!("Renamed source files may break imports: {listed}"),
        _ => format!("Deleted source files: {listed}"),
    })
}

/// First participating capture group of `re` for each matching line.
fn captured_names<'a>(re: &Regex, lines: &[&'a str]) -> Vec<&'a str> {
    lines
        .iter()
        .filter_map(|&line| {
            let caps = re.captures(line)?;
            (1..caps.len()).find_map(|i| caps.get(i).map(|m| m.as_str()))
        })
        .collect()
}

fn removed_export(lines: &DiffLines<'_>) -> Option<String> {
    let kept = captured_names(&EXPORTED, &lines.added);
    captured_names(&EXPORTED, &lines.removed)
        .into_iter()
        .find(|name| !kept.contains(name))
        .map(|name| format!("Removed export `{name}`"))
}

fn changed_signature(lines: &DiffLines<'_>) -> Option<String> {
    let signatures = |side: &[&str]| -> Vec<(String, String)> {
        side.iter()
            .filter_map(|line| {
                let caps = PUBLIC_FUNCTION.captures(line)?;
                let name = caps.get(1)?.as_str();
                if name.starts_with('_') {
                    return None;
                }
                let params: String = caps
                    .get(2)
                    .map(|m| m.as_str())
                    .unwrap_or("")
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                Some((name.to_string(), params))
            })
            .collect()
    };

    let before = signatures(&lines.removed);
    let after = signatures(&lines.added);

    before
        .iter()
        .find(|(name, params)| {
            after.iter().any(|(n, _)| n == name) && !after.iter().any(|(n, p)| n == name && p == params)
        })
        .map(|(name, _)| format!("Changed signature of `{name}`"))
}

fn removed_member(lines: &DiffLines<'_>) -> Option<String> {
    let kept = captured_names(&CLASS_MEMBER, &lines.added);
    captured_names(&CLASS_MEMBER, &lines.removed)
        .into_iter()
        .find(|name| !kept.contains(name))
        .map(|name| format!("Removed class member `{name}`"))
}

fn major_version_bump(lines: &DiffLines<'_>) -> Option<String> {
    let versions = |side: &[&str]| -> Vec<Version> {
        side.iter()
            .filter_map(|line| VERSION_FIELD.captures(line)?.get(1))
            .filter_map(|m| Version::parse(m.as_str()).ok())
            .collect()
    };

    versions(&lines.removed)
        .into_iter()
        .zip(versions(&lines.added))
        .find(|(old, new)| new.major > old.major)
        .map(|(old, new)| format!("Major version bump {old} -> {new}"))
}

static EXPORTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?:",
        r"export\s+(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?(?:async\s+)?",
        r"(?:function\*?|class|const|let|var|interface|type|enum)\s+([A-Za-z_$][\w$]*)",
        r"|(?:module\.)?exports\.([A-Za-z_$][\w$]*)\s*=",
        r"|pub\s+(?:async\s+)?(?:unsafe\s+)?(?:fn|struct|enum|trait|type|const|static|mod)\s+([A-Za-z_]\w*)",
        r")"
    ))
    .expect("export pattern must compile")
});

static PUBLIC_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?:export\s+(?:default\s+)?(?:async\s+)?function\*?\s+",
        r"|pub\s+(?:async\s+)?(?:unsafe\s+)?fn\s+",
        r"|(?:async\s+)?def\s+",
        r"|func\s+(?:\([^)]*\)\s*)?)",
        r"([A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\(([^)]*)"
    ))
    .expect("signature pattern must compile")
});

static CLASS_MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?:(?:public|protected)\s+(?:static\s+)?(?:readonly\s+)?(?:async\s+)?",
        r"(?:[\w<>\[\],]+\s+)?([A-Za-z_$][\w$]*)\s*[(:=;]",
        r"|pub\s+([a-z_]\w*)\s*:)"
    ))
    .expect("member pattern must compile")
});

static VERSION_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*"?version"?\s*[:=]\s*"v?(\d+\.\d+\.\d+[^"]*)""#).expect("valid regex")
});

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> BreakingChangeDetection {
        BreakingChangeDetection::default()
    }

    fn detect(diff: &str, changes: &[FileChange]) -> BreakingChangeReport {
        detect_breaking_changes(diff, changes, &settings())
    }

    #[test]
    fn test_disabled_returns_empty() {
        let disabled = BreakingChangeDetection {
            enabled: false,
            ..settings()
        };
        let report = detect_breaking_changes(
            "-export function oldApi() {}\n",
            &[FileChange::new(FileStatus::Deleted, "src/a.ts")],
            &disabled,
        );
        assert_eq!(report, BreakingChangeReport::default());
    }

    #[test]
    fn test_removed_export() {
        let report = detect("-export function oldApi() {\n", &[]);
        assert!(report.is_breaking);
        assert_eq!(report.reasons, vec!["Removed export `oldApi`"]);
    }

    #[test]
    fn test_reexported_symbol_is_not_removed() {
        let diff = "-export function render() {\n+export function render() {\n";
        assert!(!detect(diff, &[]).is_breaking);
    }

    #[test]
    fn test_keyword_repeated_yields_one_reason() {
        let diff = "+// incompatible\n+// incompatible\n+// incompatible\n+// incompatible\n+// incompatible\n";
        let report = detect(diff, &[]);
        assert_eq!(report.reasons, vec!["Diff mentions \"incompatible\""]);
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let report = detect("+// DEPRECATED: use v2\n", &[]);
        assert!(report.is_breaking);
    }

    #[test]
    fn test_deleted_source_file() {
        let changes = [
            FileChange::new(FileStatus::Deleted, "src/legacy.ts"),
            FileChange::new(FileStatus::Deleted, "docs/old.md"),
        ];
        let report = detect("", &changes);
        assert_eq!(report.reasons, vec!["Deleted source files: src/legacy.ts"]);
    }

    #[test]
    fn test_renamed_source_file() {
        let changes = [FileChange::renamed("src/util.ts", "src/helpers.ts")];
        let report = detect("", &changes);
        assert_eq!(
            report.reasons,
            vec!["Renamed source files may break imports: src/util.ts -> src/helpers.ts"]
        );
    }

    #[test]
    fn test_changed_signature() {
        let diff = "-pub fn connect(url: &str) -> Client {\n+pub fn connect(url: &str, timeout: u64) -> Client {\n";
        let report = detect(diff, &[]);
        assert_eq!(report.reasons, vec!["Changed signature of `connect`"]);
    }

    #[test]
    fn test_reformatted_signature_is_not_breaking() {
        let diff = "-pub fn connect(url:&str) {\n+pub fn connect(url: &str) {\n";
        assert!(!detect(diff, &[]).is_breaking);
    }

    #[test]
    fn test_removed_class_member() {
        let diff = "-  public reset(): void {\n+  private other = 1;\n";
        let report = detect(diff, &[]);
        assert_eq!(report.reasons, vec!["Removed class member `reset`"]);
    }

    #[test]
    fn test_major_version_bump() {
        let diff = "-  \"version\": \"1.4.2\",\n+  \"version\": \"2.0.0\",\n";
        let report = detect(diff, &[]);
        assert_eq!(report.reasons, vec!["Major version bump 1.4.2 -> 2.0.0"]);
    }

    #[test]
    fn test_minor_version_bump_is_not_breaking() {
        let diff = "-version = \"0.3.1\"\n+version = \"0.4.0\"\n";
        assert!(!detect(diff, &[]).is_breaking);
    }

    #[test]
    fn test_family_contributes_one_reason() {
        let diff = "-export const a = 1;\n-export const b = 2;\n";
        let report = detect(diff, &[]);
        assert_eq!(report.reasons, vec!["Removed export `a`"]);
    }

    #[test]
    fn test_reason_order() {
        let diff = "-export function oldApi() {\n+// removed oldApi\n";
        let changes = [
            FileChange::new(FileStatus::Deleted, "src/old.ts"),
            FileChange::renamed("src/a.ts", "src/b.ts"),
        ];
        let report = detect(diff, &changes);
        assert_eq!(report.reasons.len(), 4);
        assert!(report.reasons[0].starts_with("Diff mentions"));
        assert!(report.reasons[1].starts_with("Deleted source files"));
        assert!(report.reasons[2].starts_with("Removed export"));
        assert!(report.reasons[3].starts_with("Renamed source files"));
    }

    #[test]
    fn test_arbitrary_content_never_panics() {
        let diff = "+\u{0}\u{1b}[31m(((\n-export\n-pub fn (\n+version = \"x.y\"\n";
        let _ = detect(diff, &[FileChange::new(FileStatus::Unknown, "")]);
    }
}
