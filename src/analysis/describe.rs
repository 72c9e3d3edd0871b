//! Imperative descriptions and large-change bodies.

use crate::analysis::change::{
    DiffLines, FileCategory, FileChange, FileStatus, FileTypeCounts, StatusCounts, file_name,
};
use crate::analysis::classify::declared_symbols;

/// Bullets listed in a large-change body before summarising the rest.
pub const MAX_BODY_FILES: usize = 10;

/// Symbols named in an alternative description.
const MAX_NAMED_SYMBOLS: usize = 3;

/// Short imperative description of a change set.
pub fn describe(counts: &FileTypeCounts, status: &StatusCounts, changes: &[FileChange]) -> String {
    if let [change] = changes {
        return describe_single(change);
    }

    if counts.source == 0 {
        if counts.only(FileCategory::Test) {
            return "update test files".to_string();
        }
        if counts.only(FileCategory::Docs) {
            return "update documentation".to_string();
        }
        if counts.only(FileCategory::Config) {
            return "update configuration".to_string();
        }
    }

    let clauses: Vec<String> = [
        ("add", status.added),
        ("update", status.modified + status.unknown),
        ("remove", status.deleted),
        ("rename", status.renamed),
    ]
    .into_iter()
    .filter(|(_, n)| *n > 0)
    .map(|(verb, n)| format!("{} {}", verb, files(n)))
    .collect();

    if clauses.is_empty() {
        return format!("update {}", files(changes.len()));
    }
    clauses.join(" and ")
}

/// A more detailed phrasing than [`describe`].
///
/// Names declared symbols or the full path for a single added or modified
/// file, and counts per category otherwise. Callers compare the result with
/// the primary description and drop it when equal.
pub fn alternative_description(
    counts: &FileTypeCounts,
    changes: &[FileChange],
    diff: &str,
) -> String {
    if let [change] = changes {
        return match change.status {
            FileStatus::Added | FileStatus::Modified => describe_symbols(change, diff)
                .unwrap_or_else(|| format!("{} {}", change.status.verb(), change.path)),
            _ => describe_single(change),
        };
    }

    let parts: Vec<String> = [
        (FileCategory::Source, "source"),
        (FileCategory::Test, "test"),
        (FileCategory::Docs, "doc"),
        (FileCategory::Config, "config"),
    ]
    .into_iter()
    .filter_map(|(category, noun)| {
        let n = counts.get(category);
        (n > 0).then(|| format!("{} {}", n, plural(n, &format!("{noun} file"))))
    })
    .collect();

    match parts.as_slice() {
        [] => format!("update {}", files(changes.len())),
        [only] => format!("update {only}"),
        [init @ .., last] => format!("update {} and {}", init.join(", "), last),
    }
}

/// Per-file bullet list, at most [`MAX_BODY_FILES`] entries.
pub fn large_change_body(changes: &[FileChange]) -> String {
    let mut lines: Vec<String> = changes
        .iter()
        .take(MAX_BODY_FILES)
        .map(|change| match (&change.status, &change.old_path) {
            (FileStatus::Renamed, Some(old)) => format!("- rename {} to {}", old, change.path),
            (status, _) => format!("- {} {}", status.verb(), change.path),
        })
        .collect();

    if changes.len() > MAX_BODY_FILES {
        lines.push(format!("- and {} more files", changes.len() - MAX_BODY_FILES));
    }
    lines.join("\n")
}

fn describe_single(change: &FileChange) -> String {
    let name = change.file_name();
    match (&change.status, &change.old_path) {
        (FileStatus::Renamed, Some(old)) if file_name(old) != name => {
            format!("rename {} to {}", file_name(old), name)
        }
        (status, _) => format!("{} {}", status.verb(), name),
    }
}

fn describe_symbols(change: &FileChange, diff: &str) -> Option<String> {
    let lines = DiffLines::parse(diff);
    let removed = declared_symbols(&lines.removed);
    let mut added: Vec<&str> = Vec::new();
    for symbol in declared_symbols(&lines.added) {
        if !removed.contains(&symbol) && !added.contains(&symbol) {
            added.push(symbol);
        }
    }
    if added.is_empty() {
        return None;
    }

    let named = added
        .iter()
        .take(MAX_NAMED_SYMBOLS)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    let more = match added.len().saturating_sub(MAX_NAMED_SYMBOLS) {
        0 => String::new(),
        n => format!(" and {n} more"),
    };
    Some(format!("add {}{} in {}", named, more, change.file_name()))
}

fn files(n: usize) -> String {
    format!("{} {}", n, plural(n, "file"))
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    }
}
