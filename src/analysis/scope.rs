//! Scope resolution from changed paths.

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::warn;

use crate::analysis::history::HistoryProfile;
use crate::config::ScopeMapping;

/// Directory names accepted as a scope without configuration.
pub const CONVENTIONAL_SCOPES: &[&str] = &[
    "api", "app", "auth", "build", "ci", "cli", "components", "config", "core", "db", "deps",
    "docs", "hooks", "i18n", "lib", "middleware", "models", "pages", "routes", "scripts",
    "server", "services", "store", "styles", "tests", "types", "ui", "utils", "web",
];

/// Leading directories skipped when looking for a conventional scope.
const CONTAINER_DIRS: &[&str] = &["src", "lib", "app"];

/// Resolve a scope for the changed paths.
///
/// Precedence: a mapping matching every path, then the mapping matching the
/// most paths when that is more than half, then a shared conventional
/// directory name.
pub fn resolve_scope(paths: &[&str], mappings: &[ScopeMapping]) -> Option<String> {
    if paths.is_empty() {
        return None;
    }

    let compiled: Vec<(&ScopeMapping, PathMatcher)> = mappings
        .iter()
        .filter(|m| !m.scope.trim().is_empty())
        .filter_map(|m| PathMatcher::new(&m.pattern).map(|matcher| (m, matcher)))
        .collect();

    let counts: Vec<(&ScopeMapping, usize)> = compiled
        .iter()
        .map(|(m, matcher)| (*m, paths.iter().filter(|p| matcher.matches(p)).count()))
        .collect();

    if let Some((mapping, _)) = counts.iter().find(|(_, n)| *n == paths.len()) {
        return Some(mapping.scope.trim().to_string());
    }

    // max_by_key keeps the last maximum; iterate reversed so earlier mappings win ties.
    if let Some((mapping, _)) = counts
        .iter()
        .rev()
        .filter(|(_, n)| *n * 2 > paths.len())
        .max_by_key(|(_, n)| *n)
    {
        return Some(mapping.scope.trim().to_string());
    }

    conventional_scope(paths)
}

/// Scope from the profile's common scopes that appears in any changed path.
pub fn scope_from_history(paths: &[&str], profile: &HistoryProfile) -> Option<String> {
    let lowered: Vec<String> = paths.iter().map(|p| p.to_lowercase()).collect();
    profile
        .common_scopes
        .iter()
        .filter(|s| !s.trim().is_empty())
        .find(|scope| {
            let needle = scope.to_lowercase();
            lowered.iter().any(|p| p.contains(&needle))
        })
        .cloned()
}

fn conventional_scope(paths: &[&str]) -> Option<String> {
    let first = scope_candidate(paths[0])?;
    if !CONVENTIONAL_SCOPES.contains(&first) {
        return None;
    }
    paths
        .iter()
        .all(|p| scope_candidate(p) == Some(first))
        .then(|| first.to_string())
}

fn scope_candidate(path: &str) -> Option<&str> {
    let mut dirs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    dirs.pop(); // file name
    match dirs.as_slice() {
        [container, next, ..] if CONTAINER_DIRS.contains(container) => Some(next),
        [first, ..] => Some(first),
        [] => None,
    }
}

/// A directory prefix, or a glob when the pattern contains glob syntax.
enum PathMatcher {
    Prefix(String),
    Glob(GlobSet),
}

impl PathMatcher {
    fn new(pattern: &str) -> Option<Self> {
        let pattern = pattern.trim().trim_start_matches("./");
        if pattern.is_empty() {
            return None;
        }
        if !pattern.contains(['*', '?', '[', '{']) {
            return Some(PathMatcher::Prefix(pattern.trim_end_matches('/').to_string()));
        }
        match compile_glob(pattern.trim_end_matches('/')) {
            Ok(set) => Some(PathMatcher::Glob(set)),
            Err(e) => {
                warn!("Ignoring invalid scope pattern '{}': {}", pattern, e);
                None
            }
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            PathMatcher::Prefix(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            PathMatcher::Glob(set) => set.is_match(path),
        }
    }
}

/// A glob matches its directory's contents too, so `pattern/**` is added alongside it.
fn compile_glob(pattern: &str) -> Result<GlobSet, globset::Error> {
    let glob = |p: &str| -> Result<Glob, globset::Error> {
        GlobBuilder::new(p).literal_separator(true).build()
    };
    let mut builder = GlobSetBuilder::new();
    builder.add(glob(pattern)?);
    if !pattern.ends_with("**") {
        builder.add(glob(&format!("{pattern}/**"))?);
    }
    builder.build()
}
