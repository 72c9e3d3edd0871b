//! Commit-style profile learned from recent history.
//!
//! The profile is cached process-wide for [`CACHE_TTL_SECS`] seconds. Callers
//! that analyse several repositories concurrently should give each its own
//! [`HistoryCache`] through [`HistoryAnalyzer::with_cache`].

use std::collections::BTreeMap;
use std::sync::{LazyLock, Mutex};

use chrono::{DateTime, TimeDelta, Utc};
use regex_lite::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::analysis::classify::CommitType;
use crate::config::LearnFromHistory;
use crate::git::VersionControl;

/// Lifetime of a cached profile.
pub const CACHE_TTL_SECS: i64 = 60;

/// Emoji-prefixed share above which the project is considered to use emojis.
pub const EMOJI_THRESHOLD: f64 = 0.3;

/// Conventional share above which the project is considered to use Conventional Commits.
pub const CONVENTIONAL_THRESHOLD: f64 = 0.5;

/// Entries kept in the scope and verb rankings.
const TOP_N: usize = 10;

pub const DEFAULT_VERBS: &[&str] = &["add", "update", "fix", "remove", "refactor", "improve"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryProfile {
    pub uses_emojis: bool,
    pub uses_conventional_commits: bool,
    /// Most frequent scopes first.
    pub common_scopes: Vec<String>,
    /// Most frequent leading verbs first.
    pub common_verbs: Vec<String>,
    pub average_length: f64,
    /// Share of subjects starting with an emoji, 0.0 to 1.0.
    pub emoji_frequency: f64,
    pub type_frequency: BTreeMap<String, usize>,
}

impl Default for HistoryProfile {
    fn default() -> Self {
        Self {
            uses_emojis: true,
            uses_conventional_commits: true,
            common_scopes: Vec::new(),
            common_verbs: DEFAULT_VERBS.iter().map(|v| v.to_string()).collect(),
            average_length: 0.0,
            emoji_frequency: 0.0,
            type_frequency: BTreeMap::new(),
        }
    }
}

// Pattern: type(scope)!: description
static CONVENTIONAL_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+)(?:\(([^)]+)\))?(!)?\s*:\s*(.*)$")
        .expect("conventional header pattern must compile")
});

static SHORTCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:[a-z0-9_+-]+:\s*").expect("shortcode pattern must compile"));

/// A subject split into its optional emoji prefix and conventional parts.
#[derive(Debug, PartialEq)]
struct ParsedSubject<'a> {
    has_emoji: bool,
    commit_type: Option<CommitType>,
    scope: Option<&'a str>,
    description: &'a str,
}

fn parse_subject(subject: &str) -> ParsedSubject<'_> {
    let trimmed = subject.trim();
    let (has_emoji, rest) = strip_emoji(trimmed);

    if let Some(caps) = CONVENTIONAL_HEADER.captures(rest)
        && let Some(commit_type) = caps.get(1).and_then(|m| m.as_str().parse::<CommitType>().ok())
    {
        return ParsedSubject {
            has_emoji,
            commit_type: Some(commit_type),
            scope: caps.get(2).map(|m| m.as_str().trim()).filter(|s| !s.is_empty()),
            description: caps.get(4).map_or("", |m| m.as_str()),
        };
    }

    ParsedSubject {
        has_emoji,
        commit_type: None,
        scope: None,
        description: rest,
    }
}

/// Strip a leading emoji or `:shortcode:`.
fn strip_emoji(subject: &str) -> (bool, &str) {
    if let Some(m) = SHORTCODE.find(subject) {
        return (true, &subject[m.end()..]);
    }
    let rest = subject.trim_start_matches(|c: char| !c.is_ascii() && !c.is_alphanumeric());
    if rest.len() == subject.len() {
        (false, subject)
    } else {
        (true, rest.trim_start())
    }
}

/// Build a profile from commit subjects, newest first.
///
/// An empty slice yields the default profile.
pub fn analyze_subjects(subjects: &[String]) -> HistoryProfile {
    if subjects.is_empty() {
        return HistoryProfile::default();
    }

    let total = subjects.len() as f64;
    let mut emoji = 0usize;
    let mut conventional = 0usize;
    let mut length = 0usize;
    let mut scopes = Ranking::default();
    let mut verbs = Ranking::default();
    let mut type_frequency = BTreeMap::new();

    for subject in subjects {
        let parsed = parse_subject(subject);
        length += subject.trim().chars().count();
        if parsed.has_emoji {
            emoji += 1;
        }
        if let Some(commit_type) = parsed.commit_type {
            conventional += 1;
            *type_frequency.entry(commit_type.to_string()).or_insert(0) += 1;
        }
        if let Some(scope) = parsed.scope {
            scopes.record(scope);
        }
        if let Some(verb) = leading_verb(parsed.description) {
            verbs.record(&verb);
        }
    }

    let emoji_frequency = emoji as f64 / total;
    let common_verbs = match verbs.top(TOP_N) {
        v if v.is_empty() => HistoryProfile::default().common_verbs,
        v => v,
    };

    HistoryProfile {
        uses_emojis: emoji_frequency > EMOJI_THRESHOLD,
        uses_conventional_commits: conventional as f64 / total > CONVENTIONAL_THRESHOLD,
        common_scopes: scopes.top(TOP_N),
        common_verbs,
        average_length: length as f64 / total,
        emoji_frequency,
        type_frequency,
    }
}

fn leading_verb(description: &str) -> Option<String> {
    let word = description.split_whitespace().next()?;
    let word = word.trim_end_matches(|c: char| !c.is_alphabetic());
    (word.len() > 1 && word.chars().all(|c| c.is_alphabetic())).then(|| word.to_lowercase())
}

/// Frequency ranking that breaks ties by first appearance.
#[derive(Default)]
struct Ranking {
    entries: Vec<(String, usize)>,
}

impl Ranking {
    fn record(&mut self, key: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, n)) => *n += 1,
            None => self.entries.push((key.to_string(), 1)),
        }
    }

    fn top(mut self, n: usize) -> Vec<String> {
        // Stable sort keeps first-seen order among equal counts.
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries.into_iter().take(n).map(|(k, _)| k).collect()
    }
}

/// A profile together with when and for how many commits it was computed.
#[derive(Debug, Clone)]
pub struct CachedProfile {
    pub value: HistoryProfile,
    pub computed_at: DateTime<Utc>,
    pub commit_count: usize,
}

impl CachedProfile {
    pub fn new(value: HistoryProfile, commit_count: usize, computed_at: DateTime<Utc>) -> Self {
        Self {
            value,
            computed_at,
            commit_count,
        }
    }

    /// True while `now` is within the TTL of `computed_at`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.computed_at);
        age >= TimeDelta::zero() && age < TimeDelta::seconds(CACHE_TTL_SECS)
    }
}

/// Single-entry profile cache.
#[derive(Debug, Default)]
pub struct HistoryCache {
    entry: Mutex<Option<CachedProfile>>,
}

impl HistoryCache {
    pub const fn new() -> Self {
        Self {
            entry: Mutex::new(None),
        }
    }

    /// Cached profile for `commit_count`, if still valid at `now`.
    pub fn get(&self, commit_count: usize, now: DateTime<Utc>) -> Option<HistoryProfile> {
        let entry = self.entry.lock().unwrap_or_else(|e| e.into_inner());
        entry
            .as_ref()
            .filter(|c| c.commit_count == commit_count && c.is_valid(now))
            .map(|c| c.value.clone())
    }

    pub fn store(&self, cached: CachedProfile) {
        *self.entry.lock().unwrap_or_else(|e| e.into_inner()) = Some(cached);
    }

    pub fn clear(&self) {
        *self.entry.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

static GLOBAL_CACHE: HistoryCache = HistoryCache::new();

/// Drop the process-wide cached profile.
pub fn clear_history_cache() {
    GLOBAL_CACHE.clear();
}

/// Computes history profiles through a cache.
pub struct HistoryAnalyzer<'a> {
    cache: &'a HistoryCache,
}

impl HistoryAnalyzer<'static> {
    /// Analyzer backed by the process-wide cache.
    pub fn global() -> Self {
        Self {
            cache: &GLOBAL_CACHE,
        }
    }
}

impl<'a> HistoryAnalyzer<'a> {
    pub fn with_cache(cache: &'a HistoryCache) -> Self {
        Self { cache }
    }

    /// Profile of the repository's recent history.
    ///
    /// Never fails: a disabled setting or an unreadable history yields the
    /// default profile. Failures are not cached.
    pub fn analyze(&self, vcs: &dyn VersionControl, settings: &LearnFromHistory) -> HistoryProfile {
        if !settings.enabled {
            return HistoryProfile::default();
        }

        let now = Utc::now();
        if let Some(profile) = self.cache.get(settings.commit_count, now) {
            debug!("Using cached history profile");
            return profile;
        }

        match vcs.recent_subjects(settings.commit_count) {
            Ok(subjects) => {
                let profile = analyze_subjects(&subjects);
                debug!(
                    "Analyzed {} commits: emojis={}, conventional={}",
                    subjects.len(),
                    profile.uses_emojis,
                    profile.uses_conventional_commits
                );
                self.cache
                    .store(CachedProfile::new(profile.clone(), settings.commit_count, now));
                profile
            }
            Err(e) => {
                warn!("Failed to read commit history: {}; using default style", e);
                HistoryProfile::default()
            }
        }
    }
}
