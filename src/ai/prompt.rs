//! Prompt construction and response parsing for AI descriptions.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Deserialize;

use crate::error::AiError;

/// Maximum diff characters sent to the provider.
pub const MAX_AI_DIFF_CHARS: usize = 4_000;

/// Longest description accepted from the provider.
const MAX_DESCRIPTION_CHARS: usize = 100;

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("ANSI escape pattern must compile")
});

// Pattern: type(scope)!: at the start of a returned line
static HEADER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\w+(?:\([^)]*\))?!?\s*:\s*").expect("header prefix pattern must compile")
});

/// Sanitize diff text for inclusion in a prompt.
///
/// Removes ANSI escape sequences and control characters (newlines and tabs
/// are kept), then truncates to `max_chars` on a char boundary.
pub fn sanitize_diff(text: &str, max_chars: usize) -> String {
    let without_ansi = ANSI_ESCAPE.replace_all(text, "");
    let mut result: String = without_ansi
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    if let Some((idx, _)) = result.char_indices().nth(max_chars) {
        result.truncate(idx);
    }
    result
}

/// Build the prompt asking for a single commit description.
pub fn build_prompt(summary: &str, diff: &str) -> String {
    format!(
        r#"You write the description part of a Conventional Commits header.

The change has already been classified:
{summary}

Staged diff (possibly truncated):
```diff
{diff}
```

Reply with JSON only: {{"description": "<imperative, lowercase, no trailing period, under 72 characters>"}}
Do not include the type, scope, or any ticket reference."#
    )
}

#[derive(Deserialize)]
struct DescriptionResponse {
    description: String,
}

/// Extract the description from a provider response.
///
/// Accepts a JSON object with a `description` field (optionally fenced or
/// surrounded by text), or falls back to the first non-empty line.
pub fn parse_description(response: &str) -> Result<String, AiError> {
    let from_json = extract_json(response)
        .and_then(|json| serde_json::from_str::<DescriptionResponse>(&json).ok())
        .map(|r| r.description);

    let raw = match from_json {
        Some(description) => description,
        None => response
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with("```"))
            .unwrap_or("")
            .to_string(),
    };

    let description = clean_description(&raw);
    if description.is_empty() {
        return Err(AiError::InvalidResponse(truncate(response.trim(), 200)));
    }
    Ok(description)
}

fn clean_description(raw: &str) -> String {
    let line = raw.lines().next().unwrap_or("").trim();
    let line = line.trim_matches(|c| c == '"' || c == '`' || c == '\'').trim();
    let line = HEADER_PREFIX.replace(line, "");
    let line = line.trim().trim_end_matches('.').trim();
    truncate(line, MAX_DESCRIPTION_CHARS)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Extract a JSON object from a response that may be wrapped in markdown or prose.
fn extract_json(response: &str) -> Option<String> {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```")
        && let Some(end) = trimmed[start + 3..].find("```")
    {
        let inner = trimmed[start + 3..start + 3 + end].trim_start_matches("json").trim();
        if inner.starts_with('{') {
            return Some(inner.to_string());
        }
    }

    trimmed
        .match_indices('{')
        .find_map(|(idx, _)| balanced_object(&trimmed[idx..]))
        .filter(|candidate| serde_json::from_str::<serde_json::Value>(candidate).is_ok())
}

/// The prefix of `text` up to the brace closing its first `{`, string-literal aware.
fn balanced_object(text: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (idx, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(text[..=idx].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
