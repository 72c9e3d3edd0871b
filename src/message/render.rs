//! Rendering drafts to final commit messages.
//!
//! Default layout:
//! ```text
//! ✨ feat(api)!: add users endpoint
//!
//! - add src/api/users.ts
//!
//! BREAKING CHANGE: Removed export `oldApi`
//!   - Deleted source files: src/legacy.ts
//!
//! Refs: ABC-123
//! ```

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::analysis::{CommitType, TicketReference};
use crate::config::Templates;
use crate::message::emoji::emoji_for;

/// Everything needed to render one message.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    pub commit_type: CommitType,
    pub scope: Option<String>,
    pub description: String,
    pub body: Option<String>,
    pub include_emoji: bool,
    /// Adds the `!` marker.
    pub is_breaking: bool,
    /// Reasons for the `BREAKING CHANGE:` footer; None omits the footer.
    pub breaking_footer: Option<Vec<String>>,
    pub ticket: Option<TicketReference>,
}

impl MessageDraft {
    pub fn emoji(&self) -> Option<&'static str> {
        self.include_emoji.then(|| emoji_for(self.commit_type))
    }

    fn header_prefix(&self) -> String {
        let mut prefix = String::new();
        if let Some(emoji) = self.emoji() {
            prefix.push_str(emoji);
            prefix.push(' ');
        }
        prefix.push_str(self.commit_type.as_str());
        if let Some(scope) = &self.scope {
            prefix.push('(');
            prefix.push_str(scope);
            prefix.push(')');
        }
        if self.is_breaking {
            prefix.push('!');
        }
        prefix.push_str(": ");
        prefix
    }

    /// Shorten the description at a word boundary so the default header fits `max_len` characters.
    pub fn fit_header(&mut self, max_len: usize) {
        let prefix_len = self.header_prefix().chars().count();
        let available = max_len.saturating_sub(prefix_len);
        if available == 0 || self.description.chars().count() <= available {
            return;
        }

        let cut: String = self.description.chars().take(available).collect();
        let shortened = match cut.rfind(' ') {
            Some(idx) if idx > 0 => cut[..idx].trim_end(),
            _ => cut.as_str(),
        };
        self.description = shortened.to_string();
    }
}

/// The configured template for a draft, if any.
///
/// `withBody` applies when there is a body, then `noScope` when there is no
/// scope, then `default`.
pub fn select_template<'t>(templates: &'t Templates, draft: &MessageDraft) -> Option<&'t str> {
    let with_body = draft.body.as_ref().and(templates.with_body.as_deref());
    let no_scope = draft
        .scope
        .is_none()
        .then_some(templates.no_scope.as_deref())
        .flatten();
    with_body
        .or(no_scope)
        .or(templates.default.as_deref())
}

/// Render `draft` with `template`, or the built-in layout when None.
pub fn render(draft: &MessageDraft, template: Option<&str>) -> String {
    let mut message = match template {
        Some(template) => render_template(draft, template),
        None => {
            let mut text = format!("{}{}", draft.header_prefix(), draft.description);
            if let Some(body) = non_blank(&draft.body) {
                text.push_str("\n\n");
                text.push_str(body);
            }
            text
        }
    };

    if let Some(footer) = breaking_footer(draft) {
        message.push_str("\n\n");
        message.push_str(&footer);
    }
    if let Some(ticket) = &draft.ticket {
        message.push_str("\n\n");
        message.push_str(&ticket.footer());
    }
    message
}

fn breaking_footer(draft: &MessageDraft) -> Option<String> {
    let (first, rest) = draft.breaking_footer.as_deref()?.split_first()?;
    let mut footer = format!("BREAKING CHANGE: {first}");
    for reason in rest {
        footer.push_str("\n  - ");
        footer.push_str(reason);
    }
    Some(footer)
}

static EMPTY_SCOPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*\{scope\}\s*\)").expect("scope pattern must compile"));
static SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("whitespace pattern must compile"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank line pattern must compile"));

fn render_template(draft: &MessageDraft, template: &str) -> String {
    let type_text = if draft.is_breaking {
        format!("{}!", draft.commit_type)
    } else {
        draft.commit_type.to_string()
    };

    let mut text = match &draft.scope {
        Some(scope) => template.replace("{scope}", scope),
        None => EMPTY_SCOPE.replace_all(template, "").replace("{scope}", ""),
    };
    text = text
        .replace("{emoji}", draft.emoji().unwrap_or(""))
        .replace("{type}", &type_text)
        .replace("{description}", &draft.description);

    let body = non_blank(&draft.body);
    if text.contains("{body}") {
        text = text.replace("{body}", body.unwrap_or(""));
    } else if let Some(body) = body {
        text.push_str("\n\n");
        text.push_str(body);
    }

    normalize_whitespace(&text)
}

fn normalize_whitespace(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .map(|line| SPACES.replace_all(line, " ").trim().to_string())
        .collect();
    BLANK_LINES
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

fn non_blank(text: &Option<String>) -> Option<&str> {
    text.as_deref().map(str::trim).filter(|t| !t.is_empty())
}
