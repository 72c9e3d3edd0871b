//! Suggestion composition.
//!
//! Builds the recommended message and its alternatives from one
//! classification. Each alternative drops a single element and is emitted
//! only when that changes the rendered text.

use serde::Serialize;

use crate::analysis::{CommitType, HistoryProfile, TicketReference, scope_from_history};
use crate::config::Config;
use crate::engine::ClassificationResult;
use crate::message::render::{MessageDraft, render, select_template};

/// Upper bound on deterministic variants.
pub const MAX_VARIANTS: usize = 6;

pub const LABEL_RECOMMENDED: &str = "Recommended";
pub const LABEL_BREAKING: &str = "Breaking Change";
pub const LABEL_CONCISE: &str = "Concise";
pub const LABEL_DETAILED: &str = "Detailed";
pub const LABEL_COMPACT: &str = "Compact";
pub const LABEL_NO_TICKET: &str = "Without Ticket";
pub const LABEL_NO_BREAKING: &str = "Without Breaking Flag";
pub const LABEL_AI: &str = "AI Suggestion";

/// One rendered candidate message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitMessageVariant {
    pub id: usize,
    pub label: String,
    #[serde(rename = "type")]
    pub commit_type: CommitType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub is_breaking: bool,
    pub full: String,
    #[serde(skip)]
    draft: MessageDraft,
}

impl CommitMessageVariant {
    pub fn draft(&self) -> &MessageDraft {
        &self.draft
    }
}

/// Build the ordered variant list. The first entry is always the recommendation.
///
/// `profile` is consulted for emoji inclusion when the config leaves it
/// unset, and for a scope when the classification found none.
pub fn compose(
    classification: &ClassificationResult,
    profile: Option<&HistoryProfile>,
    ticket: Option<&TicketReference>,
    config: &Config,
) -> Vec<CommitMessageVariant> {
    let include_emoji = config
        .include_emoji
        .or(profile.map(|p| p.uses_emojis))
        .unwrap_or(false);

    let scope = classification.scope.clone().or_else(|| {
        let paths = classification.files_by_status.paths();
        profile.and_then(|p| scope_from_history(&paths, p))
    });

    let breaking = classification.is_breaking_change;
    let base = MessageDraft {
        commit_type: classification.commit_type,
        scope,
        description: classification.description.clone(),
        body: classification.body.clone(),
        include_emoji,
        is_breaking: breaking,
        breaking_footer: (breaking && config.breaking_change_detection.include_footer)
            .then(|| classification.breaking_reasons.clone()),
        ticket: ticket.cloned(),
    };

    let mut list = VariantList::new(config);
    let label = if breaking {
        LABEL_BREAKING
    } else {
        LABEL_RECOMMENDED
    };
    list.push_first(label, base.clone());

    if base.scope.is_some() {
        list.push(LABEL_CONCISE, MessageDraft {
            scope: None,
            ..base.clone()
        });
    }
    if let Some(alternative) = &classification.alternative_description {
        list.push(LABEL_DETAILED, MessageDraft {
            description: alternative.clone(),
            ..base.clone()
        });
    }
    if base.body.is_some() {
        list.push(LABEL_COMPACT, MessageDraft {
            body: None,
            ..base.clone()
        });
    }
    if base.ticket.is_some() {
        list.push(LABEL_NO_TICKET, MessageDraft {
            ticket: None,
            ..base.clone()
        });
    }
    if base.is_breaking {
        list.push(LABEL_NO_BREAKING, MessageDraft {
            is_breaking: false,
            breaking_footer: None,
            ..base
        });
    }

    list.variants
}

/// Append an "AI Suggestion" built from the first variant with `description` swapped in.
///
/// Returns false when the list is empty or the rendering duplicates an existing variant.
pub fn append_ai_variant(
    variants: &mut Vec<CommitMessageVariant>,
    description: &str,
    config: &Config,
) -> bool {
    let Some(first) = variants.first() else {
        return false;
    };
    let draft = MessageDraft {
        description: description.trim().to_string(),
        ..first.draft.clone()
    };

    let mut list = VariantList {
        config,
        variants: std::mem::take(variants),
    };
    let added = list.push(LABEL_AI, draft);
    *variants = list.variants;
    added
}

struct VariantList<'a> {
    config: &'a Config,
    variants: Vec<CommitMessageVariant>,
}

impl<'a> VariantList<'a> {
    fn new(config: &'a Config) -> Self {
        Self {
            config,
            variants: Vec::with_capacity(MAX_VARIANTS),
        }
    }

    fn build(&self, label: &str, mut draft: MessageDraft) -> CommitMessageVariant {
        draft.fit_header(self.config.max_message_length);
        let full = render(&draft, select_template(&self.config.templates, &draft));
        CommitMessageVariant {
            id: self.variants.len() + 1,
            label: label.to_string(),
            commit_type: draft.commit_type,
            scope: draft.scope.clone(),
            description: draft.description.clone(),
            body: draft.body.clone(),
            is_breaking: draft.is_breaking,
            full,
            draft,
        }
    }

    fn push_first(&mut self, label: &str, draft: MessageDraft) {
        let variant = self.build(label, draft);
        self.variants.push(variant);
    }

    fn push(&mut self, label: &str, draft: MessageDraft) -> bool {
        let variant = self.build(label, draft);
        if self.variants.iter().any(|v| v.full == variant.full) {
            return false;
        }
        self.variants.push(variant);
        true
    }
}
