//! Commit message variants and rendering.

pub mod compose;
pub mod emoji;
pub mod render;

pub use compose::{CommitMessageVariant, append_ai_variant, compose};
pub use emoji::emoji_for;
pub use render::{MessageDraft, render, select_template};
