//! commitcraft - Conventional commit suggestions from staged changes.
//!
//! # Overview
//!
//! commitcraft classifies the staged changes of a git repository (type,
//! scope, description, breaking changes), learns the project's commit style
//! from recent history, and renders a ranked list of commit message
//! variants. The analysis is deterministic; an AI CLI can optionally add one
//! extra suggestion.

pub mod ai;
pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod git;
pub mod message;

// Re-export commonly used types
pub use analysis::{
    ChangeSet, CommitType, FileChange, FileStatus, HistoryProfile, TicketReference,
    clear_history_cache,
};
pub use config::{Config, load_config};
pub use engine::{ClassificationResult, CommitAssistant, Suggestions, classify_changes};
pub use error::{AiError, ConfigError, GitError};
pub use git::{GitRepository, StagedSnapshot, VersionControl};
pub use message::{CommitMessageVariant, render};
