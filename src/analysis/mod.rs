//! Deterministic change analysis.
//!
//! Everything here is synchronous and infallible: arbitrary diff text and
//! empty change sets degrade to defaults instead of errors.

pub mod breaking;
pub mod change;
pub mod classify;
pub mod describe;
pub mod history;
pub mod scope;
pub mod ticket;

pub use breaking::{BreakingChangeReport, detect_breaking_changes};
pub use change::{
    ChangeSet, ChangesByStatus, DiffStats, FileCategory, FileChange, FileStatus, FileTypeCounts,
    StatusCounts,
};
pub use classify::{CommitType, RULES, classify, classify_explained};
pub use describe::{alternative_description, describe, large_change_body};
pub use history::{HistoryAnalyzer, HistoryProfile, analyze_subjects, clear_history_cache};
pub use scope::{resolve_scope, scope_from_history};
pub use ticket::{TicketReference, TicketSource, detect_ticket};
