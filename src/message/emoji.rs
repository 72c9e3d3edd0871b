//! Gitmoji for each commit type.

use crate::analysis::CommitType;

pub fn emoji_for(commit_type: CommitType) -> &'static str {
    match commit_type {
        CommitType::Feat => "✨",
        CommitType::Fix => "🐛",
        CommitType::Docs => "📝",
        CommitType::Style => "💄",
        CommitType::Refactor => "♻️",
        CommitType::Perf => "⚡️",
        CommitType::Test => "✅",
        CommitType::Build => "📦",
        CommitType::Ci => "👷",
        CommitType::Chore => "🔧",
        CommitType::Revert => "⏪",
    }
}
