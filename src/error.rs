//! Error types for commitcraft modules using thiserror.
//!
//! Only the collaborators can fail. The classification and rendering path
//! never returns these; it degrades to defaults instead.

use thiserror::Error;

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to open repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Failed to read staged changes: {0}")]
    DiffFailed(#[source] git2::Error),

    #[error("Failed to walk commit history: {0}")]
    RevwalkError(#[source] git2::Error),

    #[error("Failed to resolve HEAD: {0}")]
    HeadFailed(#[source] git2::Error),

    #[error("Failed to create commit: {0}")]
    CommitFailed(#[source] git2::Error),

    #[error("Git config error (missing user.name or user.email): {0}")]
    ConfigError(#[source] git2::Error),

    #[error("No staged changes to commit")]
    NothingStaged,
}

/// Errors from reading a configuration file.
///
/// These are logged and swallowed by `load_config`; callers always receive a
/// complete configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown commit type '{0}'")]
    UnknownCommitType(String),
}

/// Errors from the optional AI description provider.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("AI CLI '{0}' not found in PATH")]
    NotInstalled(String),

    #[error("Unsupported AI provider '{0}' (expected 'claude' or 'codex')")]
    UnsupportedProvider(String),

    #[error("Failed to spawn AI process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("AI process timed out after {0} seconds")]
    Timeout(u64),

    #[error("AI CLI exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("AI returned an unusable description: {0}")]
    InvalidResponse(String),
}
