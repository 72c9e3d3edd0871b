//! AI CLI spawning.

use std::env;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::ai::prompt::{build_prompt, parse_description};
use crate::ai::{AiRequest, DescriptionProvider};
use crate::config::AiSettings;
use crate::error::AiError;

/// Environment variable to override the configured timeout.
pub const TIMEOUT_ENV_VAR: &str = "COMMITCRAFT_AI_TIMEOUT";

/// Get the timeout for one AI call.
///
/// Reads `COMMITCRAFT_AI_TIMEOUT` (seconds) if set, otherwise uses
/// `default_secs`. Logs a warning if the variable holds an invalid value.
pub fn get_timeout(default_secs: u64) -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                warn!(
                    "Invalid {} value '{}', using default {}s",
                    TIMEOUT_ENV_VAR, v, default_secs
                );
                Duration::from_secs(default_secs)
            }
        },
        _ => Duration::from_secs(default_secs),
    }
}

/// Supported command-line providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliKind {
    Claude,
    Codex,
}

impl CliKind {
    pub fn from_name(name: &str) -> Result<Self, AiError> {
        match name.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => Ok(Self::Claude),
            "codex" | "openai" => Ok(Self::Codex),
            other => Err(AiError::UnsupportedProvider(other.to_string())),
        }
    }

    pub fn program(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
        }
    }

    fn api_key_var(self) -> &'static str {
        match self {
            Self::Claude => "ANTHROPIC_API_KEY",
            Self::Codex => "OPENAI_API_KEY",
        }
    }
}

/// Describes changes by running the `claude` or `codex` CLI.
#[derive(Debug, Clone)]
pub struct CliProvider {
    kind: CliKind,
    /// Resolved executable path.
    program: PathBuf,
    api_key: Option<String>,
    model: Option<String>,
    timeout: Duration,
}

impl CliProvider {
    /// Build a provider from settings, checking the CLI is on `PATH`.
    pub fn from_settings(settings: &AiSettings) -> Result<Self, AiError> {
        let kind = CliKind::from_name(&settings.provider)?;

        // `which` gives cross-platform executable detection.
        let program = which::which(kind.program())
            .map_err(|_| AiError::NotInstalled(kind.program().to_string()))?;

        Ok(Self {
            kind,
            program,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            timeout: get_timeout(settings.timeout_secs),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(&self, prompt: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        match self.kind {
            CliKind::Claude => {
                cmd.arg("-p").arg(prompt).arg("--output-format").arg("text");
                if let Some(model) = &self.model {
                    cmd.arg("--model").arg(model);
                }
            }
            CliKind::Codex => {
                cmd.arg("exec");
                if let Some(model) = &self.model {
                    cmd.arg("--model").arg(model);
                }
                cmd.arg(prompt);
            }
        }
        if let Some(key) = &self.api_key {
            cmd.env(self.kind.api_key_var(), key);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl DescriptionProvider for CliProvider {
    async fn describe(&self, request: &AiRequest) -> Result<String, AiError> {
        let prompt = build_prompt(&request.summary, &request.diff);
        let timeout_secs = self.timeout.as_secs();
        debug!("Requesting description from {}", self.kind.program());

        let output = timeout(self.timeout, self.command(&prompt).output())
            .await
            .map_err(|_| AiError::Timeout(timeout_secs))?
            .map_err(AiError::SpawnFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let code = output.status.code().unwrap_or(-1);
            return Err(AiError::NonZeroExit { code, stderr });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_description(&stdout)
    }
}
