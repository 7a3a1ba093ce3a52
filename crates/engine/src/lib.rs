use std::{path::PathBuf, process::Stdio, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{process::Command, time::timeout};
use tracing::{debug, warn};

const DEFAULT_INVOCATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid {field}: {reason}")]
    InvalidArgument {
        field: &'static str,
        reason: String,
    },
    #[error("failed to spawn engine binary {binary}: {source}")]
    Spawn {
        binary: String,
        source: std::io::Error,
    },
    #[error("engine exited with {status}: {stderr}")]
    NonZeroExit {
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("engine invocation timed out after {0:?}")]
    Timeout(Duration),
}

/// Port over the external key-value engine. The relay's HTTP layer depends
/// only on this trait; the subprocess adapter below is one implementation.
#[async_trait]
pub trait KvEngine: Send + Sync {
    async fn insert(&self, key: &str, value: &str) -> Result<String, EngineError>;
    async fn update(&self, key: &str, value: &str) -> Result<String, EngineError>;
    async fn delete(&self, key: &str) -> Result<String, EngineError>;
    async fn search(&self, key: &str) -> Result<String, EngineError>;
    async fn list_all(&self) -> Result<String, EngineError>;
}

/// Validates a key or value before it is handed to the engine.
///
/// Arguments are always passed as an argument vector, so shell
/// metacharacters are inert; the checks here protect the engine's
/// line-oriented persistence format instead. The engine stores records as
/// whitespace-separated tokens, one pair per line, so embedded whitespace or
/// control characters would corrupt it.
pub fn validate_token(field: &'static str, raw: &str) -> Result<String, EngineError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidArgument {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(EngineError::InvalidArgument {
            field,
            reason: "must not contain whitespace or control characters".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Invokes the engine binary once per operation, one subcommand per call.
///
/// Never goes through a shell: the binary is spawned directly with an
/// argument vector, so untrusted keys and values cannot alter the command.
pub struct SubprocessEngine {
    binary: PathBuf,
    invocation_timeout: Duration,
}

impl SubprocessEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            invocation_timeout: DEFAULT_INVOCATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, invocation_timeout: Duration) -> Self {
        self.invocation_timeout = invocation_timeout;
        self
    }

    async fn run(&self, args: &[&str]) -> Result<String, EngineError> {
        debug!(binary = %self.binary.display(), subcommand = args[0], "invoking engine");
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = timeout(self.invocation_timeout, cmd.output())
            .await
            .map_err(|_| EngineError::Timeout(self.invocation_timeout))?
            .map_err(|source| EngineError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(status = %output.status, %stderr, "engine invocation failed");
            return Err(EngineError::NonZeroExit {
                status: output.status,
                stderr,
            });
        }

        // Leading/trailing whitespace is stripped; interior newlines in
        // multi-line output (getAll) are preserved.
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl KvEngine for SubprocessEngine {
    async fn insert(&self, key: &str, value: &str) -> Result<String, EngineError> {
        let key = validate_token("key", key)?;
        let value = validate_token("value", value)?;
        self.run(&["insertKv", key.as_str(), value.as_str()]).await
    }

    async fn update(&self, key: &str, value: &str) -> Result<String, EngineError> {
        let key = validate_token("key", key)?;
        let value = validate_token("value", value)?;
        self.run(&["updateKv", key.as_str(), value.as_str()]).await
    }

    async fn delete(&self, key: &str) -> Result<String, EngineError> {
        let key = validate_token("key", key)?;
        self.run(&["deleteKv", key.as_str()]).await
    }

    async fn search(&self, key: &str) -> Result<String, EngineError> {
        let key = validate_token("key", key)?;
        self.run(&["searchKv", key.as_str()]).await
    }

    async fn list_all(&self) -> Result<String, EngineError> {
        self.run(&["getAll"]).await
    }
}
