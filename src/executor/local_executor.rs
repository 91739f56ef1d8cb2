use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::error::ExecutorError;
use super::shell::quote_path;
use super::traits::{CommandExecutor, FileAccess};
use super::types::{CommandOutput, CommandResult};

/// Runs commands on the local machine through `bash -c`.
/// File access goes through `sudo` because most targets live under `/etc`.
pub struct LocalCommandExecutor;

impl Default for LocalCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCommandExecutor {
    pub fn new() -> Self {
        Self
    }

    fn file_error(path: &Path, message: impl Into<String>) -> ExecutorError {
        ExecutorError::FileAccess {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl CommandExecutor for LocalCommandExecutor {
    async fn execute_command(&mut self, command: &str) -> Result<CommandResult, ExecutorError> {
        if command.trim().is_empty() {
            return Err(ExecutorError::LocalError("No command provided".to_string()));
        }

        tracing::trace!("Executing: {}", command);
        let start_time = Instant::now();

        let output = Command::new("bash")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ExecutorError::LocalError(e.to_string()))?;

        let mut cmd_output = CommandOutput::new();
        cmd_output.stdout = output.stdout;
        cmd_output.stderr = output.stderr;
        // Killed by a signal: no code, treat as failure.
        cmd_output.exit_code = output.status.code().unwrap_or(-1);
        cmd_output.duration = start_time.elapsed();

        Ok(CommandResult {
            command: command.to_string(),
            output: cmd_output,
        })
    }

    async fn execute_interactive(&mut self, command: &str) -> Result<i32, ExecutorError> {
        let mut child = Command::new("bash")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| ExecutorError::LocalError(e.to_string()))?;

        // The terminal delivers SIGINT to the whole foreground group; listening
        // for it here keeps this process alive while the child exits.
        let status = tokio::select! {
            status = child.wait() => status,
            _ = tokio::signal::ctrl_c() => child.wait().await,
        }
        .map_err(|e| ExecutorError::LocalError(e.to_string()))?;

        Ok(status.code().unwrap_or(-1))
    }
}

#[async_trait]
impl FileAccess for LocalCommandExecutor {
    async fn read_file(&mut self, path: &Path) -> Result<String, ExecutorError> {
        if !self.file_exists(path).await? {
            return Err(ExecutorError::FileNotFound(path.to_path_buf()));
        }
        let result = self
            .execute_command(&format!("sudo cat {}", quote_path(path)))
            .await?;
        if !result.is_success() {
            return Err(Self::file_error(path, result.failure_detail()));
        }
        result
            .output
            .to_stdout_string()
            .map_err(|e| Self::file_error(path, e.to_string()))
    }

    async fn write_file(&mut self, path: &Path, contents: &str) -> Result<(), ExecutorError> {
        let mut child = Command::new("sudo")
            .arg("tee")
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Self::file_error(path, e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(contents.as_bytes())
                .await
                .map_err(|e| Self::file_error(path, e.to_string()))?;
            // Dropping stdin closes the pipe so tee can finish.
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Self::file_error(path, e.to_string()))?;
        if !output.status.success() {
            return Err(Self::file_error(
                path,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }

    async fn file_exists(&mut self, path: &Path) -> Result<bool, ExecutorError> {
        let result = self
            .execute_command(&format!("sudo test -e {}", quote_path(path)))
            .await?;
        Ok(result.is_success())
    }

    async fn dir_exists(&mut self, path: &Path) -> Result<bool, ExecutorError> {
        let result = self
            .execute_command(&format!("sudo test -d {}", quote_path(path)))
            .await?;
        Ok(result.is_success())
    }
}
