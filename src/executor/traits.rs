use async_trait::async_trait;
use std::path::Path;

use super::{CommandResult, ExecutorError};

/// A trait for executing shell commands on the host being provisioned.
#[async_trait]
pub trait CommandExecutor {
    /// Execute a command and return a `CommandResult` containing stdout/stderr/exit code.
    async fn execute_command(&mut self, command: &str) -> Result<CommandResult, ExecutorError>;

    /// Run a command attached to the operator's terminal and return its exit code.
    /// Used for `tail -f` style views; an interrupt ends the child, not the caller.
    async fn execute_interactive(&mut self, command: &str) -> Result<i32, ExecutorError>;
}

/// Privileged file access. System configuration lives in root-owned paths,
/// so implementations are expected to elevate where needed.
#[async_trait]
pub trait FileAccess {
    async fn read_file(&mut self, path: &Path) -> Result<String, ExecutorError>;

    /// Replace the file at `path` with `contents`.
    async fn write_file(&mut self, path: &Path, contents: &str) -> Result<(), ExecutorError>;

    async fn file_exists(&mut self, path: &Path) -> Result<bool, ExecutorError>;

    async fn dir_exists(&mut self, path: &Path) -> Result<bool, ExecutorError>;
}

/// Everything the deployer and manager need from a host.
pub trait HostExec: CommandExecutor + FileAccess {}
impl<T: CommandExecutor + FileAccess> HostExec for T {}
