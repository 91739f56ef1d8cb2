use crate::config::{CollectError, PromptError, StoreError};
use crate::deployer::DeployError;
use crate::executor::ExecutorError;
use crate::manager::ManagerError;
use crate::probe::ProbeError;
use crate::templates::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("An interactive terminal is required")]
    NotInteractive,

    #[error("webdeploy must not run as root; use a regular account with sudo rights")]
    RunningAsRoot,

    #[error("Passwordless sudo is required (`sudo -n true` failed)")]
    SudoUnavailable,

    #[error("No deployment configuration found at {}; deploy first", .0.display())]
    NoDeployment(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Manager(#[from] ManagerError),
}
