use super::proxy::site_edit::SiteEditError;
use crate::config::PromptError;
use crate::executor::ExecutorError;
use crate::templates::TemplateError;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("Command execution error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Failed to edit the default site: {0}")]
    SiteEdit(#[from] SiteEditError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("Package installation failed: {0}")]
    Packages(String),

    #[error("User provisioning failed: {0}")]
    User(String),

    #[error("Project setup failed: {0}")]
    Project(String),

    #[error("Supervisor configuration failed: {0}")]
    Supervisor(String),

    #[error("nginx configuration test failed: {0}")]
    ProxyValidation(String),

    #[error("Reverse proxy configuration failed: {0}")]
    Proxy(String),

    #[error("Firewall configuration error: {0}")]
    Firewall(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DeployResult<T> = Result<T, DeployError>;

/// What a finished deployment looks like, including every degraded step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentReport {
    pub service_running: bool,
    pub tls_issued: bool,
    pub security_configured: bool,
    /// The default nginx host was edited in place instead of enabling a new site.
    pub default_site_edited: bool,
    pub warnings: Vec<String>,
}

impl DeploymentReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum DeployerEvent {
    StepStarted(String),
    StepCompleted(String),
    StepSkipped(String, String),
    StepFailed(String, String),
    Warning(String),
}

impl fmt::Display for DeployerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployerEvent::StepStarted(msg) => write!(f, "Started: {}", msg),
            DeployerEvent::StepCompleted(msg) => write!(f, "Completed: {}", msg),
            DeployerEvent::StepSkipped(step, reason) => write!(f, "Skipped: {} ({})", step, reason),
            DeployerEvent::StepFailed(step, err) => write!(f, "Failed: {} - {}", step, err),
            DeployerEvent::Warning(msg) => write!(f, "Warning: {}", msg),
        }
    }
}
