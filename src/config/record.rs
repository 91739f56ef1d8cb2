use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap();
}

/// True when `value` can be used as a user name, service name and file name.
pub fn is_safe_identifier(value: &str) -> bool {
    IDENTIFIER.is_match(value)
}

/// How the application is exposed through nginx. Chosen once at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentType {
    /// Dedicated virtual host on port 80.
    Main,
    /// Mounted under `/{project_name}/` on an existing or new host.
    Subdirectory,
    /// Dedicated virtual host on its own port.
    Port(u16),
}

impl DeploymentType {
    pub fn key(&self) -> &'static str {
        match self {
            DeploymentType::Main => "main",
            DeploymentType::Subdirectory => "subdirectory",
            DeploymentType::Port(_) => "port",
        }
    }

    pub fn proxy_port(&self) -> Option<u16> {
        match self {
            DeploymentType::Port(port) => Some(*port),
            _ => None,
        }
    }
}

impl fmt::Display for DeploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentType::Main => write!(f, "main domain"),
            DeploymentType::Subdirectory => write!(f, "subdirectory"),
            DeploymentType::Port(port) => write!(f, "port {}", port),
        }
    }
}

/// The persisted description of one managed application instance.
///
/// A record is always complete: the store either yields one of these or
/// nothing. `project_dir` is not a field because it is always derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRecord {
    pub project_name: String,
    pub project_user: String,
    pub domain_name: String,
    pub git_repo: String,
    pub app_entry_file: String,
    pub app_entry_var: String,
    pub use_tls: bool,
    pub use_security: bool,
    pub deployment_type: DeploymentType,
}

impl DeploymentRecord {
    pub fn project_dir(&self) -> PathBuf {
        PathBuf::from(format!(
            "/home/{}/{}",
            self.project_user, self.project_name
        ))
    }

    pub fn proxy_port(&self) -> Option<u16> {
        self.deployment_type.proxy_port()
    }

    /// `module:variable` target handed to gunicorn.
    pub fn wsgi_target(&self) -> String {
        let module = self
            .app_entry_file
            .strip_suffix(".py")
            .unwrap_or(&self.app_entry_file);
        format!("{}:{}", module, self.app_entry_var)
    }
}

/// Flat view of a record used by templates and summaries.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub project_name: String,
    pub project_user: String,
    pub project_dir: String,
    pub domain_name: String,
    pub git_repo: String,
    pub app_entry_file: String,
    pub app_entry_var: String,
    pub use_tls: bool,
    pub use_security: bool,
    pub deployment_type: String,
    pub proxy_port: Option<u16>,
}

impl From<&DeploymentRecord> for RecordSummary {
    fn from(record: &DeploymentRecord) -> Self {
        Self {
            project_name: record.project_name.clone(),
            project_user: record.project_user.clone(),
            project_dir: record.project_dir().display().to_string(),
            domain_name: record.domain_name.clone(),
            git_repo: record.git_repo.clone(),
            app_entry_file: record.app_entry_file.clone(),
            app_entry_var: record.app_entry_var.clone(),
            use_tls: record.use_tls,
            use_security: record.use_security,
            deployment_type: record.deployment_type.key().to_string(),
            proxy_port: record.proxy_port(),
        }
    }
}
