use super::record::{is_safe_identifier, DeploymentRecord, DeploymentType};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const STORE_FILE_NAME: &str = ".deploy_config";

const KEY_PROJECT_NAME: &str = "PROJECT_NAME";
const KEY_PROJECT_USER: &str = "PROJECT_USER";
const KEY_PROJECT_DIR: &str = "PROJECT_DIR";
const KEY_DOMAIN_NAME: &str = "DOMAIN_NAME";
const KEY_GIT_REPO: &str = "GIT_REPO";
const KEY_APP_ENTRY_FILE: &str = "APP_ENTRY_FILE";
const KEY_APP_ENTRY_VAR: &str = "APP_ENTRY_VAR";
const KEY_USE_TLS: &str = "USE_TLS";
const KEY_USE_SECURITY: &str = "USE_SECURITY";
const KEY_DEPLOYMENT_TYPE: &str = "DEPLOYMENT_TYPE";
const KEY_PROXY_PORT: &str = "PROXY_PORT";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read configuration {path}: {source}", path = .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write configuration {path}: {message}", path = .path.display())]
    Write { path: PathBuf, message: String },

    #[error("Cannot determine configuration location: {0}")]
    Location(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Flat `KEY="value"` file holding the deployment record between runs.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `.deploy_config` next to the running executable.
    pub fn default_path() -> StoreResult<PathBuf> {
        let exe = std::env::current_exe().map_err(|e| StoreError::Location(e.to_string()))?;
        let dir = exe
            .parent()
            .ok_or_else(|| StoreError::Location(format!("{} has no parent", exe.display())))?;
        Ok(dir.join(STORE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the store lives in; generated launchers go next to it.
    pub fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Load the record. `Ok(None)` means there is no usable record and
    /// everything has to be collected again.
    pub fn load(&self) -> StoreResult<Option<DeploymentRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No configuration at {}", self.path.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let values = match parse_assignments(&content) {
            Ok(values) => values,
            Err(reason) => {
                tracing::warn!(
                    "Ignoring configuration {}: {}",
                    self.path.display(),
                    reason
                );
                return Ok(None);
            }
        };

        match record_from_values(&values) {
            Ok(record) => Ok(Some(record)),
            Err(reason) => {
                tracing::warn!(
                    "Ignoring incomplete configuration {}: {}",
                    self.path.display(),
                    reason
                );
                Ok(None)
            }
        }
    }

    /// Rewrite the whole file from `record`.
    pub fn save(&self, record: &DeploymentRecord) -> StoreResult<()> {
        fs::write(&self.path, render_record(record)).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        tracing::info!("Configuration saved to {}", self.path.display());
        Ok(())
    }
}

/// Serialize a record as assignment lines.
pub fn render_record(record: &DeploymentRecord) -> String {
    let project_dir = record.project_dir().display().to_string();
    let use_tls = record.use_tls.to_string();
    let use_security = record.use_security.to_string();
    let proxy_port = record.proxy_port().map(|p| p.to_string());

    let mut entries = vec![
        (KEY_PROJECT_NAME, record.project_name.as_str()),
        (KEY_PROJECT_USER, record.project_user.as_str()),
        (KEY_PROJECT_DIR, project_dir.as_str()),
        (KEY_DOMAIN_NAME, record.domain_name.as_str()),
        (KEY_GIT_REPO, record.git_repo.as_str()),
        (KEY_APP_ENTRY_FILE, record.app_entry_file.as_str()),
        (KEY_APP_ENTRY_VAR, record.app_entry_var.as_str()),
        (KEY_USE_TLS, use_tls.as_str()),
        (KEY_USE_SECURITY, use_security.as_str()),
        (KEY_DEPLOYMENT_TYPE, record.deployment_type.key()),
    ];
    if let Some(port) = proxy_port.as_deref() {
        entries.push((KEY_PROXY_PORT, port));
    }

    let mut out = String::from("# Deployment configuration written by webdeploy\n");
    for (key, value) in entries {
        out.push_str(&format!("{}=\"{}\"\n", key, escape_value(value)));
    }
    out
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '"' | '$' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Parse `KEY=value` lines. Blank lines and `#` comments are skipped;
/// any other line without an assignment makes the whole file invalid.
pub fn parse_assignments(content: &str) -> Result<HashMap<String, String>, String> {
    let mut values = HashMap::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| format!("line {} is not an assignment", index + 1))?;
        let key = key.trim();
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("line {} has an invalid key '{}'", index + 1, key));
        }

        let value = parse_value(value.trim())
            .map_err(|reason| format!("line {}: {}", index + 1, reason))?;
        values.insert(key.to_string(), value);
    }

    Ok(values)
}

fn parse_value(raw: &str) -> Result<String, String> {
    let mut chars = raw.chars();
    let (value, rest) = match chars.next() {
        Some('"') => {
            let mut value = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some('n') => value.push('\n'),
                        Some(other) => value.push(other),
                        None => return Err("dangling escape".to_string()),
                    },
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            if !closed {
                return Err("unterminated double quote".to_string());
            }
            (value, chars.as_str())
        }
        Some('\'') => {
            let inner = chars.as_str();
            let end = inner
                .find('\'')
                .ok_or_else(|| "unterminated single quote".to_string())?;
            (inner[..end].to_string(), &inner[end + 1..])
        }
        _ => {
            let value = match raw.find(" #") {
                Some(pos) => &raw[..pos],
                None => raw,
            };
            return Ok(value.trim().to_string());
        }
    };

    let rest = rest.trim();
    if !rest.is_empty() && !rest.starts_with('#') {
        return Err(format!("unexpected text after quoted value: {}", rest));
    }
    Ok(value)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        _ => Err(format!("{} has invalid boolean '{}'", key, value)),
    }
}

fn record_from_values(values: &HashMap<String, String>) -> Result<DeploymentRecord, String> {
    let required = |key: &str| -> Result<String, String> {
        match values.get(key) {
            Some(value) if !value.is_empty() => Ok(value.clone()),
            _ => Err(format!("missing {}", key)),
        }
    };

    let project_name = required(KEY_PROJECT_NAME)?;
    let project_user = required(KEY_PROJECT_USER)?;
    for (key, value) in [
        (KEY_PROJECT_NAME, &project_name),
        (KEY_PROJECT_USER, &project_user),
    ] {
        if !is_safe_identifier(value) {
            return Err(format!("{} '{}' is not a safe identifier", key, value));
        }
    }

    let deployment_type = match required(KEY_DEPLOYMENT_TYPE)?.as_str() {
        "main" => DeploymentType::Main,
        "subdirectory" => DeploymentType::Subdirectory,
        "port" => {
            let raw = required(KEY_PROXY_PORT)?;
            let port = raw
                .parse::<u16>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(|| format!("{} '{}' is not a valid port", KEY_PROXY_PORT, raw))?;
            DeploymentType::Port(port)
        }
        other => return Err(format!("unknown {} '{}'", KEY_DEPLOYMENT_TYPE, other)),
    };

    Ok(DeploymentRecord {
        project_name,
        project_user,
        domain_name: required(KEY_DOMAIN_NAME)?,
        git_repo: required(KEY_GIT_REPO)?,
        app_entry_file: required(KEY_APP_ENTRY_FILE)?,
        app_entry_var: required(KEY_APP_ENTRY_VAR)?,
        use_tls: parse_bool(KEY_USE_TLS, &required(KEY_USE_TLS)?)?,
        use_security: parse_bool(KEY_USE_SECURITY, &required(KEY_USE_SECURITY)?)?,
        deployment_type,
    })
}
