//! Host capabilities used by the deployer and the manager.

use super::types::{DeployError, DeployResult};
use crate::config::DeploymentRecord;
use crate::executor::shell::{as_user, quote, quote_path};
use crate::executor::{CommandResult, HostExec};
use async_trait::async_trait;
use std::path::Path;

pub const BASE_PACKAGES: &[&str] = &[
    "python3",
    "python3-pip",
    "python3-venv",
    "git",
    "nginx",
    "supervisor",
    "curl",
];
pub const TLS_PACKAGES: &[&str] = &["certbot", "python3-certbot-nginx"];
pub const SECURITY_PACKAGES: &[&str] = &["ufw", "fail2ban"];

pub fn required_packages(record: &DeploymentRecord) -> Vec<&'static str> {
    let mut packages = BASE_PACKAGES.to_vec();
    if record.use_tls {
        packages.extend_from_slice(TLS_PACKAGES);
    }
    if record.use_security {
        packages.extend_from_slice(SECURITY_PACKAGES);
    }
    packages
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserState {
    Created,
    Existing,
}

/// Turn a non-zero exit into `error(detail)`.
pub fn require_success(
    result: CommandResult,
    error: impl FnOnce(String) -> DeployError,
) -> DeployResult<CommandResult> {
    if result.is_success() {
        Ok(result)
    } else {
        Err(error(format!(
            "`{}` exited with status {}: {}",
            result.command,
            result.output.exit_code,
            result.failure_detail()
        )))
    }
}

/// Everything provisioning needs from the machine, expressed as intents.
#[async_trait]
pub trait SystemController: Send {
    /// Run a command; a non-zero exit is returned, not raised.
    async fn run(&mut self, command: &str) -> DeployResult<CommandResult>;

    /// Run a command as `user` from that user's point of view.
    async fn run_as(&mut self, user: &str, command: &str) -> DeployResult<CommandResult>;

    /// Attach a command to the terminal until it exits or is interrupted.
    async fn run_interactive(&mut self, command: &str) -> DeployResult<i32>;

    async fn read_file(&mut self, path: &Path) -> DeployResult<String>;

    async fn write_file(&mut self, path: &Path, contents: &str) -> DeployResult<()>;

    async fn file_exists(&mut self, path: &Path) -> DeployResult<bool>;

    async fn dir_exists(&mut self, path: &Path) -> DeployResult<bool>;

    async fn install_packages(&mut self, packages: &[&str]) -> DeployResult<()>;

    async fn ensure_user(&mut self, user: &str) -> DeployResult<UserState>;

    /// Write `contents` and hand the file to `owner` with `mode`.
    async fn write_owned_file(
        &mut self,
        path: &Path,
        contents: &str,
        owner: &str,
        mode: &str,
    ) -> DeployResult<()>;

    /// `supervisorctl status` exit status; 0 means RUNNING.
    async fn program_running(&mut self, program: &str) -> DeployResult<bool>;

    async fn validate_proxy(&mut self) -> DeployResult<()>;

    async fn reload_proxy(&mut self) -> DeployResult<()>;

    async fn restart_unit(&mut self, unit: &str) -> DeployResult<CommandResult>;
}

/// `SystemController` for the machine behind a `HostExec`.
pub struct HostController<'a> {
    executor: &'a mut (dyn HostExec + Send),
}

impl<'a> HostController<'a> {
    pub fn new(executor: &'a mut (dyn HostExec + Send)) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl SystemController for HostController<'_> {
    async fn run(&mut self, command: &str) -> DeployResult<CommandResult> {
        tracing::debug!("Running: {}", command);
        let result = self.executor.execute_command(command).await?;
        if !result.is_success() {
            tracing::debug!(
                "`{}` exited with {}: {}",
                command,
                result.output.exit_code,
                result.failure_detail()
            );
        }
        tracing::trace!("`{}` took {:?}", command, result.duration());
        Ok(result)
    }

    async fn run_as(&mut self, user: &str, command: &str) -> DeployResult<CommandResult> {
        self.run(&as_user(user, command)).await
    }

    async fn run_interactive(&mut self, command: &str) -> DeployResult<i32> {
        Ok(self.executor.execute_interactive(command).await?)
    }

    async fn read_file(&mut self, path: &Path) -> DeployResult<String> {
        Ok(self.executor.read_file(path).await?)
    }

    async fn write_file(&mut self, path: &Path, contents: &str) -> DeployResult<()> {
        tracing::debug!("Writing {}", path.display());
        Ok(self.executor.write_file(path, contents).await?)
    }

    async fn file_exists(&mut self, path: &Path) -> DeployResult<bool> {
        Ok(self.executor.file_exists(path).await?)
    }

    async fn dir_exists(&mut self, path: &Path) -> DeployResult<bool> {
        Ok(self.executor.dir_exists(path).await?)
    }

    async fn install_packages(&mut self, packages: &[&str]) -> DeployResult<()> {
        let update = self
            .run("sudo DEBIAN_FRONTEND=noninteractive apt-get update")
            .await?;
        require_success(update, DeployError::Packages)?;

        let install = format!(
            "sudo DEBIAN_FRONTEND=noninteractive apt-get install -y {}",
            packages.join(" ")
        );
        let result = self.run(&install).await?;
        require_success(result, DeployError::Packages)?;
        tracing::info!("Installed packages: {}", packages.join(", "));
        Ok(())
    }

    async fn ensure_user(&mut self, user: &str) -> DeployResult<UserState> {
        let user = quote(user);
        if self.run(&format!("id -u {}", user)).await?.is_success() {
            tracing::info!("User {} already exists, skipping creation", user);
            return Ok(UserState::Existing);
        }

        let result = self
            .run(&format!("sudo adduser --disabled-password --gecos \"\" {}", user))
            .await?;
        require_success(result, DeployError::User)?;
        tracing::info!("Created user {}", user);
        Ok(UserState::Created)
    }

    async fn write_owned_file(
        &mut self,
        path: &Path,
        contents: &str,
        owner: &str,
        mode: &str,
    ) -> DeployResult<()> {
        self.write_file(path, contents).await?;
        let path = quote_path(path);
        let owner = quote(owner);
        let result = self
            .run(&format!(
                "sudo chown {owner}:{owner} {path} && sudo chmod {mode} {path}",
                owner = owner,
                path = path,
                mode = mode
            ))
            .await?;
        require_success(result, |detail| {
            DeployError::Other(anyhow::anyhow!("Failed to set ownership: {}", detail))
        })?;
        Ok(())
    }

    async fn program_running(&mut self, program: &str) -> DeployResult<bool> {
        let result = self
            .run(&format!("sudo supervisorctl status {}", quote(program)))
            .await?;
        Ok(result.is_success())
    }

    async fn validate_proxy(&mut self) -> DeployResult<()> {
        let result = self.run("sudo nginx -t").await?;
        require_success(result, DeployError::ProxyValidation)?;
        Ok(())
    }

    async fn reload_proxy(&mut self) -> DeployResult<()> {
        let result = self.run("sudo systemctl reload nginx").await?;
        require_success(result, DeployError::Proxy)?;
        Ok(())
    }

    async fn restart_unit(&mut self, unit: &str) -> DeployResult<CommandResult> {
        self.run(&format!("sudo systemctl restart {}", quote(unit)))
            .await
    }
}
