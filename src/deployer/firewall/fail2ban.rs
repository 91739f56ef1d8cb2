use crate::config::paths::{FAIL2BAN_JAIL_CONF, FAIL2BAN_JAIL_LOCAL};
use crate::config::DeploymentRecord;
use crate::deployer::managed_block::{upsert_appended, BlockChange};
use crate::deployer::system::{require_success, SystemController};
use crate::deployer::types::{DeployError, DeployResult};
use crate::templates::TemplateRenderer;
use std::path::Path;

pub struct Fail2banManager<'a> {
    system: &'a mut dyn SystemController,
}

impl<'a> Fail2banManager<'a> {
    pub fn new(system: &'a mut dyn SystemController) -> Self {
        Self { system }
    }

    /// Install the project's jail and filter. Returns whether fail2ban
    /// restarted cleanly.
    pub async fn configure(
        &mut self,
        renderer: &TemplateRenderer,
        record: &DeploymentRecord,
    ) -> DeployResult<bool> {
        let jail_local = Path::new(FAIL2BAN_JAIL_LOCAL);
        if !self.system.file_exists(jail_local).await? {
            if self.system.file_exists(Path::new(FAIL2BAN_JAIL_CONF)).await? {
                let result = self
                    .system
                    .run(&format!("sudo cp {} {}", FAIL2BAN_JAIL_CONF, FAIL2BAN_JAIL_LOCAL))
                    .await?;
                require_success(result, DeployError::Firewall)?;
            } else {
                self.system.write_file(jail_local, "").await?;
            }
        }

        let contents = self.system.read_file(jail_local).await?;
        let jail = renderer.render_fail2ban_jail(record)?;
        match upsert_appended(&contents, &record.project_name, &jail) {
            BlockChange::Unchanged => {
                tracing::info!("fail2ban jail {} is already up to date", record.project_name);
            }
            change => {
                if let Some(updated) = change.into_contents() {
                    self.system.write_file(jail_local, &updated).await?;
                }
            }
        }

        let filter = renderer.render_fail2ban_filter(record)?;
        self.system
            .write_file(&record.fail2ban_filter_path(), &filter)
            .await?;

        let restart = self.system.restart_unit("fail2ban").await?;
        if !restart.is_success() {
            tracing::debug!("fail2ban restart: {}", restart.failure_detail());
        }
        Ok(restart.is_success())
    }
}
