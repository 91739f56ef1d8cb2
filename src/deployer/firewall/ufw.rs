use super::FirewallRule;
use crate::config::DeploymentRecord;
use crate::deployer::system::{require_success, SystemController};
use crate::deployer::types::{DeployError, DeployResult};

pub struct UfwManager<'a> {
    system: &'a mut dyn SystemController,
}

impl<'a> UfwManager<'a> {
    pub fn new(system: &'a mut dyn SystemController) -> Self {
        Self { system }
    }

    /// Rules opened for a deployment. SSH always comes first to prevent lockout.
    pub fn rules_for(record: &DeploymentRecord) -> Vec<FirewallRule> {
        let mut rules = vec![
            FirewallRule::Application("OpenSSH".to_string()),
            FirewallRule::Application("Nginx Full".to_string()),
        ];
        if let Some(port) = record.proxy_port() {
            rules.push(FirewallRule::TcpPort(port));
        }
        rules
    }

    /// Apply default policies and rules, then enable ufw.
    pub async fn configure(&mut self, record: &DeploymentRecord) -> DeployResult<()> {
        for policy in ["deny incoming", "allow outgoing"] {
            self.ufw(&format!("default {}", policy)).await?;
        }

        for rule in Self::rules_for(record) {
            self.add_rule(&rule, &record.project_name).await?;
        }

        self.ufw("--force enable").await?;
        tracing::info!("ufw enabled");
        Ok(())
    }

    async fn add_rule(&mut self, rule: &FirewallRule, project: &str) -> DeployResult<()> {
        let comment = format!("webdeploy: {}", project);
        self.ufw(&format!(
            "allow {} comment '{}'",
            rule.ufw_target(),
            comment.replace('\'', "")
        ))
        .await
    }

    async fn ufw(&mut self, args: &str) -> DeployResult<()> {
        let result = self.system.run(&format!("sudo ufw {}", args)).await?;
        require_success(result, DeployError::Firewall)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::record::tests::sample_record;
    use crate::config::DeploymentType;

    #[test]
    fn test_port_deployment_opens_its_port() {
        let rules = UfwManager::rules_for(&sample_record(DeploymentType::Port(8080)));
        assert_eq!(rules[0], FirewallRule::Application("OpenSSH".to_string()));
        assert_eq!(rules.last(), Some(&FirewallRule::TcpPort(8080)));

        let rules = UfwManager::rules_for(&sample_record(DeploymentType::Main));
        assert_eq!(rules.len(), 2);
    }
}
