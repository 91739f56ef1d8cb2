use super::menu::{DiagnosticsCommand, FirewallCommand, LogsCommand, SslCommand};
use crate::config::DeploymentRecord;
use crate::deployer::tls::certbot_renew_command;
use crate::executor::shell::{quote, quote_path};

pub const LOG_TAIL_LINES: u32 = 50;

fn tail(path: &std::path::Path) -> String {
    format!("sudo tail -n {} {}", LOG_TAIL_LINES, quote_path(path))
}

/// Shell commands behind a logs entry. Following is interactive.
pub fn log_command(command: LogsCommand, record: &DeploymentRecord) -> Option<String> {
    match command {
        LogsCommand::AppLog => Some(tail(&record.app_log_path())),
        LogsCommand::AccessLog => Some(tail(&record.access_log_path())),
        LogsCommand::ErrorLog => Some(tail(&record.error_log_path())),
        LogsCommand::FollowAppLog => Some(format!(
            "sudo tail -f {}",
            quote_path(&record.app_log_path())
        )),
        LogsCommand::Back => None,
    }
}

pub fn ssl_command(command: SslCommand, record: &DeploymentRecord) -> Option<String> {
    match command {
        SslCommand::InstallOrRenew => Some(certbot_renew_command(&record.domain_name)),
        SslCommand::ListCertificates => Some("sudo certbot certificates".to_string()),
        SslCommand::DryRunRenewal => Some("sudo certbot renew --dry-run".to_string()),
        SslCommand::Back => None,
    }
}

/// Read-only firewall views. Unbanning needs an address and is handled separately.
pub fn firewall_command(command: FirewallCommand, record: &DeploymentRecord) -> Option<String> {
    match command {
        FirewallCommand::UfwStatus => Some("sudo ufw status verbose".to_string()),
        FirewallCommand::JailStatus => Some(format!(
            "sudo fail2ban-client status {}",
            quote(&record.project_name)
        )),
        FirewallCommand::UnbanIp | FirewallCommand::Back => None,
    }
}

pub fn unban_command(record: &DeploymentRecord, address: std::net::IpAddr) -> String {
    format!(
        "sudo fail2ban-client set {} unbanip {}",
        quote(&record.project_name),
        address
    )
}

/// Commands run, in order, for a diagnostics entry.
pub fn diagnostic_commands(command: DiagnosticsCommand, record: &DeploymentRecord) -> Vec<String> {
    match command {
        DiagnosticsCommand::AppLog => vec![tail(&record.app_log_path())],
        DiagnosticsCommand::NginxErrorLog => vec![tail(&record.error_log_path())],
        DiagnosticsCommand::NginxConfigTest => vec!["sudo nginx -t".to_string()],
        DiagnosticsCommand::Socket => vec![
            format!("sudo ls -l {}", quote_path(&record.socket_path())),
            format!("sudo ls -ld {}", quote_path(&record.run_dir())),
        ],
        DiagnosticsCommand::ListeningPorts => vec!["sudo ss -tlnp".to_string()],
        DiagnosticsCommand::Processes => {
            vec!["pgrep -a -f 'gunicorn|nginx|supervisord'".to_string()]
        }
        DiagnosticsCommand::DiskUsage => vec![
            "df -h /".to_string(),
            format!("sudo du -sh {}", quote_path(&record.project_dir())),
        ],
        DiagnosticsCommand::RestartAll => vec![
            format!("sudo supervisorctl restart {}", quote(&record.project_name)),
            "sudo systemctl restart nginx".to_string(),
        ],
        DiagnosticsCommand::Back => Vec::new(),
    }
}
