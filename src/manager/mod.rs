//! Interactive management of a deployed project.
//!
//! The manager is a loop over [`MainCommand`]: each choice runs one handler
//! and returns to the menu. Handler failures are reported and never end the
//! loop; only `Exit` or a closed input stream does.

pub mod diagnostics;
pub mod health;
pub mod maintenance;
pub mod menu;
pub mod status;

use crate::cli::ui;
use crate::config::{DeploymentRecord, PromptError, Prompter, RecordSummary};
use crate::deployer::{DeployError, SystemController};
use crate::executor::shell::quote_path;
use crate::probe::HttpProbe;
use menu::{DiagnosticsCommand, FirewallCommand, LogsCommand, MainCommand, MenuItem, SslCommand};
use status::ExpiryLevel;
use std::net::IpAddr;
use tabled::{settings::Style, Table, Tabled};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("'{0}' is not a valid IP address")]
    InvalidAddress(String),
}

pub type ManagerResult<T> = Result<T, ManagerError>;

#[derive(Tabled)]
struct InfoRow {
    #[tabled(rename = "Setting")]
    setting: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn info_rows(summary: &RecordSummary) -> Vec<InfoRow> {
    let yes_no = |flag: bool| if flag { "yes" } else { "no" }.to_string();
    let mut rows = vec![
        InfoRow { setting: "Project", value: summary.project_name.clone() },
        InfoRow { setting: "User", value: summary.project_user.clone() },
        InfoRow { setting: "Directory", value: summary.project_dir.clone() },
        InfoRow { setting: "Domain", value: summary.domain_name.clone() },
        InfoRow { setting: "Repository", value: summary.git_repo.clone() },
        InfoRow {
            setting: "Entry point",
            value: format!("{}:{}", summary.app_entry_file, summary.app_entry_var),
        },
        InfoRow { setting: "Deployment", value: summary.deployment_type.clone() },
        InfoRow { setting: "TLS", value: yes_no(summary.use_tls) },
        InfoRow { setting: "Security", value: yes_no(summary.use_security) },
    ];
    if let Some(port) = summary.proxy_port {
        rows.insert(7, InfoRow { setting: "Port", value: port.to_string() });
    }
    rows
}

pub struct Manager<'a> {
    record: &'a DeploymentRecord,
    system: &'a mut dyn SystemController,
    probe: &'a dyn HttpProbe,
    prompter: &'a mut dyn Prompter,
}

impl<'a> Manager<'a> {
    pub fn new(
        record: &'a DeploymentRecord,
        system: &'a mut dyn SystemController,
        probe: &'a dyn HttpProbe,
        prompter: &'a mut dyn Prompter,
    ) -> Self {
        Self {
            record,
            system,
            probe,
            prompter,
        }
    }

    /// Show the menu until the operator exits.
    pub async fn run(&mut self) -> ManagerResult<()> {
        loop {
            self.prompter.say(&MainCommand::render());
            let choice = self.prompter.input("Select an option", None)?;
            match MainCommand::parse(&choice) {
                Some(MainCommand::Exit) => {
                    tracing::debug!("Manager exiting");
                    return Ok(());
                }
                Some(command) => {
                    if let Err(e) = self.dispatch(command).await {
                        tracing::debug!("{:?} failed: {}", command, e);
                        self.prompter.say(&ui::format_error(&e.to_string()));
                    }
                }
                None => self
                    .prompter
                    .say(&ui::format_warning(&format!("Unknown option '{}'", choice.trim()))),
            }
        }
    }

    pub async fn dispatch(&mut self, command: MainCommand) -> ManagerResult<()> {
        match command {
            MainCommand::Status => self.show_status().await,
            MainCommand::Restart => {
                maintenance::restart_program(self.system, self.record).await?;
                self.prompter
                    .say(&ui::format_success("Application restarted"));
                Ok(())
            }
            MainCommand::Logs => self.logs_menu().await,
            MainCommand::Update => self.update().await,
            MainCommand::Ssl => self.ssl_menu().await,
            MainCommand::Firewall => self.firewall_menu().await,
            MainCommand::Backup => {
                let archive = maintenance::backup_project(
                    self.system,
                    self.record,
                    &crate::deployer::timestamp(),
                )
                .await?;
                self.prompter.say(&ui::format_success(&format!(
                    "Backup written to {}",
                    archive.display()
                )));
                Ok(())
            }
            MainCommand::Health => self.health().await,
            MainCommand::UrlTest => {
                for outcome in health::test_urls(self.probe, self.record).await? {
                    let line = health::describe_outcome(&outcome);
                    let line = if outcome.status.is_some_and(|s| s < 400) {
                        ui::format_success(&line)
                    } else {
                        ui::format_error(&line)
                    };
                    self.prompter.say(&line);
                }
                Ok(())
            }
            MainCommand::Info => self.project_info().await,
            MainCommand::Diagnostics => self.diagnostics_menu().await,
            MainCommand::Exit => Ok(()),
        }
    }

    /// Run a command and print its combined output.
    async fn show(&mut self, command: &str) -> ManagerResult<bool> {
        self.prompter.say(&ui::format_highlight(&format!("$ {}", command)));
        let result = self.system.run(command).await?;
        let stdout = String::from_utf8_lossy(&result.output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&result.output.stderr).trim_end().to_string();
        if !stdout.is_empty() {
            self.prompter.say(&stdout);
        }
        if !stderr.is_empty() {
            self.prompter.say(&stderr);
        }
        if !result.is_success() {
            self.prompter.say(&ui::format_warning(&format!(
                "exited with status {}",
                result.output.exit_code
            )));
        }
        Ok(result.is_success())
    }

    fn choose<T: MenuItem>(&mut self) -> ManagerResult<Option<T>> {
        self.prompter.say(&T::render());
        let choice = self.prompter.input("Select an option", Some("0"))?;
        let item = T::parse(&choice);
        if item.is_none() {
            self.prompter
                .say(&ui::format_warning(&format!("Unknown option '{}'", choice.trim())));
        }
        Ok(item)
    }

    async fn show_status(&mut self) -> ManagerResult<()> {
        let report = status::collect_status(self.system, self.record).await?;
        let paint = |ok: bool, text: &str| {
            if ok {
                ui::format_success(text)
            } else {
                ui::format_error(text)
            }
        };

        self.prompter.say(&ui::format_header(&format!(
            "Status of {}",
            self.record.project_name
        )));
        let program = if report.program_detail.is_empty() {
            self.record.project_name.clone()
        } else {
            report.program_detail.clone()
        };
        self.prompter.say(&format!(
            "Application: {}",
            paint(report.program_running, &program)
        ));
        self.prompter.say(&format!(
            "nginx:       {}",
            paint(report.nginx_active, if report.nginx_active { "active" } else { "inactive" })
        ));
        self.prompter.say(&report.gauges.to_string());
        for url in &report.urls {
            self.prompter.say(&format!("URL:         {}", ui::format_highlight(url.as_str())));
        }
        if let Some(expiry) = &report.certificate {
            let text = format!("Certificate: {}", expiry);
            self.prompter.say(&match expiry.level() {
                ExpiryLevel::Normal => ui::format_success(&text),
                ExpiryLevel::Warning => ui::format_warning(&text),
                ExpiryLevel::Critical => ui::format_error(&text),
            });
        } else if self.record.use_tls {
            self.prompter
                .say(&ui::format_warning("Certificate: not installed"));
        }
        if !report.recent_log.is_empty() {
            self.prompter.say(&ui::format_header("Recent log"));
            self.prompter.say(&report.recent_log.join("\n"));
        }
        Ok(())
    }

    async fn health(&mut self) -> ManagerResult<()> {
        let report = health::check_health(self.system, self.probe, self.record).await?;
        let detail = health::describe_outcome(&report.probe);
        if report.program_running {
            self.prompter.say(&ui::format_success(&format!(
                "service: {} running",
                self.record.project_name
            )));
        } else {
            self.prompter.say(&ui::format_warning(&format!(
                "service: {} not running",
                self.record.project_name
            )));
        }
        if report.responding() {
            self.prompter
                .say(&ui::format_success(&format!("responding: {}", detail)));
        } else {
            self.prompter
                .say(&ui::format_error(&format!("not responding: {}", detail)));
        }
        Ok(())
    }

    async fn update(&mut self) -> ManagerResult<()> {
        let outcome = maintenance::update_project(
            self.system,
            self.prompter,
            self.record,
            &crate::deployer::timestamp(),
        )
        .await?;
        self.prompter.say(&format!(
            "History saved to {}",
            outcome.bundle.display()
        ));
        if outcome.dependencies_reinstalled {
            self.prompter.say("Dependencies reinstalled");
        }
        let done = if outcome.restarted {
            "Update complete, application restarted"
        } else {
            "Update complete, restart pending"
        };
        self.prompter.say(&ui::format_success(done));
        Ok(())
    }

    async fn logs_menu(&mut self) -> ManagerResult<()> {
        let Some(command) = self.choose::<LogsCommand>()? else {
            return Ok(());
        };
        let Some(shell) = diagnostics::log_command(command, self.record) else {
            return Ok(());
        };
        if command == LogsCommand::FollowAppLog {
            self.prompter.say("Press Ctrl-C to return to the menu");
            self.system.run_interactive(&shell).await?;
        } else {
            self.show(&shell).await?;
        }
        Ok(())
    }

    async fn ssl_menu(&mut self) -> ManagerResult<()> {
        let Some(command) = self.choose::<SslCommand>()? else {
            return Ok(());
        };
        if let Some(shell) = diagnostics::ssl_command(command, self.record) {
            self.show(&shell).await?;
            if command == SslCommand::InstallOrRenew {
                let timer = self.system.run("sudo systemctl enable --now certbot.timer").await?;
                if !timer.is_success() {
                    self.prompter
                        .say(&ui::format_warning("Could not enable certbot.timer"));
                }
            }
        }
        Ok(())
    }

    async fn firewall_menu(&mut self) -> ManagerResult<()> {
        let Some(command) = self.choose::<FirewallCommand>()? else {
            return Ok(());
        };
        if command == FirewallCommand::UnbanIp {
            let answer = self.prompter.input("IP address to unban", None)?;
            let address: IpAddr = answer
                .trim()
                .parse()
                .map_err(|_| ManagerError::InvalidAddress(answer.trim().to_string()))?;
            if self.show(&diagnostics::unban_command(self.record, address)).await? {
                self.prompter
                    .say(&ui::format_success(&format!("{} unbanned", address)));
            }
            return Ok(());
        }
        if let Some(shell) = diagnostics::firewall_command(command, self.record) {
            self.show(&shell).await?;
        }
        Ok(())
    }

    async fn diagnostics_menu(&mut self) -> ManagerResult<()> {
        let Some(command) = self.choose::<DiagnosticsCommand>()? else {
            return Ok(());
        };
        if command == DiagnosticsCommand::Socket
            && !self.system.file_exists(&self.record.socket_path()).await?
        {
            self.prompter.say(&ui::format_error(&format!(
                "Socket {} does not exist",
                self.record.socket_path().display()
            )));
        }
        for shell in diagnostics::diagnostic_commands(command, self.record) {
            self.show(&shell).await?;
        }
        Ok(())
    }

    async fn project_info(&mut self) -> ManagerResult<()> {
        let summary = RecordSummary::from(self.record);
        let mut table = Table::new(info_rows(&summary));
        table.with(Style::rounded());
        self.prompter.say(&table.to_string());

        let dir = quote_path(&self.record.project_dir());
        let queries = [
            ("Branch", "rev-parse --abbrev-ref HEAD"),
            ("Last commit", "log -1 --format='%h %s (%cr)'"),
            ("Remote", "remote get-url origin"),
        ];
        for (label, query) in queries {
            let result = self
                .system
                .run_as(&self.record.project_user, &format!("git -C {} {}", dir, query))
                .await?;
            let value = if result.is_success() {
                result.stdout_trimmed()
            } else {
                "unknown".to_string()
            };
            self.prompter.say(&format!("{:<12} {}", format!("{}:", label), value));
        }
        Ok(())
    }
}
