//! Closed sets of manager commands and how they are chosen.

use crate::cli::ui;

/// A menu whose entries are the variants of `Self`.
pub trait MenuItem: Copy + Sized + 'static {
    const TITLE: &'static str;

    /// `(key, command, label)` in display order.
    const ITEMS: &'static [(&'static str, Self, &'static str)];

    fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        Self::ITEMS
            .iter()
            .find(|(key, _, _)| *key == input)
            .map(|(_, item, _)| *item)
    }

    fn render() -> String {
        let mut out = format!("\n{}\n", ui::format_header(Self::TITLE));
        for (key, _, label) in Self::ITEMS {
            out.push_str(&format!("  {:>2}) {}\n", key, label));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainCommand {
    Status,
    Restart,
    Logs,
    Update,
    Ssl,
    Firewall,
    Backup,
    Health,
    UrlTest,
    Info,
    Diagnostics,
    Exit,
}

impl MenuItem for MainCommand {
    const TITLE: &'static str = "Project manager";
    const ITEMS: &'static [(&'static str, Self, &'static str)] = &[
        ("1", MainCommand::Status, "Status"),
        ("2", MainCommand::Restart, "Restart application"),
        ("3", MainCommand::Logs, "Logs"),
        ("4", MainCommand::Update, "Update from git"),
        ("5", MainCommand::Ssl, "SSL certificates"),
        ("6", MainCommand::Firewall, "Firewall and fail2ban"),
        ("7", MainCommand::Backup, "Backup project"),
        ("8", MainCommand::Health, "Quick health check"),
        ("9", MainCommand::UrlTest, "Test URLs"),
        ("10", MainCommand::Info, "Project info"),
        ("11", MainCommand::Diagnostics, "Diagnostics"),
        ("0", MainCommand::Exit, "Exit"),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogsCommand {
    AppLog,
    AccessLog,
    ErrorLog,
    FollowAppLog,
    Back,
}

impl MenuItem for LogsCommand {
    const TITLE: &'static str = "Logs";
    const ITEMS: &'static [(&'static str, Self, &'static str)] = &[
        ("1", LogsCommand::AppLog, "Application log (last 50 lines)"),
        ("2", LogsCommand::AccessLog, "nginx access log"),
        ("3", LogsCommand::ErrorLog, "nginx error log"),
        ("4", LogsCommand::FollowAppLog, "Follow application log (Ctrl-C to stop)"),
        ("0", LogsCommand::Back, "Back"),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslCommand {
    InstallOrRenew,
    ListCertificates,
    DryRunRenewal,
    Back,
}

impl MenuItem for SslCommand {
    const TITLE: &'static str = "SSL certificates";
    const ITEMS: &'static [(&'static str, Self, &'static str)] = &[
        ("1", SslCommand::InstallOrRenew, "Install or renew certificate"),
        ("2", SslCommand::ListCertificates, "List certificates"),
        ("3", SslCommand::DryRunRenewal, "Test renewal (dry run)"),
        ("0", SslCommand::Back, "Back"),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirewallCommand {
    UfwStatus,
    JailStatus,
    UnbanIp,
    Back,
}

impl MenuItem for FirewallCommand {
    const TITLE: &'static str = "Firewall";
    const ITEMS: &'static [(&'static str, Self, &'static str)] = &[
        ("1", FirewallCommand::UfwStatus, "ufw status"),
        ("2", FirewallCommand::JailStatus, "fail2ban jail status"),
        ("3", FirewallCommand::UnbanIp, "Unban an IP address"),
        ("0", FirewallCommand::Back, "Back"),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticsCommand {
    AppLog,
    NginxErrorLog,
    NginxConfigTest,
    Socket,
    ListeningPorts,
    Processes,
    DiskUsage,
    RestartAll,
    Back,
}

impl MenuItem for DiagnosticsCommand {
    const TITLE: &'static str = "Diagnostics";
    const ITEMS: &'static [(&'static str, Self, &'static str)] = &[
        ("1", DiagnosticsCommand::AppLog, "Application log"),
        ("2", DiagnosticsCommand::NginxErrorLog, "nginx error log"),
        ("3", DiagnosticsCommand::NginxConfigTest, "nginx configuration test"),
        ("4", DiagnosticsCommand::Socket, "Socket file and permissions"),
        ("5", DiagnosticsCommand::ListeningPorts, "Listening ports"),
        ("6", DiagnosticsCommand::Processes, "Processes"),
        ("7", DiagnosticsCommand::DiskUsage, "Disk usage"),
        ("8", DiagnosticsCommand::RestartAll, "Restart application and nginx"),
        ("0", DiagnosticsCommand::Back, "Back"),
    ];
}
