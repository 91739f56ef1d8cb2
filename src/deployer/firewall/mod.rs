mod fail2ban;
mod ufw;
use std::fmt;

pub use fail2ban::Fail2banManager;
pub use ufw::UfwManager;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirewallRule {
    /// A ufw application profile such as `OpenSSH`.
    Application(String),
    TcpPort(u16),
}

impl FirewallRule {
    /// Argument accepted by `ufw allow`.
    pub fn ufw_target(&self) -> String {
        match self {
            FirewallRule::Application(name) => format!("'{}'", name),
            FirewallRule::TcpPort(port) => format!("{}/tcp", port),
        }
    }
}

impl fmt::Display for FirewallRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirewallRule::Application(name) => write!(f, "{}", name),
            FirewallRule::TcpPort(port) => write!(f, "{}/tcp", port),
        }
    }
}
