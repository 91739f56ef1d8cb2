pub mod firewall;
pub mod managed_block;
pub mod project;
pub mod proxy;
pub mod service;
pub mod supervisor;
pub mod system;
pub mod tls;
pub mod types;
pub use service::Deployer;
pub use system::{HostController, SystemController};
pub use types::{DeployError, DeployResult, DeployerEvent, DeploymentReport};

/// Timestamp used in backup file names.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}
