use super::error::CliError;
use crate::config::ConfigStore;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

const VERSION_INFO: &str = env!("WEBDEPLOY_BUILD_VERSION");

#[derive(Parser, Debug)]
#[command(name = "webdeploy")]
#[command(
    about = "Provision a Python web application behind gunicorn, supervisor and nginx",
    long_about = None,
    version = VERSION_INFO
)]
pub struct Cli {
    /// Ask only for the git repository and use defaults for everything else
    #[arg(long, conflicts_with = "manage")]
    pub quick: bool,

    /// Open the management menu for the existing deployment
    #[arg(long)]
    pub manage: bool,

    /// Deployment configuration file (default: .deploy_config next to the executable)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase message verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The configuration store selected by `--config`, made absolute so the
    /// generated manager launcher works from any directory.
    pub fn store(&self) -> Result<ConfigStore, CliError> {
        let path = match &self.config {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => std::env::current_dir()
                .map_err(|e| CliError::ConfigError(e.to_string()))?
                .join(path),
            None => ConfigStore::default_path()?,
        };
        Ok(ConfigStore::new(path))
    }
}
