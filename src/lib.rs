pub mod cli;
pub mod config;
pub mod deployer;
pub mod executor;
pub mod manager;
pub mod probe;
pub mod templates;
