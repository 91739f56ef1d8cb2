use super::error::CliError;
use super::{preflight, ui};
use crate::config::{ConfigStore, TerminalPrompter};
use crate::deployer::HostController;
use crate::executor::LocalCommandExecutor;
use crate::manager::Manager;
use crate::probe::ReqwestProbe;
use tracing::{info, instrument};

/// Open the manager for the stored deployment. The record is read fresh on
/// every start, so the launcher never goes stale.
#[instrument(name = "manage", skip(store), fields(store = %store.path().display()))]
pub async fn run(store: &ConfigStore) -> Result<(), CliError> {
    let record = store
        .load()?
        .ok_or_else(|| CliError::NoDeployment(store.path().to_path_buf()))?;

    preflight::ensure_interactive()?;
    let mut executor = LocalCommandExecutor::new();
    preflight::ensure_privileges(&mut executor).await?;

    info!(
        "Managing {} ({})",
        ui::format_highlight(&record.project_name),
        record.domain_name
    );
    let probe = ReqwestProbe::new()?;
    let mut prompter = TerminalPrompter::new();
    let mut system = HostController::new(&mut executor);
    Manager::new(&record, &mut system, &probe, &mut prompter)
        .run()
        .await?;
    Ok(())
}
