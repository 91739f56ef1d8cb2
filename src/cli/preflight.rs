use super::error::CliError;
use crate::executor::CommandExecutor;
use std::io::IsTerminal;

/// Prompts read from stdin; without a terminal they would see endless empty answers.
pub fn ensure_interactive() -> Result<(), CliError> {
    if std::io::stdin().is_terminal() {
        Ok(())
    } else {
        Err(CliError::NotInteractive)
    }
}

/// Refuse root and require passwordless sudo.
pub async fn ensure_privileges(executor: &mut (dyn CommandExecutor + Send)) -> Result<(), CliError> {
    let id = executor.execute_command("id -u").await?;
    if id.stdout_trimmed() == "0" {
        return Err(CliError::RunningAsRoot);
    }

    let sudo = executor.execute_command("sudo -n true").await?;
    if !sudo.is_success() {
        tracing::debug!("sudo check: {}", sudo.failure_detail());
        return Err(CliError::SudoUnavailable);
    }
    Ok(())
}
