use super::system::{require_success, SystemController};
use super::types::{DeployError, DeployResult};
use crate::config::DeploymentRecord;
use crate::executor::shell::quote;
use crate::templates::TemplateRenderer;

/// Install the gunicorn wrapper and the supervisor program, then start it.
/// Returns whether supervisor reports the program as running.
pub async fn configure_program(
    system: &mut dyn SystemController,
    renderer: &TemplateRenderer,
    record: &DeploymentRecord,
) -> DeployResult<bool> {
    let wrapper = renderer.render_start_script(record)?;
    system
        .write_owned_file(&record.wrapper_path(), &wrapper, &record.project_user, "755")
        .await?;

    let unit = renderer.render_supervisor_unit(record)?;
    system
        .write_file(&record.supervisor_conf_path(), &unit)
        .await?;

    for command in ["sudo supervisorctl reread", "sudo supervisorctl update"] {
        let result = system.run(command).await?;
        require_success(result, DeployError::Supervisor)?;
    }

    // `start` fails for a program that `update` already started.
    let start = system
        .run(&format!("sudo supervisorctl start {}", quote(&record.project_name)))
        .await?;
    if !start.is_success() {
        tracing::debug!("supervisorctl start: {}", start.failure_detail());
    }

    system.program_running(&record.project_name).await
}
