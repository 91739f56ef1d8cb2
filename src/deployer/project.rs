//! Runtime user and application checkout.

use super::system::{require_success, SystemController, UserState};
use super::types::{DeployError, DeployResult};
use crate::config::DeploymentRecord;
use crate::executor::shell::{quote, quote_path};
use crate::templates::TemplateRenderer;
use std::path::PathBuf;

/// Packages installed into the venv when the project ships no requirements file.
pub const FALLBACK_PACKAGES: &str = "flask";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectBuild {
    /// Where a previous checkout was moved before cloning.
    pub previous_checkout: Option<PathBuf>,
    pub used_requirements: bool,
}

pub fn checkout_backup_path(record: &DeploymentRecord, stamp: &str) -> PathBuf {
    PathBuf::from(format!("{}_backup_{}", record.project_dir().display(), stamp))
}

/// Create the runtime user and give nginx a path to its socket.
pub async fn prepare_user(
    system: &mut dyn SystemController,
    record: &DeploymentRecord,
) -> DeployResult<UserState> {
    let state = system.ensure_user(&record.project_user).await?;
    let user = quote(&record.project_user);
    let home = quote(&format!("/home/{}", record.project_user));

    let commands = [
        format!("sudo usermod -aG sudo {}", user),
        format!("sudo chmod 755 {}", home),
        format!("sudo usermod -aG {} www-data", user),
    ];
    for command in &commands {
        let result = system.run(command).await?;
        require_success(result, DeployError::User)?;
    }
    Ok(state)
}

/// Clone the repository into a fresh project directory and build its venv.
pub async fn fetch_and_build(
    system: &mut dyn SystemController,
    record: &DeploymentRecord,
    stamp: &str,
) -> DeployResult<ProjectBuild> {
    let dir = record.project_dir();
    let user = record.project_user.as_str();

    let previous_checkout = if system.dir_exists(&dir).await? {
        let backup = checkout_backup_path(record, stamp);
        let result = system
            .run(&format!("sudo mv {} {}", quote_path(&dir), quote_path(&backup)))
            .await?;
        require_success(result, DeployError::Project)?;
        tracing::info!("Moved existing checkout to {}", backup.display());
        Some(backup)
    } else {
        None
    };

    let result = system
        .run_as(
            user,
            &format!("git clone {} {}", quote(&record.git_repo), quote_path(&dir)),
        )
        .await?;
    require_success(result, DeployError::Project)?;

    let cd = format!("cd {}", quote_path(&dir));
    for step in ["python3 -m venv venv", "venv/bin/pip install --upgrade pip"] {
        let result = system.run_as(user, &format!("{} && {}", cd, step)).await?;
        require_success(result, DeployError::Project)?;
    }

    let used_requirements = system.file_exists(&record.requirements_path()).await?;
    let install = if used_requirements {
        format!("venv/bin/pip install -r {}", quote_path(&record.requirements_path()))
    } else {
        tracing::warn!(
            "No requirements.txt in {}, installing {}",
            record.git_repo,
            FALLBACK_PACKAGES
        );
        format!("venv/bin/pip install {}", FALLBACK_PACKAGES)
    };
    let steps = [
        install,
        "venv/bin/pip install gunicorn".to_string(),
        "mkdir -p run static".to_string(),
    ];
    for step in &steps {
        let result = system.run_as(user, &format!("{} && {}", cd, step)).await?;
        require_success(result, DeployError::Project)?;
    }

    Ok(ProjectBuild {
        previous_checkout,
        used_requirements,
    })
}

/// Write `update.sh` into the project directory.
pub async fn install_update_script(
    system: &mut dyn SystemController,
    renderer: &TemplateRenderer,
    record: &DeploymentRecord,
) -> DeployResult<()> {
    let script = renderer.render_update_script(record)?;
    system
        .write_owned_file(
            &record.update_script_path(),
            &script,
            &record.project_user,
            "755",
        )
        .await
}
