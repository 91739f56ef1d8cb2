//! Restart, update and backup of the deployed project.

use super::ManagerResult;
use crate::config::{DeploymentRecord, Prompter};
use crate::deployer::system::require_success;
use crate::deployer::{DeployError, SystemController};
use crate::executor::shell::{quote, quote_path};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

pub async fn restart_program(
    system: &mut dyn SystemController,
    record: &DeploymentRecord,
) -> ManagerResult<()> {
    let result = system
        .run(&format!("sudo supervisorctl restart {}", quote(&record.project_name)))
        .await?;
    require_success(result, DeployError::Supervisor)?;
    Ok(())
}

/// SHA-256 of the requirements file, `None` when the project has none.
pub async fn manifest_digest(
    system: &mut dyn SystemController,
    record: &DeploymentRecord,
) -> ManagerResult<Option<String>> {
    let path = record.requirements_path();
    if !system.file_exists(&path).await? {
        return Ok(None);
    }
    let contents = system.read_file(&path).await?;
    Ok(Some(format!("{:x}", Sha256::digest(contents.as_bytes()))))
}

pub fn bundle_path(record: &DeploymentRecord, stamp: &str) -> PathBuf {
    record
        .project_dir()
        .with_file_name(format!("{}_{}.bundle", record.project_name, stamp))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub bundle: PathBuf,
    pub dependencies_reinstalled: bool,
    pub restarted: bool,
}

/// Fetch, keep a bundle of the current history, pull and reinstall the
/// requirements when they changed.
pub async fn update_project(
    system: &mut dyn SystemController,
    prompter: &mut dyn Prompter,
    record: &DeploymentRecord,
    stamp: &str,
) -> ManagerResult<UpdateOutcome> {
    let user = record.project_user.as_str();
    let cd = format!("cd {}", quote_path(&record.project_dir()));
    let bundle = bundle_path(record, stamp);

    for step in [
        "git fetch --all --prune".to_string(),
        format!("git bundle create {} --all", quote_path(&bundle)),
    ] {
        let result = system.run_as(user, &format!("{} && {}", cd, step)).await?;
        require_success(result, DeployError::Project)?;
    }

    let before = manifest_digest(system, record).await?;
    let result = system
        .run_as(user, &format!("{} && git pull --ff-only", cd))
        .await?;
    require_success(result, DeployError::Project)?;
    let after = manifest_digest(system, record).await?;

    let dependencies_reinstalled = after.is_some() && before != after;
    if dependencies_reinstalled {
        tracing::info!("requirements.txt changed, reinstalling dependencies");
        let result = system
            .run_as(
                user,
                &format!(
                    "{} && venv/bin/pip install -r {}",
                    cd,
                    quote_path(&record.requirements_path())
                ),
            )
            .await?;
        require_success(result, DeployError::Project)?;
    }

    let restarted = prompter.confirm("Restart the application now?", true)?;
    if restarted {
        restart_program(system, record).await?;
    }

    Ok(UpdateOutcome {
        bundle,
        dependencies_reinstalled,
        restarted,
    })
}

pub fn archive_path(record: &DeploymentRecord, stamp: &str) -> PathBuf {
    record
        .backup_dir()
        .join(format!("{}_{}.tar.gz", record.project_name, stamp))
}

/// Archive the project directory without its venv and socket directory.
pub async fn backup_project(
    system: &mut dyn SystemController,
    record: &DeploymentRecord,
    stamp: &str,
) -> ManagerResult<PathBuf> {
    let archive = archive_path(record, stamp);
    let name = quote(&record.project_name);
    let command = format!(
        "mkdir -p {backups} && tar -czf {archive} --exclude={name}/venv --exclude={name}/run -C {home} {name}",
        backups = quote_path(&record.backup_dir()),
        archive = quote_path(&archive),
        name = name,
        home = quote(&format!("/home/{}", record.project_user)),
    );
    let result = system.run_as(&record.project_user, &command).await?;
    require_success(result, DeployError::Project)?;
    Ok(archive)
}
