pub mod site_edit;

use super::system::{require_success, SystemController};
use super::types::{DeployError, DeployResult};
use crate::config::paths::NGINX_DEFAULT_SITE;
use crate::config::{DeploymentRecord, DeploymentType};
use crate::executor::shell::quote_path;
use crate::templates::TemplateRenderer;
use site_edit::{inject_location, SiteEdit};
use std::path::{Path, PathBuf};

/// What happened to the nginx configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyChange {
    /// The default host was edited in place (subdirectory mode).
    pub default_site_edited: bool,
    /// Copy of the default host taken before editing it.
    pub backup: Option<PathBuf>,
}

pub fn default_site_backup_path(stamp: &str) -> PathBuf {
    PathBuf::from(format!("{}.backup.{}", NGINX_DEFAULT_SITE, stamp))
}

/// Write the site for `record`, validate the whole nginx configuration and
/// reload. A failed `nginx -t` aborts before the reload.
pub async fn configure_proxy(
    system: &mut dyn SystemController,
    renderer: &TemplateRenderer,
    record: &DeploymentRecord,
    stamp: &str,
) -> DeployResult<ProxyChange> {
    let default_site = Path::new(NGINX_DEFAULT_SITE);
    let change = match record.deployment_type {
        DeploymentType::Subdirectory if system.file_exists(default_site).await? => {
            let backup = edit_default_site(system, renderer, record, stamp).await?;
            ProxyChange {
                default_site_edited: true,
                backup: Some(backup),
            }
        }
        _ => {
            let site = renderer.render_site(record)?;
            system
                .write_file(&record.site_available_path(), &site)
                .await?;
            enable_site(system, record).await?;
            ProxyChange {
                default_site_edited: false,
                backup: None,
            }
        }
    };

    if let Err(err) = system.validate_proxy().await {
        if let Some(backup) = &change.backup {
            restore_default_site(system, backup).await?;
        }
        return Err(err);
    }
    system.reload_proxy().await?;
    Ok(change)
}

/// Put the default host back from `backup` so a rejected edit does not
/// break the next reload.
async fn restore_default_site(
    system: &mut dyn SystemController,
    backup: &Path,
) -> DeployResult<()> {
    let contents = system.read_file(backup).await?;
    system
        .write_file(Path::new(NGINX_DEFAULT_SITE), &contents)
        .await?;
    tracing::warn!(
        "nginx rejected the edited default site, restored it from {}",
        backup.display()
    );
    Ok(())
}

async fn edit_default_site(
    system: &mut dyn SystemController,
    renderer: &TemplateRenderer,
    record: &DeploymentRecord,
    stamp: &str,
) -> DeployResult<PathBuf> {
    let default_site = Path::new(NGINX_DEFAULT_SITE);
    let contents = system.read_file(default_site).await?;

    let backup = default_site_backup_path(stamp);
    system.write_file(&backup, &contents).await?;
    tracing::info!("Backed up default site to {}", backup.display());

    let location = renderer.render_subdirectory_location(record)?;
    match inject_location(&contents, &record.project_name, &location)? {
        SiteEdit::Unchanged => {
            tracing::info!("Location /{}/ is already up to date", record.project_name);
        }
        SiteEdit::AlreadyPresent => {
            tracing::info!(
                "Default site already has an unmanaged /{}/ location, leaving it alone",
                record.project_name
            );
        }
        edit => {
            if let Some(updated) = edit.into_contents() {
                system.write_file(default_site, &updated).await?;
                tracing::info!("Added /{}/ to the default site", record.project_name);
            }
        }
    }
    Ok(backup)
}

async fn enable_site(
    system: &mut dyn SystemController,
    record: &DeploymentRecord,
) -> DeployResult<()> {
    let link = record.site_enabled_path();
    if system.file_exists(&link).await? {
        tracing::info!("Site {} is already enabled", record.project_name);
        return Ok(());
    }
    let result = system
        .run(&format!(
            "sudo ln -s {} {}",
            quote_path(&record.site_available_path()),
            quote_path(&link)
        ))
        .await?;
    require_success(result, DeployError::Proxy)?;
    Ok(())
}
