use super::error::CliError;
use super::parser::Cli;
use super::{preflight, ui};
use crate::config::{
    collect_full, collect_quick, ConfigStore, DeploymentRecord, Prompter, RecordSummary,
    TerminalPrompter,
};
use crate::deployer::{Deployer, DeployerEvent, DeploymentReport, HostController};
use crate::executor::LocalCommandExecutor;
use crate::manager::status::access_urls;
use crate::probe::{lookup_external_ip, HttpProbe, ReqwestProbe};
use crate::templates::TemplateRenderer;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{info, instrument};

pub fn describe_record(record: &DeploymentRecord) -> String {
    let summary = RecordSummary::from(record);
    let mut lines = vec![
        format!("  Project:     {}", summary.project_name),
        format!("  User:        {}", summary.project_user),
        format!("  Directory:   {}", summary.project_dir),
        format!("  Domain:      {}", summary.domain_name),
        format!("  Repository:  {}", summary.git_repo),
        format!(
            "  Entry point: {}:{}",
            summary.app_entry_file, summary.app_entry_var
        ),
        format!("  Deployment:  {}", record.deployment_type),
    ];
    lines.push(format!("  TLS:         {}", if summary.use_tls { "yes" } else { "no" }));
    lines.push(format!(
        "  Security:    {}",
        if summary.use_security { "yes" } else { "no" }
    ));
    lines.join("\n")
}

/// Decide which record to deploy: the stored one if the operator keeps it,
/// otherwise a freshly collected one. Quick mode never offers the stored
/// record. `None` means the operator cancelled.
pub async fn resolve_record(
    store: &ConfigStore,
    probe: &dyn HttpProbe,
    prompter: &mut dyn Prompter,
    quick: bool,
) -> Result<Option<DeploymentRecord>, CliError> {
    let mut record = None;
    let stored = if quick { None } else { store.load()? };
    if let Some(existing) = stored {
        prompter.say(&format!(
            "{}\n{}",
            ui::format_header("Existing configuration:"),
            describe_record(&existing)
        ));
        if prompter.confirm("Use existing configuration?", true)? {
            record = Some(existing);
        }
    }

    let record = match record {
        Some(record) => record,
        None => {
            let external_ip = lookup_external_ip(probe).await;
            let record = if quick {
                collect_quick(prompter, external_ip.as_deref())?
            } else {
                collect_full(prompter, external_ip.as_deref())?
            };
            prompter.say(&format!(
                "{}\n{}",
                ui::format_header("Deployment summary:"),
                describe_record(&record)
            ));
            record
        }
    };

    if prompter.confirm("Proceed with deployment?", true)? {
        Ok(Some(record))
    } else {
        Ok(None)
    }
}

pub fn launcher_path(store: &ConfigStore, record: &DeploymentRecord) -> PathBuf {
    store
        .dir()
        .join(format!("manage_{}.sh", record.project_name))
}

/// Write the `manage_{name}.sh` launcher next to the configuration file.
pub async fn write_launcher(
    store: &ConfigStore,
    record: &DeploymentRecord,
    deployer_bin: &Path,
) -> Result<PathBuf, CliError> {
    let renderer = TemplateRenderer::new()?;
    let script = renderer.render_manager_launcher(record, deployer_bin, store.path())?;
    let path = launcher_path(store, record);
    let write_error =
        |e: std::io::Error| CliError::OperationFailed(format!("{}: {}", path.display(), e));

    tokio::fs::write(&path, script).await.map_err(write_error)?;
    tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(write_error)?;
    Ok(path)
}

fn print_summary(record: &DeploymentRecord, report: &DeploymentReport, launcher: &Path) {
    println!("\n{}", ui::format_header("Deployment complete"));
    match access_urls(record) {
        Ok(urls) => {
            for url in urls {
                println!("  URL:     {}", ui::format_highlight(url.as_str()));
            }
        }
        Err(e) => println!("  URL:     {}", ui::format_warning(&e.to_string())),
    }
    let service = if report.service_running {
        ui::format_success("running")
    } else {
        ui::format_warning("not running")
    };
    println!("  Service: {}", service);
    if record.use_tls {
        let tls = if report.tls_issued {
            ui::format_success("certificate issued")
        } else {
            ui::format_warning("not issued")
        };
        println!("  TLS:     {}", tls);
    }
    if report.default_site_edited {
        println!("  nginx:   mounted under /{}/ on the default site", record.project_name);
    }
    println!("  Manager: {}", ui::format_highlight(&launcher.display().to_string()));

    if !report.is_clean() {
        println!("\n{}", ui::format_warning("Warnings:"));
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
    }
}

#[instrument(name = "deploy", skip(cli, store), fields(quick = cli.quick))]
pub async fn run(cli: &Cli, store: &ConfigStore) -> Result<(), CliError> {
    preflight::ensure_interactive()?;
    let mut executor = LocalCommandExecutor::new();
    preflight::ensure_privileges(&mut executor).await?;

    let probe = ReqwestProbe::new()?;
    let mut prompter = TerminalPrompter::new();
    println!("{}", ui::format_header("webdeploy"));

    let Some(record) = resolve_record(store, &probe, &mut prompter, cli.quick).await? else {
        println!("{}", ui::format_warning("Deployment cancelled"));
        return Ok(());
    };
    store.save(&record)?;
    info!("Saved configuration to {}", ui::format_highlight(&store.path().display().to_string()));

    let (sender, receiver) = mpsc::channel::<DeployerEvent>(32);
    let pb = ui::create_spinner("Starting deployment...");
    let ui_task = tokio::spawn(ui::handle_deployer_events(receiver, pb.clone()));

    let result = {
        let mut system = HostController::new(&mut executor);
        let mut prompts = ui::SuspendingPrompter::new(&mut prompter, pb.clone());
        match Deployer::new(&record, &mut system, &probe, Some(sender)) {
            Ok(mut deployer) => deployer.deploy(&mut prompts).await,
            Err(e) => Err(e),
        }
    };

    if let Err(e) = ui_task.await {
        tracing::error!("UI update task failed: {}", e);
    }
    match &result {
        Ok(_) => pb.finish_with_message("✅ Deployment finished"),
        Err(_) => pb.finish_with_message("❌ Deployment failed"),
    }
    let report = result?;

    let deployer_bin = std::env::current_exe()
        .map_err(|e| CliError::OperationFailed(format!("Cannot locate webdeploy: {}", e)))?;
    let launcher = write_launcher(store, &record, &deployer_bin).await?;
    print_summary(&record, &report, &launcher);
    Ok(())
}
