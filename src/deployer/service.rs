use super::{
    firewall::{Fail2banManager, UfwManager},
    project, proxy, supervisor,
    system::{required_packages, SystemController, UserState},
    tls::{self, TlsOutcome},
    types::{DeployResult, DeployerEvent, DeploymentReport},
};
use crate::config::{DeploymentRecord, Prompter};
use crate::probe::HttpProbe;
use crate::templates::TemplateRenderer;
use tokio::sync::mpsc;

/// Provisions one deployment record on the host behind `system`.
pub struct Deployer<'a> {
    record: &'a DeploymentRecord,
    system: &'a mut dyn SystemController,
    probe: &'a dyn HttpProbe,
    renderer: TemplateRenderer,
    stamp: String,
    progress_sender: Option<mpsc::Sender<DeployerEvent>>,
}

impl<'a> Deployer<'a> {
    pub fn new(
        record: &'a DeploymentRecord,
        system: &'a mut dyn SystemController,
        probe: &'a dyn HttpProbe,
        progress_sender: Option<mpsc::Sender<DeployerEvent>>,
    ) -> DeployResult<Self> {
        Ok(Self {
            record,
            system,
            probe,
            renderer: TemplateRenderer::new()?,
            stamp: super::timestamp(),
            progress_sender,
        })
    }

    /// Use a fixed timestamp for backup names.
    pub fn with_stamp(mut self, stamp: impl Into<String>) -> Self {
        self.stamp = stamp.into();
        self
    }

    /// Helper to send progress events if a sender exists.
    async fn send_event(&self, event: DeployerEvent) {
        if let Some(sender) = &self.progress_sender {
            if let Err(e) = sender.send(event).await {
                tracing::warn!("Failed to send progress event: {}", e);
            }
        }
    }

    async fn start_step(&self, step: &str) {
        tracing::info!("{}...", step);
        self.send_event(DeployerEvent::StepStarted(step.to_string()))
            .await;
    }

    /// Report the end of a step and pass its result through.
    async fn finish_step<T>(&self, step: &str, result: DeployResult<T>) -> DeployResult<T> {
        match &result {
            Ok(_) => {
                self.send_event(DeployerEvent::StepCompleted(step.to_string()))
                    .await
            }
            Err(e) => {
                self.send_event(DeployerEvent::StepFailed(step.to_string(), e.to_string()))
                    .await
            }
        }
        result
    }

    async fn warn(&self, report: &mut DeploymentReport, message: String) {
        report.warn(message.clone());
        self.send_event(DeployerEvent::Warning(message)).await;
    }

    /// Run every provisioning step in order. Fatal steps abort with an error;
    /// degraded ones are collected into the report.
    pub async fn deploy(&mut self, prompter: &mut dyn Prompter) -> DeployResult<DeploymentReport> {
        let mut report = DeploymentReport::new();
        let record = self.record;
        tracing::info!("Deploying {} for {}", record.project_name, record.domain_name);

        let step = "Installing system packages";
        self.start_step(step).await;
        let packages = required_packages(record);
        let result = self.system.install_packages(&packages).await;
        self.finish_step(step, result).await?;

        let step = "Preparing runtime user";
        self.start_step(step).await;
        let result = project::prepare_user(self.system, record).await;
        if self.finish_step(step, result).await? == UserState::Existing {
            tracing::info!("Reusing existing user {}", record.project_user);
        }

        let step = "Fetching and building project";
        self.start_step(step).await;
        let result = project::fetch_and_build(self.system, record, &self.stamp).await;
        let build = self.finish_step(step, result).await?;
        if let Some(previous) = &build.previous_checkout {
            tracing::info!("Previous checkout kept at {}", previous.display());
        }
        if !build.used_requirements {
            self.warn(
                &mut report,
                format!("No requirements.txt found, installed {}", project::FALLBACK_PACKAGES),
            )
            .await;
        }

        let step = "Configuring supervisor";
        self.start_step(step).await;
        let result = supervisor::configure_program(self.system, &self.renderer, record).await;
        report.service_running = self.finish_step(step, result).await?;
        if !report.service_running {
            self.warn(
                &mut report,
                format!(
                    "{} is not running, check {}",
                    record.project_name,
                    record.app_log_path().display()
                ),
            )
            .await;
        }

        let step = "Writing update script";
        self.start_step(step).await;
        let result = project::install_update_script(self.system, &self.renderer, record).await;
        self.finish_step(step, result).await?;

        let step = "Configuring nginx";
        self.start_step(step).await;
        let result = proxy::configure_proxy(self.system, &self.renderer, record, &self.stamp).await;
        let change = self.finish_step(step, result).await?;
        report.default_site_edited = change.default_site_edited;

        let step = "Requesting TLS certificate";
        if record.use_tls {
            self.start_step(step).await;
            let result = tls::provision_tls(self.system, self.probe, prompter, record).await;
            match self.finish_step(step, result).await? {
                TlsOutcome::Issued => report.tls_issued = true,
                TlsOutcome::Deferred(reason) => {
                    self.warn(
                        &mut report,
                        format!(
                            "TLS certificate not issued ({}); retry from the manager's SSL menu",
                            reason
                        ),
                    )
                    .await;
                }
                TlsOutcome::Disabled => {}
            }
        } else {
            self.send_event(DeployerEvent::StepSkipped(
                step.to_string(),
                "TLS disabled".to_string(),
            ))
            .await;
        }

        if record.use_security {
            let step = "Configuring firewall";
            self.start_step(step).await;
            let result = UfwManager::new(self.system).configure(record).await;
            self.finish_step(step, result).await?;

            let step = "Configuring fail2ban";
            self.start_step(step).await;
            let result = Fail2banManager::new(self.system)
                .configure(&self.renderer, record)
                .await;
            if !self.finish_step(step, result).await? {
                self.warn(&mut report, "fail2ban failed to restart".to_string())
                    .await;
            }
            report.security_configured = true;
        } else {
            self.send_event(DeployerEvent::StepSkipped(
                "Configuring security".to_string(),
                "security disabled".to_string(),
            ))
            .await;
        }

        tracing::info!(
            "Deployment of {} finished with {} warning(s)",
            record.project_name,
            report.warnings.len()
        );
        Ok(report)
    }
}
