use super::status::{access_url, access_urls};
use super::ManagerResult;
use crate::config::DeploymentRecord;
use crate::deployer::SystemController;
use crate::probe::{HttpProbe, ProbeOutcome};

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub program_running: bool,
    pub probe: ProbeOutcome,
}

impl HealthReport {
    /// The HTTP URL answers 200, 301 or 302. Supervisor state is reported
    /// separately in `program_running`.
    pub fn responding(&self) -> bool {
        self.probe.is_reachable()
    }
}

pub async fn check_health(
    system: &mut dyn SystemController,
    probe: &dyn HttpProbe,
    record: &DeploymentRecord,
) -> ManagerResult<HealthReport> {
    let program_running = system.program_running(&record.project_name).await?;
    let url = access_url(record, "http")?;
    let outcome = probe.probe(url.as_str()).await;
    Ok(HealthReport {
        program_running,
        probe: outcome,
    })
}

/// Probe every access URL of the deployment.
pub async fn test_urls(
    probe: &dyn HttpProbe,
    record: &DeploymentRecord,
) -> ManagerResult<Vec<ProbeOutcome>> {
    let mut outcomes = Vec::new();
    for url in access_urls(record)? {
        outcomes.push(probe.probe(url.as_str()).await);
    }
    Ok(outcomes)
}

pub fn describe_outcome(outcome: &ProbeOutcome) -> String {
    let elapsed = outcome.elapsed.as_millis();
    match (outcome.status, &outcome.error) {
        (Some(code), _) => format!(
            "{} -> {} {} ({} ms)",
            outcome.url,
            code,
            outcome.class(),
            elapsed
        ),
        (None, Some(error)) => format!(
            "{} -> {} ({}, {} ms)",
            outcome.url,
            outcome.class(),
            error,
            elapsed
        ),
        (None, None) => format!("{} -> {} ({} ms)", outcome.url, outcome.class(), elapsed),
    }
}
