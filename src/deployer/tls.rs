use super::system::SystemController;
use super::types::DeployResult;
use crate::config::{DeploymentRecord, Prompter};
use crate::executor::shell::quote;
use crate::probe::HttpProbe;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsOutcome {
    Issued,
    /// Left for the manager's SSL menu, with the reason.
    Deferred(String),
    Disabled,
}

fn certbot_nginx(domain: &str, renewal: &str) -> String {
    format!(
        "sudo certbot --nginx -d {} --non-interactive --agree-tos \
         --register-unsafely-without-email --redirect {}",
        quote(domain),
        renewal
    )
}

/// Issue a certificate, keeping a valid one untouched.
pub fn certbot_command(domain: &str) -> String {
    certbot_nginx(domain, "--keep-until-expiring")
}

/// Issue a certificate, or replace the current one even when still valid.
pub fn certbot_renew_command(domain: &str) -> String {
    certbot_nginx(domain, "--force-renewal")
}

/// Request a certificate for the record's domain. Nothing here is fatal:
/// every failure defers TLS to the manager.
pub async fn provision_tls(
    system: &mut dyn SystemController,
    probe: &dyn HttpProbe,
    prompter: &mut dyn Prompter,
    record: &DeploymentRecord,
) -> DeployResult<TlsOutcome> {
    if !record.use_tls {
        return Ok(TlsOutcome::Disabled);
    }

    let url = format!("http://{}", record.domain_name);
    let outcome = probe.probe(&url).await;
    if !outcome.is_reachable() {
        tracing::warn!(
            "{} is not reachable ({}); certificate validation will likely fail",
            url,
            outcome
                .error
                .clone()
                .unwrap_or_else(|| outcome.class().to_string())
        );
        if !prompter.confirm("Continue anyway?", false)? {
            return Ok(TlsOutcome::Deferred(format!("{} was not reachable", url)));
        }
    }

    let result = system.run(&certbot_command(&record.domain_name)).await?;
    if !result.is_success() {
        return Ok(TlsOutcome::Deferred(format!(
            "certbot failed: {}",
            result.failure_detail()
        )));
    }

    let timer = system.run("sudo systemctl enable --now certbot.timer").await?;
    if !timer.is_success() {
        tracing::warn!(
            "Could not enable automatic renewal: {}",
            timer.failure_detail()
        );
    }
    Ok(TlsOutcome::Issued)
}
