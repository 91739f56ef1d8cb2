mod common;

use common::{record, MockExecutor, ScriptedPrompter, StubProbe, DEBIAN_DEFAULT_SITE};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;
use tokio::sync::mpsc;
use webdeploy::cli::deploy::{launcher_path, resolve_record, write_launcher};
use webdeploy::config::{ConfigStore, DeploymentRecord, DeploymentType};
use webdeploy::deployer::{
    DeployError, Deployer, DeployerEvent, DeploymentReport, HostController,
};
use webdeploy::templates::TemplateRenderer;

const DEFAULT_SITE: &str = "/etc/nginx/sites-available/default";
const REQUIREMENTS: &str = "/home/blog/blog/requirements.txt";

fn host() -> MockExecutor {
    let mut host = MockExecutor::new();
    host.with_file(REQUIREMENTS, "flask\n");
    host
}

async fn deploy(
    host: &mut MockExecutor,
    record: &DeploymentRecord,
    probe: &StubProbe,
    prompter: &mut ScriptedPrompter,
    stamp: &str,
) -> Result<DeploymentReport, DeployError> {
    let mut system = HostController::new(host);
    let mut deployer = Deployer::new(record, &mut system, probe, None)?.with_stamp(stamp);
    deployer.deploy(prompter).await
}

#[tokio::test]
async fn test_main_deployment_provisions_every_layer() {
    let mut host = host();
    host.with_file("/etc/fail2ban/jail.conf", "[DEFAULT]\nbantime = 10m\n");
    let mut record = record(DeploymentType::Main);
    record.use_tls = true;
    record.use_security = true;
    let probe = StubProbe::new().with_status("http://blog.example.com", 200);
    let mut prompter = ScriptedPrompter::new(&[]);

    let report = deploy(&mut host, &record, &probe, &mut prompter, "20240101_120000")
        .await
        .unwrap();

    assert!(report.is_clean(), "unexpected warnings: {:?}", report.warnings);
    assert!(report.service_running);
    assert!(report.tls_issued);
    assert!(report.security_configured);
    assert!(!report.default_site_edited);
    assert!(prompter.prompts.is_empty());

    assert!(host.ran("apt-get install -y"));
    assert!(host.ran("sudo -u blog bash -c 'git clone https://github.com/example/blog.git /home/blog/blog'"));
    assert!(host.ran("venv/bin/pip install -r /home/blog/blog/requirements.txt"));

    let unit = host.file("/etc/supervisor/conf.d/blog.conf").unwrap();
    assert!(unit.contains("[program:blog]"));
    assert!(host.file("/home/blog/blog/start_gunicorn.sh").is_some());
    assert!(host.file("/home/blog/blog/update.sh").is_some());

    let site = host.file("/etc/nginx/sites-available/blog").unwrap();
    assert!(site.contains("server_name blog.example.com"));
    assert!(host.ran("sudo ln -s /etc/nginx/sites-available/blog /etc/nginx/sites-enabled/blog"));

    let validate = host.position("sudo nginx -t").unwrap();
    let reload = host.position("sudo systemctl reload nginx").unwrap();
    let certbot = host.position("sudo certbot --nginx -d blog.example.com").unwrap();
    assert!(validate < reload && reload < certbot);

    assert!(host.ran("sudo ufw --force enable"));
    let jail = host.file("/etc/fail2ban/jail.local").unwrap();
    assert!(jail.starts_with("[DEFAULT]\nbantime = 10m\n"));
    assert_eq!(jail.matches("# BEGIN webdeploy managed block: blog").count(), 1);
    assert!(host.file("/etc/fail2ban/filter.d/blog.conf").is_some());
}

#[tokio::test]
async fn test_subdirectory_redeploy_keeps_a_single_location() {
    let mut host = host();
    host.with_file(DEFAULT_SITE, DEBIAN_DEFAULT_SITE);
    let record = record(DeploymentType::Subdirectory);
    let probe = StubProbe::new();

    let mut prompter = ScriptedPrompter::new(&[]);
    let first = deploy(&mut host, &record, &probe, &mut prompter, "20240101_120000")
        .await
        .unwrap();
    assert!(first.default_site_edited);
    let after_first = host.file(DEFAULT_SITE).unwrap().to_string();

    let mut prompter = ScriptedPrompter::new(&[]);
    deploy(&mut host, &record, &probe, &mut prompter, "20240101_130000")
        .await
        .unwrap();

    let site = host.file(DEFAULT_SITE).unwrap();
    assert_eq!(site, after_first);
    assert_eq!(site.matches("location /blog/ {").count(), 1);
    assert_eq!(site.matches("# BEGIN webdeploy managed block: blog").count(), 1);
    // the catch-all location stays last
    assert!(site.find("location /blog/").unwrap() < site.find("location / {").unwrap());

    assert_eq!(
        host.file("/etc/nginx/sites-available/default.backup.20240101_120000"),
        Some(DEBIAN_DEFAULT_SITE)
    );
    assert_eq!(
        host.file("/etc/nginx/sites-available/default.backup.20240101_130000"),
        Some(after_first.as_str())
    );
    assert!(host.file("/etc/nginx/sites-available/blog").is_none());
    assert!(!host.ran("sudo ln -s"));
}

#[tokio::test]
async fn test_subdirectory_without_default_site_writes_its_own() {
    let mut host = host();
    let record = record(DeploymentType::Subdirectory);
    let mut prompter = ScriptedPrompter::new(&[]);

    let report = deploy(&mut host, &record, &StubProbe::new(), &mut prompter, "20240101_120000")
        .await
        .unwrap();

    assert!(!report.default_site_edited);
    let site = host.file("/etc/nginx/sites-available/blog").unwrap();
    assert!(site.contains("location /blog/"));
    assert!(host.ran("sudo ln -s"));
}

#[tokio::test]
async fn test_failed_nginx_validation_never_reloads() {
    let mut host = host();
    host.fail("sudo nginx -t", "nginx: [emerg] unexpected \"}\"");
    let record = record(DeploymentType::Main);
    let mut prompter = ScriptedPrompter::new(&[]);

    let err = deploy(&mut host, &record, &StubProbe::new(), &mut prompter, "20240101_120000")
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::ProxyValidation(_)), "got {:?}", err);
    assert!(err.to_string().contains("unexpected"));
    assert!(!host.ran("systemctl reload nginx"));
}

#[tokio::test]
async fn test_rejected_default_site_edit_is_rolled_back() {
    let mut host = host();
    host.with_file(DEFAULT_SITE, DEBIAN_DEFAULT_SITE);
    host.fail("sudo nginx -t", "nginx: [emerg] unknown directive");
    let record = record(DeploymentType::Subdirectory);
    let mut prompter = ScriptedPrompter::new(&[]);

    let err = deploy(&mut host, &record, &StubProbe::new(), &mut prompter, "20240101_120000")
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::ProxyValidation(_)), "got {:?}", err);
    assert_eq!(host.file(DEFAULT_SITE), Some(DEBIAN_DEFAULT_SITE));
    assert!(!host.ran("systemctl reload nginx"));
}

#[tokio::test]
async fn test_existing_checkout_is_moved_aside() {
    let mut host = host();
    host.with_dir("/home/blog/blog");
    let record = record(DeploymentType::Main);
    let mut prompter = ScriptedPrompter::new(&[]);

    deploy(&mut host, &record, &StubProbe::new(), &mut prompter, "20240101_120000")
        .await
        .unwrap();

    let moved = host
        .position("sudo mv /home/blog/blog /home/blog/blog_backup_20240101_120000")
        .unwrap();
    assert!(moved < host.position("git clone").unwrap());
}

#[tokio::test]
async fn test_missing_requirements_falls_back_with_warning() {
    let mut host = MockExecutor::new();
    let record = record(DeploymentType::Main);
    let mut prompter = ScriptedPrompter::new(&[]);

    let report = deploy(&mut host, &record, &StubProbe::new(), &mut prompter, "20240101_120000")
        .await
        .unwrap();

    assert!(host.ran("venv/bin/pip install flask"));
    assert!(report.warnings.iter().any(|w| w.contains("requirements.txt")));
}

#[tokio::test]
async fn test_stopped_program_is_a_warning() {
    let mut host = host();
    host.respond("sudo supervisorctl status blog", 3, "blog  FATAL  Exited too quickly");
    let record = record(DeploymentType::Main);
    let mut prompter = ScriptedPrompter::new(&[]);

    let report = deploy(&mut host, &record, &StubProbe::new(), &mut prompter, "20240101_120000")
        .await
        .unwrap();

    assert!(!report.service_running);
    assert!(report.warnings.iter().any(|w| w.contains("/var/log/blog.log")));
    assert!(host.ran("sudo nginx -t"));
}

#[tokio::test]
async fn test_unreachable_domain_defers_tls_when_declined() {
    let mut host = host();
    let mut record = record(DeploymentType::Main);
    record.use_tls = true;
    let mut prompter = ScriptedPrompter::new(&[""]);

    let report = deploy(&mut host, &record, &StubProbe::new(), &mut prompter, "20240101_120000")
        .await
        .unwrap();

    assert_eq!(prompter.prompts, vec!["Continue anyway?"]);
    assert!(!report.tls_issued);
    assert!(!host.ran("certbot"));
    assert!(report.warnings.iter().any(|w| w.contains("SSL menu")));
}

#[tokio::test]
async fn test_certbot_failure_is_not_fatal() {
    let mut host = host();
    host.fail("sudo certbot", "Challenge failed for domain blog.example.com");
    let mut record = record(DeploymentType::Main);
    record.use_tls = true;
    let probe = StubProbe::new().with_status("http://blog.example.com", 301);
    let mut prompter = ScriptedPrompter::new(&[]);

    let report = deploy(&mut host, &record, &probe, &mut prompter, "20240101_120000")
        .await
        .unwrap();

    assert!(!report.tls_issued);
    assert!(report.warnings.iter().any(|w| w.contains("Challenge failed")));
    assert!(!host.ran("certbot.timer"));
}

#[tokio::test]
async fn test_firewall_failure_is_fatal_but_fail2ban_is_not() {
    let mut record = record(DeploymentType::Port(8080));
    record.use_security = true;

    let mut host = host();
    host.fail("sudo ufw --force enable", "ERROR: problem running iptables");
    let mut prompter = ScriptedPrompter::new(&[]);
    let err = deploy(&mut host, &record, &StubProbe::new(), &mut prompter, "20240101_120000")
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Firewall(_)), "got {:?}", err);
    assert!(host.ran("sudo ufw allow 8080/tcp"));

    let mut host = self::host();
    host.fail("sudo systemctl restart fail2ban", "Job for fail2ban.service failed");
    let mut prompter = ScriptedPrompter::new(&[]);
    let report = deploy(&mut host, &record, &StubProbe::new(), &mut prompter, "20240101_120000")
        .await
        .unwrap();
    assert!(report.security_configured);
    assert!(report.warnings.iter().any(|w| w.contains("fail2ban")));
    // no jail.conf to copy, so jail.local starts empty
    assert!(host
        .file("/etc/fail2ban/jail.local")
        .unwrap()
        .starts_with("# BEGIN webdeploy managed block: blog"));
}

#[tokio::test]
async fn test_progress_events_are_reported() {
    let mut host = host();
    let record = record(DeploymentType::Main);
    let probe = StubProbe::new();
    let mut prompter = ScriptedPrompter::new(&[]);
    let (sender, mut receiver) = mpsc::channel::<DeployerEvent>(64);

    {
        let mut system = HostController::new(&mut host);
        let mut deployer = Deployer::new(&record, &mut system, &probe, Some(sender)).unwrap();
        deployer.deploy(&mut prompter).await.unwrap();
    }

    let mut events = Vec::new();
    while let Some(event) = receiver.recv().await {
        events.push(event);
    }
    assert!(matches!(
        events.first(),
        Some(DeployerEvent::StepStarted(step)) if step == "Installing system packages"
    ));
    assert!(events
        .iter()
        .any(|e| matches!(e, DeployerEvent::StepSkipped(_, reason) if reason == "TLS disabled")));
    assert!(!events
        .iter()
        .any(|e| matches!(e, DeployerEvent::StepFailed(_, _))));
}

#[tokio::test]
async fn test_reusing_stored_record_asks_no_field_questions() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::new(dir.path().join(".deploy_config"));
    let mut saved = record(DeploymentType::Port(9000));
    saved.use_tls = true;
    store.save(&saved).unwrap();

    let mut prompter = ScriptedPrompter::new(&["y", "y"]);
    let resolved = resolve_record(&store, &StubProbe::new(), &mut prompter, false)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        prompter.prompts,
        vec!["Use existing configuration?", "Proceed with deployment?"]
    );
    assert_eq!(resolved, saved);

    let renderer = TemplateRenderer::new().unwrap();
    assert_eq!(
        renderer.render_site(&resolved).unwrap(),
        renderer.render_site(&saved).unwrap()
    );
    assert_eq!(
        renderer.render_supervisor_unit(&resolved).unwrap(),
        renderer.render_supervisor_unit(&saved).unwrap()
    );
}

#[tokio::test]
async fn test_quick_mode_skips_stored_record() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::new(dir.path().join(".deploy_config"));
    store.save(&record(DeploymentType::Main)).unwrap();
    let probe = StubProbe::new().with_external_ip("203.0.113.7");

    let mut prompter = ScriptedPrompter::new(&["https://github.com/example/shop.git", ""]);
    let resolved = resolve_record(&store, &probe, &mut prompter, true)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(resolved.git_repo, "https://github.com/example/shop.git");
    assert_eq!(resolved.project_name, "webapp");
    assert_eq!(resolved.domain_name, "203.0.113.7");
    assert_eq!(prompter.prompts.len(), 2);
    assert!(!prompter
        .prompts
        .iter()
        .any(|p| p == "Use existing configuration?"));
    assert_eq!(prompter.remaining(), 0);
}

#[tokio::test]
async fn test_declining_to_proceed_cancels() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::new(dir.path().join(".deploy_config"));
    store.save(&record(DeploymentType::Main)).unwrap();

    let mut prompter = ScriptedPrompter::new(&["", "n"]);
    let resolved = resolve_record(&store, &StubProbe::new(), &mut prompter, false)
        .await
        .unwrap();
    assert!(resolved.is_none());
}

#[tokio::test]
async fn test_launcher_points_at_the_store() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::new(dir.path().join(".deploy_config"));
    let record = record(DeploymentType::Main);

    let path = write_launcher(&store, &record, Path::new("/opt/webdeploy/webdeploy"))
        .await
        .unwrap();

    assert_eq!(path, launcher_path(&store, &record));
    assert!(path.ends_with("manage_blog.sh"));
    let script = std::fs::read_to_string(&path).unwrap();
    assert!(script.starts_with("#!/bin/bash"));
    assert!(script.contains("exec /opt/webdeploy/webdeploy --config"));
    assert!(script.contains(&store.path().display().to_string()));
    assert!(script.trim_end().ends_with("--manage"));
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
}
