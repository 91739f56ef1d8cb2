//! Rendering of every configuration file and script the deployer writes.
//!
//! Templates are embedded at compile time and rendered with tera from
//! plain serializable contexts built out of the deployment record.

use crate::config::paths::{GUNICORN_WORKERS, REQUIREMENTS_FILE};
use crate::config::{DeploymentRecord, DeploymentType};
use crate::executor::shell::quote_path;
use serde::Serialize;
use std::path::Path;
use tera::{Context, Tera};
use thiserror::Error;

const NGINX_SITE: &str = include_str!("../../templates/nginx_site.conf.tera");
const NGINX_SUBDIR_SITE: &str = include_str!("../../templates/nginx_subdir_site.conf.tera");
const SUBDIR_LOCATION: &str = include_str!("../../templates/subdir_location.conf.tera");
const PROXY_PASS: &str = include_str!("../../templates/proxy_pass.conf.tera");
const SUPERVISOR_UNIT: &str = include_str!("../../templates/supervisor.conf.tera");
const START_SCRIPT: &str = include_str!("../../templates/start_gunicorn.sh.tera");
const FAIL2BAN_JAIL: &str = include_str!("../../templates/fail2ban_jail.conf.tera");
const FAIL2BAN_FILTER: &str = include_str!("../../templates/fail2ban_filter.conf.tera");
const UPDATE_SCRIPT: &str = include_str!("../../templates/update.sh.tera");
const MANAGER_LAUNCHER: &str = include_str!("../../templates/manager.sh.tera");

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to load templates: {0}")]
    Load(String),

    #[error("Failed to render {name}: {message}")]
    Render { name: String, message: String },
}

pub type TemplateResult<T> = Result<T, TemplateError>;

/// Values shared by the nginx, supervisor and fail2ban templates.
#[derive(Debug, Serialize)]
struct DeploymentContext {
    project_name: String,
    project_user: String,
    project_dir: String,
    domain_name: String,
    socket_path: String,
    static_dir: String,
    access_log: String,
    error_log: String,
    app_log: String,
    wrapper_path: String,
    wsgi_target: String,
    workers: u32,
    requirements: &'static str,
    listen_port: u16,
    deny_probes: bool,
    ports: String,
}

impl DeploymentContext {
    fn new(record: &DeploymentRecord) -> Self {
        let (listen_port, deny_probes) = match record.deployment_type {
            DeploymentType::Port(port) => (port, false),
            _ => (80, true),
        };
        let ports = match record.proxy_port() {
            Some(port) => format!("http,https,{}", port),
            None => "http,https".to_string(),
        };

        Self {
            project_name: record.project_name.clone(),
            project_user: record.project_user.clone(),
            project_dir: record.project_dir().display().to_string(),
            domain_name: record.domain_name.clone(),
            socket_path: record.socket_path().display().to_string(),
            static_dir: record.static_dir().display().to_string(),
            access_log: record.access_log_path().display().to_string(),
            error_log: record.error_log_path().display().to_string(),
            app_log: record.app_log_path().display().to_string(),
            wrapper_path: record.wrapper_path().display().to_string(),
            wsgi_target: record.wsgi_target(),
            workers: GUNICORN_WORKERS,
            requirements: REQUIREMENTS_FILE,
            listen_port,
            deny_probes,
            ports,
        }
    }
}

#[derive(Debug, Serialize)]
struct LauncherContext {
    project_name: String,
    deployer_bin: String,
    store_path: String,
    generated_at: String,
}

pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    pub fn new() -> TemplateResult<Self> {
        let mut tera = Tera::default();
        // Partials are included mid-line, so their trailing newline is dropped.
        tera.add_raw_templates(vec![
            ("proxy_pass", PROXY_PASS.trim_end()),
            ("subdir_location", SUBDIR_LOCATION.trim_end()),
            ("nginx_site", NGINX_SITE),
            ("nginx_subdir_site", NGINX_SUBDIR_SITE),
            ("supervisor", SUPERVISOR_UNIT),
            ("start_script", START_SCRIPT),
            ("fail2ban_jail", FAIL2BAN_JAIL.trim_end()),
            ("fail2ban_filter", FAIL2BAN_FILTER),
            ("update_script", UPDATE_SCRIPT),
            ("manager_launcher", MANAGER_LAUNCHER),
        ])
        .map_err(|e| TemplateError::Load(e.to_string()))?;
        Ok(Self { tera })
    }

    fn render<T: Serialize>(&self, name: &str, context: &T) -> TemplateResult<String> {
        let render_error = |e: tera::Error| TemplateError::Render {
            name: name.to_string(),
            message: format!("{:?}", e),
        };
        let context = Context::from_serialize(context).map_err(render_error)?;
        self.tera.render(name, &context).map_err(render_error)
    }

    /// The site file written to `sites-available` for the record's deployment type.
    /// For subdirectory mode this is the standalone host used when no default
    /// host exists.
    pub fn render_site(&self, record: &DeploymentRecord) -> TemplateResult<String> {
        let context = DeploymentContext::new(record);
        match record.deployment_type {
            DeploymentType::Subdirectory => self.render("nginx_subdir_site", &context),
            DeploymentType::Main | DeploymentType::Port(_) => self.render("nginx_site", &context),
        }
    }

    /// The `/{project}/` location injected into an existing host.
    pub fn render_subdirectory_location(&self, record: &DeploymentRecord) -> TemplateResult<String> {
        self.render("subdir_location", &DeploymentContext::new(record))
    }

    pub fn render_supervisor_unit(&self, record: &DeploymentRecord) -> TemplateResult<String> {
        self.render("supervisor", &DeploymentContext::new(record))
    }

    pub fn render_start_script(&self, record: &DeploymentRecord) -> TemplateResult<String> {
        self.render("start_script", &DeploymentContext::new(record))
    }

    pub fn render_fail2ban_jail(&self, record: &DeploymentRecord) -> TemplateResult<String> {
        self.render("fail2ban_jail", &DeploymentContext::new(record))
    }

    pub fn render_fail2ban_filter(&self, record: &DeploymentRecord) -> TemplateResult<String> {
        self.render("fail2ban_filter", &DeploymentContext::new(record))
    }

    pub fn render_update_script(&self, record: &DeploymentRecord) -> TemplateResult<String> {
        self.render("update_script", &DeploymentContext::new(record))
    }

    pub fn render_manager_launcher(
        &self,
        record: &DeploymentRecord,
        deployer_bin: &Path,
        store_path: &Path,
    ) -> TemplateResult<String> {
        let context = LauncherContext {
            project_name: record.project_name.clone(),
            deployer_bin: quote_path(deployer_bin),
            store_path: quote_path(store_path),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        self.render("manager_launcher", &context)
    }
}
