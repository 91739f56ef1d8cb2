//! Where every artifact of a deployment lives on the host.

use super::record::DeploymentRecord;
use std::path::PathBuf;

pub const SUPERVISOR_CONF_DIR: &str = "/etc/supervisor/conf.d";
pub const NGINX_SITES_AVAILABLE: &str = "/etc/nginx/sites-available";
pub const NGINX_SITES_ENABLED: &str = "/etc/nginx/sites-enabled";
pub const NGINX_DEFAULT_SITE: &str = "/etc/nginx/sites-available/default";
pub const NGINX_LOG_DIR: &str = "/var/log/nginx";
pub const FAIL2BAN_JAIL_CONF: &str = "/etc/fail2ban/jail.conf";
pub const FAIL2BAN_JAIL_LOCAL: &str = "/etc/fail2ban/jail.local";
pub const FAIL2BAN_FILTER_DIR: &str = "/etc/fail2ban/filter.d";
pub const LETSENCRYPT_LIVE_DIR: &str = "/etc/letsencrypt/live";

pub const WRAPPER_SCRIPT: &str = "start_gunicorn.sh";
pub const UPDATE_SCRIPT: &str = "update.sh";
pub const REQUIREMENTS_FILE: &str = "requirements.txt";
pub const GUNICORN_WORKERS: u32 = 3;

impl DeploymentRecord {
    pub fn venv_dir(&self) -> PathBuf {
        self.project_dir().join("venv")
    }

    pub fn static_dir(&self) -> PathBuf {
        self.project_dir().join("static")
    }

    pub fn run_dir(&self) -> PathBuf {
        self.project_dir().join("run")
    }

    pub fn socket_path(&self) -> PathBuf {
        self.run_dir().join(format!("{}.sock", self.project_name))
    }

    pub fn wrapper_path(&self) -> PathBuf {
        self.project_dir().join(WRAPPER_SCRIPT)
    }

    pub fn update_script_path(&self) -> PathBuf {
        self.project_dir().join(UPDATE_SCRIPT)
    }

    pub fn requirements_path(&self) -> PathBuf {
        self.project_dir().join(REQUIREMENTS_FILE)
    }

    pub fn backup_dir(&self) -> PathBuf {
        PathBuf::from(format!("/home/{}/backups", self.project_user))
    }

    pub fn app_log_path(&self) -> PathBuf {
        PathBuf::from(format!("/var/log/{}.log", self.project_name))
    }

    pub fn access_log_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}/{}_access.log",
            NGINX_LOG_DIR, self.project_name
        ))
    }

    pub fn error_log_path(&self) -> PathBuf {
        PathBuf::from(format!("{}/{}_error.log", NGINX_LOG_DIR, self.project_name))
    }

    pub fn supervisor_conf_path(&self) -> PathBuf {
        PathBuf::from(SUPERVISOR_CONF_DIR).join(format!("{}.conf", self.project_name))
    }

    pub fn site_available_path(&self) -> PathBuf {
        PathBuf::from(NGINX_SITES_AVAILABLE).join(&self.project_name)
    }

    pub fn site_enabled_path(&self) -> PathBuf {
        PathBuf::from(NGINX_SITES_ENABLED).join(&self.project_name)
    }

    pub fn fail2ban_filter_path(&self) -> PathBuf {
        PathBuf::from(FAIL2BAN_FILTER_DIR).join(format!("{}.conf", self.project_name))
    }

    pub fn certificate_path(&self) -> PathBuf {
        PathBuf::from(LETSENCRYPT_LIVE_DIR)
            .join(&self.domain_name)
            .join("fullchain.pem")
    }
}
