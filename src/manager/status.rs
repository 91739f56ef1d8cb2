//! Point-in-time view of a deployment: services, resources, URLs and the
//! certificate.

use super::ManagerResult;
use crate::config::{DeploymentRecord, DeploymentType};
use crate::deployer::SystemController;
use crate::executor::shell::{quote, quote_path};
use chrono::{NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use sysinfo::{Disks, System};
use url::Url;

lazy_static! {
    static ref END_DATE: Regex = Regex::new(r"^notAfter=\s*(.+?)\s*(?:GMT)?$").unwrap();
}

pub const STATUS_LOG_LINES: u32 = 10;

/// Where the application can be reached over `scheme`.
pub fn access_url(record: &DeploymentRecord, scheme: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!("{}://{}/", scheme, record.domain_name))?;
    match record.deployment_type {
        DeploymentType::Main => {}
        DeploymentType::Subdirectory => {
            url = url.join(&format!("{}/", record.project_name))?;
        }
        DeploymentType::Port(port) => {
            url.set_port(Some(port))
                .map_err(|_| url::ParseError::InvalidPort)?;
        }
    }
    Ok(url)
}

/// Every URL the deployment answers on: HTTP, plus HTTPS when TLS is enabled.
pub fn access_urls(record: &DeploymentRecord) -> Result<Vec<Url>, url::ParseError> {
    let mut urls = vec![access_url(record, "http")?];
    if record.use_tls {
        urls.push(access_url(record, "https")?);
    }
    Ok(urls)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryLevel {
    Normal,
    Warning,
    Critical,
}

impl ExpiryLevel {
    /// More than 30 days is normal, 8 to 30 a warning, anything less critical.
    pub fn classify(days_remaining: i64) -> Self {
        if days_remaining > 30 {
            ExpiryLevel::Normal
        } else if days_remaining >= 8 {
            ExpiryLevel::Warning
        } else {
            ExpiryLevel::Critical
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateExpiry {
    pub not_after: NaiveDateTime,
    pub days_remaining: i64,
    /// `not_after` lies in the past, even by less than a day.
    pub expired: bool,
}

impl CertificateExpiry {
    pub fn level(&self) -> ExpiryLevel {
        ExpiryLevel::classify(self.days_remaining)
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }
}

impl fmt::Display for CertificateExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_expired() && self.days_remaining == 0 {
            write!(f, "expired today ({})", self.not_after.format("%Y-%m-%d %H:%M"))
        } else if self.is_expired() {
            write!(f, "expired {} day(s) ago", -self.days_remaining)
        } else {
            write!(
                f,
                "expires in {} day(s) ({})",
                self.days_remaining,
                self.not_after.format("%Y-%m-%d")
            )
        }
    }
}

/// Parse `openssl x509 -enddate` output such as `notAfter=Mar  5 12:00:00 2025 GMT`.
pub fn parse_end_date(output: &str) -> Option<NaiveDateTime> {
    let line = output.trim();
    let raw = END_DATE.captures(line)?.get(1)?.as_str();
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, "%b %d %H:%M:%S %Y").ok()
}

pub fn expiry_at(not_after: NaiveDateTime, now: NaiveDateTime) -> CertificateExpiry {
    CertificateExpiry {
        not_after,
        days_remaining: (not_after - now).num_days(),
        expired: not_after < now,
    }
}

/// Host resource gauges.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceGauges {
    pub memory_used: u64,
    pub memory_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
    pub load_average: (f64, f64, f64),
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

fn gib(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0 / 1024.0
}

impl ResourceGauges {
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();

        let disks = Disks::new_with_refreshed_list();
        let (disk_used, disk_total) = disks
            .iter()
            .find(|disk| disk.mount_point() == std::path::Path::new("/"))
            .map(|disk| (disk.total_space().saturating_sub(disk.available_space()), disk.total_space()))
            .unwrap_or((0, 0));

        let load = System::load_average();
        Self {
            memory_used: sys.used_memory(),
            memory_total: sys.total_memory(),
            disk_used,
            disk_total,
            load_average: (load.one, load.five, load.fifteen),
        }
    }

    pub fn memory_percent(&self) -> f64 {
        percent(self.memory_used, self.memory_total)
    }

    pub fn disk_percent(&self) -> f64 {
        percent(self.disk_used, self.disk_total)
    }
}

impl fmt::Display for ResourceGauges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Memory: {:.1}/{:.1} GiB ({:.0}%)",
            gib(self.memory_used),
            gib(self.memory_total),
            self.memory_percent()
        )?;
        writeln!(
            f,
            "Disk /: {:.1}/{:.1} GiB ({:.0}%)",
            gib(self.disk_used),
            gib(self.disk_total),
            self.disk_percent()
        )?;
        write!(
            f,
            "Load:   {:.2} {:.2} {:.2}",
            self.load_average.0, self.load_average.1, self.load_average.2
        )
    }
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub program_running: bool,
    pub program_detail: String,
    pub nginx_active: bool,
    pub gauges: ResourceGauges,
    pub urls: Vec<Url>,
    pub recent_log: Vec<String>,
    /// `None` when TLS is disabled or the certificate could not be read.
    pub certificate: Option<CertificateExpiry>,
}

pub async fn certificate_expiry(
    system: &mut dyn SystemController,
    record: &DeploymentRecord,
) -> ManagerResult<Option<CertificateExpiry>> {
    let result = system
        .run(&format!(
            "sudo openssl x509 -enddate -noout -in {}",
            quote_path(&record.certificate_path())
        ))
        .await?;
    if !result.is_success() {
        tracing::debug!("No readable certificate: {}", result.failure_detail());
        return Ok(None);
    }
    Ok(parse_end_date(&result.stdout_trimmed())
        .map(|not_after| expiry_at(not_after, Utc::now().naive_utc())))
}

pub async fn collect_status(
    system: &mut dyn SystemController,
    record: &DeploymentRecord,
) -> ManagerResult<StatusReport> {
    let program = system
        .run(&format!("sudo supervisorctl status {}", quote(&record.project_name)))
        .await?;
    let nginx = system.run("systemctl is-active --quiet nginx").await?;
    let log = system
        .run(&format!(
            "sudo tail -n {} {}",
            STATUS_LOG_LINES,
            quote_path(&record.app_log_path())
        ))
        .await?;

    let certificate = if record.use_tls {
        certificate_expiry(system, record).await?
    } else {
        None
    };

    Ok(StatusReport {
        program_running: program.is_success(),
        program_detail: program.stdout_trimmed(),
        nginx_active: nginx.is_success(),
        gauges: ResourceGauges::collect(),
        urls: access_urls(record)?,
        recent_log: String::from_utf8_lossy(&log.output.stdout)
            .lines()
            .map(str::to_string)
            .collect(),
        certificate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::record::tests::sample_record;
    use chrono::{Duration, NaiveDate};

    fn noon(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_expiry_levels() {
        let now = noon(2024, 1, 1);
        let level = |days| expiry_at(now + Duration::days(days), now).level();

        assert_eq!(level(45), ExpiryLevel::Normal);
        assert_eq!(level(20), ExpiryLevel::Warning);
        assert_eq!(level(3), ExpiryLevel::Critical);
    }

    #[test]
    fn test_expiry_boundaries() {
        assert_eq!(ExpiryLevel::classify(31), ExpiryLevel::Normal);
        assert_eq!(ExpiryLevel::classify(30), ExpiryLevel::Warning);
        assert_eq!(ExpiryLevel::classify(8), ExpiryLevel::Warning);
        assert_eq!(ExpiryLevel::classify(7), ExpiryLevel::Critical);
        assert_eq!(ExpiryLevel::classify(0), ExpiryLevel::Critical);
        assert_eq!(ExpiryLevel::classify(-4), ExpiryLevel::Critical);
    }

    #[test]
    fn test_expired_certificate_display() {
        let now = noon(2024, 3, 10);
        let expiry = expiry_at(now - Duration::days(2), now);
        assert!(expiry.is_expired());
        assert_eq!(expiry.to_string(), "expired 2 day(s) ago");
    }

    #[test]
    fn test_certificate_expired_within_the_day() {
        let now = noon(2024, 3, 10);
        let expiry = expiry_at(now - Duration::hours(5), now);
        assert_eq!(expiry.days_remaining, 0);
        assert!(expiry.is_expired());
        assert_eq!(expiry.level(), ExpiryLevel::Critical);
        assert_eq!(expiry.to_string(), "expired today (2024-03-10 07:00)");

        let expiry = expiry_at(now + Duration::hours(5), now);
        assert!(!expiry.is_expired());
        assert_eq!(expiry.to_string(), "expires in 0 day(s) (2024-03-10)");
    }

    #[test]
    fn test_parse_openssl_end_date() {
        assert_eq!(
            parse_end_date("notAfter=Mar  5 12:00:00 2025 GMT\n"),
            Some(noon(2025, 3, 5))
        );
        assert_eq!(
            parse_end_date("notAfter=Dec 31 12:00:00 2024 GMT"),
            Some(noon(2024, 12, 31))
        );
        assert_eq!(parse_end_date("unable to load certificate"), None);
    }

    #[test]
    fn test_access_urls_per_deployment_type() {
        let record = sample_record(DeploymentType::Main);
        let urls: Vec<String> = access_urls(&record)
            .unwrap()
            .iter()
            .map(Url::to_string)
            .collect();
        assert_eq!(urls, vec!["http://blog.example.com/", "https://blog.example.com/"]);

        let record = sample_record(DeploymentType::Subdirectory);
        assert_eq!(
            access_url(&record, "http").unwrap().as_str(),
            "http://blog.example.com/blog/"
        );

        let record = sample_record(DeploymentType::Port(8080));
        assert_eq!(
            access_url(&record, "http").unwrap().as_str(),
            "http://blog.example.com:8080/"
        );
    }

    #[test]
    fn test_gauge_percentages() {
        let gauges = ResourceGauges {
            memory_used: 512,
            memory_total: 2048,
            disk_used: 0,
            disk_total: 0,
            load_average: (0.5, 0.25, 0.1),
        };
        assert_eq!(gauges.memory_percent(), 25.0);
        assert_eq!(gauges.disk_percent(), 0.0);
        assert!(gauges.to_string().contains("Load:   0.50 0.25 0.10"));
    }
}
