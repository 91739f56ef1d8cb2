//! HTTP reachability probes and the external address lookup.

use async_trait::async_trait;
use reqwest::{redirect, Client};
use std::fmt;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Services asked, in order, for this host's public address.
pub const IP_LOOKUP_SERVICES: &[&str] = &["https://api.ipify.org", "https://ifconfig.me/ip"];

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },
}

/// Coarse meaning of an HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Redirect,
    ClientError,
    ServerError,
    Other,
    NoResponse,
}

impl StatusClass {
    pub fn of(status: Option<u16>) -> Self {
        match status {
            None => StatusClass::NoResponse,
            Some(200..=299) => StatusClass::Success,
            Some(300..=399) => StatusClass::Redirect,
            Some(400..=499) => StatusClass::ClientError,
            Some(500..=599) => StatusClass::ServerError,
            Some(_) => StatusClass::Other,
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StatusClass::Success => "OK",
            StatusClass::Redirect => "redirect",
            StatusClass::ClientError => "client error",
            StatusClass::ServerError => "server error",
            StatusClass::Other => "unexpected status",
            StatusClass::NoResponse => "no response",
        };
        write!(f, "{}", text)
    }
}

/// The application counts as up for exactly these codes.
pub fn is_reachable_status(status: Option<u16>) -> bool {
    matches!(status, Some(200) | Some(301) | Some(302))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub url: String,
    pub status: Option<u16>,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn responded(url: &str, status: u16, elapsed: Duration) -> Self {
        Self {
            url: url.to_string(),
            status: Some(status),
            elapsed,
            error: None,
        }
    }

    pub fn failed(url: &str, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            url: url.to_string(),
            status: None,
            elapsed,
            error: Some(error.into()),
        }
    }

    pub fn is_reachable(&self) -> bool {
        is_reachable_status(self.status)
    }

    pub fn class(&self) -> StatusClass {
        StatusClass::of(self.status)
    }
}

#[async_trait]
pub trait HttpProbe: Send + Sync {
    /// Issue a GET without following redirects. Never fails: connection
    /// problems are reported in the outcome.
    async fn probe(&self, url: &str) -> ProbeOutcome;

    /// Fetch a small text body.
    async fn fetch_text(&self, url: &str) -> Result<String, ProbeError>;
}

pub struct ReqwestProbe {
    client: Client,
}

impl ReqwestProbe {
    pub fn new() -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(PROBE_TIMEOUT)
            .redirect(redirect::Policy::none())
            .user_agent(concat!("webdeploy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpProbe for ReqwestProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let start = Instant::now();
        match self.client.get(url).send().await {
            Ok(response) => {
                ProbeOutcome::responded(url, response.status().as_u16(), start.elapsed())
            }
            Err(e) => ProbeOutcome::failed(url, e.to_string(), start.elapsed()),
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String, ProbeError> {
        let request_error = |e: reqwest::Error| ProbeError::Request {
            url: url.to_string(),
            message: e.to_string(),
        };
        self.client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(request_error)?
            .text()
            .await
            .map_err(request_error)
    }
}

/// Public address of this host, or `None` when no lookup service answers
/// with something that parses as an IP address.
pub async fn lookup_external_ip(probe: &dyn HttpProbe) -> Option<String> {
    for service in IP_LOOKUP_SERVICES {
        match probe.fetch_text(service).await {
            Ok(body) => {
                let candidate = body.trim();
                if candidate.parse::<IpAddr>().is_ok() {
                    return Some(candidate.to_string());
                }
                tracing::debug!("{} returned a non-address body", service);
            }
            Err(e) => tracing::debug!("External IP lookup failed: {}", e),
        }
    }
    tracing::warn!("Could not determine the external IP address");
    None
}
