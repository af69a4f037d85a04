use crate::config::HcConfig;
use crate::host::context::HostContext;
use crate::slug::slugify;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::SeekFrom;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info};

/// Bounded timeout applied to every Healthchecks request. There are no
/// retries; a failed call aborts the invocation.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// At most this many trailing bytes of a log file are sent as a ping body.
pub const PING_BODY_LIMIT: u64 = 100_000;

/// Default expected ping interval for a check, in seconds.
pub const DEFAULT_CHECK_TIMEOUT: u64 = 86_400;

#[derive(Debug, Error)]
pub enum HcError {
    #[error("check name is required")]
    MissingName,
    #[error("slug prefix is required")]
    MissingSlugPrefix,
    #[error("read-write API key is required")]
    MissingApiKey,
    #[error("ping key is required")]
    MissingPingKey,
    #[error("report status must be blank, start, fail, log, or a non-negative number, got '{0}'")]
    InvalidReport(String),
    #[error("file and data ping bodies are mutually exclusive")]
    ConflictingBody,
    #[error("cannot read ping body from {path}: {source}")]
    BodyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no check found for slug '{0}'")]
    UnknownCheck(String),
    #[error("healthchecks request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Report status carried as the final ping URL segment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Report {
    /// Success ping, no report segment.
    #[default]
    Success,
    Start,
    Fail,
    Log,
    /// Numeric exit-code report.
    Code(u32),
}

impl Report {
    pub fn parse(report: &str) -> Result<Self, HcError> {
        match report {
            "" => Ok(Report::Success),
            "start" => Ok(Report::Start),
            "fail" => Ok(Report::Fail),
            "log" => Ok(Report::Log),
            other => other
                .parse::<u32>()
                .map(Report::Code)
                .map_err(|_| HcError::InvalidReport(other.to_string())),
        }
    }

    pub fn path_segment(&self) -> Option<String> {
        match self {
            Report::Success => None,
            Report::Start => Some("start".to_string()),
            Report::Fail => Some("fail".to_string()),
            Report::Log => Some("log".to_string()),
            Report::Code(code) => Some(code.to_string()),
        }
    }
}

/// Check definition sent to the upsert endpoint. `name` is the uniqueness
/// key, so re-creating a check with the same name updates it in place.
#[derive(Debug, Clone)]
pub struct CheckSpec {
    pub name: String,
    pub slug_prefix: String,
    pub grace: u64,
    pub timeout: u64,
    pub description: String,
    pub tags: String,
    pub channels: String,
}

impl CheckSpec {
    pub fn new(name: impl Into<String>, slug_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug_prefix: slug_prefix.into(),
            grace: 3600,
            timeout: DEFAULT_CHECK_TIMEOUT,
            description: String::new(),
            tags: String::new(),
            channels: "*".to_string(),
        }
    }
}

#[derive(Serialize)]
struct CheckPayload<'a> {
    name: &'a str,
    slug: &'a str,
    channels: &'a str,
    timeout: u64,
    tz: &'a str,
    grace: u64,
    desc: &'a str,
    tags: String,
    unique: [&'a str; 1],
}

#[derive(Deserialize)]
struct ChecksResponse {
    checks: Vec<CheckInfo>,
}

#[derive(Deserialize)]
struct CheckInfo {
    ping_url: String,
}

/// The three monitoring operations the dispatcher needs. Trait seam so
/// dispatch logic is testable with a recording fake.
#[async_trait]
pub trait Monitoring: Send + Sync {
    /// Create or update a check; keyed by name, so it is an upsert.
    async fn create_or_update(&self, spec: &CheckSpec) -> Result<(), HcError>;

    /// Send a ping, optionally with a report status and a body read from
    /// `file` (trailing bytes only) or given literally as `data`. Returns
    /// the resolved request URL.
    async fn ping(
        &self,
        slug_prefix: &str,
        report: Report,
        file: Option<&Path>,
        data: Option<&str>,
    ) -> Result<String, HcError>;

    /// Human-facing dashboard URL for a check, looked up by slug.
    async fn dashboard_url(&self, slug_prefix: &str) -> Result<String, HcError>;
}

/// Healthchecks API client bound to one host identity.
pub struct HcClient {
    http: reqwest::Client,
    config: HcConfig,
    slug_suffix: String,
    timezone: String,
}

impl HcClient {
    pub fn new(config: HcConfig, host: &HostContext) -> Result<Self, HcError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            config,
            slug_suffix: host.slug_suffix.clone(),
            timezone: host.timezone.clone(),
        })
    }

    fn full_slug(&self, slug_prefix: &str) -> String {
        slugify(slug_prefix, &self.slug_suffix)
    }
}

#[async_trait]
impl Monitoring for HcClient {
    async fn create_or_update(&self, spec: &CheckSpec) -> Result<(), HcError> {
        if spec.name.is_empty() {
            return Err(HcError::MissingName);
        }
        if spec.slug_prefix.is_empty() {
            return Err(HcError::MissingSlugPrefix);
        }
        if self.config.rw_key.is_empty() {
            return Err(HcError::MissingApiKey);
        }

        let slug = self.full_slug(&spec.slug_prefix);
        let payload = CheckPayload {
            name: &spec.name,
            slug: &slug,
            channels: &spec.channels,
            timeout: spec.timeout,
            tz: &self.timezone,
            grace: spec.grace,
            desc: &spec.description,
            tags: spec.tags.trim().to_lowercase(),
            unique: ["name"],
        };

        info!("creating/updating check {slug}");
        let response = self
            .http
            .post(format!("{}/api/v3/checks/", self.config.base_url))
            .header("X-Api-Key", &self.config.rw_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        // the API answers with the check as JSON; anything else is a failure
        response.json::<serde_json::Value>().await?;
        Ok(())
    }

    async fn ping(
        &self,
        slug_prefix: &str,
        report: Report,
        file: Option<&Path>,
        data: Option<&str>,
    ) -> Result<String, HcError> {
        if slug_prefix.is_empty() {
            return Err(HcError::MissingSlugPrefix);
        }
        if self.config.ping_key.is_empty() {
            return Err(HcError::MissingPingKey);
        }
        if file.is_some() && data.is_some() {
            return Err(HcError::ConflictingBody);
        }

        let slug = self.full_slug(slug_prefix);
        let mut url = format!("{}/{}/{}", self.config.ping_url, self.config.ping_key, slug);
        if let Some(segment) = report.path_segment() {
            url.push('/');
            url.push_str(&segment);
        }
        info!("PING ENDPOINT: {url}");

        let body = match (file, data) {
            (Some(path), None) => read_tail(path, PING_BODY_LIMIT).await?,
            (None, Some(data)) => data.to_string(),
            _ => String::new(),
        };

        let response = self
            .http
            .post(&url)
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.url().to_string())
    }

    async fn dashboard_url(&self, slug_prefix: &str) -> Result<String, HcError> {
        if self.config.rw_key.is_empty() {
            return Err(HcError::MissingApiKey);
        }

        let slug = self.full_slug(slug_prefix);
        debug!("looking up check {slug}");
        let response: ChecksResponse = self
            .http
            .get(format!("{}/api/v3/checks/", self.config.base_url))
            .query(&[("slug", slug.as_str())])
            .header("X-Api-Key", &self.config.rw_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let check = response
            .checks
            .first()
            .ok_or_else(|| HcError::UnknownCheck(slug))?;
        Ok(format!("{}/details", check.ping_url.replace("ping", "checks")))
    }
}

/// Read at most the final `limit` bytes of a file.
async fn read_tail(path: &Path, limit: u64) -> Result<String, HcError> {
    let map_err = |source| HcError::BodyFile {
        path: path.display().to_string(),
        source,
    };

    let mut file = tokio::fs::File::open(path).await.map_err(map_err)?;
    let size = file.metadata().await.map_err(map_err)?.len();
    file.seek(SeekFrom::Start(size.saturating_sub(limit)))
        .await
        .map_err(map_err)?;

    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer).await.map_err(map_err)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
