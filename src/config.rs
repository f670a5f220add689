//! Configuration loader and validator for the stale page automator.
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Fallback page size for the space listing when `resultsLimit` is unset.
pub const DEFAULT_RESULTS_LIMIT: u32 = 250;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("Invalid job '{job}': {reason}")]
    InvalidJob { job: String, reason: String },
    #[error("Invalid duration '{value}'")]
    InvalidDuration { value: String },
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub atlassian: Atlassian,
    #[serde(default)]
    pub debug: bool,
    #[serde(default, rename = "issues")]
    pub jobs: Vec<JobConfig>,
}

/// Atlassian Cloud site settings shared by the Confluence and Jira clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Atlassian {
    #[serde(rename = "baseURL")]
    pub base_url: String,
}

/// One issue raising job as written in YAML. Durations stay strings until
/// [`JobConfig::resolve`] is called so one bad job cannot sink the others.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    pub name: String,
    pub interval: String,
    pub retry_interval: String,
    pub jira_project_key: String,
    #[serde(default)]
    pub jira_labels: Vec<String>,
    #[serde(default)]
    pub last_update: Option<LastUpdateConfig>,
}

/// Page discovery settings for a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LastUpdateConfig {
    pub space_key: String,
    #[serde(rename = "parentPageID")]
    pub parent_page_id: String,
    pub duration: String,
    #[serde(default)]
    pub results_limit: u32,
}

/// A validated job with parsed durations, immutable for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSettings {
    pub name: String,
    pub poll_interval: Duration,
    pub retry_interval: Duration,
    pub project_key: String,
    pub labels: Vec<String>,
    pub discovery: Option<DiscoverySettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    pub space_key: String,
    pub root_page_id: String,
    pub stale_after: Duration,
    pub results_limit: u32,
}

impl Config {
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.atlassian.base_url.trim())
            .map_err(|_| ConfigError::Invalid("atlassian.baseURL must be an absolute URL"))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Invalid("atlassian.baseURL must use http or https"));
        }
        Ok(url)
    }

    pub fn job(&self, name: &str) -> Option<&JobConfig> {
        self.jobs.iter().find(|job| job.name == name)
    }
}

impl JobConfig {
    /// Parse durations and check required fields.
    pub fn resolve(&self) -> Result<JobSettings, ConfigError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid("issues[].name must be non-empty"));
        }
        let invalid = |reason: &str| ConfigError::InvalidJob {
            job: name.to_string(),
            reason: reason.to_string(),
        };
        if self.jira_project_key.trim().is_empty() {
            return Err(invalid("jiraProjectKey must be non-empty"));
        }
        let poll_interval = parse_duration(&self.interval)?;
        let retry_interval = parse_duration(&self.retry_interval)?;
        if poll_interval.is_zero() {
            return Err(invalid("interval must be > 0"));
        }
        if retry_interval.is_zero() {
            return Err(invalid("retryInterval must be > 0"));
        }

        let discovery = match &self.last_update {
            None => None,
            Some(lu) => {
                if lu.space_key.trim().is_empty() {
                    return Err(invalid("lastUpdate.spaceKey must be non-empty"));
                }
                if lu.parent_page_id.trim().is_empty() {
                    return Err(invalid("lastUpdate.parentPageID must be non-empty"));
                }
                Some(DiscoverySettings {
                    space_key: lu.space_key.trim().to_string(),
                    root_page_id: lu.parent_page_id.trim().to_string(),
                    stale_after: parse_duration(&lu.duration)?,
                    results_limit: if lu.results_limit == 0 {
                        DEFAULT_RESULTS_LIMIT
                    } else {
                        lu.results_limit
                    },
                })
            }
        };

        Ok(JobSettings {
            name: name.to_string(),
            poll_interval,
            retry_interval,
            project_key: self.jira_project_key.trim().to_string(),
            labels: self.jira_labels.clone(),
            discovery,
        })
    }
}

static DURATION_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d*)?|\.\d+)(ns|us|µs|μs|ms|s|m|h)").expect("valid regex"));

/// Parse a Go style duration string such as `90s`, `1.5h` or `2h45m`.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration {
        value: value.to_string(),
    };
    let mut rest = value.trim();
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total_nanos: f64 = 0.0;
    while !rest.is_empty() {
        let caps = DURATION_PART.captures(rest).ok_or_else(invalid)?;
        let amount: f64 = caps[1].parse().map_err(|_| invalid())?;
        let unit_nanos: f64 = match &caps[2] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };
        total_nanos += amount * unit_nanos;
        rest = &rest[caps[0].len()..];
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

/// Fail unless `path` exists and is a regular file.
pub fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let meta = fs::metadata(path)?;
    if meta.is_dir() {
        return Err(ConfigError::Invalid("config path is a directory, not a normal file"));
    }
    Ok(())
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    validate_path(path)?;
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate the top-level fields. Per-job problems surface later from
/// [`JobConfig::resolve`].
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.atlassian.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("atlassian.baseURL must be non-empty"));
    }
    cfg.base_url()?;
    Ok(())
}

/// Returns an example YAML document covering every field.
pub fn example() -> &'static str {
    r#"atlassian:
  baseURL: "https://example.atlassian.net"

debug: false

issues:
  - name: "engineering-docs"
    interval: "24h"
    retryInterval: "5m"
    jiraProjectKey: "DOCS"
    jiraLabels:
      - "stale-docs"
    lastUpdate:
      spaceKey: "ENG"
      parentPageID: "123456"
      duration: "2160h"
      resultsLimit: 100
  - name: "runbooks"
    interval: "12h"
    retryInterval: "10m"
    jiraProjectKey: "OPS"
    lastUpdate:
      spaceKey: "OPS"
      parentPageID: "987654"
      duration: "720h"
"#
}
