//! Job references and the platform records the orchestrator reads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::incident::{parse_incident_list_lossy, IncidentSet};

pub const DIRECTLY_CHAINED_DEPENDENCY: &str = "Directly chained";
pub const DEFAULT_JOB_PRIORITY: i64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobUrlError {
    #[error("job url is empty")]
    Empty,
    #[error("job url '{0}' has no host")]
    MissingHost(String),
    #[error("job url '{0}' does not reference a job (expected /tests/<id>)")]
    MissingJobId(String),
}

/// Location of a job on a test-execution host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobUrl {
    host: String,
    job_id: u64,
}

impl JobUrl {
    /// Parse a job URL, defaulting to `https://` when no scheme is given.
    pub fn parse(raw: &str) -> Result<Self, JobUrlError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(JobUrlError::Empty);
        }
        let (scheme, rest) = match trimmed.split_once("://") {
            Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
            None => ("https".to_string(), trimmed),
        };
        let rest = rest
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        if authority.is_empty() {
            return Err(JobUrlError::MissingHost(trimmed.to_string()));
        }
        let job_id = job_id_from_path(path)
            .ok_or_else(|| JobUrlError::MissingJobId(trimmed.to_string()))?;
        Ok(Self {
            host: format!("{scheme}://{authority}"),
            job_id,
        })
    }

    pub fn for_job(&self, job_id: u64) -> Self {
        Self {
            host: self.host.clone(),
            job_id,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    pub fn api_job_url(&self) -> String {
        format!("{}/api/v1/jobs/{}", self.host, self.job_id)
    }

    pub fn investigation_url(&self) -> String {
        format!("{}/tests/{}/investigation_ajax", self.host, self.job_id)
    }

    /// Short browsable link, as rendered in comments.
    pub fn short_url(&self) -> String {
        format!("{}/t{}", self.host, self.job_id)
    }
}

impl fmt::Display for JobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/tests/{}", self.host, self.job_id)
    }
}

fn job_id_from_path(path: &str) -> Option<u64> {
    let segments = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();
    if let Some(position) = segments.iter().position(|segment| *segment == "tests") {
        return segments.get(position + 1)?.parse().ok();
    }
    match segments.as_slice() {
        [single] => single.strip_prefix('t')?.parse().ok(),
        _ => None,
    }
}

/// `GET /api/v1/jobs/<id>` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct JobEnvelope {
    pub job: JobRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobRecord {
    pub id: u64,
    #[serde(default)]
    pub test: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default = "default_job_priority")]
    pub priority: i64,
    #[serde(default)]
    pub clone_id: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_dependency_map")]
    pub parents: BTreeMap<String, Vec<u64>>,
    #[serde(default, deserialize_with = "deserialize_settings")]
    pub settings: BTreeMap<String, String>,
}

fn default_job_priority() -> i64 {
    DEFAULT_JOB_PRIORITY
}

impl JobRecord {
    pub fn is_passed(&self) -> bool {
        self.result.as_deref() == Some("passed")
    }

    pub fn directly_chained_parents(&self) -> &[u64] {
        self.parents
            .get(DIRECTLY_CHAINED_DEPENDENCY)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Incidents currently listed under `key`, ignoring unparsable tokens.
    pub fn setting_incidents(&self, key: &str) -> IncidentSet {
        self.setting(key)
            .map(parse_incident_list_lossy)
            .unwrap_or_default()
    }
}

fn deserialize_dependency_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<u64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Option<Vec<u64>>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(kind, ids)| (kind, ids.unwrap_or_default()))
        .collect())
}

fn deserialize_settings<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(text) => text,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, rendered)
        })
        .collect())
}

/// `GET /tests/<id>/investigation_ajax` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvestigationRecord {
    #[serde(default)]
    pub diff_to_last_good: Option<String>,
    #[serde(default)]
    pub first_bad: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl InvestigationRecord {
    pub fn diff(&self) -> &str {
        self.diff_to_last_good.as_deref().unwrap_or_default()
    }

    /// Id of the first failing job after the last good one, if reported.
    pub fn first_bad_job_id(&self) -> Option<u64> {
        self.first_bad.as_ref().and_then(job_id_from_link_value)
    }
}

fn job_id_from_link_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text
            .trim()
            .parse()
            .ok()
            .or_else(|| job_id_from_path(text.trim())),
        Value::Object(map) => map
            .get("link")
            .and_then(job_id_from_link_value)
            .or_else(|| map.get("text").and_then(job_id_from_link_value)),
        _ => None,
    }
}
