//! Guards deciding whether a failing job is bisected at all.
//!
//! Guards run in the fixed order of [`JOB_GUARDS`] followed by
//! [`ExclusionGuard::AlreadyInvestigated`], which needs the investigation record
//! and is therefore only evaluated once every job-level guard has passed. The
//! first guard that matches is the only one reported.

use regex::Regex;
use thiserror::Error;

use crate::job_model::{InvestigationRecord, JobRecord};

pub const INVESTIGATE_TEST_MARKER: &str = ":investigate:";
pub const INVESTIGATE_ORIGIN_SETTING: &str = "OPENQA_INVESTIGATE_ORIGIN";

/// Job-level guards in evaluation order.
pub const JOB_GUARDS: [ExclusionGuard; 5] = [
    ExclusionGuard::Passed,
    ExclusionGuard::DirectlyChained,
    ExclusionGuard::AlreadyRetried,
    ExclusionGuard::ExcludedGroup,
    ExclusionGuard::ExcludedName,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusionGuard {
    Passed,
    DirectlyChained,
    AlreadyRetried,
    ExcludedGroup,
    ExcludedName,
    AlreadyInvestigated,
}

impl ExclusionGuard {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::DirectlyChained => "directly_chained",
            Self::AlreadyRetried => "already_retried",
            Self::ExcludedGroup => "excluded_group",
            Self::ExcludedName => "excluded_name",
            Self::AlreadyInvestigated => "already_investigated",
        }
    }
}

/// A matched guard together with its human readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyExclusion {
    pub guard: ExclusionGuard,
    pub reason: String,
}

impl PolicyExclusion {
    pub fn log_message(&self, job: &JobRecord) -> String {
        format!(
            "Job {} ({}) {}, skipping bisection",
            job.id, job.test, self.reason
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionPolicyConfig {
    pub exclude_group_regex: Option<String>,
    pub exclude_name_regex: Option<String>,
}

#[derive(Debug, Error)]
pub enum PolicyConfigError {
    #[error("invalid {setting} pattern '{pattern}': {source}")]
    InvalidPattern {
        setting: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ExclusionPolicy {
    exclude_group: Option<Regex>,
    exclude_name: Option<Regex>,
}

fn compile_optional_pattern(
    setting: &'static str,
    pattern: Option<&str>,
) -> Result<Option<Regex>, PolicyConfigError> {
    let Some(pattern) = pattern.map(str::trim).filter(|pattern| !pattern.is_empty()) else {
        return Ok(None);
    };
    Regex::new(pattern)
        .map(Some)
        .map_err(|source| PolicyConfigError::InvalidPattern {
            setting,
            pattern: pattern.to_string(),
            source,
        })
}

impl ExclusionPolicy {
    pub fn new(config: &ExclusionPolicyConfig) -> Result<Self, PolicyConfigError> {
        Ok(Self {
            exclude_group: compile_optional_pattern(
                "exclude_group_regex",
                config.exclude_group_regex.as_deref(),
            )?,
            exclude_name: compile_optional_pattern(
                "exclude_name_regex",
                config.exclude_name_regex.as_deref(),
            )?,
        })
    }

    /// Evaluate every guard that only needs the job record.
    pub fn evaluate_job(&self, job: &JobRecord) -> Option<PolicyExclusion> {
        JOB_GUARDS.iter().find_map(|guard| {
            self.check_job_guard(*guard, job)
                .map(|reason| PolicyExclusion {
                    guard: *guard,
                    reason,
                })
        })
    }

    /// Evaluate the guard that needs the investigation record.
    pub fn evaluate_investigation(
        &self,
        job: &JobRecord,
        investigation: &InvestigationRecord,
    ) -> Option<PolicyExclusion> {
        let first_bad = investigation.first_bad_job_id()?;
        (first_bad != job.id).then(|| PolicyExclusion {
            guard: ExclusionGuard::AlreadyInvestigated,
            reason: format!("was already investigated at its first failure {first_bad}"),
        })
    }

    fn check_job_guard(&self, guard: ExclusionGuard, job: &JobRecord) -> Option<String> {
        match guard {
            ExclusionGuard::Passed => job.is_passed().then(|| "is passed".to_string()),
            ExclusionGuard::DirectlyChained => {
                let parents = job.directly_chained_parents();
                (!parents.is_empty()).then(|| {
                    let ids = parents
                        .iter()
                        .map(u64::to_string)
                        .collect::<Vec<_>>()
                        .join(",");
                    format!("is directly chained to {ids}")
                })
            }
            ExclusionGuard::AlreadyRetried => {
                if let Some(clone_id) = job.clone_id {
                    return Some(format!("was already retried as {clone_id}"));
                }
                let is_investigation_clone = job.test.contains(INVESTIGATE_TEST_MARKER)
                    || job.setting(INVESTIGATE_ORIGIN_SETTING).is_some();
                is_investigation_clone.then(|| "is an investigation job".to_string())
            }
            ExclusionGuard::ExcludedGroup => {
                let pattern = self.exclude_group.as_ref()?;
                let group = job.group.as_deref().unwrap_or_default();
                pattern
                    .is_match(group)
                    .then(|| format!("is in excluded group '{group}'"))
            }
            ExclusionGuard::ExcludedName => {
                let pattern = self.exclude_name.as_ref()?;
                pattern
                    .is_match(&job.test)
                    .then(|| format!("matches excluded name pattern '{}'", pattern.as_str()))
            }
            ExclusionGuard::AlreadyInvestigated => None,
        }
    }
}
