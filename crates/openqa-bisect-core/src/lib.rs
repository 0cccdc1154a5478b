//! Decision logic for automatic bisection of failing openQA jobs.
//!
//! This crate is free of I/O: it models jobs and investigation records, parses
//! investigation diffs into change-sets, evaluates the exclusion policy and
//! derives the leave-one-out clone matrix plus the comment texts posted back to
//! the origin job. Transport and orchestration live in `openqa-bisect-runtime`.

pub mod bisection_matrix;
pub mod change_set;
pub mod clone_failure;
pub mod exclusion_policy;
pub mod incident;
pub mod job_model;
pub mod report_comment;
pub mod setting_key;

pub use bisection_matrix::{generate_bisection_matrix, BisectCandidate, BisectionMatrix};
pub use change_set::{extract_change_set, ChangeSet, KeyChange};
pub use clone_failure::{classify_clone_failure, CloneFailureKind};
pub use exclusion_policy::{
    ExclusionGuard, ExclusionPolicy, ExclusionPolicyConfig, PolicyConfigError, PolicyExclusion,
};
pub use incident::{Incident, IncidentParseError, IncidentSet};
pub use job_model::{InvestigationRecord, JobEnvelope, JobRecord, JobUrl, JobUrlError};
pub use report_comment::{render_bisect_report, render_repositories_unavailable_comment};
pub use setting_key::EligibleKeyRule;

/// Identifying client marker sent with every outbound platform call.
pub const CLIENT_MARKER: &str =
    "openqa-trigger-bisect-jobs (https://github.com/os-autoinst/scripts)";
