//! Outbound platform calls, issued through the platform's command line tools.

use anyhow::{anyhow, Context, Result};
use openqa_bisect_core::{BisectCandidate, JobUrl, CLIENT_MARKER};
use serde_json::{json, Value};

use crate::process_transport::{CommandError, CommandOutput, CommandRunner};

pub const DEFAULT_CLONE_JOB_BIN: &str = "openqa-clone-job";
pub const DEFAULT_OPENQA_CLI_BIN: &str = "openqa-cli";
/// Clones are detached from the origin's job group.
pub const DETACHED_GROUP_SETTING: &str = "_GROUP=0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformCommandConfig {
    pub clone_job_bin: String,
    pub openqa_cli_bin: String,
}

impl Default for PlatformCommandConfig {
    fn default() -> Self {
        Self {
            clone_job_bin: DEFAULT_CLONE_JOB_BIN.to_string(),
            openqa_cli_bin: DEFAULT_OPENQA_CLI_BIN.to_string(),
        }
    }
}

impl PlatformCommandConfig {
    pub fn clone_args(&self, origin: &JobUrl, candidate: &BisectCandidate) -> Vec<String> {
        let mut args = vec![
            self.clone_job_bin.clone(),
            "--skip-chained-deps".to_string(),
            "--json-output".to_string(),
            "--within-instance".to_string(),
            origin.to_string(),
        ];
        args.extend(candidate.setting_args());
        args.push(DETACHED_GROUP_SETTING.to_string());
        args
    }

    fn api_args(&self, host: &str) -> Vec<String> {
        vec![
            self.openqa_cli_bin.clone(),
            "api".to_string(),
            "--header".to_string(),
            format!("User-Agent: {CLIENT_MARKER}"),
            "--host".to_string(),
            host.to_string(),
        ]
    }

    pub fn comment_args(&self, host: &str, job_id: u64, text: &str) -> Vec<String> {
        let mut args = self.api_args(host);
        args.extend([
            "-X".to_string(),
            "POST".to_string(),
            format!("jobs/{job_id}/comments"),
            format!("text={text}"),
        ]);
        args
    }

    pub fn priority_args(&self, host: &str, job_id: u64, priority: i64) -> Vec<String> {
        let mut args = self.api_args(host);
        args.extend([
            "--json".to_string(),
            "--data".to_string(),
            json!({ "priority": priority }).to_string(),
            "-X".to_string(),
            "PUT".to_string(),
            format!("jobs/{job_id}"),
        ]);
        args
    }
}

/// Extract the id of the new job from `openqa-clone-job --json-output`.
pub fn parse_clone_output(stdout: &str, origin_id: u64) -> Result<u64> {
    let payload: Value = serde_json::from_str(stdout.trim())
        .with_context(|| format!("failed to decode clone output '{}'", stdout.trim()))?;
    let Value::Object(map) = payload else {
        return Err(anyhow!("clone output is not a json object: {}", stdout.trim()));
    };
    let entry = map
        .get(&origin_id.to_string())
        .or_else(|| (map.len() == 1).then(|| map.values().next()).flatten())
        .ok_or_else(|| anyhow!("clone output has no entry for job {origin_id}"))?;
    let job_id = match entry {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    job_id.ok_or_else(|| anyhow!("clone output has an invalid job id for {origin_id}: {entry}"))
}

/// Platform operations bound to one command runner.
pub struct PlatformCommands<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    config: &'a PlatformCommandConfig,
}

impl<'a, R: CommandRunner + ?Sized> PlatformCommands<'a, R> {
    pub fn new(runner: &'a R, config: &'a PlatformCommandConfig) -> Self {
        Self { runner, config }
    }

    /// Clone the origin job with the candidate overlay.
    ///
    /// The raw [`CommandError`] is returned so callers can classify failures.
    pub fn clone_job(
        &self,
        origin: &JobUrl,
        candidate: &BisectCandidate,
    ) -> Result<CommandOutput, CommandError> {
        self.runner.run(&self.config.clone_args(origin, candidate))
    }

    pub fn post_comment(&self, host: &str, job_id: u64, text: &str) -> Result<()> {
        self.runner
            .run(&self.config.comment_args(host, job_id, text))
            .with_context(|| format!("failed to post comment on job {job_id}"))?;
        Ok(())
    }

    pub fn set_priority(&self, host: &str, job_id: u64, priority: i64) -> Result<()> {
        self.runner
            .run(&self.config.priority_args(host, job_id, priority))
            .with_context(|| format!("failed to set priority {priority} on job {job_id}"))?;
        Ok(())
    }
}
