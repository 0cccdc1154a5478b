//! Single-shot bisection run for one failing job.
//!
//! The run is linear: resolve the job, apply the exclusion policy, fetch the
//! investigation, derive the clone matrix, clone, report, raise priorities.
//! Every stage either finishes the run with a [`BisectOutcome`] or hands over
//! to the next one; nothing is retried.

use anyhow::{Context, Result};
use openqa_bisect_core::{
    extract_change_set, generate_bisection_matrix, render_repositories_unavailable_comment,
    EligibleKeyRule, ExclusionPolicy, ExclusionPolicyConfig, InvestigationRecord, JobEnvelope,
    JobRecord, JobUrl, PolicyExclusion,
};

use crate::http_transport::PlatformHttpClient;
use crate::platform_commands::{PlatformCommandConfig, PlatformCommands};
use crate::process_transport::{CommandRunner, ProcessCommandRunner};

mod clone_driver;
mod result_reporter;

use clone_driver::{clone_candidates, CloneRun};
use result_reporter::{post_bisect_report, raise_priorities};

pub const DEFAULT_PRIORITY_ADD: i64 = 100;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 300_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BisectRuntimeConfig {
    pub dry_run: bool,
    /// Added to the origin job priority for every clone; `0` leaves clones alone.
    pub priority_add: i64,
    pub policy: ExclusionPolicyConfig,
    pub commands: PlatformCommandConfig,
    pub request_timeout_ms: u64,
    pub command_timeout_ms: u64,
}

impl Default for BisectRuntimeConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            priority_add: DEFAULT_PRIORITY_ADD,
            policy: ExclusionPolicyConfig::default(),
            commands: PlatformCommandConfig::default(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
        }
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BisectOutcome {
    Excluded(PolicyExclusion),
    NothingToBisect,
    RepositoriesUnavailable,
    /// Dry-run: the clone commands were only logged.
    Simulated { planned: usize },
    Reported { cloned: usize, prioritized: usize },
}

impl BisectOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excluded(_) => "excluded",
            Self::NothingToBisect => "nothing_to_bisect",
            Self::RepositoriesUnavailable => "repositories_unavailable",
            Self::Simulated { .. } => "simulated",
            Self::Reported { .. } => "reported",
        }
    }
}

pub struct BisectRuntime<R: CommandRunner = ProcessCommandRunner> {
    http: PlatformHttpClient,
    runner: R,
    policy: ExclusionPolicy,
    rule: EligibleKeyRule,
    config: BisectRuntimeConfig,
}

impl BisectRuntime<ProcessCommandRunner> {
    pub fn new(config: BisectRuntimeConfig) -> Result<Self> {
        let runner = ProcessCommandRunner::new(config.command_timeout_ms, config.dry_run);
        Self::with_runner(config, runner)
    }
}

impl<R: CommandRunner> BisectRuntime<R> {
    pub fn with_runner(config: BisectRuntimeConfig, runner: R) -> Result<Self> {
        let policy = ExclusionPolicy::new(&config.policy)?;
        let http = PlatformHttpClient::new(config.request_timeout_ms)?;
        Ok(Self {
            http,
            runner,
            policy,
            rule: EligibleKeyRule::default(),
            config,
        })
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn commands(&self) -> PlatformCommands<'_, R> {
        PlatformCommands::new(&self.runner, &self.config.commands)
    }

    fn fetch_job(&self, origin: &JobUrl) -> Result<JobRecord> {
        let envelope: JobEnvelope = self
            .http
            .fetch_json("job details", &origin.api_job_url())?;
        Ok(envelope.job)
    }

    fn fetch_investigation(&self, origin: &JobUrl) -> Result<InvestigationRecord> {
        self.http
            .fetch_json("investigation", &origin.investigation_url())
    }

    fn excluded(job: &JobRecord, exclusion: PolicyExclusion) -> BisectOutcome {
        tracing::info!("{}", exclusion.log_message(job));
        BisectOutcome::Excluded(exclusion)
    }

    pub fn run(&self, raw_url: &str) -> Result<BisectOutcome> {
        let origin =
            JobUrl::parse(raw_url).with_context(|| format!("invalid job url '{raw_url}'"))?;
        let job = self
            .fetch_job(&origin)
            .with_context(|| format!("failed to resolve job {}", origin.job_id()))?;
        if let Some(exclusion) = self.policy.evaluate_job(&job) {
            return Ok(Self::excluded(&job, exclusion));
        }

        let investigation = self
            .fetch_investigation(&origin)
            .with_context(|| format!("failed to fetch investigation of job {}", job.id))?;
        if let Some(exclusion) = self.policy.evaluate_investigation(&job, &investigation) {
            return Ok(Self::excluded(&job, exclusion));
        }
        if let Some(error) = investigation.error.as_deref() {
            tracing::info!("investigation of job {} reported: {error}", job.id);
        }

        let changes = extract_change_set(investigation.diff(), &self.rule);
        if changes.is_empty() {
            tracing::info!(
                "Job {} ({}) has no changed incidents, nothing to bisect",
                job.id,
                job.test
            );
            return Ok(BisectOutcome::NothingToBisect);
        }
        tracing::debug!("job {} changes {} eligible settings", job.id, changes.len());
        let matrix = generate_bisection_matrix(&changes, &job, &origin, &self.rule);
        if matrix.is_empty() {
            tracing::info!("Job {} ({}) has nothing to bisect", job.id, job.test);
            return Ok(BisectOutcome::NothingToBisect);
        }
        tracing::info!(
            "triggering {} bisect jobs for job {} ({})",
            matrix.len(),
            job.id,
            job.test
        );

        let commands = self.commands();
        let results = match clone_candidates(&commands, &origin, &matrix)? {
            CloneRun::RepositoriesUnavailable { error_output } => {
                commands
                    .post_comment(
                        origin.host(),
                        origin.job_id(),
                        &render_repositories_unavailable_comment(&error_output),
                    )
                    .context("failed to report unavailable repositories")?;
                return Ok(BisectOutcome::RepositoriesUnavailable);
            }
            CloneRun::Cloned { results, simulated } => {
                if results.is_empty() {
                    tracing::info!("no bisect job was created, skipping report");
                    return Ok(BisectOutcome::Simulated { planned: simulated });
                }
                results
            }
        };

        post_bisect_report(&commands, &origin, &results)?;
        let prioritized = raise_priorities(
            &commands,
            &origin,
            &results,
            job.priority,
            self.config.priority_add,
        )?;
        Ok(BisectOutcome::Reported {
            cloned: results.len(),
            prioritized,
        })
    }
}
