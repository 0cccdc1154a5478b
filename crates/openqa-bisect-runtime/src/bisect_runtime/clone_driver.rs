use anyhow::{Context, Result};
use openqa_bisect_core::{
    classify_clone_failure, BisectCandidate, BisectionMatrix, CloneFailureKind, Incident, JobUrl,
};

use crate::platform_commands::{parse_clone_output, PlatformCommands};
use crate::process_transport::CommandRunner;

/// A candidate that was cloned into a new job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct CloneResult {
    pub(super) key: String,
    pub(super) incident: Incident,
    pub(super) test_name: String,
    pub(super) job_id: u64,
    pub(super) url: String,
}

impl CloneResult {
    fn new(candidate: &BisectCandidate, job: &JobUrl) -> Self {
        Self {
            key: candidate.key.clone(),
            incident: candidate.incident,
            test_name: candidate.test_name.clone(),
            job_id: job.job_id(),
            url: job.short_url(),
        }
    }

    pub(super) fn order_key(&self) -> (&str, Incident) {
        (self.key.as_str(), self.incident)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum CloneRun {
    Cloned {
        results: Vec<CloneResult>,
        simulated: usize,
    },
    RepositoriesUnavailable {
        error_output: String,
    },
}

/// Clone every candidate in matrix order.
///
/// Stops at the first failure. A missing-repositories failure is returned as
/// [`CloneRun::RepositoriesUnavailable`]; every other failure is an error.
pub(super) fn clone_candidates<R: CommandRunner + ?Sized>(
    commands: &PlatformCommands<'_, R>,
    origin: &JobUrl,
    matrix: &BisectionMatrix,
) -> Result<CloneRun> {
    let mut results = Vec::with_capacity(matrix.len());
    let mut simulated = 0_usize;
    for candidate in matrix {
        let output = match commands.clone_job(origin, candidate) {
            Ok(output) => output,
            Err(error) => {
                if let Some(error_output) = error.error_output() {
                    let kind = classify_clone_failure(error_output);
                    tracing::info!(
                        "cloning {} failed ({}), stopping bisection",
                        candidate.test_name,
                        kind.as_str()
                    );
                    if kind == CloneFailureKind::RepositoriesUnavailable {
                        return Ok(CloneRun::RepositoriesUnavailable {
                            error_output: error_output.trim().to_string(),
                        });
                    }
                }
                return Err(error)
                    .with_context(|| format!("failed to clone {}", candidate.test_name));
            }
        };
        if output.simulated {
            simulated = simulated.saturating_add(1);
            continue;
        }
        let job_id = parse_clone_output(&output.stdout, origin.job_id())
            .with_context(|| format!("failed to read clone result of {}", candidate.test_name))?;
        let cloned = origin.for_job(job_id);
        tracing::info!("created {}: {}", candidate.test_name, cloned.short_url());
        results.push(CloneResult::new(candidate, &cloned));
    }
    Ok(CloneRun::Cloned { results, simulated })
}
