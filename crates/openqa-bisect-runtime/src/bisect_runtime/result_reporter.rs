use anyhow::Result;
use openqa_bisect_core::{render_bisect_report, JobUrl};

use super::clone_driver::CloneResult;
use crate::platform_commands::PlatformCommands;
use crate::process_transport::CommandRunner;

/// Post one aggregate comment listing every cloned job, in candidate order.
pub(super) fn post_bisect_report<R: CommandRunner + ?Sized>(
    commands: &PlatformCommands<'_, R>,
    origin: &JobUrl,
    results: &[CloneResult],
) -> Result<()> {
    let mut ordered = results.iter().collect::<Vec<_>>();
    ordered.sort_by(|left, right| left.order_key().cmp(&right.order_key()));
    let comment = render_bisect_report(
        ordered
            .iter()
            .map(|result| (result.test_name.as_str(), result.url.as_str())),
    );
    commands.post_comment(origin.host(), origin.job_id(), &comment)
}

/// Raise every cloned job to the origin priority plus `priority_add`.
///
/// Returns the number of priority updates issued.
pub(super) fn raise_priorities<R: CommandRunner + ?Sized>(
    commands: &PlatformCommands<'_, R>,
    origin: &JobUrl,
    results: &[CloneResult],
    origin_priority: i64,
    priority_add: i64,
) -> Result<usize> {
    if priority_add == 0 {
        return Ok(0);
    }
    let priority = origin_priority.saturating_add(priority_add);
    for result in results {
        tracing::debug!("setting priority of job {} to {priority}", result.job_id);
        commands.set_priority(origin.host(), result.job_id, priority)?;
    }
    Ok(results.len())
}
