use clap::{ArgAction, Parser};
use openqa_bisect_core::ExclusionPolicyConfig;
use openqa_bisect_runtime::platform_commands::{DEFAULT_CLONE_JOB_BIN, DEFAULT_OPENQA_CLI_BIN};
use openqa_bisect_runtime::{
    BisectRuntimeConfig, PlatformCommandConfig, DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_PRIORITY_ADD,
    DEFAULT_REQUEST_TIMEOUT_MS,
};

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "openqa-trigger-bisect-jobs",
    about = "Trigger leave-one-out bisection clones for a failing openQA job",
    version
)]
pub(crate) struct Cli {
    #[arg(
        value_name = "URL",
        help = "URL of the failing job, e.g. https://openqa.opensuse.org/tests/123"
    )]
    pub(crate) url: String,

    #[arg(
        long = "dry-run",
        env = "OPENQA_BISECT_DRY_RUN",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Only log the clone, comment and priority commands instead of running them"
    )]
    pub(crate) dry_run: bool,

    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        help = "Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence"
    )]
    pub(crate) verbose: u8,

    #[arg(
        long = "priority-add",
        env = "OPENQA_BISECT_PRIORITY_ADD",
        default_value_t = DEFAULT_PRIORITY_ADD,
        allow_negative_numbers = true,
        help = "Value added to the origin job priority for every bisect job; 0 keeps the cloned priority"
    )]
    pub(crate) priority_add: i64,

    #[arg(
        long = "exclude-group-regex",
        env = "exclude_group_regex",
        help = "Skip jobs whose group name matches this pattern"
    )]
    pub(crate) exclude_group_regex: Option<String>,

    #[arg(
        long = "exclude-name-regex",
        env = "exclude_name_regex",
        help = "Skip jobs whose test name matches this pattern"
    )]
    pub(crate) exclude_name_regex: Option<String>,

    #[arg(
        long = "clone-job-bin",
        default_value = DEFAULT_CLONE_JOB_BIN,
        help = "Command used to clone jobs"
    )]
    pub(crate) clone_job_bin: String,

    #[arg(
        long = "openqa-cli-bin",
        default_value = DEFAULT_OPENQA_CLI_BIN,
        help = "Command used for comment and priority API calls"
    )]
    pub(crate) openqa_cli_bin: String,

    #[arg(
        long = "request-timeout-ms",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_MS,
        value_parser = parse_positive_u64,
        help = "Timeout for platform API requests"
    )]
    pub(crate) request_timeout_ms: u64,

    #[arg(
        long = "command-timeout-ms",
        default_value_t = DEFAULT_COMMAND_TIMEOUT_MS,
        value_parser = parse_positive_u64,
        help = "Timeout for every external command"
    )]
    pub(crate) command_timeout_ms: u64,
}

impl Cli {
    pub(crate) fn runtime_config(&self) -> BisectRuntimeConfig {
        BisectRuntimeConfig {
            dry_run: self.dry_run,
            priority_add: self.priority_add,
            policy: ExclusionPolicyConfig {
                exclude_group_regex: self.exclude_group_regex.clone(),
                exclude_name_regex: self.exclude_name_regex.clone(),
            },
            commands: PlatformCommandConfig {
                clone_job_bin: self.clone_job_bin.clone(),
                openqa_cli_bin: self.openqa_cli_bin.clone(),
            },
            request_timeout_ms: self.request_timeout_ms,
            command_timeout_ms: self.command_timeout_ms,
        }
    }
}
