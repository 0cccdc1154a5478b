//! External command invocation with captured output and a hard timeout.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use wait_timeout::ChildExt;

const ERROR_SUMMARY_MAX_CHARS: usize = 600;

/// Captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// True when the command was only logged because of dry-run mode.
    pub simulated: bool,
}

impl CommandOutput {
    pub fn simulated() -> Self {
        Self {
            simulated: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command line is empty")]
    Empty,
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed while waiting for {command}: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} timed out after {timeout_ms} ms")]
    TimedOut { command: String, timeout_ms: u64 },
    #[error("{command} exited with status {status}: {}", summarize_process_failure(.stderr, .stdout))]
    Failed {
        command: String,
        status: String,
        stdout: String,
        stderr: String,
    },
}

impl CommandError {
    /// Error text captured from a command that ran and failed.
    pub fn error_output(&self) -> Option<&str> {
        match self {
            Self::Failed { stdout, stderr, .. } => {
                if stderr.trim().is_empty() {
                    Some(stdout.as_str())
                } else {
                    Some(stderr.as_str())
                }
            }
            _ => None,
        }
    }
}

fn summarize_process_failure(stderr: &str, stdout: &str) -> String {
    let source = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };
    if source.is_empty() {
        return "no output".to_string();
    }
    if source.chars().count() <= ERROR_SUMMARY_MAX_CHARS {
        return source.to_string();
    }
    let mut truncated = source
        .chars()
        .take(ERROR_SUMMARY_MAX_CHARS)
        .collect::<String>();
    truncated.push_str("...");
    truncated
}

/// Render argv as a copy-pasteable shell command line.
pub fn render_command_line(argv: &[String]) -> String {
    shell_words::join(argv)
}

/// Seam between the orchestrator and the processes it launches.
pub trait CommandRunner {
    fn run(&self, argv: &[String]) -> Result<CommandOutput, CommandError>;
}

#[derive(Debug, Clone)]
pub struct ProcessCommandRunner {
    timeout_ms: u64,
    dry_run: bool,
}

impl ProcessCommandRunner {
    pub fn new(timeout_ms: u64, dry_run: bool) -> Self {
        Self {
            timeout_ms: timeout_ms.max(1),
            dry_run,
        }
    }
}

fn spawn_pipe_reader<R>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        buffer
    })
}

fn collect_pipe(reader: thread::JoinHandle<Vec<u8>>) -> String {
    let bytes = reader.join().unwrap_or_default();
    String::from_utf8_lossy(&bytes).to_string()
}

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, argv: &[String]) -> Result<CommandOutput, CommandError> {
        let Some((executable, args)) = argv.split_first() else {
            return Err(CommandError::Empty);
        };
        let command_line = render_command_line(argv);
        if self.dry_run {
            tracing::info!("dry-run: {command_line}");
            return Ok(CommandOutput::simulated());
        }
        tracing::debug!("running {command_line}");

        let mut command = Command::new(executable);
        command.args(args);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        let mut child = command.spawn().map_err(|source| CommandError::Spawn {
            command: command_line.clone(),
            source,
        })?;
        let stdout_reader = spawn_pipe_reader(child.stdout.take());
        let stderr_reader = spawn_pipe_reader(child.stderr.take());

        let waited = child
            .wait_timeout(Duration::from_millis(self.timeout_ms))
            .map_err(|source| CommandError::Wait {
                command: command_line.clone(),
                source,
            })?;
        let Some(status) = waited else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CommandError::TimedOut {
                command: command_line,
                timeout_ms: self.timeout_ms,
            });
        };

        let stdout = collect_pipe(stdout_reader);
        let stderr = collect_pipe(stderr_reader);
        if !status.success() {
            let status = status
                .code()
                .map(|value| value.to_string())
                .unwrap_or_else(|| "terminated_by_signal".to_string());
            return Err(CommandError::Failed {
                command: command_line,
                status,
                stdout,
                stderr,
            });
        }
        Ok(CommandOutput {
            stdout,
            stderr,
            simulated: false,
        })
    }
}
