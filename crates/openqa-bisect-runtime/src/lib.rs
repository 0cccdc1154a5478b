//! Runtime for automatic openQA bisection runs.
//!
//! Provides the transport primitives (HTTP fetches against the platform API and
//! external command invocation), the platform command builders for cloning,
//! commenting and re-prioritizing jobs, and [`BisectRuntime`], which wires the
//! decision logic of `openqa-bisect-core` into one bisection pass over one job.

mod bisect_runtime;
pub mod http_transport;
pub mod platform_commands;
pub mod process_transport;

pub use bisect_runtime::{
    BisectOutcome, BisectRuntime, BisectRuntimeConfig, DEFAULT_COMMAND_TIMEOUT_MS,
    DEFAULT_PRIORITY_ADD, DEFAULT_REQUEST_TIMEOUT_MS,
};
pub use http_transport::PlatformHttpClient;
pub use platform_commands::{PlatformCommandConfig, PlatformCommands};
pub use process_transport::{CommandError, CommandOutput, CommandRunner, ProcessCommandRunner};
