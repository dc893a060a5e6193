//! Platform-specific implementations

#[cfg(unix)]
pub mod mac;

use std::io;
use std::path::Path;
use thiserror::Error;

/// route(8) on macOS
pub const DEFAULT_ROUTE_COMMAND: &str = "/sbin/route";

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Failed to run {program}: {source}")]
    SpawnError {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to collect output of {program}: {source}")]
    OutputError {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Unsupported platform")]
    UnsupportedPlatform,
}

impl PlatformError {
    /// Exit status a shell would have reported for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            PlatformError::SpawnError { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => 127,
                io::ErrorKind::PermissionDenied => 126,
                _ => 1,
            },
            PlatformError::OutputError { .. } | PlatformError::UnsupportedPlatform => 1,
        }
    }
}

/// Exit status and combined stdout/stderr of one routing command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOutcome {
    pub code: i32,
    pub output: String,
}

impl RouteOutcome {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Platform-agnostic routing interface
pub trait RoutingManager {
    /// Human-readable form of the command `add_network_route` runs
    fn command_line(&self, network: &str, interface: &str) -> String;

    /// Route `network` through `interface`
    ///
    /// A command that runs but exits non-zero is reported through
    /// `RouteOutcome::code`, not as an error.
    fn add_network_route(
        &self,
        network: &str,
        interface: &str,
    ) -> Result<RouteOutcome, PlatformError>;
}

/// Get the routing manager for the current platform, running `program`
pub fn get_routing_manager(program: &Path) -> Result<Box<dyn RoutingManager>, PlatformError> {
    #[cfg(unix)]
    {
        Ok(Box::new(mac::MacRoutingManager::with_program(program)))
    }

    #[cfg(not(unix))]
    {
        let _ = program;
        Err(PlatformError::UnsupportedPlatform)
    }
}

/// Quote `arg` for display as a single shell word
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}
