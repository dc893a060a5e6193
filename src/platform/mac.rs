//! macOS route(8) implementation
//!
//! Runs `route add -net <network> -interface <interface>` directly (no shell),
//! with the child's stdout and stderr sharing one pipe so the log shows its
//! messages in the order route printed them.

use super::{shell_quote, PlatformError, RouteOutcome, RoutingManager, DEFAULT_ROUTE_COMMAND};
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::unistd::pipe;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

pub struct MacRoutingManager {
    program: PathBuf,
}

impl MacRoutingManager {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_ROUTE_COMMAND)
    }

    /// Use a different route binary (tests point this at a stand-in script)
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    fn output_error(&self, source: io::Error) -> PlatformError {
        PlatformError::OutputError {
            program: self.program_name(),
            source,
        }
    }
}

impl Default for MacRoutingManager {
    fn default() -> Self {
        Self::new()
    }
}

fn route_args<'a>(network: &'a str, interface: &'a str) -> [&'a str; 5] {
    ["add", "-net", network, "-interface", interface]
}

/// Keep `fd` out of every child; the ends we hand to route are dup'ed onto
/// its stdout/stderr, which clears the flag on those copies only.
fn set_cloexec(fd: &OwnedFd) -> io::Result<()> {
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    Ok(())
}

/// Exit code as a shell reports it: 128 + signal for a killed child
fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

impl RoutingManager for MacRoutingManager {
    fn command_line(&self, network: &str, interface: &str) -> String {
        format!(
            "{} add -net {} -interface {}",
            self.program_name(),
            shell_quote(network),
            shell_quote(interface)
        )
    }

    fn add_network_route(
        &self,
        network: &str,
        interface: &str,
    ) -> Result<RouteOutcome, PlatformError> {
        let (reader, writer) = pipe().map_err(|e| self.output_error(e.into()))?;
        set_cloexec(&reader).map_err(|e| self.output_error(e))?;
        set_cloexec(&writer).map_err(|e| self.output_error(e))?;
        let stderr_writer = writer.try_clone().map_err(|e| self.output_error(e))?;

        let mut command = Command::new(&self.program);
        command
            .args(route_args(network, interface))
            .stdin(Stdio::null())
            .stdout(Stdio::from(writer))
            .stderr(Stdio::from(stderr_writer));

        debug!("spawning {:?}", command);
        let mut child = command.spawn().map_err(|source| PlatformError::SpawnError {
            program: self.program_name(),
            source,
        })?;

        // The command still holds our copies of the write end; drop them so
        // the read below ends when the child exits.
        drop(command);

        let mut raw = Vec::new();
        let read = File::from(reader).read_to_end(&mut raw);
        let status = child.wait().map_err(|e| self.output_error(e))?;
        read.map_err(|e| self.output_error(e))?;

        let code = exit_code(status);
        debug!("{} exited with {}", self.program_name(), code);

        Ok(RouteOutcome {
            code,
            output: String::from_utf8_lossy(&raw).into_owned(),
        })
    }
}
