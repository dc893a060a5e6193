//! Connection log for the ip-up hook
//!
//! pppd discards whatever the hook prints, so everything worth keeping goes to
//! a plain-text log file that users can read (and delete) without sudo.
//!
//! - `log_message` appends to the log file, opening it on first use.
//! - `warn` / `err` always go to stderr, and to the log file only if it is
//!   already open.
//!
//! Opening is attempted once per process. If it fails, a single warning is
//! printed and later messages are dropped.

use std::fs::File;
use std::io::{self, Write};
use std::panic::Location;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default log file location
pub const DEFAULT_LOG_FILE: &str = "/tmp/ppp.ip-up.log";

/// Name used to prefix warnings and errors when none is supplied
pub const DEFAULT_PROGRAM_NAME: &str = "ip-up";

pub struct HookLog {
    path: PathBuf,
    program: String,
    file: Option<File>,
    failed: bool,
    stderr: Box<dyn Write>,
}

impl HookLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_stderr(path, io::stderr())
    }

    /// Create a log that sends warnings and errors to `stderr` instead of the
    /// process's standard error (used by tests to capture diagnostics)
    pub fn with_stderr(path: impl Into<PathBuf>, stderr: impl Write + 'static) -> Self {
        Self {
            path: path.into(),
            program: DEFAULT_PROGRAM_NAME.to_string(),
            file: None,
            failed: false,
            stderr: Box::new(stderr),
        }
    }

    /// Set the program name shown in front of warnings and errors
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a message to the log file, adding a trailing newline if needed
    pub fn log_message(&mut self, msg: impl AsRef<str>) {
        let mut line = msg.as_ref().to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }

        if !self.open() {
            return;
        }

        let written = match self.file.as_mut() {
            Some(file) => file.write_all(line.as_bytes()),
            None => return,
        };

        if let Err(e) = written {
            debug!("write to {} failed: {}", self.path.display(), e);
            self.warn("Error writing to log file");
        }
    }

    /// Report an unexpected but non-fatal condition
    #[track_caller]
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.emit("Warning", msg.as_ref(), Location::caller());
    }

    /// Report a fatal condition
    #[track_caller]
    pub fn err(&mut self, msg: impl AsRef<str>) {
        self.emit("ERROR", msg.as_ref(), Location::caller());
    }

    fn emit(&mut self, label: &str, msg: &str, location: &Location<'_>) {
        let line = format!(
            "{} {}: {} at {} line {}\n",
            self.program,
            label,
            msg,
            location.file(),
            location.line()
        );

        // Nowhere left to report a failing stderr
        let _ = self.stderr.write_all(line.as_bytes());

        if let Some(file) = self.file.as_mut() {
            let _ = file.write_all(line.as_bytes());
        }
    }

    /// Open the log file if it is not open yet. Returns whether it is usable.
    fn open(&mut self) -> bool {
        if self.file.is_some() {
            return true;
        }
        if self.failed {
            return false;
        }

        match File::create(&self.path) {
            Ok(file) => {
                make_world_writable(&self.path);
                self.file = Some(file);
                true
            }
            Err(e) => {
                debug!("open {} failed: {}", self.path.display(), e);
                self.failed = true;
                let msg = format!("Cannot open log file: {}", self.path.display());
                self.warn(msg);
                false
            }
        }
    }
}

/// Let ordinary users read and remove a log created by root
#[cfg(unix)]
fn make_world_writable(path: &Path) {
    use std::fs::{self, Permissions};
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = fs::set_permissions(path, Permissions::from_mode(0o666)) {
        debug!("chmod {} failed: {}", path.display(), e);
    }
}

#[cfg(not(unix))]
fn make_world_writable(_path: &Path) {}
