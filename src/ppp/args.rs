//! pppd ip-up invocation arguments
//!
//! When the link comes up, pppd runs `/etc/ppp/ip-up` with:
//!
//! | Position | Example | Description |
//! |----------|---------|-------------|
//! | 1 | `ppp0` | Interface name |
//! | 2 | `/dev/ttys001` | TTY device name |
//! | 3 | `0` | TTY device speed |
//! | 4 | `10.8.0.6` | Local IP address |
//! | 5 | `1.2.3.4` | Remote IP address |
//! | 6 | `vpn-office` | `ipparam` option value |
//!
//! Only the interface and remote IP drive routing; everything is logged.
//! The positions are taken verbatim: `ipparam` is whatever the user put in
//! their pppd options, so a value like `--help` is data, not a flag.
//!
//! Hook settings come from the environment only:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `PPP_ROUTES_CONFIG` | `/etc/ppp/routes.json` |
//! | `PPP_ROUTES_LOG` | `/tmp/ppp.ip-up.log` |
//! | `PPP_ROUTES_COMMAND` | `/sbin/route` |
//! | `PPP_ROUTES_VERBOSE` | unset |

use crate::config::DEFAULT_CONFIG_FILE;
use crate::log::DEFAULT_LOG_FILE;
use crate::platform::DEFAULT_ROUTE_COMMAND;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

/// Labels for the argument dump, indexed by position
pub const ARG_NAMES: [&str; 7] = [
    "path to this script",
    "pppd Interface name",
    "TTY device name",
    "TTY device speed",
    "Local IP",
    "Remote IP",
    "pppd ipparam option",
];

/// Hook settings, read from environment variables
///
/// The command line belongs to pppd, so clap is never shown it; only the
/// `env` sources of these options are ever consulted.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "ip-up")]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Settings {
    /// Routing table to read
    #[arg(long, env = "PPP_ROUTES_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log file to (re)create
    #[arg(long, env = "PPP_ROUTES_LOG", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// route binary to run
    #[arg(long, env = "PPP_ROUTES_COMMAND", default_value = DEFAULT_ROUTE_COMMAND)]
    pub route_command: PathBuf,

    /// Enable verbose diagnostics on stderr
    #[arg(long, env = "PPP_ROUTES_VERBOSE")]
    pub verbose: bool,
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, clap::Error> {
        Self::try_parse_from(["ip-up"])
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG_FILE),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            route_command: PathBuf::from(DEFAULT_ROUTE_COMMAND),
            verbose: false,
        }
    }
}

/// The six positional values pppd passes, plus the program path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationArgs {
    /// Path this hook was invoked as (position 0)
    pub script_path: String,
    /// Interface name used by pppd (e.g. ppp0)
    pub interface: String,
    pub tty_device: String,
    pub tty_speed: String,
    /// Local IP address of the interface
    pub local_ip: String,
    /// Remote (VPN server) IP address
    pub remote_ip: String,
    /// Value of pppd's ipparam option
    pub ipparam: String,
    /// Anything past position 6, kept so the log shows it
    pub extra: Vec<String>,
}

impl InvocationArgs {
    /// Take the arguments by position. Missing ones are empty strings.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut values = args
            .into_iter()
            .map(|arg| arg.into().to_string_lossy().into_owned());
        let mut next = || values.next().unwrap_or_default();

        let mut parsed = Self {
            script_path: next(),
            interface: next(),
            tty_device: next(),
            tty_speed: next(),
            local_ip: next(),
            remote_ip: next(),
            ipparam: next(),
            extra: Vec::new(),
        };
        parsed.extra = values.collect();
        parsed
    }

    /// Arguments of the current process
    pub fn from_env() -> Self {
        Self::from_args(std::env::args_os())
    }

    /// Values in pppd's positional order, starting with the program path
    pub fn positions(&self) -> [&str; 7] {
        [
            self.script_path.as_str(),
            self.interface.as_str(),
            self.tty_device.as_str(),
            self.tty_speed.as_str(),
            self.local_ip.as_str(),
            self.remote_ip.as_str(),
            self.ipparam.as_str(),
        ]
    }

    /// One tab-indented, labelled line per argument
    pub fn dump(&self) -> String {
        let known = self
            .positions()
            .into_iter()
            .enumerate()
            .map(|(i, value)| format!("\t[{}] {}: '{}'", i, ARG_NAMES[i], value));
        let extra = self
            .extra
            .iter()
            .enumerate()
            .map(|(i, value)| format!("\t[{}] unexpected argument: '{}'", i + ARG_NAMES.len(), value));

        known.chain(extra).collect::<Vec<_>>().join("\n")
    }
}
