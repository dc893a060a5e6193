//! routes.json handling
//!
//! The routing table maps a VPN server's IP address to the network blocks
//! that should be sent through that VPN:
//!
//! ```json
//! { "remotes": {
//!     // office VPN
//!     "1.2.3.4": [ "9.8.7", "10.20" ]
//! }}
//! ```
//!
//! `//` comments are allowed. They are removed line by line before parsing,
//! without regard for string literals, so a value containing `//` is cut
//! short. Route values never need one.

use crate::log::HookLog;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default routing table location
pub const DEFAULT_CONFIG_FILE: &str = "/etc/ppp/routes.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No config data found in {}, or file is not readable", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No config data found in {}, or file is not readable", .path.display())]
    Empty { path: PathBuf },
    #[error("Cannot parse json data in {}", .path.display())]
    Unparseable {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid data contained in {}, expected an object, found {found}", .path.display())]
    NotAnObject { path: PathBuf, found: JsonKind },
    #[error("No remotes specified in {}, treating config as empty", .path.display())]
    MissingRemotes { path: PathBuf },
}

/// The type of a JSON value, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Boolean,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonKind::Null => "null",
            JsonKind::Boolean => "boolean",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// Top-level keys we care about. Anything else is ignored.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    remotes: Option<Value>,
}

/// Routes configured for one remote: a list of blocks, or a lone block
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RouteEntry {
    List(Vec<NetworkBlock>),
    Single(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NetworkBlock {
    Text(String),
    Number(serde_json::Number),
}

impl From<NetworkBlock> for String {
    fn from(block: NetworkBlock) -> Self {
        match block {
            NetworkBlock::Text(s) => s,
            NetworkBlock::Number(n) => n.to_string(),
        }
    }
}

/// The `remotes` table, checked for shape when loaded
#[derive(Debug, Clone, PartialEq)]
enum Remotes {
    Table(Map<String, Value>),
    Invalid(JsonKind),
}

impl From<Value> for Remotes {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Remotes::Table(map),
            other => Remotes::Invalid(JsonKind::of(&other)),
        }
    }
}

/// Result of looking up the remote IP in the routing table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLookup {
    /// Network blocks to route, in configured order
    Routes(Vec<String>),
    /// The remote is not listed
    NotConfigured,
    /// `remotes` is not an object
    InvalidRemotes(JsonKind),
    /// The remote is listed but its value is not a list of blocks
    InvalidEntry(JsonKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutingConfig {
    remotes: Remotes,
}

impl RoutingConfig {
    /// Read and validate the routing table at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse routing table text. `path` is only used in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.is_empty() {
            return Err(ConfigError::Empty {
                path: path.to_path_buf(),
            });
        }

        let stripped = strip_comments(content);
        let root: Value =
            serde_json::from_str(&stripped).map_err(|source| ConfigError::Unparseable {
                path: path.to_path_buf(),
                source,
            })?;

        if !root.is_object() {
            return Err(ConfigError::NotAnObject {
                path: path.to_path_buf(),
                found: JsonKind::of(&root),
            });
        }

        let raw: RawConfig =
            serde_json::from_value(root).map_err(|source| ConfigError::Unparseable {
                path: path.to_path_buf(),
                source,
            })?;

        let remotes = raw.remotes.ok_or_else(|| ConfigError::MissingRemotes {
            path: path.to_path_buf(),
        })?;

        Ok(Self {
            remotes: remotes.into(),
        })
    }

    /// Find the network blocks configured for `remote_ip`
    pub fn lookup(&self, remote_ip: &str) -> RemoteLookup {
        let table = match &self.remotes {
            Remotes::Table(table) => table,
            Remotes::Invalid(kind) => return RemoteLookup::InvalidRemotes(*kind),
        };

        let Some(value) = table.get(remote_ip) else {
            return RemoteLookup::NotConfigured;
        };

        match RouteEntry::deserialize(value) {
            Ok(RouteEntry::List(blocks)) => {
                RemoteLookup::Routes(blocks.into_iter().map(String::from).collect())
            }
            Ok(RouteEntry::Single(block)) => RemoteLookup::Routes(vec![block]),
            Err(e) => {
                debug!("entry for {} rejected: {}", remote_ip, e);
                RemoteLookup::InvalidEntry(JsonKind::of(value))
            }
        }
    }
}

/// Load the routing table, reporting any problem as a warning
///
/// Returns `None` when there is nothing usable to route with.
pub fn load_routes(path: &Path, log: &mut HookLog) -> Option<RoutingConfig> {
    debug!("loading routes from {}", path.display());
    match RoutingConfig::load(path) {
        Ok(config) => Some(config),
        Err(e) => {
            log.warn(e.to_string());
            None
        }
    }
}

/// Remove `//` comments, along with the whitespace in front of them
pub fn strip_comments(content: &str) -> String {
    content
        .split('\n')
        .map(|line| match line.find("//") {
            Some(start) => line[..start].trim_end(),
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
