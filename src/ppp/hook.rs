//! ip-up hook handler
//!
//! 1. Log the connection time and the arguments pppd passed
//! 2. Load the routing table
//! 3. Route the remote's network blocks through the pppd interface
//!
//! # Exit codes
//!
//! - `0`: routes added, or none configured for this remote
//! - `1`: no usable routing table
//! - anything else: the status of the `route` command that failed

use crate::config::{load_routes, RemoteLookup};
use crate::log::HookLog;
use crate::platform::RoutingManager;
use crate::ppp::args::InvocationArgs;
use crate::vpn::routing::{RouteInstaller, RoutingError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum HookError {
    #[error("No usable routing table in {}", .0.display())]
    ConfigUnavailable(PathBuf),
    #[error(transparent)]
    Routing(#[from] RoutingError),
}

impl HookError {
    pub fn exit_code(&self) -> i32 {
        match self {
            HookError::ConfigUnavailable(_) => 1,
            HookError::Routing(e) => e.exit_code(),
        }
    }
}

/// What the hook did for this connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    RoutesAdded(usize),
    NotConfigured,
}

/// Handle a link-up event
pub fn handle_ip_up(
    args: &InvocationArgs,
    config_path: &Path,
    log: &mut HookLog,
    manager: &dyn RoutingManager,
) -> Result<HookOutcome, HookError> {
    log_invocation(args, log);

    let Some(config) = load_routes(config_path, log) else {
        return Err(HookError::ConfigUnavailable(config_path.to_path_buf()));
    };

    let remote_ip = args.remote_ip.as_str();
    let networks = match config.lookup(remote_ip) {
        RemoteLookup::Routes(networks) => networks,
        RemoteLookup::NotConfigured => {
            log.log_message(format!("Notice: No routes configured for remote {}", remote_ip));
            return Ok(HookOutcome::NotConfigured);
        }
        RemoteLookup::InvalidRemotes(kind) => {
            log.warn(format!(
                "Invalid remotes value in routes.json, expected an object, found {}",
                kind
            ));
            log.log_message(format!("Notice: No routes configured for remote {}", remote_ip));
            return Ok(HookOutcome::NotConfigured);
        }
        RemoteLookup::InvalidEntry(kind) => {
            log.warn(format!(
                "Invalid routes for remote {}, expected an array, found {}",
                remote_ip, kind
            ));
            log.log_message(format!("Notice: No routes configured for remote {}", remote_ip));
            return Ok(HookOutcome::NotConfigured);
        }
    };

    debug!("{} networks for {}: {:?}", networks.len(), remote_ip, networks);
    log.log_message(format!("Configuring routes for {}", remote_ip));

    let added = RouteInstaller::new(manager, args.interface.as_str()).set_routes(log, &networks)?;
    Ok(HookOutcome::RoutesAdded(added))
}

/// Same as `handle_ip_up`, reduced to the process exit status
pub fn run(
    args: &InvocationArgs,
    config_path: &Path,
    log: &mut HookLog,
    manager: &dyn RoutingManager,
) -> i32 {
    match handle_ip_up(args, config_path, log, manager) {
        Ok(outcome) => {
            debug!("ip-up finished: {:?}", outcome);
            0
        }
        Err(e) => {
            debug!("ip-up aborted: {}", e);
            e.exit_code()
        }
    }
}

/// Record when the link came up and how we were called, before anything
/// else can fail
fn log_invocation(args: &InvocationArgs, log: &mut HookLog) {
    let now = chrono::Local::now();
    log.log_message(format!("VPN Connection at {}", now.format("%Y-%m-%d %H:%M:%S")));
    log.log_message(format!("System arguments:\n{}", args.dump()));
}
