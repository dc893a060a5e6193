//! Route installation for split-tunnel VPN
//!
//! Adds one route per configured network block, in order, through the pppd
//! interface. The first failing command aborts the run; routes added before
//! it are left in place.

use crate::log::HookLog;
use crate::platform::RoutingManager;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("route add failed for {network} with exit status {code}")]
    CommandFailed { network: String, code: i32 },
}

impl RoutingError {
    /// Status the hook should exit with
    pub fn exit_code(&self) -> i32 {
        match self {
            RoutingError::CommandFailed { code, .. } => *code,
        }
    }
}

pub struct RouteInstaller<'a> {
    manager: &'a dyn RoutingManager,
    interface: String,
}

impl<'a> RouteInstaller<'a> {
    pub fn new(manager: &'a dyn RoutingManager, interface: impl Into<String>) -> Self {
        Self {
            manager,
            interface: interface.into(),
        }
    }

    /// Route every block through the interface. Returns the number added.
    pub fn set_routes<S: AsRef<str>>(
        &self,
        log: &mut HookLog,
        networks: &[S],
    ) -> Result<usize, RoutingError> {
        for (added, network) in networks.iter().enumerate() {
            let network = network.as_ref();
            log.log_message(format!(
                "Exec: {}",
                self.manager.command_line(network, &self.interface)
            ));

            let code = match self.manager.add_network_route(network, &self.interface) {
                Ok(outcome) => {
                    let output = outcome.output.trim_end_matches('\n');
                    if !output.is_empty() {
                        log.log_message(output);
                    }
                    outcome.code
                }
                Err(e) => {
                    log.log_message(e.to_string());
                    e.exit_code()
                }
            };

            if code != 0 {
                debug!("{} of {} routes added before failure", added, networks.len());
                log.err("ABORT: route add failed, see log for details");
                return Err(RoutingError::CommandFailed {
                    network: network.to_string(),
                    code,
                });
            }

            info!("Route added: {} via {}", network, self.interface);
        }

        Ok(networks.len())
    }
}
