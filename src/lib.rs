//! ppp-split-routes - split-tunnel routing hook for pppd VPN links on macOS
//!
//! When a PPP-based VPN comes up, pppd runs `/etc/ppp/ip-up`. This crate
//! provides that hook: it looks up the VPN server's address in
//! `/etc/ppp/routes.json` and routes only the listed networks through the new
//! interface, leaving all other traffic on the normal network.
//!
//! # Architecture
//!
//! - `log`: Connection log file plus stderr warnings
//! - `config`: routes.json parsing (JSON with `//` comments)
//! - `platform`: route(8) invocation
//! - `vpn`: Ordered route installation
//! - `ppp`: pppd argument handling and the hook itself
//!
//! # Configuration
//!
//! ```json
//! { "remotes": {
//!     "1.2.3.4": [ "9.8.7" ]
//! }}
//! ```
//!
//! routes the class C block 9.8.7 through the VPN whose server is 1.2.3.4.

pub mod config;
pub mod log;
pub mod platform;
pub mod ppp;
pub mod vpn;

pub use config::RoutingConfig;
pub use log::HookLog;
pub use ppp::handle_ip_up;
