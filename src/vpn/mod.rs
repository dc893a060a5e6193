//! VPN route management

pub mod routing;

pub use routing::{RouteInstaller, RoutingError};
