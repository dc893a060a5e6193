//! pppd integration module
//!
//! pppd runs `/etc/ppp/ip-up` as root each time a link comes up. Install the
//! `ip-up` binary there:
//!
//! ```bash
//! sudo install -c -m 0755 target/release/ip-up /etc/ppp/ip-up
//! ```

pub mod args;
pub mod hook;

pub use args::{InvocationArgs, Settings};
pub use hook::{handle_ip_up, run, HookError, HookOutcome};
