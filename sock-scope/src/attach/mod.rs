//! Attach support
//!
//! The runtime side listens on a per-pid unix socket; the `sock-scope-attach`
//! tool connects, forwards the agent argument string, and asks for a session
//! to be bootstrapped. The wire format is one JSON message per line in each
//! direction.

pub mod artifact;
pub mod client;
#[cfg(unix)]
pub mod listener;
pub mod protocol;
