//! # sock-scope — per-socket I/O latency instrumentation
//!
//! sock-scope measures how long a running program's socket read/write/connect
//! primitives take, broken down by remote endpoint and local port, without
//! the program's source or cooperation beyond a bootstrap hook. The embedding
//! runtime offers every freshly loaded module's bytes to the agent, which
//! rewrites eligible socket-implementation modules to wrap their method
//! bodies with start-timer/stop-timer probes, preserving original semantics
//! and degrading to the unmodified bytes whenever a rewrite fails.
//!
//! ## Pipeline
//!
//! ```text
//! sock-scope-attach ──▶ AttachListener ─┐
//!                                       ▼
//! embedding runtime ──▶ session::bootstrap(args, ctx, host, probe sources)
//!                                       │
//!                    ModuleHost ──▶ Instrumenter ──▶ rewritten modules
//!                                       │
//!     probes ──▶ Session { SocketRegistry, LatencySink } ──▶ log writer
//! ```
//!
//! ## Module structure
//!
//! - [`args`]: the comma-separated `key[=value]` argument grammar
//! - [`domain`]: configuration, endpoint filters, structured errors
//! - [`rewrite`]: the structural module form and the instrumentation engine
//! - [`probe`]: the pluggable probe-source collaborator contract
//! - [`host`]: the module-load interception surface runtimes embed
//! - [`session`]: orchestration, the process-wide context and registry
//! - [`track`] / [`stats`]: per-socket correlation state and latency sinks
//! - [`logwriter`]: periodic report thread
//! - [`attach`]: per-pid unix-socket attach endpoint, client and artifact
//!   resolution

pub mod args;
pub mod attach;
pub mod domain;
pub mod host;
pub mod logwriter;
pub mod probe;
pub mod rewrite;
pub mod session;
pub mod stats;
pub mod track;

pub use domain::{Config, Direction, FilterEntry, SocketDescription};
pub use host::ModuleHost;
pub use probe::ProbeSource;
pub use rewrite::Instrumenter;
pub use session::{bootstrap, AgentContext, Session};
