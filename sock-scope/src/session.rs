//! Session orchestration
//!
//! `bootstrap` wires one instrumentation session together: parse the
//! argument string, register the session in the process-wide context, build
//! one engine per probe source and hand them to the module host, best-effort
//! retransform what was already loaded, install the exit summary hook, and
//! start the log writer. Everything global in spirit lives in an explicitly
//! owned [`AgentContext`] the embedding runtime constructs and passes in.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use dashmap::DashMap;
use log::{debug, info, warn};

use crate::args;
use crate::domain::{Config, Direction, ParseError, SocketDescription};
use crate::host::ModuleHost;
use crate::logwriter::{self, LogWriterHandle};
use crate::probe::ProbeSource;
use crate::rewrite::Instrumenter;
use crate::stats::{LatencySink, SessionStats};
use crate::track::{SocketRegistry, SocketTrack};

/// Process-wide state, explicitly owned by the embedding runtime.
///
/// Registry entries live for the rest of the process; multiple independently
/// configured sessions may coexist.
#[derive(Default)]
pub struct AgentContext {
    workers: DashMap<String, Arc<Session>>,
    finish_by_error: AtomicBool,
    exit_hook_installed: AtomicBool,
}

impl AgentContext {
    pub fn new() -> Arc<Self> {
        Arc::new(AgentContext::default())
    }

    /// Suppress the exit summary; a fatal configuration error already
    /// explained itself.
    pub fn mark_finish_by_error(&self) {
        self.finish_by_error.store(true, Ordering::SeqCst);
    }

    pub fn finished_by_error(&self) -> bool {
        self.finish_by_error.load(Ordering::SeqCst)
    }

    pub fn session(&self, uuid: &str) -> Option<Arc<Session>> {
        self.workers.get(uuid).map(|entry| Arc::clone(&entry))
    }

    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.workers.iter().map(|entry| Arc::clone(&entry)).collect()
    }

    /// Print every live session's summary, unless the process is going down
    /// because of an earlier fatal configuration error. The hook installed by
    /// [`bootstrap`] only covers ctrl-c; embedders that exit in an orderly
    /// way should call this themselves on their shutdown path.
    pub fn print_summaries(&self) {
        for summary in self.summaries() {
            println!("{summary}");
        }
    }

    /// Rendered summaries for every live session. Empty when
    /// [`AgentContext::mark_finish_by_error`] was called.
    pub fn summaries(&self) -> Vec<String> {
        if self.finished_by_error() {
            return Vec::new();
        }
        self.sessions().iter().map(|session| session.summary()).collect()
    }

    fn register(&self, session: &Arc<Session>) {
        if !self.workers.is_empty() {
            warn!("multiple sock-scope sessions are running; this is not well tested");
        }
        let uuid = session.config().uuid.clone();
        if self.workers.insert(uuid.clone(), Arc::clone(session)).is_some() {
            warn!("a session with uuid {uuid} already existed and was replaced");
        }
    }

    // Covers ctrl-c only; a normal process exit does not run it, which is
    // why `print_summaries` is public.
    fn install_exit_hook(self: &Arc<Self>) {
        if self.exit_hook_installed.swap(true, Ordering::SeqCst) {
            return;
        }
        let context = Arc::clone(self);
        if let Err(e) = ctrlc::set_handler(move || {
            context.print_summaries();
            std::process::exit(0);
        }) {
            warn!("could not install exit summary hook: {e}");
        }
    }
}

/// One configured instrumentation session.
#[derive(Debug)]
pub struct Session {
    config: Arc<Config>,
    start_time: Instant,
    i2o: Option<LatencySink>,
    o2i: Option<LatencySink>,
    pub stats: SessionStats,
    sockets: SocketRegistry,
    log_writer: Mutex<Option<LogWriterHandle>>,
}

impl Session {
    fn new(config: Arc<Config>) -> Self {
        Session {
            i2o: config.i2o_enabled.then(LatencySink::new),
            o2i: config.o2i_enabled.then(LatencySink::new),
            config,
            start_time: Instant::now(),
            stats: SessionStats::default(),
            sockets: SocketRegistry::new(),
            log_writer: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    /// The sink for a direction, absent when that direction is disabled.
    pub fn sink(&self, direction: Direction) -> Option<&LatencySink> {
        match direction {
            Direction::I2o => self.i2o.as_ref(),
            Direction::O2i => self.o2i.as_ref(),
        }
    }

    /// Probe entry point: a socket became visible. Returns whether the
    /// session is tracking it (false when the endpoint filter rejects it).
    pub fn socket_opened(&self, id: u64, description: SocketDescription) -> bool {
        if !self.config.matches(&description) {
            debug!("socket {id} ({description:?}) filtered out");
            return false;
        }
        self.sockets.track(id, description);
        self.stats.socket_processed();
        true
    }

    /// Probe entry point: an operation in this direction began on a socket.
    pub fn io_started(&self, id: u64, direction: Direction) {
        if !self.config.direction_enabled(direction) {
            return;
        }
        if let Some(track) = self.sockets.lookup(id) {
            track.begin(direction, Instant::now());
        }
    }

    /// Probe entry point: the operation completed normally; record the pair.
    pub fn io_finished(&self, id: u64, direction: Direction) {
        let Some(sink) = self.sink(direction) else { return };
        if let Some(track) = self.sockets.lookup(id) {
            if let Some((start, stop)) = track.end(direction, Instant::now()) {
                sink.record(start, stop);
            }
        }
    }

    /// Probe entry point: the socket was closed; evict its tracking record.
    pub fn socket_closed(&self, id: u64) {
        self.sockets.release(id);
    }

    pub fn tracked_socket(&self, id: u64) -> Option<Arc<SocketTrack>> {
        self.sockets.lookup(id)
    }

    /// Human-readable configuration + statistics block for shutdown.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str("***************************************************************\n");
        out.push_str("sock-scope configuration:\n");
        out.push_str(&format!("  uuid       {}\n", self.config.uuid));
        out.push_str(&format!(
            "  log files  {}.{}.*\n",
            self.config.log_prefix, self.config.uuid
        ));
        out.push_str("---------------------------------------------------------------\n");
        out.push_str("sock-scope statistics:\n");
        out.push_str(&format!(
            "  {} sockets were processed\n",
            self.stats.processed_sockets()
        ));
        for direction in [Direction::I2o, Direction::O2i] {
            if let Some(sink) = self.sink(direction) {
                out.push_str(&format!("  {} {}\n", direction.as_str(), sink.summary()));
            }
        }
        out.push_str("***************************************************************");
        out
    }

    /// Stop the log writer thread. Registry entries are never removed, but
    /// tests and orderly embedders can stop the background work.
    pub fn stop(&self) {
        if let Some(handle) = self.log_writer.lock().unwrap().take() {
            handle.stop();
        }
    }
}

/// Bootstrap one instrumentation session into the given host.
///
/// # Errors
/// Only argument parsing can fail (including `HelpRequested`); callers on the
/// command-line path print usage and terminate, per-module instrumentation
/// problems later on are logged and swallowed. Embedders that terminate on a
/// parse failure should call [`AgentContext::mark_finish_by_error`] first so
/// the exit summary stays suppressed.
pub fn bootstrap(
    argument_string: &str,
    context: &Arc<AgentContext>,
    host: &Arc<ModuleHost>,
    probe_sources: Vec<Arc<dyn ProbeSource>>,
) -> Result<Arc<Session>, ParseError> {
    let config = Arc::new(args::parse_arguments(argument_string)?);
    let session = Arc::new(Session::new(config));
    context.register(&session);

    for source in probe_sources {
        source.init(&session);
        host.add_rewriter(Arc::new(Instrumenter::new(Arc::clone(&source))));

        // Attach-to-running-process case: the host may refuse individual
        // modules, so this pass is best-effort per module.
        for identity in host.loaded_modules() {
            if source.needs_instrument(&identity) {
                if let Err(e) = host.retransform(&identity) {
                    warn!("could not retransform {identity}: {e}");
                }
            }
        }
    }

    context.install_exit_hook();
    *session.log_writer.lock().unwrap() = Some(logwriter::start(&session));

    info!("sock-scope session {} bootstrapped", session.config().uuid);
    Ok(session)
}
