//! Host-side attach listener
//!
//! An embedding runtime spawns one of these next to its module host. Each
//! accepted connection carries one load request; the listener validates the
//! artifact, bootstraps a session with the forwarded arguments, and answers
//! with a single status line.

use std::io::BufReader;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{info, warn};

use crate::attach::protocol::{self, LoadRequest, LoadResponse};
use crate::host::ModuleHost;
use crate::probe::ProbeSource;
use crate::session::{self, AgentContext};

/// Produces the probe sources each attached session should be wired with.
pub type ProbeSourceFactory = dyn Fn() -> Vec<Arc<dyn ProbeSource>> + Send + Sync;

pub struct AttachListener {
    path: PathBuf,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl AttachListener {
    /// Bind the attach endpoint and serve requests on a background thread.
    ///
    /// # Errors
    /// Fails if the socket path cannot be bound.
    pub fn spawn(
        path: &Path,
        context: Arc<AgentContext>,
        host: Arc<ModuleHost>,
        sources: Arc<ProbeSourceFactory>,
    ) -> std::io::Result<Self> {
        // A stale endpoint from a dead process would block the bind.
        let _ = std::fs::remove_file(path);
        let listener = UnixListener::bind(path)?;
        let running = Arc::new(AtomicBool::new(true));

        let accept_running = Arc::clone(&running);
        let thread = std::thread::spawn(move || {
            for stream in listener.incoming() {
                if !accept_running.load(Ordering::SeqCst) {
                    break;
                }
                match stream {
                    Ok(stream) => handle_client(stream, &context, &host, &sources),
                    Err(e) => {
                        warn!("attach listener accept failed: {e}");
                        break;
                    }
                }
            }
        });

        Ok(AttachListener { path: path.to_path_buf(), running, thread: Some(thread) })
    }

    /// Spawn at the well-known path for this process.
    ///
    /// # Errors
    /// Fails if the socket path cannot be bound.
    pub fn spawn_for_self(
        context: Arc<AgentContext>,
        host: Arc<ModuleHost>,
        sources: Arc<ProbeSourceFactory>,
    ) -> std::io::Result<Self> {
        Self::spawn(&protocol::socket_path_for(std::process::id() as i32), context, host, sources)
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.thread.is_none() {
            return;
        }
        self.running.store(false, Ordering::SeqCst);
        // Wake the accept loop so it observes the flag.
        let _ = UnixStream::connect(&self.path);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        let _ = std::fs::remove_file(&self.path);
    }
}

impl Drop for AttachListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn handle_client(
    stream: UnixStream,
    context: &Arc<AgentContext>,
    host: &Arc<ModuleHost>,
    sources: &Arc<ProbeSourceFactory>,
) {
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(clone) => clone,
        Err(e) => {
            warn!("attach connection unusable: {e}");
            return;
        }
    });
    let request: LoadRequest = match protocol::read_message(&mut reader) {
        Ok(request) => request,
        Err(e) => {
            warn!("malformed attach request: {e}");
            return;
        }
    };

    let response = if !Path::new(&request.artifact_path).exists() {
        LoadResponse::LoadFailed(format!(
            "agent artifact not found at {}",
            request.artifact_path
        ))
    } else {
        match session::bootstrap(&request.arguments, context, host, sources()) {
            Ok(session) => {
                info!(
                    "attach request bootstrapped session {} from {}",
                    session.config().uuid,
                    request.artifact_path
                );
                LoadResponse::Loaded
            }
            Err(e) => {
                // The same configuration error would have been fatal at
                // launch; keep the exit summary suppressed here too.
                context.mark_finish_by_error();
                LoadResponse::InitFailed(e.to_string())
            }
        }
    };

    let mut stream = stream;
    if let Err(e) = protocol::write_message(&mut stream, &response) {
        warn!("could not answer attach request: {e}");
    }
}
