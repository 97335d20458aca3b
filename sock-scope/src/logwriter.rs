//! Periodic latency report writer
//!
//! Runs on its own thread, independent of the instrumentation path. Honors
//! the configured start delay and working-time window, then appends one
//! summary line per enabled direction each interval. The thread stops when
//! the session drops its shutdown sender; there is no guarantee a final
//! report gets written if the process dies mid-interval.

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::warn;

use crate::domain::Direction;
use crate::session::Session;

#[derive(Debug)]
pub struct LogWriterHandle {
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
}

impl LogWriterHandle {
    pub fn stop(self) {
        drop(self.shutdown);
        let _ = self.thread.join();
    }
}

pub fn start(session: &Arc<Session>) -> LogWriterHandle {
    let (shutdown, shutdown_rx) = bounded::<()>(0);
    let session = Arc::clone(session);
    let thread = std::thread::spawn(move || run(&session, &shutdown_rx));
    LogWriterHandle { shutdown, thread }
}

fn run(session: &Session, shutdown: &Receiver<()>) {
    let config = session.config();

    if !config.start_delaying.is_zero()
        && shutdown.recv_timeout(config.start_delaying) != Err(RecvTimeoutError::Timeout)
    {
        return;
    }

    let started = Instant::now();
    loop {
        match shutdown.recv_timeout(config.log_writer_interval) {
            Err(RecvTimeoutError::Timeout) => {}
            _ => return,
        }
        // Write before checking the window, so a working time of exactly one
        // interval still produces its report.
        write_reports(session);
        if !config.working_time.is_zero() && started.elapsed() >= config.working_time {
            return;
        }
    }
}

fn write_reports(session: &Session) {
    let config = session.config();
    for direction in [Direction::I2o, Direction::O2i] {
        let Some(sink) = session.sink(direction) else { continue };
        let path =
            format!("{}.{}.{}.log", config.log_prefix, config.uuid, direction.as_str());
        if let Err(e) = append_line(&path, &sink.summary()) {
            warn!("could not write latency report to {path}: {e}");
        }
    }
}

fn append_line(path: &str, summary: &str) -> std::io::Result<()> {
    let epoch_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{epoch_ms} {summary}")
}
