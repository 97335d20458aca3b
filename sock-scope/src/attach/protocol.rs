//! Attach wire protocol
//!
//! One request, one response, both as single JSON lines over the unix
//! socket. The socket lives at a well-known per-pid path so the attach tool
//! can find a host by process id alone.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Well-known attach endpoint for a host process.
pub fn socket_path_for(pid: i32) -> PathBuf {
    PathBuf::from(format!("/tmp/.sock-scope-{pid}"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRequest {
    /// Filesystem path of the agent artifact, for validation and diagnostics.
    pub artifact_path: String,
    /// Forwarded agent argument string, in the [`crate::args`] grammar.
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum LoadResponse {
    Loaded,
    /// The agent artifact could not be loaded into the host.
    LoadFailed(String),
    /// The artifact loaded but the session could not be bootstrapped.
    InitFailed(String),
}

pub fn write_message<T: Serialize>(writer: &mut impl Write, message: &T) -> std::io::Result<()> {
    let line = serde_json::to_string(message)?;
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

pub fn read_message<T: for<'de> Deserialize<'de>>(
    reader: &mut impl BufRead,
) -> std::io::Result<T> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(serde_json::from_str(line.trim_end())?)
}
