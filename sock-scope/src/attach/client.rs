//! Attach client
//!
//! What the `sock-scope-attach` tool drives: check the target is reachable,
//! connect to its attach endpoint, forward the artifact path and argument
//! string, and translate the outcome into one of the distinct attach-phase
//! errors. None of these failures is retried.

use std::path::Path;

use crate::domain::AttachError;

#[cfg(unix)]
mod imp {
    use std::io::BufReader;
    use std::os::unix::net::UnixStream;
    use std::path::Path;

    use crate::attach::protocol::{self, LoadRequest, LoadResponse};
    use crate::domain::AttachError;

    /// Attach to a host by pid and ask it to load the agent.
    pub fn load_agent(pid: i32, artifact: &Path, arguments: &str) -> Result<(), AttachError> {
        load_agent_at(&protocol::socket_path_for(pid), pid, artifact, arguments)
    }

    /// Same, against an explicit endpoint path.
    pub fn load_agent_at(
        socket_path: &Path,
        pid: i32,
        artifact: &Path,
        arguments: &str,
    ) -> Result<(), AttachError> {
        let not_attachable =
            |e: std::io::Error| AttachError::TargetNotAttachable { pid, reason: e.to_string() };

        let mut stream = UnixStream::connect(socket_path).map_err(not_attachable)?;
        let request = LoadRequest {
            artifact_path: artifact.to_string_lossy().into_owned(),
            arguments: arguments.to_string(),
        };
        protocol::write_message(&mut stream, &request).map_err(not_attachable)?;

        let mut reader = BufReader::new(stream);
        let response: LoadResponse =
            protocol::read_message(&mut reader).map_err(not_attachable)?;
        match response {
            LoadResponse::Loaded => Ok(()),
            LoadResponse::LoadFailed(message) => Err(AttachError::AgentLoadFailed(message)),
            LoadResponse::InitFailed(message) => Err(AttachError::AgentInitFailed(message)),
        }
    }

    /// Cheap preflight: does the target exist and do we have permission to
    /// signal it? Mirrors `kill(pid, 0)` semantics.
    #[allow(unsafe_code)]
    pub fn check_target(pid: i32) -> Result<(), AttachError> {
        if unsafe { libc::kill(pid, 0) } == 0 {
            return Ok(());
        }
        let errno = std::io::Error::last_os_error();
        let reason = match errno.raw_os_error() {
            Some(libc::ESRCH) => "no such process".to_string(),
            Some(libc::EPERM) => "permission denied".to_string(),
            _ => errno.to_string(),
        };
        Err(AttachError::TargetNotAttachable { pid, reason })
    }
}

#[cfg(not(unix))]
mod imp {
    use std::path::Path;

    use crate::domain::AttachError;

    pub fn load_agent(_pid: i32, _artifact: &Path, _arguments: &str) -> Result<(), AttachError> {
        Err(AttachError::Unsupported)
    }

    pub fn check_target(_pid: i32) -> Result<(), AttachError> {
        Err(AttachError::Unsupported)
    }
}

pub use imp::*;

/// Convenience wrapper used by the attach binary.
pub fn attach_and_load(pid: i32, artifact: &Path, arguments: &str) -> Result<(), AttachError> {
    check_target(pid)?;
    load_agent(pid, artifact, arguments)
}
