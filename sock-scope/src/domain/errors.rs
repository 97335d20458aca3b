//! Structured error types for sock-scope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

/// Errors from the argument grammar parser.
///
/// Any of these is fatal to the whole argument string: the binaries print a
/// targeted message plus the full usage text and terminate, so no partial
/// configuration ever reaches the rest of the system. `HelpRequested` is the
/// one successful exit path.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("help requested")]
    HelpRequested,

    #[error("wrong argument format: {0:?}")]
    BadToken(String),

    #[error("argument {key} expects a value")]
    MissingValue { key: String },

    #[error("wrong {keys} format: {value:?} (expected <local port>:<remote addr>:<remote port>)")]
    BadFilterEntry { keys: String, value: String },

    #[error("argument {key} expects a number of milliseconds (got {value:?})")]
    BadNumber { key: String, value: String },

    #[error("argument {key} expects one of i2o, o2i, both (got {value:?})")]
    BadIoMode { key: String, value: String },
}

/// Errors local to rewriting one module. Never escape the engine boundary:
/// the engine logs them and hands back the original bytes.
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("unreadable module bytes: {0}")]
    Module(#[from] serde_json::Error),

    #[error("field declaration must be \"<type> <name>\", got {tokens} token(s): {declaration:?}")]
    BadFieldDeclaration { declaration: String, tokens: usize },
}

/// Errors from the module host's retransformation path.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HostError {
    #[error("module {0} is not loaded")]
    ModuleNotFound(String),

    #[error("module {0} is sealed and cannot be retransformed")]
    Unmodifiable(String),
}

/// Attach-phase failures. Each is reported once with its own message and
/// never retried.
#[derive(Error, Debug)]
pub enum AttachError {
    #[error(
        "process with pid={pid} doesn't exist or does not permit attaching ({reason}). \
         Please ensure that the pid is correct."
    )]
    TargetNotAttachable { pid: i32, reason: String },

    #[error("failed to initialize agent: {0}")]
    AgentInitFailed(String),

    #[error("failed to load agent: {0}")]
    AgentLoadFailed(String),

    #[error(
        "could not determine the agent artifact path. \
         Try adding the command line parameter -agentjarpath=/path/to/agent"
    )]
    NoArtifact,

    #[error("attach is not supported on this platform")]
    Unsupported,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_entry_error_names_the_key() {
        let err = ParseError::BadFilterEntry {
            keys: "-f | filter-entry".to_string(),
            value: "80".to_string(),
        };
        assert!(err.to_string().contains("filter-entry"));
        assert!(err.to_string().contains("80"));
    }

    #[test]
    fn test_attach_error_mentions_pid() {
        let err = AttachError::TargetNotAttachable {
            pid: 4321,
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("4321"));
        assert!(err.to_string().contains("connection refused"));
    }
}
