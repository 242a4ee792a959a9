//! Error types for the server supervisor.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Supervisor operation result type.
pub type Result<T> = std::result::Result<T, H2Error>;

/// Supervisor errors.
#[derive(Error, Debug)]
pub enum H2Error {
    /// The database path does not point to a regular file
    #[error("'{}' does not point to a file", .0.display())]
    InvalidDatabasePath(PathBuf),

    /// No usable Java executable
    #[error("Java executable was not found on the local system: {0}")]
    RuntimeNotFound(String),

    /// The server jar for the selected version is missing
    #[error("H2 server jar not found: {}", .0.display())]
    JarNotFound(PathBuf),

    /// Operation needs a live server process
    #[error("H2 server is not running; call `start` first")]
    NotRunning,

    /// Start called on a running server
    #[error("H2 server is already running at {0}")]
    AlreadyRunning(String),

    /// Something else already accepts connections on the server port
    #[error("Port {0} is already accepting connections; refusing to start")]
    PortInUse(String),

    /// Start called after stop; a supervisor runs at most once
    #[error("H2 server was already stopped; construct a new supervisor to run again")]
    AlreadyStopped,

    /// The child process could not be spawned
    #[error("Failed to spawn H2 server: {0}")]
    Spawn(#[source] std::io::Error),

    /// The child process exited before accepting connections
    #[error("H2 server exited before accepting connections: {0}")]
    ServerExited(String),

    /// The server did not accept connections in time
    #[error("H2 server at {address} not ready after {waited:?}")]
    ReadinessTimeout { address: String, waited: Duration },

    /// The child process refused to exit, even after a forced kill
    #[error("H2 server (pid {pid}) did not exit within {waited:?}")]
    ShutdownTimeout { pid: u32, waited: Duration },

    /// IO error (process control, file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl H2Error {
    /// Create a runtime-not-found error.
    pub fn runtime_not_found(msg: impl Into<String>) -> Self {
        Self::RuntimeNotFound(msg.into())
    }

    /// Whether the error means the server was not (or no longer) running.
    pub fn is_not_running(&self) -> bool {
        matches!(self, Self::NotRunning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_message_names_the_path() {
        let err = H2Error::InvalidDatabasePath(PathBuf::from("/nope/db.mv.db"));
        assert_eq!(err.to_string(), "'/nope/db.mv.db' does not point to a file");
    }

    #[test]
    fn test_is_not_running() {
        assert!(H2Error::NotRunning.is_not_running());
        assert!(!H2Error::AlreadyStopped.is_not_running());
    }
}
