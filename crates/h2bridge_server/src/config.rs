//! Server options and the validated configuration derived from them.

use crate::db_path::{split_db_path, DB_FILE_SUFFIX};
use crate::error::Result;
use crate::runtime::find_java;
use crate::version::{default_jar_dir, resolve_version, H2Version};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Default host for the PG listener.
pub const DEFAULT_HOST: &str = "localhost";

/// Default PG port.
pub const DEFAULT_PORT: u16 = 65435;

/// Bounds for the blocking phases of the server lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// How long `start` waits for the port to accept connections
    pub startup: Duration,
    /// Interval between readiness probes and exit checks
    pub poll_interval: Duration,
    /// How long `stop` waits after the graceful signal
    pub shutdown_grace: Duration,
    /// How long `stop` waits after a forced kill
    pub kill_grace: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            startup: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
            shutdown_grace: Duration::from_secs(10),
            kill_grace: Duration::from_secs(5),
        }
    }
}

/// Caller-supplied options for an [`crate::H2Server`].
///
/// ```rust,ignore
/// let options = ServerOptions::new("data/genes.mv.db", "sa", "sa")
///     .with_port(15435)
///     .with_version("2.1.214");
/// ```
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub db_path: PathBuf,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Requested engine version; unsupported values fall back to the default
    pub version: String,
    /// Java executable; looked up on PATH when `None`
    pub java: Option<PathBuf>,
    /// Directory holding `h2-<version>.jar`; see [`default_jar_dir`]
    pub jar_dir: Option<PathBuf>,
    pub timeouts: Timeouts,
}

impl ServerOptions {
    /// Options with the default host, port and version.
    pub fn new(db_path: impl Into<PathBuf>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            user: user.into(),
            password: password.into(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            version: H2Version::DEFAULT.to_string(),
            java: None,
            jar_dir: None,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_java(mut self, java: impl Into<PathBuf>) -> Self {
        self.java = Some(java.into());
        self
    }

    pub fn with_jar_dir(mut self, jar_dir: impl Into<PathBuf>) -> Self {
        self.jar_dir = Some(jar_dir.into());
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

/// Validated, immutable server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory passed to H2 as `-baseDir`
    pub db_dir: PathBuf,
    /// Database name (file name without `.mv.db`)
    pub db_name: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub version: H2Version,
    pub java: PathBuf,
    pub jar_path: PathBuf,
    pub timeouts: Timeouts,
}

impl ServerConfig {
    /// Validate `options`.
    ///
    /// Checks run in order: database path, version, Java runtime. An
    /// unsupported version logs a warning and uses [`H2Version::DEFAULT`].
    pub fn from_options(options: ServerOptions) -> Result<Self> {
        let (db_dir, db_name) = split_db_path(&options.db_path)?;

        let resolved = resolve_version(&options.version);
        if resolved.fell_back {
            warn!(
                "H2 version `{}` not supported. Falling back to {}",
                options.version, resolved.version
            );
        }

        let java = find_java(options.java.as_deref())?;

        let jar_dir = options.jar_dir.unwrap_or_else(default_jar_dir);
        let jar_path = resolved.version.jar_path(&jar_dir);

        Ok(Self {
            db_dir,
            db_name,
            user: options.user,
            password: options.password,
            host: options.host,
            port: options.port,
            version: resolved.version,
            java,
            jar_path,
            timeouts: options.timeouts,
        })
    }

    /// Bind address as `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Full path of the database file, with the `.mv.db` suffix.
    pub fn db_file(&self) -> PathBuf {
        self.db_dir.join(format!("{}{}", self.db_name, DB_FILE_SUFFIX))
    }

    /// Arguments passed to the Java executable.
    pub fn server_args(&self) -> Vec<String> {
        vec![
            "-cp".to_string(),
            self.jar_path.display().to_string(),
            "org.h2.tools.Server".to_string(),
            "-pg".to_string(),
            "-baseDir".to_string(),
            self.db_dir.display().to_string(),
            "-pgPort".to_string(),
            self.port.to_string(),
        ]
    }

    pub fn jar_exists(&self) -> bool {
        self.jar_path.is_file()
    }
}
