//! Subcommand implementations.

pub mod check;
pub mod query;
pub mod serve;

use clap::Args;
use h2bridge_server::config::{DEFAULT_HOST, DEFAULT_PORT};
use h2bridge_server::{H2Version, ServerOptions, Timeouts};
use std::path::PathBuf;
use std::time::Duration;

/// Options shared by every command that launches a server.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// H2 database file (the `.mv.db` suffix is optional)
    #[arg(long, env = "H2BRIDGE_DB")]
    pub db: PathBuf,

    /// Database user
    #[arg(short = 'u', long, env = "H2BRIDGE_USER", default_value = "sa")]
    pub user: String,

    /// Database password
    #[arg(long, env = "H2BRIDGE_PASSWORD", default_value = "sa", hide_env_values = true)]
    pub password: String,

    /// Host clients connect to
    #[arg(long, env = "H2BRIDGE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// PostgreSQL listener port
    #[arg(short = 'p', long, env = "H2BRIDGE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// H2 engine version; unsupported values fall back to the default
    #[arg(long = "h2-version", env = "H2BRIDGE_H2_VERSION", default_value_t = H2Version::DEFAULT.to_string())]
    pub h2_version: String,

    /// Java executable (defaults to `java` on PATH, then JAVA_HOME)
    #[arg(long, env = "H2BRIDGE_JAVA")]
    pub java: Option<PathBuf>,

    /// Directory holding h2-<version>.jar files
    #[arg(long, env = "H2BRIDGE_JAR_DIR")]
    pub jar_dir: Option<PathBuf>,

    /// Seconds to wait for the server to accept connections
    #[arg(long, default_value_t = 30)]
    pub startup_timeout_secs: u64,
}

impl ServerArgs {
    pub fn into_options(self) -> ServerOptions {
        let timeouts = Timeouts {
            startup: Duration::from_secs(self.startup_timeout_secs),
            ..Timeouts::default()
        };

        let mut options = ServerOptions::new(self.db, self.user, self.password)
            .with_host(self.host)
            .with_port(self.port)
            .with_version(self.h2_version)
            .with_timeouts(timeouts);
        if let Some(java) = self.java {
            options = options.with_java(java);
        }
        if let Some(jar_dir) = self.jar_dir {
            options = options.with_jar_dir(jar_dir);
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        server: ServerArgs,
    }

    #[test]
    fn test_defaults_match_library() {
        let args = Harness::parse_from(["h2bridge", "--db", "genes.mv.db"]).server;
        let options = args.into_options();

        assert_eq!(options.db_path, PathBuf::from("genes.mv.db"));
        assert_eq!(options.user, "sa");
        assert_eq!(options.password, "sa");
        assert_eq!(options.host, DEFAULT_HOST);
        assert_eq!(options.port, DEFAULT_PORT);
        assert_eq!(options.version, "1.4.200");
        assert_eq!(options.java, None);
        assert_eq!(options.timeouts.startup, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let args = Harness::parse_from([
            "h2bridge",
            "--db",
            "/data/genes",
            "-u",
            "reader",
            "--password",
            "pw",
            "-p",
            "15435",
            "--h2-version",
            "2.1.214",
            "--java",
            "/opt/jdk/bin/java",
            "--jar-dir",
            "/opt/h2",
            "--startup-timeout-secs",
            "5",
        ])
        .server;
        let options = args.into_options();

        assert_eq!(options.user, "reader");
        assert_eq!(options.password, "pw");
        assert_eq!(options.port, 15435);
        assert_eq!(options.version, "2.1.214");
        assert_eq!(options.java, Some(PathBuf::from("/opt/jdk/bin/java")));
        assert_eq!(options.jar_dir, Some(PathBuf::from("/opt/h2")));
        assert_eq!(options.timeouts.startup, Duration::from_secs(5));
    }
}
