//! h2bridge server supervisor
//!
//! Runs an H2 database server as a child process in PostgreSQL
//! compatibility mode and hands out connection descriptors for it. The wire
//! protocol is left to an ordinary PG client (`sqlx` behind the `postgres`
//! feature, or anything that accepts a libpq key/value string).
//!
//! # Features
//!
//! - `postgres`: sqlx connect options and pool helpers on [`ConnectionInfo`]
//! - `h2-tests`: end-to-end tests that need Java, the H2 jars and a fixture
//!   database
//!
//! # Usage
//!
//! ```rust,ignore
//! use h2bridge_server::{H2Server, ServerOptions};
//!
//! let mut server = H2Server::new(
//!     ServerOptions::new("test_data/hg19_sv_database.mv.db", "sa", "sa").with_port(15435),
//! )?;
//!
//! let guard = server.start_guarded()?;
//! println!("{}", guard.connection_info()?);
//! // Server stops when `guard` goes out of scope
//! ```

pub mod config;
pub mod connection;
pub mod db_path;
mod error;
pub mod readiness;
pub mod runtime;
mod supervisor;
pub mod version;

pub use config::{ServerConfig, ServerOptions, Timeouts};
pub use connection::ConnectionInfo;
pub use db_path::{split_db_file_name, split_db_path};
pub use error::{H2Error, Result};
pub use runtime::{find_java, is_java_available};
pub use supervisor::{H2Server, ServerGuard, ServerState, ShutdownReport};
pub use version::{discover_jars, resolve_version, DiscoveredJar, H2Version, VersionResolution};
