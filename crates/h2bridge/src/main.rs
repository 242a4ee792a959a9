//! h2bridge launcher
//!
//! Serves an H2 database file over H2's PostgreSQL compatibility listener:
//! - **serve**: run the server until SIGINT/SIGTERM
//! - **query**: start, run one SQL statement, print the rows, stop
//! - **check**: report the Java runtime and the available H2 jars

use anyhow::Result;
use clap::{Parser, Subcommand};
use h2bridge_logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

mod cli;

use cli::ServerArgs;

#[derive(Parser, Debug)]
#[command(name = "h2bridge", version, about = "Run H2 databases behind a PostgreSQL-compatible server")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the server and keep it running until interrupted
    Serve {
        #[command(flatten)]
        server: ServerArgs,

        /// Print the connection descriptor as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the server, run a read query and print the rows
    Query {
        #[command(flatten)]
        server: ServerArgs,

        /// SQL statement to execute
        sql: String,

        /// Print at most this many rows
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Check for a Java runtime and the bundled H2 jars
    Check {
        /// Java executable to check instead of searching PATH
        #[arg(long, env = "H2BRIDGE_JAVA")]
        java: Option<PathBuf>,

        /// Directory holding h2-<version>.jar files
        #[arg(long, env = "H2BRIDGE_JAR_DIR")]
        jar_dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Serve { server, json } => cli::serve::run(server, json),
        Commands::Query { server, sql, limit } => cli::query::run(server, &sql, limit),
        Commands::Check {
            java,
            jar_dir,
            json,
        } => cli::check::run(java, jar_dir, json),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_guard = match init_logging(LogConfig {
        app_name: "h2bridge",
        verbose: cli.verbose,
    }) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: failed to initialize logging: {:#}", e);
            None
        }
    };

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The console layer already shows errors once logging is up.
            if log_guard.is_some() {
                error!("{:#}", e);
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}
