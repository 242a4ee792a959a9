//! `h2bridge serve`: run the server until interrupted.

use super::ServerArgs;
use anyhow::{bail, Context, Result};
use h2bridge_server::H2Server;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: ServerArgs, json: bool) -> Result<()> {
    let shutdown = install_shutdown_handler()?;

    let mut server = H2Server::new(args.into_options()).context("Invalid server configuration")?;
    info!("Serving {}", server);

    let mut guard = server.start_guarded().context("Failed to start H2 server")?;
    let conn = guard.connection_info()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conn)?);
    } else {
        println!("H2 {} listening on {}", guard.config().version, guard.config().address());
        println!("  {}", conn);
        println!("  {}", conn.to_url().context("Failed to build connection URL")?);
        println!("Press Ctrl+C to stop.");
    }

    while !shutdown.load(Ordering::SeqCst) {
        if let Some(report) = guard.try_wait().context("Failed to poll H2 server")? {
            bail!("H2 server exited unexpectedly ({})", report);
        }
        std::thread::sleep(SHUTDOWN_POLL_INTERVAL);
    }

    let report = guard.stop().context("Failed to stop H2 server")?;
    if !json {
        println!("H2 server stopped: {}", report);
    }
    if !report.is_clean() {
        bail!("H2 server did not shut down cleanly ({})", report);
    }
    Ok(())
}

fn install_shutdown_handler() -> Result<Arc<AtomicBool>> {
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_handler = shutdown_flag.clone();

    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handlers")?;
        std::thread::spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!("Received signal {}, shutting down...", sig);
                shutdown_flag_handler.store(true, Ordering::SeqCst);
            }
        });
    }

    #[cfg(windows)]
    {
        ctrlc::set_handler(move || {
            info!("Received Ctrl+C, shutting down...");
            shutdown_flag_handler.store(true, Ordering::SeqCst);
        })
        .context("Failed to install Ctrl+C handler")?;
    }

    Ok(shutdown_flag)
}
