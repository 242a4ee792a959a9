//! H2 server process supervision: start, readiness, stop.

use crate::config::{ServerConfig, ServerOptions, Timeouts};
use crate::connection::ConnectionInfo;
use crate::error::{H2Error, Result};
use crate::readiness::{ensure_port_free, wait_for_ready};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// JVM exit code after SIGTERM (128 + 15).
const JVM_SIGTERM_EXIT_CODE: i32 = 143;
const SIGTERM: i32 = 15;

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Configured, never started (or the last start failed)
    Constructed,
    Running,
    /// Terminal
    Stopped,
}

#[derive(Debug)]
struct LiveProcess {
    child: Child,
    address: String,
    started_at: Instant,
}

#[derive(Debug)]
enum Lifecycle {
    Constructed,
    Running(LiveProcess),
    Stopped,
}

/// How the server process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub pid: u32,
    pub exit_code: Option<i32>,
    /// Terminating signal (unix only)
    pub signal: Option<i32>,
    /// True when the graceful signal was ignored and the process was killed
    pub forced: bool,
    pub uptime: Duration,
}

impl ShutdownReport {
    fn new(pid: u32, status: ExitStatus, forced: bool, uptime: Duration) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            pid,
            exit_code: status.code(),
            signal,
            forced,
            uptime,
        }
    }

    /// Exited on its own terms: code 0, the JVM's SIGTERM code, or SIGTERM itself.
    pub fn is_clean(&self) -> bool {
        !self.forced
            && (matches!(self.exit_code, Some(0) | Some(JVM_SIGTERM_EXIT_CODE))
                || self.signal == Some(SIGTERM))
    }
}

impl fmt::Display for ShutdownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.exit_code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code)?,
            (None, Some(sig)) => write!(f, "signal {}", sig)?,
            (None, None) => f.write_str("unknown status")?,
        }
        if self.forced {
            f.write_str(" (killed)")?;
        }
        Ok(())
    }
}

/// Supervisor for one H2 server process in PostgreSQL compatibility mode.
///
/// A supervisor runs its server at most once: `Constructed -> Running ->
/// Stopped`. Dropping a running supervisor stops the server.
///
/// ```rust,ignore
/// use h2bridge_server::{H2Server, ServerOptions};
///
/// let mut server = H2Server::new(ServerOptions::new("data/genes.mv.db", "sa", "sa"))?;
/// let rows = server.scoped(|server| {
///     let info = server.connection_info()?;
///     run_queries(&info.to_string())
/// })?;
/// ```
#[derive(Debug)]
pub struct H2Server {
    config: ServerConfig,
    lifecycle: Lifecycle,
}

impl H2Server {
    /// Validate `options` and locate the Java runtime. Does not start anything.
    pub fn new(options: ServerOptions) -> Result<Self> {
        let config = ServerConfig::from_options(options)?;
        debug!(
            "Configured H2 {} for {} (java: {})",
            config.version,
            config.db_file().display(),
            config.java.display()
        );
        Ok(Self {
            config,
            lifecycle: Lifecycle::Constructed,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ServerState {
        match self.lifecycle {
            Lifecycle::Constructed => ServerState::Constructed,
            Lifecycle::Running(_) => ServerState::Running,
            Lifecycle::Stopped => ServerState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Running(_))
    }

    /// Bind address (`host:port`) of the live server.
    pub fn address(&self) -> Option<&str> {
        match &self.lifecycle {
            Lifecycle::Running(live) => Some(&live.address),
            _ => None,
        }
    }

    /// Process id of the live server.
    pub fn pid(&self) -> Option<u32> {
        match &self.lifecycle {
            Lifecycle::Running(live) => Some(live.child.id()),
            _ => None,
        }
    }

    /// Spawn the server and block until it accepts connections.
    ///
    /// The wait is bounded by `timeouts.startup`. On failure the child is
    /// reaped and the supervisor stays in [`ServerState::Constructed`].
    pub fn start(&mut self) -> Result<()> {
        match &self.lifecycle {
            Lifecycle::Constructed => {}
            Lifecycle::Running(live) => return Err(H2Error::AlreadyRunning(live.address.clone())),
            Lifecycle::Stopped => return Err(H2Error::AlreadyStopped),
        }

        if !self.config.jar_exists() {
            return Err(H2Error::JarNotFound(self.config.jar_path.clone()));
        }

        ensure_port_free(&self.config.host, self.config.port, &self.config.timeouts)?;

        let address = self.config.address();
        info!("Spooling up H2 {} server at '{}'", self.config.version, address);

        let mut command = Command::new(&self.config.java);
        command.args(self.config.server_args()).stdin(Stdio::null());
        // Own process group: terminal Ctrl+C reaches the supervisor, not the JVM.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command.spawn().map_err(H2Error::Spawn)?;
        let started_at = Instant::now();

        if let Err(e) = wait_for_ready(
            &mut child,
            &self.config.host,
            self.config.port,
            &self.config.timeouts,
        ) {
            if !matches!(e, H2Error::ServerExited(_)) {
                if let Err(kill_err) = child.kill() {
                    warn!(pid = child.id(), "Failed to kill H2 server after failed start: {}", kill_err);
                }
            }
            if let Err(wait_err) = child.wait() {
                warn!(pid = child.id(), "Failed to reap H2 server after failed start: {}", wait_err);
            }
            return Err(e);
        }

        info!(pid = child.id(), "H2 server ready at '{}'", address);
        self.lifecycle = Lifecycle::Running(LiveProcess {
            child,
            address,
            started_at,
        });
        Ok(())
    }

    /// Terminate the server and wait for it to exit.
    ///
    /// Sends SIGTERM, escalates to a kill after `timeouts.shutdown_grace`, and
    /// fails with [`H2Error::ShutdownTimeout`] if the process is still alive
    /// `timeouts.kill_grace` later. In that case the supervisor stays running
    /// so the stop can be retried.
    pub fn stop(&mut self) -> Result<ShutdownReport> {
        let Lifecycle::Running(live) = &mut self.lifecycle else {
            return Err(H2Error::NotRunning);
        };

        info!("Shutting down the H2 server at '{}'", live.address);
        let report = terminate(&mut live.child, &self.config.timeouts, live.started_at)?;
        info!("Server returned {}", report);

        self.lifecycle = Lifecycle::Stopped;
        Ok(report)
    }

    /// Check, without blocking, whether the server process has exited on its own.
    ///
    /// Returns `Ok(None)` while it is alive. Once it has exited the supervisor
    /// moves to [`ServerState::Stopped`] and the report is returned.
    pub fn try_wait(&mut self) -> Result<Option<ShutdownReport>> {
        let Lifecycle::Running(live) = &mut self.lifecycle else {
            return Err(H2Error::NotRunning);
        };

        let Some(status) = live.child.try_wait()? else {
            return Ok(None);
        };
        let report = ShutdownReport::new(live.child.id(), status, false, live.started_at.elapsed());
        warn!("H2 server at '{}' exited unexpectedly: {}", live.address, report);

        self.lifecycle = Lifecycle::Stopped;
        Ok(Some(report))
    }

    /// Connection descriptor for the running server.
    pub fn connection_info(&self) -> Result<ConnectionInfo> {
        if !self.is_running() {
            return Err(H2Error::NotRunning);
        }
        Ok(ConnectionInfo {
            dbname: self.config.db_name.clone(),
            user: self.config.user.clone(),
            password: self.config.password.clone(),
            host: self.config.host.clone(),
            port: self.config.port,
        })
    }

    /// Start the server and return a guard that stops it when dropped.
    pub fn start_guarded(&mut self) -> Result<ServerGuard<'_>> {
        self.start()?;
        Ok(ServerGuard {
            server: self,
            released: false,
        })
    }

    /// Run `body` against a started server, stopping it on every exit path.
    ///
    /// A failing body wins over a failing stop; the stop error is logged.
    pub fn scoped<T, E, F>(&mut self, body: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&H2Server) -> std::result::Result<T, E>,
        E: From<H2Error>,
    {
        let guard = self.start_guarded()?;
        let outcome = body(&*guard);
        let stopped = guard.stop();

        match (outcome, stopped) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(stop_err)) => Err(stop_err.into()),
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(stop_err)) => {
                warn!("Failed to stop H2 server after scope error: {}", stop_err);
                Err(e)
            }
        }
    }
}

impl fmt::Display for H2Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "H2Server({}, user={}, host={}, port={}, version={})",
            self.config.db_file().display(),
            self.config.user,
            self.config.host,
            self.config.port,
            self.config.version
        )
    }
}

impl Drop for H2Server {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(e) = self.stop() {
                warn!("Failed to stop H2 server on drop: {}", e);
            }
        }
    }
}

/// RAII guard returned by [`H2Server::start_guarded`].
///
/// Derefs to the running [`H2Server`]. Stops the server once, either through
/// [`ServerGuard::stop`] or on drop (including panic unwinding).
pub struct ServerGuard<'a> {
    server: &'a mut H2Server,
    released: bool,
}

impl ServerGuard<'_> {
    /// Stop the server now and return how it exited.
    pub fn stop(mut self) -> Result<ShutdownReport> {
        self.released = true;
        self.server.stop()
    }
}

impl Deref for ServerGuard<'_> {
    type Target = H2Server;

    fn deref(&self) -> &H2Server {
        self.server
    }
}

impl DerefMut for ServerGuard<'_> {
    fn deref_mut(&mut self) -> &mut H2Server {
        self.server
    }
}

impl Drop for ServerGuard<'_> {
    fn drop(&mut self) {
        if self.released || !self.server.is_running() {
            return;
        }
        match self.server.stop() {
            Ok(report) => debug!("Scoped H2 server stopped: {}", report),
            Err(e) => warn!("Failed to stop scoped H2 server: {}", e),
        }
    }
}

fn terminate(child: &mut Child, timeouts: &Timeouts, started_at: Instant) -> Result<ShutdownReport> {
    let pid = child.id();

    if let Some(status) = child.try_wait()? {
        warn!("H2 server (pid {}) had already exited", pid);
        return Ok(ShutdownReport::new(pid, status, false, started_at.elapsed()));
    }

    let forced = !send_terminate(child)?;
    if let Some(status) = wait_with_timeout(child, timeouts.shutdown_grace, timeouts.poll_interval)? {
        return Ok(ShutdownReport::new(pid, status, forced, started_at.elapsed()));
    }

    warn!(
        "H2 server (pid {}) still running {:?} after SIGTERM, killing",
        pid, timeouts.shutdown_grace
    );
    child.kill()?;
    match wait_with_timeout(child, timeouts.kill_grace, timeouts.poll_interval)? {
        Some(status) => Ok(ShutdownReport::new(pid, status, true, started_at.elapsed())),
        None => Err(H2Error::ShutdownTimeout {
            pid,
            waited: timeouts.shutdown_grace + timeouts.kill_grace,
        }),
    }
}

/// Ask the child to exit. Returns false when the only option was a hard kill.
#[cfg(unix)]
fn send_terminate(child: &mut Child) -> Result<bool> {
    let pid = child.id() as libc::pid_t;
    // SAFETY: kill(2) has no memory effects. The child is not reaped yet, so
    // its pid cannot have been reused.
    if unsafe { libc::kill(pid, libc::SIGTERM) } != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err.into());
        }
    }
    Ok(true)
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) -> Result<bool> {
    // No graceful signal outside unix.
    child.kill()?;
    Ok(false)
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        std::thread::sleep(poll_interval.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(exit_code: Option<i32>, signal: Option<i32>, forced: bool) -> ShutdownReport {
        ShutdownReport {
            pid: 42,
            exit_code,
            signal,
            forced,
            uptime: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_clean_shutdowns() {
        assert!(report(Some(0), None, false).is_clean());
        assert!(report(Some(143), None, false).is_clean());
        assert!(report(None, Some(15), false).is_clean());
    }

    #[test]
    fn test_unclean_shutdowns() {
        assert!(!report(Some(1), None, false).is_clean());
        assert!(!report(None, Some(9), true).is_clean());
        assert!(!report(Some(0), None, true).is_clean());
    }

    #[cfg(unix)]
    #[test]
    fn test_terminate_sends_sigterm() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let report = terminate(&mut child, &Timeouts::default(), Instant::now()).unwrap();
        assert!(!report.forced);
        assert_eq!(report.signal, Some(libc::SIGTERM));
        assert!(report.is_clean());
    }

    #[cfg(windows)]
    #[test]
    fn test_terminate_without_signals_is_forced() {
        let mut child = Command::new("cmd")
            .args(["/C", "ping -n 30 127.0.0.1 > NUL"])
            .spawn()
            .unwrap();
        let report = terminate(&mut child, &Timeouts::default(), Instant::now()).unwrap();
        assert!(report.forced);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_report_display() {
        assert_eq!(report(Some(143), None, false).to_string(), "exit code 143");
        assert_eq!(report(None, Some(9), true).to_string(), "signal 9 (killed)");
    }
}
