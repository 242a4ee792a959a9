//! Readiness polling for a freshly spawned server.

use crate::config::Timeouts;
use crate::error::{H2Error, Result};
use std::net::{TcpStream, ToSocketAddrs};
use std::process::Child;
use std::time::{Duration, Instant};
use tracing::debug;

/// Check if a TCP port is accepting connections.
///
/// Every resolved address is tried once with `timeout`. Resolution
/// failures count as "not ready".
pub fn probe_port(host: &str, port: u16, timeout: Duration) -> bool {
    let addrs = match (host, port).to_socket_addrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            debug!("Cannot resolve {}:{}: {}", host, port, e);
            return false;
        }
    };
    addrs
        .into_iter()
        .any(|addr| TcpStream::connect_timeout(&addr, timeout).is_ok())
}

/// Wait until the server accepts connections on `host:port`.
///
/// Fails with [`H2Error::ServerExited`] as soon as the child exits, and with
/// [`H2Error::ReadinessTimeout`] once `timeouts.startup` has elapsed. The
/// child is left running in the timeout case; the caller owns cleanup.
///
/// A successful probe only counts while the child is still alive; the caller
/// is expected to have checked that the port was free before spawning.
pub fn wait_for_ready(child: &mut Child, host: &str, port: u16, timeouts: &Timeouts) -> Result<()> {
    let start = Instant::now();
    let probe_timeout = probe_timeout(timeouts);

    loop {
        if let Some(status) = child.try_wait()? {
            return Err(H2Error::ServerExited(status.to_string()));
        }

        if probe_port(host, port, probe_timeout) {
            if let Some(status) = child.try_wait()? {
                return Err(H2Error::ServerExited(status.to_string()));
            }
            debug!("{}:{} accepting connections after {:?}", host, port, start.elapsed());
            return Ok(());
        }

        let waited = start.elapsed();
        if waited >= timeouts.startup {
            return Err(H2Error::ReadinessTimeout {
                address: format!("{}:{}", host, port),
                waited,
            });
        }

        std::thread::sleep(timeouts.poll_interval.min(timeouts.startup - waited));
    }
}

/// Fail with [`H2Error::PortInUse`] if something already listens on `host:port`.
pub fn ensure_port_free(host: &str, port: u16, timeouts: &Timeouts) -> Result<()> {
    if probe_port(host, port, probe_timeout(timeouts)) {
        return Err(H2Error::PortInUse(format!("{}:{}", host, port)));
    }
    Ok(())
}

fn probe_timeout(timeouts: &Timeouts) -> Duration {
    timeouts.poll_interval.max(Duration::from_millis(50))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn unused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(probe_port("127.0.0.1", port, Duration::from_millis(500)));
    }

    #[test]
    fn test_probe_closed_port() {
        let port = unused_port();
        assert!(!probe_port("127.0.0.1", port, Duration::from_millis(200)));
    }

    #[test]
    fn test_ensure_port_free() {
        let timeouts = Timeouts::default();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let err = ensure_port_free("127.0.0.1", port, &timeouts).unwrap_err();
        assert!(matches!(err, H2Error::PortInUse(ref addr) if *addr == format!("127.0.0.1:{port}")));

        drop(listener);
        ensure_port_free("127.0.0.1", port, &timeouts).unwrap();
    }

    #[cfg(unix)]
    mod child {
        use super::*;
        use std::process::Command;

        fn sh(script: &str) -> Child {
            Command::new("sh").arg("-c").arg(script).spawn().unwrap()
        }

        #[test]
        fn test_dead_child_behind_foreign_listener_is_not_ready() {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let port = listener.local_addr().unwrap().port();
            let mut child = sh("exit 1");
            child.wait().unwrap();

            let err = wait_for_ready(&mut child, "127.0.0.1", port, &Timeouts::default()).unwrap_err();
            assert!(matches!(err, H2Error::ServerExited(_)), "got {err:?}");
        }

        #[test]
        fn test_timeout_does_not_overshoot_poll_interval() {
            let port = unused_port();
            let timeouts = Timeouts {
                startup: Duration::from_millis(100),
                poll_interval: Duration::from_secs(2),
                ..Timeouts::default()
            };
            let mut child = sh("exec sleep 10");

            let started = Instant::now();
            let err = wait_for_ready(&mut child, "127.0.0.1", port, &timeouts).unwrap_err();
            let elapsed = started.elapsed();
            child.kill().unwrap();
            child.wait().unwrap();

            assert!(matches!(err, H2Error::ReadinessTimeout { .. }), "got {err:?}");
            assert!(elapsed < Duration::from_secs(1), "waited {elapsed:?}");
        }
    }
}
