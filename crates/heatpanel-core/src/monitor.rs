//! Connectivity monitor with a fixed backoff schedule.
//!
//! State machine:
//!
//! ```text
//!   Connected ──probe fails──▶ Reconnecting(1)
//!   Reconnecting(n) ──probe fails──▶ Reconnecting(n+1)
//!   Reconnecting(n) ──probe ok──▶ Connected
//!   Connected ──probe ok──▶ Connected   (every Nth: refresh IP banner)
//! ```
//!
//! While connected the monitor probes every `probe_interval`. While
//! reconnecting it waits `backoff[min(n-1, len-1)]` before retry `n+1`; the
//! last backoff value repeats forever. Every probe runs on a helper thread
//! with a deadline, and a timeout counts as a failed probe.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::coordinator::{Shutdown, StatusCell};

/// Connectivity as seen by the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NetworkStatus {
    #[default]
    Connected,
    /// `attempt` counts failed probes since connectivity was lost (≥ 1).
    Reconnecting { attempt: u32 },
}

impl NetworkStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, NetworkStatus::Connected)
    }
}

impl std::fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
        }
    }
}

/// Messages from the monitor to the render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayNotice {
    /// Show the IP banner again (periodic refresh or connectivity regained).
    ShowIp,
}

/// Reachability check. May block; the monitor bounds it with a timeout.
pub trait Prober: Send + Sync {
    fn probe(&self) -> bool;
}

impl<F> Prober for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn probe(&self) -> bool {
        self()
    }
}

/// Probes by opening a TCP connection to any of a list of well-known hosts.
///
/// All targets are tried at once and the first successful connect wins, so
/// one blackholed target costs no more than `timeout` in total.
#[derive(Debug, Clone)]
pub struct TcpProber {
    targets: Vec<String>,
    timeout: Duration,
}

/// Public DNS resolvers: always listening on TCP/53 and cheap to reach.
pub const DEFAULT_PROBE_TARGETS: &[&str] = &["8.8.8.8:53", "1.1.1.1:53", "9.9.9.9:53"];

impl TcpProber {
    pub fn new(targets: Vec<String>, timeout: Duration) -> Self {
        Self { targets, timeout }
    }

    fn reachable(target: &str, timeout: Duration) -> bool {
        let addrs: Vec<SocketAddr> = match target.to_socket_addrs() {
            Ok(addrs) => addrs.collect(),
            Err(e) => {
                log::debug!("probe target {target} did not resolve: {e}");
                return false;
            }
        };
        addrs
            .iter()
            .any(|addr| TcpStream::connect_timeout(addr, timeout).is_ok())
    }
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new(
            DEFAULT_PROBE_TARGETS.iter().map(|s| s.to_string()).collect(),
            Duration::from_secs(2),
        )
    }
}

impl Prober for TcpProber {
    fn probe(&self) -> bool {
        let deadline = Instant::now() + self.timeout;
        let (tx, rx) = mpsc::channel();
        let mut pending = 0usize;
        for target in &self.targets {
            let tx = tx.clone();
            let target = target.clone();
            let timeout = self.timeout;
            let spawned = thread::Builder::new()
                .name("net-probe-target".to_string())
                .spawn(move || {
                    let _ = tx.send(Self::reachable(&target, timeout));
                });
            match spawned {
                Ok(_) => pending += 1,
                Err(e) => log::warn!("could not start probe thread: {e}"),
            }
        }
        drop(tx);

        while pending > 0 {
            let left = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(left) {
                Ok(true) => return true,
                Ok(false) => pending -= 1,
                Err(_) => return false,
            }
        }
        false
    }
}

/// Local IPv4 address of the default route.
///
/// Connecting a UDP socket sends no packets; it only makes the kernel pick
/// the outbound interface, whose address is then read back.
pub fn local_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let addr = socket.local_addr().ok()?;
    if addr.ip().is_unspecified() {
        return None;
    }
    Some(addr.ip().to_string())
}

/// Timing of the monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Time between probes while connected.
    pub probe_interval: Duration,
    /// Deadline for a single probe.
    pub probe_timeout: Duration,
    /// Waits between retries while reconnecting; the last entry repeats.
    pub backoff: Vec<Duration>,
    /// Refresh the IP banner on every Nth successful probe (0 disables).
    pub ip_refresh_every: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(3),
            backoff: [1, 2, 5, 10, 30, 60]
                .into_iter()
                .map(Duration::from_secs)
                .collect(),
            ip_refresh_every: 10,
        }
    }
}

/// Wait before the probe that follows failed attempt `attempt` (1-based).
pub fn backoff_delay(backoff: &[Duration], attempt: u32) -> Duration {
    match backoff.len() {
        0 => Duration::ZERO,
        len => {
            let idx = (attempt.saturating_sub(1) as usize).min(len - 1);
            backoff[idx]
        }
    }
}

/// The network monitor task.
pub struct NetworkMonitor {
    config: MonitorConfig,
    prober: Arc<dyn Prober>,
    status: Arc<StatusCell>,
    notices: Option<Sender<DisplayNotice>>,
    state: NetworkStatus,
    successes: u32,
}

impl NetworkMonitor {
    /// Starts optimistic (`Connected`); the first probe runs immediately.
    pub fn new(config: MonitorConfig, prober: Arc<dyn Prober>, status: Arc<StatusCell>) -> Self {
        status.set(NetworkStatus::Connected);
        Self {
            config,
            prober,
            status,
            notices: None,
            state: NetworkStatus::Connected,
            successes: 0,
        }
    }

    /// Send [`DisplayNotice`]s to the render loop on this channel.
    pub fn with_notices(mut self, tx: Sender<DisplayNotice>) -> Self {
        self.notices = Some(tx);
        self
    }

    pub fn state(&self) -> NetworkStatus {
        self.state
    }

    /// How long to wait before the next probe in the current state.
    pub fn next_delay(&self) -> Duration {
        match self.state {
            NetworkStatus::Connected => self.config.probe_interval,
            NetworkStatus::Reconnecting { attempt } => backoff_delay(&self.config.backoff, attempt),
        }
    }

    /// Run the prober on a helper thread, giving up after `probe_timeout`.
    fn probe_bounded(&self) -> bool {
        let (tx, rx) = mpsc::channel();
        let prober = Arc::clone(&self.prober);
        let spawned = thread::Builder::new()
            .name("net-probe".to_string())
            .spawn(move || {
                let _ = tx.send(prober.probe());
            });
        if let Err(e) = spawned {
            log::warn!("could not start probe thread: {e}");
            return false;
        }
        match rx.recv_timeout(self.config.probe_timeout) {
            Ok(reachable) => reachable,
            Err(_) => {
                log::debug!("probe timed out after {:?}", self.config.probe_timeout);
                false
            }
        }
    }

    /// Feed one probe result through the state machine and publish the new
    /// status. Returns the notice sent to the render loop, if any.
    pub fn apply(&mut self, reachable: bool) -> Option<DisplayNotice> {
        let prev = self.state;
        let (next, notice) = match (prev, reachable) {
            (NetworkStatus::Connected, true) => {
                self.successes = self.successes.wrapping_add(1);
                let every = self.config.ip_refresh_every;
                let refresh = every > 0 && self.successes % every == 0;
                (NetworkStatus::Connected, refresh.then_some(DisplayNotice::ShowIp))
            }
            (NetworkStatus::Connected, false) => (NetworkStatus::Reconnecting { attempt: 1 }, None),
            (NetworkStatus::Reconnecting { attempt }, false) => (
                NetworkStatus::Reconnecting {
                    attempt: attempt.saturating_add(1),
                },
                None,
            ),
            (NetworkStatus::Reconnecting { .. }, true) => {
                self.successes = 0;
                (NetworkStatus::Connected, Some(DisplayNotice::ShowIp))
            }
        };

        if next != prev {
            match next {
                NetworkStatus::Connected => log::info!("network restored"),
                NetworkStatus::Reconnecting { attempt: 1 } => log::warn!("network lost"),
                NetworkStatus::Reconnecting { attempt } => {
                    log::debug!("network still unreachable (attempt {attempt})")
                }
            }
        }

        self.state = next;
        self.status.set(next);

        if let (Some(notice), Some(tx)) = (notice, &self.notices) {
            // Render loop gone means we are shutting down.
            let _ = tx.send(notice);
        }
        notice
    }

    /// Probe once, advance the state machine, and return the wait until the
    /// next probe.
    pub fn step(&mut self) -> Duration {
        let reachable = self.probe_bounded();
        self.apply(reachable);
        self.next_delay()
    }

    /// Probe until `shutdown` is triggered.
    pub fn run(mut self, shutdown: &Shutdown) {
        log::info!("network monitor started");
        while !shutdown.is_triggered() {
            let delay = self.step();
            if shutdown.wait_timeout(delay) {
                break;
            }
        }
        log::info!("network monitor stopped");
    }

    pub fn spawn(self, shutdown: Arc<Shutdown>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("net-monitor".to_string())
            .spawn(move || self.run(&shutdown))
    }
}
