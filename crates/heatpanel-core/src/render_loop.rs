//! Fixed-cadence render loop.
//!
//! Lifecycle is `Idle → Running → Stopped`. While running, every tick takes a
//! consistent parameter snapshot, evaluates the field at the current
//! simulated time, renders, hands the frame to the transport and advances
//! the clock by one tick. A tick that overruns its slot is followed
//! immediately by the next one; missed slots are dropped, never replayed.
//!
//! The simulated clock restarts at zero whenever the coordinator's
//! generation changes, so each new parameter set animates from its initial
//! profile.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::banner::BannerRenderer;
use crate::coordinator::{Coordinator, Shutdown, StatusCell};
use crate::field;
use crate::monitor::{self, DisplayNotice};
use crate::pixel::PixelBuffer;
use crate::render::{FrameRenderer, draw_status_overlay};
use crate::transport::SharedTransport;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderLoopConfig {
    pub width: usize,
    pub height: usize,
    pub grid_size: usize,
    pub tick_interval: Duration,
    /// Simulated seconds per wall-clock second.
    pub time_scale: f64,
    /// How long the IP banner stays up at start and after a refresh notice.
    pub ip_banner: Duration,
}

impl Default for RenderLoopConfig {
    fn default() -> Self {
        Self {
            width: 240,
            height: 240,
            grid_size: 49,
            tick_interval: Duration::from_millis(50),
            time_scale: 1.0,
            ip_banner: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// Simulated time since the last parameter change, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationClock {
    elapsed: f64,
}

impl SimulationClock {
    pub fn seconds(&self) -> f64 {
        self.elapsed
    }

    pub fn advance(&mut self, dt: f64) {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub frames: u64,
    pub banner_frames: u64,
    pub send_failures: u64,
    pub panics: u64,
    pub overruns: u64,
}

type IpSource = Arc<dyn Fn() -> Option<String> + Send + Sync>;

pub struct RenderLoop {
    config: RenderLoopConfig,
    renderer: FrameRenderer,
    coordinator: Arc<Coordinator>,
    status: Arc<StatusCell>,
    transport: SharedTransport,
    banner: Option<Arc<dyn BannerRenderer>>,
    ip_source: IpSource,
    notices: Option<Receiver<DisplayNotice>>,
    state: Arc<Mutex<LoopState>>,
    clock: SimulationClock,
    generation: Option<u64>,
    banner_frame: Option<PixelBuffer>,
    banner_until: Option<Instant>,
    failing: bool,
    stats: TickStats,
}

impl RenderLoop {
    pub fn new(
        config: RenderLoopConfig,
        coordinator: Arc<Coordinator>,
        status: Arc<StatusCell>,
        transport: SharedTransport,
    ) -> Self {
        let renderer = FrameRenderer::new(config.width, config.height);
        Self {
            config,
            renderer,
            coordinator,
            status,
            transport,
            banner: None,
            ip_source: Arc::new(monitor::local_ip),
            notices: None,
            state: Arc::new(Mutex::new(LoopState::Idle)),
            clock: SimulationClock::default(),
            generation: None,
            banner_frame: None,
            banner_until: None,
            failing: false,
            stats: TickStats::default(),
        }
    }

    /// Enable the IP banner at start and on [`DisplayNotice::ShowIp`].
    pub fn with_banner(mut self, banner: Arc<dyn BannerRenderer>) -> Self {
        self.banner = Some(banner);
        self
    }

    pub fn with_notices(mut self, rx: Receiver<DisplayNotice>) -> Self {
        self.notices = Some(rx);
        self
    }

    /// Replace the IP discovery function (defaults to [`monitor::local_ip`]).
    pub fn with_ip_source(mut self, f: impl Fn() -> Option<String> + Send + Sync + 'static) -> Self {
        let source: IpSource = Arc::new(f);
        self.ip_source = source;
        self
    }

    pub fn state(&self) -> LoopState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clock(&self) -> SimulationClock {
        self.clock
    }

    pub fn stats(&self) -> TickStats {
        self.stats
    }

    /// Returns `false` (and changes nothing) for a disallowed transition.
    fn transition(&self, to: LoopState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let allowed = matches!(
            (*state, to),
            (LoopState::Idle, LoopState::Running) | (LoopState::Running, LoopState::Stopped)
        );
        if allowed {
            *state = to;
        } else {
            log::debug!("ignored render loop transition {:?} -> {to:?}", *state);
        }
        allowed
    }

    /// Put the IP banner up for the configured duration starting at `now`.
    pub fn show_ip_banner(&mut self, now: Instant) {
        let Some(banner) = &self.banner else {
            return;
        };
        if self.config.ip_banner.is_zero() {
            return;
        }
        let ip = (self.ip_source)();
        match &ip {
            Some(ip) => log::info!("showing control address http://{ip}"),
            None => log::info!("no IP address available"),
        }
        self.banner_frame = Some(banner.render_ip_banner(ip.as_deref()));
        self.banner_until = Some(now + self.config.ip_banner);
    }

    fn banner_active(&mut self, now: Instant) -> bool {
        match self.banner_until {
            Some(until) if now < until => true,
            Some(_) => {
                self.banner_until = None;
                self.banner_frame = None;
                false
            }
            None => false,
        }
    }

    fn drain_notices(&mut self, now: Instant) {
        let mut show = false;
        if let Some(rx) = &self.notices {
            for notice in rx.try_iter() {
                match notice {
                    DisplayNotice::ShowIp => show = true,
                }
            }
        }
        if show {
            self.show_ip_banner(now);
        }
    }

    /// Build the frame for this tick.
    fn compose(&mut self, now: Instant) -> PixelBuffer {
        let status = self.status.get();

        if self.banner_active(now)
            && let Some(banner) = &self.banner_frame
        {
            let mut frame = banner.clone();
            draw_status_overlay(&mut frame, status);
            self.stats.banner_frames += 1;
            return frame;
        }

        let (generation, params) = self.coordinator.versioned();
        if self.generation != Some(generation) {
            if self.generation.is_some() {
                log::debug!(
                    "parameters changed ({} L={} M={} D={}), clock reset",
                    params.mode,
                    params.length,
                    params.amplitude,
                    params.diffusivity
                );
            }
            self.generation = Some(generation);
            self.clock.reset();
        }

        let sample = field::evaluate(
            &params,
            self.config.width,
            self.config.grid_size,
            self.clock.seconds(),
        );
        let frame = self.renderer.render(&sample, &params, status);
        self.clock
            .advance(self.config.tick_interval.as_secs_f64() * self.config.time_scale);
        self.stats.frames += 1;
        frame
    }

    fn dispatch(&mut self, frame: &PixelBuffer) {
        match self.transport.send(frame) {
            Ok(()) => {
                if self.failing {
                    log::info!("display transport recovered");
                    self.failing = false;
                }
            }
            Err(e) => {
                self.stats.send_failures += 1;
                if !self.failing {
                    log::warn!("frame not delivered: {e}");
                    self.failing = true;
                } else {
                    log::debug!("frame not delivered: {e}");
                }
            }
        }
    }

    /// Run one tick. A panic while rendering or sending is logged and
    /// swallowed so the next tick still happens.
    pub fn tick(&mut self, now: Instant) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.drain_notices(now);
            let frame = self.compose(now);
            self.dispatch(&frame);
        }));
        if let Err(payload) = result {
            self.stats.panics += 1;
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("render tick failed: {msg}");
        }
    }

    /// Tick at the configured cadence until `shutdown` is triggered.
    pub fn run(&mut self, shutdown: &Shutdown) -> TickStats {
        if !self.transition(LoopState::Running) {
            log::warn!("render loop is {:?}, not starting", self.state());
            return self.stats;
        }
        log::info!(
            "render loop started ({}x{}, {} ms/tick, transport {})",
            self.config.width,
            self.config.height,
            self.config.tick_interval.as_millis(),
            self.transport.name()
        );
        self.show_ip_banner(Instant::now());

        let interval = self.config.tick_interval;
        let mut deadline = Instant::now();
        while !shutdown.is_triggered() {
            self.tick(Instant::now());

            deadline += interval;
            let now = Instant::now();
            if deadline <= now {
                self.stats.overruns += 1;
                deadline = now;
                continue;
            }
            if shutdown.wait_timeout(deadline - now) {
                break;
            }
        }

        self.transition(LoopState::Stopped);
        log::info!(
            "render loop stopped: {} frames, {} banner, {} send failures, {} overruns",
            self.stats.frames,
            self.stats.banner_frames,
            self.stats.send_failures,
            self.stats.overruns
        );
        self.stats
    }

    /// Run on a dedicated thread.
    pub fn spawn(mut self, shutdown: Arc<Shutdown>) -> std::io::Result<RenderHandle> {
        let state = Arc::clone(&self.state);
        let join = thread::Builder::new()
            .name("render-loop".to_string())
            .spawn(move || self.run(&shutdown))?;
        Ok(RenderHandle { state, join })
    }
}

/// Handle to a spawned render loop.
pub struct RenderHandle {
    state: Arc<Mutex<LoopState>>,
    join: JoinHandle<TickStats>,
}

impl RenderHandle {
    pub fn state(&self) -> LoopState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for the loop to finish and return its counters.
    pub fn join(self) -> std::thread::Result<TickStats> {
        self.join.join()
    }
}
