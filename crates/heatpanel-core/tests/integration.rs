//! Integration tests for heatpanel-core.
//!
//! These drive the engine the way the binary does:
//! control update → coordinator → render loop → fake transport, with the
//! network monitor running against a scripted prober.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use heatpanel_core::render::{ALERT, WARM};
use heatpanel_core::{
    CaptureTransport, Coordinator, LoopState, Mode, MonitorConfig, NetworkMonitor, NetworkStatus,
    ParameterUpdate, Prober, RenderLoop, RenderLoopConfig, SharedTransport, Shutdown,
    SimulationParameters, StatusCell, TextBanner,
};

fn loop_config() -> RenderLoopConfig {
    RenderLoopConfig {
        width: 240,
        height: 240,
        grid_size: 49,
        tick_interval: Duration::from_millis(20),
        time_scale: 1.0,
        ip_banner: Duration::from_millis(60),
    }
}

fn set(coordinator: &Coordinator, body: &str) -> Result<SimulationParameters, String> {
    let update: ParameterUpdate = serde_json::from_str(body).map_err(|e| e.to_string())?;
    coordinator
        .try_update(|current| update.apply(current))
        .map_err(|e| e.to_string())
}

#[test]
fn set_2d_then_tick_renders_warm_center() {
    let coordinator = Arc::new(Coordinator::default());
    let capture = CaptureTransport::new();
    let mut render = RenderLoop::new(
        loop_config(),
        Arc::clone(&coordinator),
        Arc::new(StatusCell::default()),
        SharedTransport::new(Box::new(capture.clone())),
    );

    let accepted = set(&coordinator, r#"{"mode":"2D","L":1.0,"M":1.0,"D":0.1}"#).unwrap();
    assert_eq!(accepted.mode, Mode::TwoD);

    render.tick(Instant::now());
    let frame = capture.last().expect("one frame sent");
    assert_eq!((frame.width(), frame.height()), (240, 240));
    assert_eq!(frame.get(120, 120), Some(WARM));
}

#[test]
fn rejected_set_leaves_snapshot_unchanged() {
    let coordinator = Coordinator::default();
    let before = coordinator.versioned();
    assert!(set(&coordinator, r#"{"mode":"2D","L":0.0,"M":1.0,"D":0.1}"#).is_err());
    assert!(set(&coordinator, r#"{"D":-1.0}"#).is_err());
    assert!(set(&coordinator, r#"{"mode":"3D"}"#).is_err());
    assert_eq!(coordinator.versioned(), before);
}

#[test]
fn frames_decay_between_ticks() {
    let coordinator = Arc::new(Coordinator::new(SimulationParameters {
        mode: Mode::TwoD,
        length: 1.0,
        amplitude: 1.0,
        diffusivity: 5.0,
    }));
    let capture = CaptureTransport::new();
    let mut render = RenderLoop::new(
        RenderLoopConfig {
            tick_interval: Duration::from_millis(100),
            ..loop_config()
        },
        coordinator,
        Arc::new(StatusCell::default()),
        SharedTransport::new(Box::new(capture.clone())),
    );
    let now = Instant::now();
    render.tick(now);
    render.tick(now);
    let frames = capture.frames();
    assert_eq!(frames[0].get(120, 120), Some(WARM));
    assert_ne!(frames[1].get(120, 120), Some(WARM));
}

/// Fails the first `failures` probes, then succeeds.
struct FlakyProber {
    calls: AtomicUsize,
    failures: usize,
}

impl Prober for FlakyProber {
    fn probe(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst) >= self.failures
    }
}

#[test]
fn full_system_runs_and_shuts_down() {
    let coordinator = Arc::new(Coordinator::default());
    let status = Arc::new(StatusCell::default());
    let shutdown = Arc::new(Shutdown::new());
    let capture = CaptureTransport::new();
    let (tx, rx) = mpsc::channel();

    let monitor = NetworkMonitor::new(
        MonitorConfig {
            probe_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_millis(200),
            backoff: vec![Duration::from_millis(20)],
            ip_refresh_every: 0,
        },
        Arc::new(FlakyProber {
            calls: AtomicUsize::new(0),
            failures: 3,
        }),
        Arc::clone(&status),
    )
    .with_notices(tx);

    let render = RenderLoop::new(
        loop_config(),
        Arc::clone(&coordinator),
        Arc::clone(&status),
        SharedTransport::new(Box::new(capture.clone())),
    )
    .with_banner(Arc::new(TextBanner::new(240, 240, 5000)))
    .with_ip_source(|| Some("192.168.0.10".to_string()))
    .with_notices(rx);

    let monitor_handle = monitor.spawn(Arc::clone(&shutdown)).unwrap();
    let render_handle = render.spawn(Arc::clone(&shutdown)).unwrap();

    // Wait for the monitor to recover from its three failed probes.
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut saw_reconnecting = false;
    while Instant::now() < deadline {
        match status.get() {
            NetworkStatus::Reconnecting { .. } => saw_reconnecting = true,
            NetworkStatus::Connected if saw_reconnecting => break,
            NetworkStatus::Connected => {}
        }
        thread::sleep(Duration::from_millis(2));
    }
    assert!(saw_reconnecting);
    assert_eq!(status.get(), NetworkStatus::Connected);

    coordinator.replace(SimulationParameters {
        mode: Mode::TwoD,
        ..Default::default()
    });
    thread::sleep(Duration::from_millis(200));
    assert_eq!(render_handle.state(), LoopState::Running);

    let stop = Instant::now();
    shutdown.trigger();
    let stats = render_handle.join().unwrap();
    monitor_handle.join().unwrap();
    assert!(stop.elapsed() < Duration::from_secs(2));

    assert!(stats.frames > 0);
    assert!(stats.banner_frames > 0);
    assert_eq!(stats.panics, 0);
    assert_eq!(capture.frame_count() as u64, stats.frames + stats.banner_frames);
}

#[test]
fn reconnecting_banner_reaches_the_display() {
    let status = Arc::new(StatusCell::new(NetworkStatus::Reconnecting { attempt: 4 }));
    let capture = CaptureTransport::new();
    let mut render = RenderLoop::new(
        loop_config(),
        Arc::new(Coordinator::default()),
        status,
        SharedTransport::new(Box::new(capture.clone())),
    );
    render.tick(Instant::now());
    let frame = capture.last().unwrap();
    assert!((0..240).all(|x| frame.get(x, 19) == Some(ALERT)));
}
