use std::sync::{Arc, mpsc};
use std::time::Duration;

use heatpanel_core::{
    Config, Coordinator, NetworkMonitor, RenderLoop, SharedTransport, Shutdown, StatusCell,
    TcpProber, TextBanner,
};
use heatpanel_server::AppState;

/// Flags of `heatpanel run`.
pub struct RunOptions {
    pub config: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub transport: String,
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub time_scale: Option<f64>,
    pub no_banner: bool,
}

fn apply_overrides(mut config: Config, opts: &RunOptions) -> Config {
    if let Some(host) = &opts.host {
        config.host = host.clone();
    }
    if let Some(port) = opts.port {
        config.port = port;
    }
    if let Some(w) = opts.width {
        config.display.width = w;
    }
    if let Some(h) = opts.height {
        config.display.height = h;
    }
    if let Some(s) = opts.time_scale {
        config.time_scale = s;
    }
    if opts.no_banner {
        config.ip_banner_secs = 0;
    }
    config
}

pub fn run(opts: RunOptions) {
    let config = apply_overrides(super::load_config(opts.config.as_deref()), &opts);
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let kind = match super::parse_transport(&opts.transport) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let transport = match super::open_transport(&kind, config.display.width, config.display.height)
    {
        Ok(t) => SharedTransport::new(t),
        Err(e) => {
            eprintln!("Error opening display: {e}");
            std::process::exit(1);
        }
    };

    let coordinator = Arc::new(Coordinator::new(config.defaults));
    let status = Arc::new(StatusCell::default());
    let shutdown = Arc::new(Shutdown::new());

    let s = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("interrupt received, shutting down");
        s.trigger();
    }) {
        eprintln!("Error setting Ctrl+C handler: {e}");
        std::process::exit(1);
    }

    let (notice_tx, notice_rx) = mpsc::channel();

    let prober = TcpProber::new(
        config.probe_targets.clone(),
        Duration::from_millis(config.probe_timeout_ms),
    );
    let monitor = NetworkMonitor::new(config.monitor(), Arc::new(prober), Arc::clone(&status))
        .with_notices(notice_tx);

    let banner = TextBanner::new(config.display.width, config.display.height, config.port);
    let render = RenderLoop::new(
        config.render_loop(),
        Arc::clone(&coordinator),
        Arc::clone(&status),
        transport,
    )
    .with_banner(Arc::new(banner))
    .with_notices(notice_rx);

    let monitor_handle = match monitor.spawn(Arc::clone(&shutdown)) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error starting network monitor: {e}");
            std::process::exit(1);
        }
    };
    let render_handle = match render.spawn(Arc::clone(&shutdown)) {
        Ok(h) => h,
        Err(e) => {
            shutdown.trigger();
            let _ = monitor_handle.join();
            eprintln!("Error starting render loop: {e}");
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(
        Arc::clone(&coordinator),
        Arc::clone(&status),
        config.display.width,
        config.display.height,
        config.grid_size,
    ));

    let served = match tokio::runtime::Runtime::new() {
        Ok(rt) => {
            let result = rt.block_on(heatpanel_server::run_server(
                state,
                &config.host,
                config.port,
                Arc::clone(&shutdown),
            ));
            // The graceful-shutdown waiter is a blocking task; release it
            // before the runtime is dropped.
            shutdown.trigger();
            rt.shutdown_timeout(Duration::from_secs(1));
            result
        }
        Err(e) => Err(e),
    };

    let mut failed = false;
    if let Err(e) = served {
        log::error!("control API failed: {e}");
        failed = true;
    }
    shutdown.trigger();

    match render_handle.join() {
        Ok(stats) => log::info!(
            "{} frames rendered ({} banner, {} panics)",
            stats.frames,
            stats.banner_frames,
            stats.panics
        ),
        Err(_) => {
            log::error!("render loop thread panicked");
            failed = true;
        }
    }
    if monitor_handle.join().is_err() {
        log::error!("network monitor thread panicked");
        failed = true;
    }

    if failed {
        std::process::exit(1);
    }
}
