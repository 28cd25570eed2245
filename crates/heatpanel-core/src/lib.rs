//! # heatpanel-core
//!
//! Render-and-coordination engine for a small SPI pixel display showing the
//! heat equation decaying in real time.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use heatpanel_core::{
//!     CaptureTransport, Coordinator, RenderLoop, RenderLoopConfig, SharedTransport, Shutdown,
//!     StatusCell,
//! };
//!
//! let coordinator = Arc::new(Coordinator::default());
//! let status = Arc::new(StatusCell::default());
//! let capture = CaptureTransport::new();
//! let shutdown = Arc::new(Shutdown::new());
//!
//! let render = RenderLoop::new(
//!     RenderLoopConfig::default(),
//!     Arc::clone(&coordinator),
//!     status,
//!     SharedTransport::new(Box::new(capture.clone())),
//! )
//! .spawn(Arc::clone(&shutdown))
//! .unwrap();
//!
//! shutdown.trigger();
//! let stats = render.join().unwrap();
//! println!("{} frames rendered", stats.frames);
//! ```
//!
//! ## Architecture
//!
//! Control API → [`Coordinator`] → [`RenderLoop`] → [`field`] → [`render`] → transport
//!
//! The [`NetworkMonitor`] publishes a [`NetworkStatus`] into a [`StatusCell`]
//! that the renderer overlays, and asks the render loop to re-show the IP
//! banner through a channel of [`DisplayNotice`]s.

pub mod banner;
pub mod config;
pub mod coordinator;
pub mod field;
pub mod font;
pub mod monitor;
pub mod params;
pub mod pixel;
pub mod render;
pub mod render_loop;
pub mod transport;

pub use banner::{BannerRenderer, TextBanner};
pub use config::{Config, ConfigError, DisplayConfig};
pub use coordinator::{Coordinator, Shutdown, StatusCell};
pub use field::{FieldSample, evaluate, peak_amplitude};
pub use monitor::{
    DisplayNotice, MonitorConfig, NetworkMonitor, NetworkStatus, Prober, TcpProber, local_ip,
};
pub use params::{Mode, ParameterError, ParameterUpdate, SimulationParameters};
pub use pixel::{PixelBuffer, Rgb};
pub use render::FrameRenderer;
pub use render_loop::{LoopState, RenderHandle, RenderLoop, RenderLoopConfig, SimulationClock, TickStats};
pub use transport::{
    CaptureTransport, FrameTransport, FramebufferTransport, NullTransport, SharedTransport,
    TerminalTransport, TransportError,
};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
