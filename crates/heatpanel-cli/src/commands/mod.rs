pub mod config;
pub mod probe;
pub mod render;
pub mod run;

use heatpanel_core::{
    Config, FrameTransport, FramebufferTransport, NullTransport, TerminalTransport, TransportError,
};

/// Load the config file if one was given, otherwise the defaults.
/// Exits the process on error.
pub fn load_config(path: Option<&str>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };
    match Config::load(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Which frame sink to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    Null,
    Terminal,
    Framebuffer(String),
}

/// Parse a `--transport` value: `null`, `terminal`, or `fb:<path>`.
pub fn parse_transport(s: &str) -> Result<TransportKind, String> {
    let s = s.trim();
    if let Some(path) = s.strip_prefix("fb:") {
        if path.is_empty() {
            return Err("fb: needs a device path, e.g. fb:/dev/fb1".to_string());
        }
        return Ok(TransportKind::Framebuffer(path.to_string()));
    }
    match s.to_lowercase().as_str() {
        "null" | "none" => Ok(TransportKind::Null),
        "terminal" | "term" => Ok(TransportKind::Terminal),
        other => Err(format!(
            "unknown transport '{other}' (expected null, terminal or fb:<path>)"
        )),
    }
}

/// Terminal cells are roughly twice as tall as wide and each shows two pixel
/// rows, so one cell per `step` pixels keeps a 240 px panel inside 80 columns.
const TERMINAL_STEP: usize = 3;

pub fn open_transport(
    kind: &TransportKind,
    width: usize,
    height: usize,
) -> Result<Box<dyn FrameTransport>, TransportError> {
    let transport: Box<dyn FrameTransport> = match kind {
        TransportKind::Null => Box::new(NullTransport),
        TransportKind::Terminal => Box::new(TerminalTransport::stdout(TERMINAL_STEP)),
        TransportKind::Framebuffer(path) => {
            Box::new(FramebufferTransport::open(path, width, height)?)
        }
    };
    Ok(transport)
}
