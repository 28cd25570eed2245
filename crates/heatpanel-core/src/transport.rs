//! Display transports: where finished frames go.
//!
//! The panel itself is driven by the kernel (fbtft / `panel-mipi-dbi` expose
//! an ST7789 as a framebuffer device), so the hardware transport only has to
//! write RGB565 pixels to that device. Tests and headless runs use the
//! capture / null / terminal transports instead.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::{cursor, queue, terminal};

use crate::pixel::{PixelBuffer, Rgb};

/// Failure to deliver a frame. Never fatal to the render loop.
#[derive(Debug)]
pub enum TransportError {
    Io(io::Error),
    /// The frame does not match the device geometry.
    SizeMismatch { expected: (usize, usize), got: (usize, usize) },
    Unavailable(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "display I/O error: {e}"),
            Self::SizeMismatch { expected, got } => write!(
                f,
                "frame is {}x{}, display expects {}x{}",
                got.0, got.1, expected.0, expected.1
            ),
            Self::Unavailable(why) => write!(f, "display unavailable: {why}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Sink for finished frames.
///
/// Frames are lent, not given: an implementation copies what it needs and
/// must not keep the buffer past the call.
pub trait FrameTransport: Send {
    fn name(&self) -> &str;
    fn send_frame(&mut self, frame: &PixelBuffer) -> Result<(), TransportError>;
}

/// A transport shared between writers.
///
/// Every write holds the lock for the duration of one frame, so two writers
/// can never interleave partial frames on the wire.
#[derive(Clone)]
pub struct SharedTransport {
    inner: Arc<Mutex<Box<dyn FrameTransport>>>,
}

impl SharedTransport {
    pub fn new(transport: Box<dyn FrameTransport>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
        }
    }

    pub fn send(&self, frame: &PixelBuffer) -> Result<(), TransportError> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.send_frame(frame)
    }

    pub fn name(&self) -> String {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.name().to_string()
    }
}

/// Discards every frame.
#[derive(Debug, Default)]
pub struct NullTransport;

impl FrameTransport for NullTransport {
    fn name(&self) -> &str {
        "null"
    }

    fn send_frame(&mut self, _frame: &PixelBuffer) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Records copies of every frame; optionally fails every send.
#[derive(Debug, Clone, Default)]
pub struct CaptureTransport {
    frames: Arc<Mutex<Vec<PixelBuffer>>>,
    fail: bool,
}

impl CaptureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capture transport whose sends always fail (nothing is recorded).
    pub fn failing() -> Self {
        Self {
            frames: Arc::default(),
            fail: true,
        }
    }

    pub fn frames(&self) -> Vec<PixelBuffer> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn frame_count(&self) -> usize {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn last(&self) -> Option<PixelBuffer> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl FrameTransport for CaptureTransport {
    fn name(&self) -> &str {
        "capture"
    }

    fn send_frame(&mut self, frame: &PixelBuffer) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::Unavailable("capture set to fail".to_string()));
        }
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame.clone());
        Ok(())
    }
}

/// Writes RGB565 frames to a Linux framebuffer device such as `/dev/fb1`.
#[derive(Debug)]
pub struct FramebufferTransport {
    path: PathBuf,
    file: File,
    width: usize,
    height: usize,
}

impl FramebufferTransport {
    pub fn open(path: impl AsRef<Path>, width: usize, height: usize) -> Result<Self, TransportError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().write(true).open(&path)?;
        log::info!("framebuffer {} opened ({width}x{height})", path.display());
        Ok(Self {
            path,
            file,
            width,
            height,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameTransport for FramebufferTransport {
    fn name(&self) -> &str {
        "framebuffer"
    }

    fn send_frame(&mut self, frame: &PixelBuffer) -> Result<(), TransportError> {
        if (frame.width(), frame.height()) != (self.width, self.height) {
            return Err(TransportError::SizeMismatch {
                expected: (self.width, self.height),
                got: (frame.width(), frame.height()),
            });
        }
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&frame.to_rgb565_le())?;
        self.file.flush()?;
        Ok(())
    }
}

/// Truecolor preview in the terminal, two pixels per character cell.
pub struct TerminalTransport<W: Write + Send = io::Stdout> {
    out: W,
    /// Sample every `step`-th pixel in each direction.
    step: usize,
    first: bool,
}

impl TerminalTransport<io::Stdout> {
    pub fn stdout(step: usize) -> Self {
        Self::new(io::stdout(), step)
    }
}

impl<W: Write + Send> TerminalTransport<W> {
    pub fn new(out: W, step: usize) -> Self {
        Self {
            out,
            step: step.max(1),
            first: true,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn term_color(c: Rgb) -> Color {
    Color::Rgb {
        r: c.0,
        g: c.1,
        b: c.2,
    }
}

impl<W: Write + Send> FrameTransport for TerminalTransport<W> {
    fn name(&self) -> &str {
        "terminal"
    }

    fn send_frame(&mut self, frame: &PixelBuffer) -> Result<(), TransportError> {
        if self.first {
            queue!(self.out, terminal::Clear(terminal::ClearType::All))?;
            self.first = false;
        }
        queue!(self.out, cursor::MoveTo(0, 0))?;

        let step = self.step;
        let rows: Vec<usize> = (0..frame.height()).step_by(step).collect();
        for pair in rows.chunks(2) {
            for x in (0..frame.width()).step_by(step) {
                let top = frame.get(x, pair[0]).unwrap_or_default();
                let bottom = pair
                    .get(1)
                    .and_then(|&y| frame.get(x, y))
                    .unwrap_or_default();
                queue!(
                    self.out,
                    SetForegroundColor(term_color(top)),
                    SetBackgroundColor(term_color(bottom)),
                    Print('▀')
                )?;
            }
            queue!(self.out, ResetColor, Print("\r\n"))?;
        }
        self.out.flush()?;
        Ok(())
    }
}
