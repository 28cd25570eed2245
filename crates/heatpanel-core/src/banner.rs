//! Boot / refresh screen showing where the control page can be reached.
//!
//! A QR renderer can be slotted in by implementing [`BannerRenderer`]; the
//! default [`TextBanner`] prints the address as text.

use crate::font;
use crate::pixel::PixelBuffer;
use crate::render::{ACCENT, ALERT, BACKGROUND, MUTED};

/// Renders the "connect here" screen for an IP address.
pub trait BannerRenderer: Send + Sync {
    /// `ip` is `None` when no address could be discovered.
    fn render_ip_banner(&self, ip: Option<&str>) -> PixelBuffer;
}

/// Plain-text IP banner.
#[derive(Debug, Clone)]
pub struct TextBanner {
    width: usize,
    height: usize,
    port: u16,
    title: String,
}

impl TextBanner {
    pub fn new(width: usize, height: usize, port: u16) -> Self {
        Self {
            width,
            height,
            port,
            title: "HEAT PANEL".to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Largest glyph scale (capped at `max`) at which `text` fits the width.
    fn fit_scale(&self, text: &str, max: i64) -> i64 {
        let avail = self.width as i64 - 8;
        (1..=max)
            .rev()
            .find(|&s| font::text_width(text, s) <= avail)
            .unwrap_or(1)
    }
}

impl BannerRenderer for TextBanner {
    fn render_ip_banner(&self, ip: Option<&str>) -> PixelBuffer {
        let mut buf = PixelBuffer::new(self.width, self.height, BACKGROUND);
        let h = self.height as i64;

        let title_scale = self.fit_scale(&self.title, 2);
        font::draw_text_centered(&mut buf, h / 4, &self.title, title_scale, MUTED);

        match ip {
            Some(ip) => {
                let scale = self.fit_scale(ip, 3);
                font::draw_text_centered(&mut buf, h / 2 - 10, ip, scale, ACCENT);
                let url = format!("http://{ip}:{}", self.port);
                let url_scale = self.fit_scale(&url, 2);
                font::draw_text_centered(&mut buf, h / 2 + 20, &url, url_scale, MUTED);
            }
            None => {
                let text = "NO NETWORK";
                let scale = self.fit_scale(text, 2);
                font::draw_text_centered(&mut buf, h / 2 - 7, text, scale, ALERT);
            }
        }
        buf
    }
}
