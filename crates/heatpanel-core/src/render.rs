//! Frame rendering: line plot for 1D fields, heatmap for 2D fields, and the
//! network status overlay.
//!
//! Scaling uses the theoretical peak `|2M/L|` rather than the per-frame
//! min/max, so the picture visibly decays instead of being re-normalised
//! every tick. Values outside the range (or non-finite ones) are clamped.

use crate::field::{FieldSample, peak_amplitude};
use crate::font;
use crate::monitor::NetworkStatus;
use crate::params::{Mode, SimulationParameters};
use crate::pixel::{PixelBuffer, Rgb};

pub const BACKGROUND: Rgb = Rgb(15, 23, 42);
pub const ACCENT: Rgb = Rgb(34, 211, 238);
pub const MUTED: Rgb = Rgb(148, 163, 184);
pub const ALERT: Rgb = Rgb(239, 68, 68);
pub const AXIS: Rgb = Rgb(51, 65, 85);
/// Heatmap end for the most negative value.
pub const COOL: Rgb = Rgb(37, 99, 235);
/// Heatmap end for the most positive value.
pub const WARM: Rgb = Rgb(239, 68, 68);

/// 1D plot title.
pub const TITLE: Rgb = Rgb(255, 255, 255);

const LINE_THICKNESS: i64 = 2;
const BANNER_HEIGHT: i64 = 20;
const TICK_LENGTH: i64 = 3;
const X_TICKS: i64 = 5;
const Y_TICKS: i64 = 4;

/// Room around the 1D plot for the title, tick labels and mode label.
const MARGIN_LEFT: i64 = 36;
const MARGIN_RIGHT: i64 = 8;
const MARGIN_TOP: i64 = 24;
const MARGIN_BOTTOM: i64 = 28;

/// Pixel rectangle the 1D curve is drawn into (inclusive corners).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlotArea {
    left: i64,
    right: i64,
    top: i64,
    bottom: i64,
}

impl PlotArea {
    fn for_display(width: usize, height: usize) -> Self {
        let (w, h) = (width as i64, height as i64);
        let left = MARGIN_LEFT.min(w / 6);
        let top = MARGIN_TOP.min(h / 8);
        Self {
            left,
            right: (w - 1 - MARGIN_RIGHT.min(w / 20)).max(left),
            top,
            bottom: (h - 1 - MARGIN_BOTTOM.min(h / 8)).max(top),
        }
    }

    fn mid(&self) -> i64 {
        (self.top + self.bottom) / 2
    }

    fn half_height(&self) -> f64 {
        (self.bottom - self.top) as f64 / 2.0
    }

    /// Row for a value normalised to `[-1, 1]`.
    fn y_for(&self, v: f64) -> i64 {
        self.mid() - (v * self.half_height()).round() as i64
    }

    /// Column for position `i` of `n` evenly spaced samples.
    fn x_for(&self, i: usize, n: usize) -> i64 {
        if n <= 1 {
            return self.left;
        }
        self.left + (i as f64 * (self.right - self.left) as f64 / (n - 1) as f64).round() as i64
    }
}

/// Maps field samples to pixel buffers of one fixed size.
#[derive(Debug, Clone, Copy)]
pub struct FrameRenderer {
    width: usize,
    height: usize,
}

impl FrameRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Render one frame. Always returns a `width × height` buffer.
    pub fn render(
        &self,
        sample: &FieldSample,
        params: &SimulationParameters,
        status: NetworkStatus,
    ) -> PixelBuffer {
        let mut buf = PixelBuffer::new(self.width, self.height, BACKGROUND);
        let peak = peak_amplitude(params);

        match sample {
            FieldSample::OneD(values) => self.draw_line_plot(&mut buf, values, params, peak),
            FieldSample::TwoD {
                width,
                height,
                values,
            } => self.draw_heatmap(&mut buf, *width, *height, values, peak),
        }

        self.draw_mode_label(&mut buf, params.mode);
        draw_status_overlay(&mut buf, status);
        buf
    }

    /// Evaluate and render in one step (stills, previews).
    pub fn render_at(
        &self,
        params: &SimulationParameters,
        grid_size: usize,
        t: f64,
        status: NetworkStatus,
    ) -> PixelBuffer {
        let sample = crate::field::evaluate(params, self.width, grid_size, t);
        self.render(&sample, params, status)
    }

    fn draw_line_plot(
        &self,
        buf: &mut PixelBuffer,
        values: &[f64],
        params: &SimulationParameters,
        peak: f64,
    ) {
        let area = PlotArea::for_display(self.width, self.height);
        draw_axes(buf, &area, params.length, peak);
        font::draw_text_centered(buf, 8, "1D DIFFUSION", 1, TITLE);

        let n = values.len();
        if n == 0 {
            return;
        }
        let point = |i: usize| (area.x_for(i, n), area.y_for(normalize(values[i], peak)));

        let mut prev = point(0);
        if n == 1 {
            buf.line(prev, prev, LINE_THICKNESS, ACCENT);
        }
        for i in 1..n {
            let next = point(i);
            buf.line(prev, next, LINE_THICKNESS, ACCENT);
            prev = next;
        }
    }

    /// Nearest-neighbour upscale of the grid onto the whole display.
    fn draw_heatmap(&self, buf: &mut PixelBuffer, gw: usize, gh: usize, values: &[f64], peak: f64) {
        if gw == 0 || gh == 0 || values.len() < gw * gh {
            return;
        }
        for py in 0..self.height {
            let gy = py * gh / self.height;
            for px in 0..self.width {
                let gx = px * gw / self.width;
                let color = heat_color(normalize(values[gy * gw + gx], peak));
                buf.put(px as i64, py as i64, color);
            }
        }
    }

    fn draw_mode_label(&self, buf: &mut PixelBuffer, mode: Mode) {
        let y = self.height as i64 - font::GLYPH_HEIGHT - 4;
        font::draw_text(buf, 4, y, mode.label(), 1, MUTED);
    }
}

/// Frame, zero line, and labelled ticks: `0..L` along x, `±peak` along y.
fn draw_axes(buf: &mut PixelBuffer, area: &PlotArea, length: f64, peak: f64) {
    buf.line((area.left, area.mid()), (area.right, area.mid()), 1, AXIS);
    buf.line((area.left, area.top), (area.left, area.bottom), 1, MUTED);
    buf.line((area.left, area.bottom), (area.right, area.bottom), 1, MUTED);

    let label_y = area.bottom + TICK_LENGTH + 2;
    for i in 0..=X_TICKS {
        let x = area.left + (area.right - area.left) * i / X_TICKS;
        buf.line((x, area.bottom), (x, area.bottom + TICK_LENGTH), 1, MUTED);
        let label = tick_label(length * i as f64 / X_TICKS as f64);
        let lx = (x - font::text_width(&label, 1) / 2).max(0);
        font::draw_text(buf, lx, label_y, &label, 1, MUTED);
    }

    for i in 0..=Y_TICKS {
        let frac = 1.0 - 2.0 * i as f64 / Y_TICKS as f64;
        let y = area.y_for(frac);
        buf.line((area.left - TICK_LENGTH, y), (area.left, y), 1, MUTED);
        let label = tick_label(peak * frac);
        let lx = (area.left - TICK_LENGTH - 2 - font::text_width(&label, 1)).max(0);
        font::draw_text(buf, lx, y - font::GLYPH_HEIGHT / 2, &label, 1, MUTED);
    }
}

/// Short axis label: whole numbers from 10 up, one decimal from 1, two
/// below that, scientific notation for tiny magnitudes.
fn tick_label(v: f64) -> String {
    let a = v.abs();
    if v == 0.0 {
        "0".to_string()
    } else if !v.is_finite() {
        format!("{v}")
    } else if a >= 10.0 {
        format!("{}", v.round())
    } else if a >= 1.0 {
        format!("{v:.1}")
    } else if a >= 0.01 {
        format!("{v:.2}")
    } else {
        format!("{v:.0e}")
    }
}

/// Scale `v` by `peak` into `[-1, 1]`. Zero peak or non-finite input gives 0.
pub fn normalize(v: f64, peak: f64) -> f64 {
    if !v.is_finite() || !peak.is_finite() || peak <= 0.0 {
        return 0.0;
    }
    (v / peak).clamp(-1.0, 1.0)
}

/// Two-stop gradient keyed on a normalised value in `[-1, 1]`.
pub fn heat_color(v: f64) -> Rgb {
    COOL.lerp(WARM, (v + 1.0) / 2.0)
}

/// Draw the reconnecting banner; `Connected` leaves the frame untouched.
pub fn draw_status_overlay(buf: &mut PixelBuffer, status: NetworkStatus) {
    if let NetworkStatus::Reconnecting { attempt } = status {
        buf.fill_rect(0, 0, buf.width() as i64, BANNER_HEIGHT, BACKGROUND);
        buf.fill_rect(0, BANNER_HEIGHT - 1, buf.width() as i64, 1, ALERT);
        let text = format!("RECONNECTING ({attempt})");
        let y = (BANNER_HEIGHT - font::GLYPH_HEIGHT) / 2;
        font::draw_text_centered(buf, y, &text, 1, ALERT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::evaluate;

    fn params(mode: Mode, amplitude: f64) -> SimulationParameters {
        SimulationParameters {
            mode,
            length: 1.0,
            amplitude,
            diffusivity: 0.1,
        }
    }

    #[test]
    fn test_output_size_matches_display() {
        let r = FrameRenderer::new(240, 240);
        for mode in [Mode::OneD, Mode::TwoD] {
            let p = params(mode, 1.0);
            let s = evaluate(&p, 240, 49, 0.0);
            let buf = r.render(&s, &p, NetworkStatus::Connected);
            assert_eq!((buf.width(), buf.height()), (240, 240));
        }
    }

    #[test]
    fn test_non_square_display() {
        let r = FrameRenderer::new(320, 170);
        let p = params(Mode::TwoD, 1.0);
        let s = evaluate(&p, 320, 33, 0.0);
        let buf = r.render(&s, &p, NetworkStatus::Connected);
        assert_eq!((buf.width(), buf.height()), (320, 170));
    }

    #[test]
    fn test_normalize_clamps() {
        assert_eq!(normalize(5.0, 1.0), 1.0);
        assert_eq!(normalize(-5.0, 1.0), -1.0);
        assert_eq!(normalize(0.5, 1.0), 0.5);
        assert_eq!(normalize(1.0, 0.0), 0.0);
        assert_eq!(normalize(f64::NAN, 1.0), 0.0);
        assert_eq!(normalize(1.0, f64::INFINITY), 0.0);
    }

    #[test]
    fn test_heat_color_endpoints() {
        assert_eq!(heat_color(1.0), WARM);
        assert_eq!(heat_color(-1.0), COOL);
    }

    /// Column of the curve's crest: the middle of the plot area.
    fn crest_x(area: &PlotArea) -> usize {
        ((area.left + area.right) / 2) as usize
    }

    #[test]
    fn test_1d_peak_drawn_near_top() {
        let r = FrameRenderer::new(240, 240);
        let p = params(Mode::OneD, 1.0);
        let s = evaluate(&p, 240, 49, 0.0);
        let buf = r.render(&s, &p, NetworkStatus::Connected);
        let area = PlotArea::for_display(240, 240);
        let top = area.top as usize;
        let hit = (top.saturating_sub(2)..top + 3).any(|y| buf.get(crest_x(&area), y) == Some(ACCENT));
        assert!(hit, "expected accent pixel near the top of the plot");
    }

    #[test]
    fn test_1d_negative_amplitude_draws_below_axis() {
        let r = FrameRenderer::new(240, 240);
        let p = params(Mode::OneD, -1.0);
        let s = evaluate(&p, 240, 49, 0.0);
        let buf = r.render(&s, &p, NetworkStatus::Connected);
        let area = PlotArea::for_display(240, 240);
        let bottom = area.bottom as usize;
        let hit = (bottom - 3..bottom + 2).any(|y| buf.get(crest_x(&area), y) == Some(ACCENT));
        assert!(hit, "expected accent pixel near the bottom of the plot");
    }

    #[test]
    fn test_zero_amplitude_is_flat() {
        let r = FrameRenderer::new(100, 100);
        let p = params(Mode::OneD, 0.0);
        let s = evaluate(&p, 100, 9, 0.0);
        let buf = r.render(&s, &p, NetworkStatus::Connected);
        let area = PlotArea::for_display(100, 100);
        assert_eq!(buf.get(crest_x(&area), area.mid() as usize), Some(ACCENT));
    }

    #[test]
    fn test_plot_area_fits_display() {
        for (w, h) in [(240, 240), (320, 170), (100, 100), (1, 1)] {
            let a = PlotArea::for_display(w, h);
            assert!(a.left <= a.right && a.right < w as i64);
            assert!(a.top <= a.bottom && a.bottom < h as i64);
        }
        let a = PlotArea::for_display(240, 240);
        assert_eq!((a.left, a.right, a.top, a.bottom), (36, 231, 24, 211));
    }

    #[test]
    fn test_tick_labels() {
        assert_eq!(tick_label(0.0), "0");
        assert_eq!(tick_label(-0.0), "0");
        assert_eq!(tick_label(0.5), "0.50");
        assert_eq!(tick_label(-2.0), "-2.0");
        assert_eq!(tick_label(12.4), "12");
        assert_eq!(tick_label(0.001), "1e-3");
    }

    #[test]
    fn test_1d_has_title_axes_and_labels() {
        let r = FrameRenderer::new(240, 240);
        let p = params(Mode::OneD, 1.0);
        let s = evaluate(&p, 240, 49, 0.0);
        let buf = r.render(&s, &p, NetworkStatus::Connected);
        let area = PlotArea::for_display(240, 240);

        let title = (8..15).any(|y| (0..240).any(|x| buf.get(x, y) == Some(TITLE)));
        assert!(title, "expected the title above the plot");

        // Left axis between the crest line and the zero line.
        let axis_y = ((area.top + area.mid()) / 2 + 5) as usize;
        assert_eq!(buf.get(area.left as usize, axis_y), Some(MUTED));

        // y labels left of the axis, x labels under it.
        let y_labels = (area.top - 4..area.bottom + 4)
            .any(|y| (0..area.left - TICK_LENGTH).any(|x| buf.get(x as usize, y as usize) == Some(MUTED)));
        assert!(y_labels, "expected y tick labels");
        let mut x_label_rows = (area.bottom + TICK_LENGTH + 2)..(area.bottom + TICK_LENGTH + 2 + font::GLYPH_HEIGHT);
        let x_labels = x_label_rows
            .any(|y| (area.right - 20..area.right + 5).any(|x| buf.get(x as usize, y as usize) == Some(MUTED)));
        assert!(x_labels, "expected an x tick label under the right end");
    }

    #[test]
    fn test_2d_has_no_plot_title() {
        let r = FrameRenderer::new(240, 240);
        let p = params(Mode::TwoD, 1.0);
        let s = evaluate(&p, 240, 49, 0.0);
        let buf = r.render(&s, &p, NetworkStatus::Connected);
        assert!((8..15).all(|y| (0..240).all(|x| buf.get(x, y) != Some(TITLE))));
    }

    #[test]
    fn test_heatmap_center_is_warm() {
        let r = FrameRenderer::new(240, 240);
        let p = params(Mode::TwoD, 1.0);
        let s = evaluate(&p, 240, 49, 0.0);
        let buf = r.render(&s, &p, NetworkStatus::Connected);
        assert_eq!(buf.get(120, 120), Some(WARM));
    }

    #[test]
    fn test_heatmap_edges_mid_gradient() {
        let r = FrameRenderer::new(240, 240);
        let p = params(Mode::TwoD, 1.0);
        let s = evaluate(&p, 240, 49, 0.0);
        let buf = r.render(&s, &p, NetworkStatus::Connected);
        // The x = 0 boundary is exactly zero, the midpoint of the gradient.
        assert_eq!(buf.get(0, 120), Some(heat_color(0.0)));
    }

    #[test]
    fn test_reconnecting_banner_drawn() {
        let r = FrameRenderer::new(240, 240);
        let p = params(Mode::TwoD, 1.0);
        let s = evaluate(&p, 240, 49, 0.0);
        let plain = r.render(&s, &p, NetworkStatus::Connected);
        let banner = r.render(&s, &p, NetworkStatus::Reconnecting { attempt: 3 });
        let row = (BANNER_HEIGHT - 1) as usize;
        assert!((0..240).all(|x| banner.get(x, row) == Some(ALERT)));
        assert_ne!(plain.get(0, row), Some(ALERT));
        // Below the banner the frames are identical.
        assert_eq!(plain.get(120, 120), banner.get(120, 120));
    }

    #[test]
    fn test_extreme_values_do_not_panic() {
        let r = FrameRenderer::new(64, 48);
        for &(l, m) in &[(1e-300, 1e300), (1e300, 1e-300), (1e-9, -1e12)] {
            for mode in [Mode::OneD, Mode::TwoD] {
                let p = SimulationParameters {
                    mode,
                    length: l,
                    amplitude: m,
                    diffusivity: 1e-9,
                };
                let s = evaluate(&p, 64, 7, 1.0);
                let buf = r.render(&s, &p, NetworkStatus::Reconnecting { attempt: 99 });
                assert_eq!(buf.pixels().len(), 64 * 48);
            }
        }
    }

    #[test]
    fn test_tiny_display() {
        let r = FrameRenderer::new(1, 1);
        let p = params(Mode::OneD, 1.0);
        let s = evaluate(&p, 1, 1, 0.0);
        let buf = r.render(&s, &p, NetworkStatus::Reconnecting { attempt: 1 });
        assert_eq!(buf.pixels().len(), 1);
    }
}
