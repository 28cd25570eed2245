//! 5×7 bitmap font for status text.
//!
//! Glyphs are stored column-major, one byte per column, bit 0 at the top.
//! Covers ASCII 0x20..=0x5A; lowercase letters are folded to uppercase and
//! anything else renders as a space.

use crate::pixel::{PixelBuffer, Rgb};

pub const GLYPH_WIDTH: i64 = 5;
pub const GLYPH_HEIGHT: i64 = 7;
/// Horizontal advance per character, including one column of spacing.
pub const ADVANCE: i64 = GLYPH_WIDTH + 1;

const FIRST: u8 = 0x20;

#[rustfmt::skip]
const FONT_5X7: [[u8; 5]; 59] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00], // '!'
    [0x00, 0x07, 0x00, 0x07, 0x00], // '"'
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // '#'
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // '$'
    [0x23, 0x13, 0x08, 0x64, 0x62], // '%'
    [0x36, 0x49, 0x55, 0x22, 0x50], // '&'
    [0x00, 0x05, 0x03, 0x00, 0x00], // '''
    [0x00, 0x1C, 0x22, 0x41, 0x00], // '('
    [0x00, 0x41, 0x22, 0x1C, 0x00], // ')'
    [0x08, 0x2A, 0x1C, 0x2A, 0x08], // '*'
    [0x08, 0x08, 0x3E, 0x08, 0x08], // '+'
    [0x00, 0x50, 0x30, 0x00, 0x00], // ','
    [0x08, 0x08, 0x08, 0x08, 0x08], // '-'
    [0x00, 0x60, 0x60, 0x00, 0x00], // '.'
    [0x20, 0x10, 0x08, 0x04, 0x02], // '/'
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // '0'
    [0x00, 0x42, 0x7F, 0x40, 0x00], // '1'
    [0x42, 0x61, 0x51, 0x49, 0x46], // '2'
    [0x21, 0x41, 0x45, 0x4B, 0x31], // '3'
    [0x18, 0x14, 0x12, 0x7F, 0x10], // '4'
    [0x27, 0x45, 0x45, 0x45, 0x39], // '5'
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // '6'
    [0x01, 0x71, 0x09, 0x05, 0x03], // '7'
    [0x36, 0x49, 0x49, 0x49, 0x36], // '8'
    [0x06, 0x49, 0x49, 0x29, 0x1E], // '9'
    [0x00, 0x36, 0x36, 0x00, 0x00], // ':'
    [0x00, 0x56, 0x36, 0x00, 0x00], // ';'
    [0x00, 0x08, 0x14, 0x22, 0x41], // '<'
    [0x14, 0x14, 0x14, 0x14, 0x14], // '='
    [0x41, 0x22, 0x14, 0x08, 0x00], // '>'
    [0x02, 0x01, 0x51, 0x09, 0x06], // '?'
    [0x32, 0x49, 0x79, 0x41, 0x3E], // '@'
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // 'A'
    [0x7F, 0x49, 0x49, 0x49, 0x36], // 'B'
    [0x3E, 0x41, 0x41, 0x41, 0x22], // 'C'
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // 'D'
    [0x7F, 0x49, 0x49, 0x49, 0x41], // 'E'
    [0x7F, 0x09, 0x09, 0x01, 0x01], // 'F'
    [0x3E, 0x41, 0x41, 0x51, 0x32], // 'G'
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // 'H'
    [0x00, 0x41, 0x7F, 0x41, 0x00], // 'I'
    [0x20, 0x40, 0x41, 0x3F, 0x01], // 'J'
    [0x7F, 0x08, 0x14, 0x22, 0x41], // 'K'
    [0x7F, 0x40, 0x40, 0x40, 0x40], // 'L'
    [0x7F, 0x02, 0x04, 0x02, 0x7F], // 'M'
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // 'N'
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // 'O'
    [0x7F, 0x09, 0x09, 0x09, 0x06], // 'P'
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // 'Q'
    [0x7F, 0x09, 0x19, 0x29, 0x46], // 'R'
    [0x46, 0x49, 0x49, 0x49, 0x31], // 'S'
    [0x01, 0x01, 0x7F, 0x01, 0x01], // 'T'
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // 'U'
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // 'V'
    [0x7F, 0x20, 0x18, 0x20, 0x7F], // 'W'
    [0x63, 0x14, 0x08, 0x14, 0x63], // 'X'
    [0x03, 0x04, 0x78, 0x04, 0x03], // 'Y'
    [0x61, 0x51, 0x49, 0x45, 0x43], // 'Z'
];

/// Get the glyph for a character.
fn glyph(ch: char) -> &'static [u8; 5] {
    let ch = ch.to_ascii_uppercase();
    let idx = ch as usize;
    if (FIRST as usize..FIRST as usize + FONT_5X7.len()).contains(&idx) {
        &FONT_5X7[idx - FIRST as usize]
    } else {
        &FONT_5X7[0]
    }
}

/// Pixel width of `text` at `scale`.
pub fn text_width(text: &str, scale: i64) -> i64 {
    let n = text.chars().count() as i64;
    if n == 0 {
        return 0;
    }
    (n * ADVANCE - 1) * scale
}

/// Draw `text` with its top-left corner at `(x, y)`.
pub fn draw_text(buf: &mut PixelBuffer, x: i64, y: i64, text: &str, scale: i64, color: Rgb) {
    let scale = scale.max(1);
    let mut cx = x;
    for ch in text.chars() {
        for (col, bits) in glyph(ch).iter().enumerate() {
            for row in 0..GLYPH_HEIGHT {
                if bits & (1 << row) != 0 {
                    buf.fill_rect(cx + col as i64 * scale, y + row * scale, scale, scale, color);
                }
            }
        }
        cx += ADVANCE * scale;
    }
}

/// Draw `text` horizontally centred on the buffer.
pub fn draw_text_centered(buf: &mut PixelBuffer, y: i64, text: &str, scale: i64, color: Rgb) {
    let x = (buf.width() as i64 - text_width(text, scale)) / 2;
    draw_text(buf, x, y, text, scale, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: Rgb = Rgb(0, 0, 0);
    const FG: Rgb = Rgb(255, 255, 255);

    #[test]
    fn test_table_covers_uppercase() {
        assert_eq!(FONT_5X7.len(), (b'Z' - FIRST + 1) as usize);
    }

    #[test]
    fn test_lowercase_folds() {
        assert_eq!(glyph('a'), glyph('A'));
        assert_eq!(glyph('z'), glyph('Z'));
    }

    #[test]
    fn test_unknown_is_space() {
        assert_eq!(glyph('~'), glyph(' '));
        assert_eq!(glyph('é'), glyph(' '));
    }

    #[test]
    fn test_text_width() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("A", 1), 5);
        assert_eq!(text_width("AB", 1), 11);
        assert_eq!(text_width("AB", 3), 33);
    }

    #[test]
    fn test_draw_text_sets_pixels() {
        let mut buf = PixelBuffer::new(40, 10, BG);
        draw_text(&mut buf, 1, 1, "I", 1, FG);
        // 'I' has a full vertical bar in its middle column.
        for row in 0..7 {
            assert_eq!(buf.get(3, 1 + row), Some(FG));
        }
        assert_eq!(buf.get(0, 0), Some(BG));
    }

    #[test]
    fn test_draw_text_clips() {
        let mut buf = PixelBuffer::new(10, 5, BG);
        draw_text_centered(&mut buf, -3, "RECONNECTING", 2, FG);
    }
}
