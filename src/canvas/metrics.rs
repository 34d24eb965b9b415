//! Base-14 font metrics, text measurement and word wrapping.
//!
//! The report only uses the standard Helvetica and Courier faces, so their
//! Adobe AFM advance widths for printable ASCII are embedded here. Widths are
//! in 1/1000 em; measurement results are in millimetres.

use super::surface::Font;

const PT_TO_MM: f32 = 25.4 / 72.0;

/// Helvetica advance widths for `' '..='~'`.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold advance widths for `' '..='~'`.
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const COURIER_WIDTH: u16 = 600;

/// Width used for characters outside the embedded tables.
const FALLBACK_WIDTH: u16 = 556;

/// Advance width of `ch` in 1/1000 em.
pub fn char_width(font: Font, ch: char) -> u16 {
    let table = match font {
        Font::Courier => return COURIER_WIDTH,
        // Oblique shares the upright advance widths.
        Font::Helvetica | Font::HelveticaOblique => &HELVETICA,
        Font::HelveticaBold => &HELVETICA_BOLD,
    };
    let code = ch as u32;
    if (32..=126).contains(&code) {
        table[(code - 32) as usize]
    } else {
        FALLBACK_WIDTH
    }
}

/// Width of `text` in millimetres at `size_pt`.
pub fn text_width(text: &str, font: Font, size_pt: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(font, c))).sum();
    units as f32 / 1000.0 * size_pt * PT_TO_MM
}

/// Convert a font size in points to millimetres.
pub fn pt_to_mm(size_pt: f32) -> f32 {
    size_pt * PT_TO_MM
}

/// Break `text` into lines no wider than `max_width` mm.
///
/// Splits on whitespace; a single word wider than the line is hard-broken at
/// character boundaries. Explicit newlines start a new line. Always returns
/// at least one (possibly empty) line.
pub fn wrap(text: &str, font: Font, size_pt: f32, max_width: f32) -> Vec<String> {
    let space = text_width(" ", font, size_pt);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0.0;

        for word in paragraph.split_whitespace() {
            let word_width = text_width(word, font, size_pt);

            if !current.is_empty() && current_width + space + word_width <= max_width {
                current.push(' ');
                current.push_str(word);
                current_width += space + word_width;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if word_width <= max_width {
                current = word.to_string();
                current_width = word_width;
            } else {
                let mut pieces = hard_break(word, font, size_pt, max_width);
                // The last fragment stays open so following words can join it.
                let tail = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
                current_width = text_width(&tail, font, size_pt);
                current = tail;
            }
        }

        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn hard_break(word: &str, font: Font, size_pt: f32, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut width = 0.0;
    for ch in word.chars() {
        let w = f32::from(char_width(font, ch)) / 1000.0 * size_pt * PT_TO_MM;
        if !piece.is_empty() && width + w > max_width {
            pieces.push(std::mem::take(&mut piece));
            width = 0.0;
        }
        piece.push(ch);
        width += w;
    }
    pieces.push(piece);
    pieces
}

/// Map text onto the characters the standard fonts can show.
///
/// Common typographic punctuation is folded to ASCII; anything outside
/// Latin-1 becomes `?`.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{2018}' | '\u{2019}' | '\u{201A}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' => out.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{2022}' | '\u{00B7}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' | '\t' => out.push(' '),
            '\u{2192}' => out.push_str("->"),
            c if (c as u32) < 32 => {}
            c if (c as u32) <= 0xFF => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}
