//! Stateless styling primitives for report elements.
//!
//! Each function draws one element at the canvas cursor using the report's
//! fixed palette and leaves the cursor below it. Text is passed through
//! [`metrics::normalize_text`] so it can be shown with the standard fonts.

use super::metrics;
use super::surface::{Font, RectMm, Rgb, Surface};
use super::{Align, Canvas, CellStyle, TextStyle};
use crate::error::Md2PdfError;

// ── Palette ──────────────────────────────────────────────────────────────

pub const ACCENT: Rgb = Rgb(8, 145, 178);
pub const BODY_COLOR: Rgb = Rgb(51, 51, 51);
pub const MUTED: Rgb = Rgb(100, 100, 100);
pub const FAINT: Rgb = Rgb(150, 150, 150);
pub const RULE_COLOR: Rgb = Rgb(200, 200, 200);
pub const PANEL: Rgb = Rgb(248, 249, 250);

pub const BANNER_TITLE: TextStyle = TextStyle::new(Font::HelveticaBold, 28.0, ACCENT);
pub const BANNER_TAGLINE: TextStyle = TextStyle::new(Font::Helvetica, 14.0, MUTED);
pub const FOOTER: TextStyle = TextStyle::new(Font::Helvetica, 8.0, FAINT);
pub const BODY: TextStyle = TextStyle::new(Font::Helvetica, 10.0, BODY_COLOR);
pub const CLOSING: TextStyle = TextStyle::new(Font::HelveticaOblique, 9.0, FAINT);
const TABLE_HEADER: TextStyle = TextStyle::new(Font::HelveticaBold, 9.0, Rgb::WHITE);
const TABLE_BODY: TextStyle = TextStyle::new(Font::Helvetica, 9.0, BODY_COLOR);
const CAPTION: TextStyle = TextStyle::new(Font::HelveticaOblique, 9.0, MUTED);
const HINT: TextStyle = TextStyle::new(Font::Helvetica, 7.0, MUTED);

/// Maximum characters shown per table cell.
pub const TABLE_CELL_CHARS: usize = 30;
const TABLE_ROW_MM: f32 = 7.0;
const TABLE_BORDER: (Rgb, f32) = (RULE_COLOR, 0.2);

const CODE_ROW_MM: f32 = 4.0;
const CODE_SIZE_PT: f32 = 8.0;

/// Left edge of list items before indentation.
const LIST_X_MM: f32 = 15.0;
const LIST_INDENT_MM: f32 = 5.0;

const PLACEHOLDER_H_MM: f32 = 40.0;
const PLACEHOLDER_ADVANCE_MM: f32 = 45.0;

/// Per-level heading style and the space inserted above it.
struct HeadingStyle {
    text: TextStyle,
    space_before: f32,
}

const HEADINGS: [HeadingStyle; 4] = [
    HeadingStyle {
        text: TextStyle::new(Font::HelveticaBold, 16.0, ACCENT),
        space_before: 8.0,
    },
    HeadingStyle {
        text: TextStyle::new(Font::HelveticaBold, 14.0, Rgb(14, 116, 144)),
        space_before: 6.0,
    },
    HeadingStyle {
        text: TextStyle::new(Font::HelveticaBold, 12.0, Rgb(21, 94, 117)),
        space_before: 4.0,
    },
    HeadingStyle {
        text: TextStyle::new(Font::HelveticaBold, 11.0, Rgb(30, 58, 95)),
        space_before: 3.0,
    },
];

/// Background and text colour of a monospace block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodePalette {
    pub fill: Rgb,
    pub text: Rgb,
}

impl CodePalette {
    /// Dark panel for source code.
    pub const SOURCE: CodePalette = CodePalette {
        fill: Rgb(30, 30, 30),
        text: Rgb(212, 212, 212),
    };
    /// Blue-grey panel for data-definition (SQL) blocks.
    pub const DATA_DEFINITION: CodePalette = CodePalette {
        fill: Rgb(40, 44, 52),
        text: Rgb(212, 212, 212),
    };
    /// Light panel for unlabelled or unknown blocks.
    pub const PLAIN: CodePalette = CodePalette {
        fill: Rgb(245, 246, 248),
        text: BODY_COLOR,
    };
}

// ── Text elements ────────────────────────────────────────────────────────

/// Heading of `level` 1–4 (values above 4 use the level-4 style).
/// Level 1 gets an accent rule underneath.
pub fn heading<S: Surface>(
    c: &mut Canvas<S>,
    level: u8,
    text: &str,
) -> Result<(), Md2PdfError> {
    let idx = usize::from(level.clamp(1, 4)) - 1;
    let style = &HEADINGS[idx];
    c.ln(style.space_before);
    c.multi_cell(0.0, 7.0, &metrics::normalize_text(text), &style.text)?;
    if idx == 0 {
        c.hline(ACCENT, 0.5)?;
        c.ln(3.0);
    }
    c.ln(2.0);
    Ok(())
}

pub fn paragraph<S: Surface>(c: &mut Canvas<S>, text: &str) -> Result<(), Md2PdfError> {
    c.multi_cell(0.0, 5.0, &metrics::normalize_text(text), &BODY)?;
    c.ln(2.0);
    Ok(())
}

/// Bullet item; `indent` shifts it right by 5 mm per level.
pub fn bullet<S: Surface>(c: &mut Canvas<S>, text: &str, indent: u8) -> Result<(), Md2PdfError> {
    c.set_x(LIST_X_MM + LIST_INDENT_MM * f32::from(indent));
    c.multi_cell(0.0, 5.0, &format!("- {}", metrics::normalize_text(text)), &BODY)
}

/// Bullet item carrying a `[x]` / `[ ]` marker.
pub fn checkbox<S: Surface>(
    c: &mut Canvas<S>,
    checked: bool,
    text: &str,
) -> Result<(), Md2PdfError> {
    let marker = if checked { "[x]" } else { "[ ]" };
    bullet(c, &format!("{marker} {text}"), 0)
}

pub fn numbered<S: Surface>(
    c: &mut Canvas<S>,
    number: &str,
    text: &str,
) -> Result<(), Md2PdfError> {
    c.set_x(LIST_X_MM);
    c.multi_cell(
        0.0,
        5.0,
        &format!("{number}. {}", metrics::normalize_text(text)),
        &BODY,
    )
}

/// Thin grey horizontal rule with space above and below.
pub fn rule<S: Surface>(c: &mut Canvas<S>) -> Result<(), Md2PdfError> {
    c.ln(3.0);
    c.hline(RULE_COLOR, 0.3)?;
    c.ln(5.0);
    Ok(())
}

/// Centered italic note after the last element.
pub fn closing_note<S: Surface>(c: &mut Canvas<S>, text: &str) -> Result<(), Md2PdfError> {
    c.ln(10.0);
    let cell = CellStyle {
        align: Align::Center,
        ..CellStyle::default()
    };
    c.cell(0.0, 10.0, &metrics::normalize_text(text), &CLOSING, cell)?;
    c.ln(10.0);
    Ok(())
}

// ── Blocks ───────────────────────────────────────────────────────────────

/// Bordered table; the first row is the header.
///
/// Every row divides the content width evenly between its own cells.
pub fn table<S: Surface>(c: &mut Canvas<S>, rows: &[Vec<String>]) -> Result<(), Md2PdfError> {
    for (idx, row) in rows.iter().enumerate() {
        if row.is_empty() {
            continue;
        }
        let header = idx == 0;
        let col_w = c.geometry().content_width() / row.len() as f32;
        let (style, fill) = if header {
            (&TABLE_HEADER, Some(ACCENT))
        } else {
            (&TABLE_BODY, None)
        };
        let cell = CellStyle {
            align: Align::Left,
            fill,
            border: Some(TABLE_BORDER),
        };
        for text in row {
            let shown: String = metrics::normalize_text(text.trim())
                .chars()
                .take(TABLE_CELL_CHARS)
                .collect();
            c.cell(col_w, TABLE_ROW_MM, &shown, style, cell)?;
        }
        c.ln(TABLE_ROW_MM);
    }
    c.ln(3.0);
    Ok(())
}

/// Monospace block: one filled 4 mm row per line, then 3 mm of space.
/// Lines are drawn as given; truncation happens upstream.
pub fn code_block<S: Surface>(
    c: &mut Canvas<S>,
    lines: &[String],
    palette: CodePalette,
) -> Result<(), Md2PdfError> {
    let style = TextStyle::new(Font::Courier, CODE_SIZE_PT, palette.text);
    let cell = CellStyle {
        align: Align::Left,
        fill: Some(palette.fill),
        border: None,
    };
    for line in lines {
        c.cell(
            0.0,
            CODE_ROW_MM,
            &format!("  {}", metrics::normalize_text(line)),
            &style,
            cell,
        )?;
        c.ln(CODE_ROW_MM);
    }
    c.ln(3.0);
    Ok(())
}

/// Light bordered box standing in for a diagram that could not be drawn.
pub fn placeholder<S: Surface>(
    c: &mut Canvas<S>,
    caption: &str,
    hint: &str,
) -> Result<(), Md2PdfError> {
    c.ensure_space(PLACEHOLDER_H_MM)?;
    let x = c.geometry().margin_left_mm;
    let w = c.geometry().content_width();
    let top = c.y();
    c.rect(
        RectMm {
            x,
            y: top,
            w,
            h: PLACEHOLDER_H_MM,
        },
        Some(PANEL),
        Some((RULE_COLOR, 0.2)),
    )?;

    let centered = CellStyle {
        align: Align::Center,
        ..CellStyle::default()
    };
    c.ln(5.0);
    c.cell(w, 5.0, &metrics::normalize_text(caption), &CAPTION, centered)?;
    c.ln(10.0);
    c.cell(w, 5.0, &metrics::normalize_text(hint), &HINT, centered)?;

    let remaining = top + PLACEHOLDER_ADVANCE_MM - c.y();
    c.ln(remaining);
    Ok(())
}
