//! Paginated drawing canvas with a flowing cursor.
//!
//! [`Canvas`] owns a [`Surface`] and tracks the current page and cursor in
//! millimetres from the top-left corner. Every primitive advances the cursor;
//! an element that would cross the bottom break margin starts a new page
//! first. The footer banner is drawn as each page opens, the header banner
//! only on page 1.

pub mod metrics;
pub mod pdfium;
pub mod primitives;
pub mod surface;

use crate::config::{PageGeometry, ReportBranding};
use crate::error::Md2PdfError;
use image::DynamicImage;
use surface::{Font, RectMm, Rgb, Surface};
use tracing::debug;

/// Horizontal padding inside a text cell.
pub const CELL_PADDING_MM: f32 = 1.0;

/// Font, size and colour for a run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: Font,
    pub size_pt: f32,
    pub color: Rgb,
}

impl TextStyle {
    pub const fn new(font: Font, size_pt: f32, color: Rgb) -> Self {
        Self {
            font,
            size_pt,
            color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
}

/// Box decoration for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CellStyle {
    pub align: Align,
    pub fill: Option<Rgb>,
    /// Border colour and line width.
    pub border: Option<(Rgb, f32)>,
}

/// Single-owner paginated canvas.
pub struct Canvas<S: Surface> {
    surface: S,
    geometry: PageGeometry,
    branding: ReportBranding,
    page: usize,
    x: f32,
    y: f32,
}

impl<S: Surface> Canvas<S> {
    /// Wrap `surface`. No page exists until [`Canvas::add_page`] is called.
    pub fn new(surface: S, geometry: PageGeometry, branding: ReportBranding) -> Self {
        Self {
            surface,
            x: geometry.margin_left_mm,
            y: geometry.margin_top_mm,
            geometry,
            branding,
            page: 0,
        }
    }

    /// Current 1-indexed page number (0 before the first page).
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn set_x(&mut self, x: f32) {
        self.x = x;
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Open a new page: footer banner, header banner on page 1, cursor reset.
    pub fn add_page(&mut self) -> Result<(), Md2PdfError> {
        self.surface
            .begin_page(self.geometry.width_mm, self.geometry.height_mm)
            .map_err(|e| self.on_page(e))?;
        self.page += 1;
        self.x = self.geometry.margin_left_mm;
        self.y = self.geometry.margin_top_mm;
        debug!("Opened page {}", self.page);

        self.draw_footer()?;
        if self.page == 1 {
            self.draw_header()?;
        }
        Ok(())
    }

    /// Line break: move down by `h` and return to the left margin.
    pub fn ln(&mut self, h: f32) {
        self.x = self.geometry.margin_left_mm;
        self.y += h;
    }

    /// Break the page if an element of height `h` would not fit below the
    /// cursor. The horizontal position is kept.
    pub fn ensure_space(&mut self, h: f32) -> Result<(), Md2PdfError> {
        let at_top = self.y <= self.geometry.margin_top_mm;
        if self.y + h > self.geometry.page_break_y() && !at_top {
            let x = self.x;
            self.add_page()?;
            self.x = x;
        }
        Ok(())
    }

    /// Draw one cell at the cursor and move right by its width.
    ///
    /// A width of `0` extends the cell to the right margin. The text is
    /// drawn on a single line; callers wrap beforehand.
    pub fn cell(
        &mut self,
        w: f32,
        h: f32,
        text: &str,
        style: &TextStyle,
        cell: CellStyle,
    ) -> Result<(), Md2PdfError> {
        self.ensure_space(h)?;
        let w = self.resolve_width(w);
        let rect = RectMm {
            x: self.x,
            y: self.y,
            w,
            h,
        };
        self.draw_cell(rect, text, style, cell)?;
        self.x += w;
        Ok(())
    }

    /// Draw wrapped text, one `h`-high line at a time, then return to the
    /// left margin below the last line.
    pub fn multi_cell(
        &mut self,
        w: f32,
        h: f32,
        text: &str,
        style: &TextStyle,
    ) -> Result<(), Md2PdfError> {
        let w = self.resolve_width(w);
        let x = self.x;
        let lines = metrics::wrap(
            text,
            style.font,
            style.size_pt,
            w - 2.0 * CELL_PADDING_MM,
        );
        for line in lines {
            self.x = x;
            self.cell(w, h, &line, style, CellStyle::default())?;
            self.y += h;
        }
        self.x = self.geometry.margin_left_mm;
        Ok(())
    }

    /// Draw a line without moving the cursor.
    pub fn line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        color: Rgb,
        width: f32,
    ) -> Result<(), Md2PdfError> {
        self.surface
            .line(from, to, color, width)
            .map_err(|e| self.on_page(e))
    }

    /// Full-width horizontal line at the cursor, margin to margin.
    pub fn hline(&mut self, color: Rgb, width: f32) -> Result<(), Md2PdfError> {
        let y = self.y;
        let (l, r) = (self.geometry.margin_left_mm, self.geometry.content_right());
        self.line((l, y), (r, y), color, width)
    }

    /// Draw a rectangle without moving the cursor.
    pub fn rect(
        &mut self,
        rect: RectMm,
        fill: Option<Rgb>,
        stroke: Option<(Rgb, f32)>,
    ) -> Result<(), Md2PdfError> {
        self.surface
            .rect(rect, fill, stroke)
            .map_err(|e| self.on_page(e))
    }

    /// Place an image at `x` scaled to width `w`, flowing with the cursor.
    ///
    /// Images taller than the usable page height are scaled down to fit.
    /// Returns the placed rectangle.
    pub fn image(&mut self, image: &DynamicImage, x: f32, w: f32) -> Result<RectMm, Md2PdfError> {
        let (iw, ih) = (image.width().max(1) as f32, image.height().max(1) as f32);
        let max_h = self.geometry.page_break_y() - self.geometry.margin_top_mm;
        let mut w = w;
        let mut h = w * ih / iw;
        if h > max_h {
            h = max_h;
            w = h * iw / ih;
        }
        self.ensure_space(h)?;
        let rect = RectMm {
            x,
            y: self.y,
            w,
            h,
        };
        self.surface
            .image(image, rect)
            .map_err(|e| self.on_page(e))?;
        self.y += h;
        Ok(rect)
    }

    /// Serialize the document. Consumes the canvas so it is closed once.
    pub fn finish(self) -> Result<S::Output, Md2PdfError> {
        debug!("Closing canvas after {} page(s)", self.page);
        self.surface.finish()
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn resolve_width(&self, w: f32) -> f32 {
        if w > 0.0 {
            w
        } else {
            (self.geometry.content_right() - self.x).max(0.0)
        }
    }

    fn draw_cell(
        &mut self,
        rect: RectMm,
        text: &str,
        style: &TextStyle,
        cell: CellStyle,
    ) -> Result<(), Md2PdfError> {
        if cell.fill.is_some() || cell.border.is_some() {
            self.rect(rect, cell.fill, cell.border)?;
        }
        if text.is_empty() {
            return Ok(());
        }
        let tx = match cell.align {
            Align::Left => rect.x + CELL_PADDING_MM,
            Align::Center => {
                rect.x + (rect.w - metrics::text_width(text, style.font, style.size_pt)) / 2.0
            }
        };
        let baseline = rect.y + rect.h / 2.0 + 0.3 * metrics::pt_to_mm(style.size_pt);
        self.surface
            .text(tx, baseline, text, style.font, style.size_pt, style.color)
            .map_err(|e| self.on_page(e))
    }

    fn draw_footer(&mut self) -> Result<(), Md2PdfError> {
        let label = format!("{} {}", self.branding.footer_label, self.page);
        let rect = RectMm {
            x: self.geometry.margin_left_mm,
            y: self.geometry.height_mm - self.geometry.footer_offset_mm,
            w: self.geometry.content_width(),
            h: 10.0,
        };
        let cell = CellStyle {
            align: Align::Center,
            ..CellStyle::default()
        };
        self.draw_cell(rect, &label, &primitives::FOOTER, cell)
    }

    fn draw_header(&mut self) -> Result<(), Md2PdfError> {
        let Some(title) = self.branding.title.clone() else {
            return Ok(());
        };
        let centered = CellStyle {
            align: Align::Center,
            ..CellStyle::default()
        };
        let w = self.geometry.content_width();

        self.draw_cell(
            RectMm {
                x: self.x,
                y: self.y,
                w,
                h: 20.0,
            },
            &metrics::normalize_text(&title),
            &primitives::BANNER_TITLE,
            centered,
        )?;
        self.ln(20.0);

        if let Some(tagline) = self.branding.tagline.clone() {
            self.draw_cell(
                RectMm {
                    x: self.x,
                    y: self.y,
                    w,
                    h: 10.0,
                },
                &metrics::normalize_text(&tagline),
                &primitives::BANNER_TAGLINE,
                centered,
            )?;
            self.ln(10.0);
        }

        // The banner rule sits 5 mm below the text, inset from the image margin.
        let rule_y = self.y + 5.0;
        let x1 = self.geometry.image_margin_mm;
        let x2 = self.geometry.width_mm - self.geometry.image_margin_mm - 10.0;
        self.line((x1, rule_y), (x2, rule_y), primitives::ACCENT, 1.0)?;
        self.ln(15.0);
        Ok(())
    }

    fn on_page(&self, e: Md2PdfError) -> Md2PdfError {
        match e {
            Md2PdfError::DrawFailed { detail, .. } => Md2PdfError::DrawFailed {
                page: self.page,
                detail,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::surface::{DrawOp, RecordingSurface};
    use super::*;

    fn canvas(title: Option<&str>) -> Canvas<RecordingSurface> {
        let branding = ReportBranding {
            title: title.map(str::to_string),
            tagline: Some("Field service platform".into()),
            ..ReportBranding::default()
        };
        Canvas::new(RecordingSurface::new(), PageGeometry::a4(), branding)
    }

    const BODY: TextStyle = TextStyle::new(Font::Helvetica, 10.0, Rgb(51, 51, 51));

    fn texts(ops: &[DrawOp]) -> Vec<String> {
        ops.iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_page_gets_footer_and_header() {
        let mut c = canvas(Some("ACME"));
        c.add_page().unwrap();
        assert_eq!(c.y(), 55.0);
        let ops = c.finish().unwrap();
        let t = texts(&ops);
        assert_eq!(t, vec!["Page 1", "ACME", "Field service platform"]);
        assert!(ops.iter().any(|op| matches!(
            op,
            DrawOp::Line { from: (x1, y1), to: (x2, _), .. }
                if *x1 == 20.0 && *y1 == 45.0 && *x2 == 180.0
        )));
    }

    #[test]
    fn no_title_means_no_banner() {
        let mut c = canvas(None);
        c.add_page().unwrap();
        assert_eq!(c.y(), 10.0);
        assert_eq!(texts(&c.finish().unwrap()), vec!["Page 1"]);
    }

    #[test]
    fn cell_breaks_page_when_full() {
        let mut c = canvas(None);
        c.add_page().unwrap();
        c.ln(270.0); // y = 280
        c.cell(0.0, 7.0, "row", &BODY, CellStyle::default()).unwrap();
        assert_eq!(c.page(), 2);
        let ops = c.finish().unwrap();
        assert_eq!(texts(&ops), vec!["Page 1", "Page 2", "row"]);
    }

    #[test]
    fn multi_cell_wraps_and_advances() {
        let mut c = canvas(None);
        c.add_page().unwrap();
        let text = "word ".repeat(80);
        c.multi_cell(0.0, 5.0, text.trim(), &BODY).unwrap();
        let lines = texts(&c.finish().unwrap()).len() - 1;
        assert!(lines > 1);
    }

    #[test]
    fn tall_image_is_scaled_to_page() {
        let mut c = canvas(None);
        c.add_page().unwrap();
        let img = DynamicImage::new_rgb8(100, 1000);
        let rect = c.image(&img, 20.0, 170.0).unwrap();
        assert!(rect.h <= 272.0 + 1e-3);
        assert!(rect.w < 170.0);
    }

    #[test]
    fn image_advances_cursor_by_height() {
        let mut c = canvas(None);
        c.add_page().unwrap();
        let img = DynamicImage::new_rgb8(200, 100);
        let rect = c.image(&img, 20.0, 170.0).unwrap();
        assert_eq!(rect.h, 85.0);
        assert_eq!(c.y(), 95.0);
    }
}
