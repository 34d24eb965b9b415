//! The drawing seam between the canvas and a PDF backend.
//!
//! [`Surface`] takes coordinates in millimetres with a top-left origin; each
//! backend converts to its own space. [`RecordingSurface`] keeps every call
//! as a [`DrawOp`] so layout can be inspected without a PDF engine.

use crate::error::Md2PdfError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// An 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
}

/// The standard faces used by the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Font {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    Courier,
}

/// Axis-aligned rectangle in millimetres, `y` measured from the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectMm {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// A backend that can draw the primitives the canvas needs.
pub trait Surface {
    /// What [`Surface::finish`] produces: PDF bytes, or an op log.
    type Output;

    /// Append a blank page and make it current.
    fn begin_page(&mut self, width_mm: f32, height_mm: f32) -> Result<(), Md2PdfError>;

    /// Draw a single line of text with its baseline at `baseline_mm`.
    fn text(
        &mut self,
        x_mm: f32,
        baseline_mm: f32,
        text: &str,
        font: Font,
        size_pt: f32,
        color: Rgb,
    ) -> Result<(), Md2PdfError>;

    /// Draw a rectangle with an optional fill and an optional border.
    fn rect(
        &mut self,
        rect: RectMm,
        fill: Option<Rgb>,
        stroke: Option<(Rgb, f32)>,
    ) -> Result<(), Md2PdfError>;

    /// Draw a straight line of width `width_mm`.
    fn line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        color: Rgb,
        width_mm: f32,
    ) -> Result<(), Md2PdfError>;

    /// Place `image` scaled into `rect`.
    fn image(&mut self, image: &DynamicImage, rect: RectMm) -> Result<(), Md2PdfError>;

    /// Serialize the document. Called exactly once.
    fn finish(self) -> Result<Self::Output, Md2PdfError>;
}

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    BeginPage {
        width_mm: f32,
        height_mm: f32,
    },
    Text {
        x_mm: f32,
        baseline_mm: f32,
        text: String,
        font: Font,
        size_pt: f32,
        color: Rgb,
    },
    Rect {
        rect: RectMm,
        fill: Option<Rgb>,
        stroke: Option<(Rgb, f32)>,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Rgb,
        width_mm: f32,
    },
    Image {
        rect: RectMm,
        pixel_width: u32,
        pixel_height: u32,
    },
}

/// In-memory surface that records every call.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    fn require_page(&self) -> Result<(), Md2PdfError> {
        if self.ops.iter().any(|op| matches!(op, DrawOp::BeginPage { .. })) {
            Ok(())
        } else {
            Err(Md2PdfError::DrawFailed {
                page: 0,
                detail: "drawing before the first page".into(),
            })
        }
    }
}

impl Surface for RecordingSurface {
    type Output = Vec<DrawOp>;

    fn begin_page(&mut self, width_mm: f32, height_mm: f32) -> Result<(), Md2PdfError> {
        self.ops.push(DrawOp::BeginPage {
            width_mm,
            height_mm,
        });
        Ok(())
    }

    fn text(
        &mut self,
        x_mm: f32,
        baseline_mm: f32,
        text: &str,
        font: Font,
        size_pt: f32,
        color: Rgb,
    ) -> Result<(), Md2PdfError> {
        self.require_page()?;
        self.ops.push(DrawOp::Text {
            x_mm,
            baseline_mm,
            text: text.to_string(),
            font,
            size_pt,
            color,
        });
        Ok(())
    }

    fn rect(
        &mut self,
        rect: RectMm,
        fill: Option<Rgb>,
        stroke: Option<(Rgb, f32)>,
    ) -> Result<(), Md2PdfError> {
        self.require_page()?;
        self.ops.push(DrawOp::Rect { rect, fill, stroke });
        Ok(())
    }

    fn line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        color: Rgb,
        width_mm: f32,
    ) -> Result<(), Md2PdfError> {
        self.require_page()?;
        self.ops.push(DrawOp::Line {
            from,
            to,
            color,
            width_mm,
        });
        Ok(())
    }

    fn image(&mut self, image: &DynamicImage, rect: RectMm) -> Result<(), Md2PdfError> {
        self.require_page()?;
        self.ops.push(DrawOp::Image {
            rect,
            pixel_width: image.width(),
            pixel_height: image.height(),
        });
        Ok(())
    }

    fn finish(self) -> Result<Vec<DrawOp>, Md2PdfError> {
        Ok(self.ops)
    }
}
