//! [`Surface`] backed by a pdfium document.
//!
//! pdfium works in points with the origin at the bottom-left corner of the
//! page, so every coordinate is converted from millimetres and flipped
//! against the current page height. Text uses the built-in Helvetica and
//! Courier faces, which pdfium never needs to embed.

use super::surface::{Font, RectMm, Rgb, Surface};
use crate::error::Md2PdfError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::debug;

const MM_TO_PT: f32 = 72.0 / 25.4;

fn pt(mm: f32) -> PdfPoints {
    PdfPoints::new(mm * MM_TO_PT)
}

fn color(c: Rgb) -> PdfColor {
    PdfColor::new(c.0, c.1, c.2, 255)
}

/// Font tokens registered once per document.
#[derive(Clone, Copy)]
struct FontTokens {
    helvetica: PdfFontToken,
    helvetica_bold: PdfFontToken,
    helvetica_oblique: PdfFontToken,
    courier: PdfFontToken,
}

impl FontTokens {
    fn get(&self, font: Font) -> PdfFontToken {
        match font {
            Font::Helvetica => self.helvetica,
            Font::HelveticaBold => self.helvetica_bold,
            Font::HelveticaOblique => self.helvetica_oblique,
            Font::Courier => self.courier,
        }
    }
}

/// Draws into a new in-memory PDF document.
pub struct PdfiumSurface<'a> {
    document: PdfDocument<'a>,
    page: Option<PdfPage<'a>>,
    page_height_mm: f32,
    page_count: usize,
    fonts: FontTokens,
}

impl<'a> PdfiumSurface<'a> {
    /// Create an empty document bound to `pdfium`.
    pub fn new(pdfium: &'a Pdfium) -> Result<Self, Md2PdfError> {
        let mut document = pdfium.create_new_pdf().map_err(|e| draw_err(0, e))?;
        let fonts = {
            let f = document.fonts_mut();
            FontTokens {
                helvetica: f.helvetica(),
                helvetica_bold: f.helvetica_bold(),
                helvetica_oblique: f.helvetica_oblique(),
                courier: f.courier(),
            }
        };
        Ok(Self {
            document,
            page: None,
            page_height_mm: 0.0,
            page_count: 0,
            fonts,
        })
    }

    fn y(&self, y_mm: f32) -> PdfPoints {
        pt(self.page_height_mm - y_mm)
    }

    fn current_page(&mut self) -> Result<&mut PdfPage<'a>, Md2PdfError> {
        let page = self.page_count;
        self.page.as_mut().ok_or_else(|| Md2PdfError::DrawFailed {
            page,
            detail: "drawing before the first page".into(),
        })
    }
}

fn draw_err(page: usize, e: PdfiumError) -> Md2PdfError {
    Md2PdfError::DrawFailed {
        page,
        detail: format!("{e:?}"),
    }
}

impl<'a> Surface for PdfiumSurface<'a> {
    type Output = Vec<u8>;

    fn begin_page(&mut self, width_mm: f32, height_mm: f32) -> Result<(), Md2PdfError> {
        // Release the previous page so its content stream is regenerated.
        self.page = None;
        let next = self.page_count + 1;
        let size = PdfPagePaperSize::from_points(pt(width_mm), pt(height_mm));
        let page = self
            .document
            .pages_mut()
            .create_page_at_end(size)
            .map_err(|e| draw_err(next, e))?;
        self.page = Some(page);
        self.page_height_mm = height_mm;
        self.page_count += 1;
        Ok(())
    }

    fn text(
        &mut self,
        x_mm: f32,
        baseline_mm: f32,
        text: &str,
        font: Font,
        size_pt: f32,
        rgb: Rgb,
    ) -> Result<(), Md2PdfError> {
        let n = self.page_count;
        let y = self.y(baseline_mm);
        let mut object = PdfPageTextObject::new(
            &self.document,
            text,
            self.fonts.get(font),
            PdfPoints::new(size_pt),
        )
        .map_err(|e| draw_err(n, e))?;
        object.set_fill_color(color(rgb)).map_err(|e| draw_err(n, e))?;
        object.translate(pt(x_mm), y).map_err(|e| draw_err(n, e))?;
        self.current_page()?
            .objects_mut()
            .add_text_object(object)
            .map_err(|e| draw_err(n, e))?;
        Ok(())
    }

    fn rect(
        &mut self,
        rect: RectMm,
        fill: Option<Rgb>,
        stroke: Option<(Rgb, f32)>,
    ) -> Result<(), Md2PdfError> {
        let n = self.page_count;
        let bounds = PdfRect::new(
            self.y(rect.y + rect.h),
            pt(rect.x),
            self.y(rect.y),
            pt(rect.x + rect.w),
        );
        self.current_page()?
            .objects_mut()
            .create_path_object_rect(
                bounds,
                stroke.map(|(c, _)| color(c)),
                stroke.map(|(_, w)| pt(w)),
                fill.map(color),
            )
            .map_err(|e| draw_err(n, e))?;
        Ok(())
    }

    fn line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        rgb: Rgb,
        width_mm: f32,
    ) -> Result<(), Md2PdfError> {
        let n = self.page_count;
        let (y1, y2) = (self.y(from.1), self.y(to.1));
        self.current_page()?
            .objects_mut()
            .create_path_object_line(pt(from.0), y1, pt(to.0), y2, color(rgb), pt(width_mm))
            .map_err(|e| draw_err(n, e))?;
        Ok(())
    }

    fn image(&mut self, image: &DynamicImage, rect: RectMm) -> Result<(), Md2PdfError> {
        let n = self.page_count;
        let bottom = self.y(rect.y + rect.h);
        self.current_page()?
            .objects_mut()
            .create_image_object(pt(rect.x), bottom, image, Some(pt(rect.w)), Some(pt(rect.h)))
            .map_err(|e| draw_err(n, e))?;
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>, Md2PdfError> {
        self.page = None;
        let pages = self.page_count;
        let bytes = self
            .document
            .save_to_bytes()
            .map_err(|e| draw_err(pages, e))?;
        debug!("Serialized {} page(s), {} bytes", pages, bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millimetres_convert_to_points() {
        assert!((pt(25.4).value - 72.0).abs() < 1e-4);
        assert!((pt(210.0).value - 595.2756).abs() < 1e-3);
    }

    #[test]
    fn color_is_opaque() {
        let c = color(Rgb(8, 145, 178));
        assert_eq!((c.red(), c.green(), c.blue(), c.alpha()), (8, 145, 178, 255));
    }
}
