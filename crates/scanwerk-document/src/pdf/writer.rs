// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page packager — place a captured document image on a single fixed-size PDF
// page using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use chrono::{DateTime, Utc};
use image::DynamicImage;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use scanwerk_core::PaperSize;
use scanwerk_core::config::PageConfig;
use scanwerk_core::error::{Result, ScanwerkError};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

/// Where the image lands on the page, in millimetres from the bottom-left
/// corner (PDF user space).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

/// A finished single-page document.
#[derive(Debug, Clone)]
pub struct PageArtifact {
    /// Suggested file name, stamped with the capture time.
    pub name: String,
    /// Serialised PDF.
    pub bytes: Vec<u8>,
    /// Hex SHA-256 of `bytes`.
    pub sha256: String,
    pub captured_at: DateTime<Utc>,
    pub paper_size: PaperSize,
    pub margin_mm: f32,
    pub placement: ImagePlacement,
    /// Pixel size of the embedded image.
    pub image_size: (u32, u32),
}

impl PageArtifact {
    pub fn mime_type(&self) -> &'static str {
        "application/pdf"
    }
}

/// Lays one image onto one page.
///
/// The image is scaled to fit inside the margins without cropping, keeps its
/// aspect ratio, and is centred both ways.
#[derive(Debug, Clone, Default)]
pub struct DocumentPackager {
    config: PageConfig,
}

impl DocumentPackager {
    pub fn new(config: PageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Paper dimensions in printpdf's Mm units.
    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.config.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    /// Placement of a `width`x`height` pixel image on the page.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero; callers must never package an empty
    /// image.
    pub fn layout(&self, width: u32, height: u32) -> ImagePlacement {
        assert!(width > 0 && height > 0, "cannot place a {width}x{height} image on a page");

        let (page_w, page_h) = self.page_dimensions();
        let margin = self.config.margin_mm;
        let usable_w = page_w.0 - 2.0 * margin;
        let usable_h = page_h.0 - 2.0 * margin;

        let scale = (usable_w / width as f32).min(usable_h / height as f32);
        let width_mm = width as f32 * scale;
        let height_mm = height as f32 * scale;

        ImagePlacement {
            x_mm: margin + (usable_w - width_mm) / 2.0,
            y_mm: margin + (usable_h - height_mm) / 2.0,
            width_mm,
            height_mm,
        }
    }

    /// File name for a capture taken at `captured_at`.
    pub fn file_name(captured_at: DateTime<Utc>) -> String {
        format!("scanned-document-{}.pdf", captured_at.format("%Y-%m-%d_%H-%M-%S"))
    }

    /// Build the single-page PDF for `image`.
    ///
    /// # Panics
    ///
    /// Panics on a zero-sized image (see [`layout`](Self::layout)).
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn pack(&self, image: &DynamicImage, captured_at: DateTime<Utc>) -> Result<PageArtifact> {
        let (img_width, img_height) = (image.width(), image.height());
        let placement = self.layout(img_width, img_height);
        let (page_w, page_h) = self.page_dimensions();

        info!(paper = ?self.config.paper_size, "Packaging capture as PDF");

        // Convert to RGB8 for printpdf.
        let rgb_image = image.to_rgb8();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb_image.into_raw()),
            width: img_width as usize,
            height: img_height as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new(&self.config.title);
        let xobject_id = doc.add_image(&raw);

        // At `dpi`, the image's native size is px / dpi inches; scale that to
        // the placement width.
        let dpi = self.config.image_dpi;
        let native_w_pt = img_width as f32 / dpi * 72.0;
        let scale = Mm(placement.width_mm).into_pt().0 / native_w_pt;

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(Mm(placement.x_mm).into_pt().0)),
                translate_y: Some(Pt(Mm(placement.y_mm).into_pt().0)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(dpi),
                rotate: None,
            },
        }];

        doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if bytes.is_empty() {
            return Err(ScanwerkError::PdfError("PDF serialisation produced no output".into()));
        }

        let sha256 = hex::encode(Sha256::digest(&bytes));
        debug!(pdf_bytes = bytes.len(), scale, warnings = warnings.len(), "Image placed on page");

        Ok(PageArtifact {
            name: Self::file_name(captured_at),
            bytes,
            sha256,
            captured_at,
            paper_size: self.config.paper_size,
            margin_mm: self.config.margin_mm,
            placement,
            image_size: (img_width, img_height),
        })
    }
}
