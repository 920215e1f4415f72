//! Document export to image archives, PDF and JSON.
//!
//! Every export replays the stored scenes of a document through a fresh
//! off-screen surface per page. Surfaces are created strictly one at a time:
//! page N+1's surface is not created until page N's has been disposed.

use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use folio_core::{DocumentId, Page, PageStore};

use crate::offscreen::RasterConfig;
use crate::surface::{RasterFormat, SurfaceFactory, SurfaceGuard};
use crate::{RenderError, RenderResult};

/// Default base name of exported artifacts.
pub const DEFAULT_FILE_NAME: &str = "export";

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// ZIP archive of one PNG per page.
    Png,
    /// ZIP archive of one JPEG per page.
    Jpg,
    /// One PDF page per document page.
    Pdf,
    /// Pretty-printed JSON array of the page records.
    Json,
}

impl ExportFormat {
    /// Extension of the delivered artifact.
    #[must_use]
    pub fn artifact_extension(self) -> &'static str {
        match self {
            Self::Png | Self::Jpg => "zip",
            Self::Pdf => "pdf",
            Self::Json => "json",
        }
    }

    /// MIME type of the delivered artifact.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png | Self::Jpg => "application/zip",
            Self::Pdf => "application/pdf",
            Self::Json => "application/json",
        }
    }

    fn raster(self) -> Option<RasterFormat> {
        match self {
            Self::Png => Some(RasterFormat::Png),
            Self::Jpg => Some(RasterFormat::Jpeg),
            Self::Pdf | Self::Json => None,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "pdf" => Ok(Self::Pdf),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown export format '{other}'")),
        }
    }
}

/// Pipeline-wide export settings.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// DPI used to convert pixels to PDF millimetres (default: 96.0).
    pub dpi: f32,
    /// JPEG quality 1-100 (default: 100).
    pub jpeg_quality: u8,
    /// Fill painted behind each PDF page image, as RGB bytes (default: black).
    pub pdf_background: [u8; 3],
    /// PDF document title.
    pub pdf_title: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dpi: 96.0,
            jpeg_quality: 100,
            pdf_background: [0, 0, 0],
            pdf_title: "Folio Export".to_string(),
        }
    }
}

impl ExportConfig {
    /// Raster settings for surfaces rendering this export.
    #[must_use]
    pub fn raster_config(&self) -> RasterConfig {
        RasterConfig {
            jpeg_quality: self.jpeg_quality,
            ..RasterConfig::default()
        }
    }
}

/// Per-invocation export options.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Base name of the artifact and its entries; defaults to "export".
    pub file_name: Option<String>,
}

impl ExportOptions {
    /// Options with an explicit base name.
    #[must_use]
    pub fn named(file_name: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
        }
    }

    /// Use `name` (typically the document name) when no explicit base name
    /// was given.
    #[must_use]
    pub fn or_named(mut self, name: impl Into<String>) -> Self {
        if self.file_name.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            self.file_name = Some(name.into());
        }
        self
    }

    /// The base name with path separators and control characters replaced,
    /// so it is always a single file name component.
    fn base_name(&self) -> String {
        let cleaned: String = self
            .file_name
            .as_deref()
            .unwrap_or_default()
            .chars()
            .map(|c| {
                if matches!(c, '/' | '\\' | ':') || c.is_control() {
                    '-'
                } else {
                    c
                }
            })
            .collect();
        let cleaned = cleaned.trim().trim_matches('.');
        if cleaned.is_empty() {
            DEFAULT_FILE_NAME.to_string()
        } else {
            cleaned.to_string()
        }
    }
}

/// A finished export, ready to be written or downloaded.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// File name including extension.
    pub file_name: String,
    /// MIME type.
    pub content_type: &'static str,
    /// Encoded contents.
    pub bytes: Vec<u8>,
}

/// Name of the archive entry holding a page image.
#[must_use]
pub fn page_entry_name(base: &str, position: u32, format: RasterFormat) -> String {
    format!("{base}-page-{position}.{}", format.extension())
}

/// Placement of one page image inside the canonical PDF frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    /// Uniform scale applied to the page image.
    pub scale: f32,
    /// Scaled width.
    pub width: f32,
    /// Scaled height.
    pub height: f32,
    /// Horizontal offset from the left edge of the frame.
    pub offset_x: f32,
    /// Vertical offset from the top edge of the frame.
    pub offset_y: f32,
}

/// PDF page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Width greater than height.
    Landscape,
    /// Height greater than or equal to width.
    Portrait,
}

/// Frame layout for a PDF export.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfLayout {
    /// Canonical page width in pixels (from the first page).
    pub width: f32,
    /// Canonical page height in pixels.
    pub height: f32,
    /// Orientation of every PDF page.
    pub orientation: Orientation,
    /// One placement per input page, in order.
    pub placements: Vec<PagePlacement>,
}

impl PdfLayout {
    /// Plan the frame for pages of the given pixel sizes.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NoPages`] for an empty list and
    /// [`RenderError::Export`] if any size is empty.
    pub fn plan(sizes: &[(u32, u32)]) -> RenderResult<Self> {
        let &(first_w, first_h) = sizes.first().ok_or(RenderError::NoPages)?;

        #[allow(clippy::cast_precision_loss)]
        let (width, height) = (first_w as f32, first_h as f32);
        let orientation = if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };

        let placements = sizes
            .iter()
            .map(|&(w, h)| {
                if w == 0 || h == 0 {
                    return Err(RenderError::Export(format!("page size {w}x{h} is empty")));
                }
                #[allow(clippy::cast_precision_loss)]
                let (pw, ph) = (w as f32, h as f32);
                let scale = (width / pw).min(height / ph);
                let (sw, sh) = (pw * scale, ph * scale);
                Ok(PagePlacement {
                    scale,
                    width: sw,
                    height: sh,
                    offset_x: (width - sw) / 2.0,
                    offset_y: (height - sh) / 2.0,
                })
            })
            .collect::<RenderResult<Vec<_>>>()?;

        Ok(Self {
            width,
            height,
            orientation,
            placements,
        })
    }
}

/// Clears the exporting flag on every exit path.
struct ExportingGuard {
    flag: Arc<AtomicBool>,
}

impl ExportingGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> RenderResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RenderError::AlreadyExporting)?;
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for ExportingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Exports whole documents from a page store.
pub struct ExportPipeline {
    store: Arc<dyn PageStore>,
    factory: Arc<dyn SurfaceFactory>,
    config: ExportConfig,
    exporting: Arc<AtomicBool>,
}

impl ExportPipeline {
    /// Create a pipeline reading from `store` and rendering with `factory`.
    #[must_use]
    pub fn new(
        store: Arc<dyn PageStore>,
        factory: Arc<dyn SurfaceFactory>,
        config: ExportConfig,
    ) -> Self {
        Self {
            store,
            factory,
            config,
            exporting: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether an export is currently running.
    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.exporting.load(Ordering::Acquire)
    }

    /// Shared exporting flag, for observers that outlive a borrow.
    #[must_use]
    pub fn exporting_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.exporting)
    }

    /// Export every page of a document.
    ///
    /// Any failure aborts the whole export; nothing partial is returned.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::AlreadyExporting`] if another export is
    /// running, [`RenderError::NoPages`] for an empty document, and any
    /// store, decode, render or encode error.
    pub async fn export(
        &self,
        document_id: DocumentId,
        format: ExportFormat,
        options: &ExportOptions,
    ) -> RenderResult<Artifact> {
        let _guard = ExportingGuard::acquire(&self.exporting)?;
        let base = options.base_name();
        tracing::debug!("Exporting document {document_id} as {format:?}");

        let result = self.export_pages(document_id, format, &base).await;
        match &result {
            Ok(artifact) => tracing::info!(
                "Exported {} ({} bytes)",
                artifact.file_name,
                artifact.bytes.len()
            ),
            Err(e) => tracing::warn!("Export of document {document_id} failed: {e}"),
        }
        result
    }

    async fn export_pages(
        &self,
        document_id: DocumentId,
        format: ExportFormat,
        base: &str,
    ) -> RenderResult<Artifact> {
        let mut pages = self.store.list_pages(document_id).await?;
        pages.sort_by_key(|p| p.position);
        if pages.is_empty() {
            return Err(RenderError::NoPages);
        }

        let bytes = match format {
            ExportFormat::Png | ExportFormat::Jpg => {
                let raster = format.raster().unwrap_or(RasterFormat::Png);
                self.build_archive(&pages, raster, base)?
            }
            ExportFormat::Pdf => self.build_pdf(&pages)?,
            ExportFormat::Json => serde_json::to_vec_pretty(&pages)
                .map_err(|e| RenderError::Export(format!("JSON encoding failed: {e}")))?,
        };

        Ok(Artifact {
            file_name: format!("{base}.{}", format.artifact_extension()),
            content_type: format.content_type(),
            bytes,
        })
    }

    /// Render one page on its own surface. The surface is disposed before
    /// this returns, on success and on error.
    fn render_page(&self, page: &Page, format: RasterFormat) -> RenderResult<Vec<u8>> {
        let scene = page.decode_scene()?;
        let mut surface = SurfaceGuard::new(self.factory.create(page.width, page.height)?);
        surface.load_scene(scene)?;
        let bytes = surface.rasterize(format)?;
        tracing::trace!(
            "Rendered page {} ({}x{}) to {} bytes",
            page.position,
            page.width,
            page.height,
            bytes.len()
        );
        Ok(bytes)
    }

    fn build_archive(
        &self,
        pages: &[Page],
        format: RasterFormat,
        base: &str,
    ) -> RenderResult<Vec<u8>> {
        let mut archive = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        for page in pages {
            let image = self.render_page(page, format)?;
            let name = page_entry_name(base, page.position, format);
            archive
                .start_file(name.as_str(), options)
                .map_err(|e| RenderError::Export(format!("ZIP entry {name} failed: {e}")))?;
            archive
                .write_all(&image)
                .map_err(|e| RenderError::Export(format!("ZIP write {name} failed: {e}")))?;
        }

        let cursor = archive
            .finish()
            .map_err(|e| RenderError::Export(format!("ZIP finish failed: {e}")))?;
        Ok(cursor.into_inner())
    }

    fn build_pdf(&self, pages: &[Page]) -> RenderResult<Vec<u8>> {
        use printpdf::path::PaintMode;
        use printpdf::{Color, ImageTransform, Mm, PdfDocument, Rect, Rgb};

        let sizes: Vec<(u32, u32)> = pages.iter().map(|p| (p.width, p.height)).collect();
        let layout = PdfLayout::plan(&sizes)?;
        let dpi = self.config.dpi;
        let to_mm = |px: f32| Mm(px / dpi * 25.4);
        let (frame_w, frame_h) = (to_mm(layout.width), to_mm(layout.height));
        tracing::debug!(
            "PDF frame {}x{} ({:?})",
            layout.width,
            layout.height,
            layout.orientation
        );

        let (doc, first_page, first_layer) =
            PdfDocument::new(self.config.pdf_title.as_str(), frame_w, frame_h, "Page 1");
        let [r, g, b] = self.config.pdf_background;
        let background = Color::Rgb(Rgb::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            None,
        ));

        for (idx, (page, placement)) in pages.iter().zip(&layout.placements).enumerate() {
            let png = self.render_page(page, RasterFormat::Png)?;

            let (page_idx, layer_idx) = if idx == 0 {
                (first_page, first_layer)
            } else {
                doc.add_page(frame_w, frame_h, format!("Page {}", idx + 1))
            };
            let layer = doc.get_page(page_idx).get_layer(layer_idx);

            layer.set_fill_color(background.clone());
            layer.add_rect(
                Rect::new(Mm(0.0), Mm(0.0), frame_w, frame_h).with_mode(PaintMode::Fill),
            );

            let decoded = printpdf::image_crate::load_from_memory(&png)
                .map_err(|e| RenderError::Export(format!("Failed to decode PNG for PDF: {e}")))?;
            let opaque = printpdf::image_crate::DynamicImage::ImageRgb8(decoded.to_rgb8());
            let image = printpdf::Image::from_dynamic_image(&opaque);

            // PDF origin is bottom-left; the placement is centred so the
            // vertical offset is symmetric.
            image.add_to_layer(
                layer,
                ImageTransform {
                    translate_x: Some(to_mm(placement.offset_x)),
                    translate_y: Some(to_mm(placement.offset_y)),
                    scale_x: Some(placement.scale),
                    scale_y: Some(placement.scale),
                    dpi: Some(dpi),
                    ..Default::default()
                },
            );
        }

        doc.save_to_bytes()
            .map_err(|e| RenderError::Export(format!("PDF save failed: {e}")))
    }
}
