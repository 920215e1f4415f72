//! Off-screen raster surface built on the resvg/tiny-skia pipeline.

use std::sync::Arc;

use folio_core::{Scene, SceneObject, ViewportTransform};
use image::ImageEncoder;

use crate::surface::{RasterFormat, RenderSurface, SurfaceFactory};
use crate::svg::scene_to_svg;
use crate::{RenderError, RenderResult};

/// Largest accepted surface edge in pixels.
pub const MAX_SURFACE_EDGE: u32 = 16_384;

/// Raster encoding settings.
#[derive(Debug, Clone, Copy)]
pub struct RasterConfig {
    /// JPEG quality 1-100.
    pub jpeg_quality: u8,
    /// Colour JPEG output is flattened onto, as RGB bytes.
    pub matte: [u8; 3],
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 100,
            matte: [255, 255, 255],
        }
    }
}

/// A surface that renders to memory.
pub struct OffscreenSurface {
    width: u32,
    height: u32,
    scene: Option<Scene>,
    viewport: ViewportTransform,
    clip: Option<SceneObject>,
    config: RasterConfig,
    fontdb: Arc<usvg::fontdb::Database>,
    disposed: bool,
}

impl OffscreenSurface {
    /// Create an empty surface.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Surface`] if the size is empty or too large.
    pub fn new(width: u32, height: u32, config: RasterConfig) -> RenderResult<Self> {
        Self::with_fonts(width, height, config, Arc::default())
    }

    /// Create an empty surface sharing an already loaded font database.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Surface`] if the size is empty or too large.
    pub fn with_fonts(
        width: u32,
        height: u32,
        config: RasterConfig,
        fontdb: Arc<usvg::fontdb::Database>,
    ) -> RenderResult<Self> {
        check_size(width, height)?;
        Ok(Self {
            width,
            height,
            scene: None,
            viewport: ViewportTransform::IDENTITY,
            clip: None,
            config,
            fontdb,
            disposed: false,
        })
    }

    fn ensure_live(&self) -> RenderResult<()> {
        if self.disposed {
            Err(RenderError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Rasterize the SVG form of the current contents.
    fn render_pixmap(&self) -> RenderResult<tiny_skia::Pixmap> {
        let empty = Scene::new();
        let scene = self.scene.as_ref().unwrap_or(&empty);
        let svg = scene_to_svg(scene, self.width, self.height, self.viewport, self.clip.as_ref());

        let options = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..usvg::Options::default()
        };
        let tree = usvg::Tree::from_str(&svg, &options)
            .map_err(|e| RenderError::Rasterize(format!("SVG parsing failed: {e}")))?;

        let mut pixmap = tiny_skia::Pixmap::new(self.width, self.height)
            .ok_or_else(|| RenderError::Rasterize("Failed to create pixmap".to_string()))?;
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        tracing::trace!(
            "Rasterized {} objects at {}x{}",
            scene.object_count(),
            self.width,
            self.height
        );
        Ok(pixmap)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn encode_jpeg(&self, pixmap: &tiny_skia::Pixmap) -> RenderResult<Vec<u8>> {
        let (width, height) = (pixmap.width(), pixmap.height());
        let matte = self.config.matte;
        let mut rgb_data = Vec::with_capacity((width * height * 3) as usize);
        // Pixmap data is premultiplied: out = colour + matte * (1 - alpha).
        for pixel in pixmap.data().chunks_exact(4) {
            let inv = 1.0 - f32::from(pixel[3]) / 255.0;
            for channel in 0..3 {
                let value = f32::from(matte[channel]).mul_add(inv, f32::from(pixel[channel]));
                rgb_data.push(value.round().min(255.0) as u8);
            }
        }

        let mut buf = std::io::Cursor::new(Vec::new());
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, self.config.jpeg_quality);
        encoder
            .write_image(&rgb_data, width, height, image::ExtendedColorType::Rgb8)
            .map_err(|e| RenderError::Encode(format!("JPEG encoding failed: {e}")))?;

        Ok(buf.into_inner())
    }
}

impl RenderSurface for OffscreenSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.ensure_live()?;
        check_size(width, height)?;
        self.width = width;
        self.height = height;
        tracing::debug!("Offscreen surface resized to {width}x{height}");
        Ok(())
    }

    fn load_scene(&mut self, scene: Scene) -> RenderResult<()> {
        self.ensure_live()?;
        self.scene = Some(scene);
        Ok(())
    }

    fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    fn scene_mut(&mut self) -> Option<&mut Scene> {
        if self.disposed {
            return None;
        }
        self.scene.as_mut()
    }

    fn set_viewport(&mut self, transform: ViewportTransform) -> RenderResult<()> {
        self.ensure_live()?;
        self.viewport = transform;
        Ok(())
    }

    fn viewport(&self) -> ViewportTransform {
        self.viewport
    }

    fn set_clip_path(&mut self, clip: Option<SceneObject>) -> RenderResult<()> {
        self.ensure_live()?;
        self.clip = clip;
        Ok(())
    }

    fn clip_path(&self) -> Option<&SceneObject> {
        self.clip.as_ref()
    }

    fn rasterize(&self, format: RasterFormat) -> RenderResult<Vec<u8>> {
        self.ensure_live()?;
        let pixmap = self.render_pixmap()?;
        match format {
            RasterFormat::Png => pixmap
                .encode_png()
                .map_err(|e| RenderError::Encode(format!("PNG encoding failed: {e}"))),
            RasterFormat::Jpeg => self.encode_jpeg(&pixmap),
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.scene = None;
        self.clip = None;
        tracing::trace!("Offscreen surface {}x{} disposed", self.width, self.height);
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

fn check_size(width: u32, height: u32) -> RenderResult<()> {
    if width == 0 || height == 0 || width > MAX_SURFACE_EDGE || height > MAX_SURFACE_EDGE {
        return Err(RenderError::Surface(format!(
            "invalid surface size {width}x{height}"
        )));
    }
    Ok(())
}

/// Creates [`OffscreenSurface`]s sharing one font database.
#[derive(Clone)]
pub struct OffscreenFactory {
    config: RasterConfig,
    fontdb: Arc<usvg::fontdb::Database>,
}

impl OffscreenFactory {
    /// Factory with an empty font database (text is not drawn).
    #[must_use]
    pub fn new(config: RasterConfig) -> Self {
        Self {
            config,
            fontdb: Arc::default(),
        }
    }

    /// Factory that loads the system fonts once for all surfaces.
    #[must_use]
    pub fn with_system_fonts(config: RasterConfig) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!("Loaded {} font faces", db.len());
        Self {
            config,
            fontdb: Arc::new(db),
        }
    }
}

impl Default for OffscreenFactory {
    fn default() -> Self {
        Self::new(RasterConfig::default())
    }
}

impl SurfaceFactory for OffscreenFactory {
    fn create(&self, width: u32, height: u32) -> RenderResult<Box<dyn RenderSurface>> {
        let surface =
            OffscreenSurface::with_fonts(width, height, self.config, Arc::clone(&self.fontdb))?;
        Ok(Box::new(surface))
    }
}
