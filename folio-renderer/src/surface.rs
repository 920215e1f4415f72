//! Rendering surface abstraction.

use std::ops::{Deref, DerefMut};

use folio_core::{Scene, SceneObject, ViewportTransform};

use crate::RenderResult;

/// Raster output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    /// PNG image.
    Png,
    /// JPEG image.
    Jpeg,
}

impl RasterFormat {
    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// A mutable rendering surface bound to at most one scene.
///
/// Every operation on a disposed surface fails with
/// [`RenderError::Disposed`](crate::RenderError::Disposed), except
/// [`dispose`](RenderSurface::dispose) itself, which is idempotent.
pub trait RenderSurface: Send {
    /// Current surface size in pixels.
    fn size(&self) -> (u32, u32);

    /// Resize the surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is disposed or the size is empty.
    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()>;

    /// Replace the surface contents with a decoded scene.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is disposed.
    fn load_scene(&mut self, scene: Scene) -> RenderResult<()>;

    /// The loaded scene, if any.
    fn scene(&self) -> Option<&Scene>;

    /// Mutable access to the loaded scene, if any.
    fn scene_mut(&mut self) -> Option<&mut Scene>;

    /// Set the viewport transform used when drawing.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is disposed.
    fn set_viewport(&mut self, transform: ViewportTransform) -> RenderResult<()>;

    /// Current viewport transform.
    fn viewport(&self) -> ViewportTransform;

    /// Install (or clear) the clip path, in scene coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is disposed.
    fn set_clip_path(&mut self, clip: Option<SceneObject>) -> RenderResult<()>;

    /// Current clip path.
    fn clip_path(&self) -> Option<&SceneObject>;

    /// Render the current contents to encoded image bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is disposed or rendering fails.
    fn rasterize(&self, format: RasterFormat) -> RenderResult<Vec<u8>>;

    /// Release all resources. Safe to call more than once.
    fn dispose(&mut self);

    /// Whether [`dispose`](RenderSurface::dispose) has been called.
    fn is_disposed(&self) -> bool;
}

/// Creates rendering surfaces.
pub trait SurfaceFactory: Send + Sync {
    /// Create a surface of the given size.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be allocated.
    fn create(&self, width: u32, height: u32) -> RenderResult<Box<dyn RenderSurface>>;
}

/// Scoped ownership of a surface: disposes it when dropped, including on
/// early return through `?`.
pub struct SurfaceGuard {
    surface: Box<dyn RenderSurface>,
}

impl SurfaceGuard {
    /// Take ownership of a surface.
    #[must_use]
    pub fn new(surface: Box<dyn RenderSurface>) -> Self {
        Self { surface }
    }
}

impl Deref for SurfaceGuard {
    type Target = dyn RenderSurface;

    fn deref(&self) -> &Self::Target {
        self.surface.as_ref()
    }
}

impl DerefMut for SurfaceGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.surface.as_mut()
    }
}

impl Drop for SurfaceGuard {
    fn drop(&mut self) {
        self.surface.dispose();
    }
}
