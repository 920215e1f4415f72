//! Viewport fitting: scale and centre a page's clip boundary inside a container.

use serde::{Deserialize, Serialize};

use crate::{Scene, SceneObject};

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Size {
    /// Create a size.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Whether both dimensions are finite and strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// A point in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Scale that fits `reference` inside `container`, never above 1:1.
///
/// `min(container.width / reference.width, container.height / reference.height, 1)`
#[must_use]
pub fn fit(reference: Size, container: Size) -> f32 {
    fit_uncapped(reference, container).min(1.0)
}

/// Scale that fits `reference` inside `container`, allowed to zoom in.
///
/// A degenerate reference yields `1.0`; a degenerate container yields `0.0`.
#[must_use]
pub fn fit_uncapped(reference: Size, container: Size) -> f32 {
    if !reference.is_positive() {
        return 1.0;
    }
    let clamp = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
    (clamp(container.width) / reference.width).min(clamp(container.height) / reference.height)
}

/// Uniform scale plus translation, applied as `p' = p * scale + translate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    /// Uniform scale factor.
    pub scale: f32,
    /// Horizontal translation after scaling.
    pub translate_x: f32,
    /// Vertical translation after scaling.
    pub translate_y: f32,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewportTransform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    /// The transform as a 2D affine matrix `[a, b, c, d, e, f]`.
    #[must_use]
    pub fn to_matrix(&self) -> [f32; 6] {
        [self.scale, 0.0, 0.0, self.scale, self.translate_x, self.translate_y]
    }

    /// Map a scene point into container coordinates.
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            p.x.mul_add(self.scale, self.translate_x),
            p.y.mul_add(self.scale, self.translate_y),
        )
    }
}

/// Whether the fit may zoom past 1:1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Editing view: never upscale.
    Editing,
    /// Read-only presentation: may upscale to fill the container.
    Presentation,
}

/// A successfully fitted viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedViewport {
    /// Raw fit scale for the boundary in the container.
    pub scale: f32,
    /// Applied zoom (`scale * padding`).
    pub zoom: f32,
    /// Transform that centres the boundary in the container.
    pub transform: ViewportTransform,
    /// Clip path to install on the surface (a clone of the boundary).
    pub clip: SceneObject,
}

/// Result of fitting a scene into a container.
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    /// The boundary was found and fitted.
    Fitted(FittedViewport),
    /// No clip boundary yet; the caller should show a loading state.
    Degraded,
}

impl FitOutcome {
    /// The fitted viewport, if any.
    #[must_use]
    pub fn fitted(&self) -> Option<&FittedViewport> {
        match self {
            Self::Fitted(v) => Some(v),
            Self::Degraded => None,
        }
    }

    /// Whether fitting fell back to the degraded state.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded)
    }
}

/// Computes viewport transforms for scenes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportFit {
    mode: FitMode,
    padding: f32,
}

impl ViewportFit {
    /// Fit for the editing view with the given padding ratio in `(0, 1]`.
    #[must_use]
    pub fn editing(padding: f32) -> Self {
        let padding = if padding.is_finite() && padding > 0.0 {
            padding.min(1.0)
        } else {
            1.0
        };
        Self {
            mode: FitMode::Editing,
            padding,
        }
    }

    /// Fit for presentation: no 1:1 cap, no padding.
    #[must_use]
    pub fn presentation() -> Self {
        Self {
            mode: FitMode::Presentation,
            padding: 1.0,
        }
    }

    /// The fit mode.
    #[must_use]
    pub fn mode(&self) -> FitMode {
        self.mode
    }

    /// Fit the scene's clip boundary into `container`.
    #[must_use]
    pub fn compute(&self, scene: &Scene, container: Size) -> FitOutcome {
        let Some(boundary) = scene.clip_boundary() else {
            tracing::debug!("No clip boundary in scene, viewport stays in loading state");
            return FitOutcome::Degraded;
        };

        let reference = boundary.scaled_size();
        if !reference.is_positive() {
            tracing::debug!(
                "Clip boundary {}x{} has no usable size, viewport stays in loading state",
                reference.width,
                reference.height
            );
            return FitOutcome::Degraded;
        }
        let scale = match self.mode {
            FitMode::Editing => fit(reference, container),
            FitMode::Presentation => fit_uncapped(reference, container),
        };
        let zoom = scale * self.padding;

        let center = boundary.center();
        let transform = ViewportTransform {
            scale: zoom,
            translate_x: container.width / 2.0 - center.x * zoom,
            translate_y: container.height / 2.0 - center.y * zoom,
        };

        tracing::trace!(
            "Fitted {}x{} into {}x{}: scale={scale} zoom={zoom}",
            reference.width,
            reference.height,
            container.width,
            container.height
        );

        FitOutcome::Fitted(FittedViewport {
            scale,
            zoom,
            transform,
            clip: boundary.clone(),
        })
    }
}
