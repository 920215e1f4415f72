//! # Folio Renderer
//!
//! Off-screen rendering and document export for Folio.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────┐   ┌───────┐   ┌──────────────┐   ┌──────────────────┐
//! │  Scene   │──▶│  SVG  │──▶│ usvg / resvg │──▶│ tiny-skia Pixmap │
//! └──────────┘   └───────┘   └──────────────┘   └────────┬─────────┘
//!                                                         │
//!                                  ┌──────────────────────┼────────────┐
//!                                  ▼                      ▼            ▼
//!                               PNG / JPEG             ZIP archive    PDF
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod export;
pub mod offscreen;
pub mod surface;
pub mod svg;

pub use error::{RenderError, RenderResult};
pub use export::{
    Artifact, ExportConfig, ExportFormat, ExportOptions, ExportPipeline, Orientation,
    PagePlacement, PdfLayout,
};
pub use offscreen::{OffscreenFactory, OffscreenSurface, RasterConfig};
pub use surface::{RasterFormat, RenderSurface, SurfaceFactory, SurfaceGuard};
