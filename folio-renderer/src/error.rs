//! Renderer error types.

use folio_core::CoreError;
use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering and export.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The surface has already been disposed.
    #[error("Surface has been disposed")]
    Disposed,

    /// Surface creation or configuration failed.
    #[error("Surface error: {0}")]
    Surface(String),

    /// Scene could not be rasterized.
    #[error("Rasterization failed: {0}")]
    Rasterize(String),

    /// Image encoding failed.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// Building the export artifact failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// The document has no pages to export.
    #[error("Document has no pages to export")]
    NoPages,

    /// Another export is still running on this pipeline.
    #[error("An export is already in progress")]
    AlreadyExporting,

    /// Document, page or scene error.
    #[error(transparent)]
    Core(#[from] CoreError),
}
