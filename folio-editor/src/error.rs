//! Editor error types.

use folio_core::CoreError;
use folio_renderer::RenderError;
use thiserror::Error;

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

/// Errors that can occur in the editor runtime.
#[derive(Debug, Error)]
pub enum EditorError {
    /// The handle belongs to a session that has been replaced or detached.
    #[error("Runtime session is stale")]
    StaleSession,

    /// No page is attached.
    #[error("No active runtime session")]
    NoActiveSession,

    /// The session was attached without edit capability.
    #[error("Runtime session is read-only")]
    ReadOnly,

    /// The scene has not finished loading, or failed to load.
    #[error("Scene is not loaded")]
    NotLoaded,

    /// Deleting the page would leave the document empty.
    #[error("Cannot delete the last page of a document")]
    LastPage,

    /// The document has no pages to show.
    #[error("Document has no pages")]
    EmptyDocument,

    /// Document, page or scene error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Surface or export error.
    #[error(transparent)]
    Render(#[from] RenderError),
}
