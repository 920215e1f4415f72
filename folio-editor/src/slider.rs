//! Read-only presentation of a document, one page at a time.

use std::sync::Arc;

use folio_core::{DocumentId, FitOutcome, Page, PageStore, Size};
use folio_renderer::{RenderSurface, SurfaceFactory};

use crate::runtime::{LoadOutcome, LoadTicket, RuntimeController, RuntimeHandle};
use crate::{EditorError, EditorResult};

/// Keys the slider reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Previous page.
    ArrowLeft,
    /// Previous page.
    ArrowUp,
    /// Next page.
    ArrowRight,
    /// Next page.
    ArrowDown,
    /// Anything else (ignored).
    Other,
}

impl Key {
    /// Map a DOM-style key name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowUp" => Self::ArrowUp,
            "ArrowRight" => Self::ArrowRight,
            "ArrowDown" => Self::ArrowDown,
            _ => Self::Other,
        }
    }
}

/// Paginates through a document's stored pages with wrap-around.
///
/// Each navigation detaches the current surface and attaches a fresh one for
/// the target page. Until [`finish_transition`](Self::finish_transition) has
/// applied the load, further navigation is ignored.
pub struct PresentationSlider {
    pages: Vec<Page>,
    index: usize,
    transitioning: bool,
    controller: RuntimeController,
    factory: Arc<dyn SurfaceFactory>,
    container: Size,
    handle: Option<RuntimeHandle>,
    pending: Option<LoadTicket>,
}

impl PresentationSlider {
    /// Load the document's pages and show the first one.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::EmptyDocument`] if the document has no pages,
    /// or any store or surface error.
    pub async fn open(
        store: &dyn PageStore,
        factory: Arc<dyn SurfaceFactory>,
        document_id: DocumentId,
        container: Size,
    ) -> EditorResult<Self> {
        let mut pages = store.list_pages(document_id).await?;
        pages.sort_by_key(|p| p.position);
        if pages.is_empty() {
            return Err(EditorError::EmptyDocument);
        }
        tracing::debug!("Presenting document {document_id} ({} pages)", pages.len());

        let mut slider = Self {
            pages,
            index: 0,
            transitioning: false,
            controller: RuntimeController::read_only(),
            factory,
            container,
            handle: None,
            pending: None,
        };
        slider.begin_transition()?;
        slider.finish_transition()?;
        Ok(slider)
    }

    /// Index of the page on screen.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// The page on screen.
    #[must_use]
    pub fn current_page(&self) -> &Page {
        &self.pages[self.index]
    }

    /// Number of pages.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Whether a page load is in progress.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    /// The live surface.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoActiveSession`] after [`close`](Self::close).
    pub fn surface(&self) -> EditorResult<&dyn RenderSurface> {
        let handle = self.handle.as_ref().ok_or(EditorError::NoActiveSession)?;
        self.controller.surface(handle)
    }

    /// Go to the next page, wrapping to the first. Returns `false` if
    /// navigation is currently disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the new surface cannot be created.
    pub fn next(&mut self) -> EditorResult<bool> {
        if self.transitioning {
            return Ok(false);
        }
        self.index = (self.index + 1) % self.pages.len();
        self.begin_transition()?;
        Ok(true)
    }

    /// Go to the previous page, wrapping to the last. Returns `false` if
    /// navigation is currently disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the new surface cannot be created.
    pub fn previous(&mut self) -> EditorResult<bool> {
        if self.transitioning {
            return Ok(false);
        }
        self.index = self.index.checked_sub(1).unwrap_or(self.pages.len() - 1);
        self.begin_transition()?;
        Ok(true)
    }

    /// Left/up go back, right/down go forward.
    ///
    /// # Errors
    ///
    /// See [`next`](Self::next).
    pub fn handle_key(&mut self, key: Key) -> EditorResult<bool> {
        match key {
            Key::ArrowLeft | Key::ArrowUp => self.previous(),
            Key::ArrowRight | Key::ArrowDown => self.next(),
            Key::Other => Ok(false),
        }
    }

    /// Decode and apply the pending page load, re-enabling navigation.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface rejects the scene. Navigation is
    /// re-enabled either way.
    pub fn finish_transition(&mut self) -> EditorResult<LoadOutcome> {
        let Some(ticket) = self.pending.take() else {
            self.transitioning = false;
            return Ok(LoadOutcome::Stale);
        };
        let result = self.controller.finish_load(ticket.decode());
        self.transitioning = false;
        result
    }

    /// Re-fit the current page to a new container without reloading it.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoActiveSession`] after [`close`](Self::close).
    pub fn resize(&mut self, container: Size) -> EditorResult<FitOutcome> {
        self.container = container;
        let handle = self.handle.ok_or(EditorError::NoActiveSession)?;
        self.controller.resize_container(&handle, container)
    }

    /// Dispose the live surface.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.controller.detach(&handle);
        }
        self.pending = None;
        self.transitioning = false;
    }

    fn begin_transition(&mut self) -> EditorResult<()> {
        let page = &self.pages[self.index];
        self.transitioning = true;
        // Dispose the old surface before the new one exists.
        self.controller.detach_current();
        self.handle = None;

        let attached = self
            .factory
            .create(page.width, page.height)
            .map_err(EditorError::from)
            .and_then(|surface| self.controller.attach(surface, self.container, page));
        match attached {
            Ok((handle, ticket)) => {
                tracing::debug!("Presenting page {} of {}", page.position, self.pages.len());
                self.handle = Some(handle);
                self.pending = Some(ticket);
                Ok(())
            }
            Err(e) => {
                self.transitioning = false;
                Err(e)
            }
        }
    }
}
