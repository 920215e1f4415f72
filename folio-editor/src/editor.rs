//! Editor facade: one document, one active page, autosave wired in.

use std::sync::Arc;

use folio_core::{DocumentId, FitOutcome, NewPage, Page, PageId, PageStore, Scene, Size, ViewportFit};
use folio_renderer::SurfaceFactory;
use tokio::sync::broadcast;

use crate::autosave::{Autosave, AutosaveHandle};
use crate::config::EditorConfig;
use crate::notify::{Notification, Notifier};
use crate::runtime::{LoadOutcome, RuntimeController, RuntimeHandle};
use crate::{EditorError, EditorResult};

/// An open document in the editor.
pub struct Editor {
    document_id: DocumentId,
    config: EditorConfig,
    store: Arc<dyn PageStore>,
    factory: Arc<dyn SurfaceFactory>,
    notifier: Notifier,
    autosave: AutosaveHandle,
    runtime: RuntimeController,
    pages: Vec<Page>,
    active: Option<RuntimeHandle>,
    container: Size,
}

impl Editor {
    /// Open a document and activate its first page.
    ///
    /// # Errors
    ///
    /// Returns an error if the pages cannot be listed or the first page
    /// cannot be attached.
    pub async fn open(
        store: Arc<dyn PageStore>,
        factory: Arc<dyn SurfaceFactory>,
        document_id: DocumentId,
        container: Size,
        config: EditorConfig,
    ) -> EditorResult<Self> {
        let notifier = Notifier::default();
        let autosave = Autosave::spawn(Arc::clone(&store), config.autosave_quiet, notifier.clone());
        let runtime = RuntimeController::editing(
            ViewportFit::editing(config.fit_padding),
            Arc::new(autosave.clone()),
        );

        let mut editor = Self {
            document_id,
            config,
            store,
            factory,
            notifier,
            autosave,
            runtime,
            pages: Vec::new(),
            active: None,
            container,
        };
        editor.refresh_pages().await?;
        tracing::info!(
            "Opened document {document_id} with {} pages",
            editor.pages.len()
        );

        if let Some(first) = editor.pages.first().map(|p| p.id) {
            editor.select_page(first).await?;
        }
        Ok(editor)
    }

    /// The open document.
    #[must_use]
    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    /// Pages in position order, as last listed.
    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// The active page, if any.
    #[must_use]
    pub fn active_page(&self) -> Option<PageId> {
        self.active.map(|h| h.page_id())
    }

    /// The runtime controller.
    #[must_use]
    pub fn runtime(&self) -> &RuntimeController {
        &self.runtime
    }

    /// Handle of the active session.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoActiveSession`] if no page is active.
    pub fn active_handle(&self) -> EditorResult<RuntimeHandle> {
        self.active.ok_or(EditorError::NoActiveSession)
    }

    /// Subscribe to user-facing notifications.
    #[must_use]
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// Make `page_id` the active page.
    ///
    /// Pending edits of the previous page are flushed, its surface is
    /// disposed, and the page is re-read from the store before attaching.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be fetched or attached.
    pub async fn select_page(&mut self, page_id: PageId) -> EditorResult<LoadOutcome> {
        if let Some(previous) = self.active.take() {
            self.runtime.detach(&previous);
            self.autosave.flush(previous.page_id()).await;
        }

        let page = self.store.get_page(page_id).await?;
        let surface = self.factory.create(page.width, page.height)?;
        let (handle, ticket) = self.runtime.attach(surface, self.container, &page)?;
        self.active = Some(handle);

        let decoded = ticket.decode();
        let outcome = self.runtime.finish_load(decoded)?;
        if outcome == LoadOutcome::Degraded {
            self.notifier
                .warning(format!("{} could not be fully loaded", page.name));
        }
        tracing::debug!("Selected page {} ({})", page.position, page.id);
        Ok(outcome)
    }

    /// Append a page with the default size and scene.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the page.
    pub async fn add_page(&mut self) -> EditorResult<Page> {
        let position = u32::try_from(self.pages.len() + 1)
            .map_err(|_| folio_core::CoreError::InvalidOperation("too many pages".to_string()))?;
        let new_page = NewPage::with_default_scene(
            self.document_id,
            position,
            self.config.page_width,
            self.config.page_height,
        )?;
        let page = self.store.create_page(new_page).await?;
        self.refresh_pages().await?;
        tracing::info!("Added {} to document {}", page.name, self.document_id);
        Ok(page)
    }

    /// Delete a page. The only remaining page cannot be deleted. If the
    /// active page is deleted, the page now at its position (or the new last
    /// page) becomes active. If the store rejects the delete, the active
    /// session is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::LastPage`] for the only page, or a store error.
    pub async fn delete_page(&mut self, page_id: PageId) -> EditorResult<()> {
        if self.pages.len() <= 1 {
            return Err(EditorError::LastPage);
        }
        let index = self
            .pages
            .iter()
            .position(|p| p.id == page_id)
            .ok_or_else(|| folio_core::CoreError::NotFound(format!("page {page_id}")))?;

        let was_active = self.active_page() == Some(page_id);
        self.autosave.flush(page_id).await;
        self.store.delete_page(page_id).await?;

        if was_active {
            if let Some(handle) = self.active.take() {
                self.runtime.detach(&handle);
            }
        }
        self.refresh_pages().await?;
        tracing::info!("Deleted page {page_id} from document {}", self.document_id);

        if was_active {
            let next = index.min(self.pages.len().saturating_sub(1));
            if let Some(next_id) = self.pages.get(next).map(|p| p.id) {
                self.select_page(next_id).await?;
            }
        }
        Ok(())
    }

    /// Apply a change to the active page's scene.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoActiveSession`] or any runtime edit error.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Scene) -> R) -> EditorResult<R> {
        let handle = self.active_handle()?;
        self.runtime.edit(&handle, f)
    }

    /// Re-fit the active page to a resized container.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoActiveSession`] if no page is active.
    pub fn resize(&mut self, container: Size) -> EditorResult<FitOutcome> {
        self.container = container;
        let handle = self.active_handle()?;
        self.runtime.resize_container(&handle, container)
    }

    /// Dispose the active surface and persist everything pending.
    pub async fn close(mut self) {
        if let Some(handle) = self.active.take() {
            self.runtime.detach(&handle);
        }
        self.autosave.shutdown().await;
        tracing::info!("Closed document {}", self.document_id);
    }

    async fn refresh_pages(&mut self) -> EditorResult<()> {
        let mut pages = self.store.list_pages(self.document_id).await?;
        pages.sort_by_key(|p| p.position);
        self.pages = pages;
        Ok(())
    }
}
