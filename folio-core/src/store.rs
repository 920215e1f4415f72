//! Document and page storage.
//!
//! [`PageStore`] and [`DocumentStore`] are the persistence seams consumed by the
//! editor and the export pipeline. [`MemoryStore`] is a thread-safe in-memory
//! implementation with optional filesystem persistence (one JSON file per
//! document).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{current_timestamp_ms, DEFAULT_PAGE_HEIGHT, DEFAULT_PAGE_WIDTH};
use crate::{CoreError, CoreResult, Document, DocumentId, NewPage, Page, PageId, PagePatch};

/// Page persistence operations.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Create a page at `page.position`, shifting later pages down.
    async fn create_page(&self, page: NewPage) -> CoreResult<Page>;

    /// Apply a partial update to a page.
    async fn update_page(&self, id: PageId, patch: PagePatch) -> CoreResult<Page>;

    /// Delete a page and renumber the pages after it.
    async fn delete_page(&self, id: PageId) -> CoreResult<PageId>;

    /// All pages of a document, sorted by ascending position.
    async fn list_pages(&self, document_id: DocumentId) -> CoreResult<Vec<Page>>;

    /// Fetch a single page.
    async fn get_page(&self, id: PageId) -> CoreResult<Page>;
}

/// Document persistence operations.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document together with its default first page.
    async fn create_document(&self, name: &str) -> CoreResult<(Document, Page)>;

    /// Rename a document.
    async fn rename_document(&self, id: DocumentId, name: &str) -> CoreResult<Document>;

    /// Delete a document and all of its pages.
    async fn delete_document(&self, id: DocumentId) -> CoreResult<DocumentId>;

    /// All documents, most recently updated first.
    async fn list_documents(&self) -> CoreResult<Vec<Document>>;

    /// Fetch a single document.
    async fn get_document(&self, id: DocumentId) -> CoreResult<Document>;
}

/// On-disk representation of one document.
#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    document: Document,
    pages: Vec<Page>,
}

#[derive(Debug, Default)]
struct StoreState {
    documents: HashMap<DocumentId, Document>,
    pages: HashMap<PageId, Page>,
}

impl StoreState {
    fn sorted_pages(&self, document_id: DocumentId) -> Vec<Page> {
        let mut pages: Vec<Page> = self
            .pages
            .values()
            .filter(|p| p.document_id == document_id)
            .cloned()
            .collect();
        pages.sort_by_key(|p| p.position);
        pages
    }

    fn touch_document(&mut self, id: DocumentId, now: u64) {
        if let Some(doc) = self.documents.get_mut(&id) {
            doc.updated_at = now;
        }
    }
}

/// Thread-safe in-memory store with optional JSON persistence.
///
/// Every mutation happens under a single write lock, so delete-and-renumber
/// is observed atomically by readers.
///
/// # Example
///
/// ```
/// use folio_core::store::{DocumentStore, MemoryStore, PageStore};
///
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// rt.block_on(async {
///     let store = MemoryStore::new();
///     let (doc, first) = store.create_document("Demo").await.unwrap();
///     assert_eq!(first.position, 1);
///     assert_eq!(store.list_pages(doc.id).await.unwrap().len(), 1);
/// });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
    /// Optional data directory for filesystem persistence.
    data_dir: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty store (no persistence).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with filesystem persistence.
    ///
    /// Documents are saved as JSON files in `data_dir`. The directory is
    /// created if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the directory cannot be created.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> CoreResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self {
            state: Arc::default(),
            data_dir: Some(data_dir),
        })
    }

    /// Discover and load all persisted documents from the data directory.
    ///
    /// Returns the IDs of the documents that were loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory can't be read or a file is
    /// not a valid stored document.
    pub fn load_from_disk(&self) -> CoreResult<Vec<DocumentId>> {
        let data_dir = self
            .data_dir
            .as_ref()
            .ok_or_else(|| CoreError::InvalidOperation("No data directory configured".into()))?;

        let mut loaded = Vec::new();
        for entry in std::fs::read_dir(data_dir)? {
            let path = entry?.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let contents = std::fs::read_to_string(&path)?;
            let stored: StoredDocument = serde_json::from_str(&contents)?;

            let mut state = self
                .state
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let id = stored.document.id;
            state.pages.retain(|_, p| p.document_id != id);
            for page in stored.pages {
                state.pages.insert(page.id, page);
            }
            state.documents.insert(id, stored.document);
            loaded.push(id);
        }
        tracing::debug!("Loaded {} documents from disk", loaded.len());
        Ok(loaded)
    }

    /// Save one document and its pages to disk.
    ///
    /// No-op if the store was created without a data directory. On failure
    /// the in-memory state keeps the change and the next successful write
    /// persists it.
    fn persist_document(&self, id: DocumentId) -> CoreResult<()> {
        let Some(ref data_dir) = self.data_dir else {
            return Ok(());
        };
        let stored = {
            let state = self
                .state
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let Some(document) = state.documents.get(&id).cloned() else {
                return Ok(());
            };
            StoredDocument {
                document,
                pages: state.sorted_pages(id),
            }
        };
        let json = serde_json::to_string_pretty(&stored)?;
        let path = data_dir.join(format!("{id}.json"));
        std::fs::write(&path, json).map_err(|e| {
            tracing::warn!("Failed to persist document {id} to {}: {e}", path.display());
            CoreError::Io(e)
        })
    }

    /// Remove a document's persisted file from disk.
    fn delete_document_file(&self, id: DocumentId) -> CoreResult<()> {
        let Some(ref data_dir) = self.data_dir else {
            return Ok(());
        };
        let path = data_dir.join(format!("{id}.json"));
        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                tracing::warn!("Failed to delete document file {}: {e}", path.display());
                Err(CoreError::Io(e))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl PageStore for MemoryStore {
    async fn create_page(&self, page: NewPage) -> CoreResult<Page> {
        let created = {
            let mut state = self
                .state
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if !state.documents.contains_key(&page.document_id) {
                return Err(CoreError::NotFound(format!("document {}", page.document_id)));
            }
            let count = state
                .pages
                .values()
                .filter(|p| p.document_id == page.document_id)
                .count();
            let max_position = u32::try_from(count + 1)
                .map_err(|_| CoreError::InvalidOperation("too many pages".to_string()))?;
            if page.position == 0 || page.position > max_position {
                return Err(CoreError::InvalidOperation(format!(
                    "page position {} outside 1..={max_position}",
                    page.position
                )));
            }

            let now = current_timestamp_ms();
            for existing in state.pages.values_mut() {
                if existing.document_id == page.document_id && existing.position >= page.position {
                    existing.position += 1;
                    existing.updated_at = now;
                }
            }
            let created = Page {
                id: PageId::new(),
                document_id: page.document_id,
                position: page.position,
                name: page.name,
                scene: page.scene,
                width: page.width,
                height: page.height,
                created_at: now,
                updated_at: now,
            };
            state.pages.insert(created.id, created.clone());
            state.touch_document(created.document_id, now);
            created
        };
        tracing::debug!(
            "Created page {} at position {} in document {}",
            created.id,
            created.position,
            created.document_id
        );
        self.persist_document(created.document_id)?;
        Ok(created)
    }

    async fn update_page(&self, id: PageId, patch: PagePatch) -> CoreResult<Page> {
        let updated = {
            let mut state = self
                .state
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let now = current_timestamp_ms();
            let page = state
                .pages
                .get_mut(&id)
                .ok_or_else(|| CoreError::NotFound(format!("page {id}")))?;
            if let Some(scene) = patch.scene {
                page.scene = scene;
            }
            if let Some(width) = patch.width {
                page.width = width;
            }
            if let Some(height) = patch.height {
                page.height = height;
            }
            if let Some(name) = patch.name {
                page.name = name;
            }
            page.updated_at = now;
            let updated = page.clone();
            state.touch_document(updated.document_id, now);
            updated
        };
        self.persist_document(updated.document_id)?;
        Ok(updated)
    }

    async fn delete_page(&self, id: PageId) -> CoreResult<PageId> {
        let document_id = {
            let mut state = self
                .state
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let removed = state
                .pages
                .remove(&id)
                .ok_or_else(|| CoreError::NotFound(format!("page {id}")))?;
            let now = current_timestamp_ms();
            for page in state.pages.values_mut() {
                if page.document_id == removed.document_id && page.position > removed.position {
                    page.position -= 1;
                    page.updated_at = now;
                }
            }
            state.touch_document(removed.document_id, now);
            removed.document_id
        };
        tracing::debug!("Deleted page {id} from document {document_id}");
        self.persist_document(document_id)?;
        Ok(id)
    }

    async fn list_pages(&self, document_id: DocumentId) -> CoreResult<Vec<Page>> {
        let state = self
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !state.documents.contains_key(&document_id) {
            return Err(CoreError::NotFound(format!("document {document_id}")));
        }
        Ok(state.sorted_pages(document_id))
    }

    async fn get_page(&self, id: PageId) -> CoreResult<Page> {
        let state = self
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        state
            .pages
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("page {id}")))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_document(&self, name: &str) -> CoreResult<(Document, Page)> {
        let now = current_timestamp_ms();
        let document = Document {
            id: DocumentId::new(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        let first =
            NewPage::with_default_scene(document.id, 1, DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT)?;
        let page = Page {
            id: PageId::new(),
            document_id: document.id,
            position: first.position,
            name: first.name,
            scene: first.scene,
            width: first.width,
            height: first.height,
            created_at: now,
            updated_at: now,
        };
        {
            let mut state = self
                .state
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            state.documents.insert(document.id, document.clone());
            state.pages.insert(page.id, page.clone());
        }
        tracing::debug!("Created document {} ({name})", document.id);
        self.persist_document(document.id)?;
        Ok((document, page))
    }

    async fn rename_document(&self, id: DocumentId, name: &str) -> CoreResult<Document> {
        let renamed = {
            let mut state = self
                .state
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let doc = state
                .documents
                .get_mut(&id)
                .ok_or_else(|| CoreError::NotFound(format!("document {id}")))?;
            doc.name = name.to_string();
            doc.updated_at = current_timestamp_ms();
            doc.clone()
        };
        self.persist_document(id)?;
        Ok(renamed)
    }

    async fn delete_document(&self, id: DocumentId) -> CoreResult<DocumentId> {
        {
            let mut state = self
                .state
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            state
                .documents
                .remove(&id)
                .ok_or_else(|| CoreError::NotFound(format!("document {id}")))?;
            state.pages.retain(|_, p| p.document_id != id);
        }
        self.delete_document_file(id)?;
        Ok(id)
    }

    async fn list_documents(&self) -> CoreResult<Vec<Document>> {
        let state = self
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut docs: Vec<Document> = state.documents.values().cloned().collect();
        docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(docs)
    }

    async fn get_document(&self, id: DocumentId) -> CoreResult<Document> {
        let state = self
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        state
            .documents
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("document {id}")))
    }
}
