//! End-to-end editor tests: page switching, autosave round trips, page
//! management and failure handling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use folio_core::{
    CoreError, CoreResult, DocumentId, DocumentStore, MemoryStore, NewPage, Page, PageId,
    PagePatch, PageStore, Scene, SceneObject, Size,
};
use folio_editor::{Editor, EditorConfig, EditorError, LoadOutcome, Severity};
use folio_renderer::OffscreenFactory;

/// Delegates to a memory store; update calls fail while `failing` is set,
/// delete calls while `failing_deletes` is set.
struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
    failing_deletes: AtomicBool,
}

impl FlakyStore {
    fn wrap(inner: &MemoryStore) -> Self {
        Self {
            inner: inner.clone(),
            failing: AtomicBool::new(false),
            failing_deletes: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl PageStore for FlakyStore {
    async fn create_page(&self, page: NewPage) -> CoreResult<Page> {
        self.inner.create_page(page).await
    }
    async fn update_page(&self, id: PageId, patch: PagePatch) -> CoreResult<Page> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::Store("network unreachable".into()));
        }
        self.inner.update_page(id, patch).await
    }
    async fn delete_page(&self, id: PageId) -> CoreResult<PageId> {
        if self.failing_deletes.load(Ordering::SeqCst) {
            return Err(CoreError::Store("network unreachable".into()));
        }
        self.inner.delete_page(id).await
    }
    async fn list_pages(&self, document_id: DocumentId) -> CoreResult<Vec<Page>> {
        self.inner.list_pages(document_id).await
    }
    async fn get_page(&self, id: PageId) -> CoreResult<Page> {
        self.inner.get_page(id).await
    }
}

async fn demo_document(pages: u32) -> (Arc<MemoryStore>, DocumentId) {
    let store = Arc::new(MemoryStore::new());
    let (doc, _) = store.create_document("Demo").await.expect("create");
    for position in 2..=pages {
        let page = NewPage::with_default_scene(doc.id, position, 800, 600).expect("page");
        store.create_page(page).await.expect("create page");
    }
    (store, doc.id)
}

async fn open_editor(store: Arc<dyn PageStore>, doc: DocumentId) -> Editor {
    Editor::open(
        store,
        Arc::new(OffscreenFactory::default()),
        doc,
        Size::new(1280.0, 720.0),
        EditorConfig::default(),
    )
    .await
    .expect("open editor")
}

fn stored_object_count(page: &Page) -> usize {
    Scene::from_json(&page.scene).expect("decode").object_count()
}

#[tokio::test(start_paused = true)]
async fn test_edit_is_autosaved_after_quiet_window() {
    let (store, doc) = demo_document(1).await;
    let mut editor = open_editor(store.clone(), doc).await;
    let page_id = editor.active_page().expect("active page");

    editor
        .edit(|scene| scene.add_object(SceneObject::rect(10.0, 10.0, 100.0, 50.0)))
        .expect("edit");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(stored_object_count(&store.get_page(page_id).await.expect("page")), 1);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(stored_object_count(&store.get_page(page_id).await.expect("page")), 2);

    editor.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_switching_pages_flushes_and_reloads() {
    let (store, doc) = demo_document(2).await;
    let mut editor = open_editor(store.clone(), doc).await;
    let first = editor.pages()[0].id;
    let second = editor.pages()[1].id;

    editor
        .edit(|scene| scene.add_object(SceneObject::text("Hello", 20.0, 20.0, 32.0)))
        .expect("edit");

    // Switch before the quiet window ends: the edit is flushed, not lost.
    let outcome = editor.select_page(second).await.expect("select second");
    assert!(matches!(outcome, LoadOutcome::Ready(_)));
    assert_eq!(stored_object_count(&store.get_page(first).await.expect("page")), 2);

    editor.select_page(first).await.expect("select first");
    let handle = editor.active_handle().expect("handle");
    let surface = editor.runtime().surface(&handle).expect("surface");
    assert_eq!(surface.scene().map(Scene::object_count), Some(2));

    editor.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_add_page_appends_default_page() {
    let (store, doc) = demo_document(1).await;
    let mut editor = open_editor(store.clone(), doc).await;

    let page = editor.add_page().await.expect("add page");
    assert_eq!(page.position, 2);
    assert_eq!(page.name, "Page 2");
    assert_eq!((page.width, page.height), (800, 600));

    let scene = Scene::from_json(&page.scene).expect("decode");
    assert!(scene.check_boundary(800.0, 600.0).is_ok());
    assert_eq!(editor.pages().len(), 2);

    editor.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_last_page_cannot_be_deleted() {
    let (store, doc) = demo_document(1).await;
    let mut editor = open_editor(store.clone(), doc).await;
    let only = editor.pages()[0].id;

    assert!(matches!(
        editor.delete_page(only).await,
        Err(EditorError::LastPage)
    ));
    assert_eq!(store.list_pages(doc).await.expect("list").len(), 1);

    editor.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_deleting_middle_page_renumbers() {
    let (store, doc) = demo_document(3).await;
    let mut editor = open_editor(store.clone(), doc).await;
    let old_third = editor.pages()[2].id;
    let middle = editor.pages()[1].id;

    editor.select_page(middle).await.expect("select middle");
    editor.delete_page(middle).await.expect("delete");

    let positions: Vec<(PageId, u32)> = editor.pages().iter().map(|p| (p.id, p.position)).collect();
    assert_eq!(positions.len(), 2);
    assert_eq!(positions[1], (old_third, 2));
    // The page that moved into the deleted slot becomes active.
    assert_eq!(editor.active_page(), Some(old_third));

    editor.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_keeps_local_edits() {
    let (memory, doc) = demo_document(1).await;
    let store = Arc::new(FlakyStore::wrap(&memory));
    store.failing.store(true, Ordering::SeqCst);
    let mut editor = open_editor(store.clone(), doc).await;
    let mut notifications = editor.notifications();
    let page_id = editor.active_page().expect("active");

    editor
        .edit(|scene| scene.add_object(SceneObject::rect(0.0, 0.0, 10.0, 10.0)))
        .expect("edit");
    tokio::time::sleep(Duration::from_millis(600)).await;

    let notification = notifications.recv().await.expect("notification");
    assert_eq!(notification.severity, Severity::Error);
    assert!(notification.dismissible);

    let handle = editor.active_handle().expect("handle");
    let surface = editor.runtime().surface(&handle).expect("surface");
    assert_eq!(surface.scene().map(Scene::object_count), Some(2));

    // Connectivity returns: the next edit persists the full scene.
    store.failing.store(false, Ordering::SeqCst);
    editor
        .edit(|scene| scene.add_object(SceneObject::rect(20.0, 20.0, 10.0, 10.0)))
        .expect("edit");
    editor.close().await;

    assert_eq!(stored_object_count(&memory.get_page(page_id).await.expect("page")), 3);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_page_opens_degraded() {
    let (store, doc) = demo_document(1).await;
    let page_id = store.list_pages(doc).await.expect("list")[0].id;
    store
        .update_page(
            page_id,
            PagePatch {
                scene: Some("\"not a scene\"".to_string()),
                ..PagePatch::default()
            },
        )
        .await
        .expect("corrupt");

    let mut editor = open_editor(store.clone(), doc).await;
    assert_eq!(editor.active_page(), Some(page_id));
    assert!(matches!(
        editor.edit(|scene| scene.object_count()),
        Err(EditorError::NotLoaded)
    ));
    editor.close().await;

    // Nothing was written over the stored scene.
    let page = store.get_page(page_id).await.expect("page");
    assert_eq!(page.scene, "\"not a scene\"");
}

#[tokio::test(start_paused = true)]
async fn test_resize_refits_with_padding() {
    let (store, doc) = demo_document(1).await;
    let mut editor = open_editor(store, doc).await;

    let fit = editor.resize(Size::new(400.0, 300.0)).expect("resize");
    let fitted = fit.fitted().expect("fitted");
    assert!((fitted.scale - 0.5).abs() < f32::EPSILON);
    assert!((fitted.zoom - 0.425).abs() < 1e-6);

    editor.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_closed_editor_persists_to_data_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(MemoryStore::with_data_dir(dir.path()).expect("store"));
    let (doc, first) = store.create_document("On disk").await.expect("create");

    let mut editor = open_editor(store.clone(), doc.id).await;
    editor
        .edit(|scene| scene.add_object(SceneObject::rect(50.0, 50.0, 20.0, 20.0)))
        .expect("edit");
    editor.close().await;

    let reopened = MemoryStore::with_data_dir(dir.path()).expect("store");
    assert_eq!(reopened.load_from_disk().expect("load"), vec![doc.id]);
    let page = reopened.get_page(first.id).await.expect("page");
    assert_eq!(stored_object_count(&page), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_delete_keeps_active_page_editable() {
    let (memory, doc) = demo_document(2).await;
    let store = Arc::new(FlakyStore::wrap(&memory));
    store.failing_deletes.store(true, Ordering::SeqCst);
    let mut editor = open_editor(store.clone(), doc).await;
    let active = editor.active_page().expect("active");

    let result = editor.delete_page(active).await;
    assert!(matches!(result, Err(EditorError::Core(CoreError::Store(_)))));
    assert_eq!(editor.active_page(), Some(active));
    assert_eq!(editor.pages().len(), 2);

    editor
        .edit(|scene| scene.add_object(SceneObject::rect(5.0, 5.0, 10.0, 10.0)))
        .expect("edit after failed delete");
    editor.close().await;

    assert_eq!(stored_object_count(&memory.get_page(active).await.expect("page")), 2);
}
