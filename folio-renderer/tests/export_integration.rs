//! Integration tests for whole-document export.
//!
//! Covers archive naming, PDF framing, JSON output, failure handling and the
//! one-surface-at-a-time guarantee.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use folio_core::{
    CoreError, CoreResult, DocumentId, DocumentStore, MemoryStore, NewPage, Page, PageId,
    PagePatch, PageStore, Scene, SceneObject, ViewportTransform,
};
use folio_renderer::{
    ExportConfig, ExportFormat, ExportOptions, ExportPipeline, OffscreenFactory, OffscreenSurface,
    Orientation, PdfLayout, RasterConfig, RasterFormat, RenderError, RenderResult, RenderSurface,
    SurfaceFactory,
};

/// Tracks how many surfaces are alive at once.
#[derive(Default)]
struct Counters {
    live: AtomicUsize,
    peak: AtomicUsize,
    created: AtomicUsize,
}

struct CountingSurface {
    inner: OffscreenSurface,
    counters: Arc<Counters>,
}

impl RenderSurface for CountingSurface {
    fn size(&self) -> (u32, u32) {
        self.inner.size()
    }
    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.inner.resize(width, height)
    }
    fn load_scene(&mut self, scene: Scene) -> RenderResult<()> {
        self.inner.load_scene(scene)
    }
    fn scene(&self) -> Option<&Scene> {
        self.inner.scene()
    }
    fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.inner.scene_mut()
    }
    fn set_viewport(&mut self, transform: ViewportTransform) -> RenderResult<()> {
        self.inner.set_viewport(transform)
    }
    fn viewport(&self) -> ViewportTransform {
        self.inner.viewport()
    }
    fn set_clip_path(&mut self, clip: Option<SceneObject>) -> RenderResult<()> {
        self.inner.set_clip_path(clip)
    }
    fn clip_path(&self) -> Option<&SceneObject> {
        self.inner.clip_path()
    }
    fn rasterize(&self, format: RasterFormat) -> RenderResult<Vec<u8>> {
        self.inner.rasterize(format)
    }
    fn dispose(&mut self) {
        if !self.inner.is_disposed() {
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
        }
        self.inner.dispose();
    }
    fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

struct CountingFactory {
    counters: Arc<Counters>,
}

impl SurfaceFactory for CountingFactory {
    fn create(&self, width: u32, height: u32) -> RenderResult<Box<dyn RenderSurface>> {
        let inner = OffscreenSurface::new(width, height, RasterConfig::default())?;
        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(live, Ordering::SeqCst);
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingSurface {
            inner,
            counters: Arc::clone(&self.counters),
        }))
    }
}

/// A store whose list call always fails.
struct UnreachableStore;

#[async_trait]
impl PageStore for UnreachableStore {
    async fn create_page(&self, _page: NewPage) -> CoreResult<Page> {
        Err(CoreError::Store("offline".into()))
    }
    async fn update_page(&self, _id: PageId, _patch: PagePatch) -> CoreResult<Page> {
        Err(CoreError::Store("offline".into()))
    }
    async fn delete_page(&self, _id: PageId) -> CoreResult<PageId> {
        Err(CoreError::Store("offline".into()))
    }
    async fn list_pages(&self, _document_id: DocumentId) -> CoreResult<Vec<Page>> {
        Err(CoreError::Store("offline".into()))
    }
    async fn get_page(&self, id: PageId) -> CoreResult<Page> {
        Err(CoreError::NotFound(id.to_string()))
    }
}

/// A document with pages of the given sizes, each with one red square.
async fn document_with_pages(sizes: &[(u32, u32)]) -> (Arc<MemoryStore>, DocumentId) {
    let store = Arc::new(MemoryStore::new());
    let (doc, first) = store.create_document("Demo").await.expect("create document");
    store.delete_page(first.id).await.expect("drop default page");

    for (idx, &(w, h)) in sizes.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let mut scene = Scene::with_clip_boundary(w as f32, h as f32);
        scene.add_object(SceneObject::rect(10.0, 10.0, 50.0, 50.0).with_fill("#ff0000"));
        let position = u32::try_from(idx + 1).expect("position");
        store
            .create_page(NewPage {
                document_id: doc.id,
                position,
                name: format!("Page {position}"),
                scene: scene.to_json().expect("encode"),
                width: w,
                height: h,
            })
            .await
            .expect("create page");
    }
    (store, doc.id)
}

fn counting_pipeline(store: Arc<dyn PageStore>) -> (ExportPipeline, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let factory = Arc::new(CountingFactory {
        counters: Arc::clone(&counters),
    });
    (
        ExportPipeline::new(store, factory, ExportConfig::default()),
        counters,
    )
}

#[tokio::test]
async fn test_png_archive_entries() {
    let (store, doc) = document_with_pages(&[(200, 150), (120, 90), (64, 64)]).await;
    let (pipeline, counters) = counting_pipeline(store);

    let artifact = pipeline
        .export(doc, ExportFormat::Png, &ExportOptions::named("deck"))
        .await
        .expect("export");
    assert_eq!(artifact.file_name, "deck.zip");
    assert_eq!(artifact.content_type, "application/zip");

    let mut archive = zip::ZipArchive::new(Cursor::new(artifact.bytes)).expect("zip");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(
        names,
        vec!["deck-page-1.png", "deck-page-2.png", "deck-page-3.png"]
    );

    let mut entry = archive.by_name("deck-page-2.png").expect("entry");
    let mut png = Vec::new();
    std::io::Read::read_to_end(&mut entry, &mut png).expect("read");
    let image = image::load_from_memory(&png).expect("decode");
    assert_eq!((image.width(), image.height()), (120, 90));

    assert_eq!(counters.created.load(Ordering::SeqCst), 3);
    assert_eq!(counters.peak.load(Ordering::SeqCst), 1);
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    assert!(!pipeline.is_exporting());
}

#[tokio::test]
async fn test_jpg_archive_uses_default_name() {
    let (store, doc) = document_with_pages(&[(80, 60)]).await;
    let pipeline = ExportPipeline::new(
        store,
        Arc::new(OffscreenFactory::default()),
        ExportConfig::default(),
    );

    let artifact = pipeline
        .export(doc, ExportFormat::Jpg, &ExportOptions::default())
        .await
        .expect("export");
    assert_eq!(artifact.file_name, "export.zip");

    let archive = zip::ZipArchive::new(Cursor::new(artifact.bytes)).expect("zip");
    let names: Vec<&str> = archive.file_names().collect();
    assert_eq!(names, vec!["export-page-1.jpg"]);
}

#[tokio::test]
async fn test_archive_named_after_document() {
    let (store, doc) = document_with_pages(&[(80, 60), (80, 60)]).await;
    let document_name = store.get_document(doc).await.expect("document").name;
    let pipeline = ExportPipeline::new(
        store,
        Arc::new(OffscreenFactory::default()),
        ExportConfig::default(),
    );

    let options = ExportOptions::default().or_named(format!("{document_name}/Q3"));
    let artifact = pipeline
        .export(doc, ExportFormat::Png, &options)
        .await
        .expect("export");
    assert_eq!(artifact.file_name, "Demo-Q3.zip");

    let archive = zip::ZipArchive::new(Cursor::new(artifact.bytes)).expect("zip");
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Demo-Q3-page-1.png", "Demo-Q3-page-2.png"]);
}

/// Operators of every page content stream, in page order.
fn pdf_page_operators(bytes: &[u8]) -> (Vec<String>, Vec<Vec<String>>) {
    use printpdf::lopdf;

    let pdf = lopdf::Document::load_mem(bytes).expect("parse pdf");
    let mut media_boxes = Vec::new();
    let mut operators = Vec::new();
    for page_id in pdf.get_pages().into_values() {
        let dict = pdf.get_object(page_id).and_then(lopdf::Object::as_dict).expect("page");
        media_boxes.push(format!("{:?}", dict.get(b"MediaBox").expect("media box")));

        let content = pdf.get_page_content(page_id).expect("content");
        let ops = lopdf::content::Content::decode(&content)
            .expect("decode content")
            .operations
            .into_iter()
            .map(|op| op.operator)
            .collect();
        operators.push(ops);
    }
    (media_boxes, operators)
}

#[tokio::test]
async fn test_pdf_export() {
    let (store, doc) = document_with_pages(&[(600, 800), (800, 800)]).await;
    let (pipeline, counters) = counting_pipeline(store);

    let artifact = pipeline
        .export(doc, ExportFormat::Pdf, &ExportOptions::default())
        .await
        .expect("export");
    assert_eq!(artifact.file_name, "export.pdf");
    assert!(artifact.bytes.starts_with(b"%PDF"));
    assert_eq!(counters.created.load(Ordering::SeqCst), 2);
    assert_eq!(counters.peak.load(Ordering::SeqCst), 1);
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);

    // The square page is letterboxed inside the portrait frame of page one.
    let layout = PdfLayout::plan(&[(600, 800), (800, 800)]).expect("plan");
    assert_eq!(layout.orientation, Orientation::Portrait);
    let square = layout.placements[1];
    assert!((square.scale - 0.75).abs() < 1e-6);
    assert!(square.offset_x.abs() < 1e-3);
    assert!((square.offset_y - 100.0).abs() < 1e-3);

    let (media_boxes, operators) = pdf_page_operators(&artifact.bytes);
    assert_eq!(media_boxes.len(), 2);
    assert_eq!(media_boxes[0], media_boxes[1]);

    for ops in &operators {
        let position = |name: &str| ops.iter().position(|op| op == name);
        let fill_color = position("rg").expect("fill colour");
        let rect = position("re").expect("background rect");
        let fill = ops
            .iter()
            .position(|op| matches!(op.as_str(), "f" | "f*" | "F"))
            .expect("background fill");
        let image = position("Do").expect("page image");
        assert!(fill_color < rect);
        assert!(rect < fill);
        assert!(fill < image);
    }
}

#[tokio::test]
async fn test_json_export_is_sorted_and_pretty() {
    let (store, doc) = document_with_pages(&[(100, 100), (200, 100)]).await;
    let (pipeline, counters) = counting_pipeline(store);

    let artifact = pipeline
        .export(doc, ExportFormat::Json, &ExportOptions::default())
        .await
        .expect("export");
    assert_eq!(artifact.file_name, "export.json");
    let text = String::from_utf8(artifact.bytes).expect("utf8");
    assert!(text.contains("\n  "));

    let pages: Vec<Page> = serde_json::from_str(&text).expect("pages");
    let positions: Vec<u32> = pages.iter().map(|p| p.position).collect();
    assert_eq!(positions, vec![1, 2]);
    assert!(pages.iter().all(|p| Scene::from_json(&p.scene).is_ok()));
    assert_eq!(counters.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_zero_pages_is_an_error() {
    let store = Arc::new(MemoryStore::new());
    let (doc, first) = store.create_document("Empty").await.expect("create");
    store.delete_page(first.id).await.expect("delete");
    let (pipeline, _) = counting_pipeline(store);

    for format in [
        ExportFormat::Png,
        ExportFormat::Jpg,
        ExportFormat::Pdf,
        ExportFormat::Json,
    ] {
        let result = pipeline
            .export(doc.id, format, &ExportOptions::default())
            .await;
        assert!(matches!(result, Err(RenderError::NoPages)), "{format:?}");
        assert!(!pipeline.is_exporting());
    }
}

#[tokio::test]
async fn test_malformed_scene_aborts_and_releases() {
    let (store, doc) = document_with_pages(&[(100, 100), (100, 100), (100, 100)]).await;
    let pages = store.list_pages(doc).await.expect("list");
    store
        .update_page(
            pages[1].id,
            PagePatch {
                scene: Some("{not json".to_string()),
                ..PagePatch::default()
            },
        )
        .await
        .expect("corrupt");
    let (pipeline, counters) = counting_pipeline(store);

    let result = pipeline
        .export(doc, ExportFormat::Png, &ExportOptions::default())
        .await;
    assert!(matches!(
        result,
        Err(RenderError::Core(CoreError::MalformedScene(_)))
    ));
    assert!(!pipeline.is_exporting());
    assert_eq!(counters.created.load(Ordering::SeqCst), 1);
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_store_failure_releases_flag() {
    let (pipeline, _) = counting_pipeline(Arc::new(UnreachableStore));
    let result = pipeline
        .export(DocumentId::new(), ExportFormat::Pdf, &ExportOptions::default())
        .await;
    assert!(matches!(result, Err(RenderError::Core(CoreError::Store(_)))));
    assert!(!pipeline.is_exporting());
}

#[tokio::test]
async fn test_unknown_document_is_not_found() {
    let (pipeline, _) = counting_pipeline(Arc::new(MemoryStore::new()));
    let result = pipeline
        .export(DocumentId::new(), ExportFormat::Json, &ExportOptions::default())
        .await;
    assert!(matches!(result, Err(RenderError::Core(CoreError::NotFound(_)))));
}
