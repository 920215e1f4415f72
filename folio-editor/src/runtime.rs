//! Canvas runtime controller.
//!
//! The controller owns at most one live [`RenderSurface`], bound to one
//! page's scene. Every attach starts a new session identified by a
//! monotonically increasing [`SessionToken`]; handles and load tickets carry
//! the token they were issued under, and anything presented with a token
//! other than the current one is ignored (load results) or rejected (edits).
//!
//! Loading is split in two so the decode can happen off the caller's task:
//!
//! ```text
//! attach ──▶ LoadTicket ──decode──▶ DecodedScene ──finish_load──▶ Ready | Degraded | Stale
//! ```

use std::sync::Arc;

use folio_core::{CoreResult, FitOutcome, Page, PageId, Scene, SceneObject, Size, ViewportFit};
use folio_renderer::RenderSurface;
use serde_json::Value;

use crate::{EditorError, EditorResult};

/// Identity of one runtime session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Raw token value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// What a session is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Edits allowed; mutations are reported to the observer.
    Edit,
    /// View only.
    ReadOnly,
}

/// A scene snapshot emitted after every structural change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneChange {
    /// Page the scene belongs to.
    pub page_id: PageId,
    /// Serialized scene.
    pub scene: String,
    /// Page width in pixels.
    pub width: u32,
    /// Page height in pixels.
    pub height: u32,
}

/// Receives mutation notifications from the controller, in edit order.
pub trait MutationObserver: Send + Sync {
    /// Called once per structural change of an initialized edit session.
    fn on_mutation(&self, change: SceneChange);
}

/// Caller-side reference to an attached session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeHandle {
    token: SessionToken,
    page_id: PageId,
}

impl RuntimeHandle {
    /// The session token.
    #[must_use]
    pub fn token(&self) -> SessionToken {
        self.token
    }

    /// The page bound to the session.
    #[must_use]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

/// Pending scene load for a session.
#[derive(Debug)]
pub struct LoadTicket {
    token: SessionToken,
    page_id: PageId,
    scene: String,
}

impl LoadTicket {
    /// The session this load belongs to.
    #[must_use]
    pub fn token(&self) -> SessionToken {
        self.token
    }

    /// Decode the scene. Does not touch the controller.
    #[must_use]
    pub fn decode(self) -> DecodedScene {
        DecodedScene {
            token: self.token,
            page_id: self.page_id,
            scene: Scene::from_json(&self.scene),
        }
    }
}

/// Result of [`LoadTicket::decode`], applied with
/// [`RuntimeController::finish_load`].
#[derive(Debug)]
pub struct DecodedScene {
    token: SessionToken,
    page_id: PageId,
    scene: CoreResult<Scene>,
}

/// Result of applying a decoded scene.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Scene loaded and fitted.
    Ready(FitOutcome),
    /// Loaded into a degraded state: the scene could not be decoded, or it
    /// has no clip boundary to fit.
    Degraded,
    /// The session was superseded; nothing was applied.
    Stale,
}

struct Session {
    token: SessionToken,
    page_id: PageId,
    width: u32,
    height: u32,
    surface: Box<dyn RenderSurface>,
    container: Size,
    initialized: bool,
    load_failed: bool,
}

impl Session {
    fn dispose(mut self) {
        self.surface.dispose();
        tracing::debug!(
            "Detached session {} for page {}",
            self.token.0,
            self.page_id
        );
    }
}

/// Owns the live surface and its session lifecycle.
pub struct RuntimeController {
    session: Option<Session>,
    next_token: u64,
    capability: Capability,
    fitter: ViewportFit,
    observer: Option<Arc<dyn MutationObserver>>,
}

impl RuntimeController {
    /// A controller with the given capability and fit policy.
    #[must_use]
    pub fn new(capability: Capability, fitter: ViewportFit) -> Self {
        Self {
            session: None,
            next_token: 0,
            capability,
            fitter,
            observer: None,
        }
    }

    /// An edit controller reporting mutations to `observer`.
    #[must_use]
    pub fn editing(fitter: ViewportFit, observer: Arc<dyn MutationObserver>) -> Self {
        let mut controller = Self::new(Capability::Edit, fitter);
        controller.observer = Some(observer);
        controller
    }

    /// A read-only controller with the uncapped presentation fit.
    #[must_use]
    pub fn read_only() -> Self {
        Self::new(Capability::ReadOnly, ViewportFit::presentation())
    }

    /// The controller's capability.
    #[must_use]
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Token of the live session, if any.
    #[must_use]
    pub fn current_token(&self) -> Option<SessionToken> {
        self.session.as_ref().map(|s| s.token)
    }

    /// Page of the live session, if any.
    #[must_use]
    pub fn active_page(&self) -> Option<PageId> {
        self.session.as_ref().map(|s| s.page_id)
    }

    /// Whether the live session has finished loading.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.initialized)
    }

    /// Bind `surface` to `page`, replacing any live session.
    ///
    /// The previous surface is disposed before the new session exists. The
    /// returned ticket must be decoded and passed to
    /// [`finish_load`](Self::finish_load) to complete the load.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be sized to the page; the
    /// surface is disposed in that case.
    pub fn attach(
        &mut self,
        mut surface: Box<dyn RenderSurface>,
        container: Size,
        page: &Page,
    ) -> EditorResult<(RuntimeHandle, LoadTicket)> {
        self.detach_current();

        if let Err(e) = surface.resize(page.width, page.height) {
            surface.dispose();
            return Err(e.into());
        }

        self.next_token += 1;
        let token = SessionToken(self.next_token);
        self.session = Some(Session {
            token,
            page_id: page.id,
            width: page.width,
            height: page.height,
            surface,
            container,
            initialized: false,
            load_failed: false,
        });
        tracing::debug!(
            "Attached session {} for page {} ({}x{})",
            token.0,
            page.id,
            page.width,
            page.height
        );

        Ok((
            RuntimeHandle {
                token,
                page_id: page.id,
            },
            LoadTicket {
                token,
                page_id: page.id,
                scene: page.scene.clone(),
            },
        ))
    }

    /// Apply a decoded scene to its session.
    ///
    /// A result for a superseded session is discarded and reported as
    /// [`LoadOutcome::Stale`]. A scene that failed to decode leaves the
    /// surface empty and read-only rather than failing the session.
    ///
    /// # Errors
    ///
    /// Returns an error only if the surface itself rejects the scene.
    #[allow(clippy::cast_precision_loss)]
    pub fn finish_load(&mut self, decoded: DecodedScene) -> EditorResult<LoadOutcome> {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|s| s.token == decoded.token)
        else {
            tracing::debug!(
                "Discarding stale load for page {} (session {})",
                decoded.page_id,
                decoded.token.0
            );
            return Ok(LoadOutcome::Stale);
        };

        let loaded = match decoded.scene {
            Ok(scene) => {
                if let Err(e) = scene.check_boundary(session.width as f32, session.height as f32) {
                    tracing::warn!("Page {} boundary check: {e}", session.page_id);
                }
                session.surface.load_scene(scene)?;
                true
            }
            Err(e) => {
                tracing::warn!("Page {} scene could not be decoded: {e}", session.page_id);
                session.surface.load_scene(Scene::new())?;
                session.load_failed = true;
                false
            }
        };

        let fit = apply_fit(&self.fitter, session)?;
        session.initialized = true;

        if loaded && !fit.is_degraded() {
            Ok(LoadOutcome::Ready(fit))
        } else {
            Ok(LoadOutcome::Degraded)
        }
    }

    /// Dispose the session behind `handle`. Returns `false` (and does
    /// nothing) if the handle is not the live session.
    pub fn detach(&mut self, handle: &RuntimeHandle) -> bool {
        if self.current_token() != Some(handle.token) {
            return false;
        }
        self.detach_current()
    }

    /// Dispose whatever session is live. Returns whether one was.
    pub fn detach_current(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                session.dispose();
                true
            }
            None => false,
        }
    }

    /// Re-fit the live session to a new container without reloading.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::StaleSession`] for a superseded handle.
    pub fn resize_container(
        &mut self,
        handle: &RuntimeHandle,
        container: Size,
    ) -> EditorResult<FitOutcome> {
        let session = session_for(&mut self.session, handle)?;
        session.container = container;
        if !session.initialized {
            return Ok(FitOutcome::Degraded);
        }
        apply_fit(&self.fitter, session)
    }

    /// Read access to the live surface.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::StaleSession`] for a superseded handle.
    pub fn surface(&self, handle: &RuntimeHandle) -> EditorResult<&dyn RenderSurface> {
        match &self.session {
            Some(s) if s.token == handle.token => Ok(s.surface.as_ref()),
            Some(_) => Err(EditorError::StaleSession),
            None => Err(EditorError::NoActiveSession),
        }
    }

    /// Serialize the current scene of the live session.
    ///
    /// # Errors
    ///
    /// Returns an error for a stale handle or a session that is not loaded.
    pub fn snapshot(&self, handle: &RuntimeHandle) -> EditorResult<SceneChange> {
        let session = match &self.session {
            Some(s) if s.token == handle.token => s,
            Some(_) => return Err(EditorError::StaleSession),
            None => return Err(EditorError::NoActiveSession),
        };
        let scene = session.surface.scene().ok_or(EditorError::NotLoaded)?;
        Ok(SceneChange {
            page_id: session.page_id,
            scene: scene.to_json()?,
            width: session.width,
            height: session.height,
        })
    }

    /// Apply a fallible structural change. The observer is notified once
    /// when `f` succeeds and not at all when it fails.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ReadOnly`], [`EditorError::StaleSession`],
    /// [`EditorError::NotLoaded`], or the error returned by `f`.
    pub fn try_edit<R>(
        &mut self,
        handle: &RuntimeHandle,
        f: impl FnOnce(&mut Scene) -> CoreResult<R>,
    ) -> EditorResult<R> {
        if self.capability == Capability::ReadOnly {
            return Err(EditorError::ReadOnly);
        }
        let session = session_for(&mut self.session, handle)?;
        if !session.initialized || session.load_failed {
            return Err(EditorError::NotLoaded);
        }
        let scene = session.surface.scene_mut().ok_or(EditorError::NotLoaded)?;
        let result = f(scene)?;

        let change = SceneChange {
            page_id: session.page_id,
            scene: scene.to_json()?,
            width: session.width,
            height: session.height,
        };
        if let Some(observer) = &self.observer {
            observer.on_mutation(change);
        }
        Ok(result)
    }

    /// Apply an infallible structural change.
    ///
    /// # Errors
    ///
    /// See [`try_edit`](Self::try_edit).
    pub fn edit<R>(
        &mut self,
        handle: &RuntimeHandle,
        f: impl FnOnce(&mut Scene) -> R,
    ) -> EditorResult<R> {
        self.try_edit(handle, |scene| Ok(f(scene)))
    }

    /// Add an object on top of the scene.
    ///
    /// # Errors
    ///
    /// See [`try_edit`](Self::try_edit).
    pub fn add_object(&mut self, handle: &RuntimeHandle, object: SceneObject) -> EditorResult<usize> {
        self.edit(handle, |scene| scene.add_object(object))
    }

    /// Remove an object. The clip boundary cannot be removed.
    ///
    /// # Errors
    ///
    /// See [`try_edit`](Self::try_edit).
    pub fn remove_object(&mut self, handle: &RuntimeHandle, index: usize) -> EditorResult<SceneObject> {
        self.try_edit(handle, |scene| scene.remove_object(index))
    }

    /// Move an object's top-left corner.
    ///
    /// # Errors
    ///
    /// See [`try_edit`](Self::try_edit).
    pub fn move_object(
        &mut self,
        handle: &RuntimeHandle,
        index: usize,
        left: f32,
        top: f32,
    ) -> EditorResult<()> {
        self.try_edit(handle, |scene| {
            let object = drawable_mut(scene, index)?;
            object.left = left;
            object.top = top;
            Ok(())
        })
    }

    /// Resize an object's unscaled box.
    ///
    /// # Errors
    ///
    /// See [`try_edit`](Self::try_edit).
    pub fn resize_object(
        &mut self,
        handle: &RuntimeHandle,
        index: usize,
        width: f32,
        height: f32,
    ) -> EditorResult<()> {
        self.try_edit(handle, |scene| {
            let object = drawable_mut(scene, index)?;
            object.width = width;
            object.height = height;
            Ok(())
        })
    }

    /// Change an object's fill.
    ///
    /// # Errors
    ///
    /// See [`try_edit`](Self::try_edit).
    pub fn set_fill(
        &mut self,
        handle: &RuntimeHandle,
        index: usize,
        color: impl Into<String>,
    ) -> EditorResult<()> {
        let color = color.into();
        self.try_edit(handle, |scene| {
            drawable_mut(scene, index)?.fill = Some(Value::String(color));
            Ok(())
        })
    }

    /// Add a finished free-drawing stroke as a path object.
    ///
    /// `points` are scene coordinates; the stroke is stored as a polyline
    /// path positioned at its bounding box.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`](folio_core::CoreError) for a
    /// stroke with fewer than two points, or see [`try_edit`](Self::try_edit).
    pub fn complete_stroke(
        &mut self,
        handle: &RuntimeHandle,
        points: &[(f32, f32)],
        color: &str,
        width: f32,
    ) -> EditorResult<usize> {
        let stroke = stroke_object(points, color, width);
        self.try_edit(handle, move |scene| Ok(scene.add_object(stroke?)))
    }
}

impl Drop for RuntimeController {
    fn drop(&mut self) {
        self.detach_current();
    }
}

fn session_for<'a>(
    session: &'a mut Option<Session>,
    handle: &RuntimeHandle,
) -> EditorResult<&'a mut Session> {
    match session {
        Some(s) if s.token == handle.token => Ok(s),
        Some(_) => Err(EditorError::StaleSession),
        None => Err(EditorError::NoActiveSession),
    }
}

/// Recompute the fit and install the viewport and clip path.
fn apply_fit(fitter: &ViewportFit, session: &mut Session) -> EditorResult<FitOutcome> {
    let Some(scene) = session.surface.scene() else {
        return Ok(FitOutcome::Degraded);
    };
    let outcome = fitter.compute(scene, session.container);
    if let FitOutcome::Fitted(fitted) = &outcome {
        session.surface.set_viewport(fitted.transform)?;
        session.surface.set_clip_path(Some(fitted.clip.clone()))?;
    }
    Ok(outcome)
}

fn drawable_mut(scene: &mut Scene, index: usize) -> CoreResult<&mut SceneObject> {
    match scene.object_mut(index) {
        Some(object) if !object.is_clip_boundary() => Ok(object),
        Some(_) => Err(folio_core::CoreError::InvalidOperation(
            "the clip boundary cannot be edited".to_string(),
        )),
        None => Err(folio_core::CoreError::NotFound(format!("object {index}"))),
    }
}

fn stroke_object(points: &[(f32, f32)], color: &str, width: f32) -> CoreResult<SceneObject> {
    let [first, rest @ ..] = points else {
        return Err(folio_core::CoreError::InvalidOperation(
            "a stroke needs at least two points".to_string(),
        ));
    };
    if rest.is_empty() {
        return Err(folio_core::CoreError::InvalidOperation(
            "a stroke needs at least two points".to_string(),
        ));
    }

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.0, first.1, first.0, first.1);
    for &(x, y) in rest {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    let mut commands = vec![serde_json::json!(["M", first.0, first.1])];
    commands.extend(rest.iter().map(|&(x, y)| serde_json::json!(["L", x, y])));

    let (w, h) = (max_x - min_x, max_y - min_y);
    let mut object = SceneObject::new(folio_core::element::kind::PATH)
        .with_geometry(min_x, min_y, w, h)
        .with_stroke(color, width);
    object.extra.insert("path".to_string(), Value::Array(commands));
    object.extra.insert(
        "pathOffset".to_string(),
        serde_json::json!({ "x": min_x + w / 2.0, "y": min_y + h / 2.0 }),
    );
    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{DocumentId, NewPage};
    use folio_renderer::{OffscreenSurface, RasterConfig};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        changes: Mutex<Vec<SceneChange>>,
    }

    impl Recorder {
        fn count(&self) -> usize {
            self.changes.lock().expect("lock").len()
        }
    }

    impl MutationObserver for Recorder {
        fn on_mutation(&self, change: SceneChange) {
            self.changes.lock().expect("lock").push(change);
        }
    }

    fn page(width: u32, height: u32) -> Page {
        let new_page =
            NewPage::with_default_scene(DocumentId::new(), 1, width, height).expect("new page");
        Page {
            id: PageId::new(),
            document_id: new_page.document_id,
            position: 1,
            name: new_page.name,
            scene: new_page.scene,
            width,
            height,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn surface() -> Box<dyn RenderSurface> {
        Box::new(OffscreenSurface::new(1, 1, RasterConfig::default()).expect("surface"))
    }

    fn editing() -> (RuntimeController, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let controller = RuntimeController::editing(ViewportFit::editing(1.0), recorder.clone());
        (controller, recorder)
    }

    fn attach_loaded(controller: &mut RuntimeController, page: &Page) -> RuntimeHandle {
        let (handle, ticket) = controller
            .attach(surface(), Size::new(1000.0, 1000.0), page)
            .expect("attach");
        controller.finish_load(ticket.decode()).expect("load");
        handle
    }

    #[test]
    fn test_attach_sizes_surface_and_fits() {
        let (mut controller, _) = editing();
        let page = page(800, 600);
        let (handle, ticket) = controller
            .attach(surface(), Size::new(400.0, 400.0), &page)
            .expect("attach");
        assert!(!controller.is_initialized());

        let outcome = controller.finish_load(ticket.decode()).expect("load");
        let LoadOutcome::Ready(fit) = outcome else {
            panic!("expected ready, got {outcome:?}");
        };
        let fitted = fit.fitted().expect("fitted");
        assert!((fitted.scale - 0.5).abs() < f32::EPSILON);

        let surface = controller.surface(&handle).expect("surface");
        assert_eq!(surface.size(), (800, 600));
        assert!(surface.clip_path().is_some_and(SceneObject::is_clip_boundary));
        assert!((surface.viewport().scale - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_mutations_before_load_are_suppressed() {
        let (mut controller, recorder) = editing();
        let page = page(100, 100);
        let (handle, ticket) = controller
            .attach(surface(), Size::new(100.0, 100.0), &page)
            .expect("attach");

        let early = controller.add_object(&handle, SceneObject::rect(0.0, 0.0, 5.0, 5.0));
        assert!(matches!(early, Err(EditorError::NotLoaded)));
        controller.finish_load(ticket.decode()).expect("load");
        assert_eq!(recorder.count(), 0);

        controller
            .add_object(&handle, SceneObject::rect(0.0, 0.0, 5.0, 5.0))
            .expect("add");
        assert_eq!(recorder.count(), 1);
    }

    #[test]
    fn test_one_notification_per_edit() {
        let (mut controller, recorder) = editing();
        let page = page(100, 100);
        let handle = attach_loaded(&mut controller, &page);

        let idx = controller
            .add_object(&handle, SceneObject::rect(0.0, 0.0, 5.0, 5.0))
            .expect("add");
        controller.move_object(&handle, idx, 10.0, 20.0).expect("move");
        controller.resize_object(&handle, idx, 30.0, 40.0).expect("resize");
        controller.set_fill(&handle, idx, "#00ff00").expect("fill");

        let changes = recorder.changes.lock().expect("lock");
        assert_eq!(changes.len(), 4);
        let last = Scene::from_json(&changes[3].scene).expect("decode");
        let object = &last.objects[idx];
        assert!((object.left - 10.0).abs() < f32::EPSILON);
        assert!((object.width - 30.0).abs() < f32::EPSILON);
        assert_eq!(object.fill_color(), Some("#00ff00"));
        assert_eq!((changes[3].width, changes[3].height), (100, 100));
    }

    #[test]
    fn test_failed_edit_does_not_notify() {
        let (mut controller, recorder) = editing();
        let page = page(100, 100);
        let handle = attach_loaded(&mut controller, &page);

        assert!(controller.remove_object(&handle, 0).is_err());
        assert!(controller.move_object(&handle, 0, 1.0, 1.0).is_err());
        assert!(controller.set_fill(&handle, 42, "#000").is_err());
        assert_eq!(recorder.count(), 0);
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let (mut controller, _) = editing();
        let page_a = page(100, 100);
        let mut page_b = page(300, 200);
        let mut scene_b = Scene::from_json(&page_b.scene).expect("decode");
        scene_b.add_object(SceneObject::rect(1.0, 1.0, 2.0, 2.0));
        page_b.scene = scene_b.to_json().expect("encode");

        let (_handle_a, ticket_a) = controller
            .attach(surface(), Size::new(500.0, 500.0), &page_a)
            .expect("attach a");
        let (handle_b, ticket_b) = controller
            .attach(surface(), Size::new(500.0, 500.0), &page_b)
            .expect("attach b");

        let decoded_a = ticket_a.decode();
        assert_eq!(
            controller.finish_load(ticket_b.decode()).expect("b"),
            LoadOutcome::Ready(
                ViewportFit::editing(1.0).compute(&scene_b, Size::new(500.0, 500.0))
            )
        );
        assert_eq!(controller.finish_load(decoded_a).expect("a"), LoadOutcome::Stale);

        let surface = controller.surface(&handle_b).expect("surface");
        assert_eq!(surface.size(), (300, 200));
        assert_eq!(surface.scene().map(Scene::object_count), Some(2));
        assert_eq!(controller.active_page(), Some(page_b.id));
    }

    #[test]
    fn test_stale_handle_is_rejected() {
        let (mut controller, recorder) = editing();
        let old = attach_loaded(&mut controller, &page(100, 100));
        let _new = attach_loaded(&mut controller, &page(100, 100));

        let result = controller.add_object(&old, SceneObject::rect(0.0, 0.0, 1.0, 1.0));
        assert!(matches!(result, Err(EditorError::StaleSession)));
        assert!(!controller.detach(&old));
        assert_eq!(recorder.count(), 0);
    }

    #[test]
    fn test_detach_is_idempotent() {
        let (mut controller, _) = editing();
        assert!(!controller.detach_current());

        let handle = attach_loaded(&mut controller, &page(100, 100));
        assert!(controller.detach(&handle));
        assert!(!controller.detach(&handle));
        assert!(controller.active_page().is_none());
        assert!(matches!(
            controller.surface(&handle),
            Err(EditorError::NoActiveSession)
        ));
    }

    #[test]
    fn test_detach_before_load_completes() {
        let (mut controller, _) = editing();
        let (handle, ticket) = controller
            .attach(surface(), Size::new(100.0, 100.0), &page(100, 100))
            .expect("attach");
        assert!(controller.detach(&handle));
        assert_eq!(
            controller.finish_load(ticket.decode()).expect("load"),
            LoadOutcome::Stale
        );
    }

    #[test]
    fn test_malformed_scene_degrades() {
        let (mut controller, recorder) = editing();
        let mut broken = page(100, 100);
        broken.scene = "{\"objects\": [".to_string();
        let (handle, ticket) = controller
            .attach(surface(), Size::new(100.0, 100.0), &broken)
            .expect("attach");

        assert_eq!(
            controller.finish_load(ticket.decode()).expect("load"),
            LoadOutcome::Degraded
        );
        let surface = controller.surface(&handle).expect("surface");
        assert_eq!(surface.scene().map(Scene::object_count), Some(0));
        assert!(matches!(
            controller.add_object(&handle, SceneObject::rect(0.0, 0.0, 1.0, 1.0)),
            Err(EditorError::NotLoaded)
        ));
        assert_eq!(recorder.count(), 0);
    }

    #[test]
    fn test_missing_boundary_degrades_without_fit() {
        let (mut controller, _) = editing();
        let mut bare = page(100, 100);
        bare.scene = Scene::new().to_json().expect("encode");
        let (handle, ticket) = controller
            .attach(surface(), Size::new(100.0, 100.0), &bare)
            .expect("attach");

        assert_eq!(
            controller.finish_load(ticket.decode()).expect("load"),
            LoadOutcome::Degraded
        );
        assert!(controller.surface(&handle).expect("surface").clip_path().is_none());
    }

    #[test]
    fn test_resize_container_refits() {
        let (mut controller, _) = editing();
        let handle = attach_loaded(&mut controller, &page(800, 600));

        let outcome = controller
            .resize_container(&handle, Size::new(200.0, 300.0))
            .expect("resize");
        let fitted = outcome.fitted().expect("fitted");
        assert!((fitted.scale - 0.25).abs() < f32::EPSILON);
        assert!((fitted.transform.translate_y - 75.0).abs() < 1e-4);
    }

    #[test]
    fn test_read_only_rejects_edits() {
        let mut controller = RuntimeController::read_only();
        let handle = attach_loaded(&mut controller, &page(100, 100));
        assert!(matches!(
            controller.add_object(&handle, SceneObject::rect(0.0, 0.0, 1.0, 1.0)),
            Err(EditorError::ReadOnly)
        ));
    }

    #[test]
    fn test_complete_stroke_adds_path() {
        let (mut controller, recorder) = editing();
        let handle = attach_loaded(&mut controller, &page(100, 100));

        let idx = controller
            .complete_stroke(&handle, &[(10.0, 10.0), (30.0, 20.0), (20.0, 40.0)], "#111", 3.0)
            .expect("stroke");
        let change = recorder.changes.lock().expect("lock")[0].clone();
        let scene = Scene::from_json(&change.scene).expect("decode");
        let path = &scene.objects[idx];
        assert_eq!(path.kind, "path");
        assert!((path.width - 20.0).abs() < f32::EPSILON);
        assert!((path.height - 30.0).abs() < f32::EPSILON);

        assert!(controller
            .complete_stroke(&handle, &[(1.0, 1.0)], "#111", 3.0)
            .is_err());
        assert_eq!(recorder.count(), 1);
    }
}
