//! Scene documents and their string codec.
//!
//! A scene is an ordered list of [`SceneObject`]s plus an optional render clip.
//! Exactly one object, the clip boundary, is special: it is named
//! [`CLIP_BOUNDARY_NAME`](crate::element::CLIP_BOUNDARY_NAME) and defines the
//! page's visible bounds. Everything else is opaque payload that is carried
//! through decode/encode unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CoreError, CoreResult, SceneObject};

/// Format version written into newly created scenes.
pub const SCENE_FORMAT_VERSION: &str = "5.3.0";

/// Pixel tolerance when comparing the clip boundary to a page size.
const BOUNDARY_TOLERANCE: f32 = 0.5;

fn default_version() -> String {
    SCENE_FORMAT_VERSION.to_string()
}

/// A decoded scene document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Format version of the producer.
    #[serde(default = "default_version")]
    pub version: String,
    /// Drawable objects in paint order (first is painted first).
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    /// Render clip applied to the whole surface, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_path: Option<SceneObject>,
    /// Surface background paint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Value>,
    /// Top-level attributes not interpreted by Folio.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene without a clip boundary.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: default_version(),
            objects: Vec::new(),
            clip_path: None,
            background: None,
            extra: Map::new(),
        }
    }

    /// Create the default scene for a new page: a single clip boundary of
    /// the page's size.
    #[must_use]
    pub fn with_clip_boundary(width: f32, height: f32) -> Self {
        let mut scene = Self::new();
        scene
            .objects
            .push(SceneObject::clip_boundary(width, height));
        scene
    }

    /// Decode a scene from its stored string form.
    ///
    /// Stored scenes are sometimes encoded twice (a JSON string whose content
    /// is the scene JSON); one extra level of string encoding is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedScene`] if the input is not a scene.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let value: Value = serde_json::from_str(json.trim())
            .map_err(|e| CoreError::MalformedScene(e.to_string()))?;
        let value = match value {
            Value::String(inner) => serde_json::from_str(inner.trim())
                .map_err(|e| CoreError::MalformedScene(format!("double-encoded scene: {e}")))?,
            other => other,
        };
        if !value.is_object() {
            return Err(CoreError::MalformedScene(
                "scene document must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| CoreError::MalformedScene(e.to_string()))
    }

    /// Encode the scene to its stored string form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(CoreError::Serialization)
    }

    /// The clip boundary object, if present.
    #[must_use]
    pub fn clip_boundary(&self) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.is_clip_boundary())
    }

    /// Mutable access to the clip boundary object, if present.
    pub fn clip_boundary_mut(&mut self) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.is_clip_boundary())
    }

    /// Verify the scene has exactly one clip boundary matching the page size.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingClipBoundary`],
    /// [`CoreError::DuplicateClipBoundary`], or [`CoreError::InvalidOperation`]
    /// when the boundary size differs from `width` x `height`.
    pub fn check_boundary(&self, width: f32, height: f32) -> CoreResult<()> {
        let count = self.objects.iter().filter(|o| o.is_clip_boundary()).count();
        match count {
            0 => return Err(CoreError::MissingClipBoundary),
            1 => {}
            n => return Err(CoreError::DuplicateClipBoundary(n)),
        }
        let size = self
            .clip_boundary()
            .map(SceneObject::scaled_size)
            .ok_or(CoreError::MissingClipBoundary)?;
        if (size.width - width).abs() > BOUNDARY_TOLERANCE
            || (size.height - height).abs() > BOUNDARY_TOLERANCE
        {
            return Err(CoreError::InvalidOperation(format!(
                "clip boundary {}x{} does not match page {width}x{height}",
                size.width, size.height
            )));
        }
        Ok(())
    }

    /// Resize the clip boundary to a new page size, creating it if missing.
    pub fn resize_boundary(&mut self, width: f32, height: f32) {
        if let Some(clip) = self.clip_boundary_mut() {
            clip.width = width;
            clip.height = height;
            clip.scale_x = 1.0;
            clip.scale_y = 1.0;
        } else {
            self.objects
                .insert(0, SceneObject::clip_boundary(width, height));
        }
    }

    /// Append an object on top of the paint order. Returns its index.
    pub fn add_object(&mut self, object: SceneObject) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    /// Remove the object at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range or names the clip boundary.
    pub fn remove_object(&mut self, index: usize) -> CoreResult<SceneObject> {
        match self.objects.get(index) {
            None => Err(CoreError::NotFound(format!("scene object #{index}"))),
            Some(obj) if obj.is_clip_boundary() => Err(CoreError::InvalidOperation(
                "the clip boundary cannot be removed".to_string(),
            )),
            Some(_) => Ok(self.objects.remove(index)),
        }
    }

    /// Get a mutable reference to the object at `index`.
    pub fn object_mut(&mut self, index: usize) -> Option<&mut SceneObject> {
        self.objects.get_mut(index)
    }

    /// Objects other than the clip boundary, in paint order.
    pub fn drawable_objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|o| !o.is_clip_boundary())
    }

    /// Find the topmost interactive object at the given scene coordinates.
    #[must_use]
    pub fn object_at(&self, x: f32, y: f32) -> Option<usize> {
        self.objects
            .iter()
            .enumerate()
            .rev()
            .find(|(_, o)| o.evented && o.visible && o.contains_point(x, y))
            .map(|(idx, _)| idx)
    }

    /// Number of objects, including the clip boundary.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}
