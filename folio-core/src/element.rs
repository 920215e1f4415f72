//! Scene objects - the drawable entries of a scene document.
//!
//! Objects carry a small set of well-known geometry and style attributes. Any
//! attribute this crate does not interpret is kept in [`SceneObject::extra`]
//! so that decoding and re-encoding a scene never loses information.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::viewport::{Point, Size};

/// Reserved name of the rectangle that defines a page's visible bounds.
pub const CLIP_BOUNDARY_NAME: &str = "clip";

/// Well-known object type tags.
pub mod kind {
    /// Axis-aligned rectangle.
    pub const RECT: &str = "rect";
    /// Circle (uses `radius`).
    pub const CIRCLE: &str = "circle";
    /// Ellipse (uses `rx`/`ry`).
    pub const ELLIPSE: &str = "ellipse";
    /// Isosceles triangle filling its box.
    pub const TRIANGLE: &str = "triangle";
    /// Static text.
    pub const TEXT: &str = "text";
    /// Editable text.
    pub const I_TEXT: &str = "i-text";
    /// Wrapping text box.
    pub const TEXTBOX: &str = "textbox";
    /// Raster image.
    pub const IMAGE: &str = "image";
    /// Free-form path (drawing-mode strokes).
    pub const PATH: &str = "path";
    /// Closed polygon.
    pub const POLYGON: &str = "polygon";
}

fn one() -> f32 {
    1.0
}

fn yes() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_one(v: &f32) -> bool {
    (*v - 1.0).abs() < f32::EPSILON
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_true(v: &bool) -> bool {
    *v
}

/// A drawable object inside a scene document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneObject {
    /// Object type tag (see [`kind`]).
    #[serde(rename = "type")]
    pub kind: String,
    /// X position of the left edge.
    #[serde(default)]
    pub left: f32,
    /// Y position of the top edge.
    #[serde(default)]
    pub top: f32,
    /// Unscaled width.
    #[serde(default)]
    pub width: f32,
    /// Unscaled height.
    #[serde(default)]
    pub height: f32,
    /// Horizontal scale factor.
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub scale_x: f32,
    /// Vertical scale factor.
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub scale_y: f32,
    /// Rotation in degrees.
    #[serde(default)]
    pub angle: f32,
    /// Opacity in `[0, 1]`.
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub opacity: f32,
    /// Fill paint. Usually a CSS colour string, may be a gradient object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Value>,
    /// Stroke paint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Value>,
    /// Stroke width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f32>,
    /// Optional object name. [`CLIP_BOUNDARY_NAME`] is reserved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the object can be selected in the editor.
    #[serde(default = "yes", skip_serializing_if = "is_true")]
    pub selectable: bool,
    /// Whether the object receives pointer events.
    #[serde(default = "yes", skip_serializing_if = "is_true")]
    pub evented: bool,
    /// Whether the object is drawn at all.
    #[serde(default = "yes", skip_serializing_if = "is_true")]
    pub visible: bool,
    /// Text content for text objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Font size for text objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    /// Font family for text objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Image source URI or data URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Circle radius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    /// Horizontal radius for ellipses and rounded rectangles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rx: Option<f32>,
    /// Vertical radius for ellipses and rounded rectangles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ry: Option<f32>,
    /// Attributes not interpreted by Folio, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SceneObject {
    /// Create an object of the given type at the origin with zero size.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            opacity: 1.0,
            fill: None,
            stroke: None,
            stroke_width: None,
            name: None,
            selectable: true,
            evented: true,
            visible: true,
            text: None,
            font_size: None,
            font_family: None,
            src: None,
            radius: None,
            rx: None,
            ry: None,
            extra: Map::new(),
        }
    }

    /// Create a rectangle.
    #[must_use]
    pub fn rect(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self::new(kind::RECT).with_geometry(left, top, width, height)
    }

    /// Create a text object.
    #[must_use]
    pub fn text(content: impl Into<String>, left: f32, top: f32, font_size: f32) -> Self {
        let mut obj = Self::new(kind::TEXTBOX).with_geometry(left, top, 0.0, font_size * 1.2);
        obj.text = Some(content.into());
        obj.font_size = Some(font_size);
        obj
    }

    /// Create the clip boundary for a page of the given size.
    ///
    /// White fill, not selectable, not interactive.
    #[must_use]
    pub fn clip_boundary(width: f32, height: f32) -> Self {
        let mut obj = Self::rect(0.0, 0.0, width, height).with_fill("white");
        obj.name = Some(CLIP_BOUNDARY_NAME.to_string());
        obj.selectable = false;
        obj.evented = false;
        obj.extra
            .insert("hasControls".to_string(), Value::Bool(false));
        obj
    }

    /// Set position and unscaled size.
    #[must_use]
    pub fn with_geometry(mut self, left: f32, top: f32, width: f32, height: f32) -> Self {
        self.left = left;
        self.top = top;
        self.width = width;
        self.height = height;
        self
    }

    /// Set a solid fill colour.
    #[must_use]
    pub fn with_fill(mut self, color: impl Into<String>) -> Self {
        self.fill = Some(Value::String(color.into()));
        self
    }

    /// Set a solid stroke colour and width.
    #[must_use]
    pub fn with_stroke(mut self, color: impl Into<String>, width: f32) -> Self {
        self.stroke = Some(Value::String(color.into()));
        self.stroke_width = Some(width);
        self
    }

    /// Set the object name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether this object is the page's clip boundary.
    #[must_use]
    pub fn is_clip_boundary(&self) -> bool {
        self.name.as_deref() == Some(CLIP_BOUNDARY_NAME)
    }

    /// Solid fill colour, if the fill is a plain colour string.
    #[must_use]
    pub fn fill_color(&self) -> Option<&str> {
        self.fill.as_ref().and_then(Value::as_str)
    }

    /// Solid stroke colour, if the stroke is a plain colour string.
    #[must_use]
    pub fn stroke_color(&self) -> Option<&str> {
        self.stroke.as_ref().and_then(Value::as_str)
    }

    /// Width and height after applying scale.
    #[must_use]
    pub fn scaled_size(&self) -> Size {
        Size::new(self.width * self.scale_x, self.height * self.scale_y)
    }

    /// Centre point of the scaled bounding box.
    #[must_use]
    pub fn center(&self) -> Point {
        let size = self.scaled_size();
        Point::new(self.left + size.width / 2.0, self.top + size.height / 2.0)
    }

    /// Check if a point (in scene coordinates) is within this object's box.
    #[must_use]
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        let size = self.scaled_size();
        x >= self.left && x <= self.left + size.width && y >= self.top && y <= self.top + size.height
    }
}
