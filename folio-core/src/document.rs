//! Documents and pages.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreResult, Scene};

/// Default page width in pixels.
pub const DEFAULT_PAGE_WIDTH: u32 = 800;

/// Default page height in pixels.
pub const DEFAULT_PAGE_HEIGHT: u32 = 600;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new unique ID.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create from an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parse from the hyphenated string form.
            ///
            /// # Errors
            ///
            /// Returns an error if the string is not a UUID.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a document.
    DocumentId
);

uuid_id!(
    /// Unique identifier for a page.
    PageId
);

/// A multi-page document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique identifier.
    pub id: DocumentId,
    /// Display name.
    pub name: String,
    /// Creation time (ms since epoch).
    pub created_at: u64,
    /// Last modification time (ms since epoch).
    pub updated_at: u64,
}

/// A single page of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Unique identifier.
    pub id: PageId,
    /// Owning document.
    pub document_id: DocumentId,
    /// 1-based position within the document.
    pub position: u32,
    /// Display name.
    pub name: String,
    /// Serialized scene document.
    pub scene: String,
    /// Page width in pixels.
    pub width: u32,
    /// Page height in pixels.
    pub height: u32,
    /// Creation time (ms since epoch).
    pub created_at: u64,
    /// Last modification time (ms since epoch).
    pub updated_at: u64,
}

impl Page {
    /// Decode this page's scene document.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedScene`](crate::CoreError::MalformedScene)
    /// if the stored scene cannot be decoded.
    pub fn decode_scene(&self) -> CoreResult<Scene> {
        Scene::from_json(&self.scene)
    }

    /// Page dimensions as floats.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn size(&self) -> crate::Size {
        crate::Size::new(self.width as f32, self.height as f32)
    }
}

/// Parameters for creating a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPage {
    /// Owning document.
    pub document_id: DocumentId,
    /// 1-based position; must be `count + 1` (append).
    pub position: u32,
    /// Display name.
    pub name: String,
    /// Serialized scene document.
    pub scene: String,
    /// Page width in pixels.
    pub width: u32,
    /// Page height in pixels.
    pub height: u32,
}

impl NewPage {
    /// A page with the default scene for the given size, named `Page <position>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the default scene cannot be encoded.
    #[allow(clippy::cast_precision_loss)]
    pub fn with_default_scene(
        document_id: DocumentId,
        position: u32,
        width: u32,
        height: u32,
    ) -> CoreResult<Self> {
        let scene = Scene::with_clip_boundary(width as f32, height as f32).to_json()?;
        Ok(Self {
            document_id,
            position,
            name: format!("Page {position}"),
            scene,
            width,
            height,
        })
    }
}

/// Partial update of a page. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePatch {
    /// New serialized scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<String>,
    /// New width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// New height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PagePatch {
    /// A scene-and-dimensions patch, as issued by autosave.
    #[must_use]
    pub fn scene(scene: String, width: u32, height: u32) -> Self {
        Self {
            scene: Some(scene),
            width: Some(width),
            height: Some(height),
            name: None,
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scene.is_none() && self.width.is_none() && self.height.is_none() && self.name.is_none()
    }
}

/// Check that pages (in any order) occupy positions `1..=N` exactly once.
#[must_use]
pub fn positions_are_dense(pages: &[Page]) -> bool {
    let mut positions: Vec<u32> = pages.iter().map(|p| p.position).collect();
    positions.sort_unstable();
    positions
        .iter()
        .zip(1u32..)
        .all(|(&pos, expected)| pos == expected)
}

/// Current Unix timestamp in milliseconds.
#[must_use]
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| {
        // Timestamp will not exceed u64 max for millennia
        #[allow(clippy::cast_possible_truncation)]
        {
            d.as_millis() as u64
        }
    })
}
