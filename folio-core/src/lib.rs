//! # Folio Core
//!
//! Document model and scene codec for the Folio paginated canvas editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 folio-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Scene Codec     │  Viewport Fit            │
//! │  - Objects       │  - Scale to container    │
//! │  - Clip boundary │  - Centre + clip path    │
//! ├─────────────────────────────────────────────┤
//! │  Documents       │  Page Store              │
//! │  - Pages         │  - Dense positions       │
//! │  - Default scene │  - JSON persistence      │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod document;
pub mod element;
pub mod error;
pub mod scene;
pub mod store;
pub mod viewport;

pub use document::{Document, DocumentId, NewPage, Page, PageId, PagePatch};
pub use element::{SceneObject, CLIP_BOUNDARY_NAME};
pub use error::{CoreError, CoreResult};
pub use scene::Scene;
pub use store::{DocumentStore, MemoryStore, PageStore};
pub use viewport::{fit, fit_uncapped, FitMode, FitOutcome, Point, Size, ViewportFit, ViewportTransform};

/// Folio core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
