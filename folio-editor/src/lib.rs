//! # Folio Editor
//!
//! The live side of Folio: one runtime session per active page, a
//! coalescing autosave behind it, and a read-only presentation slider.
//!
//! ```text
//!  PageStore ──▶ RuntimeController ──edits──▶ AutosaveHandle ──▶ PageStore
//!                   │  (session token)            (500 ms quiet,
//!                   ▼                               single flight)
//!              RenderSurface
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod autosave;
pub mod config;
pub mod editor;
pub mod error;
pub mod notify;
pub mod runtime;
pub mod slider;

pub use autosave::{Autosave, AutosaveHandle};
pub use config::EditorConfig;
pub use editor::Editor;
pub use error::{EditorError, EditorResult};
pub use notify::{Notification, Notifier, Severity};
pub use runtime::{
    Capability, DecodedScene, LoadOutcome, LoadTicket, MutationObserver, RuntimeController,
    RuntimeHandle, SceneChange, SessionToken,
};
pub use slider::{Key, PresentationSlider};
