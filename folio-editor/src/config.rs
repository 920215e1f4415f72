//! Editor configuration.

use std::time::Duration;

use folio_core::document::{DEFAULT_PAGE_HEIGHT, DEFAULT_PAGE_WIDTH};
use folio_renderer::ExportConfig;

/// Default autosave quiet window.
pub const DEFAULT_AUTOSAVE_QUIET: Duration = Duration::from_millis(500);

/// Default editing-view padding ratio.
pub const DEFAULT_FIT_PADDING: f32 = 0.85;

/// Runtime settings for an editor instance.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// How long edits must be quiet before autosave persists them.
    pub autosave_quiet: Duration,
    /// Width of newly created pages.
    pub page_width: u32,
    /// Height of newly created pages.
    pub page_height: u32,
    /// Editing-view padding ratio in `(0, 1]`.
    pub fit_padding: f32,
    /// Export settings.
    pub export: ExportConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_quiet: DEFAULT_AUTOSAVE_QUIET,
            page_width: DEFAULT_PAGE_WIDTH,
            page_height: DEFAULT_PAGE_HEIGHT,
            fit_padding: DEFAULT_FIT_PADDING,
            export: ExportConfig::default(),
        }
    }
}

impl EditorConfig {
    /// Defaults overridden by `FOLIO_AUTOSAVE_MS`, `FOLIO_PAGE_WIDTH`,
    /// `FOLIO_PAGE_HEIGHT` and `FOLIO_FIT_PADDING`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by values from `lookup`. Unparseable values are
    /// logged and ignored.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64>(&lookup, "FOLIO_AUTOSAVE_MS") {
            config.autosave_quiet = Duration::from_millis(ms);
        }
        if let Some(width) = parse_var::<u32>(&lookup, "FOLIO_PAGE_WIDTH").filter(|w| *w > 0) {
            config.page_width = width;
        }
        if let Some(height) = parse_var::<u32>(&lookup, "FOLIO_PAGE_HEIGHT").filter(|h| *h > 0) {
            config.page_height = height;
        }
        if let Some(padding) = parse_var::<f32>(&lookup, "FOLIO_FIT_PADDING")
            .filter(|p| p.is_finite() && *p > 0.0 && *p <= 1.0)
        {
            config.fit_padding = padding;
        }

        config
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {key}={raw:?}");
            None
        }
    }
}
