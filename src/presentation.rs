//! The seam between the layer state and whatever draws it.

use crate::types::MarkerId;

/// Receives visibility changes and count updates from the layer.
pub trait Presentation {
    /// Called only when a marker's flag actually flips.
    fn marker_visibility_changed(&mut self, marker: MarkerId, visible: bool);

    /// Called with the full readout text, e.g. `"Visible Investors: 12"`.
    fn count_published(&mut self, text: &str);
}

/// Holds the latest count readout.
///
/// Used by the CLI summary and behind the HTTP API. Marker visibility is read
/// back from the registry, so flips need no bookkeeping here.
#[derive(Debug, Default, Clone)]
pub struct CountReadout {
    text: Option<String>,
}

impl CountReadout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl Presentation for CountReadout {
    fn marker_visibility_changed(&mut self, _marker: MarkerId, _visible: bool) {}

    fn count_published(&mut self, text: &str) {
        self.text = Some(text.to_string());
    }
}
