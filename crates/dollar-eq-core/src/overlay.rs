//! Presentation hooks.
//!
//! Overlays are write-only from the core's point of view: nothing they do
//! feeds back into a run.

use crate::mode::Mode;

/// Status indicator and selection outline shown while a run is active.
pub trait Overlay {
    /// Show the status indicator for `mode`.
    fn show_status(&mut self, mode: Mode);

    /// Outline the current selection.
    fn highlight_selection(&mut self);

    fn hide_highlight(&mut self);

    /// Hide the status indicator and the outline.
    fn hide_overlays(&mut self);
}
