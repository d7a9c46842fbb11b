//! Presentation surface capability
//!
//! The controller, dialogue presenter and cinematics manipulate the page only
//! through these traits, addressing sections by index and elements by id.

use crate::errors::SurfaceError;
use crate::types::{ChoiceOption, Section, ToastKind};
use async_trait::async_trait;
use std::time::Duration;

/// Sections, the advance arrow and free-standing elements
#[async_trait]
pub trait PresentationSurface: Send + Sync {
    /// Ordered sections, read once at controller initialization
    fn sections(&self) -> Vec<Section>;

    /// Toggle the fade-in state of a section's content
    fn set_content_active(&self, index: usize, active: bool) -> Result<(), SurfaceError>;

    /// Enable or suppress wheel, touch and keyboard scrolling
    fn set_native_scroll(&self, enabled: bool);

    /// Create the advance arrow, hidden
    fn create_arrow(&self);

    fn set_arrow_visible(&self, visible: bool);

    /// Negative feedback on the arrow
    fn shake_arrow(&self);

    fn remove_arrow(&self);

    /// Smooth-scroll to a section; resolves once the viewport has settled there
    async fn scroll_to(&self, index: usize, duration: Duration) -> Result<(), SurfaceError>;

    /// Fade an element in or out
    fn set_element_visible(
        &self,
        id: &str,
        visible: bool,
        fade: Duration,
    ) -> Result<(), SurfaceError>;

    fn set_text(&self, id: &str, text: &str) -> Result<(), SurfaceError>;

    /// Full-screen colour flash
    fn flash(&self, color: &str, fade_in: Duration, fade_out: Duration);
}

/// The dialogue box, choice buttons and toasts
pub trait DialogueSurface: Send + Sync {
    /// Replace the text and toggle the continue button
    fn show_line(&self, text: &str, show_advance_button: bool);

    fn show_choice(&self, prompt: &str, options: &[ChoiceOption]);

    fn set_box_visible(&self, visible: bool);

    fn show_toast(&self, id: u64, text: &str, kind: ToastKind);

    fn remove_toast(&self, id: u64);
}
