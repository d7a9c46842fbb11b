//! Terminal renditions of the presentation and dialogue surfaces
//!
//! Bookkeeping is delegated to the in-memory surface; these types only print
//! what a reader of the page would see change.

use crate::errors::SurfaceError;
use crate::infrastructure::memory::MemorySurface;
use crate::infrastructure::story::StoryFile;
use crate::surface::{DialogueSurface, PresentationSurface};
use crate::types::{ChoiceOption, Section, ToastKind};
use async_trait::async_trait;
use std::time::Duration;

/// Prints section text as it fades in
pub struct ConsoleSurface {
    story: StoryFile,
    memory: MemorySurface,
}

impl ConsoleSurface {
    pub fn new(story: StoryFile) -> Self {
        let memory = MemorySurface::new(story.sections()).with_elements(story.element_ids());
        Self { story, memory }
    }

    pub fn title(&self) -> Option<&str> {
        self.story.title.as_deref()
    }

    fn print_section(&self, index: usize) {
        let Some(section) = self.story.section(index) else {
            return;
        };
        println!();
        match section.chapter {
            Some(chapter) => println!("== [{}] {} ==", chapter, section.id),
            None => println!("== {} ==", section.id),
        }
        for line in &section.text {
            println!("{}", line);
        }
        if let Some(challenge) = &section.requires {
            println!("(challenge: {})", challenge);
        }
        println!();
    }
}

#[async_trait]
impl PresentationSurface for ConsoleSurface {
    fn sections(&self) -> Vec<Section> {
        self.memory.sections()
    }

    fn set_content_active(&self, index: usize, active: bool) -> Result<(), SurfaceError> {
        self.memory.set_content_active(index, active)?;
        if active {
            self.print_section(index);
        }
        Ok(())
    }

    fn set_native_scroll(&self, enabled: bool) {
        self.memory.set_native_scroll(enabled);
    }

    fn create_arrow(&self) {
        self.memory.create_arrow();
    }

    fn set_arrow_visible(&self, visible: bool) {
        let was = self.memory.arrow_visible();
        self.memory.set_arrow_visible(visible);
        if visible && was == Some(false) {
            println!("   v  (Enter)");
        }
    }

    fn shake_arrow(&self) {
        self.memory.shake_arrow();
        println!("   ~  the way is still closed");
    }

    fn remove_arrow(&self) {
        self.memory.remove_arrow();
    }

    async fn scroll_to(&self, index: usize, duration: Duration) -> Result<(), SurfaceError> {
        self.memory.scroll_to(index, duration).await
    }

    fn set_element_visible(
        &self,
        id: &str,
        visible: bool,
        fade: Duration,
    ) -> Result<(), SurfaceError> {
        let was = self.memory.element_visible(id);
        self.memory.set_element_visible(id, visible, fade)?;
        if visible && !was && self.story.sections.iter().all(|s| s.id != id) {
            match self.memory.text(id) {
                Some(text) => println!("[{}] {}", id, text),
                None => println!("[{}]", id),
            }
        }
        Ok(())
    }

    fn set_text(&self, id: &str, text: &str) -> Result<(), SurfaceError> {
        self.memory.set_text(id, text)?;
        if !text.is_empty() {
            println!("[{}] {}", id, text);
        }
        Ok(())
    }

    fn flash(&self, color: &str, fade_in: Duration, fade_out: Duration) {
        self.memory.flash(color, fade_in, fade_out);
        println!("*** {} ***", color);
    }
}

/// Prints dialogue lines, choices and toasts
#[derive(Default)]
pub struct ConsoleDialogue;

impl DialogueSurface for ConsoleDialogue {
    fn show_line(&self, text: &str, show_advance_button: bool) {
        if show_advance_button {
            println!("  > {}  (Enter)", text);
        } else {
            println!("  > {}", text);
        }
    }

    fn show_choice(&self, prompt: &str, options: &[ChoiceOption]) {
        println!("  > {}", prompt);
        for (i, option) in options.iter().enumerate() {
            println!("    {}. {}", i + 1, option.label);
        }
    }

    fn set_box_visible(&self, _visible: bool) {}

    fn show_toast(&self, _id: u64, text: &str, kind: ToastKind) {
        match kind {
            ToastKind::Info => println!("(i) {}", text),
            ToastKind::Success => println!("(+) {}", text),
            ToastKind::Error => println!("(!) {}", text),
        }
    }

    fn remove_toast(&self, _id: u64) {}
}
