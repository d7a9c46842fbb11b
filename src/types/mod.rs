//! Core types for the storyscroll library
//!
//! - State: the narrative progress record and its keys
//! - Section: one full-viewport unit read from the presentation surface
//! - Dialogue: queue entries, choice options and toast kinds

pub mod dialogue;
pub mod section;
pub mod state;

pub use dialogue::{Callback, ChoiceOption, DialogueEntry, DialogueOptions, ToastKind};
pub use section::Section;
pub use state::{NarrativeState, StateKey};
