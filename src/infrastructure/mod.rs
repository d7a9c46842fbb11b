//! Infrastructure layer - adapters for the capability traits and story files

pub mod memory;
pub mod story;

pub use memory::{MemoryAudioBackend, MemoryDialogueSurface, MemoryRenderer, MemorySurface};
pub use story::{StoryFile, StorySection};
