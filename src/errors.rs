//! Error types shared by the story services
//!
//! None of these cross a component boundary as a panic: callers log them and
//! degrade, which keeps the narrative moving when an asset or element is absent.

use thiserror::Error;

/// Errors raised by the global state store
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Unknown state key '{key}'")]
    UnknownKey { key: String },

    #[error("Type mismatch for state key '{key}': {reason}")]
    TypeMismatch { key: String, reason: String },
}

impl StoreError {
    pub fn type_mismatch(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors reported by a presentation surface
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("Element '{id}' not found on the presentation surface")]
    MissingElement { id: String },

    #[error("Section {index} not found on the presentation surface")]
    MissingSection { index: usize },
}

impl SurfaceError {
    pub fn missing_element(id: impl Into<String>) -> Self {
        Self::MissingElement { id: id.into() }
    }
}

/// Errors reported by the sound capability
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioError {
    #[error("Sound effect '{name}' not found")]
    UnknownEffect { name: String },

    #[error("Music track '{name}' not found")]
    UnknownTrack { name: String },

    #[error("No track mapped for chapter '{chapter}'")]
    UnmappedChapter { chapter: String },

    #[error("Audio backend failure for '{asset}': {message}")]
    Backend { asset: String, message: String },
}

impl AudioError {
    pub fn backend(asset: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            asset: asset.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by the section progression controller
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProgressError {
    #[error("Progression controller is not initialized")]
    NotInitialized,

    #[error("No sections found on the presentation surface")]
    NoSections,

    #[error("Invalid section index {index}, section count is {count}")]
    InvalidIndex { index: usize, count: usize },

    #[error("Unknown section id '{id}'")]
    UnknownSection { id: String },

    #[error("Operation requires debug mode")]
    DebugModeRequired,
}

/// Errors surfaced to the operator by the debug console
///
/// The `Display` text doubles as the inline feedback shown next to the input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DebugError {
    #[error("Debug mode is disabled")]
    Disabled,

    #[error("Type a name first")]
    EmptyInput,

    #[error("Section '{id}' does not exist")]
    UnknownSection { id: String },

    #[error(transparent)]
    Progress(#[from] ProgressError),
}

/// Errors raised when starting a cinematic sequencer
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SequencerError {
    #[error("Sequencer '{requested}' cannot start while '{active}' is running")]
    AlreadyActive { requested: String, active: String },

    #[error("Sequencer '{name}' already ran this session")]
    AlreadyRan { name: String },
}
