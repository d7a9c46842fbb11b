//! Section descriptors

use serde::{Deserialize, Serialize};

/// A full-viewport narrative unit as discovered on the presentation surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Element id of the section
    pub id: String,
    /// Chapter tag, if the section opens or belongs to a chapter
    #[serde(default)]
    pub chapter: Option<u32>,
    /// Challenge that must be completed before progressing past this section
    #[serde(default)]
    pub requires: Option<String>,
}

impl Section {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            chapter: None,
            requires: None,
        }
    }

    pub fn with_chapter(mut self, chapter: u32) -> Self {
        self.chapter = Some(chapter);
        self
    }

    pub fn requiring(mut self, challenge: impl Into<String>) -> Self {
        self.requires = Some(challenge.into());
        self
    }
}
