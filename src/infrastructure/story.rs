//! Story files
//!
//! A story file is the JSON description of a presentation surface: the
//! ordered sections with their chapter tags, challenge requirements and text,
//! plus the free-standing element ids the cinematics and puzzles address.

use crate::types::Section;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One section as written in a story file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorySection {
    pub id: String,
    #[serde(default)]
    pub chapter: Option<u32>,
    #[serde(default)]
    pub requires: Option<String>,
    /// Lines shown when the section's content fades in
    #[serde(default)]
    pub text: Vec<String>,
    /// Element ids living inside the section
    #[serde(default)]
    pub elements: Vec<String>,
}

impl StorySection {
    pub fn to_section(&self) -> Section {
        Section {
            id: self.id.clone(),
            chapter: self.chapter,
            requires: self.requires.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryFile {
    #[serde(default)]
    pub title: Option<String>,
    pub sections: Vec<StorySection>,
    /// Element ids outside of any section, such as the start button
    #[serde(default)]
    pub elements: Vec<String>,
}

impl StoryFile {
    /// Parse and validate a story
    pub fn from_json(source: &str) -> anyhow::Result<Self> {
        let story: StoryFile =
            serde_json::from_str(source).context("Failed to parse story file")?;
        story.validate()?;
        Ok(story)
    }

    /// Load a story file from disk
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read story file {}", path.display()))?;
        Self::from_json(&source).with_context(|| format!("Invalid story {}", path.display()))
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.sections.is_empty() {
            bail!("Story has no sections");
        }
        let mut seen = HashSet::new();
        for section in &self.sections {
            if section.id.trim().is_empty() {
                bail!("Section without an id");
            }
            if !seen.insert(section.id.as_str()) {
                bail!("Duplicate section id '{}'", section.id);
            }
        }
        Ok(())
    }

    pub fn sections(&self) -> Vec<Section> {
        self.sections.iter().map(StorySection::to_section).collect()
    }

    pub fn section(&self, index: usize) -> Option<&StorySection> {
        self.sections.get(index)
    }

    /// Every element id declared by the story, sections excluded
    pub fn element_ids(&self) -> Vec<String> {
        self.elements
            .iter()
            .chain(self.sections.iter().flat_map(|s| s.elements.iter()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORY: &str = r#"{
        "title": "Uma jornada",
        "elements": ["btn-iniciar"],
        "sections": [
            { "id": "inicio", "text": ["Bem-vindo."] },
            { "id": "cap1", "chapter": 1, "text": ["Capítulo 1"] },
            { "id": "desafio-codigo", "requires": "codigo", "elements": ["codigo-feedback"] }
        ]
    }"#;

    #[test]
    fn test_parse_story() {
        let story = StoryFile::from_json(STORY).unwrap();
        assert_eq!(story.title.as_deref(), Some("Uma jornada"));
        assert_eq!(
            story.sections(),
            vec![
                Section::new("inicio"),
                Section::new("cap1").with_chapter(1),
                Section::new("desafio-codigo").requiring("codigo"),
            ]
        );
        assert_eq!(story.element_ids(), vec!["btn-iniciar", "codigo-feedback"]);
        assert_eq!(story.section(1).unwrap().text, vec!["Capítulo 1"]);
        assert!(story.section(2).unwrap().text.is_empty());
    }

    #[test]
    fn test_rejects_empty_story() {
        let err = StoryFile::from_json(r#"{ "sections": [] }"#).unwrap_err();
        assert_eq!(err.to_string(), "Story has no sections");
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = StoryFile::from_json(r#"{ "sections": [{ "id": "a" }, { "id": "a" }] }"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "Duplicate section id 'a'");
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = StoryFile::from_json("{ sections").unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse story file");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = StoryFile::load("does/not/exist.json").await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to read story file"));
    }
}
