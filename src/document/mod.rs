//! Canonical document representation.
//!
//! A `Document` is the single shared view of a deck: created once by the
//! extraction manager, immutable thereafter, read concurrently by every
//! compliance module. Page numbers are unique and contiguous starting at 1,
//! enforced at construction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Document has no slides")]
    Empty,

    #[error("Slide page numbering broken: expected page {expected}, found {found}")]
    PageNumbering { expected: u32, found: u32 },
}

/// Role a text block plays on the slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Title,
    Body,
    Footnote,
}

/// Position of a block on the slide, normalized to 0.0–1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A run of text with layout metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl TextBlock {
    pub fn new(kind: BlockKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind,
            position: None,
        }
    }
}

/// A table detected on a slide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    #[serde(default)]
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Reference to an embedded image; pixels stay in the raw deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

/// One slide of the canonical document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    pub page_number: u32,
    pub blocks: Vec<TextBlock>,
    #[serde(default)]
    pub tables: Vec<TableBlock>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

impl Slide {
    /// All text on the slide, blocks joined by newlines. Used when building
    /// LLM prompt sections.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Canonical representation of a deck: an ordered, contiguously numbered
/// sequence of slides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub file_name: String,
    slides: Vec<Slide>,
}

impl Document {
    /// Build a document, enforcing the page-numbering invariant.
    pub fn new(file_name: impl Into<String>, slides: Vec<Slide>) -> Result<Self, DocumentError> {
        if slides.is_empty() {
            return Err(DocumentError::Empty);
        }
        for (i, slide) in slides.iter().enumerate() {
            let expected = i as u32 + 1;
            if slide.page_number != expected {
                return Err(DocumentError::PageNumbering {
                    expected,
                    found: slide.page_number,
                });
            }
        }
        Ok(Self {
            file_name: file_name.into(),
            slides,
        })
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn page_count(&self) -> usize {
        self.slides.len()
    }

    /// Slide by 1-based page number.
    pub fn slide(&self, page_number: u32) -> Option<&Slide> {
        if page_number == 0 {
            return None;
        }
        self.slides.get(page_number as usize - 1)
    }
}
