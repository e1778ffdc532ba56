//! Shared LLM slide schema: the JSON every LLM-backed strategy asks the
//! model to emit, and the lenient mapping into the canonical [`Slide`].

use serde::{Deserialize, Serialize};

use crate::document::{BlockKind, ImageRef, Position, Slide, TableBlock, TextBlock};
use crate::extraction::raw::RawPage;
use crate::extraction::ExtractionError;
use crate::gateway::ModelGateway;

/// System prompt for all extraction calls.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a slide-layout analyst for financial \
    presentations. You convert raw slide text into structured JSON. Output valid JSON only, \
    inside a ```json fence. Never invent content that is not present in the input.";

/// Wire form of one extracted slide. Every field is lenient: missing arrays
/// default to empty, unknown block kinds fall back to body text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlideSchema {
    #[serde(default)]
    pub blocks: Vec<BlockSchema>,
    #[serde(default)]
    pub tables: Vec<TableSchema>,
    #[serde(default)]
    pub images: Vec<ImageSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSchema {
    pub text: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSchema {
    pub name: String,
    #[serde(default)]
    pub alt_text: Option<String>,
}

/// Map the wire form into a canonical slide.
pub fn slide_from_schema(page_number: u32, schema: SlideSchema) -> Slide {
    let blocks = schema
        .blocks
        .into_iter()
        .filter(|b| !b.text.trim().is_empty())
        .map(|b| TextBlock {
            kind: match b.kind.as_deref() {
                Some("title") => BlockKind::Title,
                Some("footnote") => BlockKind::Footnote,
                _ => BlockKind::Body,
            },
            text: b.text,
            position: b.position,
        })
        .collect();

    let tables = schema
        .tables
        .into_iter()
        .filter(|t| !t.rows.is_empty() || !t.headers.is_empty())
        .map(|t| TableBlock {
            headers: t.headers,
            rows: t.rows,
        })
        .collect();

    let images = schema
        .images
        .into_iter()
        .map(|i| ImageRef {
            name: i.name,
            alt_text: i.alt_text,
        })
        .collect();

    Slide {
        page_number,
        blocks,
        tables,
        images,
    }
}

/// Single-pass LLM extraction of one page. Used directly by the parallel
/// strategy and as the draft pass of the multi-agent strategy.
pub fn extract_slide_single_pass(
    gateway: &ModelGateway,
    page_number: u32,
    page: &RawPage,
) -> Result<Slide, ExtractionError> {
    let schema: SlideSchema =
        gateway.complete_json(EXTRACTION_SYSTEM_PROMPT, &single_pass_prompt(page))?;
    Ok(slide_from_schema(page_number, schema))
}

pub fn single_pass_prompt(page: &RawPage) -> String {
    let mut prompt = format!(
        "Convert this slide's raw text into structured JSON with the shape\n\
         {{\"blocks\": [{{\"text\", \"kind\": \"title\"|\"body\"|\"footnote\"}}], \
         \"tables\": [{{\"headers\", \"rows\"}}], \"images\": [{{\"name\", \"alt_text\"}}]}}.\n\n\
         Raw slide text:\n{}",
        page.text
    );
    if let Some(notes) = &page.notes {
        prompt.push_str("\n\nSpeaker notes (context only, do not emit as blocks):\n");
        prompt.push_str(notes);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_maps_block_kinds() {
        let schema: SlideSchema = serde_json::from_str(
            r#"{
                "blocks": [
                    {"text": "Fund Overview", "kind": "title"},
                    {"text": "Performance was strong", "kind": "body"},
                    {"text": "Source: internal", "kind": "footnote"},
                    {"text": "No kind given"}
                ]
            }"#,
        )
        .unwrap();
        let slide = slide_from_schema(1, schema);
        assert_eq!(slide.blocks.len(), 4);
        assert_eq!(slide.blocks[0].kind, BlockKind::Title);
        assert_eq!(slide.blocks[2].kind, BlockKind::Footnote);
        assert_eq!(slide.blocks[3].kind, BlockKind::Body);
    }

    #[test]
    fn unknown_kind_falls_back_to_body() {
        let schema: SlideSchema =
            serde_json::from_str(r#"{"blocks": [{"text": "x", "kind": "banner"}]}"#).unwrap();
        let slide = slide_from_schema(2, schema);
        assert_eq!(slide.blocks[0].kind, BlockKind::Body);
        assert_eq!(slide.page_number, 2);
    }

    #[test]
    fn empty_blocks_and_tables_dropped() {
        let schema: SlideSchema = serde_json::from_str(
            r#"{
                "blocks": [{"text": "   "}],
                "tables": [{"headers": [], "rows": []}]
            }"#,
        )
        .unwrap();
        let slide = slide_from_schema(1, schema);
        assert!(slide.blocks.is_empty());
        assert!(slide.tables.is_empty());
    }

    #[test]
    fn missing_arrays_default_empty() {
        let schema: SlideSchema = serde_json::from_str("{}").unwrap();
        let slide = slide_from_schema(1, schema);
        assert!(slide.blocks.is_empty());
        assert!(slide.tables.is_empty());
        assert!(slide.images.is_empty());
    }

    #[test]
    fn single_pass_prompt_includes_notes_when_present() {
        let page = RawPage {
            text: "Returns table".into(),
            notes: Some("mention net-of-fees".into()),
        };
        let prompt = single_pass_prompt(&page);
        assert!(prompt.contains("Returns table"));
        assert!(prompt.contains("net-of-fees"));

        let bare = RawPage {
            text: "x".into(),
            notes: None,
        };
        assert!(!single_pass_prompt(&bare).contains("Speaker notes"));
    }
}
