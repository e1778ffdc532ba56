//! Standard strategy — single-pass, deterministic, no LLM.
//!
//! Fastest and cheapest; lowest fidelity for complex layouts. Segmentation
//! rules: first non-table line is the title, blank lines delimit body
//! blocks, footnote markers ("*", "Source:", "Note:") mark footnotes,
//! consecutive pipe- or tab-delimited lines form tables, and `[image: name]`
//! markers become image references.

use std::sync::OnceLock;

use regex::Regex;

use crate::document::{BlockKind, Document, ImageRef, Slide, TableBlock, TextBlock};
use crate::extraction::raw::RawDeck;
use crate::extraction::ExtractionError;

fn image_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[image:\s*([^\]|]+?)(?:\|([^\]]+))?\]").expect("static image pattern")
    })
}

pub fn extract(raw: &RawDeck) -> Result<Document, ExtractionError> {
    let slides = raw
        .pages
        .iter()
        .enumerate()
        .map(|(i, page)| extract_page(i as u32 + 1, &page.text))
        .collect();
    Ok(Document::new(raw.file_name.clone(), slides)?)
}

fn extract_page(page_number: u32, text: &str) -> Slide {
    let mut blocks: Vec<TextBlock> = Vec::new();
    let mut tables: Vec<TableBlock> = Vec::new();
    let mut images: Vec<ImageRef> = Vec::new();

    let mut paragraph: Vec<String> = Vec::new();
    let mut table_lines: Vec<String> = Vec::new();
    let mut saw_title = false;

    let flush_paragraph = |paragraph: &mut Vec<String>, blocks: &mut Vec<TextBlock>, saw_title: &mut bool| {
        if paragraph.is_empty() {
            return;
        }
        let text = paragraph.join("\n");
        paragraph.clear();
        let kind = if !*saw_title {
            *saw_title = true;
            BlockKind::Title
        } else if is_footnote(&text) {
            BlockKind::Footnote
        } else {
            BlockKind::Body
        };
        blocks.push(TextBlock::new(kind, text));
    };

    let flush_table = |table_lines: &mut Vec<String>, tables: &mut Vec<TableBlock>| {
        if table_lines.is_empty() {
            return;
        }
        tables.push(parse_table(table_lines));
        table_lines.clear();
    };

    for line in text.lines() {
        let trimmed = line.trim();

        // Pull image markers out before text classification.
        let mut stripped = line.to_string();
        for cap in image_marker().captures_iter(line) {
            images.push(ImageRef {
                name: cap[1].trim().to_string(),
                alt_text: cap.get(2).map(|m| m.as_str().trim().to_string()),
            });
        }
        if image_marker().is_match(&stripped) {
            stripped = image_marker().replace_all(&stripped, "").to_string();
        }
        let stripped_trimmed = stripped.trim();

        if trimmed.is_empty() || stripped_trimmed.is_empty() {
            flush_table(&mut table_lines, &mut tables);
            flush_paragraph(&mut paragraph, &mut blocks, &mut saw_title);
            continue;
        }

        if is_table_line(stripped_trimmed) {
            flush_paragraph(&mut paragraph, &mut blocks, &mut saw_title);
            table_lines.push(stripped_trimmed.to_string());
        } else {
            flush_table(&mut table_lines, &mut tables);
            paragraph.push(stripped_trimmed.to_string());
        }
    }
    flush_table(&mut table_lines, &mut tables);
    flush_paragraph(&mut paragraph, &mut blocks, &mut saw_title);

    Slide {
        page_number,
        blocks,
        tables,
        images,
    }
}

fn is_table_line(line: &str) -> bool {
    line.matches('|').count() >= 2 || line.contains('\t')
}

fn is_footnote(text: &str) -> bool {
    let lower = text.to_lowercase();
    text.starts_with('*')
        || text.starts_with('¹')
        || lower.starts_with("source:")
        || lower.starts_with("note:")
}

fn parse_table(lines: &[String]) -> TableBlock {
    let split = |line: &str| -> Vec<String> {
        let sep = if line.contains('|') { '|' } else { '\t' };
        line.split(sep)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    };

    let mut rows: Vec<Vec<String>> = lines.iter().map(|l| split(l)).collect();
    let headers = if rows.len() > 1 { rows.remove(0) } else { Vec::new() };
    TableBlock { headers, rows }
}
