//! Exhaustive-with-caching strategy: one focused LLM call per field class
//! (blocks, tables, images) per page, memoized on the page text hash.
//!
//! Re-running a job over an unchanged deck, or over a revision where only a
//! few slides changed, reuses the cached field answers and only pays for the
//! pages that differ.

use std::collections::HashMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::document::{Document, Slide};
use crate::extraction::raw::{RawDeck, RawPage};
use crate::extraction::schema::{slide_from_schema, SlideSchema, EXTRACTION_SYSTEM_PROMPT};
use crate::extraction::ExtractionError;
use crate::gateway::ModelGateway;

/// Memo of per-field answers, keyed by page-content hash and field name.
/// Shared across jobs through the extraction manager.
#[derive(Default)]
pub struct ExtractionCache {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl ExtractionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock().expect("extraction cache lock");
        entries
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    fn put<T: Serialize>(&self, key: String, value: &T) {
        if let Ok(json) = serde_json::to_value(value) {
            let mut entries = self.entries.lock().expect("extraction cache lock");
            entries.insert(key, json);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("extraction cache lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all memoized answers. Long-running deployments call this on a
    /// maintenance schedule; the memo otherwise grows with every distinct
    /// page ever extracted.
    pub fn clear(&self) {
        self.entries.lock().expect("extraction cache lock").clear();
    }
}

fn page_key(page: &RawPage, field: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(page.text.as_bytes());
    if let Some(notes) = &page.notes {
        hasher.update(b"\x00");
        hasher.update(notes.as_bytes());
    }
    format!("{:x}:{field}", hasher.finalize())
}

pub fn extract(
    gateway: &ModelGateway,
    cache: &ExtractionCache,
    raw: &RawDeck,
) -> Result<Document, ExtractionError> {
    let mut slides = Vec::with_capacity(raw.pages.len());
    for (i, page) in raw.pages.iter().enumerate() {
        let page_number = i as u32 + 1;
        slides.push(extract_page(gateway, cache, page_number, page)?);
    }
    Ok(Document::new(raw.file_name.clone(), slides)?)
}

fn extract_page(
    gateway: &ModelGateway,
    cache: &ExtractionCache,
    page_number: u32,
    page: &RawPage,
) -> Result<Slide, ExtractionError> {
    let schema = SlideSchema {
        blocks: field(gateway, cache, page, "blocks", &blocks_prompt(page))?,
        tables: field(gateway, cache, page, "tables", &tables_prompt(page))?,
        images: field(gateway, cache, page, "images", &images_prompt(page))?,
    };
    Ok(slide_from_schema(page_number, schema))
}

fn field<T>(
    gateway: &ModelGateway,
    cache: &ExtractionCache,
    page: &RawPage,
    name: &str,
    prompt: &str,
) -> Result<T, ExtractionError>
where
    T: DeserializeOwned + Serialize,
{
    let key = page_key(page, name);
    if let Some(cached) = cache.get::<T>(&key) {
        tracing::debug!(field = name, "Extraction cache hit");
        return Ok(cached);
    }
    let value: T = gateway.complete_json(EXTRACTION_SYSTEM_PROMPT, prompt)?;
    cache.put(key, &value);
    Ok(value)
}

fn blocks_prompt(page: &RawPage) -> String {
    format!(
        "List every text block on this slide as a JSON array with the shape\n\
         [{{\"text\", \"kind\": \"title\"|\"body\"|\"footnote\"}}]. Include every piece of \
         prose; exclude table cells and image references.\n\nRaw slide text:\n{}",
        page.text
    )
}

fn tables_prompt(page: &RawPage) -> String {
    format!(
        "List every table on this slide as a JSON array with the shape\n\
         [{{\"headers\": [..], \"rows\": [[..]]}}]. Emit [] if the slide has no tables.\n\n\
         Raw slide text:\n{}",
        page.text
    )
}

fn images_prompt(page: &RawPage) -> String {
    format!(
        "List every image or chart referenced on this slide as a JSON array with the shape\n\
         [{{\"name\", \"alt_text\"}}]. Emit [] if there are none.\n\nRaw slide text:\n{}",
        page.text
    )
}
