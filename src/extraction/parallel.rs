//! Parallel strategy: single-pass LLM extraction with pages processed
//! concurrently by a bounded pool of worker threads.
//!
//! Pages are split into contiguous groups, one group per worker. Workers
//! return `(page_number, Slide)` pairs; results are re-sorted by page before
//! assembly so completion order never affects the document. Any worker
//! failure fails the whole extraction.

use crate::document::Document;
use crate::extraction::raw::RawDeck;
use crate::extraction::schema::extract_slide_single_pass;
use crate::extraction::ExtractionError;
use crate::gateway::ModelGateway;

pub fn extract(
    gateway: &ModelGateway,
    raw: &RawDeck,
    max_workers: usize,
) -> Result<Document, ExtractionError> {
    if raw.pages.is_empty() {
        return Ok(Document::new(raw.file_name.clone(), Vec::new())?);
    }
    let workers = max_workers.max(1).min(raw.pages.len());
    let group_size = raw.pages.len().div_ceil(workers);

    let results: Vec<Result<Vec<_>, ExtractionError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = raw
            .pages
            .chunks(group_size)
            .enumerate()
            .map(|(group, pages)| {
                let first_page = (group * group_size) as u32 + 1;
                scope.spawn(move || {
                    let mut slides = Vec::with_capacity(pages.len());
                    for (offset, page) in pages.iter().enumerate() {
                        let page_number = first_page + offset as u32;
                        let slide = extract_slide_single_pass(gateway, page_number, page)?;
                        slides.push((page_number, slide));
                    }
                    Ok(slides)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(result) => result,
                // A panicking worker must fail the extraction, not take the
                // job thread down with it.
                Err(panic) => {
                    let detail = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "worker thread panicked".into());
                    Err(ExtractionError::Worker(detail))
                }
            })
            .collect()
    });

    let mut numbered = Vec::with_capacity(raw.pages.len());
    for group in results {
        numbered.extend(group?);
    }
    numbered.sort_by_key(|(page, _)| *page);

    let slides = numbered.into_iter().map(|(_, slide)| slide).collect();
    Ok(Document::new(raw.file_name.clone(), slides)?)
}
