//! Multi-agent strategy: two sequential LLM passes per page.
//!
//! A draft pass produces a first structured reading of the page; a reviewer
//! pass then receives both the draft and the raw text and corrects what the
//! draft missed or invented. Slowest strategy, highest fidelity on dense
//! layouts.

use crate::document::Document;
use crate::extraction::raw::{RawDeck, RawPage};
use crate::extraction::schema::{
    single_pass_prompt, slide_from_schema, SlideSchema, EXTRACTION_SYSTEM_PROMPT,
};
use crate::extraction::ExtractionError;
use crate::gateway::ModelGateway;

pub fn extract(gateway: &ModelGateway, raw: &RawDeck) -> Result<Document, ExtractionError> {
    let mut slides = Vec::with_capacity(raw.pages.len());
    for (i, page) in raw.pages.iter().enumerate() {
        let page_number = i as u32 + 1;

        let draft: SlideSchema =
            gateway.complete_json(EXTRACTION_SYSTEM_PROMPT, &single_pass_prompt(page))?;
        tracing::debug!(
            page = page_number,
            blocks = draft.blocks.len(),
            tables = draft.tables.len(),
            "Draft pass complete"
        );

        let reviewed: SlideSchema =
            gateway.complete_json(EXTRACTION_SYSTEM_PROMPT, &review_prompt(page, &draft))?;
        slides.push(slide_from_schema(page_number, reviewed));
    }
    Ok(Document::new(raw.file_name.clone(), slides)?)
}

fn review_prompt(page: &RawPage, draft: &SlideSchema) -> String {
    let draft_json = serde_json::to_string_pretty(draft).unwrap_or_else(|_| "{}".into());
    format!(
        "Review this draft extraction of a slide against the raw text. Fix mistakes: \
         restore any text the draft dropped, remove anything the draft invented, and \
         correct block kinds and table cells. Emit the corrected JSON in the same shape.\n\n\
         Raw slide text:\n{}\n\nDraft extraction:\n{}",
        page.text, draft_json
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::provider::{MockFailure, MockProvider};
    use crate::gateway::GatewayConfig;

    fn page(text: &str) -> RawPage {
        RawPage {
            text: text.into(),
            notes: None,
        }
    }

    #[test]
    fn two_passes_per_page_and_review_wins() {
        // Draft misreads the title; the review pass returns the corrected form.
        let draft = r#"{"blocks": [{"text": "Fnd Overview", "kind": "title"}]}"#;
        let review = r#"{"blocks": [{"text": "Fund Overview", "kind": "title"}]}"#;
        let provider = MockProvider::new("mock", vec![Ok(draft.into()), Ok(review.into())]);
        let gateway = ModelGateway::new(vec![Box::new(provider)], GatewayConfig::default());

        let raw = RawDeck {
            file_name: "deck.pptx".into(),
            pages: vec![page("Fund Overview")],
        };
        let doc = extract(&gateway, &raw).unwrap();
        assert_eq!(doc.slide(1).unwrap().blocks[0].text, "Fund Overview");
    }

    #[test]
    fn review_prompt_carries_draft_and_raw_text() {
        let draft: SlideSchema =
            serde_json::from_str(r#"{"blocks": [{"text": "Disclaimer", "kind": "footnote"}]}"#)
                .unwrap();
        let prompt = review_prompt(&page("Past performance is no guarantee"), &draft);
        assert!(prompt.contains("Past performance is no guarantee"));
        assert!(prompt.contains("Disclaimer"));
    }

    #[test]
    fn draft_failure_fails_the_extraction() {
        let provider = MockProvider::always_failing("down", MockFailure::Connection);
        let gateway = ModelGateway::new(vec![Box::new(provider)], GatewayConfig::default());
        let raw = RawDeck {
            file_name: "deck.pptx".into(),
            pages: vec![page("anything")],
        };
        assert!(matches!(
            extract(&gateway, &raw),
            Err(ExtractionError::Model(_))
        ));
    }
}
