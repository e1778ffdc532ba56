//! Prompt assembly for module evaluation.
//!
//! The frame's header carries the domain guidance and the filtered rule
//! list; each slide becomes one chunkable section; the footer pins the
//! output schema. Chunking against the gateway's minimum context window
//! happens downstream.

use crate::catalog::Rule;
use crate::document::{Document, Slide};
use crate::gateway::{PromptFrame, PromptSection};
use crate::modules::DomainModule;

/// System prompt for all module evaluations.
pub const REVIEW_SYSTEM_PROMPT: &str = "You are a compliance reviewer for financial marketing \
    materials. You check slides against an explicit rule list and report violations. Only \
    report a violation when a listed rule is clearly not satisfied; cite only rule ids from \
    the list. Output valid JSON only, inside a ```json fence.";

pub fn build_frame(
    module: &dyn DomainModule,
    rules: &[&Rule],
    document: &Document,
    reference: Option<&str>,
) -> PromptFrame {
    PromptFrame {
        header: header(module, rules, document, reference),
        sections: document.slides().iter().map(slide_section).collect(),
        footer: FOOTER.to_string(),
    }
}

const FOOTER: &str = "Report every violation you find as JSON:\n\
    {\"violations\": [{\"rule_id\": \"<id from the rule list>\", \"page_number\": <slide number>, \
    \"description\": \"<what is wrong on that slide>\", \"suggested_action\": \"<how to fix it>\"}]}\n\
    If no rule is violated, reply {\"violations\": []}.";

fn header(
    module: &dyn DomainModule,
    rules: &[&Rule],
    document: &Document,
    reference: Option<&str>,
) -> String {
    let mut out = String::new();
    out.push_str(module.guidance());
    if let Some(reference) = reference {
        out.push_str("\n\nApproved reference material for cross-checking claims:\n");
        out.push_str(reference);
    }
    out.push_str(&format!(
        "\n\nDocument under review: \"{}\" ({} slides). Slides follow below; each is \
         delimited and numbered.\n\nRules to check:\n",
        document.file_name,
        document.page_count()
    ));
    for rule in rules {
        out.push_str(&format!(
            "- [{}] ({}) {}\n",
            rule.id, rule.severity, rule.description
        ));
    }
    out
}

fn slide_section(slide: &Slide) -> PromptSection {
    let mut text = slide.text();
    for table in &slide.tables {
        text.push_str("\nTable: ");
        if !table.headers.is_empty() {
            text.push_str(&table.headers.join(" | "));
        }
        for row in &table.rows {
            text.push_str("\n  ");
            text.push_str(&row.join(" | "));
        }
    }
    for image in &slide.images {
        text.push_str(&format!(
            "\nImage: {}{}",
            image.name,
            image
                .alt_text
                .as_deref()
                .map(|a| format!(" ({a})"))
                .unwrap_or_default()
        ));
    }
    PromptSection {
        label: format!("--- Slide {} ---", slide.page_number),
        text,
    }
}
