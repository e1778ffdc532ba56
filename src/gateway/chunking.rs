//! Token-aware prompt chunking.
//!
//! A chunkable prompt is a fixed header (instructions, rule texts), an
//! ordered list of per-slide sections, and a fixed footer (output format).
//! When the rendered whole exceeds the token budget, sections are split
//! into contiguous groups and each group rendered with the same header and
//! footer. Merging the partial results is the caller's policy.

/// Rough token estimate: one token per four characters. Deliberately
/// conservative for mixed prose and JSON.
const CHARS_PER_TOKEN: usize = 4;

/// Estimated token count for a text.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// One chunkable unit of document content, usually a single slide.
#[derive(Debug, Clone)]
pub struct PromptSection {
    /// Heading rendered above the section, e.g. "--- Slide 3 ---".
    pub label: String,
    pub text: String,
}

/// A prompt with a fixed frame and chunkable middle.
#[derive(Debug, Clone)]
pub struct PromptFrame {
    pub header: String,
    pub sections: Vec<PromptSection>,
    pub footer: String,
}

impl PromptFrame {
    /// Render a subset of sections inside the frame.
    fn render(&self, sections: &[&PromptSection]) -> String {
        let mut out = String::with_capacity(
            self.header.len()
                + self.footer.len()
                + sections.iter().map(|s| s.label.len() + s.text.len() + 4).sum::<usize>(),
        );
        out.push_str(&self.header);
        for section in sections {
            out.push_str("\n\n");
            out.push_str(&section.label);
            out.push('\n');
            out.push_str(&section.text);
        }
        out.push_str("\n\n");
        out.push_str(&self.footer);
        out
    }

    /// Tokens consumed by the frame itself, before any section.
    fn frame_tokens(&self) -> usize {
        estimate_tokens(&self.header) + estimate_tokens(&self.footer)
    }
}

/// Split a frame into rendered prompts that each fit `budget_tokens`.
///
/// Sections stay contiguous and in order, so merged results are
/// deterministic regardless of completion order. A single oversized section
/// still forms its own chunk — the provider may truncate, but dropping
/// content silently would be worse.
pub fn split_prompts(frame: &PromptFrame, budget_tokens: usize) -> Vec<String> {
    if frame.sections.is_empty() {
        return vec![frame.render(&[])];
    }

    let frame_cost = frame.frame_tokens();
    let mut chunks: Vec<Vec<&PromptSection>> = Vec::new();
    let mut current: Vec<&PromptSection> = Vec::new();
    let mut current_cost = frame_cost;

    for section in &frame.sections {
        let section_cost = estimate_tokens(&section.label) + estimate_tokens(&section.text);
        if !current.is_empty() && current_cost + section_cost > budget_tokens {
            chunks.push(std::mem::take(&mut current));
            current_cost = frame_cost;
        }
        current_cost += section_cost;
        current.push(section);
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks.iter().map(|group| frame.render(group)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(label: &str, chars: usize) -> PromptSection {
        PromptSection {
            label: label.to_string(),
            text: "x".repeat(chars),
        }
    }

    fn frame(sections: Vec<PromptSection>) -> PromptFrame {
        PromptFrame {
            header: "HEADER".into(),
            sections,
            footer: "FOOTER".into(),
        }
    }

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn small_frame_stays_single_chunk() {
        let f = frame(vec![section("S1", 40), section("S2", 40)]);
        let prompts = split_prompts(&f, 1_000);
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("HEADER"));
        assert!(prompts[0].ends_with("FOOTER"));
        assert!(prompts[0].contains("S1"));
        assert!(prompts[0].contains("S2"));
    }

    #[test]
    fn oversized_frame_splits_preserving_order() {
        // Each section ~100 tokens; budget fits roughly two per chunk.
        let f = frame(vec![
            section("S1", 400),
            section("S2", 400),
            section("S3", 400),
            section("S4", 400),
        ]);
        let prompts = split_prompts(&f, 220);
        assert!(prompts.len() >= 2, "expected multiple chunks");
        // Every chunk carries the full frame.
        for p in &prompts {
            assert!(p.starts_with("HEADER"));
            assert!(p.ends_with("FOOTER"));
        }
        // Sections appear exactly once, in order across chunks.
        let joined = prompts.join("|");
        let positions: Vec<usize> = ["S1", "S2", "S3", "S4"]
            .iter()
            .map(|s| joined.find(*s).expect("section present"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn single_oversized_section_forms_own_chunk() {
        let f = frame(vec![section("BIG", 4_000), section("SMALL", 8)]);
        let prompts = split_prompts(&f, 100);
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("BIG"));
        assert!(prompts[1].contains("SMALL"));
    }

    #[test]
    fn empty_sections_render_bare_frame() {
        let prompts = split_prompts(&frame(vec![]), 100);
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("HEADER"));
    }
}
