//! Generation prompt assembly.
//!
//! The prompt contract: evidence blocks are labeled with the source paper
//! id, and the model is instructed to cite with the modern marker grammar
//! only. The post-processor strips any context labels the model leaks back.

use genpaper_db::PaperRecord;
use genpaper_llm::{LlmRequest, Message};

use crate::builder::ContextBundle;

const SYSTEM_PROMPT: &str = "\
You are an academic writing assistant drafting sections of a research paper.
Write precise, well-structured scholarly prose grounded ONLY in the provided
source material.

Citation rules:
- Cite evidence with the marker [@paper-id], using the exact paper id shown
  in the source label. Example: \"accuracy improved by 4% [@a1b2c3]\".
- Place the marker immediately after the claim it supports, before the
  sentence punctuation.
- Never invent paper ids, never cite sources that are not provided, and do
  not use any other citation format.
- Do not reproduce the source labels in your output.";

/// Assemble the prompt for drafting `instruction` about `topic` from the
/// selected evidence.
pub fn build_generation_prompt(
    topic: &str,
    instruction: &str,
    bundle: &ContextBundle,
    papers: &[PaperRecord],
) -> LlmRequest {
    let mut user = String::with_capacity(4096);
    user.push_str(&format!("Topic: {topic}\n\nSource material:\n\n"));

    for entry in &bundle.entries {
        let title = papers
            .iter()
            .find(|p| p.id == entry.paper_id)
            .map(|p| p.title.as_str())
            .unwrap_or("untitled");
        let section = entry.section_type.as_deref().unwrap_or("unknown section");
        user.push_str(&format!(
            "[CONTEXT FROM: {id}] ({title}, {section})\n{content}\n\n",
            id = entry.paper_id,
            content = entry.content,
        ));
    }

    user.push_str(&format!("Task: {instruction}\n"));

    LlmRequest::new(vec![Message::system(SYSTEM_PROMPT), Message::user(user)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ContextEntry;

    fn bundle() -> ContextBundle {
        ContextBundle {
            entries: vec![ContextEntry {
                paper_id: "a1b2c3".to_string(),
                chunk_id: "ch1".to_string(),
                section_type: Some("results".to_string()),
                score: 0.9,
                content: "Accuracy improved by 4%.".to_string(),
            }],
            token_estimate: 10,
        }
    }

    #[test]
    fn test_prompt_carries_context_and_rules() {
        let papers = vec![PaperRecord::stub("a1b2c3", "A Paper")];
        let req = build_generation_prompt("citation grounding", "Draft the results section.", &bundle(), &papers);
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, "system");
        assert!(req.messages[0].content.contains("[@paper-id]"));

        let user = &req.messages[1].content;
        assert!(user.contains("[CONTEXT FROM: a1b2c3]"));
        assert!(user.contains("A Paper"));
        assert!(user.contains("Accuracy improved by 4%."));
        assert!(user.contains("Draft the results section."));
    }

    #[test]
    fn test_unknown_paper_gets_placeholder_title() {
        let req = build_generation_prompt("t", "i", &bundle(), &[]);
        assert!(req.messages[1].content.contains("untitled"));
    }
}
