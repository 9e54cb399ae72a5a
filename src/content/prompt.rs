//! Prompt text for per-concept explanations

use crate::types::{Concept, MasteryTier};

/// Build the instruction sent to the text generator
pub fn build_prompt(student_id: u32, concept: Concept, tier: MasteryTier) -> String {
    let topic = concept.gloss();
    let level = tier.label();
    format!(
        r#"You are an educational tutor and an expert in the Flipped Classroom methodology.
The student with ID {student_id} needs content about **{topic}**.
The student's knowledge level is **{level}**.

Please provide the content following these instructions:
1. Explain the concept clearly, adapted to the {level} level.
2. Include at least two practical examples or relevant scenarios.
3. Use an informative and motivating tone.
4. Format the answer in Markdown, with headings and lists where useful.
5. The content must be useful and directly applicable for a student who is learning."#
    )
}

/// Text shown in place of generated content when generation fails
pub fn placeholder(concept: Concept) -> String {
    format!("Could not generate dynamic content for **{}**.", concept.gloss())
}

/// Transient notice shown to the user alongside the placeholder
pub fn failure_notice(concept: Concept, error: &anyhow::Error) -> String {
    format!(
        "Error generating content for '{}': {}. Please try again later.",
        concept.gloss(),
        error
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_gloss_and_tier() {
        let prompt = build_prompt(7, Concept::Roles, MasteryTier::Intermediate);
        assert!(prompt.contains("ID 7"));
        assert!(prompt.contains(Concept::Roles.gloss()));
        assert!(prompt.contains("**Intermediate**"));
        assert!(prompt.contains("at least two practical examples"));
        assert!(prompt.contains("Markdown"));
    }

    #[test]
    fn test_placeholder_names_concept() {
        let text = placeholder(Concept::Benefits);
        assert!(text.contains("the benefits of the Flipped Classroom"));
    }
}
