//! Prompt construction for phase generation.

use crate::model::Phase;

/// Build the generation prompt: the phase's custom template (or a default
/// preamble), the user input block, the assembled context block when
/// non-empty, and a closing instruction. Blocks are concatenated; the
/// template text is used verbatim.
pub fn build_prompt(phase: &Phase, user_input: &str, context: &str) -> String {
    let mut prompt = match phase.prompt_template.as_deref() {
        Some(template) if !template.is_empty() => template.to_string(),
        _ => format!(
            "Phase {}: {}\n\n{}\n\nPlease provide a comprehensive response based on the user's input.",
            phase.phase_number,
            phase.title,
            phase.description.as_deref().unwrap_or_default(),
        ),
    };

    prompt.push_str(&format!("\n\nUser Input:\n{user_input}"));

    if !context.is_empty() {
        prompt.push_str(&format!(
            "\n\nRelevant Context from Previous Phases:\n{context}"
        ));
    }

    prompt.push_str(
        "\n\nPlease provide a detailed, professional response that builds upon the context \
         and addresses the user's input:",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PhaseStatus;

    fn phase(template: Option<&str>) -> Phase {
        Phase {
            id: "p1".into(),
            project_id: "pr1".into(),
            phase_number: 2,
            title: "Requirements Analysis".into(),
            description: Some("Detailed analysis.".into()),
            prompt_template: template.map(Into::into),
            user_input: None,
            ai_response: None,
            status: PhaseStatus::NotStarted,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn uses_custom_template_verbatim() {
        let p = build_prompt(&phase(Some("Custom template.")), "my input", "");
        assert!(p.starts_with("Custom template."));
        assert!(p.contains("User Input:\nmy input"));
        assert!(!p.contains("Relevant Context"));
    }

    #[test]
    fn falls_back_to_default_preamble() {
        let p = build_prompt(&phase(None), "my input", "some context");
        assert!(p.starts_with("Phase 2: Requirements Analysis"));
        assert!(p.contains("Relevant Context from Previous Phases:\nsome context"));
    }

    #[test]
    fn empty_template_uses_default() {
        let p = build_prompt(&phase(Some("")), "x", "");
        assert!(p.starts_with("Phase 2:"));
    }
}
