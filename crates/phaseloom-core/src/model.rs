use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Lifecycle status of a phase.
///
/// `InProgress` exists as a value only; no pipeline operation currently
/// transitions into it (reserved for concurrent-edit signaling).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    NotStarted,
    InProgress,
    Completed,
    Stale,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::NotStarted => "not_started",
            PhaseStatus::InProgress => "in_progress",
            PhaseStatus::Completed => "completed",
            PhaseStatus::Stale => "stale",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "not_started" => PhaseStatus::NotStarted,
            "in_progress" => PhaseStatus::InProgress,
            "completed" => PhaseStatus::Completed,
            "stale" => PhaseStatus::Stale,
            _ => PhaseStatus::NotStarted, // Default fallback
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub id: String,
    pub project_id: String,
    pub phase_number: u32,
    pub title: String,
    pub description: Option<String>,
    pub prompt_template: Option<String>,
    pub user_input: Option<String>,
    pub ai_response: Option<String>,
    pub status: PhaseStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Phase {
    /// True when the phase holds a full input/response pair worth archiving.
    pub fn has_content(&self) -> bool {
        non_empty(&self.user_input) && non_empty(&self.ai_response)
    }
}

fn non_empty(s: &Option<String>) -> bool {
    s.as_deref().is_some_and(|v| !v.is_empty())
}

/// Immutable archived snapshot of a phase's prior input/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseDraft {
    pub id: String,
    pub phase_id: String,
    pub version: u32,
    pub content: String,
    pub user_input: Option<String>,
    pub ai_response: Option<String>,
    pub created_at: String,
}

/// A semantic-search hit against the embedding index.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarPhase {
    pub phase_id: String,
    pub phase_number: u32,
    pub title: String,
    pub ai_response: Option<String>,
    pub similarity: f64,
}

/// Assembled context: the joined text plus ordered source tags
/// (sequential first, then semantic).
#[derive(Debug, Clone, Default)]
pub struct ContextBundle {
    pub text: String,
    pub sources: Vec<String>,
}

impl ContextBundle {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Output of a content-generation provider call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub provider: String,
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub user_input: String,
    pub use_rag: bool,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub phase: Phase,
    pub context_sources: Vec<String>,
    /// Version the prior content was archived under, if any.
    pub archived_version: Option<u32>,
    /// Number of downstream phases flipped to stale by the cascade.
    pub marked_stale: usize,
}

/// Outcome of a non-generating mutation (draft restore, field update).
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub phase: Phase,
    pub archived_version: Option<u32>,
    pub marked_stale: usize,
}

/// Partial update of a phase's editable fields.
#[derive(Debug, Clone, Default)]
pub struct PhaseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub user_input: Option<String>,
    pub prompt_template: Option<String>,
}

impl PhaseUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.user_input.is_none()
            && self.prompt_template.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectProgress {
    pub total: u32,
    pub completed: u32,
    pub stale: u32,
    pub in_progress: u32,
    pub not_started: u32,
    pub percent: f64,
    pub current_phase: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_db_strings() {
        for status in [
            PhaseStatus::NotStarted,
            PhaseStatus::InProgress,
            PhaseStatus::Completed,
            PhaseStatus::Stale,
        ] {
            assert_eq!(PhaseStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn has_content_requires_both_sides() {
        let mut phase = Phase {
            id: "p".into(),
            project_id: "pr".into(),
            phase_number: 1,
            title: "t".into(),
            description: None,
            prompt_template: None,
            user_input: Some("input".into()),
            ai_response: None,
            status: PhaseStatus::NotStarted,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(!phase.has_content());
        phase.ai_response = Some(String::new());
        assert!(!phase.has_content());
        phase.ai_response = Some("response".into());
        assert!(phase.has_content());
    }
}
