use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    Theory,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Assigned on test creation when the client leaves it out.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_marks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_answer: Option<String>,
}

impl Question {
    pub fn is_mcq(&self) -> bool {
        self.kind == QuestionType::Mcq
    }
}

/// Explicit positive `max_marks`, otherwise 1 for MCQ and 0 for theory.
pub fn question_max_marks(question: &Question) -> f64 {
    match question.max_marks {
        Some(marks) if marks > 0.0 && marks.is_finite() => marks,
        _ if question.is_mcq() => 1.0,
        _ => 0.0,
    }
}
