use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{Question, percentage, question_max_marks};

#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("invalid marks {marks} for question {question_id}")]
    InvalidMarks { question_id: Uuid, marks: f64 },
}

/// Answer as sent by a student.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    #[serde(default)]
    pub answer: String,
}

/// Answer as stored on a submission. `marks` stays `null` until a theory
/// answer is graded by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: Uuid,
    pub answer: String,
    pub marks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Teacher-supplied marks for one answer.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeInput {
    pub question_id: Uuid,
    #[serde(default)]
    pub marks: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMetrics {
    pub graded_answers: Vec<AnswerRecord>,
    pub total_marks: f64,
    pub max_marks: f64,
    pub percentage: f64,
    pub fully_graded: bool,
}

pub fn normalize_answer(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Scores `answers` against `questions`.
///
/// Every question contributes its max marks whether it was answered or not,
/// and gets exactly one graded answer in test order. MCQ answers are compared
/// after normalization. Answers pointing at questions that are not part of
/// the test are kept at the end with zero marks and don't change the max.
pub fn calculate_submission_metrics(
    questions: &[Question],
    answers: &[SubmittedAnswer],
) -> SubmissionMetrics {
    let by_question: HashMap<Uuid, &SubmittedAnswer> =
        answers.iter().map(|a| (a.question_id, a)).collect();

    let mut total_marks = 0.0;
    let mut max_marks = 0.0;

    let mut graded_answers: Vec<AnswerRecord> = questions
        .iter()
        .map(|question| {
            let question_max = question_max_marks(question);
            max_marks += question_max;

            let answer = by_question
                .get(&question.id)
                .map(|a| a.answer.clone())
                .unwrap_or_default();

            if !question.is_mcq() {
                return AnswerRecord {
                    question_id: question.id,
                    answer,
                    marks: None,
                    feedback: None,
                };
            }

            let expected = question.correct_answer.as_deref().map(normalize_answer);
            let is_correct = expected.is_some_and(|c| c == normalize_answer(&answer));
            let marks = if is_correct { question_max } else { 0.0 };
            total_marks += marks;

            AnswerRecord {
                question_id: question.id,
                answer,
                marks: Some(marks),
                feedback: Some(String::from(if is_correct { "Correct" } else { "Incorrect" })),
            }
        })
        .collect();

    let known: HashSet<Uuid> = questions.iter().map(|q| q.id).collect();
    let mut seen = HashSet::new();
    for stray in answers.iter().filter(|a| !known.contains(&a.question_id)) {
        if !seen.insert(stray.question_id) {
            continue;
        }
        graded_answers.push(AnswerRecord {
            question_id: stray.question_id,
            answer: stray.answer.clone(),
            marks: Some(0.0),
            feedback: Some(String::from("Question not found")),
        });
    }

    SubmissionMetrics {
        graded_answers,
        total_marks,
        max_marks,
        percentage: percentage(total_marks, max_marks),
        fully_graded: !questions.iter().any(|q| !q.is_mcq()),
    }
}

/// Applies teacher grades to stored answers and recomputes the aggregate.
///
/// Grades only overwrite what they carry, so applying the same grades twice
/// gives the same result. `stored_max` wins when positive, otherwise the max
/// is recomputed from `questions`.
pub fn apply_grades(
    answers: Vec<AnswerRecord>,
    grades: &[GradeInput],
    questions: &[Question],
    stored_max: f64,
) -> Result<SubmissionMetrics, ScoringError> {
    for grade in grades {
        match grade.marks {
            Some(marks) if !marks.is_finite() || marks < 0.0 => {
                return Err(ScoringError::InvalidMarks {
                    question_id: grade.question_id,
                    marks,
                });
            }
            _ => {}
        }
    }

    let by_question: HashMap<Uuid, &GradeInput> =
        grades.iter().map(|g| (g.question_id, g)).collect();

    let mut total_marks = 0.0;
    let graded_answers: Vec<AnswerRecord> = answers
        .into_iter()
        .map(|mut answer| {
            if let Some(grade) = by_question.get(&answer.question_id) {
                if grade.marks.is_some() {
                    answer.marks = grade.marks;
                }
                if grade.feedback.is_some() {
                    answer.feedback = grade.feedback.clone();
                }
            }
            total_marks += answer.marks.unwrap_or(0.0);
            answer
        })
        .collect();

    let max_marks = if stored_max > 0.0 {
        stored_max
    } else {
        questions.iter().map(question_max_marks).sum()
    };

    Ok(SubmissionMetrics {
        graded_answers,
        total_marks,
        max_marks,
        percentage: percentage(total_marks, max_marks),
        fully_graded: true,
    })
}
