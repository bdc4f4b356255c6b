use serde::Serialize;

use crate::{
    model::entity::SubmissionRecord,
    scoring::{PerformanceSummary, StudentPerformance, build_performance_summary, group_by_student},
};

/// Submissions plus their aggregate, as returned by every results endpoint.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ResultsResponse {
    pub submissions: Vec<SubmissionRecord>,
    pub summary: PerformanceSummary,
}

impl ResultsResponse {
    pub fn new(submissions: Vec<SubmissionRecord>, pass_threshold: f64) -> Self {
        let summary = build_performance_summary(&submissions, pass_threshold);
        Self {
            submissions,
            summary,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceResponse {
    pub overall: PerformanceSummary,
    pub by_student: Vec<StudentPerformance>,
}

impl PerformanceResponse {
    pub fn new(submissions: &[SubmissionRecord], pass_threshold: f64) -> Self {
        Self {
            overall: build_performance_summary(submissions, pass_threshold),
            by_student: group_by_student(submissions, pass_threshold),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SummaryResponse {
    pub summary: PerformanceSummary,
}
