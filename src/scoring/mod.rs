//! Test auto-grading and performance aggregation.
//!
//! Everything in here is pure: handlers load the test and its submissions,
//! call into this module and persist whatever comes back.

mod question;
pub use question::{Question, QuestionType, question_max_marks};

mod metrics;
pub use metrics::{
    AnswerRecord, GradeInput, ScoringError, SubmissionMetrics, SubmittedAnswer, apply_grades,
    calculate_submission_metrics, normalize_answer,
};

mod performance;
pub use performance::{
    PerformanceSummary, Scored, StudentPerformance, StudentScored, build_performance_summary,
    group_by_student,
};

/// Percentage at or above which a submission counts as passed.
pub const DEFAULT_PASS_THRESHOLD: f64 = 40.0;

/// Rounds half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `total / max * 100` rounded to two decimals, 0 when nothing can be scored.
pub fn percentage(total: f64, max: f64) -> f64 {
    if max > 0.0 {
        round2(total / max * 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round2_matches_fixed_point() {
        assert_eq!(round2(66.666_666), 66.67);
        assert_eq!(round2(46.664), 46.66);
        assert_eq!(round2(80.0), 80.0);
    }

    #[test]
    fn percentage_of_zero_max_is_zero() {
        assert_eq!(percentage(0.0, 0.0), 0.0);
        assert_eq!(percentage(5.0, 0.0), 0.0);
        assert_eq!(percentage(2.0, 3.0), 66.67);
    }
}
