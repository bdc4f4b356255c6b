use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use super::round2;

/// Anything that carries a final percentage.
pub trait Scored {
    fn percentage(&self) -> f64;
}

impl Scored for f64 {
    fn percentage(&self) -> f64 {
        *self
    }
}

/// A scored item that belongs to a student.
pub trait StudentScored: Scored {
    fn student_id(&self) -> Uuid;
    fn student_name(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub tests_taken: usize,
    pub average_percentage: f64,
    pub best_percentage: f64,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentPerformance {
    pub student_id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub summary: PerformanceSummary,
}

pub fn build_performance_summary<T: Scored>(items: &[T], pass_threshold: f64) -> PerformanceSummary {
    if items.is_empty() {
        return PerformanceSummary::default();
    }

    let count = items.len() as f64;
    let percentages: Vec<f64> = items.iter().map(Scored::percentage).collect();

    let average = percentages.iter().sum::<f64>() / count;
    let best = percentages.iter().copied().fold(f64::MIN, f64::max);
    let passed = percentages.iter().filter(|p| **p >= pass_threshold).count() as f64;

    PerformanceSummary {
        tests_taken: items.len(),
        average_percentage: round2(average),
        best_percentage: round2(best),
        pass_rate: round2(passed / count * 100.0),
    }
}

/// One summary per student, ordered by each student's first appearance.
pub fn group_by_student<T: StudentScored>(items: &[T], pass_threshold: f64) -> Vec<StudentPerformance> {
    let mut order: Vec<(Uuid, &str)> = Vec::new();
    let mut groups: HashMap<Uuid, Vec<f64>> = HashMap::new();

    for item in items {
        let entry = groups.entry(item.student_id()).or_insert_with(|| {
            order.push((item.student_id(), item.student_name()));
            Vec::new()
        });
        entry.push(item.percentage());
    }

    order
        .into_iter()
        .map(|(student_id, name)| StudentPerformance {
            student_id,
            name: name.to_string(),
            summary: build_performance_summary(&groups[&student_id], pass_threshold),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scoring::DEFAULT_PASS_THRESHOLD;

    struct Row {
        student: Uuid,
        name: &'static str,
        percentage: f64,
    }

    impl Scored for Row {
        fn percentage(&self) -> f64 {
            self.percentage
        }
    }

    impl StudentScored for Row {
        fn student_id(&self) -> Uuid {
            self.student
        }

        fn student_name(&self) -> &str {
            self.name
        }
    }

    #[test]
    fn empty_input_is_all_zero() {
        let summary = build_performance_summary::<f64>(&[], DEFAULT_PASS_THRESHOLD);
        assert_eq!(
            summary,
            PerformanceSummary {
                tests_taken: 0,
                average_percentage: 0.0,
                best_percentage: 0.0,
                pass_rate: 0.0,
            }
        );
    }

    #[test]
    fn aggregates_average_best_and_pass_rate() {
        let summary = build_performance_summary(&[80.0, 40.0, 20.0], DEFAULT_PASS_THRESHOLD);
        assert_eq!(summary.tests_taken, 3);
        assert_eq!(summary.average_percentage, 46.67);
        assert_eq!(summary.best_percentage, 80.0);
        assert_eq!(summary.pass_rate, 66.67);
    }

    #[test]
    fn threshold_is_inclusive() {
        let summary = build_performance_summary(&[39.99, 40.0], DEFAULT_PASS_THRESHOLD);
        assert_eq!(summary.pass_rate, 50.0);

        let strict = build_performance_summary(&[39.99, 40.0], 50.0);
        assert_eq!(strict.pass_rate, 0.0);
    }

    #[test]
    fn all_zero_scores_have_zero_best() {
        let summary = build_performance_summary(&[0.0, 0.0], DEFAULT_PASS_THRESHOLD);
        assert_eq!(summary.best_percentage, 0.0);
        assert_eq!(summary.pass_rate, 0.0);
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let rows = vec![
            Row { student: bob, name: "Bob", percentage: 30.0 },
            Row { student: alice, name: "Alice", percentage: 90.0 },
            Row { student: bob, name: "Bob", percentage: 70.0 },
        ];

        let groups = group_by_student(&rows, DEFAULT_PASS_THRESHOLD);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Bob");
        assert_eq!(groups[0].summary.tests_taken, 2);
        assert_eq!(groups[0].summary.average_percentage, 50.0);
        assert_eq!(groups[0].summary.pass_rate, 50.0);
        assert_eq!(groups[1].student_id, alice);
        assert_eq!(groups[1].summary.best_percentage, 90.0);
    }

    #[test]
    fn student_summary_serializes_flat() {
        let perf = StudentPerformance {
            student_id: Uuid::nil(),
            name: String::from("Ann"),
            summary: build_performance_summary(&[50.0], DEFAULT_PASS_THRESHOLD),
        };
        let value = serde_json::to_value(&perf).unwrap();
        assert_eq!(value["name"], "Ann");
        assert_eq!(value["testsTaken"], 1);
        assert_eq!(value["passRate"], 100.0);
    }
}
