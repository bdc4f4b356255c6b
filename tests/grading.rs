mod common;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::common::{
    Action, Flow, FlowContext, create_first_admin_action, create_teacher_action, login_action,
    login_admin_action, login_user_id, register_action, setup_server, setup_test_db,
};

fn question_id(ctx: &FlowContext, index: usize) -> Value {
    ctx.get("test")["test"]["questions"][index]["id"].clone()
}

/// Admin, two teachers, one enrolled student and a course taught by `teacher1`.
fn school_setup(flow: Flow) -> Flow {
    flow.step(create_first_admin_action().with_save_cookies(false))
        .step(register_action("Sam Student", "sam@school.test", "sam-pass").with_save_cookies(false))
        .step(login_action("sam@school.test", "sam-pass").with_save_as("student_login"))
        .step(login_admin_action())
        .step(create_teacher_action("Tess Teacher", "tess@school.test", "tess-pass").with_save_as("teacher1"))
        .step(create_teacher_action("Olga Other", "olga@school.test", "olga-pass"))
        .step(
            Action::new("create_course", "POST", "/api/admin/courses")
                .with_dyn_body(|ctx| {
                    json!({
                        "title": "Geography",
                        "description": "Capitals and rivers",
                        "teacherId": ctx.get("teacher1")["user"]["id"],
                    })
                })
                .with_expect(StatusCode::CREATED)
                .with_save_as("course"),
        )
        .step(
            Action::new("assign_course", "POST", "/api/admin/assign-course").with_dyn_body(|ctx| {
                json!({
                    "courseId": ctx.get("course")["course"]["id"],
                    "studentIds": [login_user_id(ctx, "student_login")],
                })
            }),
        )
}

#[tokio::test]
async fn route_submit_and_grade_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    school_setup(Flow::new())
        .step(login_action("tess@school.test", "tess-pass").with_clear_cookies(true))
        .step(
            Action::new("create_test", "POST", "/api/teacher/create-test")
                .with_dyn_body(|ctx| {
                    json!({
                        "title": "Capitals quiz",
                        "courseId": ctx.get("course")["course"]["id"],
                        "duration": 15,
                        "questions": [
                            {
                                "type": "mcq",
                                "text": "Capital of France?",
                                "options": ["Paris", "Lyon"],
                                "correctAnswer": "Paris",
                                "maxMarks": 2
                            },
                            { "type": "theory", "text": "Describe the Seine.", "maxMarks": 3 }
                        ]
                    })
                })
                .with_expect(StatusCode::CREATED)
                .with_save_as("test"),
        )
        // unpublished tests can't be taken
        .step(login_action("sam@school.test", "sam-pass").with_clear_cookies(true))
        .step(
            Action::new("submit_unpublished", "POST", "/api/teacher/submit-test")
                .with_dyn_body(|ctx| json!({ "testId": ctx.get("test")["test"]["id"], "answers": [] }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(login_action("tess@school.test", "tess-pass").with_clear_cookies(true))
        .step(
            Action::new("publish_test", "POST", "/api/teacher/publish-test")
                .with_dyn_body(|ctx| json!({ "testId": ctx.get("test")["test"]["id"], "published": true }))
                .assert_body(|body| assert!(body.contains("\"published\":true"))),
        )
        .step(login_action("sam@school.test", "sam-pass").with_clear_cookies(true))
        .step(
            Action::new("student_tests", "GET", "/api/teacher/student-tests").assert_body(|body| {
                assert!(body.contains("Capitals quiz"));
                assert!(!body.contains("correctAnswer"));
            }),
        )
        .step(
            Action::new("submit_test", "POST", "/api/teacher/submit-test")
                .with_dyn_body(|ctx| {
                    json!({
                        "testId": ctx.get("test")["test"]["id"],
                        "answers": [
                            { "questionId": question_id(ctx, 0), "answer": "  paris " },
                            { "questionId": question_id(ctx, 1), "answer": "A river in Paris." }
                        ]
                    })
                })
                .with_expect(StatusCode::CREATED)
                .assert_body(|body| {
                    assert!(body.contains("\"totalMarks\":2.0"));
                    assert!(body.contains("\"maxMarks\":5.0"));
                    assert!(body.contains("\"percentage\":40.0"));
                    assert!(body.contains("\"graded\":false"));
                })
                .with_save_as("submission"),
        )
        .step(
            Action::new("submit_twice", "POST", "/api/teacher/submit-test")
                .with_dyn_body(|ctx| json!({ "testId": ctx.get("test")["test"]["id"], "answers": [] }))
                .with_expect(StatusCode::BAD_REQUEST)
                .assert_body(|body| assert!(body.contains("Already submitted"))),
        )
        .step(
            Action::new("student_cannot_grade", "POST", "/api/teacher/grade-submission")
                .with_dyn_body(|ctx| {
                    json!({ "submissionId": ctx.get("submission")["submission"]["id"], "gradedAnswers": [] })
                })
                .with_expect(StatusCode::FORBIDDEN),
        )
        // a teacher of another course may not grade
        .step(login_action("olga@school.test", "olga-pass").with_clear_cookies(true))
        .step(
            Action::new("foreign_teacher_grade", "POST", "/api/teacher/grade-submission")
                .with_dyn_body(|ctx| {
                    json!({
                        "submissionId": ctx.get("submission")["submission"]["id"],
                        "gradedAnswers": [{ "questionId": question_id(ctx, 1), "marks": 3 }]
                    })
                })
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(login_action("tess@school.test", "tess-pass").with_clear_cookies(true))
        .step(
            Action::new("grade_negative", "POST", "/api/teacher/grade-submission")
                .with_dyn_body(|ctx| {
                    json!({
                        "submissionId": ctx.get("submission")["submission"]["id"],
                        "gradedAnswers": [{ "questionId": question_id(ctx, 1), "marks": -1 }]
                    })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("grade", "POST", "/api/teacher/grade-submission")
                .with_dyn_body(|ctx| {
                    json!({
                        "submissionId": ctx.get("submission")["submission"]["id"],
                        "gradedAnswers": [
                            { "questionId": question_id(ctx, 1), "marks": 2, "feedback": "Good start" }
                        ]
                    })
                })
                .assert_body(|body| {
                    assert!(body.contains("\"totalMarks\":4.0"));
                    assert!(body.contains("\"percentage\":80.0"));
                    assert!(body.contains("\"graded\":true"));
                    assert!(body.contains("Good start"));
                }),
        )
        .step(
            Action::new("teacher_results", "GET", "/api/teacher/results").assert_body(|body| {
                assert!(body.contains("Sam Student"));
                assert!(body.contains("\"testsTaken\":1"));
                assert!(body.contains("\"averagePercentage\":80.0"));
                assert!(body.contains("\"passRate\":100.0"));
            }),
        )
        .step(
            Action::new("teacher_performance", "GET", "/api/teacher/performance").assert_body(
                |body| {
                    assert!(body.contains("byStudent"));
                    assert!(body.contains("\"bestPercentage\":80.0"));
                },
            ),
        )
        .step(login_action("sam@school.test", "sam-pass").with_clear_cookies(true))
        .step(
            Action::new("student_performance", "GET", "/api/teacher/student-performance")
                .assert_body(|body| assert!(body.contains("\"averagePercentage\":80.0"))),
        )
        .step(login_admin_action())
        .step(
            Action::new("admin_results", "GET", "/api/admin/results")
                .assert_body(|body| assert!(body.contains("Capitals quiz"))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_create_test_ownership_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    school_setup(Flow::new())
        .step(login_action("olga@school.test", "olga-pass").with_clear_cookies(true))
        .step(
            Action::new("create_test_foreign_course", "POST", "/api/teacher/create-test")
                .with_dyn_body(|ctx| {
                    json!({ "title": "Sneaky", "courseId": ctx.get("course")["course"]["id"] })
                })
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("create_test_missing_title", "POST", "/api/teacher/create-test")
                .with_dyn_body(|ctx| json!({ "course": ctx.get("course")["course"]["id"] }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("teacher_tests_empty", "GET", "/api/teacher/tests")
                .assert_body(|body| assert_eq!(body, r#"{"tests":[]}"#)),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_empty_results_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(register_action("Nina", "nina@school.test", "nina-pass").with_save_cookies(false))
        .step(login_action("nina@school.test", "nina-pass"))
        .step(
            Action::new("student_results_empty", "GET", "/api/teacher/student-results")
                .assert_body(|body| {
                    assert!(body.contains("\"submissions\":[]"));
                    assert!(body.contains("\"testsTaken\":0"));
                    assert!(body.contains("\"passRate\":0.0"));
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_expired_test_keeps_results_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    school_setup(Flow::new())
        .step(login_action("tess@school.test", "tess-pass").with_clear_cookies(true))
        .step(
            Action::new("create_short_test", "POST", "/api/teacher/create-test")
                .with_dyn_body(|ctx| {
                    json!({
                        "title": "Pop quiz",
                        "courseId": ctx.get("course")["course"]["id"],
                        "expiry": chrono::Utc::now() + chrono::Duration::seconds(2),
                        "questions": [{
                            "type": "mcq",
                            "text": "Longest river?",
                            "options": ["Nile", "Thames"],
                            "correctAnswer": "Nile",
                            "maxMarks": 1
                        }]
                    })
                })
                .with_expect(StatusCode::CREATED)
                .with_save_as("test"),
        )
        .step(
            Action::new("publish_test", "POST", "/api/teacher/publish-test")
                .with_dyn_body(|ctx| json!({ "testId": ctx.get("test")["test"]["id"], "published": true })),
        )
        .step(login_action("sam@school.test", "sam-pass").with_clear_cookies(true))
        .step(
            Action::new("submit_test", "POST", "/api/teacher/submit-test")
                .with_dyn_body(|ctx| {
                    json!({
                        "testId": ctx.get("test")["test"]["id"],
                        "answers": [{ "questionId": question_id(ctx, 0), "answer": "Nile" }]
                    })
                })
                .with_expect(StatusCode::CREATED),
        )
        // listing purges the now expired test
        .step(
            Action::new("student_tests_after_expiry", "GET", "/api/teacher/student-tests")
                .with_delay(Duration::from_secs(3))
                .assert_body(|body| assert!(!body.contains("Pop quiz"))),
        )
        .step(
            Action::new("student_results_kept", "GET", "/api/teacher/student-results")
                .assert_body(|body| {
                    assert!(body.contains("\"testsTaken\":1"));
                    assert!(body.contains("\"percentage\":100.0"));
                    assert!(body.contains("\"testId\":null"));
                }),
        )
        .step(login_action("tess@school.test", "tess-pass").with_clear_cookies(true))
        .step(
            Action::new("teacher_tests_purged", "GET", "/api/teacher/tests")
                .assert_body(|body| assert_eq!(body, r#"{"tests":[]}"#)),
        )
        .step(
            Action::new("teacher_results_kept", "GET", "/api/teacher/results").assert_body(|body| {
                assert!(body.contains("Sam Student"));
                assert!(body.contains("\"testsTaken\":1"));
                assert!(body.contains("\"averagePercentage\":100.0"));
            }),
        )
        .step(
            Action::new("teacher_performance_kept", "GET", "/api/teacher/performance")
                .assert_body(|body| assert!(body.contains("\"bestPercentage\":100.0"))),
        )
        .run(&mut server, pool)
        .await;
}
