mod common;
use axum_test::multipart::{MultipartForm, Part};
use reqwest::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, create_first_admin_action, create_teacher_action, login_action,
    login_admin_action, login_user_id, register_action, setup_server, setup_test_db,
};

/// One course taught by Tina with Sara enrolled, Otto registered but not enrolled.
fn classroom_setup(flow: Flow) -> Flow {
    flow.step(create_first_admin_action().with_save_cookies(false))
        .step(register_action("Sara", "sara@school.test", "sara-pass").with_save_cookies(false))
        .step(login_action("sara@school.test", "sara-pass").with_save_as("student_login"))
        .step(register_action("Otto", "otto@school.test", "otto-pass").with_save_cookies(false))
        .step(login_admin_action())
        .step(create_teacher_action("Tina", "tina@school.test", "tina-pass").with_save_as("teacher"))
        .step(create_teacher_action("Ugo", "ugo@school.test", "ugo-pass"))
        .step(
            Action::new("create_course", "POST", "/api/admin/courses")
                .with_dyn_body(|ctx| {
                    json!({ "title": "History", "teacherId": ctx.get("teacher")["user"]["id"] })
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

fn comment_path(ctx: &common::FlowContext) -> String {
    let course_id = ctx.get("course")["course"]["id"].as_str().unwrap().to_string();
    format!("/api/student/courses/{course_id}/comment")
}

#[tokio::test]
async fn route_messenger_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    classroom_setup(Flow::new())
        .step(login_action("tina@school.test", "tina-pass").with_clear_cookies(true))
        .step(
            Action::new("send_empty", "POST", "/api/teacher/messenger")
                .with_body(json!({ "content": "   " }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("send", "POST", "/api/teacher/messenger")
                .with_body(json!({ "content": "Essay due Friday" }))
                .assert_body(|body| assert!(body.contains("Message sent")))
                .with_save_as("sent"),
        )
        .step(
            Action::new("messenger", "GET", "/api/teacher/messenger")
                .assert_body(|body| assert!(body.contains("Essay due Friday"))),
        )
        .step(login_action("sara@school.test", "sara-pass").with_clear_cookies(true))
        .step(
            Action::new("inbox", "GET", "/api/student/messages").assert_body(|body| {
                assert!(body.contains("Essay due Friday"));
                assert!(body.contains("Tina"));
            }),
        )
        .step(login_action("otto@school.test", "otto-pass").with_clear_cookies(true))
        .step(
            Action::new("inbox_not_enrolled", "GET", "/api/student/messages")
                .assert_body(|body| assert_eq!(body, r#"{"messages":[]}"#)),
        )
        // another teacher can't touch Tina's message
        .step(login_action("ugo@school.test", "ugo-pass").with_clear_cookies(true))
        .step(
            Action::new("edit_foreign", "PUT", "/api/teacher/edit-message")
                .with_dyn_body(|ctx| {
                    json!({ "messageId": ctx.get("sent")["data"]["id"], "content": "Hacked" })
                })
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("send_without_students", "POST", "/api/teacher/messenger")
                .with_body(json!({ "content": "Anyone?" }))
                .with_expect(StatusCode::BAD_REQUEST)
                .assert_body(|body| assert!(body.contains("No students to send message to"))),
        )
        .step(login_action("tina@school.test", "tina-pass").with_clear_cookies(true))
        .step(
            Action::new("edit", "PUT", "/api/teacher/edit-message")
                .with_dyn_body(|ctx| {
                    json!({ "messageId": ctx.get("sent")["data"]["id"], "content": "Essay due Monday" })
                })
                .assert_body(|body| assert!(body.contains("Essay due Monday"))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_comments_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    classroom_setup(Flow::new())
        .step(login_action("sara@school.test", "sara-pass").with_clear_cookies(true))
        .step(
            Action::new("comment", "POST", "dynamic")
                .with_dyn_path(comment_path)
                .with_body(json!({ "text": "When is the exam?" }))
                .with_expect(StatusCode::CREATED)
                .assert_body(|body| {
                    assert!(body.contains("When is the exam?"));
                    assert!(body.contains("Sara"));
                }),
        )
        .step(login_action("otto@school.test", "otto-pass").with_clear_cookies(true))
        .step(
            Action::new("comment_not_enrolled", "POST", "dynamic")
                .with_dyn_path(comment_path)
                .with_body(json!({ "text": "Let me in" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(login_action("tina@school.test", "tina-pass").with_clear_cookies(true))
        .step(
            Action::new("teacher_comment", "POST", "/api/teacher/add-comment")
                .with_dyn_body(|ctx| {
                    json!({ "courseId": ctx.get("course")["course"]["id"], "text": "Next Tuesday" })
                })
                .assert_body(|body| {
                    assert!(body.contains("When is the exam?"));
                    assert!(body.contains("Next Tuesday"));
                }),
        )
        .step(login_action("ugo@school.test", "ugo-pass").with_clear_cookies(true))
        .step(
            Action::new("foreign_teacher_comment", "POST", "/api/teacher/add-comment")
                .with_dyn_body(|ctx| {
                    json!({ "courseId": ctx.get("course")["course"]["id"], "text": "Hi" })
                })
                .with_expect(StatusCode::FORBIDDEN),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_upload_resource_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    classroom_setup(Flow::new())
        .step(login_action("tina@school.test", "tina-pass").with_clear_cookies(true))
        .step(
            Action::new("upload_wrong_type", "POST", "/api/teacher/upload-resource")
                .with_multipart(|ctx| {
                    let course_id = ctx.get("course")["course"]["id"].as_str().unwrap().to_string();
                    MultipartForm::new().add_text("courseId", course_id).add_part(
                        "file",
                        Part::bytes(b"#!/bin/sh".as_slice())
                            .file_name("run.sh")
                            .mime_type("application/x-sh"),
                    )
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("upload", "POST", "/api/teacher/upload-resource")
                .with_multipart(|ctx| {
                    let course_id = ctx.get("course")["course"]["id"].as_str().unwrap().to_string();
                    MultipartForm::new().add_text("courseId", course_id).add_part(
                        "file",
                        Part::bytes(b"%PDF-1.4".as_slice())
                            .file_name("syllabus.pdf")
                            .mime_type("application/pdf"),
                    )
                })
                .assert_body(|body| {
                    assert!(body.contains("syllabus.pdf"));
                    assert!(body.contains("/uploads/"));
                }),
        )
        .step(login_action("sara@school.test", "sara-pass").with_clear_cookies(true))
        .step(
            Action::new("dashboard", "GET", "/api/student/dashboard")
                .assert_body(|body| assert!(body.contains("syllabus.pdf"))),
        )
        .step(
            Action::new("study_bot", "POST", "/api/student/study-bot")
                .with_body(json!({ "prompt": "How do I revise dates?" }))
                .assert_body(|body| {
                    assert!(body.contains("\"source\":\"fallback\""));
                    assert!(body.contains("History"));
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_health_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(Action::new("health", "GET", "/health").assert_body(|body| {
            assert!(body.contains("\"status\":\"ok\""));
            assert!(body.contains("\"database\":\"connected\""));
        }))
        .run(&mut server, pool)
        .await;
}
