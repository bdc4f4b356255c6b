mod common;
use reqwest::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, create_first_admin_action, create_teacher_action, login_action,
    login_admin_action, login_user_id, register_action, setup_server, setup_test_db,
};

#[tokio::test]
async fn route_first_admin_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(create_first_admin_action().assert_body(|body| {
            assert!(body.contains("Admin created successfully"));
            assert!(body.contains("\"role\":\"admin\""));
        }))
        .step(
            create_first_admin_action()
                .with_expect(StatusCode::BAD_REQUEST)
                .assert_body(|body| assert!(body.contains("Admin already exists"))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_admin_only_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            Action::new("teachers_anonymous", "GET", "/api/admin/teachers")
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .step(register_action("Stu", "stu@school.test", "stu-pass").with_save_cookies(false))
        .step(login_action("stu@school.test", "stu-pass"))
        .step(
            Action::new("teachers_as_student", "GET", "/api/admin/teachers")
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            create_teacher_action("Nope", "nope@school.test", "nope")
                .with_expect(StatusCode::FORBIDDEN),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_course_management_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(create_first_admin_action().with_save_cookies(false))
        .step(register_action("Stu", "stu@school.test", "stu-pass").with_save_cookies(false))
        .step(login_action("stu@school.test", "stu-pass").with_save_as("student_login"))
        .step(login_admin_action())
        .step(create_teacher_action("Tom", "tom@school.test", "tom-pass").with_save_as("teacher"))
        .step(
            create_teacher_action("Tom Twin", "TOM@school.test", "tom-pass")
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            Action::new("teachers", "GET", "/api/admin/teachers")
                .assert_body(|body| assert!(body.contains("tom@school.test"))),
        )
        .step(
            Action::new("course_without_teacher", "POST", "/api/admin/courses")
                .with_body(json!({ "title": "Biology" }))
                .with_expect(StatusCode::BAD_REQUEST)
                .assert_body(|body| assert!(body.contains("Title and teacher are required"))),
        )
        .step(
            Action::new("course_with_student_as_teacher", "POST", "/api/admin/courses")
                .with_dyn_body(|ctx| {
                    json!({ "title": "Biology", "teacherId": login_user_id(ctx, "student_login") })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("create_course", "POST", "/api/admin/courses")
                .with_dyn_body(|ctx| {
                    json!({ "title": "Biology", "teacherId": ctx.get("teacher")["user"]["id"] })
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
        // enrolling creates an empty timetable for the course
        .step(
            Action::new("monitor", "GET", "/api/admin/monitor").assert_body(|body| {
                assert!(body.contains("\"userCount\":3"));
                assert!(body.contains("\"courseCount\":1"));
                assert!(body.contains("\"timetableCount\":1"));
            }),
        )
        .step(
            Action::new("assign_timetable", "POST", "/api/admin/assign-timetable").with_dyn_body(
                |ctx| {
                    json!({
                        "courseId": ctx.get("course")["course"]["id"],
                        "schedule": [{ "day": "Monday", "startTime": "09:00", "endTime": "10:00" }]
                    })
                },
            ),
        )
        .step(
            Action::new("courses", "GET", "/api/admin/courses").assert_body(|body| {
                assert!(body.contains("Biology"));
                assert!(body.contains("Stu"));
            }),
        )
        .step(login_action("stu@school.test", "stu-pass").with_clear_cookies(true))
        .step(
            Action::new("student_timetable", "GET", "/api/student/timetable")
                .assert_body(|body| assert!(body.contains("Monday"))),
        )
        .step(
            Action::new("student_dashboard", "GET", "/api/student/dashboard")
                .assert_body(|body| assert!(body.contains("Biology"))),
        )
        .step(login_admin_action())
        .step(
            Action::new("user_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/admin/users/{}", login_user_id(ctx, "student_login")))
                .with_body(json!({ "name": "Stuart" }))
                .assert_body(|body| assert!(body.contains("Stuart"))),
        )
        .step(
            Action::new("user_update_email_taken", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/admin/users/{}", login_user_id(ctx, "student_login")))
                .with_body(json!({ "email": "tom@school.test" }))
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            Action::new("user_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| format!("/api/admin/users/{}", login_user_id(ctx, "student_login"))),
        )
        .step(
            Action::new("user_delete_again", "DELETE", "dynamic")
                .with_dyn_path(|ctx| format!("/api/admin/users/{}", login_user_id(ctx, "student_login")))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_assign_course_rejects_non_students_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(create_first_admin_action().with_save_cookies(false))
        .step(register_action("Stu", "stu@school.test", "stu-pass").with_save_cookies(false))
        .step(login_action("stu@school.test", "stu-pass").with_save_as("student_login"))
        .step(login_admin_action())
        .step(create_teacher_action("Tom", "tom@school.test", "tom-pass").with_save_as("teacher"))
        .step(
            Action::new("create_course", "POST", "/api/admin/courses")
                .with_dyn_body(|ctx| {
                    json!({ "title": "Biology", "teacherId": ctx.get("teacher")["user"]["id"] })
                })
                .with_expect(StatusCode::CREATED)
                .with_save_as("course"),
        )
        .step(
            Action::new("assign_unknown_id", "POST", "/api/admin/assign-course")
                .with_dyn_body(|ctx| {
                    json!({
                        "courseId": ctx.get("course")["course"]["id"],
                        "studentIds": [
                            login_user_id(ctx, "student_login"),
                            "00000000-0000-0000-0000-000000000001"
                        ],
                    })
                })
                .with_expect(StatusCode::BAD_REQUEST)
                .assert_body(|body| assert!(body.contains("00000000-0000-0000-0000-000000000001"))),
        )
        .step(
            Action::new("assign_teacher_as_student", "POST", "/api/admin/assign-course")
                .with_dyn_body(|ctx| {
                    json!({
                        "courseId": ctx.get("course")["course"]["id"],
                        "studentIds": [ctx.get("teacher")["user"]["id"]],
                    })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        // rejected requests leave the course without students
        .step(
            Action::new("courses", "GET", "/api/admin/courses")
                .assert_body(|body| assert!(!body.contains("stu@school.test"))),
        )
        .step(
            Action::new("monitor", "GET", "/api/admin/monitor")
                .assert_body(|body| assert!(body.contains("\"timetableCount\":0"))),
        )
        .run(&mut server, pool)
        .await;
}
