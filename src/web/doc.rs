use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::web::middlewares::AUTH_TOKEN;

pub struct AuthSchemesModifier;

impl Modify for AuthSchemesModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(schema) = openapi.components.as_mut() {
            schema.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            schema.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    AUTH_TOKEN,
                    "JWT token for current user",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "LMS API", description = "Courses, tests, grading and performance"),
    paths(
        crate::web::routes::health::health_handler,
        crate::web::routes::auth::register_handler,
        crate::web::routes::auth::login_handler,
        crate::web::routes::auth::me_handler,
        crate::web::routes::auth::change_password_handler,
        crate::web::routes::admin::create_first_admin_handler,
        crate::web::routes::admin::create_teacher_handler,
        crate::web::routes::admin::teachers_list_handler,
        crate::web::routes::admin::students_list_handler,
        crate::web::routes::admin::course_create_handler,
        crate::web::routes::admin::courses_list_handler,
        crate::web::routes::admin::assign_course_handler,
        crate::web::routes::admin::assign_timetable_handler,
        crate::web::routes::admin::timetables_list_handler,
        crate::web::routes::admin::monitor_handler,
        crate::web::routes::admin::user_update_handler,
        crate::web::routes::admin::user_delete_handler,
        crate::web::routes::admin::results_handler,
        crate::web::routes::teacher::courses_list_handler,
        crate::web::routes::teacher::course_update_handler,
        crate::web::routes::teacher::upload_resource_handler,
        crate::web::routes::teacher::add_comment_handler,
        crate::web::routes::teacher::messenger_handler,
        crate::web::routes::teacher::send_message_handler,
        crate::web::routes::teacher::edit_message_handler,
        crate::web::routes::teacher::create_test_handler,
        crate::web::routes::teacher::publish_test_handler,
        crate::web::routes::teacher::tests_list_handler,
        crate::web::routes::teacher::grade_submission_handler,
        crate::web::routes::teacher::results_handler,
        crate::web::routes::teacher::performance_handler,
        crate::web::routes::teacher::student_tests_handler,
        crate::web::routes::teacher::submit_test_handler,
        crate::web::routes::teacher::student_results_handler,
        crate::web::routes::teacher::student_performance_handler,
        crate::web::routes::student::dashboard_handler,
        crate::web::routes::student::timetable_handler,
        crate::web::routes::student::messages_handler,
        crate::web::routes::student::comments_list_handler,
        crate::web::routes::student::comment_create_handler,
        crate::web::routes::student::study_bot_handler,
    ),
    modifiers(&AuthSchemesModifier),
)]
pub struct ApiDoc;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn openapi_lists_grading_paths_and_both_auth_schemes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/teacher/submit-test"));
        assert!(doc.paths.paths.contains_key("/api/teacher/grade-submission"));
        assert!(doc.paths.paths.contains_key("/health"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
        assert!(components.security_schemes.contains_key("cookie"));
    }
}
