use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped, check_access,
        entity::{
            Course, CourseComment, CourseCreate, CourseDetailsRow, CourseResource,
            CourseResourceCreate, Message, Submission, SubmissionCreateUpdate, SubmissionRecord,
            Test, TestCreate,
        },
    },
    scoring::{GradeInput, Question, SubmittedAnswer, apply_grades, calculate_submission_metrics},
    utils::uploads::{
        MAX_UPLOAD_BYTES, get_uploads_dir, is_allowed_content_type, save_upload, stored_file_name,
    },
    web::{
        ApiJson, AppState, AuthenticatedUser, ErrorResponse, RequestContext, UserRole, WebError,
        WebResult,
        dto::{
            CommentsResponse, CourseDetails, CoursesResponse, PerformanceResponse, ResultsResponse,
            SummaryResponse,
        },
        middlewares, required,
    },
};

const STAFF: &[UserRole] = &[UserRole::Teacher, UserRole::Admin];
const EVERYONE: &[UserRole] = &[UserRole::Student, UserRole::Teacher, UserRole::Admin];

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CourseUpdateBody {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CourseUpdatedResponse {
    pub message: String,
    pub course: Course,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ResourceUploadedResponse {
    pub message: String,
    pub resource: CourseResource,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentBody {
    pub course_id: Uuid,
    pub text: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessengerResponse {
    pub messages: Vec<Message>,
    pub recipients: Vec<Uuid>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SendMessageBody {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditMessageBody {
    pub message_id: Uuid,
    pub content: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessageDataResponse {
    pub message: String,
    pub data: Message,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestBody {
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "course")]
    pub course_id: Option<Uuid>,
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Minutes.
    pub duration: Option<i32>,
    pub expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishTestBody {
    pub test_id: Uuid,
    pub published: bool,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TestResponse {
    pub message: String,
    pub test: Test,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TestsResponse {
    pub tests: Vec<Test>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTestBody {
    pub test_id: Uuid,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeSubmissionBody {
    pub submission_id: Uuid,
    #[serde(default)]
    pub graded_answers: Vec<GradeInput>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub message: String,
    pub submission: Submission,
}

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/courses", get(courses_list_handler))
        .route("/courses/{id}", put(course_update_handler))
        .route(
            "/upload-resource",
            post(upload_resource_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/add-comment", post(add_comment_handler))
        .route("/messenger", get(messenger_handler).post(send_message_handler))
        .route("/edit-message", put(edit_message_handler))
        .route("/create-test", post(create_test_handler))
        .route("/publish-test", post(publish_test_handler))
        .route("/tests", get(tests_list_handler))
        .route("/grade-submission", post(grade_submission_handler))
        .route("/results", get(results_handler))
        .route("/performance", get(performance_handler))
        .route("/student-tests", get(student_tests_handler))
        .route("/submit-test", post(submit_test_handler))
        .route("/student-results", get(student_results_handler))
        .route("/student-performance", get(student_performance_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

/// Loads a course the actor teaches. Admins may touch any course.
async fn owned_course(
    state: &AppState,
    user: &AuthenticatedUser,
    course_id: Uuid,
) -> WebResult<Course> {
    let course = Course::find_by_id(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Course::get_resource_type()))?;

    check_access(state.pool(), user, &course, user.user_id())
        .await
        .map_err(|e| WebError::resource_access_error(Course::get_resource_type(), e))?;

    Ok(course)
}

#[utoipa::path(
    get,
    path = "/api/teacher/courses",
    description = "Courses taught by the signed in teacher, every course for admins",
    responses(
        (status = 200, description = "Courses with students and resources", body = CoursesResponse),
        (status = 403, description = "Teachers and admins only", body = ErrorResponse),
    ),
    tag = "teacher",
    security(("bearer" = []), ("cookie" = []))
)]
async fn courses_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(STAFF)?;
    let rows = if user.is_admin() {
        CourseDetailsRow::fetch_all(state.pool(), user).await
    } else {
        CourseDetailsRow::fetch_by_teacher(state.pool(), user, user.user_id()).await
    }
    .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    let courses = CourseDetails::from_rows(rows)
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(CoursesResponse { courses })))
}

#[utoipa::path(
    put,
    path = "/api/teacher/courses/{id}",
    request_body = CourseUpdateBody,
    responses(
        (status = 200, description = "Course updated", body = CourseUpdatedResponse),
        (status = 403, description = "Not the course teacher", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "teacher",
    security(("bearer" = []), ("cookie" = []))
)]
async fn course_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<CourseUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(STAFF)?;
    let course = owned_course(&state, user, id).await?;

    let data = CourseCreate {
        title: required(&payload.title).unwrap_or(course.title()).to_string(),
        description: required(&payload.description)
            .unwrap_or(course.description())
            .to_string(),
        teacher_id: course.teacher_id(),
    };
    let course = course
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    let body = CourseUpdatedResponse {
        message: String::from("Course updated"),
        course,
    };
    Ok((StatusCode::OK, Json(body)))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> WebResult<String> {
    field
        .text()
        .await
        .map_err(|e| WebError::bad_request(e.body_text()))
}

#[utoipa::path(
    post,
    path = "/api/teacher/upload-resource",
    description = "Multipart form with `courseId` and a PDF, image or video `file`",
    responses(
        (status = 200, description = "Resource attached to the course", body = ResourceUploadedResponse),
        (status = 400, description = "No file, bad file type or course id", body = ErrorResponse),
        (status = 403, description = "Not the course teacher", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "teacher",
    security(("bearer" = []), ("cookie" = []))
)]
async fn upload_resource_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(STAFF)?;

    let mut course_id: Option<Uuid> = None;
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::bad_request(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("courseId") => {
                let raw = read_text_field(field).await?;
                let parsed = raw
                    .trim()
                    .parse::<Uuid>()
                    .map_err(|_| WebError::bad_request("Invalid course id"))?;
                course_id = Some(parsed);
            }
            Some("file") => {
                let original = field.file_name().unwrap_or("file").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                if !is_allowed_content_type(&content_type) {
                    return Err(WebError::bad_request(
                        "Only PDF, image, and video files are allowed",
                    ));
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| WebError::bad_request(e.body_text()))?;
                upload = Some((original, bytes));
            }
            _ => {}
        }
    }

    let Some((original, bytes)) = upload else {
        return Err(WebError::bad_request("No file uploaded"));
    };
    let Some(course_id) = course_id else {
        return Err(WebError::bad_request("Course id is required"));
    };

    let course = owned_course(&state, user, course_id).await?;

    let dir = get_uploads_dir(state.config().app().uploads_dir()).map_err(WebError::server_io_error)?;
    let stored_name = stored_file_name(&original);
    save_upload(&dir, &stored_name, &bytes)
        .await
        .map_err(WebError::server_io_error)?;
    tracing::info!("stored {} ({} bytes) for course {}", stored_name, bytes.len(), course.id());

    let data = CourseResourceCreate {
        course_id: course.id(),
        filename: original,
        url: format!("/uploads/{stored_name}"),
    };
    let resource = CourseResource::create(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseResource::get_resource_type(), e))?;

    let body = ResourceUploadedResponse {
        message: String::from("Resource uploaded"),
        resource,
    };
    Ok((StatusCode::OK, Json(body)))
}

#[utoipa::path(
    post,
    path = "/api/teacher/add-comment",
    request_body = AddCommentBody,
    responses(
        (status = 200, description = "All comments of the course", body = CommentsResponse),
        (status = 400, description = "Empty comment", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "teacher",
    security(("bearer" = []), ("cookie" = []))
)]
async fn add_comment_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AddCommentBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(STAFF)?;
    let Some(text) = required(&payload.text) else {
        return Err(WebError::bad_request("Comment text is required"));
    };

    let course = owned_course(&state, user, payload.course_id).await?;
    CourseComment::create(state.pool(), user, course.id(), text)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseComment::get_resource_type(), e))?;

    let comments = CourseComment::list_by_course(state.pool(), user, course.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseComment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(CommentsResponse { comments })))
}

#[utoipa::path(
    get,
    path = "/api/teacher/messenger",
    description = "Latest sent messages and the students they reach",
    responses((status = 200, description = "Sent messages", body = MessengerResponse)),
    tag = "teacher",
    security(("bearer" = []), ("cookie" = []))
)]
async fn messenger_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(STAFF)?;
    let recipients = Course::student_ids_of_teacher(state.pool(), user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;
    let messages = Message::list_by_sender(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Message::get_resource_type(), e))?;

    Ok((
        StatusCode::OK,
        Json(MessengerResponse {
            messages,
            recipients,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/teacher/messenger",
    request_body = SendMessageBody,
    description = "Broadcasts to every student of the teacher's courses",
    responses(
        (status = 200, description = "Message sent", body = MessageDataResponse),
        (status = 400, description = "Empty message or nobody to send it to", body = ErrorResponse),
    ),
    tag = "teacher",
    security(("bearer" = []), ("cookie" = []))
)]
async fn send_message_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SendMessageBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(STAFF)?;
    let Some(content) = required(&payload.content) else {
        return Err(WebError::bad_request("Message content is required"));
    };

    let recipients = Course::student_ids_of_teacher(state.pool(), user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;
    if recipients.is_empty() {
        return Err(WebError::bad_request("No students to send message to"));
    }

    let message = Message::create(state.pool(), user, &recipients, content)
        .await
        .map_err(|e| WebError::resource_fetch_error(Message::get_resource_type(), e))?;

    let body = MessageDataResponse {
        message: String::from("Message sent"),
        data: message,
    };
    Ok((StatusCode::OK, Json(body)))
}

#[utoipa::path(
    put,
    path = "/api/teacher/edit-message",
    request_body = EditMessageBody,
    responses(
        (status = 200, description = "Message updated", body = MessageDataResponse),
        (status = 403, description = "Not the sender", body = ErrorResponse),
        (status = 404, description = "Message not found", body = ErrorResponse),
    ),
    tag = "teacher",
    security(("bearer" = []), ("cookie" = []))
)]
async fn edit_message_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EditMessageBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(STAFF)?;
    let Some(content) = required(&payload.content) else {
        return Err(WebError::bad_request("Message content is required"));
    };

    let mut message = Message::find_by_id(state.pool(), user, payload.message_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Message::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Message::get_resource_type()))?;

    check_access(state.pool(), user, &message, user.user_id())
        .await
        .map_err(|e| WebError::resource_access_error(Message::get_resource_type(), e))?;

    message
        .set_content(state.pool(), user, content.to_string())
        .await
        .map_err(|e| WebError::resource_fetch_error(Message::get_resource_type(), e))?;

    let body = MessageDataResponse {
        message: String::from("Message updated"),
        data: message,
    };
    Ok((StatusCode::OK, Json(body)))
}

#[utoipa::path(
    post,
    path = "/api/teacher/create-test",
    request_body = CreateTestBody,
    responses(
        (status = 201, description = "Test created", body = TestResponse),
        (status = 400, description = "Title or course missing", body = ErrorResponse),
        (status = 403, description = "Not the course teacher", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "teacher",
    security(("bearer" = []), ("cookie" = []))
)]
async fn create_test_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateTestBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(STAFF)?;
    let (Some(title), Some(course_id)) = (required(&payload.title), payload.course_id) else {
        return Err(WebError::bad_request("Title and course are required"));
    };
    if payload.duration.is_some_and(|d| d <= 0) {
        return Err(WebError::bad_request("Duration must be positive"));
    }

    let course = owned_course(&state, user, course_id).await?;

    let data = TestCreate {
        title: title.to_string(),
        description: payload.description.trim().to_string(),
        course_id: course.id(),
        questions: payload.questions,
        duration: payload.duration,
        created_by: user.user_id(),
        expiry: payload.expiry,
    };
    let test = Test::create(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_fetch_error(Test::get_resource_type(), e))?;
    tracing::info!("test {} created for course {}", test.id(), course.id());

    let body = TestResponse {
        message: String::from("Test created"),
        test,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    post,
    path = "/api/teacher/publish-test",
    request_body = PublishTestBody,
    responses(
        (status = 200, description = "Test updated", body = TestResponse),
        (status = 403, description = "Not the course teacher", body = ErrorResponse),
        (status = 404, description = "Test not found", body = ErrorResponse),
    ),
    tag = "teacher",
    security(("bearer" = []), ("cookie" = []))
)]
async fn publish_test_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<PublishTestBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(STAFF)?;
    let mut test = Test::find_by_id(state.pool(), user, payload.test_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Test::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Test::get_resource_type()))?;

    check_access(state.pool(), user, &test, user.user_id())
        .await
        .map_err(|e| WebError::resource_access_error(Test::get_resource_type(), e))?;

    test.set_published(state.pool(), user, payload.published)
        .await
        .map_err(|e| WebError::resource_fetch_error(Test::get_resource_type(), e))?;

    let body = TestResponse {
        message: String::from("Test updated"),
        test,
    };
    Ok((StatusCode::OK, Json(body)))
}

async fn purge_expired_tests(state: &AppState) -> WebResult<()> {
    let purged = Test::purge_expired(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Test::get_resource_type(), e))?;
    if purged > 0 {
        tracing::info!("purged {} expired tests", purged);
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/teacher/tests",
    description = "Tests of the teacher's courses. Expired tests are deleted first",
    responses((status = 200, description = "Tests", body = TestsResponse)),
    tag = "teacher",
    security(("bearer" = []), ("cookie" = []))
)]
async fn tests_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(STAFF)?;
    purge_expired_tests(&state).await?;

    let tests = if user.is_admin() {
        Test::list(state.pool(), user, i64::MAX, 0).await
    } else {
        Test::list_by_teacher(state.pool(), user, user.user_id()).await
    }
    .map_err(|e| WebError::resource_fetch_error(Test::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(TestsResponse { tests })))
}

#[utoipa::path(
    post,
    path = "/api/teacher/grade-submission",
    request_body = GradeSubmissionBody,
    description = "Applies marks and feedback to a submission and recomputes its score",
    responses(
        (status = 200, description = "Submission graded", body = SubmissionResponse),
        (status = 400, description = "Invalid marks", body = ErrorResponse),
        (status = 403, description = "Not the course teacher", body = ErrorResponse),
        (status = 404, description = "Submission not found", body = ErrorResponse),
    ),
    tag = "teacher",
    security(("bearer" = []), ("cookie" = []))
)]
async fn grade_submission_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<GradeSubmissionBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(STAFF)?;
    let submission = Submission::find_by_id(state.pool(), user, payload.submission_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Submission::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Submission::get_resource_type()))?;

    check_access(state.pool(), user, &submission, user.user_id())
        .await
        .map_err(|e| WebError::resource_access_error(Submission::get_resource_type(), e))?;

    let test = match submission.test_id() {
        Some(test_id) => Test::find_by_id(state.pool(), user, test_id)
            .await
            .map_err(|e| WebError::resource_fetch_error(Test::get_resource_type(), e))?,
        None => None,
    };
    let questions = test.as_ref().map(Test::questions).unwrap_or_default();

    let metrics = apply_grades(
        submission.answers().to_vec(),
        &payload.graded_answers,
        questions,
        submission.max_marks(),
    )
    .map_err(|e| WebError::bad_request(e.to_string()))?;

    let data = SubmissionCreateUpdate {
        test_id: submission.test_id(),
        course_id: submission.course_id(),
        student_id: submission.student_id(),
        metrics,
    };
    let submission = submission
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_fetch_error(Submission::get_resource_type(), e))?;
    if !submission.is_graded() {
        tracing::debug!("submission {} still has ungraded answers", submission.id());
    }

    let body = SubmissionResponse {
        message: String::from("Submission graded"),
        submission,
    };
    Ok((StatusCode::OK, Json(body)))
}

async fn staff_submissions(
    state: &AppState,
    user: &AuthenticatedUser,
) -> WebResult<Vec<SubmissionRecord>> {
    if user.is_admin() {
        SubmissionRecord::list_all(state.pool(), user).await
    } else {
        SubmissionRecord::list_by_teacher(state.pool(), user, user.user_id()).await
    }
    .map_err(|e| WebError::resource_fetch_error(Submission::get_resource_type(), e))
}

#[utoipa::path(
    get,
    path = "/api/teacher/results",
    description = "Submissions to the teacher's tests with their summary",
    responses((status = 200, description = "Results", body = ResultsResponse)),
    tag = "teacher",
    security(("bearer" = []), ("cookie" = []))
)]
async fn results_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(STAFF)?;
    let submissions = staff_submissions(&state, user).await?;

    let body = ResultsResponse::new(submissions, state.pass_threshold());
    Ok((StatusCode::OK, Json(body)))
}

#[utoipa::path(
    get,
    path = "/api/teacher/performance",
    description = "Overall summary and one summary per student",
    responses((status = 200, description = "Performance", body = PerformanceResponse)),
    tag = "teacher",
    security(("bearer" = []), ("cookie" = []))
)]
async fn performance_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(STAFF)?;
    let submissions = staff_submissions(&state, user).await?;

    let body = PerformanceResponse::new(&submissions, state.pass_threshold());
    Ok((StatusCode::OK, Json(body)))
}

#[utoipa::path(
    get,
    path = "/api/teacher/student-tests",
    description = "Published tests of the caller's enrolled courses, without answer keys",
    responses((status = 200, description = "Tests", body = TestsResponse)),
    tag = "student",
    security(("bearer" = []), ("cookie" = []))
)]
async fn student_tests_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(EVERYONE)?;
    purge_expired_tests(&state).await?;

    let tests = Test::list_published_for_student(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Test::get_resource_type(), e))?
        .into_iter()
        .map(Test::without_answers)
        .collect();

    Ok((StatusCode::OK, Json(TestsResponse { tests })))
}

#[utoipa::path(
    post,
    path = "/api/teacher/submit-test",
    request_body = SubmitTestBody,
    description = "Scores the answers and stores the submission. One submission per test",
    responses(
        (status = 201, description = "Test submitted", body = SubmissionResponse),
        (status = 400, description = "Already submitted or test not open", body = ErrorResponse),
        (status = 403, description = "Students only, enrolled in the course", body = ErrorResponse),
        (status = 404, description = "Test not found", body = ErrorResponse),
    ),
    tag = "student",
    security(("bearer" = []), ("cookie" = []))
)]
async fn submit_test_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SubmitTestBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Student])?;

    let existing =
        Submission::find_by_test_and_student(state.pool(), user, payload.test_id, user.user_id())
            .await
            .map_err(|e| WebError::resource_fetch_error(Submission::get_resource_type(), e))?;
    if existing.is_some() {
        return Err(WebError::bad_request("Already submitted"));
    }

    let test = Test::find_by_id(state.pool(), user, payload.test_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Test::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Test::get_resource_type()))?;

    if !test.is_published() {
        return Err(WebError::bad_request("Test is not published"));
    }

    let enrolled = Course::is_enrolled(state.pool(), test.course_id(), user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;
    if !enrolled {
        return Err(WebError::resource_forbidden(Test::get_resource_type()));
    }

    let metrics = calculate_submission_metrics(test.questions(), &payload.answers);
    let data = SubmissionCreateUpdate {
        test_id: Some(test.id()),
        course_id: test.course_id(),
        student_id: user.user_id(),
        metrics,
    };

    let submission = Submission::create(state.pool(), user, data)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                WebError::bad_request("Already submitted")
            } else {
                WebError::resource_fetch_error(Submission::get_resource_type(), e)
            }
        })?;
    tracing::info!(
        "submission {} for test '{}' scored {}%",
        submission.id(),
        test.title(),
        crate::scoring::Scored::percentage(&submission)
    );

    let body = SubmissionResponse {
        message: String::from("Test submitted"),
        submission,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    get,
    path = "/api/teacher/student-results",
    description = "The caller's own submissions with their summary",
    responses((status = 200, description = "Results", body = ResultsResponse)),
    tag = "student",
    security(("bearer" = []), ("cookie" = []))
)]
async fn student_results_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(EVERYONE)?;
    let submissions = SubmissionRecord::list_by_student(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Submission::get_resource_type(), e))?;

    let body = ResultsResponse::new(submissions, state.pass_threshold());
    Ok((StatusCode::OK, Json(body)))
}

#[utoipa::path(
    get,
    path = "/api/teacher/student-performance",
    responses((status = 200, description = "The caller's summary", body = SummaryResponse)),
    tag = "student",
    security(("bearer" = []), ("cookie" = []))
)]
async fn student_performance_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(EVERYONE)?;
    let submissions = SubmissionRecord::list_by_student(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Submission::get_resource_type(), e))?;

    let summary = crate::scoring::build_performance_summary(&submissions, state.pass_threshold());
    Ok((StatusCode::OK, Json(SummaryResponse { summary })))
}
