use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    assistant::{StudyAnswer, StudyContext},
    model::{
        CrudRepository, ResourceTyped,
        entity::{Course, CourseComment, CourseDetailsRow, InboxMessage, TimetableView, UserEntity},
    },
    web::{
        ApiJson, AppState, AuthenticatedUser, ErrorResponse, RequestContext, UserRole, WebError,
        WebResult,
        dto::{CommentsResponse, CourseDetails, CoursesResponse},
        middlewares, required,
    },
};

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ScheduleResponse {
    pub timetable: Vec<TimetableView>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct InboxResponse {
    pub messages: Vec<InboxMessage>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CommentBody {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct StudyBotBody {
    pub prompt: Option<String>,
}

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/dashboard", get(dashboard_handler))
        .route("/timetable", get(timetable_handler))
        .route("/messages", get(messages_handler))
        .route("/courses/{id}/comments", get(comments_list_handler))
        .route("/courses/{id}/comment", post(comment_create_handler))
        .route("/study-bot", post(study_bot_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

/// Students must be enrolled, teachers must own the course. Admins pass.
async fn readable_course(
    state: &AppState,
    user: &AuthenticatedUser,
    course_id: Uuid,
) -> WebResult<Course> {
    let course = Course::find_by_id(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Course::get_resource_type()))?;

    let allowed = match user.user_role() {
        UserRole::Admin => true,
        UserRole::Teacher => course.teacher_id() == user.user_id(),
        UserRole::Student => Course::is_enrolled(state.pool(), course.id(), user.user_id())
            .await
            .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?,
    };

    if allowed {
        Ok(course)
    } else {
        Err(WebError::resource_forbidden(Course::get_resource_type()))
    }
}

#[utoipa::path(
    get,
    path = "/api/student/dashboard",
    description = "Enrolled courses with their teacher and resources",
    responses(
        (status = 200, description = "Courses", body = CoursesResponse),
        (status = 403, description = "Students only", body = ErrorResponse),
    ),
    tag = "student",
    security(("bearer" = []), ("cookie" = []))
)]
async fn dashboard_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Student])?;
    let rows = CourseDetailsRow::fetch_for_student(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;
    let courses = CourseDetails::from_rows(rows)
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(CoursesResponse { courses })))
}

#[utoipa::path(
    get,
    path = "/api/student/timetable",
    responses((status = 200, description = "Timetables of enrolled courses", body = ScheduleResponse)),
    tag = "student",
    security(("bearer" = []), ("cookie" = []))
)]
async fn timetable_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Student])?;
    let timetable = TimetableView::list_for_student(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(crate::model::ResourceType::Timetable, e))?;

    Ok((StatusCode::OK, Json(ScheduleResponse { timetable })))
}

#[utoipa::path(
    get,
    path = "/api/student/messages",
    description = "Latest messages addressed to the caller",
    responses((status = 200, description = "Inbox", body = InboxResponse)),
    tag = "student",
    security(("bearer" = []), ("cookie" = []))
)]
async fn messages_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Student])?;
    let messages = InboxMessage::list_for_recipient(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(crate::model::ResourceType::Message, e))?;

    Ok((StatusCode::OK, Json(InboxResponse { messages })))
}

#[utoipa::path(
    get,
    path = "/api/student/courses/{id}/comments",
    responses(
        (status = 200, description = "Comments, oldest first", body = CommentsResponse),
        (status = 403, description = "Not enrolled", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "student",
    security(("bearer" = []), ("cookie" = []))
)]
async fn comments_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = readable_course(&state, user, id).await?;
    let comments = CourseComment::list_by_course(state.pool(), user, course.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseComment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(CommentsResponse { comments })))
}

#[utoipa::path(
    post,
    path = "/api/student/courses/{id}/comment",
    request_body = CommentBody,
    responses(
        (status = 201, description = "Comment stored, all comments returned", body = CommentsResponse),
        (status = 400, description = "Empty comment", body = ErrorResponse),
        (status = 403, description = "Not enrolled", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "student",
    security(("bearer" = []), ("cookie" = []))
)]
async fn comment_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<CommentBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let Some(text) = required(&payload.text) else {
        return Err(WebError::bad_request("Comment text is required"));
    };

    let course = readable_course(&state, user, id).await?;
    CourseComment::create(state.pool(), user, course.id(), text)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseComment::get_resource_type(), e))?;
    let comments = CourseComment::list_by_course(state.pool(), user, course.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseComment::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(CommentsResponse { comments })))
}

async fn study_context(state: &AppState, user: &AuthenticatedUser) -> WebResult<StudyContext> {
    let student = UserEntity::find_by_id(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;
    let courses = Course::list_for_student(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;
    let timetables = TimetableView::list_for_student(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(crate::model::ResourceType::Timetable, e))?;

    let next_class = timetables.iter().find_map(|t| {
        t.schedule.first().map(|slot| {
            format!(
                "{} {} {}-{}",
                t.course_title, slot.day, slot.start_time, slot.end_time
            )
        })
    });

    Ok(StudyContext {
        student_name: student.map(|s| s.name().to_string()),
        courses: courses.iter().map(|c| c.title().to_string()).collect(),
        next_class,
    })
}

#[utoipa::path(
    post,
    path = "/api/student/study-bot",
    request_body = StudyBotBody,
    description = "Study help from the configured assistant, or a generated plan when it is unavailable",
    responses(
        (status = 200, description = "Answer", body = StudyAnswer),
        (status = 400, description = "Empty prompt", body = ErrorResponse),
    ),
    tag = "student",
    security(("bearer" = []), ("cookie" = []))
)]
async fn study_bot_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<StudyBotBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Student])?;
    let Some(prompt) = required(&payload.prompt) else {
        return Err(WebError::bad_request("Prompt is required"));
    };

    let context = study_context(&state, user).await?;
    let answer = state.assistant().help(prompt, &context).await;

    Ok((StatusCode::OK, Json(answer)))
}
