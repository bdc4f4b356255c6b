use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped,
        entity::{
            Course, CourseCreate, CourseDetailsRow, ScheduleSlot, Submission, SubmissionRecord,
            Timetable, TimetableView, UserEntity,
        },
    },
    web::{
        ApiJson, AppState, AuthenticatedUser, RequestContext, UserRole, WebError, WebResult,
        dto::{CourseDetails, CoursesResponse, MessageResponse, ResultsResponse},
        error::ErrorResponse,
        middlewares, required,
        routes::create_account,
    },
};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AccountBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreatedResponse {
    pub message: String,
    pub registration_number: String,
    pub user: UserEntity,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseBody {
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    pub teacher_id: Option<Uuid>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CourseResponse {
    pub message: String,
    pub course: Course,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignCourseBody {
    pub course_id: Uuid,
    pub teacher_id: Option<Uuid>,
    #[serde(default)]
    pub student_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignTimetableBody {
    pub course_id: Uuid,
    #[serde(default)]
    pub schedule: Vec<ScheduleSlot>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TimetableResponse {
    pub message: String,
    pub timetable: Timetable,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TimetablesResponse {
    pub timetables: Vec<TimetableView>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonitorResponse {
    pub user_count: i64,
    pub course_count: i64,
    pub timetable_count: i64,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UserUpdateBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub message: String,
    pub user: UserEntity,
}

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/create-teacher", post(create_teacher_handler))
        .route("/teachers", get(teachers_list_handler))
        .route("/students", get(students_list_handler))
        .route("/courses", post(course_create_handler).get(courses_list_handler))
        .route("/assign-course", post(assign_course_handler))
        .route("/assign-timetable", post(assign_timetable_handler))
        .route("/timetables", get(timetables_list_handler))
        .route("/monitor", get(monitor_handler))
        .route("/users/{id}", put(user_update_handler).delete(user_delete_handler))
        .route("/results", get(results_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/create-first-admin", post(create_first_admin_handler))
        .merge(protected)
        .with_state(state)
}

fn account_fields(payload: &AccountBody) -> WebResult<(&str, &str, &str)> {
    let password = payload.password.as_deref().filter(|p| !p.is_empty());
    match (required(&payload.name), required(&payload.email), password) {
        (Some(name), Some(email), Some(password)) => Ok((name, email, password)),
        _ => Err(WebError::bad_request("All fields required")),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/create-first-admin",
    request_body = AccountBody,
    description = "Bootstraps the first admin account. Refused once any admin exists",
    responses(
        (status = 201, description = "Admin created", body = AccountCreatedResponse),
        (status = 400, description = "Admin already exists or fields missing", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    ),
    tag = "admin"
)]
async fn create_first_admin_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AccountBody>,
) -> WebResult<impl IntoResponse> {
    let exists = UserEntity::admin_exists(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;
    if exists {
        return Err(WebError::bad_request("Admin already exists"));
    }

    let (name, email, password) = account_fields(&payload)?;
    let admin = AuthenticatedUser::admin();
    let created = create_account(&state, &admin, name, email, password, UserRole::Admin).await?;
    tracing::info!("first admin {} created", created.id());

    let body = AccountCreatedResponse {
        message: String::from("Admin created successfully"),
        registration_number: created.registration_number().to_string(),
        user: created,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    post,
    path = "/api/admin/create-teacher",
    request_body = AccountBody,
    responses(
        (status = 201, description = "Teacher created", body = AccountCreatedResponse),
        (status = 400, description = "Fields missing", body = ErrorResponse),
        (status = 403, description = "Admins only", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    ),
    tag = "admin",
    security(("bearer" = []), ("cookie" = []))
)]
async fn create_teacher_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AccountBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Admin])?;
    let (name, email, password) = account_fields(&payload)?;

    let created = create_account(&state, user, name, email, password, UserRole::Teacher).await?;
    tracing::info!("teacher {} created", created.id());

    let body = AccountCreatedResponse {
        message: String::from("Teacher created successfully"),
        registration_number: created.registration_number().to_string(),
        user: created,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    get,
    path = "/api/admin/teachers",
    responses(
        (status = 200, description = "All teachers", body = Vec<UserEntity>),
        (status = 403, description = "Admins only", body = ErrorResponse),
    ),
    tag = "admin",
    security(("bearer" = []), ("cookie" = []))
)]
async fn teachers_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Admin])?;
    let teachers = UserEntity::list_by_role(state.pool(), user, UserRole::Teacher)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(teachers)))
}

#[utoipa::path(
    get,
    path = "/api/admin/students",
    responses(
        (status = 200, description = "All students", body = Vec<UserEntity>),
        (status = 403, description = "Admins only", body = ErrorResponse),
    ),
    tag = "admin",
    security(("bearer" = []), ("cookie" = []))
)]
async fn students_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Admin])?;
    let students = UserEntity::list_by_role(state.pool(), user, UserRole::Student)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(students)))
}

async fn find_teacher(
    state: &AppState,
    actor: &AuthenticatedUser,
    teacher_id: Uuid,
) -> WebResult<UserEntity> {
    let teacher = UserEntity::find_by_id(state.pool(), actor, teacher_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(UserEntity::get_resource_type()))?;

    if teacher.role() == UserRole::Student {
        return Err(WebError::bad_request("Assigned user is not a teacher"));
    }
    Ok(teacher)
}

/// Every id must name an existing student.
async fn check_student_ids(
    state: &AppState,
    actor: &AuthenticatedUser,
    student_ids: &[Uuid],
) -> WebResult<()> {
    if student_ids.is_empty() {
        return Ok(());
    }
    let found = UserEntity::filter_student_ids(state.pool(), actor, student_ids)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    let invalid: Vec<String> = student_ids
        .iter()
        .filter(|id| !found.contains(id))
        .map(Uuid::to_string)
        .collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(WebError::bad_request(format!(
            "Not students: {}",
            invalid.join(", ")
        )))
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/courses",
    request_body = CourseBody,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 400, description = "Title and teacher are required", body = ErrorResponse),
        (status = 404, description = "Teacher not found", body = ErrorResponse),
    ),
    tag = "admin",
    security(("bearer" = []), ("cookie" = []))
)]
async fn course_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CourseBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Admin])?;
    let (Some(title), Some(teacher_id)) = (required(&payload.title), payload.teacher_id) else {
        return Err(WebError::bad_request("Title and teacher are required"));
    };

    let teacher = find_teacher(&state, user, teacher_id).await?;

    let data = CourseCreate {
        title: title.to_string(),
        description: payload.description.trim().to_string(),
        teacher_id: teacher.id(),
    };
    let course = Course::create(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    let body = CourseResponse {
        message: String::from("Course created"),
        course,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    get,
    path = "/api/admin/courses",
    responses(
        (status = 200, description = "All courses with teacher and students", body = CoursesResponse),
    ),
    tag = "admin",
    security(("bearer" = []), ("cookie" = []))
)]
async fn courses_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Admin])?;
    let rows = CourseDetailsRow::fetch_all(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;
    let courses = CourseDetails::from_rows(rows)
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(CoursesResponse { courses })))
}

#[utoipa::path(
    post,
    path = "/api/admin/assign-course",
    request_body = AssignCourseBody,
    description = "Sets the teacher and replaces the enrolled students of a course",
    responses(
        (status = 200, description = "Course assigned", body = CourseResponse),
        (status = 400, description = "Unknown or non-student ids", body = ErrorResponse),
        (status = 404, description = "Course or teacher not found", body = ErrorResponse),
    ),
    tag = "admin",
    security(("bearer" = []), ("cookie" = []))
)]
async fn assign_course_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AssignCourseBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Admin])?;
    let mut course = Course::find_by_id(state.pool(), user, payload.course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Course::get_resource_type()))?;

    check_student_ids(&state, user, &payload.student_ids).await?;

    if let Some(teacher_id) = payload.teacher_id {
        let teacher = find_teacher(&state, user, teacher_id).await?;
        let data = CourseCreate {
            title: course.title().to_string(),
            description: course.description().to_string(),
            teacher_id: teacher.id(),
        };
        course = course
            .update(state.pool(), user, data)
            .await
            .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;
    }

    if !payload.student_ids.is_empty() {
        course
            .set_students(state.pool(), user, &payload.student_ids)
            .await
            .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

        Timetable::ensure(state.pool(), user, course.id(), course.teacher_id())
            .await
            .map_err(|e| WebError::resource_fetch_error(Timetable::get_resource_type(), e))?;
        tracing::debug!(
            "course {} now has {} students",
            course.id(),
            payload.student_ids.len()
        );
    }

    let body = CourseResponse {
        message: String::from("Course assigned"),
        course,
    };
    Ok((StatusCode::OK, Json(body)))
}

#[utoipa::path(
    post,
    path = "/api/admin/assign-timetable",
    request_body = AssignTimetableBody,
    responses(
        (status = 200, description = "Timetable stored", body = TimetableResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "admin",
    security(("bearer" = []), ("cookie" = []))
)]
async fn assign_timetable_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AssignTimetableBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Admin])?;
    let course = Course::find_by_id(state.pool(), user, payload.course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Course::get_resource_type()))?;

    let timetable = Timetable::upsert(
        state.pool(),
        user,
        course.id(),
        course.teacher_id(),
        &payload.schedule,
    )
    .await
    .map_err(|e| WebError::resource_fetch_error(Timetable::get_resource_type(), e))?;

    let body = TimetableResponse {
        message: String::from("Timetable assigned"),
        timetable,
    };
    Ok((StatusCode::OK, Json(body)))
}

#[utoipa::path(
    get,
    path = "/api/admin/timetables",
    responses((status = 200, description = "All timetables", body = TimetablesResponse)),
    tag = "admin",
    security(("bearer" = []), ("cookie" = []))
)]
async fn timetables_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Admin])?;
    let timetables = TimetableView::list_all(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Timetable::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(TimetablesResponse { timetables })))
}

#[utoipa::path(
    get,
    path = "/api/admin/monitor",
    responses((status = 200, description = "Entity counts", body = MonitorResponse)),
    tag = "admin",
    security(("bearer" = []), ("cookie" = []))
)]
async fn monitor_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Admin])?;
    let user_count = UserEntity::count(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;
    let course_count = Course::count(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;
    let timetable_count = Timetable::count(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Timetable::get_resource_type(), e))?;

    let body = MonitorResponse {
        user_count,
        course_count,
        timetable_count,
    };
    Ok((StatusCode::OK, Json(body)))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    request_body = UserUpdateBody,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email already taken", body = ErrorResponse),
    ),
    tag = "admin",
    security(("bearer" = []), ("cookie" = []))
)]
async fn user_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UserUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Admin])?;
    let found = UserEntity::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(UserEntity::get_resource_type()))?;

    let mut data = found.to_update();
    if let Some(name) = required(&payload.name) {
        data.name = name.to_string();
    }
    if let Some(email) = required(&payload.email) {
        let taken = UserEntity::find_by_email(state.pool(), user, email)
            .await
            .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;
        if taken.is_some_and(|other| other.id() != found.id()) {
            return Err(WebError::registration_conflict());
        }
        data.email = email.to_string();
    }
    if let Some(role) = payload.role {
        data.role = role;
    }

    let updated = found
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    let body = UserResponse {
        message: String::from("User updated"),
        user: updated,
    };
    Ok((StatusCode::OK, Json(body)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tag = "admin",
    security(("bearer" = []), ("cookie" = []))
)]
async fn user_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Admin])?;
    let found = UserEntity::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(UserEntity::get_resource_type()))?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(MessageResponse::new("User deleted"))))
}

#[utoipa::path(
    get,
    path = "/api/admin/results",
    description = "Every submission with the platform-wide summary",
    responses((status = 200, description = "All results", body = ResultsResponse)),
    tag = "admin",
    security(("bearer" = []), ("cookie" = []))
)]
async fn results_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.require_role(&[UserRole::Admin])?;
    let submissions = SubmissionRecord::list_all(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Submission::get_resource_type(), e))?;

    let body = ResultsResponse::new(submissions, state.pass_threshold());
    Ok((StatusCode::OK, Json(body)))
}
