use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies, cookie::SameSite};
use uuid::Uuid;

use crate::{
    auth::{self, hash_password, verify_password},
    model::{CrudRepository, ResourceTyped, entity::UserEntity},
    web::{
        ApiJson, AppState, AuthenticatedUser, RequestContext, UserRole, WebError, WebResult,
        dto::MessageResponse,
        error::ErrorResponse,
        middlewares::{self, AUTH_TOKEN},
        required,
        routes::create_account,
    },
};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub registration_number: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginBody {
    pub email: Option<String>,
    pub reg_number: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub registration_number: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordBody {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Passwords are taken verbatim, only emptiness is rejected.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/me", get(me_handler))
        .route("/change-password", post(change_password_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .merge(protected)
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterBody,
    description = "Registers a new student",
    responses(
        (status = 201, description = "Student registered", body = RegisterResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth"
)]
async fn register_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterBody>,
) -> WebResult<impl IntoResponse> {
    let (Some(name), Some(email), Some(password)) = (
        required(&payload.name),
        required(&payload.email),
        non_empty(&payload.password),
    ) else {
        return Err(WebError::bad_request("All fields are required"));
    };

    let admin = AuthenticatedUser::admin();
    let created = create_account(&state, &admin, name, email, password, UserRole::Student).await?;
    tracing::info!("student {} registered", created.id());

    let body = RegisterResponse {
        message: String::from("Registration successful"),
        registration_number: created.registration_number().to_string(),
    };
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginBody,
    description = "Signs in by email or registration number. Sets the SID cookie as well",
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth"
)]
async fn login_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    ApiJson(payload): ApiJson<LoginBody>,
) -> WebResult<impl IntoResponse> {
    let email = required(&payload.email);
    let reg_number = required(&payload.reg_number);
    let password = match (email, reg_number, non_empty(&payload.password)) {
        (None, None, _) | (_, _, None) => {
            return Err(WebError::bad_request(
                "Email or registration number and password are required",
            ));
        }
        (_, _, Some(password)) => password,
    };

    let admin = AuthenticatedUser::admin();
    let found = UserEntity::find_by_login(state.pool(), &admin, email, reg_number)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(UserEntity::get_resource_type()))?;

    let is_verified =
        verify_password(found.hash(), password).map_err(WebError::server_crypt_error)?;

    if !is_verified {
        return Err(WebError::auth_invalid_credentials());
    }

    let app = state.config().app();
    let token = auth::issue_token(found.id(), app.jwt(), app.token_ttl_days())
        .map_err(|e| WebError::server_crypt_error(e.into()))?;

    let mut cookie = Cookie::new(AUTH_TOKEN, token.clone());
    cookie.set_same_site(SameSite::Lax);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookies.add(cookie);

    let body = LoginResponse {
        token,
        user: LoginUser {
            id: found.id(),
            name: found.name().to_string(),
            email: found.email().to_string(),
            registration_number: found.registration_number().to_string(),
            role: found.role(),
        },
    };
    Ok((StatusCode::OK, Json(body)))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    description = "Profile of the signed in user",
    responses(
        (status = 200, description = "Current user", body = UserEntity),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse),
    ),
    tag = "auth",
    security(("bearer" = []), ("cookie" = []))
)]
async fn me_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = UserEntity::find_by_id(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(UserEntity::get_resource_type()))?;

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordBody,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 401, description = "Current password is incorrect", body = ErrorResponse),
    ),
    tag = "auth",
    security(("bearer" = []), ("cookie" = []))
)]
async fn change_password_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ChangePasswordBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let (Some(current), Some(new)) = (
        non_empty(&payload.current_password),
        non_empty(&payload.new_password),
    ) else {
        return Err(WebError::bad_request(
            "Current password and new password are required",
        ));
    };

    let mut found = UserEntity::find_by_id(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(UserEntity::get_resource_type()))?;

    let is_verified = verify_password(found.hash(), current).map_err(WebError::server_crypt_error)?;
    if !is_verified {
        return Err(WebError::auth_invalid_credentials());
    }

    let hash = hash_password(new).map_err(WebError::server_crypt_error)?;
    found
        .set_password_hash(state.pool(), user, hash)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse::new("Password changed successfully")),
    ))
}
