use crate::{
    Config,
    auth::{generate_registration_number, hash_password},
    model::{
        CrudRepository, ResourceTyped,
        entity::{UserEntity, UserEntityCreateUpdate},
    },
    web::{AppState, AuthenticatedUser, UserRole, WebError, WebResult, doc::ApiDoc},
};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod admin;
pub mod auth;
pub mod health;
pub mod student;
pub mod teacher;

pub fn build_app<S: Send + Sync + Clone + 'static>(
    state: AppState,
    config: &'static Config,
) -> Router<S> {
    let mut router = Router::new()
        .nest("/api/auth", auth::routes(state.clone()))
        .nest("/api/admin", admin::routes(state.clone()))
        .nest("/api/teacher", teacher::routes(state.clone()))
        .nest("/api/student", student::routes(state.clone()))
        .merge(health::routes(state.clone()))
        .nest_service("/uploads", ServeDir::new(config.app().uploads_dir()))
        .layer(CookieManagerLayer::default())
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if config.app().docs() {
        let openapi = ApiDoc::openapi();

        router = router.merge(SwaggerUi::new("/api/docs").url("/api-doc/openapi.json", openapi));
    }

    router
}

/// Attempts at drawing a free registration number before giving up.
const REGISTRATION_ATTEMPTS: usize = 5;

/// Creates a user with a fresh registration number for `role`.
///
/// Fails with 409 when the email is taken. A clash on the registration number
/// is retried with a new one.
pub(crate) async fn create_account(
    state: &AppState,
    actor: &AuthenticatedUser,
    name: &str,
    email: &str,
    password: &str,
    role: UserRole,
) -> WebResult<UserEntity> {
    let found = UserEntity::find_by_email(state.pool(), actor, email)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    if found.is_some() {
        return Err(WebError::registration_conflict());
    }

    let hash = hash_password(password).map_err(WebError::server_crypt_error)?;

    let mut attempt = 1;
    loop {
        let payload = UserEntityCreateUpdate {
            name: name.to_string(),
            email: email.to_string(),
            registration_number: generate_registration_number(&role),
            password_hash: hash.clone(),
            role: role.clone(),
        };

        match UserEntity::create(state.pool(), actor, payload).await {
            Ok(user) => return Ok(user),
            Err(e) if e.is_unique_violation() && attempt < REGISTRATION_ATTEMPTS => {
                tracing::debug!("registration number clash, retrying ({attempt})");
                attempt += 1;
            }
            Err(e) if e.is_unique_violation() => return Err(WebError::registration_conflict()),
            Err(e) => {
                return Err(WebError::resource_fetch_error(
                    UserEntity::get_resource_type(),
                    e,
                ));
            }
        }
    }
}
