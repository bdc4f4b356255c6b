use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::web::AuthenticatedUser;
use crate::web::UserRole;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    id: uuid::Uuid,
    name: String,
    email: String,
    registration_number: String,
    #[serde(skip)]
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UserEntityCreateUpdate {
    pub name: String,
    pub email: String,
    pub registration_number: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// Public part of a user, embedded in course and result listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserBrief {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub registration_number: String,
}

impl ResourceTyped for UserEntity {
    fn get_resource_type() -> crate::model::repo::ResourceType {
        crate::model::repo::ResourceType::User
    }
}

impl UserEntity {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn registration_number(&self) -> &str {
        &self.registration_number
    }

    pub fn hash(&self) -> &str {
        &self.password_hash
    }

    pub fn role(&self) -> UserRole {
        UserRole::from(self.role.as_str())
    }

    /// Current values as an update payload, for partial edits.
    pub fn to_update(&self) -> UserEntityCreateUpdate {
        UserEntityCreateUpdate {
            name: self.name.clone(),
            email: self.email.clone(),
            registration_number: self.registration_number.clone(),
            password_hash: self.password_hash.clone(),
            role: self.role(),
        }
    }
}

#[async_trait::async_trait]
impl CrudRepository<UserEntity, UserEntityCreateUpdate, uuid::Uuid> for UserEntity {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserEntityCreateUpdate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO users (id, name, email, registration_number, password_hash, role)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.registration_number)
        .bind(&data.password_hash)
        .bind(data.role.to_string())
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserEntityCreateUpdate,
    ) -> DatabaseResult<Self> {
        sqlx::query(
            "UPDATE users SET name = $1, email = $2, registration_number = $3, password_hash = $4, role = $5 WHERE id = $6",
        )
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.registration_number)
        .bind(&data.password_hash)
        .bind(data.role.to_string())
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.name = data.name;
        self.email = data.email;
        self.registration_number = data.registration_number;
        self.password_hash = data.password_hash;
        self.role = data.role.to_string();
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: uuid::Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;

        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM users ORDER BY created_at LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for UserEntity {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.id) // owners of users are themselves
    }
}

impl UserEntity {
    pub async fn find_by_email(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        email: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    /// Looks a user up by email or registration number, whichever is given.
    pub async fn find_by_login(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        email: Option<&str>,
        registration_number: Option<&str>,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT *
            FROM users
            WHERE ($1::TEXT IS NOT NULL AND lower(email) = lower($1))
               OR ($2::TEXT IS NOT NULL AND registration_number = $2)
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(registration_number)
        .fetch_optional(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn list_by_role(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        role: UserRole,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM users WHERE role = $1 ORDER BY name")
            .bind(role.to_string())
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    /// The subset of `ids` that belong to existing students.
    pub async fn filter_student_ids(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        ids: &[Uuid],
    ) -> DatabaseResult<Vec<Uuid>> {
        let result = sqlx::query_scalar("SELECT id FROM users WHERE id = ANY($1) AND role = 'student'")
            .bind(ids)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn admin_exists(mm: &ModelManager) -> DatabaseResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin')")
            .fetch_one(mm.executor())
            .await?;
        Ok(exists)
    }

    pub async fn set_password_hash(
        &mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        password_hash: String,
    ) -> DatabaseResult<()> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(&password_hash)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.password_hash = password_hash;
        Ok(())
    }
}
