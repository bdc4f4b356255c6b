use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    id: Uuid,
    title: String,
    description: String,
    teacher_id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CourseCreate {
    pub title: String,
    pub description: String,
    pub teacher_id: Uuid,
}

impl ResourceTyped for Course {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Course
    }
}

impl Course {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn teacher_id(&self) -> Uuid {
        self.teacher_id
    }
}

#[async_trait]
impl CrudRepository<Course, CourseCreate, uuid::Uuid> for Course {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "INSERT INTO courses (id, title, description, teacher_id) VALUES ($1,$2,$3,$4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.teacher_id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        sqlx::query("UPDATE courses SET title = $1, description = $2, teacher_id = $3 WHERE id = $4")
            .bind(&data.title)
            .bind(&data.description)
            .bind(data.teacher_id)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.title = data.title;
        self.description = data.description;
        self.teacher_id = data.teacher_id;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM courses WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM courses WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM courses ORDER BY created_at LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Course {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.teacher_id)
    }
}

// Enrolment

impl Course {
    /// Replaces the enrolled students of the course.
    pub async fn set_students(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        student_ids: &[Uuid],
    ) -> DatabaseResult<()> {
        let mut tx = mm.executor().begin().await?;

        sqlx::query("DELETE FROM course_students WHERE course_id = $1")
            .bind(self.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO course_students (course_id, student_id)
            SELECT $1, s FROM UNNEST($2::UUID[]) AS s
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(self.id)
        .bind(student_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn add_student(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        student_id: Uuid,
    ) -> DatabaseResult<()> {
        sqlx::query("INSERT INTO course_students (course_id, student_id) VALUES ($1,$2) ON CONFLICT DO NOTHING")
            .bind(self.id)
            .bind(student_id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    pub async fn find_by_title(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        title: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM courses WHERE title = $1 LIMIT 1")
            .bind(title)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn is_enrolled(
        mm: &ModelManager,
        course_id: Uuid,
        student_id: Uuid,
    ) -> DatabaseResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM course_students WHERE course_id = $1 AND student_id = $2)",
        )
        .bind(course_id)
        .bind(student_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(exists)
    }

    pub async fn list_for_student(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        student_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT c.*
            FROM courses c
            JOIN course_students cs ON cs.course_id = c.id
            WHERE cs.student_id = $1
            ORDER BY c.created_at
            "#,
        )
        .bind(student_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    /// Distinct students across all courses taught by `teacher_id`.
    pub async fn student_ids_of_teacher(
        mm: &ModelManager,
        teacher_id: Uuid,
    ) -> DatabaseResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar(
            r#"
            SELECT DISTINCT cs.student_id
            FROM course_students cs
            JOIN courses c ON c.id = cs.course_id
            WHERE c.teacher_id = $1
            "#,
        )
        .bind(teacher_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(ids)
    }
}

// Utils

/// Course joined with its teacher, students and resources. The aggregated
/// columns come back as json arrays.
#[derive(Debug, sqlx::FromRow)]
pub struct CourseDetailsRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub teacher_id: Uuid,
    pub teacher_name: Option<String>,
    pub students: serde_json::Value,
    pub resources: serde_json::Value,
}

impl CourseDetailsRow {
    const SELECT: &'static str = r#"
        SELECT
            c.id,
            c.title,
            c.description,
            c.teacher_id,
            t.name AS teacher_name,
            COALESCE((
                SELECT json_agg(json_build_object(
                    'id', u.id,
                    'name', u.name,
                    'email', u.email,
                    'registrationNumber', u.registration_number
                ) ORDER BY u.name)
                FROM course_students cs
                JOIN users u ON u.id = cs.student_id
                WHERE cs.course_id = c.id
            ), '[]') AS students,
            COALESCE((
                SELECT json_agg(json_build_object(
                    'id', r.id,
                    'courseId', r.course_id,
                    'filename', r.filename,
                    'url', r.url,
                    'uploadedAt', r.uploaded_at
                ) ORDER BY r.uploaded_at)
                FROM course_resources r
                WHERE r.course_id = c.id
            ), '[]') AS resources
        FROM courses c
        LEFT JOIN users t ON t.id = c.teacher_id
    "#;

    pub async fn fetch_all(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<Vec<Self>> {
        let sql = format!("{} ORDER BY c.created_at", Self::SELECT);
        let rows = sqlx::query_as(&sql).fetch_all(mm.executor()).await?;
        Ok(rows)
    }

    pub async fn fetch_by_teacher(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        teacher_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let sql = format!("{} WHERE c.teacher_id = $1 ORDER BY c.created_at", Self::SELECT);
        let rows = sqlx::query_as(&sql)
            .bind(teacher_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(rows)
    }

    pub async fn fetch_for_student(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        student_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let sql = format!(
            "{} WHERE EXISTS (SELECT 1 FROM course_students x WHERE x.course_id = c.id AND x.student_id = $1) ORDER BY c.created_at",
            Self::SELECT
        );
        let rows = sqlx::query_as(&sql)
            .bind(student_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(rows)
    }
}
