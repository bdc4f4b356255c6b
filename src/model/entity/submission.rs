use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::scoring::{AnswerRecord, Scored, StudentScored, SubmissionMetrics};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    id: Uuid,
    /// Cleared when the test is purged after its expiry.
    test_id: Option<Uuid>,
    course_id: Uuid,
    student_id: Uuid,
    #[sqlx(json)]
    answers: Vec<AnswerRecord>,
    total_marks: f64,
    max_marks: f64,
    percentage: f64,
    graded: bool,
    submitted_at: DateTime<Utc>,
}

/// Fresh or recomputed scoring for one student's attempt at a test.
#[derive(Debug)]
pub struct SubmissionCreateUpdate {
    pub test_id: Option<Uuid>,
    pub course_id: Uuid,
    pub student_id: Uuid,
    pub metrics: SubmissionMetrics,
}

impl ResourceTyped for Submission {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Submission
    }
}

impl Submission {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn test_id(&self) -> Option<Uuid> {
        self.test_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn max_marks(&self) -> f64 {
        self.max_marks
    }

    pub fn is_graded(&self) -> bool {
        self.graded
    }
}

impl Scored for Submission {
    fn percentage(&self) -> f64 {
        self.percentage
    }
}

#[async_trait]
impl CrudRepository<Submission, SubmissionCreateUpdate, uuid::Uuid> for Submission {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: SubmissionCreateUpdate,
    ) -> DatabaseResult<Self> {
        let metrics = data.metrics;
        let row = sqlx::query_as(
            r#"
            INSERT INTO submissions (id, test_id, course_id, student_id, answers, total_marks, max_marks, percentage, graded)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.test_id)
        .bind(data.course_id)
        .bind(data.student_id)
        .bind(sqlx::types::Json(&metrics.graded_answers))
        .bind(metrics.total_marks)
        .bind(metrics.max_marks)
        .bind(metrics.percentage)
        .bind(metrics.fully_graded)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: SubmissionCreateUpdate,
    ) -> DatabaseResult<Self> {
        let metrics = data.metrics;
        sqlx::query(
            "UPDATE submissions SET answers = $1, total_marks = $2, max_marks = $3, percentage = $4, graded = $5 WHERE id = $6",
        )
        .bind(sqlx::types::Json(&metrics.graded_answers))
        .bind(metrics.total_marks)
        .bind(metrics.max_marks)
        .bind(metrics.percentage)
        .bind(metrics.fully_graded)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.answers = metrics.graded_answers;
        self.total_marks = metrics.total_marks;
        self.max_marks = metrics.max_marks;
        self.percentage = metrics.percentage;
        self.graded = metrics.fully_graded;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM submissions WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM submissions WHERE id = $1")
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
        let result =
            sqlx::query_as("SELECT * FROM submissions ORDER BY submitted_at LIMIT $1 OFFSET $2")
                .bind(limit)
                .bind(offset)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

/// A submission belongs to the teacher of the course it was made in.
#[async_trait]
impl HasOwner for Submission {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let teacher_id = sqlx::query_scalar("SELECT teacher_id FROM courses WHERE id = $1")
            .bind(self.course_id)
            .fetch_one(mm.executor())
            .await?;
        Ok(teacher_id)
    }
}

impl Submission {
    pub async fn find_by_test_and_student(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        test_id: Uuid,
        student_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM submissions WHERE test_id = $1 AND student_id = $2")
                .bind(test_id)
                .bind(student_id)
                .fetch_optional(mm.executor())
                .await?;
        Ok(result)
    }
}

// Utils

/// Submission joined with its test title and the student's name, as shown in
/// result listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub test_id: Option<Uuid>,
    pub test_title: Option<String>,
    pub course_id: Uuid,
    pub student_id: Uuid,
    pub student_name: Option<String>,
    pub registration_number: Option<String>,
    #[sqlx(json)]
    pub answers: Vec<AnswerRecord>,
    pub total_marks: f64,
    pub max_marks: f64,
    pub percentage: f64,
    pub graded: bool,
    pub submitted_at: DateTime<Utc>,
}

impl Scored for SubmissionRecord {
    fn percentage(&self) -> f64 {
        self.percentage
    }
}

impl StudentScored for SubmissionRecord {
    fn student_id(&self) -> Uuid {
        self.student_id
    }

    fn student_name(&self) -> &str {
        self.student_name.as_deref().unwrap_or("Unknown")
    }
}

const SELECT_RECORD: &str = r#"
    SELECT
        s.id, s.test_id, t.title AS test_title, s.course_id,
        s.student_id, u.name AS student_name, u.registration_number,
        s.answers, s.total_marks, s.max_marks, s.percentage, s.graded, s.submitted_at
    FROM submissions s
    LEFT JOIN tests t ON t.id = s.test_id
    LEFT JOIN users u ON u.id = s.student_id
"#;

impl SubmissionRecord {
    pub async fn list_all(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<Self>> {
        let sql = format!("{SELECT_RECORD} ORDER BY s.submitted_at");
        let rows = sqlx::query_as(&sql).fetch_all(mm.executor()).await?;
        Ok(rows)
    }

    /// Submissions made in courses taught by `teacher_id`, including those
    /// whose test has since been purged.
    pub async fn list_by_teacher(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        teacher_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let sql = format!(
            "{SELECT_RECORD} JOIN courses c ON c.id = s.course_id WHERE c.teacher_id = $1 ORDER BY s.submitted_at"
        );
        let rows = sqlx::query_as(&sql)
            .bind(teacher_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(rows)
    }

    pub async fn list_by_student(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        student_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let sql = format!("{SELECT_RECORD} WHERE s.student_id = $1 ORDER BY s.submitted_at");
        let rows = sqlx::query_as(&sql)
            .bind(student_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(rows)
    }
}
