use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub notes: String,
}

/// Weekly schedule of a course. There is at most one per course.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    id: Uuid,
    course_id: Uuid,
    teacher_id: Uuid,
    #[sqlx(json)]
    schedule: Vec<ScheduleSlot>,
    created_at: DateTime<Utc>,
}

/// Timetable joined with course title and teacher name for listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimetableView {
    pub id: Uuid,
    pub course_id: Uuid,
    pub course_title: String,
    pub teacher_id: Uuid,
    pub teacher_name: Option<String>,
    #[sqlx(json)]
    pub schedule: Vec<ScheduleSlot>,
}

impl ResourceTyped for Timetable {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Timetable
    }
}

const SELECT_VIEW: &str = r#"
    SELECT t.id, t.course_id, c.title AS course_title, t.teacher_id, u.name AS teacher_name, t.schedule
    FROM timetables t
    JOIN courses c ON c.id = t.course_id
    LEFT JOIN users u ON u.id = t.teacher_id
"#;

impl Timetable {
    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn schedule(&self) -> &[ScheduleSlot] {
        &self.schedule
    }

    /// Creates or replaces the schedule of `course_id`.
    pub async fn upsert(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
        teacher_id: Uuid,
        schedule: &[ScheduleSlot],
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO timetables (id, course_id, teacher_id, schedule)
            VALUES ($1,$2,$3,$4)
            ON CONFLICT (course_id)
            DO UPDATE SET teacher_id = EXCLUDED.teacher_id, schedule = EXCLUDED.schedule
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(teacher_id)
        .bind(sqlx::types::Json(schedule))
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    /// Makes sure `course_id` has a timetable owned by `teacher_id`, keeping
    /// any existing schedule.
    pub async fn ensure(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
        teacher_id: Uuid,
    ) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO timetables (id, course_id, teacher_id)
            VALUES ($1,$2,$3)
            ON CONFLICT (course_id) DO UPDATE SET teacher_id = EXCLUDED.teacher_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(teacher_id)
        .execute(mm.executor())
        .await?;
        Ok(())
    }

    pub async fn count(mm: &ModelManager) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM timetables")
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }
}

impl TimetableView {
    pub async fn list_all(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<Self>> {
        let sql = format!("{SELECT_VIEW} ORDER BY c.title");
        let rows = sqlx::query_as(&sql).fetch_all(mm.executor()).await?;
        Ok(rows)
    }

    pub async fn list_for_student(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        student_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let sql = format!(
            "{SELECT_VIEW} JOIN course_students cs ON cs.course_id = t.course_id WHERE cs.student_id = $1 ORDER BY c.title"
        );
        let rows = sqlx::query_as(&sql)
            .bind(student_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(rows)
    }
}
