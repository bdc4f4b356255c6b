use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Comment on a course together with its author's name. The author is
/// `None` once the user has been deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseComment {
    id: Uuid,
    course_id: Uuid,
    user_id: Option<Uuid>,
    user_name: Option<String>,
    text: String,
    created_at: DateTime<Utc>,
}

impl ResourceTyped for CourseComment {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Comment
    }
}

const SELECT_WITH_AUTHOR: &str = r#"
    SELECT cc.id, cc.course_id, cc.user_id, u.name AS user_name, cc.text, cc.created_at
    FROM course_comments cc
    LEFT JOIN users u ON u.id = cc.user_id
"#;

impl CourseComment {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
        text: &str,
    ) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO course_comments (id, course_id, user_id, text) VALUES ($1,$2,$3,$4)")
            .bind(id)
            .bind(course_id)
            .bind(actor.user_id())
            .bind(text)
            .execute(mm.executor())
            .await?;

        let sql = format!("{SELECT_WITH_AUTHOR} WHERE cc.id = $1");
        let row = sqlx::query_as(&sql)
            .bind(id)
            .fetch_one(mm.executor())
            .await?;
        Ok(row)
    }

    /// Oldest first.
    pub async fn list_by_course(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let sql = format!("{SELECT_WITH_AUTHOR} WHERE cc.course_id = $1 ORDER BY cc.created_at");
        let rows = sqlx::query_as(&sql)
            .bind(course_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(rows)
    }
}
