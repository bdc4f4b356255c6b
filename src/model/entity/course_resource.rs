use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// File uploaded by a teacher and attached to a course.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseResource {
    id: Uuid,
    course_id: Uuid,
    filename: String,
    url: String,
    uploaded_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct CourseResourceCreate {
    pub course_id: Uuid,
    pub filename: String,
    pub url: String,
}

impl ResourceTyped for CourseResource {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::CourseResource
    }
}

impl CourseResource {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CourseResourceCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "INSERT INTO course_resources (id, course_id, filename, url) VALUES ($1,$2,$3,$4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.course_id)
        .bind(&data.filename)
        .bind(&data.url)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }
}
