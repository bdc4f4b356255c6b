use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Broadcast from a teacher to the students of their courses.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    id: Uuid,
    sender_id: Uuid,
    recipients: Vec<Uuid>,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Message with the sender's name, as a student sees it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InboxMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceTyped for Message {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Message
    }
}

impl Message {
    pub const SENT_LIMIT: i64 = 20;
    pub const INBOX_LIMIT: i64 = 50;

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sender_id(&self) -> Uuid {
        self.sender_id
    }

    pub fn recipients(&self) -> &[Uuid] {
        &self.recipients
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        recipients: &[Uuid],
        content: &str,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "INSERT INTO messages (id, sender_id, recipients, content) VALUES ($1,$2,$3,$4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(recipients)
        .bind(content)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    pub async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn set_content(
        &mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        content: String,
    ) -> DatabaseResult<()> {
        let updated_at: DateTime<Utc> = sqlx::query_scalar(
            "UPDATE messages SET content = $1, updated_at = now() WHERE id = $2 RETURNING updated_at",
        )
        .bind(&content)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        self.content = content;
        self.updated_at = updated_at;
        Ok(())
    }

    /// Most recent messages sent by `sender_id`.
    pub async fn list_by_sender(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        sender_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM messages WHERE sender_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(sender_id)
        .bind(Self::SENT_LIMIT)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}

impl InboxMessage {
    /// Most recent messages addressed to `recipient_id`.
    pub async fn list_for_recipient(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        recipient_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT m.id, m.sender_id, u.name AS sender_name, m.content, m.created_at, m.updated_at
            FROM messages m
            LEFT JOIN users u ON u.id = m.sender_id
            WHERE $1 = ANY(m.recipients)
            ORDER BY m.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(recipient_id)
        .bind(Message::INBOX_LIMIT)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Message {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.sender_id)
    }
}
