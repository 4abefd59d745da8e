//! Repository for the `message_templates` table.

use outreach_core::types::DbId;
use sqlx::PgPool;

use crate::models::status::MessageStatus;
use crate::models::template::{CreateTemplate, MessageTemplate, TemplateStats, UpdateTemplate};

const COLUMNS: &str =
    "id, name, message_type, subject, content, is_active, created_at, updated_at";

pub struct TemplateRepo;

impl TemplateRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateTemplate,
    ) -> Result<MessageTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO message_templates (name, message_type, subject, content) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MessageTemplate>(&query)
            .bind(&input.name)
            .bind(&input.message_type)
            .bind(&input.subject)
            .bind(&input.content)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<MessageTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM message_templates WHERE id = $1");
        sqlx::query_as::<_, MessageTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a template only if it is active.
    pub async fn find_active(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<MessageTemplate>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM message_templates WHERE id = $1 AND is_active");
        sqlx::query_as::<_, MessageTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        include_inactive: bool,
    ) -> Result<Vec<MessageTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM message_templates \
             WHERE ($1 OR is_active) \
             ORDER BY name ASC, id ASC"
        );
        sqlx::query_as::<_, MessageTemplate>(&query)
            .bind(include_inactive)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTemplate,
    ) -> Result<Option<MessageTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE message_templates SET \
                name = COALESCE($2, name), \
                subject = COALESCE($3, subject), \
                content = COALESCE($4, content), \
                is_active = COALESCE($5, is_active) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MessageTemplate>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.subject)
            .bind(&input.content)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Deactivate a template. Campaigns and logs keep referencing it.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE message_templates SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count messages sent with the template and how many drew a reaction.
    pub async fn stats(pool: &PgPool, id: DbId) -> Result<TemplateStats, sqlx::Error> {
        let (total_uses, successful): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE status_id <> $2), \
                    COUNT(*) FILTER (WHERE status_id = ANY($3)) \
             FROM message_logs WHERE template_id = $1",
        )
        .bind(id)
        .bind(MessageStatus::Pending.id())
        .bind(vec![
            MessageStatus::Opened.id(),
            MessageStatus::Clicked.id(),
            MessageStatus::Replied.id(),
        ])
        .fetch_one(pool)
        .await?;
        Ok(TemplateStats {
            template_id: id,
            total_uses,
            successful,
            success_rate: outreach_core::analytics::rate_percent(successful, total_uses),
        })
    }
}
