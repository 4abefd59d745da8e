//! Repository for the `webhook_subscriptions` table.

use outreach_core::types::DbId;
use sqlx::PgPool;

use crate::models::webhook::WebhookSubscription;

const COLUMNS: &str = "id, url, event_types, secret, is_active, created_at, updated_at";

pub struct WebhookRepo;

impl WebhookRepo {
    /// Register a subscription. A duplicate URL violates
    /// `uq_webhook_subscriptions_url`.
    pub async fn create(
        pool: &PgPool,
        url: &str,
        event_types: &[String],
        secret: &str,
    ) -> Result<WebhookSubscription, sqlx::Error> {
        let query = format!(
            "INSERT INTO webhook_subscriptions (url, event_types, secret) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WebhookSubscription>(&query)
            .bind(url)
            .bind(event_types)
            .bind(secret)
            .fetch_one(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<WebhookSubscription>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM webhook_subscriptions ORDER BY id ASC");
        sqlx::query_as::<_, WebhookSubscription>(&query)
            .fetch_all(pool)
            .await
    }

    /// Active subscriptions that want `event_type` (an empty filter means all).
    pub async fn list_for_event(
        pool: &PgPool,
        event_type: &str,
    ) -> Result<Vec<WebhookSubscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM webhook_subscriptions \
             WHERE is_active AND (cardinality(event_types) = 0 OR $1 = ANY(event_types)) \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, WebhookSubscription>(&query)
            .bind(event_type)
            .fetch_all(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM webhook_subscriptions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
