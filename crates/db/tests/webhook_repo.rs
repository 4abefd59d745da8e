//! Webhook subscriptions: event-type filtering and activity.

use outreach_db::repositories::WebhookRepo;
use sqlx::PgPool;

fn urls(subs: &[outreach_db::models::webhook::WebhookSubscription]) -> Vec<&str> {
    subs.iter().map(|s| s.url.as_str()).collect()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_for_event_filters_by_type(pool: PgPool) {
    WebhookRepo::create(&pool, "https://hooks.example.com/all", &[], "s1")
        .await
        .unwrap();
    WebhookRepo::create(
        &pool,
        "https://hooks.example.com/replies",
        &["message.replied".to_string(), "message.clicked".to_string()],
        "s2",
    )
    .await
    .unwrap();
    let paused = WebhookRepo::create(&pool, "https://hooks.example.com/paused", &[], "s3")
        .await
        .unwrap();
    sqlx::query("UPDATE webhook_subscriptions SET is_active = FALSE WHERE id = $1")
        .bind(paused.id)
        .execute(&pool)
        .await
        .unwrap();

    let replied = WebhookRepo::list_for_event(&pool, "message.replied").await.unwrap();
    assert_eq!(
        urls(&replied),
        vec!["https://hooks.example.com/all", "https://hooks.example.com/replies"]
    );
    assert_eq!(replied[1].secret, "s2");

    let opened = WebhookRepo::list_for_event(&pool, "message.opened").await.unwrap();
    assert_eq!(urls(&opened), vec!["https://hooks.example.com/all"]);

    // Inactive subscriptions are still listed, just never selected.
    assert_eq!(WebhookRepo::list(&pool).await.unwrap().len(), 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_reports_whether_a_row_went(pool: PgPool) {
    let sub = WebhookRepo::create(&pool, "https://hooks.example.com/x", &[], "s")
        .await
        .unwrap();
    assert!(WebhookRepo::delete(&pool, sub.id).await.unwrap());
    assert!(!WebhookRepo::delete(&pool, sub.id).await.unwrap());
    assert!(WebhookRepo::list_for_event(&pool, "prospect.created").await.unwrap().is_empty());
}
