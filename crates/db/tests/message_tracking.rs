//! Tracking stamps on message logs: first-event detection and status order.

use outreach_db::models::message_log::NewMessageLog;
use outreach_db::models::prospect::CreateProspect;
use outreach_db::models::status::MessageStatus;
use outreach_db::repositories::{MessageLogRepo, ProspectRepo};
use sqlx::PgPool;

async fn sent_log(pool: &PgPool) -> i64 {
    let prospect = ProspectRepo::create(
        pool,
        &CreateProspect {
            email: "track@example.com".to_string(),
            first_name: Some("Jane".to_string()),
            last_name: None,
            company: None,
            website: None,
            lead_source: None,
            consent_given: true,
            social_profiles: None,
        },
    )
    .await
    .unwrap();
    MessageLogRepo::create(
        pool,
        &NewMessageLog {
            prospect_id: prospect.id,
            campaign_id: None,
            template_id: None,
            message_type: "email".to_string(),
            subject: None,
            content: "Hello".to_string(),
            step_number: None,
            status_id: MessageStatus::Sent.id(),
            ab_test_variant: None,
            metadata: serde_json::json!({}),
        },
    )
    .await
    .unwrap()
    .id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_the_first_event_is_flagged(pool: PgPool) {
    let id = sent_log(&pool).await;

    let first = MessageLogRepo::mark_opened(&pool, id).await.unwrap().unwrap();
    assert!(first.first_event);
    assert_eq!(first.log.status_id, MessageStatus::Opened.id());
    let opened_at = first.log.opened_at.unwrap();

    let again = MessageLogRepo::mark_opened(&pool, id).await.unwrap().unwrap();
    assert!(!again.first_event);
    assert_eq!(again.log.opened_at, Some(opened_at));

    // A click is new even though the message was already opened.
    let click = MessageLogRepo::mark_clicked(&pool, id).await.unwrap().unwrap();
    assert!(click.first_event);
    assert_eq!(click.log.opened_at, Some(opened_at));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_opens_flag_one_first_event(pool: PgPool) {
    let id = sent_log(&pool).await;

    let (a, b, c) = tokio::join!(
        MessageLogRepo::mark_opened(&pool, id),
        MessageLogRepo::mark_opened(&pool, id),
        MessageLogRepo::mark_opened(&pool, id),
    );
    let firsts = [a, b, c]
        .into_iter()
        .filter(|r| r.as_ref().unwrap().as_ref().unwrap().first_event)
        .count();
    assert_eq!(firsts, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reply_keeps_status_and_sentiment(pool: PgPool) {
    let id = sent_log(&pool).await;

    let reply = MessageLogRepo::mark_replied(&pool, id, Some(0.6)).await.unwrap().unwrap();
    assert!(reply.first_event);
    assert_eq!(reply.log.sentiment_score, Some(0.6));

    // A late open neither lowers the status nor clears the score.
    let open = MessageLogRepo::mark_opened(&pool, id).await.unwrap().unwrap();
    assert!(open.first_event);
    assert_eq!(open.log.status_id, MessageStatus::Replied.id());
    assert_eq!(open.log.sentiment_score, Some(0.6));

    assert!(MessageLogRepo::mark_opened(&pool, 999_999).await.unwrap().is_none());
}
