//! Scoring and sequence-step jobs against a real database.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;
use common::RecordingEmail;
use outreach_db::models::job::{
    NewJob, ScoreProspectPayload, SequenceStepPayload, JOB_SCORE_PROSPECT, JOB_SEQUENCE_STEP,
};
use outreach_db::models::sequence::CreateSequenceStep;
use outreach_db::models::status::{CampaignStatus, JobStatus, MessageStatus, ProspectStatus};
use outreach_db::repositories::{
    CampaignRepo, JobRepo, MessageLogRepo, ProspectRepo, SequenceRepo,
};
use serde_json::json;
use sqlx::PgPool;

async fn enqueue_step(pool: &PgPool, campaign_id: i64, prospect_id: i64) -> i64 {
    JobRepo::enqueue(
        pool,
        &NewJob::new(JOB_SEQUENCE_STEP, SequenceStepPayload { campaign_id, prospect_id }).unwrap(),
    )
    .await
    .unwrap()
    .id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn score_job_stores_qualification_score(pool: PgPool) {
    let p = common::prospect(
        &pool,
        "jane@example.com",
        true,
        json!({
            "platform": "twitter",
            "basic_info": {"username": "jane", "bio": "Writer", "followers": 500000},
            "engagement": {"engagement_rate": 0.8, "response_rate": 0.9, "avg_response_time": 1}
        }),
    )
    .await;
    let job = JobRepo::enqueue(
        &pool,
        &NewJob::new(JOB_SCORE_PROSPECT, ScoreProspectPayload { prospect_id: p.id }).unwrap(),
    )
    .await
    .unwrap();

    let dispatcher = common::dispatcher(&pool, Arc::new(RecordingEmail::default()));
    assert_eq!(dispatcher.try_dispatch().await.unwrap(), 1);

    let scored = ProspectRepo::find_by_id(&pool, p.id).await.unwrap().unwrap();
    let job = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(job.status_id, JobStatus::Completed.id());
    let result = job.result.unwrap();
    assert!(result.get("skipped").is_none());
    assert_eq!(result["prospect_id"], json!(p.id));
    assert_eq!(result["qualification_score"], json!(scored.qualification_score));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn score_job_without_profile_keeps_default(pool: PgPool) {
    let p = common::prospect(&pool, "bare@example.com", true, json!({"twitter": "123"})).await;
    let job_id = JobRepo::enqueue(
        &pool,
        &NewJob::new(JOB_SCORE_PROSPECT, ScoreProspectPayload { prospect_id: p.id }).unwrap(),
    )
    .await
    .unwrap()
    .id;

    let dispatcher = common::dispatcher(&pool, Arc::new(RecordingEmail::default()));
    dispatcher.try_dispatch().await.unwrap();

    let p = ProspectRepo::find_by_id(&pool, p.id).await.unwrap().unwrap();
    assert_eq!(p.qualification_score, 50);
    let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.result.unwrap()["skipped"], "no_profile_data");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sequence_step_sends_and_queues_follow_up(pool: PgPool) {
    let first = common::template(&pool, "email", "Hello {{first_name}} at {{company}}").await;
    let second = common::template(&pool, "email", "Following up, {{first_name}}").await;
    let campaign = common::active_campaign(&pool, first.id).await;
    for (step_number, template_id, delay_days) in [(1, first.id, 0), (2, second.id, 3)] {
        SequenceRepo::create(
            &pool,
            campaign.id,
            &CreateSequenceStep {
                step_number,
                template_id,
                delay_days,
                condition: Some(json!({"no_response": true})),
            },
        )
        .await
        .unwrap();
    }
    let p = common::prospect(&pool, "jane@example.com", true, json!({})).await;
    let job_id = enqueue_step(&pool, campaign.id, p.id).await;

    let email = Arc::new(RecordingEmail::default());
    let dispatcher = common::dispatcher(&pool, Arc::clone(&email));
    dispatcher.try_dispatch().await.unwrap();

    assert_eq!(email.sent.load(Ordering::SeqCst), 1);
    let sent = email.last.lock().unwrap().clone().unwrap();
    assert_eq!(sent.recipient, "jane@example.com");
    assert_eq!(sent.content, "Hello Jane at Acme");
    assert_eq!(sent.subject.as_deref(), Some("Hi Jane"));

    let log = MessageLogRepo::last_sequence_message(&pool, p.id, campaign.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.step_number, Some(1));
    assert_eq!(log.status_id, MessageStatus::Sent.id());
    assert!(log.sent_at.is_some());

    let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status_id, JobStatus::Completed.id());
    let next_id = job.result.unwrap()["next_job_id"].as_i64().unwrap();
    let next = JobRepo::find_by_id(&pool, next_id).await.unwrap().unwrap();
    assert!(next.scheduled_at > Utc::now() + chrono::Duration::days(2));

    let p = ProspectRepo::find_by_id(&pool, p.id).await.unwrap().unwrap();
    assert_eq!(p.status_id, ProspectStatus::Contacted.id());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn paused_campaign_defers_the_step(pool: PgPool) {
    let t = common::template(&pool, "email", "Hello").await;
    let campaign = common::active_campaign(&pool, t.id).await;
    CampaignRepo::transition(&pool, campaign.id, CampaignStatus::Active, CampaignStatus::Paused)
        .await
        .unwrap()
        .unwrap();
    let p = common::prospect(&pool, "jane@example.com", true, json!({})).await;
    let job_id = enqueue_step(&pool, campaign.id, p.id).await;

    let email = Arc::new(RecordingEmail::default());
    common::dispatcher(&pool, Arc::clone(&email)).try_dispatch().await.unwrap();

    assert_eq!(email.sent.load(Ordering::SeqCst), 0);
    let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status_id, JobStatus::Pending.id());
    assert!(job.scheduled_at > Utc::now() + chrono::Duration::minutes(50));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn long_pause_keeps_delivery_retries(pool: PgPool) {
    let t = common::template(&pool, "reddit", "Hey").await;
    let campaign = common::active_campaign(&pool, t.id).await;
    CampaignRepo::transition(&pool, campaign.id, CampaignStatus::Active, CampaignStatus::Paused)
        .await
        .unwrap()
        .unwrap();
    let p = common::prospect(&pool, "jane@example.com", true, json!({"reddit": "jane"})).await;
    let job_id = enqueue_step(&pool, campaign.id, p.id).await;
    let dispatcher = common::dispatcher(&pool, Arc::new(RecordingEmail::default()));

    for _ in 0..6 {
        assert_eq!(dispatcher.try_dispatch().await.unwrap(), 1);
        sqlx::query("UPDATE jobs SET scheduled_at = NOW() WHERE id = $1")
            .bind(job_id)
            .execute(&pool)
            .await
            .unwrap();
    }
    let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.attempts, 0);

    CampaignRepo::transition(&pool, campaign.id, CampaignStatus::Paused, CampaignStatus::Active)
        .await
        .unwrap()
        .unwrap();
    // No reddit channel is registered, so delivery fails with a retryable error.
    dispatcher.try_dispatch().await.unwrap();

    let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status_id, JobStatus::Pending.id());
    assert_eq!(job.attempts, 1);
    assert!(job.last_error.unwrap().contains("reddit"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn prospects_without_consent_are_skipped(pool: PgPool) {
    let t = common::template(&pool, "email", "Hello").await;
    let campaign = common::active_campaign(&pool, t.id).await;
    let p = common::prospect(&pool, "nope@example.com", false, json!({})).await;
    let job_id = enqueue_step(&pool, campaign.id, p.id).await;

    let email = Arc::new(RecordingEmail::default());
    common::dispatcher(&pool, Arc::clone(&email)).try_dispatch().await.unwrap();

    assert_eq!(email.sent.load(Ordering::SeqCst), 0);
    let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.result.unwrap()["skipped"], "no_consent");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_social_handle_bounces(pool: PgPool) {
    let t = common::template(&pool, "twitter", "Hey {{first_name}}").await;
    let campaign = common::active_campaign(&pool, t.id).await;
    let p = common::prospect(&pool, "jane@example.com", true, json!({})).await;
    enqueue_step(&pool, campaign.id, p.id).await;

    common::dispatcher(&pool, Arc::new(RecordingEmail::default()))
        .try_dispatch()
        .await
        .unwrap();

    let log = MessageLogRepo::last_sequence_message(&pool, p.id, campaign.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.status_id, MessageStatus::Bounced.id());
    assert!(log.sent_at.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unconfigured_channel_is_retried(pool: PgPool) {
    let t = common::template(&pool, "reddit", "Hey").await;
    let campaign = common::active_campaign(&pool, t.id).await;
    let p = common::prospect(&pool, "jane@example.com", true, json!({"reddit": "jane"})).await;
    let job_id = enqueue_step(&pool, campaign.id, p.id).await;

    common::dispatcher(&pool, Arc::new(RecordingEmail::default()))
        .try_dispatch()
        .await
        .unwrap();

    let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status_id, JobStatus::Pending.id());
    assert!(job.last_error.unwrap().contains("reddit"));
    assert!(MessageLogRepo::last_sequence_message(&pool, p.id, campaign.id)
        .await
        .unwrap()
        .is_none());
}
