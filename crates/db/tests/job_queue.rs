//! Job queue claiming order and lifecycle.

use chrono::{Duration, Utc};
use outreach_db::models::job::{NewJob, ScoreProspectPayload, JOB_DISCOVERY, JOB_SCORE_PROSPECT};
use outreach_db::models::status::JobStatus;
use outreach_db::repositories::JobRepo;
use sqlx::PgPool;

fn score_job(prospect_id: i64, priority: i16) -> NewJob {
    NewJob::new(JOB_SCORE_PROSPECT, ScoreProspectPayload { prospect_id })
        .unwrap()
        .with_priority(priority)
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn claims_highest_priority_first(pool: PgPool) {
    let low = JobRepo::enqueue(&pool, &score_job(1, 1)).await.unwrap();
    let high = JobRepo::enqueue(&pool, &score_job(2, 4)).await.unwrap();

    let types = [JOB_SCORE_PROSPECT];
    let first = JobRepo::claim_next(&pool, &types).await.unwrap().unwrap();
    assert_eq!(first.id, high.id);
    assert_eq!(first.status_id, JobStatus::Running.id());
    assert_eq!(first.attempts, 1);

    let second = JobRepo::claim_next(&pool, &types).await.unwrap().unwrap();
    assert_eq!(second.id, low.id);

    assert!(JobRepo::claim_next(&pool, &types).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn future_and_foreign_jobs_are_not_claimed(pool: PgPool) {
    let later = score_job(1, 2).scheduled_at(Utc::now() + Duration::hours(1));
    JobRepo::enqueue(&pool, &later).await.unwrap();

    assert!(JobRepo::claim_next(&pool, &[JOB_SCORE_PROSPECT]).await.unwrap().is_none());

    JobRepo::enqueue(&pool, &score_job(2, 2)).await.unwrap();
    assert!(JobRepo::claim_next(&pool, &[JOB_DISCOVERY]).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reschedule_and_complete(pool: PgPool) {
    let job = JobRepo::enqueue(&pool, &score_job(1, 2)).await.unwrap();
    let claimed = JobRepo::claim_next(&pool, &[JOB_SCORE_PROSPECT]).await.unwrap().unwrap();

    JobRepo::reschedule(&pool, claimed.id, Utc::now() - Duration::seconds(1), Some("busy"))
        .await
        .unwrap();
    let again = JobRepo::claim_next(&pool, &[JOB_SCORE_PROSPECT]).await.unwrap().unwrap();
    assert_eq!(again.id, job.id);
    assert_eq!(again.attempts, 2);
    assert_eq!(again.last_error.as_deref(), Some("busy"));

    JobRepo::complete(&pool, job.id, &serde_json::json!({"score": 72}))
        .await
        .unwrap();
    let done = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(done.status_id, JobStatus::Completed.id());
    assert!(done.completed_at.is_some());
    assert_eq!(JobRepo::completed_ids(&pool, &[job.id]).await.unwrap(), vec![job.id]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deferred_claims_are_not_attempts(pool: PgPool) {
    let job = JobRepo::enqueue(&pool, &score_job(1, 2)).await.unwrap();

    for _ in 0..5 {
        let claimed = JobRepo::claim_next(&pool, &[JOB_SCORE_PROSPECT]).await.unwrap().unwrap();
        assert_eq!(claimed.attempts, 1);
        JobRepo::defer(&pool, claimed.id, Utc::now() - Duration::seconds(1), "not yet")
            .await
            .unwrap();
    }

    let row = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(row.status_id, JobStatus::Pending.id());
    assert_eq!(row.attempts, 0);
    assert_eq!(row.last_error.as_deref(), Some("not yet"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelled_job_stays_cancelled(pool: PgPool) {
    let job = JobRepo::enqueue(&pool, &score_job(1, 2)).await.unwrap();
    JobRepo::claim_next(&pool, &[JOB_SCORE_PROSPECT]).await.unwrap().unwrap();

    assert!(JobRepo::cancel(&pool, job.id).await.unwrap());
    assert!(!JobRepo::complete(&pool, job.id, &serde_json::json!({})).await.unwrap());
    assert!(!JobRepo::cancel(&pool, job.id).await.unwrap());

    let row = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(row.status_id, JobStatus::Cancelled.id());
    assert_eq!(JobRepo::cancelled_ids(&pool, &[job.id, 999]).await.unwrap(), vec![job.id]);
}
