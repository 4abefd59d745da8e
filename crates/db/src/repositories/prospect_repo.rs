//! Repository for the `affiliate_prospects` table.
//!
//! Soft-deleted (GDPR-redacted) rows are invisible to every read here.

use outreach_core::scoring::clamp_qualification_score;
use outreach_core::types::DbId;
use sqlx::PgPool;

use crate::models::prospect::{CreateProspect, Prospect, UpdateProspect};
use crate::models::status::{ProspectStatus, StatusId};

/// Column list for `affiliate_prospects` queries.
const COLUMNS: &str = "\
    id, email, first_name, last_name, company, website, lead_source, \
    consent_given, consent_timestamp, qualification_score, status_id, \
    social_profiles, created_at, updated_at";

pub struct ProspectRepo;

impl ProspectRepo {
    /// Insert a prospect. `input.email` must already be normalized.
    ///
    /// A duplicate email violates `uq_affiliate_prospects_email`.
    pub async fn create(pool: &PgPool, input: &CreateProspect) -> Result<Prospect, sqlx::Error> {
        let query = format!(
            "INSERT INTO affiliate_prospects \
                (email, first_name, last_name, company, website, lead_source, \
                 consent_given, consent_timestamp, social_profiles) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, \
                     CASE WHEN $7 THEN NOW() ELSE NULL END, \
                     COALESCE($8, '{{}}'::jsonb)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Prospect>(&query)
            .bind(&input.email)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.company)
            .bind(&input.website)
            .bind(&input.lead_source)
            .bind(input.consent_given)
            .bind(&input.social_profiles)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Prospect>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM affiliate_prospects WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, Prospect>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List prospects newest-first, optionally filtered by status and
    /// minimum qualification score.
    pub async fn list(
        pool: &PgPool,
        status_id: Option<StatusId>,
        min_score: Option<i16>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Prospect>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM affiliate_prospects \
             WHERE deleted_at IS NULL \
               AND ($1::SMALLINT IS NULL OR status_id = $1) \
               AND ($2::SMALLINT IS NULL OR qualification_score >= $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Prospect>(&query)
            .bind(status_id)
            .bind(min_score)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Partial update; `None` fields keep their current value.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProspect,
        status_id: Option<StatusId>,
    ) -> Result<Option<Prospect>, sqlx::Error> {
        let query = format!(
            "UPDATE affiliate_prospects SET \
                first_name = COALESCE($2, first_name), \
                last_name = COALESCE($3, last_name), \
                company = COALESCE($4, company), \
                website = COALESCE($5, website), \
                lead_source = COALESCE($6, lead_source), \
                status_id = COALESCE($7, status_id), \
                social_profiles = COALESCE($8, social_profiles) \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Prospect>(&query)
            .bind(id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.company)
            .bind(&input.website)
            .bind(&input.lead_source)
            .bind(status_id)
            .bind(&input.social_profiles)
            .fetch_optional(pool)
            .await
    }

    /// Record consent. The timestamp is stamped when consent turns on and
    /// cleared when it is revoked.
    pub async fn set_consent(
        pool: &PgPool,
        id: DbId,
        consent_given: bool,
    ) -> Result<Option<Prospect>, sqlx::Error> {
        let query = format!(
            "UPDATE affiliate_prospects SET \
                consent_timestamp = CASE \
                    WHEN $2 AND NOT consent_given THEN NOW() \
                    WHEN $2 THEN consent_timestamp \
                    ELSE NULL END, \
                consent_given = $2 \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Prospect>(&query)
            .bind(id)
            .bind(consent_given)
            .fetch_optional(pool)
            .await
    }

    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: ProspectStatus,
    ) -> Result<Option<Prospect>, sqlx::Error> {
        let query = format!(
            "UPDATE affiliate_prospects SET status_id = $2 \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Prospect>(&query)
            .bind(id)
            .bind(status.id())
            .fetch_optional(pool)
            .await
    }

    /// Set the status of many prospects. Returns the number updated;
    /// unknown or deleted ids are skipped.
    pub async fn bulk_update_status(
        pool: &PgPool,
        ids: &[DbId],
        status: ProspectStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE affiliate_prospects SET status_id = $2 \
             WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(ids)
        .bind(status.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Revoke consent and mark the prospect declined.
    pub async fn unsubscribe(pool: &PgPool, id: DbId) -> Result<Option<Prospect>, sqlx::Error> {
        let query = format!(
            "UPDATE affiliate_prospects SET \
                consent_given = FALSE, consent_timestamp = NULL, status_id = $2 \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Prospect>(&query)
            .bind(id)
            .bind(ProspectStatus::Declined.id())
            .fetch_optional(pool)
            .await
    }

    /// GDPR erasure: soft-delete and strip personal data.
    ///
    /// The email is replaced by a unique placeholder so the unique
    /// constraint still holds and the address can be registered again.
    pub async fn redact(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE affiliate_prospects SET \
                email = 'deleted-' || id || '@redacted.invalid', \
                first_name = NULL, last_name = NULL, company = NULL, website = NULL, \
                social_profiles = '{}'::jsonb, \
                consent_given = FALSE, consent_timestamp = NULL, \
                deleted_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store a qualification score, clamped to `0..=100`.
    pub async fn update_score(pool: &PgPool, id: DbId, score: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE affiliate_prospects SET qualification_score = $2 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(clamp_qualification_score(score))
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Prospects a campaign may contact: consenting, not deleted, and
    /// scoring at least `min_score`.
    pub async fn list_campaign_targets(
        pool: &PgPool,
        min_score: i16,
    ) -> Result<Vec<Prospect>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM affiliate_prospects \
             WHERE deleted_at IS NULL AND consent_given \
               AND qualification_score >= $1 \
             ORDER BY qualification_score DESC, id ASC"
        );
        sqlx::query_as::<_, Prospect>(&query)
            .bind(min_score)
            .fetch_all(pool)
            .await
    }
}
