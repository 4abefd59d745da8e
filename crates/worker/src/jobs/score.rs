//! `score_prospect` jobs: run a prospect's scraped profile through the
//! discovery pipeline and store the qualification score.
//!
//! Scraped sections (`basic_info`, `content`, `engagement`, `network`)
//! live at the top level of `social_profiles`, next to the per-channel
//! handles. A prospect without any scraped section keeps its score.

use outreach_core::data_object::{DataObject, JsonMap};
use outreach_core::platform::Platform;
use outreach_db::models::job::ScoreProspectPayload;
use outreach_db::models::prospect::Prospect;
use outreach_db::repositories::ProspectRepo;
use outreach_events::{event_types, PlatformEvent};
use outreach_pipeline::{BASIC_INFO, CONTENT, ENGAGEMENT, NETWORK};
use serde_json::{json, Value};

use super::{JobContext, JobOutcome};
use crate::error::JobError;

pub async fn run(ctx: &JobContext, payload: ScoreProspectPayload) -> Result<JobOutcome, JobError> {
    let Some(prospect) = ProspectRepo::find_by_id(&ctx.pool, payload.prospect_id).await? else {
        return Ok(JobOutcome::skipped("prospect_not_found"));
    };
    let Some(object) = profile_object(&prospect) else {
        return Ok(JobOutcome::skipped("no_profile_data"));
    };

    let report = match ctx.pipeline.process(object) {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!(prospect_id = prospect.id, error = %e, "Profile rejected by pipeline");
            return Ok(JobOutcome::Done(json!({ "skipped": "invalid_profile", "error": e })));
        }
    };
    let Some(score) = report.score else {
        return Ok(JobOutcome::Done(json!({
            "skipped": "scoring_failed",
            "errors": report.stage_errors,
        })));
    };

    ProspectRepo::update_score(&ctx.pool, prospect.id, score.qualification_score.into()).await?;
    tracing::info!(
        prospect_id = prospect.id,
        qualification_score = score.qualification_score,
        "Prospect scored",
    );
    ctx.bus.publish(
        PlatformEvent::new(event_types::PROSPECT_UPDATED)
            .with_source("prospect", prospect.id)
            .with_payload(json!({
                "qualification_score": score.qualification_score,
                "composite_score": score.composite_score,
            })),
    );

    Ok(JobOutcome::Done(json!({
        "prospect_id": prospect.id,
        "qualification_score": score.qualification_score,
        "composite_score": score.composite_score,
        "dimensions": score.dimensions,
        "validation_errors": report.validation.error_count(),
    })))
}

/// The prospect's scraped profile as a pipeline input, or `None` when no
/// section was scraped. Missing `basic_info` fields are filled from the
/// prospect record.
pub fn profile_object(prospect: &Prospect) -> Option<DataObject> {
    let profiles = prospect.social_profiles.as_object()?;
    let mut data: JsonMap = [BASIC_INFO, CONTENT, ENGAGEMENT, NETWORK]
        .into_iter()
        .filter_map(|key| profiles.get(key).map(|v| (key.to_string(), v.clone())))
        .collect();
    if data.is_empty() {
        return None;
    }

    if let Some(Value::Object(info)) = data.get_mut(BASIC_INFO) {
        let name = [&prospect.first_name, &prospect.last_name]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        let known = [
            ("name", Some(name).filter(|n| !n.is_empty())),
            ("email", Some(prospect.email.clone())),
            ("website", prospect.website.clone()),
        ];
        for (key, value) in known {
            if let Some(value) = value {
                info.entry(key).or_insert(Value::String(value));
            }
        }
    }

    let platform = profiles
        .get("platform")
        .and_then(Value::as_str)
        .map_or(Platform::Generic, Platform::from_name_or_generic);
    let url = prospect
        .website
        .clone()
        .unwrap_or_else(|| format!("prospect:{}", prospect.id));
    Some(DataObject::with_data(platform, url, data))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn prospect(social_profiles: Value) -> Prospect {
        Prospect {
            id: 7,
            email: "jane@example.com".to_string(),
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            company: None,
            website: None,
            lead_source: None,
            consent_given: true,
            consent_timestamp: None,
            qualification_score: 50,
            status_id: 1,
            social_profiles,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn handles_alone_are_not_a_profile() {
        assert!(profile_object(&prospect(json!({"twitter": "12345"}))).is_none());
        assert!(profile_object(&prospect(json!([]))).is_none());
    }

    #[test]
    fn basic_info_is_completed_from_the_record() {
        let object = profile_object(&prospect(json!({
            "platform": "twitter",
            "basic_info": {"username": "jane", "bio": "Writer"},
            "engagement": {"followers": 10}
        })))
        .expect("profile");

        assert_eq!(object.platform, Platform::Twitter);
        assert_eq!(object.url, "prospect:7");
        let info = object.section(BASIC_INFO).expect("basic_info");
        assert_eq!(info["name"], "Jane Doe");
        assert_eq!(info["email"], "jane@example.com");
        assert_eq!(info["username"], "jane");
        assert!(object.section(ENGAGEMENT).is_some());
        assert!(!object.data.contains_key("platform"));
    }

    #[test]
    fn scraped_values_win_over_the_record() {
        let object = profile_object(&prospect(json!({
            "basic_info": {"name": "J. Doe"}
        })))
        .expect("profile");
        assert_eq!(object.section(BASIC_INFO).expect("basic_info")["name"], "J. Doe");
        assert_eq!(object.platform, Platform::Generic);
    }
}
