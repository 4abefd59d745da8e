//! `sequence_step` jobs: send the next message of a campaign sequence to
//! one prospect and queue the step after it.
//!
//! A campaign without sequence steps sends its own template once, as
//! step 1.

use chrono::{Duration, Utc};
use outreach_channels::{ChannelError, OutboundMessage};
use outreach_core::message::MessageType;
use outreach_core::template::render;
use outreach_core::types::DbId;
use outreach_db::models::ab_test::AbCounter;
use outreach_db::models::campaign::Campaign;
use outreach_db::models::job::{NewJob, SequenceStepPayload, JOB_SEQUENCE_STEP};
use outreach_db::models::message_log::NewMessageLog;
use outreach_db::models::prospect::Prospect;
use outreach_db::models::status::{CampaignStatus, MessageStatus, ProspectStatus};
use outreach_db::repositories::{
    AbTestRepo, CampaignRepo, JobRepo, MessageLogRepo, ProspectRepo, SequenceRepo, TemplateRepo,
};
use outreach_events::{event_types, PlatformEvent};
use rand::Rng;
use serde_json::{json, Value};

use super::{JobContext, JobOutcome};
use crate::error::JobError;

/// Hours a paused campaign's step waits before it is looked at again.
const PAUSED_RECHECK_HOURS: i64 = 1;

/// The step to send now.
#[derive(Debug, Clone, PartialEq)]
struct PlannedStep {
    step_number: i32,
    template_id: DbId,
}

pub async fn run(ctx: &JobContext, payload: SequenceStepPayload) -> Result<JobOutcome, JobError> {
    let pool = &ctx.pool;
    let Some(prospect) = ProspectRepo::find_by_id(pool, payload.prospect_id).await? else {
        return Ok(JobOutcome::skipped("prospect_not_found"));
    };
    if !prospect.consent_given {
        return Ok(JobOutcome::skipped("no_consent"));
    }
    let Some(campaign) = CampaignRepo::find_by_id(pool, payload.campaign_id).await? else {
        return Ok(JobOutcome::skipped("campaign_not_found"));
    };
    match CampaignStatus::from_id(campaign.status_id) {
        Some(CampaignStatus::Active) => {}
        Some(CampaignStatus::Paused) => {
            return Ok(JobOutcome::Retry {
                at: Utc::now() + Duration::hours(PAUSED_RECHECK_HOURS),
                reason: "campaign paused".to_string(),
            });
        }
        _ => return Ok(JobOutcome::skipped("campaign_inactive")),
    }

    let last = MessageLogRepo::last_sequence_message(pool, prospect.id, campaign.id).await?;
    let after = last.as_ref().and_then(|m| m.step_number).unwrap_or(0);
    let step = SequenceRepo::next_step(pool, campaign.id, after).await?;

    let planned = match &step {
        Some(step) => {
            if step.requires_no_response()
                && MessageLogRepo::has_reply(pool, prospect.id, campaign.id).await?
            {
                return Ok(JobOutcome::skipped("prospect_replied"));
            }
            if let Some(sent_at) = last.as_ref().and_then(|m| m.sent_at) {
                let due = sent_at + Duration::days(step.delay_days.into());
                if Utc::now() < due {
                    return Ok(JobOutcome::Retry {
                        at: due,
                        reason: format!("step {} not due", step.step_number),
                    });
                }
            }
            PlannedStep { step_number: step.step_number, template_id: step.template_id }
        }
        None if after == 0 => PlannedStep { step_number: 1, template_id: campaign.template_id },
        None => return Ok(JobOutcome::skipped("sequence_complete")),
    };

    let (template_id, variant) = choose_variant(ctx, &campaign, planned.template_id).await?;
    let template = TemplateRepo::find_by_id(pool, template_id)
        .await?
        .filter(|t| t.is_active)
        .ok_or(JobError::Missing { entity: "template", id: template_id })?;
    let message_type: MessageType = template
        .message_type
        .parse()
        .map_err(|_| JobError::Missing { entity: "channel for template", id: template.id })?;

    let context = prospect.template_context();
    let content = render(&template.content, &context);
    let subject = template.subject.as_deref().map(|s| render(s, &context));

    let delivery = match recipient(&prospect, message_type) {
        Some(recipient) => {
            let message = OutboundMessage {
                message_type,
                recipient,
                subject: subject.clone(),
                content: content.clone(),
            };
            ctx.channels.send(&message).await
        }
        None => Err(ChannelError::InvalidRecipient(format!(
            "prospect {} has no {} address",
            prospect.id, message_type
        ))),
    };

    let (status, metadata) = match delivery {
        Ok(receipt) => (
            MessageStatus::Sent,
            json!({ "provider_message_id": receipt.provider_message_id }),
        ),
        Err(e) if e.is_permanent() => {
            tracing::warn!(prospect_id = prospect.id, error = %e, "Message bounced");
            (MessageStatus::Bounced, json!({ "error": e.to_string() }))
        }
        Err(e) => return Err(e.into()),
    };

    let log = MessageLogRepo::create(
        pool,
        &NewMessageLog {
            prospect_id: prospect.id,
            campaign_id: Some(campaign.id),
            template_id: Some(template.id),
            message_type: message_type.as_str().to_string(),
            subject,
            content,
            step_number: Some(planned.step_number),
            status_id: status.id(),
            ab_test_variant: variant.clone(),
            metadata,
        },
    )
    .await?;

    if status == MessageStatus::Sent {
        if let Some(variant) = &variant {
            AbTestRepo::increment_for_campaign(pool, campaign.id, variant, AbCounter::Sent).await?;
        }
        if matches!(
            ProspectStatus::from_id(prospect.status_id),
            Some(ProspectStatus::New | ProspectStatus::Qualified)
        ) {
            ProspectRepo::update_status(pool, prospect.id, ProspectStatus::Contacted).await?;
        }
        ctx.bus.publish(
            PlatformEvent::new(event_types::MESSAGE_SENT)
                .with_source("message_log", log.id)
                .with_payload(json!({
                    "prospect_id": prospect.id,
                    "campaign_id": campaign.id,
                    "step_number": planned.step_number,
                    "message_type": message_type.as_str(),
                })),
        );
    }
    tracing::info!(
        prospect_id = prospect.id,
        campaign_id = campaign.id,
        step_number = planned.step_number,
        status = status.name(),
        "Sequence step processed",
    );

    let next_job = match SequenceRepo::next_step(pool, campaign.id, planned.step_number).await? {
        Some(next) if status == MessageStatus::Sent => {
            let at = Utc::now() + Duration::days(next.delay_days.into());
            let job = JobRepo::enqueue(
                pool,
                &NewJob::new(
                    JOB_SEQUENCE_STEP,
                    SequenceStepPayload { campaign_id: campaign.id, prospect_id: prospect.id },
                )?
                .scheduled_at(at),
            )
            .await?;
            Some(job.id)
        }
        _ => None,
    };

    Ok(JobOutcome::Done(json!({
        "message_log_id": log.id,
        "step_number": planned.step_number,
        "status": status.name(),
        "ab_test_variant": variant,
        "next_job_id": next_job,
    })))
}

/// Pick an A/B variant uniformly at random when the campaign has an active
/// test. Returns the template to send and the variant id.
async fn choose_variant(
    ctx: &JobContext,
    campaign: &Campaign,
    default_template: DbId,
) -> Result<(DbId, Option<String>), JobError> {
    let Some(test) = AbTestRepo::find_active_for_campaign(&ctx.pool, campaign.id).await? else {
        return Ok((default_template, None));
    };
    let variants = test.parsed_variants();
    if variants.is_empty() {
        return Ok((default_template, None));
    }
    let chosen = &variants[rand::rng().random_range(0..variants.len())];
    Ok((chosen.template_id, Some(chosen.variant_id.clone())))
}

/// Where a message of `message_type` goes for this prospect: the email
/// address, or the handle stored under the type's name in
/// `social_profiles`.
pub fn recipient(prospect: &Prospect, message_type: MessageType) -> Option<String> {
    match message_type {
        MessageType::Email => Some(prospect.email.clone()),
        other => prospect
            .social_profiles
            .get(other.as_str())
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prospect(social_profiles: Value) -> Prospect {
        Prospect {
            id: 1,
            email: "jane@example.com".to_string(),
            first_name: None,
            last_name: None,
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
    fn email_goes_to_the_address() {
        let p = prospect(json!({}));
        assert_eq!(recipient(&p, MessageType::Email).as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn social_types_use_stored_handles() {
        let p = prospect(json!({"twitter": " 12345 ", "reddit": ""}));
        assert_eq!(recipient(&p, MessageType::Twitter).as_deref(), Some("12345"));
        assert_eq!(recipient(&p, MessageType::Reddit), None);
        assert_eq!(recipient(&p, MessageType::Linkedin), None);
    }
}
