//! Shared fixtures for worker integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use outreach_channels::{
    ChannelError, ChannelRegistry, DeliveryChannel, DeliveryReceipt, OutboundMessage, RateLimiter,
};
use outreach_core::message::MessageType;
use outreach_db::models::campaign::{Campaign, TargetCriteria};
use outreach_db::models::prospect::{CreateProspect, Prospect};
use outreach_db::models::status::CampaignStatus;
use outreach_db::models::template::{CreateTemplate, MessageTemplate};
use outreach_db::repositories::{CampaignRepo, ProspectRepo, TemplateRepo};
use outreach_events::EventBus;
use outreach_pipeline::DiscoveryPipeline;
use outreach_worker::jobs::{JobContext, JobDispatcher};
use sqlx::PgPool;

/// Email channel that records what it was asked to send.
#[derive(Default)]
pub struct RecordingEmail {
    pub sent: AtomicUsize,
    pub last: std::sync::Mutex<Option<OutboundMessage>>,
}

#[async_trait]
impl DeliveryChannel for RecordingEmail {
    fn message_type(&self) -> MessageType {
        MessageType::Email
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, ChannelError> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(message.clone());
        Ok(DeliveryReceipt::new(MessageType::Email, Some("sg-1".to_string())))
    }
}

pub fn dispatcher(pool: &PgPool, email: Arc<RecordingEmail>) -> JobDispatcher {
    let mut registry = ChannelRegistry::new(Arc::new(RateLimiter::default()));
    registry.register(email);
    JobDispatcher::new(
        Arc::new(JobContext {
            pool: pool.clone(),
            channels: Arc::new(registry),
            bus: Arc::new(EventBus::default()),
            pipeline: DiscoveryPipeline::new(),
        }),
        Duration::from_millis(10),
    )
}

pub async fn prospect(
    pool: &PgPool,
    email: &str,
    consent: bool,
    social: serde_json::Value,
) -> Prospect {
    ProspectRepo::create(
        pool,
        &CreateProspect {
            email: email.to_string(),
            first_name: Some("Jane".to_string()),
            last_name: None,
            company: Some("Acme".to_string()),
            website: None,
            lead_source: None,
            consent_given: consent,
            social_profiles: Some(social),
        },
    )
    .await
    .unwrap()
}

pub async fn template(pool: &PgPool, message_type: &str, content: &str) -> MessageTemplate {
    TemplateRepo::create(
        pool,
        &CreateTemplate {
            name: format!("{message_type} template"),
            message_type: message_type.to_string(),
            subject: Some("Hi {{first_name}}".to_string()),
            content: content.to_string(),
        },
    )
    .await
    .unwrap()
}

pub async fn active_campaign(pool: &PgPool, template_id: i64) -> Campaign {
    let campaign = CampaignRepo::create(pool, "Spring", template_id, &TargetCriteria::default())
        .await
        .unwrap();
    CampaignRepo::transition(pool, campaign.id, CampaignStatus::Draft, CampaignStatus::Active)
        .await
        .unwrap()
        .unwrap()
}
