//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod ab_test_repo;
pub mod campaign_repo;
pub mod discovered_content_repo;
pub mod event_repo;
pub mod job_repo;
pub mod message_log_repo;
pub mod prospect_repo;
pub mod sequence_repo;
pub mod template_repo;
pub mod webhook_repo;

pub use ab_test_repo::AbTestRepo;
pub use campaign_repo::CampaignRepo;
pub use discovered_content_repo::DiscoveredContentRepo;
pub use event_repo::EventRepo;
pub use job_repo::JobRepo;
pub use message_log_repo::MessageLogRepo;
pub use prospect_repo::ProspectRepo;
pub use sequence_repo::SequenceRepo;
pub use template_repo::TemplateRepo;
pub use webhook_repo::WebhookRepo;
