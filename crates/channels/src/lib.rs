//! Outbound integrations: per-platform rate limiting, message delivery
//! channels, the Slack notifier and the scraping profile source.

pub mod channel;
pub mod config;
pub mod email;
pub mod error;
pub mod profile_source;
pub mod rate_limiter;
pub mod registry;
pub mod retry;
pub mod slack;
pub mod social;

pub use channel::{DeliveryChannel, DeliveryReceipt, OutboundMessage};
pub use config::{ChannelConfig, SmtpConfig};
pub use email::EmailChannel;
pub use error::ChannelError;
pub use profile_source::{HttpProfileSource, ProfileSource};
pub use rate_limiter::{
    LimitUpdate, RateLimitStatus, RateLimiter, RateLimits, RatePermit, Throttled, WindowCounts,
};
pub use registry::ChannelRegistry;
pub use retry::RetryingClient;
pub use slack::{ReplyAlert, SlackNotifier};
pub use social::{LinkedInChannel, RedditChannel, TwitterChannel};
