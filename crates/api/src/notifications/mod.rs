//! Team notifications driven by the event bus.
//!
//! The [`ReplyNotifier`] subscribes to the event bus and posts a Slack
//! alert for every prospect reply.

pub mod reply_notifier;

pub use reply_notifier::ReplyNotifier;
