//! Outreach event bus and webhook fan-out.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the domain event envelope, with names in
//!   [`event_types`].
//! - [`EventPersistence`]: background service writing every event to the
//!   `events` table.
//! - [`WebhookDispatcher`]: background service posting signed events to
//!   subscribed external endpoints through [`WebhookDelivery`].

pub mod bus;
pub mod delivery;
pub mod dispatcher;
pub mod persistence;

pub use bus::{event_types, EventBus, PlatformEvent};
pub use delivery::webhook::{WebhookDelivery, WebhookError};
pub use dispatcher::WebhookDispatcher;
pub use persistence::EventPersistence;
