//! Request handlers, one module per resource.
//!
//! Handlers validate input with `outreach_core::validation`, delegate to
//! the repositories in `outreach_db`, publish domain events on the bus and
//! map errors via [`AppError`](crate::error::AppError).

pub mod ab_tests;
pub mod analytics;
pub mod campaigns;
pub mod conversations;
pub mod discovery;
pub mod messages;
pub mod prospects;
pub mod templates;
pub mod webhooks;
