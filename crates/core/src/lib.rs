//! Pure domain logic for the outreach platform.
//!
//! Nothing in this crate performs I/O: scraped-data envelopes, task and
//! conversation state machines, validation rules, scoring helpers,
//! template rendering and webhook signing all live here so the database,
//! API and worker crates can share them.

pub mod analytics;
pub mod conversation;
pub mod data_object;
pub mod error;
pub mod message;
pub mod platform;
pub mod responses;
pub mod scoring;
pub mod signing;
pub mod task;
pub mod template;
pub mod types;
pub mod validation;
