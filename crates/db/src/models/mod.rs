//! Database models and request DTOs, one module per table group.

pub mod ab_test;
pub mod campaign;
pub mod discovered_content;
pub mod event;
pub mod job;
pub mod message_log;
pub mod prospect;
pub mod sequence;
pub mod status;
pub mod template;
pub mod webhook;
