//! Outbound delivery of platform events to external systems.

pub mod webhook;
