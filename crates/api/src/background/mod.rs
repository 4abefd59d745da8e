//! Periodic background jobs run by the API process.

pub mod conversation_timeouts;
