//! Outreach background worker.
//!
//! - [`jobs::JobDispatcher`]: polls the `jobs` table for prospect scoring
//!   and campaign sequence steps.
//! - [`discovery::DiscoveryRunner`]: feeds discovery jobs through the
//!   [`scheduler::SmartScheduler`] and executes them on the
//!   [`task_manager::TaskManager`].

pub mod config;
pub mod discovery;
pub mod error;
pub mod jobs;
pub mod scheduler;
pub mod task_manager;
