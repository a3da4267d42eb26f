//! The verification engine: lifecycle controller, reminder ladder and the
//! periodic tasks that drive them.
//!
//! Storage and every external system are reached through traits
//! ([`vouch_core::store::VerificationStore`] and the ones in [`collab`]),
//! bundled per deployment by a [`Backend`] implementation.

// Collaborator traits use native `async fn` with explicit `Send` futures.
#![allow(async_fn_in_trait)]

pub mod advisor;
pub mod collab;
pub mod controller;
pub mod error;
pub mod outreach;
pub mod reminders;
pub mod tasks;

mod locks;

pub use advisor::TemplateAdvisor;
pub use controller::{Backend, CheckSpec, Controller, Ingested, OpenedCase, PollReport};
pub use error::{BoxError, EngineError, Result};
pub use reminders::{ReminderPolicy, ReminderScheduler, SweepReport};
