//! Core types, the check state machine, the comparator and the store trait
//! for Vouch, an employment-verification engine.
//!
//! This crate is deliberately free of HTTP, database and mail dependencies.
//! All other crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod activity;
pub mod case;
pub mod check;
pub mod clock;
pub mod compare;
pub mod error;
pub mod fact;
pub mod lifecycle;
pub mod request;
pub mod rules;
pub mod store;

pub use error::{Error, Result};
