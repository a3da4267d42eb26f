//! The authenticated supervisor behind a review or zone reassignment.
//!
//! This crate does not authenticate anyone. The embedding server verifies
//! credentials and inserts a [`Supervisor`] into the request extensions; the
//! extractor only reads it back.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// Username of the supervisor making the request. Recorded as the reviewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supervisor(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Supervisor {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Supervisor>()
      .cloned()
      .ok_or(ApiError::Unauthorized)
  }
}
