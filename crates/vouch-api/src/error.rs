//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use vouch_engine::{BoxError, EngineError};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The request is well-formed but the check's current state forbids it.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unauthorized")]
  Unauthorized,

  /// Mail transport, mailbox or sheet source failed.
  #[error("upstream error: {0}")]
  Upstream(String),

  #[error("store error: {0}")]
  Store(#[source] BoxError),
}

impl ApiError {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

impl From<EngineError> for ApiError {
  fn from(e: EngineError) -> Self {
    use vouch_core::Error as Core;

    match e {
      EngineError::NotFound { entity, id } => Self::NotFound(format!("{entity} {id} not found")),
      EngineError::Invalid(m) => Self::BadRequest(m),
      EngineError::Core(core) => match core {
        Core::InvalidTransition { .. }
        | Core::ZoneNotReassignable { .. }
        | Core::NotATerminalZone(_)
        | Core::VersionConflict(_)
        | Core::RequestPending { .. } => Self::Conflict(core.to_string()),
        Core::ClientNotFound(_)
        | Core::CaseNotFound(_)
        | Core::CheckNotFound(_)
        | Core::RequestNotFound(_) => Self::NotFound(core.to_string()),
        other => Self::Store(Box::new(other)),
      },
      EngineError::Dispatch(e) | EngineError::Sheet(e) | EngineError::Mailbox(e) => {
        Self::Upstream(e.to_string())
      }
      EngineError::Extract(e) => Self::Upstream(e.to_string()),
      EngineError::Store(e) => Self::Store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_owned()),
      ApiError::Upstream(m) => (StatusCode::BAD_GATEWAY, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    if status.is_server_error() {
      tracing::error!(%status, error = %message, "request failed");
    }

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if matches!(self, ApiError::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"vouch\""),
      );
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;
  use vouch_core::{activity::EntityType, check::CheckStatus};

  use super::*;

  #[test]
  fn engine_errors_map_to_statuses() {
    let cases = [
      (
        EngineError::NotFound { entity: EntityType::Check, id: Uuid::nil() },
        StatusCode::NOT_FOUND,
      ),
      (EngineError::Invalid("empty".into()), StatusCode::BAD_REQUEST),
      (
        EngineError::Core(vouch_core::Error::InvalidTransition {
          check_id: Uuid::nil(),
          status:   CheckStatus::Pending,
          action:   "be reviewed",
        }),
        StatusCode::CONFLICT,
      ),
      (
        EngineError::Core(vouch_core::Error::RequestPending {
          check_id:   Uuid::nil(),
          request_id: Uuid::nil(),
        }),
        StatusCode::CONFLICT,
      ),
      (
        EngineError::Dispatch("relay down".into()),
        StatusCode::BAD_GATEWAY,
      ),
      (
        EngineError::Store("disk full".into()),
        StatusCode::INTERNAL_SERVER_ERROR,
      ),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }

  #[test]
  fn unauthorized_carries_challenge() {
    let res = ApiError::Unauthorized.into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
      "Basic realm=\"vouch\""
    );
  }
}
