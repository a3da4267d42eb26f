//! Error types for the server crate and its axum `IntoResponse`
//! implementation.

use axum::{
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,

  #[error("spool I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("spool JSON error: {0}")]
  Json(#[from] serde_json::Error),

  /// A sheet file whose layout is not the fixed verification template.
  #[error(transparent)]
  Sheet(#[from] vouch_extract::Error),

  /// A spool entry name that would escape its directory.
  #[error("invalid spool name: {0:?}")]
  InvalidName(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"vouch\""),
        );
        res
      }
      other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()).into_response(),
    }
  }
}
