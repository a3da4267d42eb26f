//! Error type for `vouch-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] vouch_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A text column held a value no enum variant maps to.
  #[error("cannot decode {column}: {value:?}")]
  Decode { column: &'static str, value: String },

  #[error("client not found: {0}")]
  ClientNotFound(uuid::Uuid),

  #[error("case not found: {0}")]
  CaseNotFound(uuid::Uuid),

  #[error("request not found: {0}")]
  RequestNotFound(uuid::Uuid),

  /// The check was changed by another writer since it was read.
  #[error("check {0} was modified concurrently")]
  VersionConflict(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
