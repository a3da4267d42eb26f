//! Error type for `vouch-engine`.

use thiserror::Error;
use uuid::Uuid;
use vouch_core::activity::EntityType;

/// A collaborator or store error with its concrete type erased.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("store error: {0}")]
  Store(#[source] BoxError),

  /// The outbound message could not be handed to the mailer.
  #[error("dispatch failed: {0}")]
  Dispatch(#[source] BoxError),

  #[error("sheet source error: {0}")]
  Sheet(#[source] BoxError),

  #[error("mailbox error: {0}")]
  Mailbox(#[source] BoxError),

  #[error(transparent)]
  Core(#[from] vouch_core::Error),

  #[error(transparent)]
  Extract(#[from] vouch_extract::Error),

  #[error("{entity} not found: {id}")]
  NotFound { entity: EntityType, id: Uuid },

  #[error("invalid input: {0}")]
  Invalid(String),
}

impl EngineError {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub(crate) fn not_found(entity: EntityType, id: Uuid) -> Self {
    Self::NotFound { entity, id }
  }

  /// Whether retrying the same operation later could succeed.
  pub fn is_transient(&self) -> bool {
    matches!(
      self,
      Self::Store(_)
        | Self::Dispatch(_)
        | Self::Sheet(_)
        | Self::Mailbox(_)
        | Self::Core(vouch_core::Error::VersionConflict(_))
    )
  }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
