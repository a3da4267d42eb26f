//! Error types for `vouch-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::check::{CheckStatus, Zone};

#[derive(Debug, Error)]
pub enum Error {
  #[error("client not found: {0}")]
  ClientNotFound(Uuid),

  #[error("case not found: {0}")]
  CaseNotFound(Uuid),

  #[error("check not found: {0}")]
  CheckNotFound(Uuid),

  #[error("verification request not found: {0}")]
  RequestNotFound(Uuid),

  #[error("check {check_id} cannot {action} while {status}")]
  InvalidTransition {
    check_id: Uuid,
    status:   CheckStatus,
    action:   &'static str,
  },

  #[error("check {check_id} has zone {zone}; only a resolved zone can be reassigned")]
  ZoneNotReassignable { check_id: Uuid, zone: Zone },

  #[error("{0} is not a terminal zone")]
  NotATerminalZone(Zone),

  #[error("check {0} was modified concurrently")]
  VersionConflict(Uuid),

  #[error("check {check_id} already has pending request {request_id}")]
  RequestPending { check_id: Uuid, request_id: Uuid },

  #[error("unknown outreach kind: {0:?}")]
  UnknownOutreachKind(String),

  #[error("unknown activity action: {0:?}")]
  UnknownAction(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
