//! The `VerificationStore` trait.
//!
//! Implemented by storage backends (e.g. `vouch-store-sqlite`). The engine
//! and API depend on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  activity::{ActivityLogEntry, EntityType, NewActivity},
  case::{Case, Client, NewCase},
  check::{Check, NewCheck},
  request::{NewRequest, OutreachEvent, RequestStatus, VerificationRequest},
};

/// Abstraction over a verification store backend.
///
/// Activity entries and outreach events are append-only. A check is written
/// whole by [`save_check`](VerificationStore::save_check), so status, score
/// and zone always change together.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait VerificationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Clients ───────────────────────────────────────────────────────────

  fn add_client(
    &self,
    name: String,
    tier: String,
  ) -> impl Future<Output = Result<Client, Self::Error>> + Send + '_;

  fn get_client(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Client>, Self::Error>> + Send + '_;

  fn list_clients(
    &self,
  ) -> impl Future<Output = Result<Vec<Client>, Self::Error>> + Send + '_;

  /// Change a client's service tier. The only mutable client attribute.
  fn set_client_tier(
    &self,
    id: Uuid,
    tier: String,
  ) -> impl Future<Output = Result<Client, Self::Error>> + Send + '_;

  // ── Cases ─────────────────────────────────────────────────────────────

  fn add_case(
    &self,
    input: NewCase,
  ) -> impl Future<Output = Result<Case, Self::Error>> + Send + '_;

  fn get_case(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Case>, Self::Error>> + Send + '_;

  /// List cases, optionally restricted to one client.
  fn list_cases(
    &self,
    client_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Case>, Self::Error>> + Send + '_;

  /// Persist a case's aggregate status and risk level.
  fn save_case<'a>(
    &'a self,
    case: &'a Case,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Checks ────────────────────────────────────────────────────────────

  fn add_check(
    &self,
    input: NewCheck,
  ) -> impl Future<Output = Result<Check, Self::Error>> + Send + '_;

  fn get_check(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Check>, Self::Error>> + Send + '_;

  fn list_checks(
    &self,
    case_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Check>, Self::Error>> + Send + '_;

  /// Write every mutable column of `check` in one statement, provided the
  /// stored version still equals `check.version`. Returns the check with its
  /// bumped version, or a version-conflict error.
  fn save_check<'a>(
    &'a self,
    check: &'a Check,
  ) -> impl Future<Output = Result<Check, Self::Error>> + Send + 'a;

  // ── Verification requests ─────────────────────────────────────────────

  fn add_request(
    &self,
    input: NewRequest,
  ) -> impl Future<Output = Result<VerificationRequest, Self::Error>> + Send + '_;

  fn get_request(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<VerificationRequest>, Self::Error>> + Send + '_;

  /// The most recently created request for a check, if any.
  fn request_for_check(
    &self,
    check_id: Uuid,
  ) -> impl Future<Output = Result<Option<VerificationRequest>, Self::Error>> + Send + '_;

  fn list_requests(
    &self,
    status: Option<RequestStatus>,
  ) -> impl Future<Output = Result<Vec<VerificationRequest>, Self::Error>> + Send + '_;

  /// Append an outreach event. Returns `false` without writing if an event of
  /// the same kind is already recorded for the request.
  fn append_event(
    &self,
    request_id: Uuid,
    event: OutreachEvent,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn set_request_status(
    &self,
    request_id: Uuid,
    status: RequestStatus,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Activity log ──────────────────────────────────────────────────────

  /// Append an entry. `recorded_at` is set by the store.
  fn append_activity(
    &self,
    input: NewActivity,
  ) -> impl Future<Output = Result<ActivityLogEntry, Self::Error>> + Send + '_;

  /// Entries for one entity type, optionally one entity, oldest first.
  fn list_activity(
    &self,
    entity_type: EntityType,
    entity_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<ActivityLogEntry>, Self::Error>> + Send + '_;
}
