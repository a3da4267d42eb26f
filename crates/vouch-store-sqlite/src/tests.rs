//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::Utc;
use uuid::Uuid;
use vouch_core::{
  activity::{ActivityAction, EntityType, NewActivity},
  case::{CaseStatus, NewCase},
  check::{CheckStatus, CheckType, NewCheck, Zone},
  fact::{FactField, FactRecord},
  lifecycle::CheckUpdate,
  request::{NewRequest, OutreachEvent, OutreachKind, RequestStatus, ResponseChannel},
  store::VerificationStore,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn claimed() -> FactRecord {
  let mut f = FactRecord::default();
  f.set(FactField::EmployeeName, "Jane Doe");
  f.set(FactField::Salary, "10 LPA");
  f
}

/// A client, a case and one employment check.
async fn seeded(s: &SqliteStore) -> (Uuid, Uuid, Uuid) {
  let client = s.add_client("Acme".into(), "standard".into()).await.unwrap();
  let case = s
    .add_case(NewCase { client_id: client.client_id, employee_name: "Jane Doe".into() })
    .await
    .unwrap();
  let check = s
    .add_check(NewCheck {
      case_id:    case.case_id,
      check_type: CheckType::Employment,
      claimed:    claimed(),
    })
    .await
    .unwrap();
  (client.client_id, case.case_id, check.check_id)
}

// ─── Clients and cases ───────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_client() {
  let s = store().await;
  let client = s.add_client("Acme".into(), "premium".into()).await.unwrap();

  let fetched = s.get_client(client.client_id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "Acme");
  assert_eq!(fetched.tier, "premium");
  assert!(s.get_client(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn tier_change_persists() {
  let s = store().await;
  let client = s.add_client("Acme".into(), "standard".into()).await.unwrap();

  let updated = s
    .set_client_tier(client.client_id, "premium".into())
    .await
    .unwrap();
  assert_eq!(updated.tier, "premium");

  let err = s.set_client_tier(Uuid::new_v4(), "x".into()).await.unwrap_err();
  assert!(matches!(err, Error::ClientNotFound(_)));
}

#[tokio::test]
async fn case_requires_client() {
  let s = store().await;
  let err = s
    .add_case(NewCase { client_id: Uuid::new_v4(), employee_name: "X".into() })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ClientNotFound(_)));
}

#[tokio::test]
async fn list_cases_filters_by_client() {
  let s = store().await;
  let (client_id, _, _) = seeded(&s).await;
  let other = s.add_client("Other".into(), "standard".into()).await.unwrap();
  s.add_case(NewCase { client_id: other.client_id, employee_name: "Y".into() })
    .await
    .unwrap();

  assert_eq!(s.list_cases(None).await.unwrap().len(), 2);
  let mine = s.list_cases(Some(client_id)).await.unwrap();
  assert_eq!(mine.len(), 1);
  assert_eq!(mine[0].employee_name, "Jane Doe");
}

#[tokio::test]
async fn save_case_updates_aggregate() {
  let s = store().await;
  let (_, case_id, _) = seeded(&s).await;

  let mut case = s.get_case(case_id).await.unwrap().unwrap();
  assert_eq!(case.status, CaseStatus::Open);
  case.status = CaseStatus::AwaitingReview;
  case.risk_level = Some(Zone::Yellow);
  s.save_case(&case).await.unwrap();

  let fetched = s.get_case(case_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, CaseStatus::AwaitingReview);
  assert_eq!(fetched.risk_level, Some(Zone::Yellow));
}

// ─── Checks ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn check_round_trips_every_column() {
  let s = store().await;
  let (_, case_id, check_id) = seeded(&s).await;

  let check = s.get_check(check_id).await.unwrap().unwrap();
  assert_eq!(check.status, CheckStatus::Pending);
  assert_eq!(check.zone, Zone::Unset);
  assert_eq!(check.claimed, claimed());
  assert_eq!(check.version, 0);

  let mut verified = FactRecord::default();
  verified.set(FactField::Salary, "11.2 LPA");
  let started = check.apply(CheckUpdate::Start, Utc::now()).unwrap();
  let started = s.save_check(&started).await.unwrap();
  let result = vouch_core::compare::compare(
    &started.claimed,
    &verified,
    &vouch_core::rules::RuleConfig::default(),
  );
  let resolved = started
    .apply(
      CheckUpdate::RecordResponse { verified: Some(verified.clone()), note: None },
      Utc::now(),
    )
    .unwrap()
    .apply(CheckUpdate::Resolve { result, summary: Some("ok".into()) }, Utc::now())
    .unwrap();
  s.save_check(&resolved).await.unwrap();

  let fetched = s.get_check(check_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, CheckStatus::Completed);
  assert_eq!(fetched.zone, Zone::Green);
  assert_eq!(fetched.risk_score, Some(20));
  assert_eq!(fetched.discrepancies.len(), 1);
  assert_eq!(fetched.verified, Some(verified));
  assert_eq!(fetched.summary.as_deref(), Some("ok"));
  assert!(fetched.started_at.is_some());
  assert!(fetched.completed_at.is_some());
  assert_eq!(fetched.version, 2);

  assert_eq!(s.list_checks(case_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn stale_write_is_a_version_conflict() {
  let s = store().await;
  let (_, _, check_id) = seeded(&s).await;

  let read_a = s.get_check(check_id).await.unwrap().unwrap();
  let read_b = read_a.clone();

  let a = read_a.apply(CheckUpdate::Start, Utc::now()).unwrap();
  s.save_check(&a).await.unwrap();

  let b = read_b
    .apply(CheckUpdate::Fail { reason: "late".into() }, Utc::now())
    .unwrap();
  let err = s.save_check(&b).await.unwrap_err();
  assert!(matches!(err, Error::VersionConflict(id) if id == check_id));

  let stored = s.get_check(check_id).await.unwrap().unwrap();
  assert_eq!(stored.status, CheckStatus::InProgress);
}

// ─── Requests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn request_events_are_unique_per_kind() {
  let s = store().await;
  let (_, _, check_id) = seeded(&s).await;

  let request = s
    .add_request(NewRequest {
      check_id: Some(check_id),
      claimed:  claimed(),
      contact:  "hr@example.com".into(),
      channel:  Some(ResponseChannel::Mailbox),
    })
    .await
    .unwrap();

  let event = |kind| OutreachEvent { kind, at: Utc::now(), message_id: Some("<m>".into()) };
  assert!(s.append_event(request.request_id, event(OutreachKind::Initial)).await.unwrap());
  assert!(s.append_event(request.request_id, event(OutreachKind::Reminder(1))).await.unwrap());
  assert!(!s.append_event(request.request_id, event(OutreachKind::Reminder(1))).await.unwrap());

  let fetched = s.request_for_check(check_id).await.unwrap().unwrap();
  assert_eq!(fetched.events.len(), 2);
  assert_eq!(fetched.reminders_sent(), 1);
  assert_eq!(fetched.channel, Some(ResponseChannel::Mailbox));

  let err = s
    .append_event(Uuid::new_v4(), event(OutreachKind::Initial))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::RequestNotFound(_)));
}

#[tokio::test]
async fn requests_filter_by_status() {
  let s = store().await;
  let standalone = s
    .add_request(NewRequest {
      check_id: None,
      claimed:  claimed(),
      contact:  "hr@example.com".into(),
      channel:  Some(ResponseChannel::Sheet { document_ref: "doc-1".into() }),
    })
    .await
    .unwrap();

  assert_eq!(s.list_requests(Some(RequestStatus::Pending)).await.unwrap().len(), 1);
  s.set_request_status(standalone.request_id, RequestStatus::Responded)
    .await
    .unwrap();
  assert!(s.list_requests(Some(RequestStatus::Pending)).await.unwrap().is_empty());

  let all = s.list_requests(None).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].status, RequestStatus::Responded);
  assert_eq!(all[0].check_id, None);
}

// ─── Activity ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn activity_preserves_order_and_payload() {
  let s = store().await;
  let (_, _, check_id) = seeded(&s).await;

  s.append_activity(NewActivity::check(check_id, ActivityAction::CheckStarted, ""))
    .await
    .unwrap();
  s.append_activity(NewActivity::check(
    check_id,
    ActivityAction::CheckFailed { reason: "no data".into() },
    "auto",
  ))
  .await
  .unwrap();
  s.append_activity(NewActivity::check(Uuid::new_v4(), ActivityAction::AwaitingReply, ""))
    .await
    .unwrap();

  let entries = s
    .list_activity(EntityType::Check, Some(check_id))
    .await
    .unwrap();
  assert_eq!(entries.len(), 2);
  assert_eq!(entries[0].action, ActivityAction::CheckStarted);
  assert_eq!(
    entries[1].action,
    ActivityAction::CheckFailed { reason: "no data".into() }
  );
  assert_eq!(entries[1].note, "auto");

  let all = s.list_activity(EntityType::Check, None).await.unwrap();
  assert_eq!(all.len(), 3);
  assert!(s.list_activity(EntityType::Case, None).await.unwrap().is_empty());
}
