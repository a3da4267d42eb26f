//! JSON REST API for Vouch.
//!
//! Exposes an axum [`Router`] backed by a [`vouch_engine::Controller`].
//! Authentication, TLS and transport concerns are the caller's
//! responsibility: supervisor-only routes read a [`Supervisor`] from the
//! request extensions, which the embedding server inserts after verifying
//! credentials.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", vouch_api::api_router(controller.clone()))
//! ```

pub mod activity;
pub mod cases;
pub mod checks;
pub mod clients;
pub mod error;
pub mod replies;
pub mod requests;
pub mod supervisor;
pub mod tools;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use vouch_engine::{Backend, Controller};

pub use error::ApiError;
pub use supervisor::Supervisor;

/// Build a fully-materialised API router for `controller`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<B: Backend>(controller: Arc<Controller<B>>) -> Router<()> {
  Router::new()
    // Clients
    .route("/clients", get(clients::list::<B>).post(clients::create::<B>))
    .route("/clients/{id}", get(clients::get_one::<B>))
    .route("/clients/{id}/tier", put(clients::set_tier::<B>))
    // Cases
    .route("/cases", get(cases::list::<B>).post(cases::create::<B>))
    .route("/cases/{id}", get(cases::get_one::<B>))
    // Checks
    .route("/checks/{id}", get(checks::get_one::<B>))
    .route("/checks/{id}/execute", post(checks::execute::<B>))
    .route("/checks/{id}/requests", post(checks::issue_request::<B>))
    .route("/checks/{id}/request", get(checks::latest_request::<B>))
    .route("/checks/{id}/review", post(checks::review::<B>))
    .route("/checks/{id}/zone", post(checks::reassign_zone::<B>))
    .route("/checks/{id}/activity", get(checks::activity::<B>))
    // Requests and replies
    .route("/requests", get(requests::list::<B>).post(requests::create::<B>))
    .route("/requests/{id}", get(requests::get_one::<B>))
    .route("/replies", post(replies::ingest::<B>))
    // Audit log
    .route("/activity", get(activity::list::<B>))
    // Stateless tools
    .route("/compare", post(tools::compare_records::<B>))
    .route("/extract", post(tools::extract::<B>))
    .with_state(controller)
}

#[cfg(test)]
mod tests {
  use std::{
    convert::Infallible,
    sync::atomic::{AtomicUsize, Ordering},
  };

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use vouch_core::{clock::SystemClock, rules::RuleBook};
  use vouch_engine::{
    TemplateAdvisor,
    collab::{Mailer, OutboundMessage, SheetSource},
  };
  use vouch_extract::SheetDocument;
  use vouch_store_sqlite::SqliteStore;

  use super::*;

  // ── Fixtures ────────────────────────────────────────────────────────────────

  #[derive(Default)]
  struct CountingMailer(AtomicUsize);

  impl Mailer for CountingMailer {
    type Error = Infallible;

    async fn send(&self, _message: OutboundMessage) -> Result<String, Infallible> {
      let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
      Ok(format!("<{n}@api.test>"))
    }
  }

  struct NoSheets;

  impl SheetSource for NoSheets {
    type Error = Infallible;

    async fn fetch(&self, _document_ref: &str) -> Result<Option<SheetDocument>, Infallible> {
      Ok(None)
    }

    async fn publish(&self, _document: SheetDocument) -> Result<(), Infallible> { Ok(()) }
  }

  struct TestBackend;

  impl Backend for TestBackend {
    type Advisor = TemplateAdvisor;
    type Clock = SystemClock;
    type Mailer = CountingMailer;
    type Sheets = NoSheets;
    type Store = SqliteStore;
  }

  async fn app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let controller = Controller::<TestBackend>::new(
      store,
      CountingMailer::default(),
      NoSheets,
      TemplateAdvisor,
      SystemClock,
      RuleBook::default(),
    );
    api_router(Arc::new(controller))
  }

  async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    supervisor: Option<&str>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(name) = supervisor {
      builder = builder.extension(Supervisor(name.to_owned()));
    }
    let req = match body {
      Some(json) => builder
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  /// Register a client and open a one-check case; returns the check id.
  async fn open_employment_check(app: &Router) -> String {
    let (status, client) = call(
      app,
      "POST",
      "/clients",
      Some(json!({ "name": "Acme Staffing" })),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(client["tier"], "standard");

    let (status, opened) = call(
      app,
      "POST",
      "/cases",
      Some(json!({
        "clientId": client["clientId"],
        "employeeName": "Jane Doe",
        "checks": [{ "checkType": "EMPLOYMENT", "claimed": { "salary": "INR 10,00,000" } }],
      })),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    opened["checks"][0]["checkId"].as_str().unwrap().to_owned()
  }

  // ── Clients and cases ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn case_lists_its_checks() {
    let app = app().await;
    let check_id = open_employment_check(&app).await;

    let (_, check) = call(&app, "GET", &format!("/checks/{check_id}"), None, None).await;
    let case_id = check["caseId"].as_str().unwrap();

    let (status, detail) = call(&app, "GET", &format!("/cases/{case_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["case"]["status"], "OPEN");
    assert_eq!(detail["checks"][0]["claimed"]["employeeName"], "Jane Doe");
    assert_eq!(detail["checks"][0]["status"], "PENDING");
  }

  #[tokio::test]
  async fn case_validation_errors() {
    let app = app().await;

    let (status, body) = call(
      &app,
      "POST",
      "/cases",
      Some(json!({
        "clientId": uuid::Uuid::new_v4(),
        "employeeName": "Jane Doe",
        "checks": [{ "checkType": "CRIME" }],
      })),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("CLIENT"));

    let (_, client) = call(&app, "POST", "/clients", Some(json!({ "name": "Acme" })), None).await;
    let (status, _) = call(
      &app,
      "POST",
      "/cases",
      Some(json!({ "clientId": client["clientId"], "employeeName": "Jane", "checks": [] })),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn tier_change_is_persisted() {
    let app = app().await;
    let (_, client) = call(&app, "POST", "/clients", Some(json!({ "name": "Acme" })), None).await;
    let id = client["clientId"].as_str().unwrap();

    let (status, updated) = call(
      &app,
      "PUT",
      &format!("/clients/{id}/tier"),
      Some(json!({ "tier": "premium" })),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["tier"], "premium");

    let (_, log) = call(
      &app,
      "GET",
      &format!("/activity?entityType=CLIENT&entityId={id}"),
      None,
      None,
    )
    .await;
    let actions: Vec<_> = log
      .as_array()
      .unwrap()
      .iter()
      .map(|e| e["action"].as_str().unwrap().to_owned())
      .collect();
    assert_eq!(actions, vec!["CLIENT_REGISTERED", "CLIENT_TIER_CHANGED"]);
  }

  // ── Requests and replies ────────────────────────────────────────────────────

  #[tokio::test]
  async fn issued_request_and_reply_resolve_the_check() {
    let app = app().await;
    let check_id = open_employment_check(&app).await;

    let (status, request) = call(
      &app,
      "POST",
      &format!("/checks/{check_id}/requests"),
      Some(json!({ "contact": "hr@initech.example", "channel": { "kind": "mailbox" } })),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["events"][0]["kind"], "INITIAL");
    let sent_id = request["events"][0]["messageId"].as_str().unwrap();

    let (status, pending) = call(&app, "GET", "/requests?status=PENDING", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, outcome) = call(
      &app,
      "POST",
      "/replies",
      Some(json!({
        "messageId": "<r1@initech.example>",
        "inReplyTo": sent_id,
        "subject": "Re: Employment verification",
        "body": "Employee Name: Jane Doe\nSalary: INR 11,20,000",
      })),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["matched"], true);
    assert_eq!(outcome["correlation"], "THREAD");
    assert_eq!(outcome["check"]["riskScore"], 20);
    assert_eq!(outcome["check"]["zone"], "GREEN");
    assert_eq!(outcome["check"]["status"], "COMPLETED");

    let (_, latest) = call(&app, "GET", &format!("/checks/{check_id}/request"), None, None).await;
    assert_eq!(latest["status"], "RESPONDED");
  }

  #[tokio::test]
  async fn unmatched_reply_is_reported() {
    let app = app().await;
    let (status, outcome) = call(
      &app,
      "POST",
      "/replies",
      Some(json!({ "messageId": "<x@y>", "subject": "hello", "body": "hi" })),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["matched"], false);
    assert!(outcome["check"].is_null());
  }

  #[tokio::test]
  async fn standalone_request_has_no_check() {
    let app = app().await;
    let (status, request) = call(
      &app,
      "POST",
      "/requests",
      Some(json!({ "claimed": { "employeeName": "Jane Doe" }, "contact": "hr@initech.example" })),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(request["checkId"].is_null());

    let (status, _) = call(
      &app,
      "POST",
      "/requests",
      Some(json!({ "contact": "not-an-address" })),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  // ── Supervision ─────────────────────────────────────────────────────────────

  async fn resolved_check(app: &Router) -> String {
    let check_id = open_employment_check(app).await;
    let (_, outcome) = call(
      app,
      "POST",
      "/replies",
      Some(json!({
        "messageId": "<r2@initech.example>",
        "subject": format!("RE: [Check: {check_id}]"),
        "body": "Salary: INR 10,00,000",
      })),
      None,
    )
    .await;
    assert_eq!(outcome["check"]["status"], "COMPLETED");
    check_id
  }

  #[tokio::test]
  async fn review_requires_a_supervisor() {
    let app = app().await;
    let check_id = resolved_check(&app).await;
    let uri = format!("/checks/{check_id}/review");
    let body = json!({ "decision": "REJECTED", "note": "forged letter" });

    let (status, _) = call(&app, "POST", &uri, Some(body.clone()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, check) = call(&app, "POST", &uri, Some(body), Some("sam")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["status"], "REJECTED");
    assert_eq!(check["zone"], "RED");

    let (_, log) = call(&app, "GET", &format!("/checks/{check_id}/activity"), None, None).await;
    let review = log.as_array().unwrap().last().unwrap().clone();
    assert_eq!(review["action"], "SUPERVISOR_REVIEW");
    assert_eq!(review["metadata"]["reviewer"], "sam");
    assert_eq!(review["metadata"]["previousZone"], "GREEN");
    assert_eq!(review["note"], "forged letter");
  }

  #[tokio::test]
  async fn review_of_pending_check_conflicts() {
    let app = app().await;
    let check_id = open_employment_check(&app).await;
    let (status, _) = call(
      &app,
      "POST",
      &format!("/checks/{check_id}/review"),
      Some(json!({ "decision": "APPROVED" })),
      Some("sam"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn zone_reassignment_records_the_supervisor() {
    let app = app().await;
    let check_id = resolved_check(&app).await;

    let (status, check) = call(
      &app,
      "POST",
      &format!("/checks/{check_id}/zone"),
      Some(json!({ "zone": "YELLOW", "note": "gap in dates" })),
      Some("sam"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["zone"], "YELLOW");
    assert_eq!(check["status"], "COMPLETED");

    let (_, log) = call(&app, "GET", &format!("/checks/{check_id}/activity"), None, None).await;
    let entry = log.as_array().unwrap().last().unwrap().clone();
    assert_eq!(entry["action"], "ZONE_REASSIGNED");
    assert_eq!(entry["note"], "sam: gap in dates");

    let (status, _) = call(
      &app,
      "POST",
      &format!("/checks/{check_id}/zone"),
      Some(json!({ "zone": "PENDING" })),
      Some("sam"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
  }

  // ── Tools ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn compare_endpoint_scores_records() {
    let app = app().await;
    let (status, result) = call(
      &app,
      "POST",
      "/compare",
      Some(json!({
        "claimed": { "employeeName": "Jane Doe", "salary": "₹10,00,000" },
        "verified": { "employeeName": "jane doe", "salary": "₹11,20,000" },
      })),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["riskScore"], 20);
    assert_eq!(result["zone"], "GREEN");
    assert_eq!(result["matchRate"], 50.0);
    assert_eq!(result["discrepancies"][0]["differencePercent"], 12.0);

    let (_, strict) = call(
      &app,
      "POST",
      "/compare",
      Some(json!({
        "claimed": { "salary": "100000" },
        "verified": { "salary": "120000" },
        "rules": { "greenZoneThreshold": 10 },
      })),
      None,
    )
    .await;
    assert_eq!(strict["zone"], "YELLOW");
  }

  #[tokio::test]
  async fn extract_endpoint_reports_fields_and_correlation() {
    let app = app().await;
    let check_id = uuid::Uuid::new_v4();
    let (status, result) = call(
      &app,
      "POST",
      "/extract",
      Some(json!({
        "messageId": "<e1@x>",
        "subject": format!("[Check: {check_id}_EMP]"),
        "body": "Designation: Analyst\nEligible for rehire: Yes\n\nOn Monday, Vouch wrote:\n> Salary: 5",
      })),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["extraction"]["method"], "FREE_TEXT");
    assert_eq!(result["extraction"]["facts"]["designation"], "Analyst");
    assert!(result["extraction"]["facts"]["salary"].is_null());
    assert_eq!(result["checkId"], check_id.to_string());
    assert_eq!(result["correlation"], "SUBJECT_TAG");
  }
}
