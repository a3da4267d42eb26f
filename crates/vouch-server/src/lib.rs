//! HTTP server wiring for Vouch: configuration, supervisor auth, the
//! directory spool and the periodic tasks.
//!
//! The binary in `main.rs` is a thin shell over [`ServerConfig`],
//! [`Services::start`] and [`router`].

pub mod auth;
pub mod error;
pub mod spool;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Json, Router, middleware, routing::get};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use vouch_core::{clock::SystemClock, rules::RuleBook};
use vouch_engine::{
  Backend, Controller, ReminderPolicy, ReminderScheduler, TemplateAdvisor,
  tasks::{self, Shutdown},
};
use vouch_store_sqlite::SqliteStore;

use auth::{AuthConfig, identify_supervisor};
use spool::{Spool, SpoolMailer, SpoolSheets};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `VOUCH_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  pub store_path:          PathBuf,
  #[serde(default = "default_spool_dir")]
  pub spool_dir:           PathBuf,
  /// Right-hand side of outbound message ids.
  #[serde(default = "default_mail_domain")]
  pub mail_domain:         String,
  pub auth_username:       String,
  pub auth_password_hash:  String,
  #[serde(default = "default_poll_interval")]
  pub poll_interval_secs:  u64,
  #[serde(default = "default_sweep_interval")]
  pub sweep_interval_secs: u64,
  #[serde(default)]
  pub reminders:           ReminderPolicy,
  #[serde(default)]
  pub escalation_contact:  Option<String>,
  #[serde(default)]
  pub rules:               RuleBook,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_spool_dir() -> PathBuf { PathBuf::from("spool") }

fn default_mail_domain() -> String { "vouch.local".to_owned() }

fn default_poll_interval() -> u64 { 60 }

fn default_sweep_interval() -> u64 { 3600 }

// ─── Backend ──────────────────────────────────────────────────────────────────

/// The production bundle: SQLite, the directory spool, the template advisor
/// and the system clock.
pub struct ServerBackend;

impl Backend for ServerBackend {
  type Advisor = TemplateAdvisor;
  type Clock = SystemClock;
  type Mailer = SpoolMailer;
  type Sheets = SpoolSheets;
  type Store = SqliteStore;
}

// ─── Services ─────────────────────────────────────────────────────────────────

/// The controller plus the background tasks driving it.
pub struct Services {
  pub controller: Arc<Controller<ServerBackend>>,
  shutdown:       Shutdown,
  tasks:          Vec<JoinHandle<()>>,
}

impl Services {
  /// Build the controller over `store`, rebuild the correlation registry and
  /// start the inbox poller and reminder sweeper.
  pub async fn start(config: &ServerConfig, store: SqliteStore, spool: &Spool) -> Self {
    let controller = Arc::new(Controller::<ServerBackend>::new(
      store,
      spool.mailer(&config.mail_domain),
      spool.sheets(),
      TemplateAdvisor,
      SystemClock,
      config.rules.clone(),
    ));

    match controller.refresh_registry().await {
      Ok(registry) => tracing::info!(entries = registry.len(), "correlation registry loaded"),
      Err(e) => tracing::warn!(error = %e, "starting with an empty correlation registry"),
    }

    let scheduler = Arc::new(ReminderScheduler::new(
      config.reminders,
      config.escalation_contact.clone(),
    ));
    let (shutdown, rx) = tasks::shutdown_channel();
    let tasks = vec![
      tasks::spawn_inbox_poller(
        Arc::clone(&controller),
        spool.mailbox(),
        Duration::from_secs(config.poll_interval_secs.max(1)),
        rx.clone(),
      ),
      tasks::spawn_reminder_sweeper(
        Arc::clone(&controller),
        scheduler,
        Duration::from_secs(config.sweep_interval_secs.max(1)),
        rx,
      ),
    ];

    Self { controller, shutdown, tasks }
  }

  /// Signal every task to stop and wait for them.
  pub async fn stop(self) {
    self.shutdown.send_replace(true);
    for task in self.tasks {
      if let Err(e) = task.await {
        tracing::warn!(error = %e, "background task ended abnormally");
      }
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full HTTP surface: `/health` and the API under `/api`, with
/// supervisor identification and request tracing.
pub fn router<B: Backend>(controller: Arc<Controller<B>>, auth: Arc<AuthConfig>) -> Router {
  let api = vouch_api::api_router(controller)
    .layer(middleware::from_fn_with_state(auth, identify_supervisor));

  Router::new()
    .route("/health", get(health))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod tests {
  use std::convert::Infallible;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use rand_core::OsRng;
  use tower::ServiceExt as _;
  use vouch_core::{
    check::{CheckStatus, CheckType},
    fact::{FactField, FactRecord},
    store::VerificationStore as _,
  };
  use vouch_engine::{
    CheckSpec,
    collab::{Mailbox as _, Mailer, OutboundMessage},
  };
  use vouch_extract::InboundMessage;

  use super::*;

  struct NullMailer;

  impl Mailer for NullMailer {
    type Error = Infallible;

    async fn send(&self, _message: OutboundMessage) -> Result<String, Infallible> {
      Ok("<1@vouch.test>".into())
    }
  }

  struct RouterBackend;

  impl Backend for RouterBackend {
    type Advisor = TemplateAdvisor;
    type Clock = SystemClock;
    type Mailer = NullMailer;
    type Sheets = SpoolSheets;
    type Store = SqliteStore;
  }

  fn auth(password: &str) -> Arc<AuthConfig> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    Arc::new(AuthConfig { username: "sam".into(), password_hash: hash })
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  /// A controller with one completed check; returns its id.
  async fn completed_check(
    spool: &Spool,
  ) -> (Arc<Controller<RouterBackend>>, uuid::Uuid) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let controller = Arc::new(Controller::<RouterBackend>::new(
      store,
      NullMailer,
      spool.sheets(),
      TemplateAdvisor,
      SystemClock,
      RuleBook::default(),
    ));
    let client = controller.register_client("Acme", "standard").await.unwrap();
    let mut claimed = FactRecord::default();
    claimed.set(FactField::Salary, "INR 10,00,000");
    let opened = controller
      .open_case(client.client_id, "Jane Doe", vec![CheckSpec {
        check_type: CheckType::Employment,
        claimed,
      }])
      .await
      .unwrap();
    let check_id = opened.checks[0].check_id;

    controller
      .ingest_reply(&InboundMessage {
        message_id:  "<r@x>".into(),
        in_reply_to: None,
        references:  None,
        subject:     format!("[Check: {check_id}]"),
        from:        None,
        date:        None,
        body:        "Salary: INR 10,00,000".into(),
      })
      .await
      .unwrap();
    (controller, check_id)
  }

  async fn post_review(app: Router, check_id: uuid::Uuid, authorization: Option<&str>) -> StatusCode {
    let mut builder = Request::builder()
      .method("POST")
      .uri(format!("/api/checks/{check_id}/review"))
      .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
      builder = builder.header(header::AUTHORIZATION, value);
    }
    let req = builder
      .body(Body::from(r#"{"decision":"APPROVED"}"#))
      .unwrap();
    app.oneshot(req).await.unwrap().status()
  }

  #[tokio::test]
  async fn health_is_open() {
    let dir = tempfile::tempdir().unwrap();
    let spool = Spool::create(dir.path()).await.unwrap();
    let (controller, _) = completed_check(&spool).await;

    let res = router(controller, auth("secret"))
      .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn review_needs_valid_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let spool = Spool::create(dir.path()).await.unwrap();
    let (controller, check_id) = completed_check(&spool).await;
    let auth = auth("secret");

    let app = router(Arc::clone(&controller), Arc::clone(&auth));
    assert_eq!(post_review(app.clone(), check_id, None).await, StatusCode::UNAUTHORIZED);
    assert_eq!(
      post_review(app.clone(), check_id, Some(&basic("sam", "wrong"))).await,
      StatusCode::UNAUTHORIZED
    );
    assert_eq!(
      post_review(app, check_id, Some(&basic("sam", "secret"))).await,
      StatusCode::OK
    );

    let check = controller.store().get_check(check_id).await.unwrap().unwrap();
    assert_eq!(check.status, CheckStatus::Verified);
  }

  #[tokio::test]
  async fn garbled_inbox_file_is_moved_aside() {
    let dir = tempfile::tempdir().unwrap();
    let spool = Spool::create(dir.path()).await.unwrap();
    let (controller, _) = completed_check(&spool).await;
    std::fs::write(spool.root().join(Spool::INBOX).join("garbled.json"), "{not json").unwrap();

    let mailbox = spool.mailbox();
    let report = controller.poll_inbox(&mailbox).await.unwrap();
    assert_eq!(report.unmatched, vec!["garbled.json".to_owned()]);
    assert!(mailbox.list_unread().await.unwrap().is_empty());
    assert!(spool.root().join(Spool::PROCESSED).join("garbled.json").exists());
  }

  #[test]
  fn config_fills_defaults() {
    let settings = config::Config::builder()
      .add_source(config::File::from_str(
        r#"
          store_path = "vouch.db"
          auth_username = "sam"
          auth_password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"

          [reminders]
          max_reminders = 2

          [rules.default]
          green_zone_threshold = 25

          [rules.tiers.premium]
          salary_tolerance_percent = 5.0
        "#,
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap();
    let cfg: ServerConfig = settings.try_deserialize().unwrap();

    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.spool_dir, PathBuf::from("spool"));
    assert_eq!(cfg.reminders.max_reminders, 2);
    assert_eq!(cfg.reminders.interval_hours, 48);
    assert_eq!(cfg.rules.default.green_zone_threshold, 25);
    assert_eq!(cfg.rules.for_tier("PREMIUM").salary_tolerance_percent, 5.0);
    assert_eq!(cfg.rules.for_tier("PREMIUM").red_zone_threshold, 70);
  }
}
