//! The lifecycle controller.
//!
//! Every check write goes through [`Controller::transition`]: load, apply a
//! [`CheckUpdate`], persist the whole row with a version compare-and-set,
//! then recompute the owning case. Public operations that write a check hold
//! that check's lock for their whole duration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vouch_core::{
  activity::{ActivityAction, ActivityLogEntry, CorrelationSource, EntityType, NewActivity},
  case::{self, Case, Client, NewCase},
  check::{Check, CheckStatus, CheckType, NewCheck, Zone},
  clock::Clock,
  compare::compare,
  fact::{FactField, FactRecord, ResponseMethod},
  lifecycle::{CheckUpdate, ReviewDecision},
  request::{
    NewRequest, OutreachEvent, OutreachKind, RequestStatus, ResponseChannel,
    VerificationRequest,
  },
  rules::{RuleBook, RuleConfig},
  store::VerificationStore,
};
use vouch_extract::{
  Correlation, InboundMessage, Registry, RegistryHandle, SheetDocument, correlate, normalize,
};

use crate::{
  EngineError, Result,
  advisor::degraded_summary,
  collab::{Advisor, Mailbox, Mailer, SheetSource},
  locks::CheckLocks,
  outreach,
};

// ─── Backend bundle ──────────────────────────────────────────────────────────

/// The concrete collaborators a controller runs against.
pub trait Backend: Send + Sync + 'static {
  type Store: VerificationStore + 'static;
  type Mailer: Mailer + 'static;
  type Sheets: SheetSource + 'static;
  type Advisor: Advisor + 'static;
  type Clock: Clock + 'static;
}

// ─── Inputs and outcomes ─────────────────────────────────────────────────────

/// One check to open with a case.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSpec {
  pub check_type: CheckType,
  #[serde(default)]
  pub claimed:    FactRecord,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedCase {
  pub case:   Case,
  pub checks: Vec<Check>,
}

/// What became of one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingested {
  /// No strategy tied the message to a known check.
  Unmatched,
  Matched {
    check_id: Uuid,
    source:   CorrelationSource,
    method:   ResponseMethod,
    /// The check after the reply was recorded (and possibly executed).
    check:    Check,
  },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollReport {
  pub fetched:   usize,
  pub matched:   usize,
  /// Ids of messages that could not be decoded or correlated; consumed
  /// regardless.
  pub unmatched: Vec<String>,
  /// Messages whose ingestion failed. Those failing before their reply was
  /// logged stay unread and are retried next poll.
  pub failed:    usize,
}

// ─── Controller ──────────────────────────────────────────────────────────────

pub struct Controller<B: Backend> {
  store:    B::Store,
  mailer:   B::Mailer,
  sheets:   B::Sheets,
  advisor:  B::Advisor,
  clock:    B::Clock,
  rules:    RuleBook,
  registry: RegistryHandle,
  locks:    CheckLocks,
}

impl<B: Backend> Controller<B> {
  pub fn new(
    store: B::Store,
    mailer: B::Mailer,
    sheets: B::Sheets,
    advisor: B::Advisor,
    clock: B::Clock,
    rules: RuleBook,
  ) -> Self {
    Self {
      store,
      mailer,
      sheets,
      advisor,
      clock,
      rules,
      registry: RegistryHandle::default(),
      locks: CheckLocks::default(),
    }
  }

  pub fn store(&self) -> &B::Store { &self.store }

  pub fn sheets(&self) -> &B::Sheets { &self.sheets }

  pub fn clock(&self) -> &B::Clock { &self.clock }

  pub fn rules(&self) -> &RuleBook { &self.rules }

  /// The current correlation registry snapshot.
  pub fn registry(&self) -> Arc<Registry> { self.registry.snapshot() }

  // ── Clients and cases ─────────────────────────────────────────────────────

  pub async fn register_client(&self, name: &str, tier: &str) -> Result<Client> {
    let name = name.trim();
    if name.is_empty() {
      return Err(EngineError::Invalid("client name must not be empty".into()));
    }
    let client = self
      .store
      .add_client(name.to_owned(), tier.trim().to_owned())
      .await
      .map_err(EngineError::store)?;

    self
      .log(NewActivity {
        entity_type: EntityType::Client,
        entity_id:   client.client_id,
        action:      ActivityAction::ClientRegistered {
          name: client.name.clone(),
          tier: client.tier.clone(),
        },
        note:        String::new(),
      })
      .await?;
    tracing::info!(client_id = %client.client_id, tier = %client.tier, "client registered");
    Ok(client)
  }

  /// Change a client's service tier. Later comparisons for its checks use the
  /// new tier's rules; completed results are not recomputed.
  pub async fn set_client_tier(&self, client_id: Uuid, tier: &str) -> Result<Client> {
    let client = self
      .store
      .get_client(client_id)
      .await
      .map_err(EngineError::store)?
      .ok_or_else(|| EngineError::not_found(EntityType::Client, client_id))?;

    let tier = tier.trim();
    if client.tier == tier {
      return Ok(client);
    }

    let updated = self
      .store
      .set_client_tier(client_id, tier.to_owned())
      .await
      .map_err(EngineError::store)?;
    self
      .log(NewActivity {
        entity_type: EntityType::Client,
        entity_id:   client_id,
        action:      ActivityAction::ClientTierChanged {
          previous_tier: client.tier,
          new_tier:      updated.tier.clone(),
        },
        note:        String::new(),
      })
      .await?;
    Ok(updated)
  }

  pub async fn open_case(
    &self,
    client_id: Uuid,
    employee_name: &str,
    checks: Vec<CheckSpec>,
  ) -> Result<OpenedCase> {
    let employee_name = employee_name.trim();
    if employee_name.is_empty() {
      return Err(EngineError::Invalid("employee name must not be empty".into()));
    }
    if checks.is_empty() {
      return Err(EngineError::Invalid("a case needs at least one check".into()));
    }
    if self
      .store
      .get_client(client_id)
      .await
      .map_err(EngineError::store)?
      .is_none()
    {
      return Err(EngineError::not_found(EntityType::Client, client_id));
    }

    let case = self
      .store
      .add_case(NewCase { client_id, employee_name: employee_name.to_owned() })
      .await
      .map_err(EngineError::store)?;

    let mut opened = Vec::with_capacity(checks.len());
    for spec in checks {
      let mut claimed = spec.claimed;
      if claimed.get(FactField::EmployeeName).is_none() {
        claimed.set(FactField::EmployeeName, employee_name);
      }
      let check = self
        .store
        .add_check(NewCheck {
          case_id: case.case_id,
          check_type: spec.check_type,
          claimed,
        })
        .await
        .map_err(EngineError::store)?;
      opened.push(check);
    }

    self
      .log(NewActivity {
        entity_type: EntityType::Case,
        entity_id:   case.case_id,
        action:      ActivityAction::CaseOpened {
          check_ids: opened.iter().map(|c| c.check_id).collect(),
        },
        note:        String::new(),
      })
      .await?;
    tracing::info!(case_id = %case.case_id, checks = opened.len(), "case opened");

    Ok(OpenedCase { case, checks: opened })
  }

  // ── Outreach ──────────────────────────────────────────────────────────────

  /// Create a request for `check_id` and send the initial message. A check
  /// that previously failed is reopened first, and the request left pending
  /// by the failed attempt is closed. If dispatch fails the check is marked
  /// FAILED and the error is returned; issuing again retries.
  ///
  /// At most one request per check is pending: issuing while one is still
  /// awaiting a reply is refused with [`vouch_core::Error::RequestPending`].
  pub async fn issue_request(
    &self,
    check_id: Uuid,
    contact: &str,
    channel: Option<ResponseChannel>,
  ) -> Result<VerificationRequest> {
    let contact = validate_contact(contact)?;
    let _guard = self.locks.lock(check_id).await;

    let mut check = self.load_check(check_id).await?;
    let mut pending = self
      .store
      .request_for_check(check_id)
      .await
      .map_err(EngineError::store)?
      .filter(|r| r.status == RequestStatus::Pending);

    if check.status == CheckStatus::Failed {
      if let Some(stale) = pending.take() {
        self
          .store
          .set_request_status(stale.request_id, RequestStatus::Closed)
          .await
          .map_err(EngineError::store)?;
        tracing::debug!(%check_id, request_id = %stale.request_id, "stale request closed");
      }
      check = self.transition(&check, CheckUpdate::Reopen).await?;
    }
    if check.status.is_terminal() {
      return Err(
        vouch_core::Error::InvalidTransition {
          check_id,
          status: check.status,
          action: "issue a request",
        }
        .into(),
      );
    }
    if let Some(open) = pending {
      return Err(
        vouch_core::Error::RequestPending { check_id, request_id: open.request_id }.into(),
      );
    }

    let request = self
      .store
      .add_request(NewRequest {
        check_id: Some(check_id),
        claimed: check.claimed.clone(),
        contact,
        channel,
      })
      .await
      .map_err(EngineError::store)?;

    if let Err(e) = self.publish_sheet(&request).await {
      self.fail_check(&check, format!("sheet publish failed: {e}")).await?;
      return Err(e);
    }
    if let Err(e) = self
      .send_outreach(&request, OutreachKind::Initial, &request.contact)
      .await
    {
      self.fail_check(&check, e.to_string()).await?;
      return Err(e);
    }

    self.refresh_registry().await.ok();
    self.reload_request(request).await
  }

  /// A request not tied to any case. Replies to it cannot be correlated to a
  /// check; its outreach is logged against the request itself.
  pub async fn issue_standalone_request(
    &self,
    claimed: FactRecord,
    contact: &str,
    channel: Option<ResponseChannel>,
  ) -> Result<VerificationRequest> {
    let contact = validate_contact(contact)?;
    let request = self
      .store
      .add_request(NewRequest { check_id: None, claimed, contact, channel })
      .await
      .map_err(EngineError::store)?;

    self.publish_sheet(&request).await?;
    self
      .send_outreach(&request, OutreachKind::Initial, &request.contact)
      .await?;
    self.reload_request(request).await
  }

  /// Send one outreach message for `request` unless an event of `kind` is
  /// already recorded. Returns the message id when something was sent.
  pub(crate) async fn send_outreach(
    &self,
    request: &VerificationRequest,
    kind: OutreachKind,
    to: &str,
  ) -> Result<Option<String>> {
    if request.has_event(kind) {
      return Ok(None);
    }

    let message = outreach::compose(request, kind, to);
    let subject = message.subject.clone();
    let message_id = self
      .mailer
      .send(message)
      .await
      .map_err(|e| EngineError::Dispatch(Box::new(e)))?;

    let recorded = self
      .store
      .append_event(request.request_id, OutreachEvent {
        kind,
        at: self.clock.now(),
        message_id: Some(message_id.clone()),
      })
      .await
      .map_err(EngineError::store)?;
    if !recorded {
      tracing::warn!(
        request_id = %request.request_id,
        %kind,
        "outreach event already recorded by a concurrent sender"
      );
      return Ok(None);
    }

    let (entity_type, entity_id) = match request.check_id {
      Some(check_id) => (EntityType::Check, check_id),
      None => (EntityType::Request, request.request_id),
    };
    self
      .log(NewActivity {
        entity_type,
        entity_id,
        action: ActivityAction::EmailSent {
          request_id: request.request_id,
          message_id: message_id.clone(),
          to: to.to_owned(),
          subject,
          kind,
        },
        note: String::new(),
      })
      .await?;
    tracing::info!(request_id = %request.request_id, %kind, %to, "outreach sent");
    Ok(Some(message_id))
  }

  async fn publish_sheet(&self, request: &VerificationRequest) -> Result<()> {
    let Some(ResponseChannel::Sheet { document_ref }) = &request.channel else {
      return Ok(());
    };
    self
      .sheets
      .publish(SheetDocument::template(document_ref.clone(), &request.claimed))
      .await
      .map_err(|e| EngineError::Sheet(Box::new(e)))
  }

  async fn reload_request(&self, request: VerificationRequest) -> Result<VerificationRequest> {
    Ok(
      self
        .store
        .get_request(request.request_id)
        .await
        .map_err(EngineError::store)?
        .unwrap_or(request),
    )
  }

  // ── Execution ─────────────────────────────────────────────────────────────

  /// Run the check: start it, gather verified data, compare and resolve.
  ///
  /// A check already IN_PROGRESS is resumed. Once started, a transient error
  /// (store, collaborator, version conflict) leaves it IN_PROGRESS for a
  /// retry; any other error marks it FAILED before being returned.
  pub async fn execute(&self, check_id: Uuid) -> Result<Check> {
    let _guard = self.locks.lock(check_id).await;
    let check = self.load_check(check_id).await?;
    self.execute_locked(check).await
  }

  async fn execute_locked(&self, check: Check) -> Result<Check> {
    let check_id = check.check_id;
    let mut check = check;
    if check.status == CheckStatus::Pending {
      check = self.transition(&check, CheckUpdate::Start).await?;
      self
        .log(NewActivity::check(check_id, ActivityAction::CheckStarted, ""))
        .await?;
    } else if check.status != CheckStatus::InProgress {
      return Err(
        vouch_core::Error::InvalidTransition {
          check_id,
          status: check.status,
          action: "execute",
        }
        .into(),
      );
    }

    match self.evaluate(check).await {
      Ok(resolved) => Ok(resolved),
      // Left IN_PROGRESS; `execute` picks it up again from there.
      Err(e) if e.is_transient() => {
        tracing::warn!(%check_id, error = %e, "execution interrupted");
        Err(e)
      }
      Err(e) => {
        let current = self.load_check(check_id).await?;
        if current.status == CheckStatus::InProgress {
          self.fail_check(&current, format!("execution failed: {e}")).await?;
        }
        Err(e)
      }
    }
  }

  /// Gather, compare and resolve a started check.
  async fn evaluate(&self, check: Check) -> Result<Check> {
    let check_id = check.check_id;
    let mut check = check;
    let (verified, note) = self.gather_verified(&check).await?;
    let Some(verified) = verified.filter(|v| !v.is_empty()) else {
      return self.without_data(&check).await;
    };

    if check.verified.as_ref() != Some(&verified) || note.is_some() {
      check = self
        .transition(&check, CheckUpdate::RecordResponse {
          verified: Some(verified.clone()),
          note,
        })
        .await?;
    }

    let rules = self.rules_for(&check).await?;
    let result = compare(&check.claimed, &verified, &rules);

    let (summary, advisory_failed) = match self.advisor.assess(&check, &result).await {
      Ok(summary) => (summary, false),
      Err(e) => {
        tracing::warn!(%check_id, error = %e, "advisor failed, using degraded summary");
        (degraded_summary(&result), true)
      }
    };

    let completed = ActivityAction::ComparisonCompleted {
      risk_score: result.risk_score,
      zone: result.zone,
      discrepancy_count: result.discrepancies.len(),
      match_rate: result.match_rate,
      advisory_failed,
    };
    let resolved = self
      .transition(&check, CheckUpdate::Resolve { result, summary: Some(summary) })
      .await?;
    self.log(NewActivity::check(check_id, completed, "")).await?;

    if let Some(request) = self
      .store
      .request_for_check(check_id)
      .await
      .map_err(EngineError::store)?
      && request.status == RequestStatus::Pending
    {
      self
        .store
        .set_request_status(request.request_id, RequestStatus::Responded)
        .await
        .map_err(EngineError::store)?;
    }

    tracing::info!(
      %check_id,
      risk_score = ?resolved.risk_score,
      zone = %resolved.zone,
      "check resolved"
    );
    Ok(resolved)
  }

  /// EMPLOYMENT waits for a reply; other types cannot be verified by mail and
  /// fail.
  async fn without_data(&self, check: &Check) -> Result<Check> {
    if check.check_type == CheckType::Employment {
      let waiting = self.transition(check, CheckUpdate::AwaitReply).await?;
      self
        .log(NewActivity::check(check.check_id, ActivityAction::AwaitingReply, ""))
        .await?;
      tracing::debug!(check_id = %check.check_id, "awaiting employer reply");
      return Ok(waiting);
    }

    let reason = format!(
      "no verified data available for {} check",
      check.check_type.to_string().to_lowercase()
    );
    self.fail_check(check, reason).await
  }

  /// Verified facts already on the check, or the verified column of a
  /// responded sheet. A sheet that cannot be read counts as no data.
  async fn gather_verified(&self, check: &Check) -> Result<(Option<FactRecord>, Option<String>)> {
    if let Some(v) = check.verified.as_ref().filter(|v| !v.is_empty()) {
      return Ok((Some(v.clone()), None));
    }

    let request = self
      .store
      .request_for_check(check.check_id)
      .await
      .map_err(EngineError::store)?;
    let Some(ResponseChannel::Sheet { document_ref }) = request.and_then(|r| r.channel) else {
      return Ok((None, None));
    };

    match self.sheets.fetch(&document_ref).await {
      Ok(Some(doc)) if doc.has_responded() => Ok((Some(doc.verified_facts()), doc.comments())),
      Ok(_) => Ok((None, None)),
      Err(e) => {
        tracing::warn!(check_id = %check.check_id, %document_ref, error = %e, "sheet unreadable");
        Ok((None, None))
      }
    }
  }

  async fn fail_check(&self, check: &Check, reason: String) -> Result<Check> {
    let failed = self
      .transition(check, CheckUpdate::Fail { reason: reason.clone() })
      .await?;
    self
      .log(NewActivity::check(
        check.check_id,
        ActivityAction::CheckFailed { reason: reason.clone() },
        "",
      ))
      .await?;
    tracing::warn!(check_id = %check.check_id, %reason, "check failed");
    Ok(failed)
  }

  // ── Replies ───────────────────────────────────────────────────────────────

  /// Correlate, normalize and record one inbound reply. Free-text replies and
  /// responded sheets trigger execution; anything else is stored as a note.
  pub async fn ingest_reply(&self, message: &InboundMessage) -> Result<Ingested> {
    let mut logged = false;
    self.ingest(message, &mut logged).await
  }

  /// `logged` is set once the HR_RESPONDED entry for `message` is written.
  /// The reply's content is recorded on the check before that, so everything
  /// failing afterwards can be resumed with [`Controller::execute`].
  async fn ingest(&self, message: &InboundMessage, logged: &mut bool) -> Result<Ingested> {
    let registry = self.registry.snapshot();
    let Correlation::Matched { check_id, source } = correlate(message, &registry) else {
      tracing::debug!(message_id = %message.message_id, "reply did not correlate");
      return Ok(Ingested::Unmatched);
    };

    let _guard = self.locks.lock(check_id).await;
    let Some(mut check) = self
      .store
      .get_check(check_id)
      .await
      .map_err(EngineError::store)?
    else {
      tracing::debug!(%check_id, "reply references an unknown check");
      return Ok(Ingested::Unmatched);
    };

    let extraction = normalize(&message.body);
    let method = extraction.method;
    let request = self
      .store
      .request_for_check(check_id)
      .await
      .map_err(EngineError::store)?;

    let mut run = false;
    if !check.status.is_terminal() {
      let update = match method {
        ResponseMethod::FreeText => {
          let mut verified = extraction.facts;
          if let Some(prev) = &check.verified {
            verified.merge_missing(prev);
          }
          run = true;
          Some(CheckUpdate::RecordResponse { verified: Some(verified), note: None })
        }
        ResponseMethod::StructuredLink => {
          let document_ref = extraction.document_ref.unwrap_or_default();
          match self.sheets.fetch(&document_ref).await {
            Ok(Some(doc)) if doc.has_responded() => {
              run = true;
              Some(CheckUpdate::RecordResponse {
                verified: Some(doc.verified_facts()),
                note:     doc.comments(),
              })
            }
            other => {
              if let Err(e) = other {
                tracing::warn!(%check_id, %document_ref, error = %e, "linked sheet unreadable");
              }
              Some(CheckUpdate::RecordResponse {
                verified: None,
                note:     Some(format!("Sheet {document_ref} linked but not yet filled in.")),
              })
            }
          }
        }
        ResponseMethod::Unstructured => extraction
          .note
          .map(|note| CheckUpdate::RecordResponse { verified: None, note: Some(note) }),
      };
      if let Some(update) = update {
        check = self.transition(&check, update).await?;
      }
    }

    self
      .log(NewActivity::check(
        check_id,
        ActivityAction::HrResponded {
          request_id: request.as_ref().map(|r| r.request_id),
          method,
          correlation: source,
          message_id: Some(message.message_id.clone()),
          from: message.from.clone(),
          fields: extraction.matched,
        },
        "",
      ))
      .await?;
    *logged = true;
    if let Some(r) = &request
      && r.status == RequestStatus::Pending
    {
      self
        .store
        .set_request_status(r.request_id, RequestStatus::Responded)
        .await
        .map_err(EngineError::store)?;
    }
    tracing::info!(%check_id, %source, %method, "employer replied");

    if run {
      check = self.execute_locked(check).await?;
    }
    Ok(Ingested::Matched { check_id, source, method, check })
  }

  /// Drain the mailbox once. A message is marked read once its reply has been
  /// logged, or once it is found to be unmatched or undecodable. An error
  /// before the reply is logged leaves it unread for the next poll; an error
  /// after that is counted as failed but the message is still consumed, so it
  /// is never logged twice.
  pub async fn poll_inbox<M: Mailbox>(&self, mailbox: &M) -> Result<PollReport> {
    let ids = mailbox
      .list_unread()
      .await
      .map_err(|e| EngineError::Mailbox(Box::new(e)))?;

    let mut report = PollReport::default();
    for id in ids {
      let message = match mailbox.fetch(&id).await {
        Ok(m) => m,
        Err(e) => {
          tracing::warn!(mail_id = %id, error = %e, "undecodable message consumed");
          report.unmatched.push(id.clone());
          consume(mailbox, &id).await;
          continue;
        }
      };
      report.fetched += 1;

      let mut logged = false;
      match self.ingest(&message, &mut logged).await {
        Ok(Ingested::Unmatched) => report.unmatched.push(id.clone()),
        Ok(Ingested::Matched { .. }) => report.matched += 1,
        Err(e) if !logged => {
          tracing::warn!(mail_id = %id, error = %e, "reply ingestion failed, retrying next poll");
          report.failed += 1;
          continue;
        }
        Err(e) => {
          tracing::warn!(mail_id = %id, error = %e, "reply logged but processing failed");
          report.failed += 1;
        }
      }

      consume(mailbox, &id).await;
    }

    if report.fetched > 0 || !report.unmatched.is_empty() {
      tracing::info!(
        fetched = report.fetched,
        matched = report.matched,
        unmatched = report.unmatched.len(),
        failed = report.failed,
        "inbox polled"
      );
    }
    Ok(report)
  }

  // ── Supervision ───────────────────────────────────────────────────────────

  pub async fn review(
    &self,
    check_id: Uuid,
    decision: ReviewDecision,
    reviewer: &str,
    note: Option<String>,
  ) -> Result<Check> {
    let reviewer = reviewer.trim();
    if reviewer.is_empty() {
      return Err(EngineError::Invalid("reviewer must not be empty".into()));
    }

    let _guard = self.locks.lock(check_id).await;
    let check = self.load_check(check_id).await?;
    let reviewed = self
      .transition(&check, CheckUpdate::Review { decision })
      .await?;

    self
      .log(NewActivity::check(
        check_id,
        ActivityAction::SupervisorReview {
          decision,
          reviewer: reviewer.to_owned(),
          previous_zone: check.zone,
          previous_status: check.status,
          new_zone: reviewed.zone,
          new_status: reviewed.status,
        },
        note.unwrap_or_default(),
      ))
      .await?;
    tracing::info!(%check_id, %decision, %reviewer, "check reviewed");
    Ok(reviewed)
  }

  pub async fn reassign_zone(
    &self,
    check_id: Uuid,
    zone: Zone,
    status: Option<CheckStatus>,
    note: Option<String>,
  ) -> Result<Check> {
    if let Some(s) = status
      && !matches!(s, CheckStatus::Completed | CheckStatus::Verified | CheckStatus::Rejected)
    {
      return Err(EngineError::Invalid(format!(
        "status {s} cannot accompany a zone reassignment"
      )));
    }

    let _guard = self.locks.lock(check_id).await;
    let check = self.load_check(check_id).await?;
    let moved = self
      .transition(&check, CheckUpdate::Reassign { zone, status })
      .await?;

    self
      .log(NewActivity::check(
        check_id,
        ActivityAction::ZoneReassigned {
          previous_zone:   check.zone,
          new_zone:        moved.zone,
          previous_status: check.status,
          new_status:      moved.status,
        },
        note.unwrap_or_default(),
      ))
      .await?;
    tracing::info!(%check_id, from = %check.zone, to = %moved.zone, "zone reassigned");
    Ok(moved)
  }

  // ── Registry ──────────────────────────────────────────────────────────────

  /// Rebuild the correlation registry from the activity log and swap it in.
  /// On failure the previous snapshot stays in place.
  pub async fn refresh_registry(&self) -> Result<Arc<Registry>> {
    let entries = match self.store.list_activity(EntityType::Check, None).await {
      Ok(entries) => entries,
      Err(e) => {
        tracing::warn!(error = %e, "registry rebuild failed, keeping previous snapshot");
        return Err(EngineError::store(e));
      }
    };

    let registry = Registry::from_log(&entries);
    tracing::debug!(
      entries = registry.len(),
      fingerprint = %registry.fingerprint(),
      "registry rebuilt"
    );
    self.registry.replace(registry);
    Ok(self.registry.snapshot())
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  async fn load_check(&self, check_id: Uuid) -> Result<Check> {
    self
      .store
      .get_check(check_id)
      .await
      .map_err(EngineError::store)?
      .ok_or_else(|| EngineError::not_found(EntityType::Check, check_id))
  }

  async fn log(&self, activity: NewActivity) -> Result<ActivityLogEntry> {
    self
      .store
      .append_activity(activity)
      .await
      .map_err(EngineError::store)
  }

  /// Apply `update`, persist the check and refresh its case aggregate.
  async fn transition(&self, check: &Check, update: CheckUpdate) -> Result<Check> {
    let next = check.apply(update, self.clock.now())?;
    let saved = self
      .store
      .save_check(&next)
      .await
      .map_err(EngineError::store)?;
    self.recompute_case(saved.case_id).await?;
    Ok(saved)
  }

  async fn recompute_case(&self, case_id: Uuid) -> Result<()> {
    let Some(mut case) = self
      .store
      .get_case(case_id)
      .await
      .map_err(EngineError::store)?
    else {
      return Err(EngineError::not_found(EntityType::Case, case_id));
    };
    let checks = self
      .store
      .list_checks(case_id)
      .await
      .map_err(EngineError::store)?;

    let (status, risk_level) = case::aggregate(&checks);
    if case.status != status || case.risk_level != risk_level {
      case.status = status;
      case.risk_level = risk_level;
      self
        .store
        .save_case(&case)
        .await
        .map_err(EngineError::store)?;
    }
    Ok(())
  }

  /// The rule configuration for the tier of the client owning `check`.
  async fn rules_for(&self, check: &Check) -> Result<RuleConfig> {
    let case = self
      .store
      .get_case(check.case_id)
      .await
      .map_err(EngineError::store)?
      .ok_or_else(|| EngineError::not_found(EntityType::Case, check.case_id))?;
    let client = self
      .store
      .get_client(case.client_id)
      .await
      .map_err(EngineError::store)?
      .ok_or_else(|| EngineError::not_found(EntityType::Client, case.client_id))?;
    Ok(*self.rules.for_tier(&client.tier))
  }
}

async fn consume<M: Mailbox>(mailbox: &M, id: &str) {
  if let Err(e) = mailbox.mark_read(id).await {
    tracing::warn!(mail_id = %id, error = %e, "mark read failed");
  }
}

fn validate_contact(contact: &str) -> Result<String> {
  let contact = contact.trim();
  if contact.is_empty() || !contact.contains('@') {
    return Err(EngineError::Invalid(format!("not a mail address: {contact:?}")));
  }
  Ok(contact.to_owned())
}
