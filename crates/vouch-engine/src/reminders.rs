//! The reminder ladder.
//!
//! A pending request gets `REMINDER_1 .. REMINDER_max`, one per elapsed
//! interval since the newest outreach, then a single `ESCALATION`. After that
//! it stays pending and silent. The request's event list is the only counter.

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use vouch_core::{
  clock::Clock,
  request::{OutreachKind, RequestStatus, ResponseChannel, VerificationRequest},
  store::VerificationStore,
};

use crate::{
  EngineError, Result,
  collab::SheetSource,
  controller::{Backend, Controller},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderPolicy {
  /// Minimum hours between two notifications for the same request.
  pub interval_hours: i64,
  /// Reminders sent before escalating.
  pub max_reminders:  u32,
}

impl Default for ReminderPolicy {
  fn default() -> Self { Self { interval_hours: 48, max_reminders: 3 } }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
  pub examined:  usize,
  pub reminded:  usize,
  pub escalated: usize,
  /// Requests whose sheet turned out to be filled in; their checks were run.
  pub collected: usize,
  /// Requests closed because their check already reached a terminal state.
  pub closed:    usize,
  pub failed:    usize,
  /// Set when another sweep was still running and this one did nothing.
  pub skipped:   bool,
}

/// What to do with one request on this sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
  Wait,
  Send(OutreachKind),
  Done,
}

impl ReminderPolicy {
  /// The next ladder step for `request` at `elapsed_hours` since its newest
  /// outreach.
  fn step(&self, request: &VerificationRequest, elapsed_hours: i64) -> Step {
    if elapsed_hours < self.interval_hours {
      return Step::Wait;
    }
    let sent = request.reminders_sent();
    if sent < self.max_reminders {
      Step::Send(OutreachKind::Reminder(sent + 1))
    } else if request.has_event(OutreachKind::Escalation) {
      Step::Done
    } else {
      Step::Send(OutreachKind::Escalation)
    }
  }
}

pub struct ReminderScheduler {
  policy:             ReminderPolicy,
  /// Escalations go here; the request contact when unset.
  escalation_contact: Option<String>,
  running:            Mutex<()>,
}

impl ReminderScheduler {
  pub fn new(policy: ReminderPolicy, escalation_contact: Option<String>) -> Self {
    Self {
      policy,
      escalation_contact: escalation_contact.filter(|c| !c.trim().is_empty()),
      running: Mutex::new(()),
    }
  }

  pub fn policy(&self) -> ReminderPolicy { self.policy }

  /// Walk every pending request once. Overlapping sweeps are refused rather
  /// than queued.
  pub async fn sweep<B: Backend>(&self, controller: &Controller<B>) -> Result<SweepReport> {
    let Ok(_running) = self.running.try_lock() else {
      tracing::debug!("reminder sweep already running");
      return Ok(SweepReport { skipped: true, ..SweepReport::default() });
    };

    let pending = controller
      .store()
      .list_requests(Some(RequestStatus::Pending))
      .await
      .map_err(EngineError::store)?;

    let mut report = SweepReport::default();
    for request in pending.iter().filter(|r| r.channel.is_some()) {
      report.examined += 1;
      if let Err(e) = self.visit(controller, request, &mut report).await {
        tracing::warn!(request_id = %request.request_id, error = %e, "reminder step failed");
        report.failed += 1;
      }
    }

    if report.reminded + report.escalated + report.collected + report.closed > 0 {
      tracing::info!(
        examined = report.examined,
        reminded = report.reminded,
        escalated = report.escalated,
        collected = report.collected,
        closed = report.closed,
        "reminder sweep finished"
      );
    }
    Ok(report)
  }

  async fn visit<B: Backend>(
    &self,
    controller: &Controller<B>,
    request: &VerificationRequest,
    report: &mut SweepReport,
  ) -> Result<()> {
    let store = controller.store();

    if let Some(check_id) = request.check_id {
      let check = store.get_check(check_id).await.map_err(EngineError::store)?;
      if check.is_some_and(|c| c.status.is_terminal()) {
        store
          .set_request_status(request.request_id, RequestStatus::Closed)
          .await
          .map_err(EngineError::store)?;
        report.closed += 1;
        return Ok(());
      }
    }

    if let Some(ResponseChannel::Sheet { document_ref }) = &request.channel {
      let answered = match controller.sheets().fetch(document_ref).await {
        Ok(doc) => doc.is_some_and(|d| d.has_responded()),
        Err(e) => {
          tracing::warn!(%document_ref, error = %e, "sheet unreadable during sweep");
          false
        }
      };
      if answered {
        // Execution marks the request responded once the check resolves; a
        // failed run keeps it pending for the next sweep.
        match request.check_id {
          Some(check_id) => {
            controller.execute(check_id).await?;
          }
          None => store
            .set_request_status(request.request_id, RequestStatus::Responded)
            .await
            .map_err(EngineError::store)?,
        }
        report.collected += 1;
        return Ok(());
      }
    }

    // The initial send never went out; reminding would be the first contact.
    if !request.has_event(OutreachKind::Initial) {
      return Ok(());
    }

    let elapsed = (controller.clock().now() - request.last_outreach_at()).num_hours();
    let kind = match self.policy.step(request, elapsed) {
      Step::Wait | Step::Done => return Ok(()),
      Step::Send(kind) => kind,
    };

    let to = match kind {
      OutreachKind::Escalation => self
        .escalation_contact
        .as_deref()
        .unwrap_or(&request.contact),
      _ => &request.contact,
    };
    if controller.send_outreach(request, kind, to).await?.is_some() {
      match kind {
        OutreachKind::Escalation => report.escalated += 1,
        _ => report.reminded += 1,
      }
      if request.check_id.is_some() {
        controller.refresh_registry().await.ok();
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;
  use vouch_core::{fact::FactRecord, request::OutreachEvent};

  use super::*;

  fn request(reminders: u32, escalated: bool) -> VerificationRequest {
    let at = Utc::now();
    let mut events = vec![OutreachEvent { kind: OutreachKind::Initial, at, message_id: None }];
    events.extend((1..=reminders).map(|n| OutreachEvent {
      kind: OutreachKind::Reminder(n),
      at,
      message_id: None,
    }));
    if escalated {
      events.push(OutreachEvent { kind: OutreachKind::Escalation, at, message_id: None });
    }
    VerificationRequest {
      request_id: Uuid::new_v4(),
      check_id: None,
      claimed: FactRecord::default(),
      contact: "hr@example.com".into(),
      channel: Some(ResponseChannel::Mailbox),
      status: RequestStatus::Pending,
      created_at: at,
      events,
    }
  }

  #[test]
  fn ladder_steps() {
    let policy = ReminderPolicy { interval_hours: 48, max_reminders: 2 };
    assert_eq!(policy.step(&request(0, false), 47), Step::Wait);
    assert_eq!(
      policy.step(&request(0, false), 48),
      Step::Send(OutreachKind::Reminder(1))
    );
    assert_eq!(
      policy.step(&request(1, false), 100),
      Step::Send(OutreachKind::Reminder(2))
    );
    assert_eq!(
      policy.step(&request(2, false), 48),
      Step::Send(OutreachKind::Escalation)
    );
    assert_eq!(policy.step(&request(2, true), 500), Step::Done);
  }

  #[test]
  fn zero_reminders_escalates_directly() {
    let policy = ReminderPolicy { interval_hours: 1, max_reminders: 0 };
    assert_eq!(
      policy.step(&request(0, false), 2),
      Step::Send(OutreachKind::Escalation)
    );
  }
}
