//! Composing outbound verification messages.
//!
//! Every message carries the check id three ways (subject tag, header and a
//! `Check ID:` body line) so a reply can be tied back even when the employer's
//! mail client drops thread headers.

use std::{collections::BTreeMap, fmt::Write as _};

use uuid::Uuid;
use vouch_core::{
  fact::FactField,
  request::{OutreachKind, ResponseChannel, VerificationRequest},
};
use vouch_extract::correlate::subject_tag;

use crate::collab::OutboundMessage;

pub const HEADER_CHECK_ID: &str = "X-Vouch-Check-Id";
pub const HEADER_REQUEST_ID: &str = "X-Vouch-Request-Id";
pub const HEADER_OUTREACH_KIND: &str = "X-Vouch-Outreach";

/// Public URL of a verification sheet.
pub fn sheet_url(document_ref: &str) -> String {
  format!("https://docs.google.com/spreadsheets/d/{document_ref}/edit")
}

/// The message for one outreach event of `request`. `to` is the recipient,
/// which for escalations is not necessarily the request contact.
pub fn compose(request: &VerificationRequest, kind: OutreachKind, to: &str) -> OutboundMessage {
  let employee = request
    .claimed
    .get(FactField::EmployeeName)
    .unwrap_or("a former employee");

  let lead = match kind {
    OutreachKind::Initial => "Employment verification request",
    OutreachKind::Reminder(_) => "Reminder: employment verification pending",
    OutreachKind::Escalation => "Escalation: employment verification overdue",
  };
  let mut subject = format!("{lead} for {employee}");
  if let Some(check_id) = request.check_id {
    subject.push(' ');
    subject.push_str(&subject_tag(check_id));
  }

  let mut headers = BTreeMap::new();
  headers.insert(HEADER_REQUEST_ID.to_owned(), request.request_id.to_string());
  headers.insert(HEADER_OUTREACH_KIND.to_owned(), kind.to_string());
  if let Some(check_id) = request.check_id {
    headers.insert(HEADER_CHECK_ID.to_owned(), check_id.to_string());
  }

  OutboundMessage {
    to: to.to_owned(),
    subject,
    body: body(request, kind, employee),
    headers,
  }
}

fn body(request: &VerificationRequest, kind: OutreachKind, employee: &str) -> String {
  let mut out = String::from("Hello,\n\n");
  match kind {
    OutreachKind::Initial => {}
    OutreachKind::Reminder(n) => {
      let _ = writeln!(out, "This is reminder {n} for the request below.\n");
    }
    OutreachKind::Escalation => {
      let _ = writeln!(
        out,
        "The request below has gone unanswered after repeated reminders to {}.\n",
        request.contact
      );
    }
  }

  let _ = writeln!(
    out,
    "We are verifying the employment history of {employee}. Please confirm or correct the details below."
  );

  match &request.channel {
    Some(ResponseChannel::Sheet { document_ref }) => {
      let _ = writeln!(
        out,
        "Fill in the \"Verified\" column of this sheet: {}",
        sheet_url(document_ref)
      );
    }
    _ => {
      let _ = writeln!(out, "Reply to this message with one \"Label: value\" line per item.");
    }
  }
  out.push('\n');

  for field in FactField::all() {
    if let Some(value) = request.claimed.get(field) {
      let _ = writeln!(out, "{}: {value}", field.label());
    }
  }
  out.push('\n');

  let reference: Uuid = request.check_id.unwrap_or(request.request_id);
  let label = if request.check_id.is_some() { "Check ID" } else { "Request ID" };
  let _ = writeln!(out, "{label}: {reference}");
  out.push_str("\nThank you.\n");
  out
}
