//! Collaborator traits: the mail transport, the mailbox, the sheet source and
//! the advisory narrator.
//!
//! The engine owns none of these. Each is supplied by the binary (or by a
//! test) and reached only through the trait.

use std::{collections::BTreeMap, future::Future};

use serde::{Deserialize, Serialize};
use vouch_core::{check::Check, compare::ComparisonResult};
use vouch_extract::{InboundMessage, SheetDocument};

// ─── Outbound mail ───────────────────────────────────────────────────────────

/// One message handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
  pub to:      String,
  pub subject: String,
  pub body:    String,
  /// Extra headers, e.g. `X-Vouch-Check-Id`.
  pub headers: BTreeMap<String, String>,
}

pub trait Mailer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Send `message`, returning the transport-assigned message id.
  fn send(
    &self,
    message: OutboundMessage,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;
}

// ─── Inbound mail ────────────────────────────────────────────────────────────

pub trait Mailbox: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Ids of messages not yet marked read.
  fn list_unread(&self) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  fn fetch<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<InboundMessage, Self::Error>> + Send + 'a;

  fn mark_read<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Spreadsheets ────────────────────────────────────────────────────────────

pub trait SheetSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The current contents of `document_ref`, or `None` if it does not exist.
  fn fetch<'a>(
    &'a self,
    document_ref: &'a str,
  ) -> impl Future<Output = Result<Option<SheetDocument>, Self::Error>> + Send + 'a;

  /// Create or overwrite the document with a blank template.
  fn publish(
    &self,
    document: SheetDocument,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Advisory narrative ──────────────────────────────────────────────────────

/// Produces a human-readable summary after the deterministic comparison. It
/// only ever writes prose; score and zone are not its business.
pub trait Advisor: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn assess<'a>(
    &'a self,
    check: &'a Check,
    result: &'a ComparisonResult,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}
