//! Reply correlation: which check does an inbound message answer?
//!
//! Strategies run in a fixed precedence, first hit wins:
//!
//! 1. thread linkage (`In-Reply-To` / `References` against the registry of
//!    sent message ids);
//! 2. a `[Check: <id>]` tag in the subject;
//! 3. a `Check ID: <id>`-style reference in the body.
//!
//! The registry is derived from the activity log and is rebuilt wholesale,
//! never patched in place. [`RegistryHandle`] swaps complete snapshots so a
//! reader sees either the old mapping or the new one.

use std::{
  collections::BTreeMap,
  sync::{Arc, LazyLock, RwLock},
};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;
use vouch_core::activity::{ActivityAction, ActivityLogEntry, CorrelationSource, EntityType};

use crate::normalize::strip_emp_suffix;

// ─── Inbound message ─────────────────────────────────────────────────────────

/// The parts of an inbound mail the correlator and normalizer consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
  pub message_id:  String,
  #[serde(default)]
  pub in_reply_to: Option<String>,
  /// Raw `References` header: whitespace-separated `<id>` tokens.
  #[serde(default)]
  pub references:  Option<String>,
  #[serde(default)]
  pub subject:     String,
  #[serde(default)]
  pub from:        Option<String>,
  #[serde(default)]
  pub date:        Option<DateTime<Utc>>,
  /// Plain-text body part.
  #[serde(default)]
  pub body:        String,
}

impl InboundMessage {
  /// Every message id the thread headers point at, most direct first:
  /// `In-Reply-To`, then `References` newest to oldest.
  pub fn thread_ids(&self) -> Vec<String> {
    let mut ids: Vec<String> = self
      .in_reply_to
      .as_deref()
      .map(split_ids)
      .unwrap_or_default();
    if let Some(refs) = self.references.as_deref() {
      ids.extend(split_ids(refs).into_iter().rev());
    }
    ids
  }
}

fn split_ids(header: &str) -> Vec<String> {
  header
    .split(|c: char| c.is_whitespace() || c == ',')
    .map(normalize_message_id)
    .filter(|id| !id.is_empty())
    .collect()
}

/// Canonical registry key: surrounding whitespace and angle brackets removed.
pub fn normalize_message_id(raw: &str) -> String {
  raw
    .trim()
    .trim_start_matches('<')
    .trim_end_matches('>')
    .trim()
    .to_owned()
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Immutable mapping from sent message id to check id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
  by_message: BTreeMap<String, Uuid>,
}

impl Registry {
  /// Build from activity entries. Only `EMAIL_SENT` entries on checks
  /// contribute; everything else is ignored. Pure: the same entries always
  /// give the same registry.
  pub fn from_log<'a>(entries: impl IntoIterator<Item = &'a ActivityLogEntry>) -> Self {
    let by_message = entries
      .into_iter()
      .filter(|e| e.entity_type == EntityType::Check)
      .filter_map(|e| match &e.action {
        ActivityAction::EmailSent { message_id, .. } => {
          Some((normalize_message_id(message_id), e.entity_id))
        }
        _ => None,
      })
      .filter(|(id, _)| !id.is_empty())
      .collect();
    Self { by_message }
  }

  pub fn lookup(&self, message_id: &str) -> Option<Uuid> {
    self
      .by_message
      .get(&normalize_message_id(message_id))
      .copied()
  }

  pub fn len(&self) -> usize { self.by_message.len() }

  pub fn is_empty(&self) -> bool { self.by_message.is_empty() }

  /// SHA-256 over the sorted `(message_id, check_id)` pairs. Two registries
  /// with the same mapping have the same fingerprint.
  pub fn fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    for (message_id, check_id) in &self.by_message {
      hasher.update((message_id.len() as u64).to_le_bytes());
      hasher.update(message_id.as_bytes());
      hasher.update(check_id.as_bytes());
    }
    hex::encode(hasher.finalize())
  }
}

/// Shared, atomically swapped registry snapshot.
#[derive(Debug, Default)]
pub struct RegistryHandle {
  current: RwLock<Arc<Registry>>,
}

impl RegistryHandle {
  pub fn new(registry: Registry) -> Self {
    Self { current: RwLock::new(Arc::new(registry)) }
  }

  /// The current snapshot. Cheap: clones an `Arc`.
  pub fn snapshot(&self) -> Arc<Registry> {
    self
      .current
      .read()
      .map(|guard| Arc::clone(&guard))
      .unwrap_or_else(|poisoned| Arc::clone(&poisoned.into_inner()))
  }

  /// Replace the snapshot wholesale, returning the previous one.
  pub fn replace(&self, registry: Registry) -> Arc<Registry> {
    let next = Arc::new(registry);
    let mut guard = self
      .current
      .write()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    std::mem::replace(&mut *guard, next)
  }
}

// ─── Correlation ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
  Matched {
    check_id: Uuid,
    source:   CorrelationSource,
  },
  Unresolved,
}

impl Correlation {
  pub fn check_id(&self) -> Option<Uuid> {
    match self {
      Self::Matched { check_id, .. } => Some(*check_id),
      Self::Unresolved => None,
    }
  }
}

static RE_SUBJECT_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| {
  Regex::new(r"(?i)\[\s*check\s*[:#]?\s*#?\s*([A-Za-z0-9_-]+)\s*\]").ok()
});

static RE_BODY_REFERENCE: LazyLock<Option<Regex>> = LazyLock::new(|| {
  Regex::new(
    r"(?i)\b(?:check|verification|request|case)[ \t]*id\b[ \t]*[:#]?[ \t]*#?[ \t]*([A-Za-z0-9_-]+)",
  )
  .ok()
});

/// Parse an identifier token, dropping any `_EMP` suffix.
fn parse_token(token: &str) -> Option<Uuid> {
  Uuid::parse_str(strip_emp_suffix(token)).ok()
}

fn first_id(re: &LazyLock<Option<Regex>>, text: &str) -> Option<Uuid> {
  re.as_ref()?
    .captures_iter(text)
    .filter_map(|c| c.get(1))
    .find_map(|m| parse_token(m.as_str()))
}

/// Resolve `message` to a check id.
pub fn correlate(message: &InboundMessage, registry: &Registry) -> Correlation {
  if let Some(check_id) = message
    .thread_ids()
    .iter()
    .find_map(|id| registry.lookup(id))
  {
    return Correlation::Matched { check_id, source: CorrelationSource::Thread };
  }

  if let Some(check_id) = first_id(&RE_SUBJECT_TAG, &message.subject) {
    return Correlation::Matched {
      check_id,
      source: CorrelationSource::SubjectTag,
    };
  }

  if let Some(check_id) = first_id(&RE_BODY_REFERENCE, &message.body) {
    return Correlation::Matched {
      check_id,
      source: CorrelationSource::BodyReference,
    };
  }

  Correlation::Unresolved
}

/// The subject tag the outbound side embeds, e.g. `[Check: <id>]`.
pub fn subject_tag(check_id: Uuid) -> String { format!("[Check: {check_id}]") }

#[cfg(test)]
mod tests {
  use vouch_core::request::OutreachKind;

  use super::*;

  fn sent(check_id: Uuid, message_id: &str) -> ActivityLogEntry {
    ActivityLogEntry {
      entry_id:    Uuid::new_v4(),
      entity_type: EntityType::Check,
      entity_id:   check_id,
      action:      ActivityAction::EmailSent {
        request_id: Uuid::new_v4(),
        message_id: message_id.into(),
        to:         "hr@example.com".into(),
        subject:    "Verification".into(),
        kind:       OutreachKind::Initial,
      },
      note:        String::new(),
      recorded_at: Utc::now(),
    }
  }

  fn message(subject: &str, body: &str) -> InboundMessage {
    InboundMessage {
      message_id:  "<reply@hr.example.com>".into(),
      in_reply_to: None,
      references:  None,
      subject:     subject.into(),
      from:        Some("hr@example.com".into()),
      date:        None,
      body:        body.into(),
    }
  }

  #[test]
  fn thread_linkage_beats_subject_tag() {
    let threaded = Uuid::new_v4();
    let tagged = Uuid::new_v4();
    let registry = Registry::from_log(&[sent(threaded, "<out-1@vouch>")]);

    let mut msg = message(&format!("Re: Verification {}", subject_tag(tagged)), "");
    msg.in_reply_to = Some("<out-1@vouch>".into());

    assert_eq!(
      correlate(&msg, &registry),
      Correlation::Matched {
        check_id: threaded,
        source:   CorrelationSource::Thread,
      }
    );
  }

  #[test]
  fn references_header_is_searched() {
    let check_id = Uuid::new_v4();
    let registry = Registry::from_log(&[sent(check_id, "out-2@vouch")]);

    let mut msg = message("Re: hello", "");
    msg.references = Some("<unrelated@x> <out-2@vouch>".into());

    assert_eq!(correlate(&msg, &registry).check_id(), Some(check_id));
  }

  #[test]
  fn subject_tag_is_tolerant() {
    let check_id = Uuid::new_v4();
    for subject in [
      format!("RE: [Check: {check_id}]"),
      format!("re: [check #{check_id}]"),
      format!("Fwd: [ CHECK:#{check_id} ] details"),
    ] {
      let c = correlate(&message(&subject, ""), &Registry::default());
      assert_eq!(
        c,
        Correlation::Matched { check_id, source: CorrelationSource::SubjectTag },
        "subject: {subject}"
      );
    }
  }

  #[test]
  fn body_reference_strips_emp_suffix() {
    let check_id = Uuid::new_v4();
    let body = format!("Please see below.\nVerification ID: {check_id}_EMP\n");
    let c = correlate(&message("Re: your mail", &body), &Registry::default());
    assert_eq!(
      c,
      Correlation::Matched { check_id, source: CorrelationSource::BodyReference }
    );
  }

  #[test]
  fn unparseable_tokens_fall_through() {
    let check_id = Uuid::new_v4();
    let body = format!("Case ID: not-a-uuid\nCheck ID #{check_id}");
    let c = correlate(&message("[Check: junk]", &body), &Registry::default());
    assert_eq!(c.check_id(), Some(check_id));
  }

  #[test]
  fn nothing_matches() {
    let c = correlate(&message("Hello", "Who is this?"), &Registry::default());
    assert_eq!(c, Correlation::Unresolved);
  }

  #[test]
  fn rebuild_is_idempotent() {
    let log = vec![
      sent(Uuid::new_v4(), "<a@vouch>"),
      sent(Uuid::new_v4(), "<b@vouch>"),
    ];
    let first = Registry::from_log(&log);
    let second = Registry::from_log(&log);
    assert_eq!(first, second);
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.len(), 2);
  }

  #[test]
  fn non_email_entries_are_ignored() {
    let mut entry = sent(Uuid::new_v4(), "<a@vouch>");
    entry.action = ActivityAction::CheckStarted;
    let mut on_request = sent(Uuid::new_v4(), "<b@vouch>");
    on_request.entity_type = EntityType::Request;
    assert!(Registry::from_log(&[entry, on_request]).is_empty());
  }

  #[test]
  fn handle_swaps_whole_snapshots() {
    let handle = RegistryHandle::default();
    let before = handle.snapshot();
    assert!(before.is_empty());

    let check_id = Uuid::new_v4();
    handle.replace(Registry::from_log(&[sent(check_id, "<c@vouch>")]));

    // The old snapshot is untouched; the new one has the entry.
    assert!(before.is_empty());
    assert_eq!(handle.snapshot().lookup("c@vouch"), Some(check_id));
  }
}
