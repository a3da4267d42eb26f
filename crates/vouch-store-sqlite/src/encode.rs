//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase, enums their
//! SCREAMING_SNAKE_CASE display form. Fact records, channels, discrepancy
//! lists and activity payloads are compact JSON.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;
use vouch_core::{
  activity::{ActivityAction, ActivityLogEntry},
  case::{Case, Client},
  check::Check,
  request::{OutreachEvent, VerificationRequest},
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

/// Parse a display-form enum column.
pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::Decode { column, value: s.to_owned() })
}

pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `clients` row.
pub struct RawClient {
  pub client_id:  String,
  pub name:       String,
  pub tier:       String,
  pub created_at: String,
}

impl RawClient {
  pub const COLUMNS: &'static str = "client_id, name, tier, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      client_id:  row.get(0)?,
      name:       row.get(1)?,
      tier:       row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_client(self) -> Result<Client> {
    Ok(Client {
      client_id:  decode_uuid(&self.client_id)?,
      name:       self.name,
      tier:       self.tier,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `cases` row.
pub struct RawCase {
  pub case_id:       String,
  pub client_id:     String,
  pub employee_name: String,
  pub status:        String,
  pub risk_level:    Option<String>,
  pub created_at:    String,
}

impl RawCase {
  pub const COLUMNS: &'static str =
    "case_id, client_id, employee_name, status, risk_level, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      case_id:       row.get(0)?,
      client_id:     row.get(1)?,
      employee_name: row.get(2)?,
      status:        row.get(3)?,
      risk_level:    row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  pub fn into_case(self) -> Result<Case> {
    Ok(Case {
      case_id:       decode_uuid(&self.case_id)?,
      client_id:     decode_uuid(&self.client_id)?,
      employee_name: self.employee_name,
      status:        decode_enum("cases.status", &self.status)?,
      risk_level:    self
        .risk_level
        .as_deref()
        .map(|z| decode_enum("cases.risk_level", z))
        .transpose()?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `checks` row.
pub struct RawCheck {
  pub check_id:       String,
  pub case_id:        String,
  pub check_type:     String,
  pub claimed:        String,
  pub status:         String,
  pub zone:           String,
  pub risk_score:     Option<i64>,
  pub discrepancies:  String,
  pub matches:        String,
  pub match_rate:     Option<f64>,
  pub verified:       Option<String>,
  pub summary:        Option<String>,
  pub response_note:  Option<String>,
  pub failure_reason: Option<String>,
  pub created_at:     String,
  pub started_at:     Option<String>,
  pub completed_at:   Option<String>,
  pub version:        i64,
}

impl RawCheck {
  pub const COLUMNS: &'static str = "check_id, case_id, check_type, claimed, status, zone, \
     risk_score, discrepancies, matches, match_rate, verified, summary, response_note, \
     failure_reason, created_at, started_at, completed_at, version";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      check_id:       row.get(0)?,
      case_id:        row.get(1)?,
      check_type:     row.get(2)?,
      claimed:        row.get(3)?,
      status:         row.get(4)?,
      zone:           row.get(5)?,
      risk_score:     row.get(6)?,
      discrepancies:  row.get(7)?,
      matches:        row.get(8)?,
      match_rate:     row.get(9)?,
      verified:       row.get(10)?,
      summary:        row.get(11)?,
      response_note:  row.get(12)?,
      failure_reason: row.get(13)?,
      created_at:     row.get(14)?,
      started_at:     row.get(15)?,
      completed_at:   row.get(16)?,
      version:        row.get(17)?,
    })
  }

  pub fn into_check(self) -> Result<Check> {
    let risk_score = self
      .risk_score
      .map(|s| {
        u8::try_from(s).map_err(|_| Error::Decode {
          column: "checks.risk_score",
          value:  s.to_string(),
        })
      })
      .transpose()?;

    Ok(Check {
      check_id: decode_uuid(&self.check_id)?,
      case_id: decode_uuid(&self.case_id)?,
      check_type: decode_enum("checks.check_type", &self.check_type)?,
      claimed: decode_json(&self.claimed)?,
      status: decode_enum("checks.status", &self.status)?,
      zone: decode_enum("checks.zone", &self.zone)?,
      risk_score,
      discrepancies: decode_json(&self.discrepancies)?,
      matches: decode_json(&self.matches)?,
      match_rate: self.match_rate,
      verified: self.verified.as_deref().map(decode_json).transpose()?,
      summary: self.summary,
      response_note: self.response_note,
      failure_reason: self.failure_reason,
      created_at: decode_dt(&self.created_at)?,
      started_at: decode_opt_dt(self.started_at)?,
      completed_at: decode_opt_dt(self.completed_at)?,
      version: self.version.max(0) as u64,
    })
  }
}

/// Raw strings read directly from a `requests` row. Events are loaded
/// separately and attached in [`RawRequest::into_request`].
pub struct RawRequest {
  pub request_id: String,
  pub check_id:   Option<String>,
  pub claimed:    String,
  pub contact:    String,
  pub channel:    Option<String>,
  pub status:     String,
  pub created_at: String,
}

impl RawRequest {
  pub const COLUMNS: &'static str =
    "request_id, check_id, claimed, contact, channel, status, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      request_id: row.get(0)?,
      check_id:   row.get(1)?,
      claimed:    row.get(2)?,
      contact:    row.get(3)?,
      channel:    row.get(4)?,
      status:     row.get(5)?,
      created_at: row.get(6)?,
    })
  }

  pub fn into_request(self, events: Vec<RawEvent>) -> Result<VerificationRequest> {
    Ok(VerificationRequest {
      request_id: decode_uuid(&self.request_id)?,
      check_id:   self.check_id.as_deref().map(decode_uuid).transpose()?,
      claimed:    decode_json(&self.claimed)?,
      contact:    self.contact,
      channel:    self.channel.as_deref().map(decode_json).transpose()?,
      status:     decode_enum("requests.status", &self.status)?,
      created_at: decode_dt(&self.created_at)?,
      events:     events
        .into_iter()
        .map(RawEvent::into_event)
        .collect::<Result<_>>()?,
    })
  }
}

/// Raw strings read directly from a `request_events` row.
pub struct RawEvent {
  pub kind:       String,
  pub at:         String,
  pub message_id: Option<String>,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      kind:       row.get(0)?,
      at:         row.get(1)?,
      message_id: row.get(2)?,
    })
  }

  pub fn into_event(self) -> Result<OutreachEvent> {
    Ok(OutreachEvent {
      kind:       self.kind.parse()?,
      at:         decode_dt(&self.at)?,
      message_id: self.message_id,
    })
  }
}

/// Raw strings read directly from an `activity` row.
pub struct RawActivity {
  pub entry_id:    String,
  pub entity_type: String,
  pub entity_id:   String,
  pub action:      String,
  pub metadata:    String,
  pub note:        String,
  pub recorded_at: String,
}

impl RawActivity {
  pub const COLUMNS: &'static str =
    "entry_id, entity_type, entity_id, action, metadata, note, recorded_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entry_id:    row.get(0)?,
      entity_type: row.get(1)?,
      entity_id:   row.get(2)?,
      action:      row.get(3)?,
      metadata:    row.get(4)?,
      note:        row.get(5)?,
      recorded_at: row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<ActivityLogEntry> {
    let metadata: serde_json::Value = serde_json::from_str(&self.metadata)?;
    Ok(ActivityLogEntry {
      entry_id:    decode_uuid(&self.entry_id)?,
      entity_type: decode_enum("activity.entity_type", &self.entity_type)?,
      entity_id:   decode_uuid(&self.entity_id)?,
      action:      ActivityAction::from_parts(&self.action, metadata)?,
      note:        self.note,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
