//! [`SqliteStore`], the SQLite implementation of [`VerificationStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;
use vouch_core::{
  activity::{ActivityLogEntry, EntityType, NewActivity},
  case::{Case, CaseStatus, Client, NewCase},
  check::{Check, NewCheck},
  request::{NewRequest, OutreachEvent, RequestStatus, VerificationRequest},
  store::VerificationStore,
};

use crate::{
  Error, Result,
  encode::{
    RawActivity, RawCase, RawCheck, RawClient, RawEvent, RawRequest, encode_dt, encode_json,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A verification store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn insert_check(&self, check: &Check) -> Result<()> {
    let check_id = encode_uuid(check.check_id);
    let case_id = encode_uuid(check.case_id);
    let check_type = check.check_type.to_string();
    let claimed = encode_json(&check.claimed)?;
    let status = check.status.to_string();
    let zone = check.zone.to_string();
    let created_at = encode_dt(check.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO checks (check_id, case_id, check_type, claimed, status, zone, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![check_id, case_id, check_type, claimed, status, zone, created_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Select requests with their events attached, oldest first.
  async fn select_requests(
    &self,
    where_clause: &'static str,
    param: Option<String>,
  ) -> Result<Vec<VerificationRequest>> {
    let rows: Vec<(RawRequest, Vec<RawEvent>)> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM requests {where_clause} ORDER BY created_at, rowid",
          RawRequest::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let requests = match param {
          Some(p) => stmt
            .query_map(rusqlite::params![p], RawRequest::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map([], RawRequest::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };

        let mut events_stmt = conn.prepare(
          "SELECT kind, at, message_id FROM request_events
           WHERE request_id = ?1 ORDER BY seq",
        )?;
        let mut out = Vec::with_capacity(requests.len());
        for request in requests {
          let events = events_stmt
            .query_map(rusqlite::params![request.request_id], RawEvent::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          out.push((request, events));
        }
        Ok(out)
      })
      .await?;

    rows
      .into_iter()
      .map(|(request, events)| request.into_request(events))
      .collect()
  }
}

// ─── VerificationStore impl ──────────────────────────────────────────────────

impl VerificationStore for SqliteStore {
  type Error = Error;

  // ── Clients ───────────────────────────────────────────────────────────────

  async fn add_client(&self, name: String, tier: String) -> Result<Client> {
    let client = Client {
      client_id: Uuid::new_v4(),
      name,
      tier,
      created_at: Utc::now(),
    };

    let id = encode_uuid(client.client_id);
    let name = client.name.clone();
    let tier = client.tier.clone();
    let at = encode_dt(client.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO clients (client_id, name, tier, created_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id, name, tier, at],
        )?;
        Ok(())
      })
      .await?;

    Ok(client)
  }

  async fn get_client(&self, id: Uuid) -> Result<Option<Client>> {
    let id = encode_uuid(id);
    let raw: Option<RawClient> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM clients WHERE client_id = ?1", RawClient::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], RawClient::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawClient::into_client).transpose()
  }

  async fn list_clients(&self) -> Result<Vec<Client>> {
    let raws: Vec<RawClient> = self
      .conn
      .call(|conn| {
        let sql = format!(
          "SELECT {} FROM clients ORDER BY created_at, rowid",
          RawClient::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawClient::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawClient::into_client).collect()
  }

  async fn set_client_tier(&self, id: Uuid, tier: String) -> Result<Client> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE clients SET tier = ?2 WHERE client_id = ?1",
          rusqlite::params![id_str, tier],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::ClientNotFound(id));
    }
    self.get_client(id).await?.ok_or(Error::ClientNotFound(id))
  }

  // ── Cases ─────────────────────────────────────────────────────────────────

  async fn add_case(&self, input: NewCase) -> Result<Case> {
    if self.get_client(input.client_id).await?.is_none() {
      return Err(Error::ClientNotFound(input.client_id));
    }

    let case = Case {
      case_id:       Uuid::new_v4(),
      client_id:     input.client_id,
      employee_name: input.employee_name,
      status:        CaseStatus::Open,
      risk_level:    None,
      created_at:    Utc::now(),
    };

    let case_id = encode_uuid(case.case_id);
    let client_id = encode_uuid(case.client_id);
    let name = case.employee_name.clone();
    let status = case.status.to_string();
    let at = encode_dt(case.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO cases (case_id, client_id, employee_name, status, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![case_id, client_id, name, status, at],
        )?;
        Ok(())
      })
      .await?;

    Ok(case)
  }

  async fn get_case(&self, id: Uuid) -> Result<Option<Case>> {
    let id = encode_uuid(id);
    let raw: Option<RawCase> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM cases WHERE case_id = ?1", RawCase::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], RawCase::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCase::into_case).transpose()
  }

  async fn list_cases(&self, client_id: Option<Uuid>) -> Result<Vec<Case>> {
    let client_id = client_id.map(encode_uuid);
    let raws: Vec<RawCase> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(c) = client_id {
          let sql = format!(
            "SELECT {} FROM cases WHERE client_id = ?1 ORDER BY created_at, rowid",
            RawCase::COLUMNS
          );
          let mut stmt = conn.prepare(&sql)?;
          stmt
            .query_map(rusqlite::params![c], RawCase::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let sql = format!("SELECT {} FROM cases ORDER BY created_at, rowid", RawCase::COLUMNS);
          let mut stmt = conn.prepare(&sql)?;
          stmt
            .query_map([], RawCase::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCase::into_case).collect()
  }

  async fn save_case(&self, case: &Case) -> Result<()> {
    let case_id = case.case_id;
    let id = encode_uuid(case.case_id);
    let status = case.status.to_string();
    let risk = case.risk_level.map(|z| z.to_string());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE cases SET status = ?2, risk_level = ?3 WHERE case_id = ?1",
          rusqlite::params![id, status, risk],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::CaseNotFound(case_id));
    }
    Ok(())
  }

  // ── Checks ────────────────────────────────────────────────────────────────

  async fn add_check(&self, input: NewCheck) -> Result<Check> {
    if self.get_case(input.case_id).await?.is_none() {
      return Err(Error::CaseNotFound(input.case_id));
    }
    let check = Check::open(input, Utc::now());
    self.insert_check(&check).await?;
    Ok(check)
  }

  async fn get_check(&self, id: Uuid) -> Result<Option<Check>> {
    let id = encode_uuid(id);
    let raw: Option<RawCheck> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM checks WHERE check_id = ?1", RawCheck::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], RawCheck::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCheck::into_check).transpose()
  }

  async fn list_checks(&self, case_id: Uuid) -> Result<Vec<Check>> {
    let case_id = encode_uuid(case_id);
    let raws: Vec<RawCheck> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM checks WHERE case_id = ?1 ORDER BY created_at, rowid",
          RawCheck::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![case_id], RawCheck::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCheck::into_check).collect()
  }

  async fn save_check(&self, check: &Check) -> Result<Check> {
    let id = encode_uuid(check.check_id);
    let status = check.status.to_string();
    let zone = check.zone.to_string();
    let risk_score = check.risk_score.map(i64::from);
    let discrepancies = encode_json(&check.discrepancies)?;
    let matches = encode_json(&check.matches)?;
    let match_rate = check.match_rate;
    let verified = check.verified.as_ref().map(encode_json).transpose()?;
    let summary = check.summary.clone();
    let response_note = check.response_note.clone();
    let failure_reason = check.failure_reason.clone();
    let started_at = check.started_at.map(encode_dt);
    let completed_at = check.completed_at.map(encode_dt);
    let expected = check.version as i64;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE checks SET
             status = ?2, zone = ?3, risk_score = ?4, discrepancies = ?5,
             matches = ?6, match_rate = ?7, verified = ?8, summary = ?9,
             response_note = ?10, failure_reason = ?11, started_at = ?12,
             completed_at = ?13, version = version + 1
           WHERE check_id = ?1 AND version = ?14",
          rusqlite::params![
            id,
            status,
            zone,
            risk_score,
            discrepancies,
            matches,
            match_rate,
            verified,
            summary,
            response_note,
            failure_reason,
            started_at,
            completed_at,
            expected,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::VersionConflict(check.check_id));
    }
    Ok(Check { version: check.version + 1, ..check.clone() })
  }

  // ── Verification requests ─────────────────────────────────────────────────

  async fn add_request(&self, input: NewRequest) -> Result<VerificationRequest> {
    let request = VerificationRequest {
      request_id: Uuid::new_v4(),
      check_id:   input.check_id,
      claimed:    input.claimed,
      contact:    input.contact,
      channel:    input.channel,
      status:     RequestStatus::Pending,
      created_at: Utc::now(),
      events:     Vec::new(),
    };

    let id = encode_uuid(request.request_id);
    let check_id = request.check_id.map(encode_uuid);
    let claimed = encode_json(&request.claimed)?;
    let contact = request.contact.clone();
    let channel = request.channel.as_ref().map(encode_json).transpose()?;
    let status = request.status.to_string();
    let at = encode_dt(request.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO requests (request_id, check_id, claimed, contact, channel, status, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id, check_id, claimed, contact, channel, status, at],
        )?;
        Ok(())
      })
      .await?;

    Ok(request)
  }

  async fn get_request(&self, id: Uuid) -> Result<Option<VerificationRequest>> {
    Ok(
      self
        .select_requests("WHERE request_id = ?1", Some(encode_uuid(id)))
        .await?
        .into_iter()
        .next(),
    )
  }

  async fn request_for_check(&self, check_id: Uuid) -> Result<Option<VerificationRequest>> {
    Ok(
      self
        .select_requests("WHERE check_id = ?1", Some(encode_uuid(check_id)))
        .await?
        .pop(),
    )
  }

  async fn list_requests(
    &self,
    status: Option<RequestStatus>,
  ) -> Result<Vec<VerificationRequest>> {
    match status {
      Some(s) => self.select_requests("WHERE status = ?1", Some(s.to_string())).await,
      None => self.select_requests("", None).await,
    }
  }

  async fn append_event(&self, request_id: Uuid, event: OutreachEvent) -> Result<bool> {
    let id = encode_uuid(request_id);
    let kind = event.kind.to_string();
    let at = encode_dt(event.at);
    let message_id = event.message_id;

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row(
            "SELECT 1 FROM requests WHERE request_id = ?1",
            rusqlite::params![id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(None);
        }
        let n = tx.execute(
          "INSERT OR IGNORE INTO request_events (request_id, kind, at, message_id)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id, kind, at, message_id],
        )?;
        tx.commit()?;
        Ok(Some(n == 1))
      })
      .await?;

    inserted.ok_or(Error::RequestNotFound(request_id))
  }

  async fn set_request_status(&self, request_id: Uuid, status: RequestStatus) -> Result<()> {
    let id = encode_uuid(request_id);
    let status = status.to_string();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE requests SET status = ?2 WHERE request_id = ?1",
          rusqlite::params![id, status],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::RequestNotFound(request_id));
    }
    Ok(())
  }

  // ── Activity log ──────────────────────────────────────────────────────────

  async fn append_activity(&self, input: NewActivity) -> Result<ActivityLogEntry> {
    let entry = ActivityLogEntry {
      entry_id:    Uuid::new_v4(),
      entity_type: input.entity_type,
      entity_id:   input.entity_id,
      action:      input.action,
      note:        input.note,
      recorded_at: Utc::now(),
    };

    let entry_id = encode_uuid(entry.entry_id);
    let entity_type = entry.entity_type.to_string();
    let entity_id = encode_uuid(entry.entity_id);
    let action = entry.action.discriminant().to_owned();
    let metadata = entry.action.to_json()?.to_string();
    let note = entry.note.clone();
    let at = encode_dt(entry.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO activity (entry_id, entity_type, entity_id, action, metadata, note, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![entry_id, entity_type, entity_id, action, metadata, note, at],
        )?;
        Ok(())
      })
      .await?;

    Ok(entry)
  }

  async fn list_activity(
    &self,
    entity_type: EntityType,
    entity_id: Option<Uuid>,
  ) -> Result<Vec<ActivityLogEntry>> {
    let entity_type = entity_type.to_string();
    let entity_id = entity_id.map(encode_uuid);

    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| {
        let base = format!("SELECT {} FROM activity WHERE entity_type = ?1", RawActivity::COLUMNS);
        let rows = if let Some(id) = entity_id {
          let mut stmt = conn.prepare(&format!("{base} AND entity_id = ?2 ORDER BY seq"))?;
          stmt
            .query_map(rusqlite::params![entity_type, id], RawActivity::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!("{base} ORDER BY seq"))?;
          stmt
            .query_map(rusqlite::params![entity_type], RawActivity::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActivity::into_entry).collect()
  }
}
