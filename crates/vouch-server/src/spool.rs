//! Directory-backed default collaborators.
//!
//! ```text
//! <spool>/outbox/<uuid>.json      one file per outbound message
//! <spool>/inbox/<name>.json       inbound messages awaiting ingestion
//! <spool>/processed/<name>.json   inbound messages already read
//! <spool>/sheets/<ref>.json       verification sheets
//! ```
//!
//! A relay, a mail fetcher or a human with a text editor sits on the other
//! side of each directory.

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vouch_engine::collab::{Mailbox, Mailer, OutboundMessage, SheetSource};
use vouch_extract::{InboundMessage, SheetDocument};

use crate::error::{Error, Result};

/// The spool root and its four subdirectories.
#[derive(Debug, Clone)]
pub struct Spool {
  root: PathBuf,
}

impl Spool {
  pub const INBOX: &str = "inbox";
  pub const OUTBOX: &str = "outbox";
  pub const PROCESSED: &str = "processed";
  pub const SHEETS: &str = "sheets";

  /// Open the spool at `root`, creating any missing directories.
  pub async fn create(root: impl Into<PathBuf>) -> Result<Self> {
    let root = root.into();
    for dir in [Self::INBOX, Self::OUTBOX, Self::PROCESSED, Self::SHEETS] {
      tokio::fs::create_dir_all(root.join(dir)).await?;
    }
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path { &self.root }

  /// `domain` is the right-hand side of generated message ids.
  pub fn mailer(&self, domain: &str) -> SpoolMailer {
    SpoolMailer {
      outbox: self.root.join(Self::OUTBOX),
      domain: domain.to_owned(),
    }
  }

  pub fn mailbox(&self) -> SpoolMailbox {
    SpoolMailbox {
      inbox:     self.root.join(Self::INBOX),
      processed: self.root.join(Self::PROCESSED),
    }
  }

  pub fn sheets(&self) -> SpoolSheets {
    SpoolSheets { dir: self.root.join(Self::SHEETS) }
  }
}

/// Refuse names that could leave their directory.
fn validate_name(name: &str) -> Result<()> {
  if name.is_empty()
    || name.starts_with('.')
    || name.contains("..")
    || name.contains('/')
    || name.contains('\\')
  {
    return Err(Error::InvalidName(name.to_owned()));
  }
  Ok(())
}

/// Write through a temporary file so readers never see a partial document.
async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<()> {
  let tmp = path.with_extension("json.tmp");
  tokio::fs::write(&tmp, bytes).await?;
  tokio::fs::rename(&tmp, path).await?;
  Ok(())
}

// ─── Outbound ─────────────────────────────────────────────────────────────────

/// What lands in the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpooledMessage {
  pub message_id: String,
  pub queued_at:  DateTime<Utc>,
  #[serde(flatten)]
  pub message:    OutboundMessage,
}

#[derive(Debug, Clone)]
pub struct SpoolMailer {
  outbox: PathBuf,
  domain: String,
}

impl Mailer for SpoolMailer {
  type Error = Error;

  async fn send(&self, message: OutboundMessage) -> Result<String> {
    let id = Uuid::new_v4();
    let message_id = format!("<{id}@{}>", self.domain);
    let spooled = SpooledMessage {
      message_id: message_id.clone(),
      queued_at: Utc::now(),
      message,
    };
    let bytes = serde_json::to_vec_pretty(&spooled)?;
    write_atomic(&self.outbox.join(format!("{id}.json")), bytes).await?;
    tracing::debug!(%message_id, to = %spooled.message.to, "message spooled");
    Ok(message_id)
  }
}

// ─── Inbound ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SpoolMailbox {
  inbox:     PathBuf,
  processed: PathBuf,
}

impl Mailbox for SpoolMailbox {
  type Error = Error;

  /// File names in the inbox, oldest name first.
  async fn list_unread(&self) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(&self.inbox).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some("json") {
        continue;
      }
      if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        names.push(name.to_owned());
      }
    }
    names.sort();
    Ok(names)
  }

  async fn fetch(&self, id: &str) -> Result<InboundMessage> {
    validate_name(id)?;
    let bytes = tokio::fs::read(self.inbox.join(id)).await?;
    Ok(serde_json::from_slice(&bytes)?)
  }

  async fn mark_read(&self, id: &str) -> Result<()> {
    validate_name(id)?;
    tokio::fs::rename(self.inbox.join(id), self.processed.join(id)).await?;
    Ok(())
  }
}

// ─── Sheets ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SpoolSheets {
  dir: PathBuf,
}

impl SpoolSheets {
  fn path(&self, document_ref: &str) -> Result<PathBuf> {
    validate_name(document_ref)?;
    Ok(self.dir.join(format!("{document_ref}.json")))
  }
}

impl SheetSource for SpoolSheets {
  type Error = Error;

  async fn fetch(&self, document_ref: &str) -> Result<Option<SheetDocument>> {
    let path = self.path(document_ref)?;
    let bytes = match tokio::fs::read(&path).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(e.into()),
    };
    let doc: SheetDocument = serde_json::from_slice(&bytes)?;
    doc.validate()?;
    Ok(Some(doc))
  }

  async fn publish(&self, document: SheetDocument) -> Result<()> {
    let path = self.path(&document.document_ref)?;
    document.validate()?;
    write_atomic(&path, serde_json::to_vec_pretty(&document)?).await
  }
}
