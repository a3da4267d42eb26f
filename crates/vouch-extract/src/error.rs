use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("sheet {document_ref} does not match the verification layout: {reason}")]
  SheetLayout { document_ref: String, reason: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
