//! Reading employer replies: quote stripping, fact extraction, reply
//! correlation and the verification sheet layout.
//!
//! Everything here is pure; no I/O, no clock.

pub mod correlate;
pub mod error;
pub mod normalize;
pub mod sanitize;
pub mod sheet;

pub use correlate::{Correlation, InboundMessage, Registry, RegistryHandle, correlate};
pub use error::{Error, Result};
pub use normalize::{Extraction, normalize};
pub use sheet::{SheetDocument, SheetRow};
