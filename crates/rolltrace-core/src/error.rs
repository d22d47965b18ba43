//! Error types for `rolltrace-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A required input field was missing or blank.
  #[error("{0} required")]
  MissingField(&'static str),

  /// The QR resolved to a root that no roll was ever taken in under.
  #[error("roll not found for qr {0:?}")]
  RollNotFound(String),

  #[error("unknown roll status: {0:?}")]
  UnknownStatus(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
