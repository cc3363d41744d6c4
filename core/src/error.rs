// htpipe/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

use crate::core::stage::Role;

/// Setup-time and dispatch-time errors raised by the library itself.
///
/// Failures *inside* a request execution never surface as `PipeError`; they are
/// mapped to an [`Outcome`](crate::Outcome) instead.
#[derive(Debug, Error)]
pub enum PipeError {
  #[error("Route already registered: {route}")]
  DuplicateRoute { route: String },

  #[error("Route not found: {route}")]
  RouteNotFound { route: String },

  #[error("Route '{route}' has no '{role}' stage")]
  MissingRole { route: String, role: Role },

  #[error("Stage '{role}' reads context key '{key}' which no earlier stage writes")]
  UnsatisfiedRead { role: Role, key: String },

  #[error("Configuration error for '{key}': {message}")]
  Config { key: String, message: String },

  #[error("Response sink failed. Source: {source}")]
  Sink {
    #[source]
    source: AnyhowError,
  },
}

pub type PipeResult<T, E = PipeError> = std::result::Result<T, E>;

/// Failure categories with fixed HTTP status semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
  Forbidden,
  NotFound,
  BadRequest,
  Internal,
}

impl ErrorCategory {
  pub fn status_code(self) -> u16 {
    match self {
      ErrorCategory::Forbidden => 403,
      ErrorCategory::NotFound => 404,
      ErrorCategory::BadRequest => 400,
      ErrorCategory::Internal => 500,
    }
  }

  /// Canonical reason phrase, safe to show to any client.
  pub fn reason(self) -> &'static str {
    match self {
      ErrorCategory::Forbidden => "Forbidden",
      ErrorCategory::NotFound => "Not Found",
      ErrorCategory::BadRequest => "Bad Request",
      ErrorCategory::Internal => "Internal Server Error",
    }
  }
}

impl std::fmt::Display for ErrorCategory {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.reason())
  }
}

/// A failure that already carries its category.
///
/// Stages raise this to override the category their lifecycle position would
/// otherwise assign.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{category}: {message}")]
pub struct HttpError {
  pub category: ErrorCategory,
  pub message: String,
}

impl HttpError {
  pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
    Self {
      category,
      message: message.into(),
    }
  }

  pub fn forbidden(message: impl Into<String>) -> Self {
    Self::new(ErrorCategory::Forbidden, message)
  }

  pub fn not_found(message: impl Into<String>) -> Self {
    Self::new(ErrorCategory::NotFound, message)
  }

  pub fn bad_request(message: impl Into<String>) -> Self {
    Self::new(ErrorCategory::BadRequest, message)
  }

  pub fn internal(message: impl Into<String>) -> Self {
    Self::new(ErrorCategory::Internal, message)
  }

  pub fn status_code(&self) -> u16 {
    self.category.status_code()
  }
}

pub const DEFAULT_REDIRECT_CODE: u16 = 302;

/// Deliberate control transfer. Not an error category: it passes through every
/// stage's error classification untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Redirect ({code}) to {url}")]
pub struct Redirect {
  pub url: String,
  pub code: u16,
}

impl Redirect {
  /// Redirect with the default `302 Found` code.
  pub fn to(url: impl Into<String>) -> Self {
    Self::with_code(url, DEFAULT_REDIRECT_CODE)
  }

  pub fn with_code(url: impl Into<String>, code: u16) -> Self {
    Self { url: url.into(), code }
  }
}

/// What any stage may fail with.
#[derive(Debug, Error)]
pub enum StageError {
  #[error(transparent)]
  Redirect(#[from] Redirect),

  #[error(transparent)]
  Classified(#[from] HttpError),

  /// Anything else. Collapses to the category of the stage it was raised in.
  #[error(transparent)]
  Unclassified(AnyhowError),
}

impl StageError {
  pub fn unclassified(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    StageError::Unclassified(AnyhowError::new(err))
  }

  pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
    StageError::Unclassified(AnyhowError::msg(message))
  }
}

// Collaborators often hand back `anyhow::Error`s that wrap one of our own
// signals; unwrap those instead of burying them as unclassified.
impl From<AnyhowError> for StageError {
  fn from(err: AnyhowError) -> Self {
    let err = match err.downcast::<StageError>() {
      Ok(stage_err) => return stage_err,
      Err(err) => err,
    };
    let err = match err.downcast::<Redirect>() {
      Ok(redirect) => return StageError::Redirect(redirect),
      Err(err) => err,
    };
    match err.downcast::<HttpError>() {
      Ok(http_err) => StageError::Classified(http_err),
      Err(err) => StageError::Unclassified(err),
    }
  }
}

impl From<serde_json::Error> for StageError {
  fn from(err: serde_json::Error) -> Self {
    StageError::unclassified(err)
  }
}

pub type StageResult<T> = std::result::Result<T, StageError>;
