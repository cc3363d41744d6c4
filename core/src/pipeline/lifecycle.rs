// htpipe/src/pipeline/lifecycle.rs

//! Lifecycle states of one execution and the failure-to-outcome mapping.

use tracing::{event, Level};

use crate::core::outcome::Outcome;
use crate::error::{ErrorCategory, HttpError, StageError};

/// Non-terminal states, in the fixed order they are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
  Initializing,
  PreAuthorizing,
  AttachingData,
  FinalAuthorizing,
  Working,
  Responding,
}

impl LifecycleState {
  /// Category for an unclassified failure raised while in this state.
  pub fn default_category(self) -> ErrorCategory {
    match self {
      LifecycleState::Initializing => ErrorCategory::BadRequest,
      LifecycleState::PreAuthorizing | LifecycleState::FinalAuthorizing => ErrorCategory::Forbidden,
      LifecycleState::AttachingData => ErrorCategory::NotFound,
      LifecycleState::Working | LifecycleState::Responding => ErrorCategory::Internal,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      LifecycleState::Initializing => "Initializing",
      LifecycleState::PreAuthorizing => "PreAuthorizing",
      LifecycleState::AttachingData => "AttachingData",
      LifecycleState::FinalAuthorizing => "FinalAuthorizing",
      LifecycleState::Working => "Working",
      LifecycleState::Responding => "Responding",
    }
  }
}

impl std::fmt::Display for LifecycleState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

/// A stage failure together with where it happened.
#[derive(Debug)]
pub struct Interrupt {
  pub state: LifecycleState,
  pub error: StageError,
}

impl Interrupt {
  pub fn new(state: LifecycleState, error: StageError) -> Self {
    Self { state, error }
  }

  /// Closure form for `map_err`.
  pub fn at(state: LifecycleState) -> impl Fn(StageError) -> Interrupt {
    move |error| Interrupt::new(state, error)
  }
}

/// Redirects and pre-classified errors pass through untouched; anything else
/// takes the category of the state it was raised in.
pub fn map_failure(interrupt: Interrupt) -> Outcome {
  let Interrupt { state, error } = interrupt;
  match error {
    StageError::Redirect(redirect) => {
      event!(Level::DEBUG, %state, url = %redirect.url, code = redirect.code, "Stage redirected.");
      Outcome::Redirected {
        url: redirect.url,
        code: redirect.code,
      }
    }
    StageError::Classified(http_err) => {
      event!(Level::WARN, %state, category = %http_err.category, error = %http_err.message, "Stage raised a classified error.");
      Outcome::Failed(http_err)
    }
    StageError::Unclassified(source) => {
      let category = state.default_category();
      if category == ErrorCategory::Internal {
        event!(Level::ERROR, %state, error = %source, "Stage failed unexpectedly.");
      } else {
        event!(Level::WARN, %state, %category, error = %source, "Stage failed; applying position default.");
      }
      Outcome::Failed(HttpError::new(category, source.to_string()))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Redirect;

  #[test]
  fn unclassified_failures_take_the_position_default() {
    let cases = [
      (LifecycleState::Initializing, ErrorCategory::BadRequest),
      (LifecycleState::PreAuthorizing, ErrorCategory::Forbidden),
      (LifecycleState::AttachingData, ErrorCategory::NotFound),
      (LifecycleState::FinalAuthorizing, ErrorCategory::Forbidden),
      (LifecycleState::Working, ErrorCategory::Internal),
      (LifecycleState::Responding, ErrorCategory::Internal),
    ];
    for (state, expected) in cases {
      let outcome = map_failure(Interrupt::new(state, StageError::msg("boom")));
      assert_eq!(outcome.category(), Some(expected), "state {}", state);
    }
  }

  #[test]
  fn classified_and_redirect_pass_through_every_state() {
    let outcome = map_failure(Interrupt::new(
      LifecycleState::Working,
      HttpError::bad_request("name too long").into(),
    ));
    assert_eq!(outcome, Outcome::Failed(HttpError::bad_request("name too long")));

    let outcome = map_failure(Interrupt::new(
      LifecycleState::AttachingData,
      Redirect::with_code("/moved", 301).into(),
    ));
    assert_eq!(
      outcome,
      Outcome::Redirected {
        url: "/moved".into(),
        code: 301
      }
    );
  }
}
