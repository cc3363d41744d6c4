// htpipe/src/core/gate.rs

//! The result type of the gating roles (`preAuthorize`, `finalAuthorize`).

use crate::core::context::Context;

/// Outcome of an authorization gate.
#[derive(Debug, Clone, PartialEq)]
pub enum Gate {
  /// Stop the pipeline with a `Forbidden` outcome.
  Deny,
  /// Proceed, contributing nothing to the context.
  Allow,
  /// Proceed and merge the delta into the context.
  ///
  /// An empty delta carries no authorization signal and counts as [`Gate::Deny`];
  /// see [`Gate::normalized`].
  AllowWith(Context),
}

impl Gate {
  /// Collapses `AllowWith(empty)` to `Deny`.
  pub fn normalized(self) -> Gate {
    match self {
      Gate::AllowWith(delta) if delta.is_empty() => Gate::Deny,
      other => other,
    }
  }

  pub fn is_allowed(&self) -> bool {
    match self {
      Gate::Deny => false,
      Gate::Allow => true,
      Gate::AllowWith(delta) => !delta.is_empty(),
    }
  }

  /// Context contribution of an allowing gate, if any.
  pub fn into_delta(self) -> Option<Context> {
    match self {
      Gate::AllowWith(delta) if !delta.is_empty() => Some(delta),
      _ => None,
    }
  }
}

impl From<bool> for Gate {
  fn from(allowed: bool) -> Self {
    if allowed {
      Gate::Allow
    } else {
      Gate::Deny
    }
  }
}

impl From<Context> for Gate {
  fn from(delta: Context) -> Self {
    Gate::AllowWith(delta).normalized()
  }
}
