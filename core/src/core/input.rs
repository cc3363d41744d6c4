// htpipe/src/core/input.rs

//! Raw request input as handed over by a transport adapter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unvalidated request input. Nothing in here is trusted until the
/// `sanitizeParams`/`sanitizeBody` stages have run over it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnsafeInput {
  #[serde(default)]
  pub params: Value,
  #[serde(default)]
  pub body: Value,
  /// Side channel for the authenticated principal, looked up by the transport.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub principal: Option<Value>,
}

impl UnsafeInput {
  pub fn new(params: Value, body: Value) -> Self {
    Self {
      params,
      body,
      principal: None,
    }
  }

  pub fn with_params(params: Value) -> Self {
    Self::new(params, Value::Null)
  }

  pub fn principal(mut self, principal: impl Into<Value>) -> Self {
    self.principal = Some(principal.into());
    self
  }
}

/// Input after sanitation, fed to `initPreContext`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedInput {
  pub params: Value,
  pub body: Value,
  pub principal: Option<Value>,
}
