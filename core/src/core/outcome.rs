// htpipe/src/core/outcome.rs

//! Terminal results of one pipeline execution and their hand-off to a transport.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::PipeConfig;
use crate::error::{ErrorCategory, HttpError, PipeError, PipeResult};

/// What `respond` produces: a raw body that still has to pass `sanitizeResponse`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
  pub unsafe_response: Value,
  pub status: u16,
}

impl Response {
  pub fn new(unsafe_response: impl Into<Value>, status: u16) -> Self {
    Self {
      unsafe_response: unsafe_response.into(),
      status,
    }
  }

  pub fn ok(unsafe_response: impl Into<Value>) -> Self {
    Self::new(unsafe_response, 200)
  }

  pub fn created(unsafe_response: impl Into<Value>) -> Self {
    Self::new(unsafe_response, 201)
  }
}

/// Exactly one of these ends every execution. Built fresh per request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  Success { status: u16, body: Value },
  Redirected { url: String, code: u16 },
  Failed(HttpError),
}

impl Outcome {
  pub fn status_code(&self) -> u16 {
    match self {
      Outcome::Success { status, .. } => *status,
      Outcome::Redirected { code, .. } => *code,
      Outcome::Failed(err) => err.status_code(),
    }
  }

  pub fn is_success(&self) -> bool {
    matches!(self, Outcome::Success { .. })
  }

  pub fn category(&self) -> Option<ErrorCategory> {
    match self {
      Outcome::Failed(err) => Some(err.category),
      _ => None,
    }
  }

  /// Wire shape for adapters that just serialize what they get.
  ///
  /// `Internal` failures are always masked. Other categories show their
  /// message only when `expose_error_detail` is set.
  pub fn to_wire(&self, config: &PipeConfig) -> WireResponse {
    match self {
      Outcome::Success { status, body } => WireResponse::Json {
        status: *status,
        body: body.clone(),
      },
      Outcome::Redirected { url, code } => WireResponse::Redirect {
        redirect_url: url.clone(),
        redirect_code: *code,
      },
      Outcome::Failed(err) => {
        let message = match err.category {
          ErrorCategory::Internal => err.category.reason().to_string(),
          _ if config.expose_error_detail => err.message.clone(),
          _ => err.category.reason().to_string(),
        };
        WireResponse::Json {
          status: err.status_code(),
          body: json!({ "error": message }),
        }
      }
    }
  }

  /// Hands the outcome to a sink. Exactly one sink method is called.
  pub async fn deliver(self, sink: &mut dyn ResponseSink) -> PipeResult<()> {
    let sent = match self {
      Outcome::Success { status, body } => sink.send_json(status, body).await,
      Outcome::Redirected { url, code } => sink.send_redirect(url, code).await,
      Outcome::Failed(err) => sink.send_error(err).await,
    };
    sent.map_err(|source| PipeError::Sink { source })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireResponse {
  Json {
    status: u16,
    body: Value,
  },
  #[serde(rename_all = "camelCase")]
  Redirect { redirect_url: String, redirect_code: u16 },
}

/// The transport adapter's receiving end.
#[async_trait]
pub trait ResponseSink: Send {
  async fn send_json(&mut self, status: u16, body: Value) -> anyhow::Result<()>;

  async fn send_redirect(&mut self, url: String, code: u16) -> anyhow::Result<()>;

  /// Receives the classified failure as-is; translating it to a 4xx/5xx
  /// response (without leaking `Internal` detail) is the adapter's job.
  async fn send_error(&mut self, err: HttpError) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn internal_detail_never_reaches_the_wire() {
    let outcome = Outcome::Failed(HttpError::internal("db password is hunter2"));
    let config = PipeConfig::default().expose_error_detail(true);
    let wire = outcome.to_wire(&config);
    assert_eq!(
      wire,
      WireResponse::Json {
        status: 500,
        body: json!({"error": "Internal Server Error"})
      }
    );
  }

  #[test]
  fn client_error_detail_is_opt_in() {
    let outcome = Outcome::Failed(HttpError::bad_request("name is required"));
    let hidden = outcome.to_wire(&PipeConfig::default());
    assert_eq!(
      hidden,
      WireResponse::Json {
        status: 400,
        body: json!({"error": "Bad Request"})
      }
    );
    let shown = outcome.to_wire(&PipeConfig::default().expose_error_detail(true));
    assert_eq!(
      shown,
      WireResponse::Json {
        status: 400,
        body: json!({"error": "name is required"})
      }
    );
  }

  #[test]
  fn redirect_serializes_camel_case() {
    let wire = Outcome::Redirected {
      url: "/login".into(),
      code: 302,
    }
    .to_wire(&PipeConfig::default());
    let v = serde_json::to_value(&wire).unwrap();
    assert_eq!(v, json!({"redirectUrl": "/login", "redirectCode": 302}));
  }
}
