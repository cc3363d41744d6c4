// htpipe/src/compose/chain.rs

//! Composers for roles that are not gates or data contributors.
//!
//! Sanitizers chain (left's output is right's input). `respond` and
//! `initPreContext` are single-assignment: the later implementation replaces
//! the earlier one.

use std::sync::Arc;

use serde_json::Value;
use tracing::{event, Level};

use super::{identity_response_filter, merged_capabilities, pass_through_sanitizer, with_capabilities};
use crate::core::stage::{ResponseFilterFn, SanitizeFn, Stage};
use crate::error::StageResult;

pub fn compose_sanitizer(left: Option<Stage<SanitizeFn>>, right: Option<Stage<SanitizeFn>>) -> Stage<SanitizeFn> {
  match (left, right) {
    (Some(left), Some(right)) => {
      let caps = merged_capabilities(&left, &right);
      let (lf, rf) = (left.func, right.func);
      let merged: Arc<SanitizeFn> = Arc::new(move |value: Value| -> StageResult<Value> { rf(lf(value)?) });
      with_capabilities(merged, caps)
    }
    (Some(only), None) | (None, Some(only)) => only,
    (None, None) => pass_through_sanitizer(),
  }
}

pub fn compose_response_filter(
  left: Option<Stage<ResponseFilterFn>>,
  right: Option<Stage<ResponseFilterFn>>,
) -> Stage<ResponseFilterFn> {
  match (left, right) {
    (Some(left), Some(right)) => {
      let caps = merged_capabilities(&left, &right);
      let (lf, rf) = (left.func, right.func);
      let merged: Arc<ResponseFilterFn> = Arc::new(move |value: Value| rf(lf(value)));
      with_capabilities(merged, caps)
    }
    (Some(only), None) | (None, Some(only)) => only,
    (None, None) => identity_response_filter(),
  }
}

/// Later wins. Returns `None` only when neither side is defined; single-assignment
/// roles have their defaults applied at execution time.
pub fn compose_override<F: ?Sized>(left: Option<Stage<F>>, right: Option<Stage<F>>) -> Option<Stage<F>> {
  match (left, right) {
    (Some(_), Some(right)) => {
      event!(Level::DEBUG, "Single-assignment stage replaced by a later fragment.");
      Some(right)
    }
    (left, None) => left,
    (None, right) => right,
  }
}
