// htpipe/src/compose/gate.rs

//! Composers for the gating roles (`preAuthorize` sync, `finalAuthorize` async).
//!
//! `left` always runs first. What happens next depends on its result:
//!
//! | left               | right invoked with       | merged result              |
//! |--------------------|--------------------------|----------------------------|
//! | `Deny`             | never                    | `Deny`                     |
//! | `AllowWith(empty)` | never                    | `Deny`                     |
//! | `Allow`            | `ctx`                    | right, normalized          |
//! | `AllowWith(delta)` | `{...ctx, ...delta}`     | right, normalized          |
//!
//! "Normalized" means an `AllowWith(empty)` from `right` counts as `Deny`.
//! Note that a plain `Allow` from `right` drops `left`'s delta: the merged
//! result is `right`'s result verbatim. Accordingly the merged stage declares
//! only `right`'s writes.

use std::sync::Arc;

use tracing::{event, Level};

use super::{allow_all_async, allow_all_sync, gated_capabilities, with_capabilities};
use crate::core::context::Context;
use crate::core::gate::Gate;
use crate::core::stage::{AsyncGateFn, BoxFuture, Stage, SyncGateFn};
use crate::error::StageResult;

/// What to do after `left` has answered.
enum AfterLeft {
  ShortCircuit,
  /// Run `right` on the unchanged input.
  SameInput,
  /// Run `right` on the input extended with `left`'s delta.
  Extended(Context),
}

fn after_left(ctx: &Context, left: Gate) -> AfterLeft {
  match left {
    Gate::Deny => AfterLeft::ShortCircuit,
    Gate::Allow => AfterLeft::SameInput,
    Gate::AllowWith(delta) if delta.is_empty() => AfterLeft::ShortCircuit,
    Gate::AllowWith(delta) => AfterLeft::Extended(ctx.merged(&delta)),
  }
}

pub fn compose_sync_gate(left: Option<Stage<SyncGateFn>>, right: Option<Stage<SyncGateFn>>) -> Stage<SyncGateFn> {
  match (left, right) {
    (Some(left), Some(right)) => {
      let caps = gated_capabilities(&left, &right);
      let (lf, rf) = (left.func, right.func);
      let merged: Arc<SyncGateFn> = Arc::new(move |ctx: &Context| -> StageResult<Gate> {
        match after_left(ctx, lf(ctx)?) {
          AfterLeft::ShortCircuit => {
            event!(Level::TRACE, "Left gate denied; right gate skipped.");
            Ok(Gate::Deny)
          }
          AfterLeft::SameInput => Ok(rf(ctx)?.normalized()),
          AfterLeft::Extended(right_in) => Ok(rf(&right_in)?.normalized()),
        }
      });
      with_capabilities(merged, caps)
    }
    (Some(only), None) | (None, Some(only)) => only,
    (None, None) => allow_all_sync(),
  }
}

pub fn compose_async_gate(left: Option<Stage<AsyncGateFn>>, right: Option<Stage<AsyncGateFn>>) -> Stage<AsyncGateFn> {
  match (left, right) {
    (Some(left), Some(right)) => {
      let caps = gated_capabilities(&left, &right);
      let (lf, rf) = (left.func, right.func);
      let merged: Arc<AsyncGateFn> = Arc::new(move |ctx: Context| -> BoxFuture<StageResult<Gate>> {
        let (lf, rf) = (Arc::clone(&lf), Arc::clone(&rf));
        Box::pin(async move {
          let left_result = lf(ctx.clone()).await?;
          let right_in = match after_left(&ctx, left_result) {
            AfterLeft::ShortCircuit => {
              event!(Level::TRACE, "Left gate denied; right gate skipped.");
              return Ok(Gate::Deny);
            }
            AfterLeft::SameInput => ctx,
            AfterLeft::Extended(right_in) => right_in,
          };
          Ok(rf(right_in).await?.normalized())
        })
      });
      with_capabilities(merged, caps)
    }
    (Some(only), None) | (None, Some(only)) => only,
    (None, None) => allow_all_async(),
  }
}
