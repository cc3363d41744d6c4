// htpipe/src/compose/data.rs

//! Composer for the data roles (`attachData`, `doWork`).
//!
//! `left` runs to completion first, then `right` sees `{...ctx, ...left_out}`.
//! The merged delta is `{...left_out, ...right_out}`. The two are awaited in
//! sequence, never concurrently: `right` may depend on `left`'s output.

use std::sync::Arc;

use tracing::{event, Level};

use super::{merged_capabilities, no_op_data, with_capabilities};
use crate::core::context::Context;
use crate::core::stage::{BoxFuture, DataFn, Stage};
use crate::error::StageResult;

pub fn compose_data(left: Option<Stage<DataFn>>, right: Option<Stage<DataFn>>) -> Stage<DataFn> {
  match (left, right) {
    (Some(left), Some(right)) => {
      let caps = merged_capabilities(&left, &right);
      let (lf, rf) = (left.func, right.func);
      let merged: Arc<DataFn> = Arc::new(move |ctx: Context| -> BoxFuture<StageResult<Context>> {
        let (lf, rf) = (Arc::clone(&lf), Arc::clone(&rf));
        Box::pin(async move {
          let mut left_out = lf(ctx.clone()).await?;
          let right_in = ctx.merged(&left_out);
          let right_out = rf(right_in).await?;
          event!(
            Level::TRACE,
            left_keys = left_out.len(),
            right_keys = right_out.len(),
            "Merged data stage deltas."
          );
          left_out.extend(right_out);
          Ok(left_out)
        })
      });
      with_capabilities(merged, caps)
    }
    (Some(only), None) | (None, Some(only)) => only,
    (None, None) => no_op_data(),
  }
}
