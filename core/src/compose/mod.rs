// htpipe/src/compose/mod.rs

//! Pairwise merge algebra: combines two optional implementations of the same
//! role into one.
//!
//! Every composer follows the same outer shape:
//!  - both sides defined: role-specific merge (see the submodules);
//!  - one side defined: that side, unchanged;
//!  - neither defined: the role's default.

pub mod chain;
pub mod data;
pub mod gate;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use crate::core::context::Context;
use crate::core::gate::Gate;
use crate::core::input::SeedInput;
use crate::core::outcome::Response;
use crate::core::stage::{
  AsyncGateFn, BoxFuture, DataFn, InitFn, RespondFn, ResponseFilterFn, SanitizeFn, Stage, SyncGateFn,
};
use crate::error::StageResult;

pub use chain::{compose_override, compose_response_filter, compose_sanitizer};
pub use data::compose_data;
pub use gate::{compose_async_gate, compose_sync_gate};

/// Context keys the seed stage writes when `initPreContext` is not overridden.
pub const SEED_KEYS: [&str; 3] = ["params", "body", "principal"];

/// `reads = left.reads ∪ (right.reads − left.writes)`, `writes = left.writes ∪ right.writes`.
pub(crate) fn merged_capabilities<F: ?Sized>(left: &Stage<F>, right: &Stage<F>) -> (BTreeSet<String>, BTreeSet<String>) {
  let mut reads = left.reads.clone();
  reads.extend(right.reads.difference(&left.writes).cloned());
  let mut writes = left.writes.clone();
  writes.extend(right.writes.iter().cloned());
  (reads, writes)
}

/// Gate variant of [`merged_capabilities`]: the merged result is `right`'s,
/// so only `right`'s writes reach the running context. `left`'s writes still
/// satisfy `right`'s reads.
pub(crate) fn gated_capabilities<F: ?Sized>(left: &Stage<F>, right: &Stage<F>) -> (BTreeSet<String>, BTreeSet<String>) {
  let (reads, _) = merged_capabilities(left, right);
  (reads, right.writes.clone())
}

pub(crate) fn with_capabilities<F: ?Sized>(func: Arc<F>, caps: (BTreeSet<String>, BTreeSet<String>)) -> Stage<F> {
  Stage {
    func,
    reads: caps.0,
    writes: caps.1,
  }
}

// --- Role defaults ---

pub fn allow_all_sync() -> Stage<SyncGateFn> {
  let func: Arc<SyncGateFn> = Arc::new(|_ctx: &Context| -> StageResult<Gate> { Ok(Gate::Allow) });
  Stage::from_arc(func)
}

pub fn allow_all_async() -> Stage<AsyncGateFn> {
  let func: Arc<AsyncGateFn> =
    Arc::new(|_ctx: Context| -> BoxFuture<StageResult<Gate>> { Box::pin(async { Ok(Gate::Allow) }) });
  Stage::from_arc(func)
}

pub fn no_op_data() -> Stage<DataFn> {
  let func: Arc<DataFn> =
    Arc::new(|_ctx: Context| -> BoxFuture<StageResult<Context>> { Box::pin(async { Ok(Context::new()) }) });
  Stage::from_arc(func)
}

pub fn pass_through_sanitizer() -> Stage<SanitizeFn> {
  let func: Arc<SanitizeFn> = Arc::new(|value: Value| -> StageResult<Value> { Ok(value) });
  Stage::from_arc(func)
}

pub fn identity_response_filter() -> Stage<ResponseFilterFn> {
  let func: Arc<ResponseFilterFn> = Arc::new(|value: Value| value);
  Stage::from_arc(func)
}

/// `{params, body}` plus `principal` when the transport supplied one.
pub fn default_initializer() -> Stage<InitFn> {
  let func: Arc<InitFn> = Arc::new(|seed: SeedInput| -> StageResult<Context> {
    let mut ctx = Context::new().with("params", seed.params).with("body", seed.body);
    if let Some(principal) = seed.principal {
      ctx.insert("principal", principal);
    }
    Ok(ctx)
  });
  Stage::from_arc(func).writes(SEED_KEYS)
}

/// Used when a description reaches execution without a `respond` stage.
pub fn no_content_responder() -> Stage<RespondFn> {
  let func: Arc<RespondFn> = Arc::new(|_ctx: &Context| -> StageResult<Response> { Ok(Response::new(Value::Null, 204)) });
  Stage::from_arc(func)
}
