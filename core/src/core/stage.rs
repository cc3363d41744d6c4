// htpipe/src/core/stage.rs

//! The stage contract: the erased function shapes every lifecycle role must
//! satisfy, and `Stage<F>`, which pairs such a function with its declared
//! context capabilities.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::core::context::Context;
use crate::core::gate::Gate;
use crate::core::input::SeedInput;
use crate::core::outcome::Response;
use crate::error::StageResult;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// `initPreContext`: builds the seed context from sanitized input.
pub type InitFn = dyn Fn(SeedInput) -> StageResult<Context> + Send + Sync;
/// `sanitizeParams` / `sanitizeBody`.
pub type SanitizeFn = dyn Fn(Value) -> StageResult<Value> + Send + Sync;
/// `preAuthorize`. Synchronous by contract: it must stay cheap.
pub type SyncGateFn = dyn Fn(&Context) -> StageResult<Gate> + Send + Sync;
/// `finalAuthorize`. Asynchronous, may look at data attached earlier.
pub type AsyncGateFn = dyn Fn(Context) -> BoxFuture<StageResult<Gate>> + Send + Sync;
/// `attachData` / `doWork`: context in, delta out.
pub type DataFn = dyn Fn(Context) -> BoxFuture<StageResult<Context>> + Send + Sync;
/// `respond`.
pub type RespondFn = dyn Fn(&Context) -> StageResult<Response> + Send + Sync;
/// `sanitizeResponse`. Infallible: it only strips or filters.
pub type ResponseFilterFn = dyn Fn(Value) -> Value + Send + Sync;

/// Lifecycle roles, listed in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
  SanitizeParams,
  SanitizeBody,
  InitPreContext,
  PreAuthorize,
  AttachData,
  FinalAuthorize,
  DoWork,
  Respond,
  SanitizeResponse,
}

impl Role {
  pub const ALL: [Role; 9] = [
    Role::SanitizeParams,
    Role::SanitizeBody,
    Role::InitPreContext,
    Role::PreAuthorize,
    Role::AttachData,
    Role::FinalAuthorize,
    Role::DoWork,
    Role::Respond,
    Role::SanitizeResponse,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Role::SanitizeParams => "sanitizeParams",
      Role::SanitizeBody => "sanitizeBody",
      Role::InitPreContext => "initPreContext",
      Role::PreAuthorize => "preAuthorize",
      Role::AttachData => "attachData",
      Role::FinalAuthorize => "finalAuthorize",
      Role::DoWork => "doWork",
      Role::Respond => "respond",
      Role::SanitizeResponse => "sanitizeResponse",
    }
  }
}

impl std::fmt::Display for Role {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

/// One implementation of a role, plus the context keys it says it reads and writes.
///
/// Declarations are optional. A stage that declares nothing is never flagged by
/// the capability check, and contributes no keys to it either.
pub struct Stage<F: ?Sized> {
  pub(crate) func: Arc<F>,
  pub(crate) reads: BTreeSet<String>,
  pub(crate) writes: BTreeSet<String>,
}

impl<F: ?Sized> Stage<F> {
  pub fn from_arc(func: Arc<F>) -> Self {
    Self {
      func,
      reads: BTreeSet::new(),
      writes: BTreeSet::new(),
    }
  }

  pub fn reads<I, S>(mut self, keys: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.reads.extend(keys.into_iter().map(Into::into));
    self
  }

  pub fn writes<I, S>(mut self, keys: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.writes.extend(keys.into_iter().map(Into::into));
    self
  }

  pub fn declared_reads(&self) -> &BTreeSet<String> {
    &self.reads
  }

  pub fn declared_writes(&self) -> &BTreeSet<String> {
    &self.writes
  }

  pub fn func(&self) -> &Arc<F> {
    &self.func
  }
}

impl<F: ?Sized> Clone for Stage<F> {
  fn clone(&self) -> Self {
    Self {
      func: Arc::clone(&self.func),
      reads: self.reads.clone(),
      writes: self.writes.clone(),
    }
  }
}

impl<F: ?Sized> std::fmt::Debug for Stage<F> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Stage")
      .field("reads", &self.reads)
      .field("writes", &self.writes)
      .finish_non_exhaustive()
  }
}

// --- Stage constructors ---

pub fn initializer<F>(f: F) -> Stage<InitFn>
where
  F: Fn(SeedInput) -> StageResult<Context> + Send + Sync + 'static,
{
  let erased: Arc<InitFn> = Arc::new(f);
  Stage::from_arc(erased)
}

pub fn sanitizer<F>(f: F) -> Stage<SanitizeFn>
where
  F: Fn(Value) -> StageResult<Value> + Send + Sync + 'static,
{
  let erased: Arc<SanitizeFn> = Arc::new(f);
  Stage::from_arc(erased)
}

pub fn sync_gate<F>(f: F) -> Stage<SyncGateFn>
where
  F: Fn(&Context) -> StageResult<Gate> + Send + Sync + 'static,
{
  let erased: Arc<SyncGateFn> = Arc::new(f);
  Stage::from_arc(erased)
}

pub fn async_gate<F, Fut>(f: F) -> Stage<AsyncGateFn>
where
  F: Fn(Context) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = StageResult<Gate>> + Send + 'static,
{
  let erased: Arc<AsyncGateFn> = Arc::new(move |ctx| -> BoxFuture<StageResult<Gate>> { Box::pin(f(ctx)) });
  Stage::from_arc(erased)
}

pub fn data_stage<F, Fut>(f: F) -> Stage<DataFn>
where
  F: Fn(Context) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = StageResult<Context>> + Send + 'static,
{
  let erased: Arc<DataFn> = Arc::new(move |ctx| -> BoxFuture<StageResult<Context>> { Box::pin(f(ctx)) });
  Stage::from_arc(erased)
}

pub fn responder<F>(f: F) -> Stage<RespondFn>
where
  F: Fn(&Context) -> StageResult<Response> + Send + Sync + 'static,
{
  let erased: Arc<RespondFn> = Arc::new(f);
  Stage::from_arc(erased)
}

pub fn response_filter<F>(f: F) -> Stage<ResponseFilterFn>
where
  F: Fn(Value) -> Value + Send + Sync + 'static,
{
  let erased: Arc<ResponseFilterFn> = Arc::new(f);
  Stage::from_arc(erased)
}
