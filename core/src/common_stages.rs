// htpipe/src/common_stages.rs

//! Reusable stage fragments: principal and ownership gates, a storage-backed
//! `attachData`, and schema-driven sanitizers.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{event, Level};

use crate::core::context::Context;
use crate::core::gate::Gate;
use crate::core::stage::{
  async_gate, data_stage, response_filter, sanitizer, sync_gate, AsyncGateFn, DataFn, ResponseFilterFn, SanitizeFn,
  Stage, SyncGateFn,
};
use crate::error::{HttpError, StageError};

// --- Gates ---

/// `preAuthorize`: allows only when the transport supplied a non-null principal.
pub fn require_principal() -> Stage<SyncGateFn> {
  sync_gate(|ctx: &Context| Ok(Gate::from(ctx.get("principal").is_some_and(|p| !p.is_null())))).reads(["principal"])
}

/// `preAuthorize`: allows when `principal.roles` contains `role`.
pub fn require_role(role: impl Into<String>) -> Stage<SyncGateFn> {
  let role = role.into();
  sync_gate(move |ctx: &Context| {
    let has_role = ctx
      .get("principal")
      .and_then(|p| p.get("roles"))
      .and_then(Value::as_array)
      .is_some_and(|roles| roles.iter().any(|r| r.as_str() == Some(role.as_str())));
    Ok(Gate::from(has_role))
  })
  .reads(["principal"])
}

/// `finalAuthorize`: allows when `ctx[resource_key][owner_field] == principal.id`.
pub fn require_owner(resource_key: impl Into<String>, owner_field: impl Into<String>) -> Stage<AsyncGateFn> {
  let (resource_key, owner_field) = (resource_key.into(), owner_field.into());
  let reads = [resource_key.clone(), "principal".to_string()];
  async_gate(move |ctx: Context| {
    let owner = ctx.get(&resource_key).and_then(|r| r.get(&owner_field)).cloned();
    let principal_id = ctx.get("principal").and_then(|p| p.get("id")).cloned();
    async move {
      let is_owner = matches!((owner, principal_id), (Some(o), Some(p)) if !o.is_null() && o == p);
      Ok(Gate::from(is_owner))
    }
  })
  .reads(reads)
}

// --- Storage-backed attachData ---

/// Storage collaborator used by `attachData`/`doWork` stages.
#[async_trait]
pub trait Repository: Send + Sync {
  /// `Ok(None)` means "no such record". Errors may be pre-classified
  /// (`HttpError` wrapped in the `anyhow::Error`) and keep their category.
  async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Value>>;
}

fn value_as_id(value: &Value) -> Option<String> {
  match value {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

/// `attachData`: reads `params.<param>`, looks it up in `repo`, writes the
/// record under `key`.
///
/// A missing parameter is `BadRequest`; a missing record is `NotFound`.
pub fn attach_by_id(repo: Arc<dyn Repository>, param: impl Into<String>, key: impl Into<String>) -> Stage<DataFn> {
  let (param, key) = (param.into(), key.into());
  let writes = [key.clone()];
  data_stage(move |ctx: Context| {
    let repo = Arc::clone(&repo);
    let (param, key) = (param.clone(), key.clone());
    async move {
      let id = ctx
        .get("params")
        .and_then(|params| params.get(&param))
        .and_then(value_as_id)
        .ok_or_else(|| HttpError::bad_request(format!("missing route parameter '{}'", param)))?;
      match repo.find_by_id(&id).await {
        Ok(Some(record)) => {
          event!(Level::TRACE, %key, %id, "Record attached.");
          Ok(Context::new().with(key, record))
        }
        Ok(None) => Err(HttpError::not_found(format!("{} '{}' not found", key, id)).into()),
        Err(e) => Err(StageError::from(e)),
      }
    }
  })
  .reads(["params"])
  .writes(writes)
}

// --- Schemas & sanitizers ---

/// Validation capability handed to sanitizers. Constructed once by the
/// application and captured by the stages that use it.
pub trait Schema: Send + Sync {
  fn validate(&self, input: &Value) -> Result<Value, HttpError>;
}

/// `sanitizeParams` / `sanitizeBody` backed by `schema`.
pub fn sanitize_with(schema: Arc<dyn Schema>) -> Stage<SanitizeFn> {
  sanitizer(move |value: Value| schema.validate(&value).map_err(StageError::from))
}

/// Field-level schema: optional allow-list, deny-list and required fields.
#[derive(Debug, Clone, Default)]
pub struct FieldFilter {
  allow: Option<BTreeSet<String>>,
  deny: BTreeSet<String>,
  required: BTreeSet<String>,
}

impl FieldFilter {
  pub fn new() -> Self {
    Self::default()
  }

  /// Keep only these fields.
  pub fn allow<I, S>(mut self, fields: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self
      .allow
      .get_or_insert_with(BTreeSet::new)
      .extend(fields.into_iter().map(Into::into));
    self
  }

  /// Strip these fields.
  pub fn deny<I, S>(mut self, fields: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.deny.extend(fields.into_iter().map(Into::into));
    self
  }

  /// Fail validation when any of these fields is missing.
  pub fn require<I, S>(mut self, fields: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.required.extend(fields.into_iter().map(Into::into));
    self
  }

  fn keeps(&self, field: &str) -> bool {
    let allowed = self.allow.as_ref().map_or(true, |allow| allow.contains(field));
    allowed && !self.deny.contains(field)
  }

  fn filter_object(&self, obj: Map<String, Value>) -> Map<String, Value> {
    obj.into_iter().filter(|(k, _)| self.keeps(k)).collect()
  }

  /// Filters an object, or each object in an array. Anything else passes.
  pub fn apply(&self, value: Value) -> Value {
    match value {
      Value::Object(obj) => Value::Object(self.filter_object(obj)),
      Value::Array(items) => Value::Array(items.into_iter().map(|item| self.apply(item)).collect()),
      other => other,
    }
  }

  /// `sanitizeResponse` stage.
  pub fn response_filter(self) -> Stage<ResponseFilterFn> {
    response_filter(move |value: Value| self.apply(value))
  }

  /// `sanitizeParams` / `sanitizeBody` stage.
  pub fn sanitizer(self) -> Stage<SanitizeFn> {
    sanitize_with(Arc::new(self))
  }
}

impl Schema for FieldFilter {
  fn validate(&self, input: &Value) -> Result<Value, HttpError> {
    let obj = input
      .as_object()
      .ok_or_else(|| HttpError::bad_request("expected a JSON object"))?;
    if let Some(missing) = self.required.iter().find(|field| !obj.contains_key(field.as_str())) {
      return Err(HttpError::bad_request(format!("missing required field '{}'", missing)));
    }
    Ok(Value::Object(self.filter_object(obj.clone())))
  }
}
