// htpipe/src/core/context.rs

//! Defines `Context`, the append-only bag of JSON values threaded between
//! lifecycle stages for one request execution.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{HttpError, StageError, StageResult};

/// String-keyed accumulation of stage outputs.
///
/// A stage receives the context built so far and returns a *delta*, which is
/// itself a `Context`. Merging a delta never removes a key; on collision the
/// delta's value wins. There is no removal API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Map<String, Value>);

impl Context {
  pub fn new() -> Self {
    Self(Map::new())
  }

  pub fn from_pairs<K, V, I>(pairs: I) -> Self
  where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
  {
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  /// Typed read of a key written by an earlier stage.
  ///
  /// A missing key is a programming error in the handler description and is
  /// reported as an unclassified failure, so it takes the category of the
  /// stage that asked.
  pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> StageResult<T> {
    let value = self
      .0
      .get(key)
      .ok_or_else(|| StageError::msg(format!("context key '{}' is not set", key)))?;
    Ok(serde_json::from_value(value.clone())?)
  }

  /// Like [`Context::get_as`] but a missing or mistyped key fails as `BadRequest`.
  /// Meant for keys that come straight from sanitized client input.
  pub fn require<T: DeserializeOwned>(&self, key: &str) -> StageResult<T> {
    let value = self
      .0
      .get(key)
      .ok_or_else(|| HttpError::bad_request(format!("missing '{}'", key)))?;
    serde_json::from_value(value.clone())
      .map_err(|e| HttpError::bad_request(format!("invalid '{}': {}", key, e)).into())
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.0.contains_key(key)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Writes one key, overwriting any earlier value.
  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
    self.0.insert(key.into(), value.into());
    self
  }

  /// Builder-style `insert`.
  pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.insert(key, value);
    self
  }

  /// Folds `delta` into `self`; `delta` wins on collision.
  pub fn extend(&mut self, delta: Context) {
    for (k, v) in delta.0 {
      self.0.insert(k, v);
    }
  }

  /// Non-mutating `{...self, ...delta}`.
  pub fn merged(&self, delta: &Context) -> Context {
    let mut out = self.clone();
    for (k, v) in &delta.0 {
      out.0.insert(k.clone(), v.clone());
    }
    out
  }

  pub fn as_map(&self) -> &Map<String, Value> {
    &self.0
  }

  pub fn into_value(self) -> Value {
    Value::Object(self.0)
  }
}

impl From<Map<String, Value>> for Context {
  fn from(map: Map<String, Value>) -> Self {
    Self(map)
  }
}

impl TryFrom<Value> for Context {
  type Error = StageError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    match value {
      Value::Object(map) => Ok(Self(map)),
      other => Err(StageError::msg(format!(
        "expected a JSON object for a context delta, got {}",
        other
      ))),
    }
  }
}

impl FromIterator<(String, Value)> for Context {
  fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl From<Context> for Value {
  fn from(ctx: Context) -> Self {
    ctx.into_value()
  }
}
