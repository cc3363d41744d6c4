// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use htpipe::common_stages::Repository;
use htpipe::{async_gate, data_stage, sync_gate, Context, Gate, HttpError, Stage};
use htpipe::core::stage::{AsyncGateFn, DataFn, SyncGateFn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use tracing::Level;

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Call-count probes ---
#[derive(Clone, Default)]
pub struct Probe(Arc<AtomicUsize>);

impl Probe {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn hit(&self) {
    self.0.fetch_add(1, Ordering::SeqCst);
  }

  pub fn count(&self) -> usize {
    self.0.load(Ordering::SeqCst)
  }
}

/// Sync gate that records its call and returns `result`.
pub fn probed_sync_gate(probe: &Probe, result: Gate) -> Stage<SyncGateFn> {
  let probe = probe.clone();
  sync_gate(move |_ctx| {
    probe.hit();
    Ok(result.clone())
  })
}

/// Async gate that records its call and returns `result`.
pub fn probed_async_gate(probe: &Probe, result: Gate) -> Stage<AsyncGateFn> {
  let probe = probe.clone();
  async_gate(move |_ctx| {
    probe.hit();
    let result = result.clone();
    async move { Ok(result) }
  })
}

/// Data stage that records its call and returns `delta`.
pub fn probed_data(probe: &Probe, delta: Context) -> Stage<DataFn> {
  let probe = probe.clone();
  data_stage(move |_ctx| {
    probe.hit();
    let delta = delta.clone();
    async move { Ok(delta) }
  })
}

// --- Storage fixture ---
#[derive(Default)]
pub struct MemoryRepository {
  records: HashMap<String, Value>,
  pub lookups: Probe,
}

impl MemoryRepository {
  pub fn with_record(mut self, id: &str, record: Value) -> Self {
    self.records.insert(id.to_string(), record);
    self
  }
}

#[async_trait]
impl Repository for MemoryRepository {
  async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Value>> {
    self.lookups.hit();
    if id == "explode" {
      anyhow::bail!("connection reset by peer");
    }
    if id == "malformed" {
      return Err(HttpError::bad_request("id is not a valid key").into());
    }
    Ok(self.records.get(id).cloned())
  }
}

// --- Transport fixture ---
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
  Json(u16, Value),
  Redirect(String, u16),
  Error(HttpError),
}

#[derive(Default)]
pub struct RecordingSink {
  pub sent: Vec<Sent>,
}

#[async_trait]
impl htpipe::ResponseSink for RecordingSink {
  async fn send_json(&mut self, status: u16, body: Value) -> anyhow::Result<()> {
    self.sent.push(Sent::Json(status, body));
    Ok(())
  }

  async fn send_redirect(&mut self, url: String, code: u16) -> anyhow::Result<()> {
    self.sent.push(Sent::Redirect(url, code));
    Ok(())
  }

  async fn send_error(&mut self, err: HttpError) -> anyhow::Result<()> {
    self.sent.push(Sent::Error(err));
    Ok(())
  }
}
