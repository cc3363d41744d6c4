// htpipe/src/registry.rs

//! Defines `RouteTable`, the process-wide owner of compiled handler
//! descriptions. Descriptions are stored behind `Arc` and shared read-only by
//! every request dispatched to them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{event, instrument, Level};

use crate::config::PipeConfig;
use crate::core::input::UnsafeInput;
use crate::core::outcome::{Outcome, ResponseSink};
use crate::core::stage::Role;
use crate::error::{PipeError, PipeResult};
use crate::pipeline::definition::HandlerDescription;

pub struct RouteTable {
  routes: RwLock<HashMap<String, Arc<HandlerDescription>>>,
  config: PipeConfig,
}

impl RouteTable {
  pub fn new() -> Self {
    Self::with_config(PipeConfig::default())
  }

  pub fn with_config(config: PipeConfig) -> Self {
    Self {
      routes: RwLock::new(HashMap::new()),
      config,
    }
  }

  pub fn config(&self) -> &PipeConfig {
    &self.config
  }

  /// Registers a compiled description under `route`.
  ///
  /// Rejects duplicate names and descriptions without a `respond` stage, and,
  /// when `check_capabilities` is on, descriptions whose declared reads are
  /// not satisfied by earlier writes.
  pub fn register(&self, route: impl Into<String>, desc: HandlerDescription) -> PipeResult<Arc<HandlerDescription>> {
    let route = route.into();
    if !desc.has(Role::Respond) {
      return Err(PipeError::MissingRole {
        route,
        role: Role::Respond,
      });
    }
    if self.config.check_capabilities {
      desc.check_capabilities()?;
    }

    let mut routes = self.routes.write();
    if routes.contains_key(&route) {
      event!(Level::ERROR, %route, "Route registered twice.");
      return Err(PipeError::DuplicateRoute { route });
    }
    let shared = Arc::new(desc);
    event!(Level::DEBUG, %route, roles = ?shared.defined_roles(), "Registering route.");
    routes.insert(route, Arc::clone(&shared));
    Ok(shared)
  }

  pub fn get(&self, route: &str) -> Option<Arc<HandlerDescription>> {
    self.routes.read().get(route).cloned()
  }

  pub fn contains(&self, route: &str) -> bool {
    self.routes.read().contains_key(route)
  }

  /// Registered route names, sorted.
  pub fn route_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.routes.read().keys().cloned().collect();
    names.sort();
    names
  }

  /// Runs the description registered under `route`.
  ///
  /// The table lock is released before the execution starts.
  #[instrument(name = "RouteTable::dispatch", skip_all, fields(route = %route))]
  pub async fn dispatch(&self, route: &str, input: UnsafeInput) -> PipeResult<Outcome> {
    let desc = self.get(route).ok_or_else(|| {
      event!(Level::ERROR, "No route registered under this name.");
      PipeError::RouteNotFound {
        route: route.to_string(),
      }
    })?;
    Ok(desc.execute(input).await)
  }

  /// `dispatch`, then hand the outcome to `sink`.
  pub async fn dispatch_to(&self, route: &str, input: UnsafeInput, sink: &mut dyn ResponseSink) -> PipeResult<()> {
    self.dispatch(route, input).await?.deliver(sink).await
  }
}

impl Default for RouteTable {
  fn default() -> Self {
    Self::new()
  }
}
