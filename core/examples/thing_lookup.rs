// htpipe/examples/thing_lookup.rs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use htpipe::common_stages::{attach_by_id, require_owner, require_principal, FieldFilter, Repository};
use htpipe::{
  attach_data, ht_pipe, pre_authorize, final_authorize, respond, responder, sanitize_response, Context,
  HandlerDescription, PipeConfig, PipeError, Response, RouteTable, UnsafeInput,
};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

// 1. A storage collaborator. Real applications would talk to a database here.
struct InMemoryThings(HashMap<String, Value>);

#[async_trait]
impl Repository for InMemoryThings {
  async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Value>> {
    Ok(self.0.get(id).cloned())
  }
}

#[tokio::main]
async fn main() -> Result<(), PipeError> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  info!("--- Thing Lookup Example ---");

  let mut things = HashMap::new();
  things.insert(
    "stringy".to_string(),
    json!({"id": "stringy", "ownerId": "u1", "secret": "do not leak"}),
  );
  let repo: Arc<dyn Repository> = Arc::new(InMemoryThings(things));

  // 2. Compile the handler from independent fragments.
  let get_thing = ht_pipe(
    HandlerDescription::new(),
    vec![
      pre_authorize(require_principal()),
      attach_data(attach_by_id(repo, "id", "thing")),
      final_authorize(require_owner("thing", "ownerId")),
      respond(
        responder(|ctx: &Context| Ok(Response::ok(ctx.get("thing").cloned().unwrap_or(Value::Null)))).reads(["thing"]),
      ),
      sanitize_response(FieldFilter::new().deny(["secret"]).response_filter()),
    ],
  );

  // 3. Register it; the table checks the description once.
  let config = PipeConfig::from_env()?;
  let table = RouteTable::with_config(config);
  table.register("things.get", get_thing)?;

  // 4. Dispatch a few requests.
  let requests = [
    ("owner", UnsafeInput::with_params(json!({"id": "stringy"})).principal(json!({"id": "u1"}))),
    ("stranger", UnsafeInput::with_params(json!({"id": "stringy"})).principal(json!({"id": "u2"}))),
    ("anonymous", UnsafeInput::with_params(json!({"id": "stringy"}))),
    ("missing", UnsafeInput::with_params(json!({"id": "nope"})).principal(json!({"id": "u1"}))),
  ];
  for (who, input) in requests {
    let outcome = table.dispatch("things.get", input).await?;
    let wire = outcome.to_wire(table.config());
    info!(who = %who, status = outcome.status_code(), wire = %serde_json::to_string(&wire).unwrap_or_default(), "Dispatched.");
  }

  Ok(())
}
