// tests/composition_tests.rs
mod common;

use common::*;
use htpipe::{
  attach_data, data_stage, fragment, ht_pipe, pre_authorize, respond, responder, sanitize_body, sanitize_response,
  sanitizer, response_filter, sync_gate, transform, Context, ErrorCategory, Gate, HandlerDescription, Outcome,
  Response, Role, StageError, UnsafeInput,
};
use serde_json::{json, Value};

fn echo_context() -> htpipe::Stage<htpipe::core::stage::RespondFn> {
  responder(|ctx: &Context| {
    let mut view = ctx.clone().into_value();
    if let Some(obj) = view.as_object_mut() {
      obj.remove("params");
      obj.remove("body");
    }
    Ok(Response::ok(view))
  })
}

#[tokio::test]
async fn test_two_pre_authorize_fragments_both_must_allow() {
  setup_tracing();
  let second = Probe::new();
  let desc = ht_pipe(
    HandlerDescription::new(),
    vec![
      pre_authorize(sync_gate(|_ctx| Ok(Gate::Deny))),
      pre_authorize(probed_sync_gate(&second, Gate::Allow)),
      respond(echo_context()),
    ],
  );
  let outcome = desc.execute(UnsafeInput::default()).await;
  assert_eq!(outcome.category(), Some(ErrorCategory::Forbidden));
  assert_eq!(second.count(), 0, "right-hand gate must not run after a deny");
}

#[tokio::test]
async fn test_attach_data_fragments_see_each_other() {
  setup_tracing();
  let desc = ht_pipe(
    HandlerDescription::new(),
    vec![
      attach_data(data_stage(|_ctx| async { Ok(Context::new().with("b", json!(4))) }).writes(["b"])),
      attach_data(
        data_stage(|ctx: Context| async move {
          let b: i64 = ctx.get_as("b")?;
          Ok(Context::new().with("c", json!(b + 1)))
        })
        .reads(["b"])
        .writes(["c"]),
      ),
      respond(echo_context()),
    ],
  );
  assert!(desc.check_capabilities().is_ok());
  assert_eq!(
    desc.execute(UnsafeInput::default()).await,
    Outcome::Success {
      status: 200,
      body: json!({"b": 4, "c": 5})
    }
  );
}

#[tokio::test]
async fn test_later_respond_replaces_earlier() {
  setup_tracing();
  let desc = ht_pipe(
    HandlerDescription::new(),
    vec![
      respond(responder(|_ctx| Ok(Response::ok(json!("first"))))),
      respond(responder(|_ctx| Ok(Response::created(json!("second"))))),
    ],
  );
  assert_eq!(
    desc.execute(UnsafeInput::default()).await,
    Outcome::Success {
      status: 201,
      body: json!("second")
    }
  );
}

#[tokio::test]
async fn test_sanitizers_and_response_filters_chain_in_order() {
  setup_tracing();
  let desc = ht_pipe(
    HandlerDescription::new(),
    vec![
      sanitize_body(sanitizer(|v: Value| {
        let n = v.as_i64().ok_or_else(|| StageError::msg("body must be a number"))?;
        Ok(json!(n * 10))
      })),
      sanitize_body(sanitizer(|v: Value| Ok(json!(v.as_i64().unwrap_or(0) + 1)))),
      respond(responder(|ctx: &Context| Ok(Response::ok(ctx.get("body").cloned().unwrap_or(Value::Null))))),
      sanitize_response(response_filter(|v: Value| json!([v]))),
      sanitize_response(response_filter(|v: Value| json!({"wrapped": v}))),
    ],
  );
  let outcome = desc.execute(UnsafeInput::new(Value::Null, json!(2))).await;
  assert_eq!(
    outcome,
    Outcome::Success {
      status: 200,
      body: json!({"wrapped": [21]})
    }
  );

  let rejected = desc.execute(UnsafeInput::new(Value::Null, json!("two"))).await;
  assert_eq!(rejected.category(), Some(ErrorCategory::BadRequest));
}

#[tokio::test]
async fn test_fragments_merge_like_single_transforms() {
  setup_tracing();
  let tenant = HandlerDescription::new()
    .with_pre_authorize(sync_gate(|_ctx| Ok(Gate::AllowWith(Context::new().with("tenant", json!("acme"))))));
  let lookup = HandlerDescription::new().with_attach_data(data_stage(|ctx: Context| async move {
    let tenant: String = ctx.get_as("tenant")?;
    Ok(Context::new().with("scope", json!(format!("{}/things", tenant))))
  }));

  let desc = ht_pipe(
    HandlerDescription::new(),
    vec![fragment(tenant), fragment(lookup), respond(echo_context())],
  );
  assert_eq!(
    desc.defined_roles(),
    vec![Role::PreAuthorize, Role::AttachData, Role::Respond]
  );
  assert_eq!(
    desc.execute(UnsafeInput::default()).await,
    Outcome::Success {
      status: 200,
      body: json!({"tenant": "acme", "scope": "acme/things"})
    }
  );
}

#[tokio::test]
async fn test_custom_transform_and_empty_pipe() {
  setup_tracing();
  let base = HandlerDescription::new().with_respond(responder(|_ctx| Ok(Response::ok(json!("base")))));
  let unchanged = ht_pipe(base.clone(), Vec::new());
  assert_eq!(unchanged.defined_roles(), base.defined_roles());

  let overridden = ht_pipe(
    base,
    vec![transform(|desc| {
      desc.with_respond(responder(|_ctx| Ok(Response::ok(json!("patched")))))
    })],
  );
  assert_eq!(
    overridden.execute(UnsafeInput::default()).await,
    Outcome::Success {
      status: 200,
      body: json!("patched")
    }
  );
}

#[test]
fn test_capability_check_sees_fragment_order() {
  setup_tracing();
  let reads_user = data_stage(|_ctx| async { Ok(Context::new()) }).reads(["user"]);
  let writes_user = data_stage(|_ctx| async { Ok(Context::new().with("user", json!("u"))) }).writes(["user"]);

  let bad = ht_pipe(
    HandlerDescription::new(),
    vec![attach_data(reads_user.clone()), attach_data(writes_user.clone())],
  );
  assert_eq!(bad.unsatisfied_reads(), vec![(Role::AttachData, "user".to_string())]);

  let good = ht_pipe(HandlerDescription::new(), vec![attach_data(writes_user), attach_data(reads_user)]);
  assert!(good.unsatisfied_reads().is_empty());
}

#[test]
fn test_composed_gate_is_callable_on_its_own() {
  setup_tracing();
  let merged = htpipe::compose::compose_sync_gate(
    Some(sync_gate(|_ctx| Ok(Gate::AllowWith(Context::new().with("owner", json!("u1")))))),
    Some(sync_gate(|ctx: &Context| Ok(Gate::from(ctx.get("owner") == ctx.get("principal"))))),
  );
  let gate = merged.func();
  assert_eq!(gate(&Context::new().with("principal", json!("u1"))).unwrap(), Gate::Allow);
  assert_eq!(gate(&Context::new().with("principal", json!("u2"))).unwrap(), Gate::Deny);
}
