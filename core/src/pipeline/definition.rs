// htpipe/src/pipeline/definition.rs

//! Contains the `HandlerDescription` struct: at most one (possibly composed)
//! implementation per lifecycle role, built once ahead of any request and
//! shared read-only by every execution it serves.

use crate::compose::{
  compose_async_gate, compose_data, compose_override, compose_response_filter, compose_sanitizer, compose_sync_gate,
};
use crate::core::stage::{
  AsyncGateFn, DataFn, InitFn, RespondFn, ResponseFilterFn, Role, SanitizeFn, Stage, SyncGateFn,
};

/// The compiled set of stage implementations for one route.
///
/// Descriptions are values: every "add a stage" operation consumes one and
/// returns a new one with a single role slot filled or merged. Nothing is ever
/// mutated behind a shared reference, so an `Arc<HandlerDescription>` can be
/// executed from any number of concurrent requests without locking.
#[derive(Clone, Default)]
pub struct HandlerDescription {
  pub(crate) sanitize_params: Option<Stage<SanitizeFn>>,
  pub(crate) sanitize_body: Option<Stage<SanitizeFn>>,
  pub(crate) init_pre_context: Option<Stage<InitFn>>,
  pub(crate) pre_authorize: Option<Stage<SyncGateFn>>,
  pub(crate) attach_data: Option<Stage<DataFn>>,
  pub(crate) final_authorize: Option<Stage<AsyncGateFn>>,
  pub(crate) do_work: Option<Stage<DataFn>>,
  pub(crate) respond: Option<Stage<RespondFn>>,
  pub(crate) sanitize_response: Option<Stage<ResponseFilterFn>>,
}

/// Runs `composer` only when at least one side defines the role.
fn merge_slot<F: ?Sized>(
  left: Option<Stage<F>>,
  right: Option<Stage<F>>,
  composer: fn(Option<Stage<F>>, Option<Stage<F>>) -> Stage<F>,
) -> Option<Stage<F>> {
  match (left, right) {
    (None, None) => None,
    (left, right) => Some(composer(left, right)),
  }
}

impl HandlerDescription {
  pub fn new() -> Self {
    Self::default()
  }

  /// Pairwise composition of every role: `self` is the left side, `right` the right.
  pub fn compose(self, right: HandlerDescription) -> Self {
    Self {
      sanitize_params: merge_slot(self.sanitize_params, right.sanitize_params, compose_sanitizer),
      sanitize_body: merge_slot(self.sanitize_body, right.sanitize_body, compose_sanitizer),
      init_pre_context: compose_override(self.init_pre_context, right.init_pre_context),
      pre_authorize: merge_slot(self.pre_authorize, right.pre_authorize, compose_sync_gate),
      attach_data: merge_slot(self.attach_data, right.attach_data, compose_data),
      final_authorize: merge_slot(self.final_authorize, right.final_authorize, compose_async_gate),
      do_work: merge_slot(self.do_work, right.do_work, compose_data),
      respond: compose_override(self.respond, right.respond),
      sanitize_response: merge_slot(self.sanitize_response, right.sanitize_response, compose_response_filter),
    }
  }

  pub fn has(&self, role: Role) -> bool {
    match role {
      Role::SanitizeParams => self.sanitize_params.is_some(),
      Role::SanitizeBody => self.sanitize_body.is_some(),
      Role::InitPreContext => self.init_pre_context.is_some(),
      Role::PreAuthorize => self.pre_authorize.is_some(),
      Role::AttachData => self.attach_data.is_some(),
      Role::FinalAuthorize => self.final_authorize.is_some(),
      Role::DoWork => self.do_work.is_some(),
      Role::Respond => self.respond.is_some(),
      Role::SanitizeResponse => self.sanitize_response.is_some(),
    }
  }

  /// Defined roles, in lifecycle order.
  pub fn defined_roles(&self) -> Vec<Role> {
    Role::ALL.iter().copied().filter(|role| self.has(*role)).collect()
  }
}

impl std::fmt::Debug for HandlerDescription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("HandlerDescription")
      .field("roles", &self.defined_roles())
      .finish()
  }
}
