// htpipe/src/pipeline/hooks.rs

//! Role-adding methods on `HandlerDescription`. Each one consumes the
//! description, composes the given stage against whatever the role already
//! holds (current implementation on the left, the new stage on the right),
//! and returns the augmented description.

use crate::compose::{
  compose_async_gate, compose_data, compose_override, compose_response_filter, compose_sanitizer, compose_sync_gate,
};
use crate::core::stage::{AsyncGateFn, DataFn, InitFn, RespondFn, ResponseFilterFn, SanitizeFn, Stage, SyncGateFn};
use crate::pipeline::definition::HandlerDescription;

impl HandlerDescription {
  pub fn with_sanitize_params(mut self, stage: Stage<SanitizeFn>) -> Self {
    self.sanitize_params = Some(compose_sanitizer(self.sanitize_params, Some(stage)));
    self
  }

  pub fn with_sanitize_body(mut self, stage: Stage<SanitizeFn>) -> Self {
    self.sanitize_body = Some(compose_sanitizer(self.sanitize_body, Some(stage)));
    self
  }

  pub fn with_init_pre_context(mut self, stage: Stage<InitFn>) -> Self {
    self.init_pre_context = compose_override(self.init_pre_context, Some(stage));
    self
  }

  pub fn with_pre_authorize(mut self, stage: Stage<SyncGateFn>) -> Self {
    self.pre_authorize = Some(compose_sync_gate(self.pre_authorize, Some(stage)));
    self
  }

  pub fn with_attach_data(mut self, stage: Stage<DataFn>) -> Self {
    self.attach_data = Some(compose_data(self.attach_data, Some(stage)));
    self
  }

  pub fn with_final_authorize(mut self, stage: Stage<AsyncGateFn>) -> Self {
    self.final_authorize = Some(compose_async_gate(self.final_authorize, Some(stage)));
    self
  }

  pub fn with_do_work(mut self, stage: Stage<DataFn>) -> Self {
    self.do_work = Some(compose_data(self.do_work, Some(stage)));
    self
  }

  pub fn with_respond(mut self, stage: Stage<RespondFn>) -> Self {
    self.respond = compose_override(self.respond, Some(stage));
    self
  }

  pub fn with_sanitize_response(mut self, stage: Stage<ResponseFilterFn>) -> Self {
    self.sanitize_response = Some(compose_response_filter(self.sanitize_response, Some(stage)));
    self
  }
}
