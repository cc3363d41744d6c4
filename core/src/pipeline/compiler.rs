// htpipe/src/pipeline/compiler.rs

//! `ht_pipe`: left-to-right application of stage-adding transforms to a base
//! handler description.

use tracing::{event, Level};

use crate::core::stage::{AsyncGateFn, DataFn, InitFn, RespondFn, ResponseFilterFn, SanitizeFn, Stage, SyncGateFn};
use crate::pipeline::definition::HandlerDescription;

/// A stage-adding transform: takes a description, returns an augmented one.
pub type Transform = Box<dyn FnOnce(HandlerDescription) -> HandlerDescription + Send>;

/// Applies `transforms` in order; transform *i*'s output is transform *i+1*'s input.
///
/// Zero transforms is the identity. No reordering, no memoization.
pub fn ht_pipe<I>(base: HandlerDescription, transforms: I) -> HandlerDescription
where
  I: IntoIterator<Item = Transform>,
{
  let mut applied = 0usize;
  let compiled = transforms.into_iter().fold(base, |desc, transform| {
    applied += 1;
    transform(desc)
  });
  event!(
    Level::DEBUG,
    transforms = applied,
    roles = ?compiled.defined_roles(),
    "Handler description compiled."
  );
  compiled
}

/// Wraps an arbitrary description-to-description function.
pub fn transform(f: impl FnOnce(HandlerDescription) -> HandlerDescription + Send + 'static) -> Transform {
  Box::new(f)
}

/// Composes a whole partial description onto the current one, role by role.
pub fn fragment(right: HandlerDescription) -> Transform {
  Box::new(move |desc| desc.compose(right))
}

pub fn sanitize_params(stage: Stage<SanitizeFn>) -> Transform {
  Box::new(move |desc| desc.with_sanitize_params(stage))
}

pub fn sanitize_body(stage: Stage<SanitizeFn>) -> Transform {
  Box::new(move |desc| desc.with_sanitize_body(stage))
}

pub fn init_pre_context(stage: Stage<InitFn>) -> Transform {
  Box::new(move |desc| desc.with_init_pre_context(stage))
}

pub fn pre_authorize(stage: Stage<SyncGateFn>) -> Transform {
  Box::new(move |desc| desc.with_pre_authorize(stage))
}

pub fn attach_data(stage: Stage<DataFn>) -> Transform {
  Box::new(move |desc| desc.with_attach_data(stage))
}

pub fn final_authorize(stage: Stage<AsyncGateFn>) -> Transform {
  Box::new(move |desc| desc.with_final_authorize(stage))
}

pub fn do_work(stage: Stage<DataFn>) -> Transform {
  Box::new(move |desc| desc.with_do_work(stage))
}

pub fn respond(stage: Stage<RespondFn>) -> Transform {
  Box::new(move |desc| desc.with_respond(stage))
}

pub fn sanitize_response(stage: Stage<ResponseFilterFn>) -> Transform {
  Box::new(move |desc| desc.with_sanitize_response(stage))
}
