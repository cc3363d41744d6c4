// htpipe/src/pipeline/execution.rs

//! Contains `HandlerDescription::execute()`, which drives one request through
//! the fixed lifecycle and always ends in exactly one `Outcome`.

use tracing::{event, instrument, span, Instrument, Level};

use crate::core::context::Context;
use crate::core::gate::Gate;
use crate::core::input::{SeedInput, UnsafeInput};
use crate::core::outcome::{Outcome, ResponseSink};
use crate::core::stage::Role;
use crate::error::{HttpError, PipeResult, StageResult};
use crate::pipeline::definition::HandlerDescription;
use crate::pipeline::lifecycle::{map_failure, Interrupt, LifecycleState};

/// Folds a gate result into the running context, or fails as `Forbidden`.
fn admit(ctx: &mut Context, gate: Gate, role: Role) -> StageResult<()> {
  match gate.normalized() {
    Gate::Deny => Err(HttpError::forbidden(format!("{} denied the request", role)).into()),
    Gate::Allow => Ok(()),
    Gate::AllowWith(delta) => {
      ctx.extend(delta);
      Ok(())
    }
  }
}

impl HandlerDescription {
  /// Executes the lifecycle for one request.
  ///
  /// Stages run strictly one after another, each guarded by the previous
  /// one's success. Failures are never returned as `Err`: they become
  /// `Outcome::Failed` (or `Outcome::Redirected` for a redirect signal).
  #[instrument(
    name = "HandlerDescription::execute",
    skip_all,
    fields(roles = self.defined_roles().len())
  )]
  pub async fn execute(&self, input: UnsafeInput) -> Outcome {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let outcome = match self.run_lifecycle(input).await {
      Ok(outcome) => outcome,
      Err(interrupt) => map_failure(interrupt),
    };
    event!(Level::INFO, status = outcome.status_code(), "Pipeline execution finished.");
    outcome
  }

  /// Executes and hands the outcome to `sink`.
  pub async fn handle(&self, input: UnsafeInput, sink: &mut dyn ResponseSink) -> PipeResult<()> {
    self.execute(input).await.deliver(sink).await
  }

  fn seed_context(&self, input: UnsafeInput) -> StageResult<Context> {
    let UnsafeInput { params, body, principal } = input;
    let params = match &self.sanitize_params {
      Some(stage) => (stage.func)(params)?,
      None => params,
    };
    let body = match &self.sanitize_body {
      Some(stage) => (stage.func)(body)?,
      None => body,
    };
    let seed = SeedInput { params, body, principal };
    match &self.init_pre_context {
      Some(stage) => (stage.func)(seed),
      None => (crate::compose::default_initializer().func)(seed),
    }
  }

  async fn run_lifecycle(&self, input: UnsafeInput) -> Result<Outcome, Interrupt> {
    use LifecycleState::*;

    event!(Level::DEBUG, state = %Initializing, "Entering state.");
    let mut ctx = self.seed_context(input).map_err(Interrupt::at(Initializing))?;

    event!(Level::DEBUG, state = %PreAuthorizing, "Entering state.");
    let gate = match &self.pre_authorize {
      Some(stage) => (stage.func)(&ctx).map_err(Interrupt::at(PreAuthorizing))?,
      None => Gate::Allow,
    };
    admit(&mut ctx, gate, Role::PreAuthorize).map_err(Interrupt::at(PreAuthorizing))?;

    if let Some(stage) = &self.attach_data {
      let state_span = span!(Level::DEBUG, "lifecycle_state", state = %AttachingData);
      let delta = (stage.func)(ctx.clone())
        .instrument(state_span)
        .await
        .map_err(Interrupt::at(AttachingData))?;
      ctx.extend(delta);
    } else {
      event!(Level::TRACE, state = %AttachingData, "No attachData stage; skipped.");
    }

    if let Some(stage) = &self.final_authorize {
      let state_span = span!(Level::DEBUG, "lifecycle_state", state = %FinalAuthorizing);
      let gate = (stage.func)(ctx.clone())
        .instrument(state_span)
        .await
        .map_err(Interrupt::at(FinalAuthorizing))?;
      admit(&mut ctx, gate, Role::FinalAuthorize).map_err(Interrupt::at(FinalAuthorizing))?;
    } else {
      event!(Level::TRACE, state = %FinalAuthorizing, "No finalAuthorize stage; default pass.");
    }

    if let Some(stage) = &self.do_work {
      let state_span = span!(Level::DEBUG, "lifecycle_state", state = %Working);
      let delta = (stage.func)(ctx.clone())
        .instrument(state_span)
        .await
        .map_err(Interrupt::at(Working))?;
      ctx.extend(delta);
    } else {
      event!(Level::TRACE, state = %Working, "No doWork stage; skipped.");
    }

    event!(Level::DEBUG, state = %Responding, context_keys = ctx.len(), "Entering state.");
    let response = match &self.respond {
      Some(stage) => (stage.func)(&ctx).map_err(Interrupt::at(Responding))?,
      None => (crate::compose::no_content_responder().func)(&ctx).map_err(Interrupt::at(Responding))?,
    };
    let body = match &self.sanitize_response {
      Some(stage) => (stage.func)(response.unsafe_response),
      None => response.unsafe_response,
    };

    Ok(Outcome::Success {
      status: response.status,
      body,
    })
  }
}
