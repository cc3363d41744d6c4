// htpipe/src/pipeline/capabilities.rs

//! Composition-time check of declared context capabilities: every key a stage
//! declares it reads must be written by some earlier-ordered stage.

use std::collections::BTreeSet;

use crate::compose::SEED_KEYS;
use crate::core::stage::{Role, Stage};
use crate::error::{PipeError, PipeResult};
use crate::pipeline::definition::HandlerDescription;

fn caps<F: ?Sized>(stage: &Option<Stage<F>>) -> Option<(&BTreeSet<String>, &BTreeSet<String>)> {
  stage.as_ref().map(|s| (&s.reads, &s.writes))
}

impl HandlerDescription {
  /// Declared `(reads, writes)` of a role, if the role is defined.
  pub fn capabilities(&self, role: Role) -> Option<(&BTreeSet<String>, &BTreeSet<String>)> {
    match role {
      Role::SanitizeParams => caps(&self.sanitize_params),
      Role::SanitizeBody => caps(&self.sanitize_body),
      Role::InitPreContext => caps(&self.init_pre_context),
      Role::PreAuthorize => caps(&self.pre_authorize),
      Role::AttachData => caps(&self.attach_data),
      Role::FinalAuthorize => caps(&self.final_authorize),
      Role::DoWork => caps(&self.do_work),
      Role::Respond => caps(&self.respond),
      Role::SanitizeResponse => caps(&self.sanitize_response),
    }
  }

  /// All `(role, key)` pairs whose declared read is not covered by an earlier write.
  pub fn unsatisfied_reads(&self) -> Vec<(Role, String)> {
    let mut available: BTreeSet<String> = match &self.init_pre_context {
      Some(init) => init.writes.clone(),
      None => SEED_KEYS.iter().map(|k| k.to_string()).collect(),
    };
    let mut missing = Vec::new();
    for role in Role::ALL {
      // Sanitizers run on raw input before any context exists; the seed is handled above.
      if matches!(role, Role::SanitizeParams | Role::SanitizeBody | Role::InitPreContext) {
        continue;
      }
      if let Some((reads, writes)) = self.capabilities(role) {
        missing.extend(
          reads
            .iter()
            .filter(|key| !available.contains(*key))
            .map(|key| (role, key.clone())),
        );
        available.extend(writes.iter().cloned());
      }
    }
    missing
  }

  /// Fails with the first unsatisfied read, in lifecycle order.
  pub fn check_capabilities(&self) -> PipeResult<()> {
    match self.unsatisfied_reads().into_iter().next() {
      Some((role, key)) => Err(PipeError::UnsatisfiedRead { role, key }),
      None => Ok(()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::context::Context;
  use crate::core::gate::Gate;
  use crate::core::stage::{async_gate, data_stage, initializer, sync_gate};
  use serde_json::json;

  #[test]
  fn reads_satisfied_by_earlier_writes_pass() {
    let desc = HandlerDescription::new()
      .with_attach_data(data_stage(|_ctx| async { Ok(Context::new()) }).reads(["params"]).writes(["thing"]))
      .with_final_authorize(async_gate(|_ctx| async { Ok(Gate::Allow) }).reads(["thing", "principal"]));
    assert!(desc.check_capabilities().is_ok());
  }

  #[test]
  fn read_of_a_later_write_is_rejected() {
    let desc = HandlerDescription::new()
      .with_final_authorize(async_gate(|_ctx| async { Ok(Gate::Allow) }).reads(["thing"]))
      .with_do_work(data_stage(|_ctx| async { Ok(Context::new()) }).writes(["thing"]));
    match desc.check_capabilities() {
      Err(PipeError::UnsatisfiedRead { role, key }) => {
        assert_eq!(role, Role::FinalAuthorize);
        assert_eq!(key, "thing");
      }
      other => panic!("Expected UnsatisfiedRead, got {:?}", other),
    }
  }

  #[test]
  fn custom_initializer_replaces_the_seed_keys() {
    let desc = HandlerDescription::new()
      .with_init_pre_context(initializer(|_seed| Ok(Context::new())).writes(["session"]))
      .with_attach_data(data_stage(|_ctx| async { Ok(Context::new()) }).reads(["session", "params"]));
    assert_eq!(desc.unsatisfied_reads(), vec![(Role::AttachData, "params".to_string())]);
  }

  #[test]
  fn left_gate_delta_dropped_by_a_plain_allow_does_not_count_as_written() {
    let desc = HandlerDescription::new()
      .with_pre_authorize(
        sync_gate(|_ctx| Ok(Gate::AllowWith(Context::new().with("tenant", json!("acme"))))).writes(["tenant"]),
      )
      .with_pre_authorize(sync_gate(|_ctx| Ok(Gate::Allow)))
      .with_attach_data(data_stage(|_ctx| async { Ok(Context::new()) }).reads(["tenant"]));
    assert_eq!(desc.unsatisfied_reads(), vec![(Role::AttachData, "tenant".to_string())]);

    let single = HandlerDescription::new()
      .with_pre_authorize(
        sync_gate(|_ctx| Ok(Gate::AllowWith(Context::new().with("tenant", json!("acme"))))).writes(["tenant"]),
      )
      .with_attach_data(data_stage(|_ctx| async { Ok(Context::new()) }).reads(["tenant"]));
    assert!(single.check_capabilities().is_ok());
  }
}
