// htpipe/src/config.rs

use std::env;

use tracing::{event, Level};

use crate::error::{PipeError, PipeResult};

pub const ENV_EXPOSE_ERROR_DETAIL: &str = "HTPIPE_EXPOSE_ERROR_DETAIL";
pub const ENV_CHECK_CAPABILITIES: &str = "HTPIPE_CHECK_CAPABILITIES";

/// Knobs shared by a `RouteTable` and the outcome-to-wire conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeConfig {
  /// Show client-error messages (400/403/404) on the wire. `Internal` detail is
  /// never shown regardless.
  pub expose_error_detail: bool,
  /// Run the declared read/write check when a route is registered.
  pub check_capabilities: bool,
}

impl Default for PipeConfig {
  fn default() -> Self {
    Self {
      expose_error_detail: false,
      check_capabilities: true,
    }
  }
}

impl PipeConfig {
  pub fn expose_error_detail(mut self, on: bool) -> Self {
    self.expose_error_detail = on;
    self
  }

  pub fn check_capabilities(mut self, on: bool) -> Self {
    self.check_capabilities = on;
    self
  }

  /// Reads overrides from the environment, falling back to the defaults for
  /// unset variables.
  pub fn from_env() -> PipeResult<Self> {
    let defaults = Self::default();
    let expose_error_detail = env_flag(ENV_EXPOSE_ERROR_DETAIL, defaults.expose_error_detail)?;
    let check_capabilities = env_flag(ENV_CHECK_CAPABILITIES, defaults.check_capabilities)?;

    event!(Level::DEBUG, expose_error_detail, check_capabilities, "Pipeline configuration loaded.");

    Ok(Self {
      expose_error_detail,
      check_capabilities,
    })
  }
}

fn env_flag(var_name: &str, default: bool) -> PipeResult<bool> {
  match env::var(var_name) {
    Ok(raw) => parse_flag(&raw).ok_or_else(|| PipeError::Config {
      key: var_name.to_string(),
      message: format!("expected a boolean, got '{}'", raw),
    }),
    Err(env::VarError::NotPresent) => Ok(default),
    Err(e) => Err(PipeError::Config {
      key: var_name.to_string(),
      message: e.to_string(),
    }),
  }
}

fn parse_flag(raw: &str) -> Option<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Some(true),
    "0" | "false" | "no" | "off" => Some(false),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_accept_common_spellings() {
    assert_eq!(parse_flag("TRUE"), Some(true));
    assert_eq!(parse_flag(" on "), Some(true));
    assert_eq!(parse_flag("0"), Some(false));
    assert_eq!(parse_flag("maybe"), None);
  }

  #[test]
  fn defaults_hide_detail_and_check_capabilities() {
    let config = PipeConfig::default();
    assert!(!config.expose_error_detail);
    assert!(config.check_capabilities);
  }

  #[test]
  fn from_env_reads_overrides_and_rejects_garbage() {
    env::set_var(ENV_EXPOSE_ERROR_DETAIL, "yes");
    env::set_var(ENV_CHECK_CAPABILITIES, "off");
    let config = PipeConfig::from_env().unwrap();
    assert!(config.expose_error_detail);
    assert!(!config.check_capabilities);

    env::set_var(ENV_CHECK_CAPABILITIES, "sometimes");
    match PipeConfig::from_env() {
      Err(PipeError::Config { key, .. }) => assert_eq!(key, ENV_CHECK_CAPABILITIES),
      other => panic!("Expected a config error, got {:?}", other),
    }

    env::remove_var(ENV_EXPOSE_ERROR_DETAIL);
    env::remove_var(ENV_CHECK_CAPABILITIES);
    assert_eq!(PipeConfig::from_env().unwrap(), PipeConfig::default());
  }
}
