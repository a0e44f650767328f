//! Session configuration.
//!
//! Read once at session construction. Environment variables:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `PROJECT_ID` | `44444444444` |
//! | `PROJECT_LOCATION` | `europe-west4` |
//! | `SIMPLEFLASH_TEXT_MODEL` | `gemini-1.5-flash-001` |
//! | `SIMPLEFLASH_MULTIMODAL_MODEL` | `gemini-1.0-pro-vision` |
//! | `SIMPLEFLASH_TIMEOUT_SECS` | `180` |
//! | `SIMPLEFLASH_CACHE` | enabled |
//! | `VERBOSE` | off |

use std::env;
use std::time::Duration;

use crate::{Error, ErrorContext, Result};

pub const DEFAULT_PROJECT_ID: &str = "44444444444";
pub const DEFAULT_LOCATION: &str = "europe-west4";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-1.5-flash-001";
pub const DEFAULT_MULTIMODAL_MODEL: &str = "gemini-1.0-pro-vision";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub project_id: String,
    pub location: String,
    pub text_model: String,
    pub multimodal_model: String,
    pub timeout: Duration,
    pub enable_cache: bool,
    pub verbose: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            project_id: DEFAULT_PROJECT_ID.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            multimodal_model: DEFAULT_MULTIMODAL_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            enable_cache: true,
            verbose: false,
        }
    }
}

impl SessionConfig {
    pub fn new(
        text_model: impl Into<String>,
        multimodal_model: impl Into<String>,
        location: impl Into<String>,
        project_id: impl Into<String>,
        enable_cache: bool,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            location: location.into(),
            text_model: text_model.into(),
            multimodal_model: multimodal_model.into(),
            enable_cache,
            ..Self::default()
        }
    }

    /// Load from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let timeout = match get("SIMPLEFLASH_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                    Error::configuration_with_context(
                        "timeout must be a positive number of seconds",
                        ErrorContext::new()
                            .with_field_path("SIMPLEFLASH_TIMEOUT_SECS")
                            .with_details(raw.clone())
                            .with_source("session_config"),
                    )
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.timeout,
        };

        Ok(Self {
            project_id: get("PROJECT_ID").unwrap_or(defaults.project_id),
            location: get("PROJECT_LOCATION").unwrap_or(defaults.location),
            text_model: get("SIMPLEFLASH_TEXT_MODEL").unwrap_or(defaults.text_model),
            multimodal_model: get("SIMPLEFLASH_MULTIMODAL_MODEL")
                .unwrap_or(defaults.multimodal_model),
            timeout,
            enable_cache: get("SIMPLEFLASH_CACHE")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.enable_cache),
            verbose: get("VERBOSE").map(|v| parse_flag(&v)).unwrap_or(false),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let required = [
            ("project_id", &self.project_id),
            ("location", &self.location),
            ("text_model", &self.text_model),
            ("multimodal_model", &self.multimodal_model),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::configuration_with_context(
                    "value must not be empty",
                    ErrorContext::new()
                        .with_field_path(field)
                        .with_source("session_config"),
                ));
            }
        }
        if self.timeout.is_zero() {
            return Err(Error::configuration_with_context(
                "timeout must be positive",
                ErrorContext::new()
                    .with_field_path("timeout")
                    .with_source("session_config"),
            ));
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let cfg = SessionConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, SessionConfig::default());
        assert_eq!(cfg.timeout, Duration::from_secs(180));
        assert!(cfg.enable_cache);
        assert!(!cfg.verbose);
    }

    #[test]
    fn test_environment_overrides() {
        let cfg = SessionConfig::from_lookup(lookup(&[
            ("PROJECT_ID", "my-project"),
            ("PROJECT_LOCATION", "us-central1"),
            ("SIMPLEFLASH_TEXT_MODEL", "gemini-1.5-pro-001"),
            ("SIMPLEFLASH_TIMEOUT_SECS", "10"),
            ("SIMPLEFLASH_CACHE", "off"),
            ("VERBOSE", "true"),
        ]))
        .unwrap();
        assert_eq!(cfg.project_id, "my-project");
        assert_eq!(cfg.location, "us-central1");
        assert_eq!(cfg.text_model, "gemini-1.5-pro-001");
        assert_eq!(cfg.multimodal_model, DEFAULT_MULTIMODAL_MODEL);
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert!(!cfg.enable_cache);
        assert!(cfg.verbose);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let cfg = SessionConfig::from_lookup(lookup(&[("PROJECT_ID", "   ")])).unwrap();
        assert_eq!(cfg.project_id, DEFAULT_PROJECT_ID);
    }

    #[test]
    fn test_bad_timeout_is_configuration_error() {
        for raw in ["0", "soon", "-5"] {
            let err = SessionConfig::from_lookup(lookup(&[("SIMPLEFLASH_TIMEOUT_SECS", raw)]))
                .unwrap_err();
            let ctx = err.context().expect("context");
            assert_eq!(ctx.field_path.as_deref(), Some("SIMPLEFLASH_TIMEOUT_SECS"));
        }
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let cfg = SessionConfig::new("", DEFAULT_MULTIMODAL_MODEL, DEFAULT_LOCATION, "p", true);
        assert!(matches!(cfg.validate(), Err(Error::Configuration { .. })));
    }
}
