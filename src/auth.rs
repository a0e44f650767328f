//! Credential providers for the Vertex AI backend.
//!
//! Resolution order for [`DefaultCredentialProvider`]:
//! `GOOGLE_OAUTH_ACCESS_TOKEN` → `GOOGLE_ACCESS_TOKEN` → OS keyring entry
//! (`simpleflash` service, project id as user). Use [`StaticCredentials`]
//! to pass a token explicitly.

use keyring::Entry;
use std::env;
use tracing::debug;

use crate::{Error, Result};

/// Keyring service name under which access tokens are looked up.
pub const KEYRING_SERVICE: &str = "simpleflash";

/// Environment variables consulted for an access token, in order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["GOOGLE_OAUTH_ACCESS_TOKEN", "GOOGLE_ACCESS_TOKEN"];

/// Supplies bearer tokens for the model backend.
///
/// Called once while the session is built (a failure there is fatal) and
/// again before each remote call so refreshed tokens are picked up.
pub trait CredentialProvider: Send + Sync {
    fn access_token(&self) -> Result<String>;

    fn name(&self) -> &'static str {
        "custom"
    }
}

/// A fixed token, for callers that manage refresh themselves.
#[derive(Clone)]
pub struct StaticCredentials {
    token: String,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticCredentials([REDACTED])")
    }
}

impl CredentialProvider for StaticCredentials {
    fn access_token(&self) -> Result<String> {
        if self.token.trim().is_empty() {
            return Err(Error::credentials("static access token is empty"));
        }
        Ok(self.token.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Ambient credentials: environment first, then the OS keyring.
#[derive(Debug, Clone)]
pub struct DefaultCredentialProvider {
    project_id: String,
}

impl DefaultCredentialProvider {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }

    fn from_env() -> Option<String> {
        TOKEN_ENV_VARS.iter().find_map(|var| {
            env::var(var)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
    }

    fn from_keyring(&self) -> Option<String> {
        let entry = Entry::new(KEYRING_SERVICE, &self.project_id).ok()?;
        match entry.get_password() {
            Ok(token) if !token.trim().is_empty() => Some(token.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "No access token in keyring");
                None
            }
        }
    }
}

impl CredentialProvider for DefaultCredentialProvider {
    fn access_token(&self) -> Result<String> {
        Self::from_env()
            .or_else(|| self.from_keyring())
            .ok_or_else(|| {
                Error::credentials(format!(
                    "no access token in {} or keyring entry {}/{}",
                    TOKEN_ENV_VARS.join(", "),
                    KEYRING_SERVICE,
                    self.project_id
                ))
            })
    }

    fn name(&self) -> &'static str {
        "default"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_credentials() {
        let creds = StaticCredentials::new("ya29.token");
        assert_eq!(creds.access_token().unwrap(), "ya29.token");
        assert_eq!(format!("{:?}", creds), "StaticCredentials([REDACTED])");
    }

    #[test]
    fn test_empty_static_token_is_unavailable() {
        let err = StaticCredentials::new("  ").access_token().unwrap_err();
        assert!(matches!(err, Error::CredentialsUnavailable { .. }));
    }
}
