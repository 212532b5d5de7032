//! API credential loading from the process environment and an optional `.env`.

use std::path::PathBuf;

use tracing::debug;

/// Errors resolving the model API credential.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The environment variable is not set.
    #[error("API key not found: set {var} in the environment or in .env")]
    Missing {
        /// Environment variable that was consulted.
        var: String,
    },
    /// The environment variable is set but empty.
    #[error("API key in {var} is empty")]
    Empty {
        /// Environment variable that was consulted.
        var: String,
    },
}

/// Secret API key. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ApiKey").field(&"[REDACTED]").finish()
    }
}

impl ApiKey {
    /// Wrap a raw key value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw key, for placing in a request header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

/// Load `./.env` into the process environment if one exists.
///
/// Variables already set in the environment win over file entries.
/// Returns the path that was loaded, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!(path = %path.display(), "loaded .env file");
            Some(path)
        }
        Err(e) => {
            debug!(error = %e, "no .env file loaded");
            None
        }
    }
}

/// Resolve the API key from `var` using `env` as the lookup.
///
/// Takes a resolver function for testability (avoids unsafe `set_var` in tests).
///
/// # Errors
///
/// Returns [`CredentialError::Missing`] when the variable is unset and
/// [`CredentialError::Empty`] when it holds only whitespace.
pub fn resolve_api_key(
    var: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ApiKey, CredentialError> {
    let value = env(var).ok_or_else(|| CredentialError::Missing {
        var: var.to_owned(),
    })?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CredentialError::Empty {
            var: var.to_owned(),
        });
    }
    Ok(ApiKey::new(trimmed))
}
