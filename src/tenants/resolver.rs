//! Tenant resolution for new sessions.
//!
//! A missing identifier selects the configured default tenant. A present but
//! unknown identifier is rejected; it never falls back to the default.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{TenantRecord, TenantRegistry};

/// Errors resolving a tenant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The requested identifier is not in the registry.
    #[error("unknown property '{id}'")]
    UnknownTenant {
        /// Identifier supplied by the request.
        id: String,
    },
    /// The configured default identifier is not in the registry.
    #[error("default property '{id}' is not in the tenant registry")]
    UnknownDefault {
        /// Configured default identifier.
        id: String,
    },
}

/// Where a resolved identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// The request carried the identifier.
    Requested,
    /// The request carried none; the default was used.
    Default,
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requested => f.write_str("requested"),
            Self::Default => f.write_str("default"),
        }
    }
}

/// Result of a successful resolution.
#[derive(Debug, Clone)]
pub struct ResolvedTenant {
    /// The selected record.
    pub tenant: Arc<TenantRecord>,
    /// Whether the default was substituted.
    pub source: ResolutionSource,
}

/// Picks one tenant per session from the shared registry.
#[derive(Debug, Clone)]
pub struct TenantResolver {
    registry: Arc<TenantRegistry>,
    default_id: String,
}

impl TenantResolver {
    /// Create a resolver with a default identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownDefault`] if `default_id` is not in the registry.
    pub fn new(registry: Arc<TenantRegistry>, default_id: &str) -> Result<Self, ResolveError> {
        if !registry.contains(default_id) {
            return Err(ResolveError::UnknownDefault {
                id: default_id.to_owned(),
            });
        }
        Ok(Self {
            registry,
            default_id: default_id.to_owned(),
        })
    }

    /// The configured default identifier.
    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<TenantRegistry> {
        &self.registry
    }

    /// Resolve a request-supplied identifier.
    ///
    /// `None` and blank strings count as absent and select the default.
    /// Surrounding whitespace is trimmed; lookup is otherwise exact.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownTenant`] for a present identifier that
    /// is not in the registry.
    pub fn resolve(&self, requested: Option<&str>) -> Result<ResolvedTenant, ResolveError> {
        let requested = requested.map(str::trim).filter(|id| !id.is_empty());

        let (id, source) = match requested {
            Some(id) => (id, ResolutionSource::Requested),
            None => (self.default_id.as_str(), ResolutionSource::Default),
        };

        match self.registry.get(id) {
            Some(tenant) => {
                debug!(tenant = id, %source, "tenant resolved");
                Ok(ResolvedTenant {
                    tenant: Arc::clone(tenant),
                    source,
                })
            }
            None => {
                warn!(tenant = id, "rejected unknown tenant identifier");
                Err(ResolveError::UnknownTenant { id: id.to_owned() })
            }
        }
    }
}
