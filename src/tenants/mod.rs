//! Tenant registry: per-property persona data loaded once at startup.
//!
//! The registry file is a JSON object keyed by tenant identifier:
//!
//! ```json
//! {
//!   "riad_ziz": {
//!     "name": "Riad Ziz",
//!     "city": "Meknes",
//!     "whatsapp": "+212600000000",
//!     "location": "Old Medina, near Bab Mansour.",
//!     "breakfast_info": "Served 8:00 - 10:30 AM. Included.",
//!     "wifi_info": "Network 'Riad_Guest', Password 'Maroc2025'.",
//!     "tours_info": "Camel Trek (300 DH), 4x4 Desert Tour (800 DH)."
//!   }
//! }
//! ```
//!
//! Every field is required; a record missing one fails the whole load. The
//! registry is immutable after construction and shared read-only between
//! sessions behind an [`Arc`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

pub mod resolver;

pub use resolver::{ResolveError, ResolvedTenant, ResolutionSource, TenantResolver};

/// One hosted property and the facts the concierge may quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    /// Registry key. Filled from the JSON object key, not from the record body.
    #[serde(skip)]
    pub id: String,
    /// Display name of the property.
    pub name: String,
    /// City the property is in.
    pub city: String,
    /// WhatsApp contact used for booking escalation.
    pub whatsapp: String,
    /// Free-text location description.
    pub location: String,
    /// Free-text breakfast details.
    pub breakfast_info: String,
    /// Free-text wifi details.
    pub wifi_info: String,
    /// Free-text tours and services details.
    pub tours_info: String,
}

/// Errors loading the tenant registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registry file could not be read.
    #[error("cannot read tenant registry {}: {source}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The registry content is not a valid tenant map.
    #[error("invalid tenant registry {origin}: {source}")]
    Parse {
        /// File path or `<inline>`.
        origin: String,
        /// Underlying JSON error (includes missing required fields).
        source: serde_json::Error,
    },
    /// A tenant identifier key is empty or whitespace.
    #[error("tenant registry {origin} contains a blank tenant identifier")]
    BlankIdentifier {
        /// File path or `<inline>`.
        origin: String,
    },
    /// A tenant identifier key has leading or trailing whitespace.
    #[error("tenant registry {origin}: identifier '{id}' has surrounding whitespace")]
    PaddedIdentifier {
        /// File path or `<inline>`.
        origin: String,
        /// The offending key.
        id: String,
    },
    /// A tenant identifier key appears more than once.
    #[error("tenant registry {origin}: identifier '{id}' is defined more than once")]
    DuplicateIdentifier {
        /// File path or `<inline>`.
        origin: String,
        /// The repeated key.
        id: String,
    },
    /// The registry contains no tenants.
    #[error("tenant registry {origin} contains no tenants")]
    Empty {
        /// File path or `<inline>`.
        origin: String,
    },
}

/// Immutable mapping from tenant identifier to [`TenantRecord`].
#[derive(Debug, Clone)]
pub struct TenantRegistry {
    tenants: BTreeMap<String, Arc<TenantRecord>>,
}

impl TenantRegistry {
    /// Load the registry from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the file is missing, unreadable, not a
    /// valid tenant map, has a blank, padded or repeated key, or is empty.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::parse(&contents, &path.display().to_string())?;
        info!(
            path = %path.display(),
            tenants = registry.len(),
            "tenant registry loaded"
        );
        Ok(registry)
    }

    /// Build the registry from an in-memory JSON document.
    ///
    /// # Errors
    ///
    /// Same conditions as [`TenantRegistry::load`], minus file access.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        Self::parse(json, "<inline>")
    }

    fn parse(json: &str, origin: &str) -> Result<Self, RegistryError> {
        let RawEntries(raw) =
            serde_json::from_str(json).map_err(|source| RegistryError::Parse {
                origin: origin.to_owned(),
                source,
            })?;

        if raw.is_empty() {
            return Err(RegistryError::Empty {
                origin: origin.to_owned(),
            });
        }

        let mut tenants = BTreeMap::new();
        for (id, mut record) in raw {
            if id.trim().is_empty() {
                return Err(RegistryError::BlankIdentifier {
                    origin: origin.to_owned(),
                });
            }
            // Requested identifiers are trimmed before lookup.
            if id.trim() != id {
                return Err(RegistryError::PaddedIdentifier {
                    origin: origin.to_owned(),
                    id,
                });
            }
            if tenants.contains_key(&id) {
                return Err(RegistryError::DuplicateIdentifier {
                    origin: origin.to_owned(),
                    id,
                });
            }
            record.id.clone_from(&id);
            tenants.insert(id, Arc::new(record));
        }

        Ok(Self { tenants })
    }

    /// Look up a tenant by exact identifier.
    pub fn get(&self, id: &str) -> Option<&Arc<TenantRecord>> {
        self.tenants.get(id)
    }

    /// Whether `id` is a known tenant.
    pub fn contains(&self, id: &str) -> bool {
        self.tenants.contains_key(id)
    }

    /// Tenant identifiers in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tenants.keys().map(String::as_str)
    }

    /// Iterate over all records in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TenantRecord>> {
        self.tenants.values()
    }

    /// Number of tenants.
    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    /// Whether the registry is empty. Never true for a loaded registry.
    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

/// Registry entries in document order, repeated keys included.
struct RawEntries(Vec<(String, TenantRecord)>);

impl<'de> Deserialize<'de> for RawEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object of tenant records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawEntries, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, TenantRecord>()? {
                    entries.push(entry);
                }
                Ok(RawEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}
