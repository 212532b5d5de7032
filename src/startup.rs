//! Process startup: turns configuration into a ready [`Concierge`].
//!
//! Every failure here is fatal and happens before any session exists. Each
//! condition maps to its own [`StartupError`] variant with a distinct message.

use std::sync::Arc;

use tracing::info;

use crate::config::ConciergeConfig;
use crate::credentials::{resolve_api_key, CredentialError};
use crate::persona::{PersonaTemplate, PromptBuilder, TemplateError};
use crate::providers::gemini::GeminiProvider;
use crate::providers::{LlmProvider, ProviderError};
use crate::session::{Concierge, GenerationSettings};
use crate::tenants::{RegistryError, ResolveError, TenantRegistry, TenantResolver};

/// Fatal startup conditions.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The model API credential is missing.
    #[error("missing API credential: {0}")]
    Credential(#[from] CredentialError),
    /// The tenant registry is missing or malformed.
    #[error("tenant registry could not be loaded: {0}")]
    Registry(#[from] RegistryError),
    /// A tenant identifier could not be resolved.
    #[error("tenant could not be resolved: {0}")]
    Tenant(#[from] ResolveError),
    /// The persona template is missing or malformed.
    #[error("persona template could not be loaded: {0}")]
    Template(#[from] TemplateError),
    /// The model client could not be constructed.
    #[error("model client could not be created: {0}")]
    Provider(#[from] ProviderError),
}

/// Registry, resolver and prompt builder. Needs no credential.
#[derive(Debug, Clone)]
pub struct TenantSetup {
    /// Resolver over the loaded registry.
    pub resolver: TenantResolver,
    /// Prompt builder over the configured template.
    pub prompts: PromptBuilder,
}

impl TenantSetup {
    /// The loaded registry.
    pub fn registry(&self) -> &Arc<TenantRegistry> {
        self.resolver.registry()
    }
}

/// Load the registry, template and resolver described by `config`.
///
/// # Errors
///
/// Returns [`StartupError::Registry`], [`StartupError::Template`] or
/// [`StartupError::Tenant`] (unknown default tenant).
pub fn load_tenant_setup(config: &ConciergeConfig) -> Result<TenantSetup, StartupError> {
    let registry = Arc::new(TenantRegistry::load(&config.registry.path)?);

    let template = match &config.persona.template_path {
        Some(path) => {
            info!(path = %path.display(), "loading persona template");
            PersonaTemplate::load(path)?
        }
        None => PersonaTemplate::builtin()?,
    };
    let prompts = PromptBuilder::new(template, config.persona.assistant_name.clone());

    let resolver = TenantResolver::new(registry, &config.registry.default_tenant)?;

    Ok(TenantSetup { resolver, prompts })
}

/// Build the Gemini provider, reading the API key through `env`.
///
/// # Errors
///
/// Returns [`StartupError::Credential`] if the key is missing or blank.
pub fn connect_provider(
    config: &ConciergeConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn LlmProvider>, StartupError> {
    let api_key = resolve_api_key(&config.model.api_key_env, env)?;
    let provider = GeminiProvider::new(
        config.model.name.clone(),
        config.model.base_url.clone(),
        api_key,
        config.model.request_timeout(),
    )?;
    info!(
        model = %config.model.name,
        timeout_secs = config.model.request_timeout_secs,
        "model client ready"
    );
    Ok(Arc::new(provider))
}

/// Full startup: credential first, then registry, template and default tenant.
///
/// # Errors
///
/// Returns the first [`StartupError`] encountered.
pub fn bootstrap(
    config: &ConciergeConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Concierge, StartupError> {
    let provider = connect_provider(config, env)?;
    bootstrap_with_provider(config, provider)
}

/// Startup with an already constructed provider.
///
/// # Errors
///
/// Same as [`load_tenant_setup`].
pub fn bootstrap_with_provider(
    config: &ConciergeConfig,
    provider: Arc<dyn LlmProvider>,
) -> Result<Concierge, StartupError> {
    let setup = load_tenant_setup(config)?;
    let settings = GenerationSettings {
        max_output_tokens: config.model.max_output_tokens,
        temperature: config.model.temperature,
    };
    Ok(Concierge::new(
        setup.resolver,
        setup.prompts,
        provider,
        settings,
    ))
}
