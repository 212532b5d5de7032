//! Conversation sessions: one tenant, one system instruction, many turns.
//!
//! [`Concierge`] owns the shared, read-only pieces (resolver, prompt builder,
//! provider) and creates [`ConversationSession`]s. Each session carries its
//! own [`SessionContext`]; nothing about a session lives in process-wide
//! state. The system instruction is computed once in
//! [`Concierge::open_session`] and never rebuilt for the life of the session.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::persona::{PromptBuilder, WelcomeBanner};
use crate::providers::{CompletionRequest, LlmProvider, Message, ProviderError};
use crate::tenants::{ResolveError, ResolutionSource, TenantRecord, TenantResolver};

pub mod store;

pub use store::{SessionHandle, SessionStore, StoreError};

/// Errors while exchanging a message within a live session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The guest sent an empty message.
    #[error("message is empty")]
    EmptyMessage,
    /// The remote model call failed. The session remains usable.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Sampling settings applied to every call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationSettings {
    /// Maximum reply tokens.
    pub max_output_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

/// Per-session identity, fixed at creation.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Session identifier.
    pub session_id: Uuid,
    /// The tenant this session is bound to.
    pub tenant: Arc<TenantRecord>,
    /// Whether the tenant was requested or defaulted.
    pub source: ResolutionSource,
    /// The persona instruction attached to every call.
    pub system_instruction: Arc<str>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A live conversation.
#[derive(Debug)]
pub struct ConversationSession {
    context: SessionContext,
    welcome: WelcomeBanner,
    turns: Vec<Message>,
    last_active: Instant,
}

impl ConversationSession {
    /// The session's fixed context.
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.context.session_id
    }

    /// Widget texts for this session's tenant.
    pub fn welcome(&self) -> &WelcomeBanner {
        &self.welcome
    }

    /// Completed turns, oldest first.
    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    /// Time of creation or of the last guest activity.
    pub fn last_active(&self) -> Instant {
        self.last_active
    }

    /// Restart the idle clock.
    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }
}

/// A reply returned to the guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply text, unmodified.
    pub text: String,
    /// Model that produced it.
    pub model: String,
}

/// Creates sessions and forwards their messages to the model.
#[derive(Clone)]
pub struct Concierge {
    resolver: TenantResolver,
    prompts: PromptBuilder,
    provider: Arc<dyn LlmProvider>,
    settings: GenerationSettings,
}

impl std::fmt::Debug for Concierge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Concierge")
            .field("default_tenant", &self.resolver.default_id())
            .field("model", &self.provider.model_id())
            .finish_non_exhaustive()
    }
}

impl Concierge {
    /// Assemble a concierge from its collaborators.
    pub fn new(
        resolver: TenantResolver,
        prompts: PromptBuilder,
        provider: Arc<dyn LlmProvider>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            resolver,
            prompts,
            provider,
            settings,
        }
    }

    /// The tenant resolver.
    pub fn resolver(&self) -> &TenantResolver {
        &self.resolver
    }

    /// The prompt builder.
    pub fn prompts(&self) -> &PromptBuilder {
        &self.prompts
    }

    /// Resolve the tenant and open a session bound to it.
    ///
    /// No remote call is made here; the instruction is attached to every
    /// subsequent call for this session.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownTenant`] for an unknown identifier.
    pub fn open_session(&self, requested: Option<&str>) -> Result<ConversationSession, ResolveError> {
        let resolved = self.resolver.resolve(requested)?;
        let system_instruction: Arc<str> = Arc::from(self.prompts.build(&resolved.tenant));
        let welcome = self.prompts.welcome(&resolved.tenant);

        let context = SessionContext {
            session_id: Uuid::new_v4(),
            tenant: resolved.tenant,
            source: resolved.source,
            system_instruction,
            created_at: Utc::now(),
        };
        info!(
            session_id = %context.session_id,
            tenant = %context.tenant.id,
            source = %context.source,
            "session opened"
        );

        Ok(ConversationSession {
            context,
            welcome,
            turns: Vec::new(),
            last_active: Instant::now(),
        })
    }

    /// Send one guest message and return the model's reply.
    ///
    /// The text is forwarded verbatim with the session history. On success
    /// both turns are appended; on failure history is left as it was so the
    /// guest can simply send again.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyMessage`] for blank input (no remote call)
    /// and [`SessionError::Provider`] when the model call fails.
    pub async fn send_message(
        &self,
        session: &mut ConversationSession,
        text: &str,
    ) -> Result<Reply, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        session.touch();

        let mut messages = session.turns.clone();
        messages.push(Message::user(text));

        let request = CompletionRequest {
            system: Some(session.context.system_instruction.to_string()),
            messages,
            max_tokens: self.settings.max_output_tokens,
            temperature: self.settings.temperature,
        };

        let result = self.provider.complete(request).await;
        session.touch();
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    session_id = %session.context.session_id,
                    tenant = %session.context.tenant.id,
                    error = %e,
                    "model call failed"
                );
                return Err(e.into());
            }
        };

        session.turns.push(Message::user(text));
        session.turns.push(Message::assistant(response.text.clone()));

        info!(
            session_id = %session.context.session_id,
            tenant = %session.context.tenant.id,
            model = %response.model,
            turns = session.turns.len(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "reply delivered"
        );

        Ok(Reply {
            text: response.text,
            model: response.model,
        })
    }
}
