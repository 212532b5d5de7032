//! Persona template and system-instruction builder.
//!
//! The persona text lives in a template asset with `{placeholder}` slots that
//! are filled from a [`TenantRecord`]. The built-in template is embedded at
//! compile time; deployments can point `persona.template_path` at their own.
//!
//! Templates are parsed once at startup. Rendering is a single pass over the
//! parsed segments, so tenant values are inserted verbatim and never expanded
//! a second time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tenants::TenantRecord;

/// The built-in persona template.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../assets/persona_template.md");

/// Default concierge display name.
pub const DEFAULT_ASSISTANT_NAME: &str = "Aisha";

/// A named slot in the persona template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `{name}`
    Name,
    /// `{city}`
    City,
    /// `{whatsapp}`
    Whatsapp,
    /// `{location}`
    Location,
    /// `{breakfast_info}`
    BreakfastInfo,
    /// `{wifi_info}`
    WifiInfo,
    /// `{tours_info}`
    ToursInfo,
    /// `{assistant_name}`
    AssistantName,
}

impl Placeholder {
    /// Parse a placeholder name as written between braces.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "city" => Some(Self::City),
            "whatsapp" => Some(Self::Whatsapp),
            "location" => Some(Self::Location),
            "breakfast_info" => Some(Self::BreakfastInfo),
            "wifi_info" => Some(Self::WifiInfo),
            "tours_info" => Some(Self::ToursInfo),
            "assistant_name" => Some(Self::AssistantName),
            _ => None,
        }
    }

    /// The name as written between braces.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::City => "city",
            Self::Whatsapp => "whatsapp",
            Self::Location => "location",
            Self::BreakfastInfo => "breakfast_info",
            Self::WifiInfo => "wifi_info",
            Self::ToursInfo => "tours_info",
            Self::AssistantName => "assistant_name",
        }
    }
}

/// Placeholders every persona template must use.
const REQUIRED: [Placeholder; 2] = [Placeholder::Name, Placeholder::Whatsapp];

/// Errors loading or parsing a persona template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The template file could not be read.
    #[error("cannot read persona template {}: {source}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// A `{...}` slot names no known field.
    #[error("unknown placeholder '{{{name}}}' at byte {offset}")]
    UnknownPlaceholder {
        /// Name between the braces.
        name: String,
        /// Byte offset of the opening brace.
        offset: usize,
    },
    /// A `{` was never closed.
    #[error("unterminated placeholder at byte {offset}")]
    Unterminated {
        /// Byte offset of the opening brace.
        offset: usize,
    },
    /// A lone `}` outside a placeholder. Write `}}` for a literal brace.
    #[error("unmatched '}}' at byte {offset}")]
    UnmatchedClose {
        /// Byte offset of the brace.
        offset: usize,
    },
    /// The template omits a required placeholder.
    #[error("persona template must use '{{{}}}'", .0.as_str())]
    MissingRequired(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// A parsed persona template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaTemplate {
    segments: Vec<Segment>,
}

impl PersonaTemplate {
    /// Parse template source. `{{` and `}}` produce literal braces.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] on malformed or unknown placeholders, or
    /// when `{name}` or `{whatsapp}` is absent.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '{' => {
                    if chars.next_if(|&(_, c)| c == '{').is_some() {
                        literal.push('{');
                        continue;
                    }
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(TemplateError::Unterminated { offset });
                    }
                    let placeholder = Placeholder::from_name(name.trim())
                        .ok_or(TemplateError::UnknownPlaceholder { name, offset })?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(placeholder));
                }
                '}' => {
                    if chars.next_if(|&(_, c)| c == '}').is_some() {
                        literal.push('}');
                    } else {
                        return Err(TemplateError::UnmatchedClose { offset });
                    }
                }
                _ => literal.push(ch),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let template = Self { segments };
        if let Some(missing) = REQUIRED.into_iter().find(|p| !template.uses(*p)) {
            return Err(TemplateError::MissingRequired(missing));
        }
        Ok(template)
    }

    /// Parse the built-in template.
    ///
    /// # Errors
    ///
    /// Only if the embedded asset is malformed.
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::parse(DEFAULT_TEMPLATE)
    }

    /// Read and parse a template file.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Read`] if the file cannot be read, or any
    /// parse error.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }

    /// Whether the template references `placeholder`.
    pub fn uses(&self, placeholder: Placeholder) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Field(p) if *p == placeholder))
    }
}

/// Builds the per-session system instruction from a tenant record.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: Arc<PersonaTemplate>,
    assistant_name: String,
}

impl PromptBuilder {
    /// Create a builder over a parsed template.
    pub fn new(template: PersonaTemplate, assistant_name: impl Into<String>) -> Self {
        Self {
            template: Arc::new(template),
            assistant_name: assistant_name.into(),
        }
    }

    /// Concierge display name substituted for `{assistant_name}`.
    pub fn assistant_name(&self) -> &str {
        &self.assistant_name
    }

    /// Render the system instruction for `tenant`.
    ///
    /// Pure: the same record always yields byte-identical output.
    pub fn build(&self, tenant: &TenantRecord) -> String {
        let mut out = String::with_capacity(2048);
        for segment in &self.template.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(p) => out.push_str(self.field(tenant, *p)),
            }
        }
        out
    }

    /// Texts shown when a session opens.
    pub fn welcome(&self, tenant: &TenantRecord) -> WelcomeBanner {
        WelcomeBanner {
            page_title: format!("{} Concierge", tenant.name),
            heading: format!("Welcome to {}", tenant.name),
            greeting: format!(
                "I'm {}, your virtual concierge. How can I help you?",
                self.assistant_name
            ),
            input_placeholder: "Ask about breakfast, tours, or wifi ...".to_owned(),
        }
    }

    fn field<'a>(&'a self, tenant: &'a TenantRecord, placeholder: Placeholder) -> &'a str {
        match placeholder {
            Placeholder::Name => &tenant.name,
            Placeholder::City => &tenant.city,
            Placeholder::Whatsapp => &tenant.whatsapp,
            Placeholder::Location => &tenant.location,
            Placeholder::BreakfastInfo => &tenant.breakfast_info,
            Placeholder::WifiInfo => &tenant.wifi_info,
            Placeholder::ToursInfo => &tenant.tours_info,
            Placeholder::AssistantName => &self.assistant_name,
        }
    }
}

/// Chat widget texts for a freshly opened session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeBanner {
    /// Browser page title.
    pub page_title: String,
    /// Heading above the chat.
    pub heading: String,
    /// First concierge line.
    pub greeting: String,
    /// Hint text in the message input.
    pub input_placeholder: String,
}
