use std::fmt;

/// A generation backend this gateway knows how to talk to, in no
/// particular order; traversal priority comes from the pool snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenAi,
    Gemini,
}

impl ProviderId {
    /// Stable lowercase name used in settings keys and log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }

    /// Caller-facing label for the `source` of a generation.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Gemini => "Gemini",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One API key usable against one provider. The key is opaque; nothing
/// in the gateway inspects it beyond non-emptiness.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub provider: ProviderId,
    pub key: String,
}

impl Credential {
    pub fn new(provider: ProviderId, key: impl Into<String>) -> Self {
        Self {
            provider,
            key: key.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("provider", &self.provider)
            .field("key", &"<redacted>")
            .finish()
    }
}
