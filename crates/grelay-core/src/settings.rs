use serde::Deserialize;

use grelay_provider_core::{CredentialPool, PoolSnapshot, ProviderId};

/// The key set a caller keeps in its external settings store: one
/// OpenAI key at most, any number of Gemini keys. Unknown settings
/// fields (other service keys, UI preferences) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallerSettings {
    #[serde(default)]
    pub openai: Option<String>,
    #[serde(default)]
    pub gemini: Vec<String>,
}

impl CallerSettings {
    /// Build the caller's pool: the paid primary provider first, the
    /// free backup last. Blank keys are dropped; a provider left with
    /// none is skipped by the pool.
    pub fn into_pool(self) -> CredentialPool {
        let mut snapshot = PoolSnapshot::empty();
        if let Some(key) = self.openai {
            snapshot = snapshot.with_keys(ProviderId::OpenAi, [key]);
        }
        snapshot = snapshot.with_keys(ProviderId::Gemini, self.gemini);
        CredentialPool::new(snapshot)
    }
}
