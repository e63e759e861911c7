use std::sync::Arc;

use grelay_provider_core::ProviderAdapter;

use crate::provider::{GeminiAdapter, OpenAiAdapter};

/// Stock adapters for every supported provider, pointing at their
/// public endpoints with default models.
pub fn default_registry() -> Vec<Arc<dyn ProviderAdapter>> {
    vec![
        Arc::new(OpenAiAdapter::new()),
        Arc::new(GeminiAdapter::new()),
    ]
}
