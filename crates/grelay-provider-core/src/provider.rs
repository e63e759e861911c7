use std::time::Duration;

use async_trait::async_trait;

use crate::attempt::AttemptResult;
use crate::credential::{Credential, ProviderId};
use crate::request::GenerationRequest;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub trace_id: String,
    pub user_id: Option<String>,
}

/// One implementation per backend. Translates the generic request into
/// the provider's wire call and classifies the outcome; never retries.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn id(&self) -> ProviderId;

    async fn invoke(
        &self,
        credential: &Credential,
        request: &GenerationRequest,
        timeout: Duration,
        ctx: &CallContext,
    ) -> AttemptResult;
}
