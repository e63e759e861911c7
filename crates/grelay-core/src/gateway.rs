use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use grelay_provider_core::{
    AttemptResult, CallContext, CredentialPool, GenerationRequest, ProviderAdapter, ProviderId,
    RetryReason,
};

use crate::error::GatewayError;
use crate::validate::validate;

/// A validated generation and the provider that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub data: serde_json::Value,
    pub source: ProviderId,
}

/// Orchestrates one generation request across providers and
/// credentials: providers in the pool's priority order, credentials
/// within a provider under the pool's rotation cursor, one attempt in
/// flight at a time. First validated success wins; a fatal failure
/// aborts everything; anything retryable rotates.
pub struct Gateway {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl Gateway {
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        Self { adapters }
    }

    pub async fn generate(
        &self,
        pool: &CredentialPool,
        request: GenerationRequest,
    ) -> Result<Generation, GatewayError> {
        if request.prompt.trim().is_empty() {
            return Err(GatewayError::EmptyPrompt);
        }
        let providers: Vec<ProviderId> = pool
            .providers()
            .into_iter()
            .filter(|provider| self.adapter(*provider).is_some())
            .collect();
        if providers.is_empty() {
            return Err(GatewayError::NoCredentialsConfigured);
        }

        let ctx = CallContext {
            trace_id: Uuid::new_v4().to_string(),
            user_id: None,
        };
        let timeout = request.attempt_timeout();
        let started_at = Instant::now();
        let mut attempts: u32 = 0;
        let mut last_retry: Option<RetryReason> = None;

        for provider in providers {
            let Some(adapter) = self.adapter(provider) else {
                continue;
            };
            // Every credential is tried at most once per call; this
            // bound is what guarantees termination.
            for _ in 0..pool.credential_count(provider) {
                let Ok(credential) = pool.next_credential(provider) else {
                    break;
                };
                attempts += 1;
                info!(
                    event = "gateway_attempt",
                    trace_id = %ctx.trace_id,
                    provider = %provider,
                    attempt = attempts
                );
                match adapter.invoke(&credential, &request, timeout, &ctx).await {
                    AttemptResult::Success(raw_text) => {
                        match validate(&raw_text, request.contract.as_ref()) {
                            Ok(data) => {
                                pool.advance(provider);
                                info!(
                                    event = "gateway_done",
                                    trace_id = %ctx.trace_id,
                                    provider = %provider,
                                    attempts = attempts,
                                    elapsed_ms = started_at.elapsed().as_millis()
                                );
                                return Ok(Generation {
                                    data,
                                    source: provider,
                                });
                            }
                            Err(err) => {
                                // A different credential or provider is
                                // worth trying: malformed output rotates
                                // exactly like a transient network failure.
                                warn!(
                                    event = "gateway_retry",
                                    trace_id = %ctx.trace_id,
                                    provider = %provider,
                                    attempt = attempts,
                                    reason = %err
                                );
                                last_retry = Some(RetryReason::MalformedOutput {
                                    detail: err.to_string(),
                                });
                                pool.advance(provider);
                            }
                        }
                    }
                    AttemptResult::Retry(reason) => {
                        warn!(
                            event = "gateway_retry",
                            trace_id = %ctx.trace_id,
                            provider = %provider,
                            attempt = attempts,
                            reason = %reason
                        );
                        last_retry = Some(reason);
                        pool.advance(provider);
                    }
                    AttemptResult::Fatal(reason) => {
                        // Fatal means the request itself was rejected;
                        // no credential rotation, no fallback provider.
                        warn!(
                            event = "gateway_failed",
                            trace_id = %ctx.trace_id,
                            provider = %provider,
                            attempts = attempts,
                            reason = %reason
                        );
                        return Err(GatewayError::Fatal {
                            provider,
                            reason,
                            attempts,
                        });
                    }
                }
            }
        }

        let last = last_retry.unwrap_or(RetryReason::EmptyResponse);
        warn!(
            event = "gateway_failed",
            trace_id = %ctx.trace_id,
            attempts = attempts,
            elapsed_ms = started_at.elapsed().as_millis(),
            reason = %last
        );
        Err(GatewayError::AllProvidersExhausted { attempts, last })
    }

    fn adapter(&self, provider: ProviderId) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.id() == provider)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use grelay_provider_core::{
        Credential, FatalReason, PoolSnapshot, ShapeContract,
    };

    use super::*;

    struct ScriptedAdapter {
        id: ProviderId,
        outcomes: HashMap<String, AttemptResult>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedAdapter {
        fn new<const N: usize>(
            id: ProviderId,
            outcomes: [(&str, AttemptResult); N],
        ) -> Arc<Self> {
            Arc::new(Self {
                id,
                outcomes: outcomes
                    .into_iter()
                    .map(|(key, outcome)| (key.to_string(), outcome))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn invoke(
            &self,
            credential: &Credential,
            _request: &GenerationRequest,
            _timeout: Duration,
            _ctx: &CallContext,
        ) -> AttemptResult {
            self.calls.lock().unwrap().push(credential.key.clone());
            self.outcomes
                .get(&credential.key)
                .cloned()
                .unwrap_or_else(|| panic!("unexpected invocation with key {}", credential.key))
        }
    }

    fn quota() -> AttemptResult {
        AttemptResult::Retry(RetryReason::QuotaOrServer {
            detail: "429".to_string(),
        })
    }

    fn gemini_pool(keys: &[&str]) -> CredentialPool {
        CredentialPool::new(
            PoolSnapshot::empty().with_keys(ProviderId::Gemini, keys.iter().copied()),
        )
    }

    #[tokio::test]
    async fn fatal_failure_short_circuits_remaining_providers() {
        let openai = ScriptedAdapter::new(
            ProviderId::OpenAi,
            [(
                "k1",
                AttemptResult::Fatal(FatalReason::ClientError {
                    status: 401,
                    detail: "bad key".to_string(),
                }),
            )],
        );
        let gemini = ScriptedAdapter::new(ProviderId::Gemini, []);
        let gateway = Gateway::new(vec![openai.clone(), gemini.clone()]);
        let pool = CredentialPool::new(
            PoolSnapshot::empty()
                .with_keys(ProviderId::OpenAi, ["k1"])
                .with_keys(ProviderId::Gemini, ["g1", "g2"]),
        );

        let err = gateway
            .generate(&pool, GenerationRequest::new("hello"))
            .await
            .unwrap_err();
        match err {
            GatewayError::Fatal {
                provider, attempts, ..
            } => {
                assert_eq!(provider, ProviderId::OpenAi);
                assert_eq!(attempts, 1);
            }
            other => panic!("expected fatal, got {other:?}"),
        }
        assert!(gemini.calls().is_empty());
        // No rotation on a fatal failure: the same key is retried next call.
        assert_eq!(pool.cursor(ProviderId::OpenAi), 0);
    }

    #[tokio::test]
    async fn success_after_retries_rotates_through_credentials() {
        let gemini = ScriptedAdapter::new(
            ProviderId::Gemini,
            [
                ("g1", quota()),
                ("g2", AttemptResult::Retry(RetryReason::Timeout)),
                (
                    "g3",
                    AttemptResult::Success(r#"{"titles": ["a", "b"]}"#.to_string()),
                ),
            ],
        );
        let gateway = Gateway::new(vec![gemini.clone()]);
        let pool = gemini_pool(&["g1", "g2", "g3"]);
        let contract =
            ShapeContract::object([("titles", ShapeContract::array(ShapeContract::Text))]);

        let generation = gateway
            .generate(
                &pool,
                GenerationRequest::new("titles please").with_contract(contract),
            )
            .await
            .unwrap();
        assert_eq!(generation.source, ProviderId::Gemini);
        assert_eq!(generation.data, json!({"titles": ["a", "b"]}));
        assert_eq!(gemini.calls(), vec!["g1", "g2", "g3"]);
        // Wrapped past the end: the next call starts over at g1.
        assert_eq!(pool.cursor(ProviderId::Gemini), 0);
    }

    #[tokio::test]
    async fn unparsable_output_with_contract_is_retryable_not_fatal() {
        let gemini = ScriptedAdapter::new(
            ProviderId::Gemini,
            [("g1", AttemptResult::Success("not json".to_string()))],
        );
        let gateway = Gateway::new(vec![gemini.clone()]);
        let pool = gemini_pool(&["g1"]);
        let contract = ShapeContract::object([("score", ShapeContract::Number)]);

        let err = gateway
            .generate(&pool, GenerationRequest::new("score it").with_contract(contract))
            .await
            .unwrap_err();
        match err {
            GatewayError::AllProvidersExhausted { attempts, last } => {
                assert_eq!(attempts, 1);
                assert!(matches!(last, RetryReason::MalformedOutput { .. }));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(gemini.calls(), vec!["g1"]);
    }

    #[tokio::test]
    async fn empty_pool_fails_before_any_network_call() {
        let gemini = ScriptedAdapter::new(ProviderId::Gemini, []);
        let gateway = Gateway::new(vec![gemini.clone()]);
        let pool = CredentialPool::new(PoolSnapshot::empty());

        let err = gateway
            .generate(&pool, GenerationRequest::new("hello"))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::NoCredentialsConfigured);
        assert!(gemini.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_without_attempts() {
        let gemini = ScriptedAdapter::new(ProviderId::Gemini, []);
        let gateway = Gateway::new(vec![gemini.clone()]);
        let pool = gemini_pool(&["g1"]);

        let err = gateway
            .generate(&pool, GenerationRequest::new("   "))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::EmptyPrompt);
        assert!(gemini.calls().is_empty());
    }

    #[tokio::test]
    async fn first_success_wins_without_touching_later_credentials() {
        let gemini = ScriptedAdapter::new(
            ProviderId::Gemini,
            [("g1", AttemptResult::Success("a haiku".to_string()))],
        );
        let gateway = Gateway::new(vec![gemini.clone()]);
        let pool = gemini_pool(&["g1", "g2"]);

        let generation = gateway
            .generate(&pool, GenerationRequest::new("haiku"))
            .await
            .unwrap();
        assert_eq!(generation.data, json!({"text": "a haiku"}));
        assert_eq!(gemini.calls(), vec!["g1"]);
        assert_eq!(pool.cursor(ProviderId::Gemini), 1);
    }

    #[tokio::test]
    async fn rotation_persists_across_calls() {
        let gemini = ScriptedAdapter::new(
            ProviderId::Gemini,
            [
                ("g1", AttemptResult::Success("one".to_string())),
                ("g2", AttemptResult::Success("two".to_string())),
            ],
        );
        let gateway = Gateway::new(vec![gemini.clone()]);
        let pool = gemini_pool(&["g1", "g2"]);

        for _ in 0..3 {
            gateway
                .generate(&pool, GenerationRequest::new("go"))
                .await
                .unwrap();
        }
        assert_eq!(gemini.calls(), vec!["g1", "g2", "g1"]);
    }

    #[tokio::test]
    async fn exhaustion_is_bounded_and_keeps_last_reason() {
        let openai = ScriptedAdapter::new(
            ProviderId::OpenAi,
            [("k1", quota()), ("k2", quota())],
        );
        let gemini = ScriptedAdapter::new(
            ProviderId::Gemini,
            [(
                "g1",
                AttemptResult::Retry(RetryReason::EmptyResponse),
            )],
        );
        let gateway = Gateway::new(vec![openai.clone(), gemini.clone()]);
        let pool = CredentialPool::new(
            PoolSnapshot::empty()
                .with_keys(ProviderId::OpenAi, ["k1", "k2"])
                .with_keys(ProviderId::Gemini, ["g1"]),
        );

        let err = gateway
            .generate(&pool, GenerationRequest::new("hello"))
            .await
            .unwrap_err();
        match err {
            GatewayError::AllProvidersExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last, RetryReason::EmptyResponse);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        // Priority order: every openai key before any gemini key.
        assert_eq!(openai.calls(), vec!["k1", "k2"]);
        assert_eq!(gemini.calls(), vec!["g1"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_exhaustion_leaves_cursor_in_range() {
        let gemini = ScriptedAdapter::new(
            ProviderId::Gemini,
            [("g1", quota()), ("g2", quota())],
        );
        let gateway = Arc::new(Gateway::new(vec![gemini.clone()]));
        let pool = Arc::new(gemini_pool(&["g1", "g2"]));

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let gateway = gateway.clone();
                let pool = pool.clone();
                tokio::spawn(async move {
                    gateway
                        .generate(&pool, GenerationRequest::new("hello"))
                        .await
                })
            })
            .collect();
        for task in tasks {
            let err = task.await.unwrap().unwrap_err();
            assert!(matches!(
                err,
                GatewayError::AllProvidersExhausted { .. }
            ));
        }
        assert!(pool.cursor(ProviderId::Gemini) < 2);
    }

    #[tokio::test]
    async fn aggregate_error_names_the_last_reason() {
        let gemini = ScriptedAdapter::new(ProviderId::Gemini, [("g1", quota())]);
        let gateway = Gateway::new(vec![gemini]);
        let pool = gemini_pool(&["g1"]);

        let err = gateway
            .generate(&pool, GenerationRequest::new("hello"))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("after 1 attempts"), "{message}");
        assert!(message.contains("quota exhausted or upstream error"), "{message}");
    }
}
