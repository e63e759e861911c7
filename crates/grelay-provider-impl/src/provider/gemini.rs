use std::time::{Duration, Instant};

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue};
use tracing::{info, warn};

use grelay_protocol::gemini::generate_content::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
};
use grelay_provider_core::{
    AttemptResult, CallContext, Credential, FatalReason, GenerationRequest, ProviderAdapter,
    ProviderId, RetryReason,
};

use crate::client::shared_client;
use crate::upstream::{classify_status, error_detail, network_failure};

pub const PROVIDER_NAME: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    base_url: String,
    model: String,
}

impl GeminiAdapter {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn generate_path(&self) -> String {
        format!("/v1beta/models/{}:generateContent", self.model)
    }

    fn build_payload(&self, request: &GenerationRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user(request.prompt.clone())],
            generation_config: request
                .contract
                .as_ref()
                .map(|contract| GenerationConfig::json(contract.to_wire_schema())),
        }
    }

    async fn attempt(
        &self,
        credential: &Credential,
        request: &GenerationRequest,
        ctx: &CallContext,
    ) -> AttemptResult {
        let payload = self.build_payload(request);
        let path = self.generate_path();
        // The key travels in the query string; log the path only.
        let url = build_url(&self.base_url, &path, &credential.key);
        let started_at = Instant::now();
        info!(
            event = "upstream_request",
            trace_id = %ctx.trace_id,
            provider = %PROVIDER_NAME,
            op = "gemini.generate",
            method = "POST",
            path = %path,
            model = %self.model
        );
        let response = match shared_client()
            .post(url)
            .headers(json_headers())
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    event = "upstream_response",
                    trace_id = %ctx.trace_id,
                    provider = %PROVIDER_NAME,
                    op = "gemini.generate",
                    status = "error",
                    elapsed_ms = started_at.elapsed().as_millis(),
                    error = %err
                );
                return network_failure(err);
            }
        };
        let status = response.status();
        info!(
            event = "upstream_response",
            trace_id = %ctx.trace_id,
            provider = %PROVIDER_NAME,
            op = "gemini.generate",
            status = status.as_u16(),
            elapsed_ms = started_at.elapsed().as_millis()
        );
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return network_failure(err),
        };
        if !status.is_success() {
            return classify_status(status, error_detail(&body, status));
        }
        outcome_from_body(&body)
    }
}

impl Default for GeminiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn invoke(
        &self,
        credential: &Credential,
        request: &GenerationRequest,
        timeout: Duration,
        ctx: &CallContext,
    ) -> AttemptResult {
        match tokio::time::timeout(timeout, self.attempt(credential, request, ctx)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    event = "upstream_response",
                    trace_id = %ctx.trace_id,
                    provider = %PROVIDER_NAME,
                    op = "gemini.generate",
                    status = "timeout",
                    timeout_ms = timeout.as_millis()
                );
                AttemptResult::Retry(RetryReason::Timeout)
            }
        }
    }
}

fn outcome_from_body(body: &str) -> AttemptResult {
    let Ok(parsed) = serde_json::from_str::<GenerateContentResponse>(body) else {
        return AttemptResult::Retry(RetryReason::EmptyResponse);
    };
    if let Some(reason) = parsed
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return AttemptResult::Fatal(FatalReason::ContentBlocked {
            detail: format!("prompt blocked: {reason}"),
        });
    }
    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return AttemptResult::Retry(RetryReason::EmptyResponse);
    };
    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return AttemptResult::Fatal(FatalReason::ContentBlocked {
            detail: "candidate finished with SAFETY".to_string(),
        });
    }
    let text = candidate
        .content
        .and_then(|content| content.parts.into_iter().find_map(|part| part.text));
    match text {
        Some(text) if !text.is_empty() => AttemptResult::Success(text),
        _ => AttemptResult::Retry(RetryReason::EmptyResponse),
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn build_url(base_url: &str, path: &str, api_key: &str) -> String {
    format!(
        "{}{}?key={}",
        base_url.trim_end_matches('/'),
        path,
        urlencoding::encode(api_key)
    )
}
