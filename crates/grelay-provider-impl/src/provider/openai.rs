use std::time::{Duration, Instant};

use async_trait::async_trait;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use tracing::{info, warn};

use grelay_protocol::openai::chat_completions::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ResponseFormat,
};
use grelay_provider_core::{
    AttemptResult, CallContext, Credential, FatalReason, GenerationRequest, ProviderAdapter,
    ProviderId, RetryReason,
};

use crate::client::shared_client;
use crate::upstream::{classify_status, error_detail, network_failure};

pub const PROVIDER_NAME: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    base_url: String,
    model: String,
}

impl OpenAiAdapter {
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

    fn build_payload(&self, request: &GenerationRequest) -> ChatCompletionRequest {
        let mut content = request.prompt.clone();
        let mut response_format = None;
        if let Some(contract) = &request.contract {
            // json_object mode alone does not convey field names, so the
            // expected shape rides along in the instruction text.
            content.push_str("\n\nRespond with a single JSON value matching this schema: ");
            content.push_str(&contract.to_wire_schema().to_string());
            response_format = Some(ResponseFormat::json_object());
        }
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(content)],
            response_format,
        }
    }

    async fn attempt(
        &self,
        credential: &Credential,
        request: &GenerationRequest,
        ctx: &CallContext,
    ) -> AttemptResult {
        let headers = match build_headers(&credential.key) {
            Ok(headers) => headers,
            Err(result) => return result,
        };
        let payload = self.build_payload(request);
        let url = build_url(&self.base_url, CHAT_COMPLETIONS_PATH);
        let started_at = Instant::now();
        info!(
            event = "upstream_request",
            trace_id = %ctx.trace_id,
            provider = %PROVIDER_NAME,
            op = "openai.chat",
            method = "POST",
            path = CHAT_COMPLETIONS_PATH,
            model = %self.model
        );
        let response = match shared_client()
            .post(url)
            .headers(headers)
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
                    op = "openai.chat",
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
            op = "openai.chat",
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

impl Default for OpenAiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
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
                    op = "openai.chat",
                    status = "timeout",
                    timeout_ms = timeout.as_millis()
                );
                AttemptResult::Retry(RetryReason::Timeout)
            }
        }
    }
}

fn outcome_from_body(body: &str) -> AttemptResult {
    let Ok(parsed) = serde_json::from_str::<ChatCompletionResponse>(body) else {
        return AttemptResult::Retry(RetryReason::EmptyResponse);
    };
    let Some(choice) = parsed.choices.into_iter().next() else {
        return AttemptResult::Retry(RetryReason::EmptyResponse);
    };
    if choice.finish_reason.as_deref() == Some("content_filter") {
        return AttemptResult::Fatal(FatalReason::ContentBlocked {
            detail: "finish_reason content_filter".to_string(),
        });
    }
    match choice.message.content {
        Some(content) if !content.is_empty() => AttemptResult::Success(content),
        _ => AttemptResult::Retry(RetryReason::EmptyResponse),
    }
}

fn build_headers(api_key: &str) -> Result<HeaderMap, AttemptResult> {
    let mut bearer = String::with_capacity(api_key.len() + 7);
    bearer.push_str("Bearer ");
    bearer.push_str(api_key);
    let value = HeaderValue::from_str(&bearer).map_err(|_| {
        AttemptResult::Fatal(FatalReason::ClientError {
            status: 400,
            detail: "credential is not a valid header value".to_string(),
        })
    })?;
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

fn build_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use grelay_provider_core::ShapeContract;

    use super::*;

    #[test]
    fn payload_without_contract_is_plain_chat() {
        let adapter = OpenAiAdapter::new();
        let payload = adapter.build_payload(&GenerationRequest::new("five video ideas"));
        assert_eq!(payload.model, "gpt-3.5-turbo");
        assert_eq!(payload.messages.len(), 1);
        assert_eq!(payload.messages[0].content, "five video ideas");
        assert!(payload.response_format.is_none());
    }

    #[test]
    fn payload_with_contract_forces_json_and_names_fields() {
        let adapter = OpenAiAdapter::new().with_model("gpt-4o-mini");
        let contract = ShapeContract::object([("titles", ShapeContract::array(ShapeContract::Text))]);
        let payload =
            adapter.build_payload(&GenerationRequest::new("five video ideas").with_contract(contract));
        assert_eq!(payload.model, "gpt-4o-mini");
        assert_eq!(
            payload.response_format,
            Some(ResponseFormat::json_object())
        );
        let content = &payload.messages[0].content;
        assert!(content.starts_with("five video ideas"));
        assert!(content.contains("\"titles\""));
        assert!(content.contains("ARRAY"));
    }

    #[test]
    fn content_is_extracted_from_first_choice() {
        let body = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "hello"}, "finish_reason": "stop"}
            ]
        }"#;
        assert_eq!(
            outcome_from_body(body),
            AttemptResult::Success("hello".to_string())
        );
    }

    #[test]
    fn content_filter_is_a_fatal_block() {
        let body = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": null}, "finish_reason": "content_filter"}
            ]
        }"#;
        assert!(matches!(
            outcome_from_body(body),
            AttemptResult::Fatal(FatalReason::ContentBlocked { .. })
        ));
    }

    #[test]
    fn missing_content_is_retryable_empty() {
        for body in [
            r#"{"choices": []}"#,
            r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#,
            r#"{"choices": [{"message": {"role": "assistant", "content": ""}}]}"#,
            "not json at all",
        ] {
            assert_eq!(
                outcome_from_body(body),
                AttemptResult::Retry(RetryReason::EmptyResponse),
                "body: {body}"
            );
        }
    }

    #[test]
    fn url_tolerates_trailing_slash() {
        assert_eq!(
            build_url("https://api.openai.com/", CHAT_COMPLETIONS_PATH),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
