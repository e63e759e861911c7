use http::StatusCode;
use serde::Deserialize;

use grelay_provider_core::{AttemptResult, FatalReason, RetryReason};

/// Both upstreams wrap failures as `{"error": {"message": ...}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Map a non-2xx upstream status into the attempt taxonomy: 429 and
/// 5xx rotate, everything else in 4xx kills the call.
pub(crate) fn classify_status(status: StatusCode, detail: String) -> AttemptResult {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        AttemptResult::Retry(RetryReason::QuotaOrServer { detail })
    } else {
        AttemptResult::Fatal(FatalReason::ClientError {
            status: status.as_u16(),
            detail,
        })
    }
}

/// Transport-level failures (connect, TLS, read) land in the same
/// retryable class as an unavailable upstream.
pub(crate) fn network_failure(err: wreq::Error) -> AttemptResult {
    AttemptResult::Retry(RetryReason::QuotaOrServer {
        detail: err.to_string(),
    })
}

/// Best diagnostic we can pull out of an upstream error body.
pub(crate) fn error_detail(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| format!("upstream returned {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_and_server_statuses_rotate() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            let result = classify_status(status, "boom".to_string());
            assert!(
                matches!(result, AttemptResult::Retry(RetryReason::QuotaOrServer { .. })),
                "{status} should be retryable"
            );
        }
    }

    #[test]
    fn other_client_statuses_are_fatal() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
        ] {
            let result = classify_status(status, "rejected".to_string());
            let AttemptResult::Fatal(FatalReason::ClientError { status: code, .. }) = result
            else {
                panic!("{status} should be fatal");
            };
            assert_eq!(code, status.as_u16());
        }
    }

    #[test]
    fn error_detail_prefers_upstream_message() {
        let body = r#"{"error": {"message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(
            error_detail(body, StatusCode::BAD_REQUEST),
            "API key not valid"
        );
        assert_eq!(
            error_detail("<html>502</html>", StatusCode::BAD_GATEWAY),
            "upstream returned 502 Bad Gateway"
        );
    }
}
