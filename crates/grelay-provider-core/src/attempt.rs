use thiserror::Error;

/// Outcome of a single credential attempt against one provider.
///
/// Adapters classify, they never retry: retry policy is rotation, and
/// rotation belongs to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    /// HTTP success with a non-empty content payload.
    Success(String),
    /// Worth trying the next credential or provider.
    Retry(RetryReason),
    /// The request itself was rejected; no other credential will fare
    /// better. Aborts the whole call.
    Fatal(FatalReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryReason {
    #[error("attempt timed out")]
    Timeout,
    #[error("quota exhausted or upstream error: {detail}")]
    QuotaOrServer { detail: String },
    #[error("provider returned an empty response")]
    EmptyResponse,
    #[error("output failed shape validation: {detail}")]
    MalformedOutput { detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalReason {
    #[error("request rejected with status {status}: {detail}")]
    ClientError { status: u16, detail: String },
    #[error("content blocked by provider: {detail}")]
    ContentBlocked { detail: String },
}
