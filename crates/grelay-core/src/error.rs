use thiserror::Error;

use grelay_provider_core::{FatalReason, ProviderId, RetryReason};

/// Caller-visible failure of a `generate` call. Retryable attempt
/// failures are consumed internally by rotation; only a fatal reason or
/// the final aggregate surfaces here, always with the last concrete
/// reason attached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("no usable credentials configured")]
    NoCredentialsConfigured,
    #[error("{provider} rejected the request: {reason}")]
    Fatal {
        provider: ProviderId,
        reason: FatalReason,
        attempts: u32,
    },
    #[error("all providers exhausted after {attempts} attempts; last error: {last}")]
    AllProvidersExhausted { attempts: u32, last: RetryReason },
}
