pub mod attempt;
pub mod contract;
pub mod credential;
pub mod pool;
pub mod provider;
pub mod request;

pub use attempt::{AttemptResult, FatalReason, RetryReason};
pub use contract::ShapeContract;
pub use credential::{Credential, ProviderId};
pub use pool::{CredentialPool, PoolError, PoolSnapshot};
pub use provider::{CallContext, ProviderAdapter};
pub use request::{GenerationRequest, DEFAULT_ATTEMPT_TIMEOUT};
