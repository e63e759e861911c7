//! Resilient generation gateway: one prompt in, one validated response
//! out, across an ordered set of AI providers and rotating credentials.
//!
//! ```no_run
//! use grelay::{default_gateway, CallerSettings, GenerationRequest};
//!
//! # async fn run() -> Result<(), grelay::GatewayError> {
//! let settings: CallerSettings =
//!     serde_json::from_str(r#"{"gemini": ["key-1", "key-2"]}"#).unwrap();
//! let pool = settings.into_pool();
//! let gateway = default_gateway();
//! let generation = gateway
//!     .generate(&pool, GenerationRequest::new("three video title ideas"))
//!     .await?;
//! println!("{} said: {}", generation.source.display_name(), generation.data);
//! # Ok(())
//! # }
//! ```

pub use grelay_core::{validate, CallerSettings, Gateway, GatewayError, Generation, ValidateError};
pub use grelay_provider_core::{
    AttemptResult, CallContext, Credential, CredentialPool, FatalReason, GenerationRequest,
    PoolError, PoolSnapshot, ProviderAdapter, ProviderId, RetryReason, ShapeContract,
    DEFAULT_ATTEMPT_TIMEOUT,
};
pub use grelay_provider_impl::{default_registry, GeminiAdapter, OpenAiAdapter};

/// A gateway wired with the stock OpenAI and Gemini adapters.
pub fn default_gateway() -> Gateway {
    Gateway::new(default_registry())
}
