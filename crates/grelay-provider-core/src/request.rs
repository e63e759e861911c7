use std::time::Duration;

use crate::contract::ShapeContract;

/// Per-attempt deadline when the caller does not override it.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(60_000);

/// One content-generation request. Created per call, immutable, never
/// persisted.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub contract: Option<ShapeContract>,
    pub timeout: Option<Duration>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            contract: None,
            timeout: None,
        }
    }

    pub fn with_contract(mut self, contract: ShapeContract) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_ATTEMPT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_sixty_seconds() {
        let request = GenerationRequest::new("hello");
        assert_eq!(request.attempt_timeout(), Duration::from_secs(60));
        let request = request.with_timeout(Duration::from_secs(5));
        assert_eq!(request.attempt_timeout(), Duration::from_secs(5));
    }
}
