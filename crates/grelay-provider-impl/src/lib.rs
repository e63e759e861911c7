mod client;
mod upstream;

pub mod provider;
pub mod registry;

pub use provider::{GeminiAdapter, OpenAiAdapter};
pub use registry::default_registry;
