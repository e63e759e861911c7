pub mod request;
pub mod response;
pub mod types;

pub use request::GenerateContentRequest;
pub use response::{Candidate, GenerateContentResponse, PromptFeedback};
pub use types::{Content, GenerationConfig, Part};
