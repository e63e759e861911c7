pub mod request;
pub mod response;

pub use request::{ChatCompletionRequest, ChatMessage, ResponseFormat};
pub use response::{ChatChoice, ChatCompletionResponse, ChatResponseMessage};
