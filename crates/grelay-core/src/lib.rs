pub mod error;
pub mod gateway;
pub mod settings;
pub mod validate;

pub use error::GatewayError;
pub use gateway::{Gateway, Generation};
pub use settings::CallerSettings;
pub use validate::{validate, ValidateError};
