pub mod ask_dispatch_response;
pub mod http_validation_error;

pub use ask_dispatch_response::AskDispatchResponse;
pub use http_validation_error::{HttpValidationError, LocationItem, ValidationError};
