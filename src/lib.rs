pub mod api;
pub mod client;
pub mod errors;
pub mod models;
pub mod transport;
pub mod utils;

pub use client::{AnyClient, ApiClient, AuthenticatedClient, Client, ClientConfig};
pub use errors::{Error, Result};
pub use transport::Response;

// Crate version exposed for runtime queries
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
