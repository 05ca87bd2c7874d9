//! Request middleware: API-key authentication and CORS.

mod api_key;
mod cors;

pub use api_key::{API_KEY_HEADER, require_api_key};
pub use cors::{CorsConfig, cors_layer};
