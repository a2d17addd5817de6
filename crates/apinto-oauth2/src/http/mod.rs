//! HTTP handlers.
//!
//! - [`token`] - OAuth2 token endpoint
//! - [`admin`] - Token import/listing endpoint
//! - [`params`] - Parameter normalization for the token endpoint

pub mod admin;
pub mod params;
pub mod token;

pub use admin::{AdminState, import_tokens_handler, list_tokens_handler};
pub use params::collect_params;
pub use token::{TokenState, token_handler};
