//! Token minting and validation.
//!
//! - [`factory`] - Opaque token generation and credential record writes
//! - [`validator`] - Read-only access token validation

pub mod factory;
pub mod validator;

pub use factory::{TokenFactory, generate_token_value};
pub use validator::TokenValidator;
