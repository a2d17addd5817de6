//! OAuth2 grant handling.
//!
//! Implements the three supported grant types on top of the token factory:
//!
//! - `authorization_code` - redeems a single-use code issued elsewhere
//! - `client_credentials` - issues an access token without a refresh token
//! - `refresh_token` - exchanges a refresh token, reusing or rotating it per
//!   client configuration
//!
//! # Example
//!
//! ```ignore
//! use apinto_oauth2::oauth::GrantProcessor;
//!
//! let processor = GrantProcessor::new(caches, namespace, clock);
//! let response = processor.process(&client, &request).await?;
//! ```

pub mod grant;

pub use grant::GrantProcessor;
