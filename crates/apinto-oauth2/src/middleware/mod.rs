//! HTTP middleware for protected routes.
//!
//! - Bearer token extraction and validation
//! - Error responses for the token endpoint and bearer rejections

pub mod bearer;
pub mod error;

pub use bearer::{BearerClient, BearerState};
pub use error::BearerRejection;
