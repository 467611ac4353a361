//! HTTP plumbing against the remote nutrition API.
//!
//! Provides:
//! - [`ApiClient`]: bearer-token request wrapper with JSON decoding
//! - Expired-session handling: clear + notify + redirect, optionally preceded
//!   by a single coalesced token refresh
//! - [`ApiError`]: the error taxonomy every call returns

pub mod client;
pub mod error;
pub mod refresh;
pub mod request;
pub mod response;

pub use client::{ApiClient, ApiClientBuilder};
pub use error::{ApiError, SESSION_EXPIRED, SESSION_EXPIRED_NOTICE};
pub use refresh::TokenResponse;
pub use request::RequestOptions;
