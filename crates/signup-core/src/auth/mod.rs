//! Authentication module for bearer-token caching.
//!
//! This module provides:
//! - `Cookie` and `get_cookie`: browser-style cookie encoding
//! - `CookieStore`: process-wide cookie jar, in memory or persisted to disk
//! - `TokenStore`: access-token issuance cached in the `auth_token` cookie
//!
//! Tokens live for one day and are never revoked; expiry is the only
//! invalidation path.

pub mod cookie;
pub mod store;
pub mod token;

pub use cookie::{get_cookie, Cookie};
pub use store::{set_cookie, CookieStore, FileCookieStore, MemoryCookieStore};
pub use token::{AccessToken, TokenStore, AUTH_COOKIE, TOKEN_LIFETIME_DAYS};
