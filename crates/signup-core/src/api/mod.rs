//! REST API client module for the region lookup service.
//!
//! This module provides the `ApiClient` for fetching state and city lists.
//! Requests carry a bearer token obtained from the `getaccesstoken`
//! endpoint and cached in the `auth_token` cookie.

pub mod client;
pub mod error;

pub use client::{city_api_url, state_api_url, ApiClient};
pub use error::{ApiError, INVALID_URL_MESSAGE};
