//! Core library for the sign-up client.
//!
//! - `auth`: cookie jar and access-token caching
//! - `api`: authenticated client for the region lookup API
//! - `loader`: loading/error/data state for a changing request target
//! - `directory`: per-country state list with memoized city lists
//! - `models`: API entries and sign-up form state
//! - `config`: file and environment configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod directory;
pub mod loader;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{CookieStore, FileCookieStore, MemoryCookieStore, TokenStore};
pub use config::{ApiCredentials, Config};
pub use directory::RegionDirectory;
pub use loader::{DataLoader, FetchState, LoadPhase};
