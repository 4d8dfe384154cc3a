//! Data models for the region lookup API and the sign-up form.
//!
//! - `StateName`, `CityName`: entries returned by the lookup endpoints
//! - `SignUpForm`, `Registration`: form state and its validated result

pub mod region;
pub mod signup;

pub use region::{CityName, StateName};
pub use signup::{FormField, InvalidField, Registration, SignUpForm};
