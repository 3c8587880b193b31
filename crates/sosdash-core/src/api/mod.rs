//! Boundary to the safety API.
//!
//! [`AlertApi`] is the seam the synchronization engine is written
//! against; [`HttpAlertApi`] talks to the real server.

mod client;
mod http;
pub mod types;

pub use client::AlertApi;
pub use http::HttpAlertApi;
pub use types::{ApiError, ToggleOutcome};
